//! Fantoccini-backed session adapter.
//!
//! Wraps a WebDriver client (chromedriver by default) behind the engine's
//! `Session` trait. Error classification is by message content since the
//! WebDriver wire protocol reports failures as error strings.

use crate::driver::{self, DriverProcess};
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder};
use keyturn_common::{Locator, SessionError};
use keyturn_engine::config::SessionOptions;
use keyturn_engine::session::{ScriptArg, Session};
use tracing::info;

pub struct WdSession {
    client: Client,
    // Held so the driver outlives the session and dies with it.
    driver: Option<DriverProcess>,
}

impl WdSession {
    /// Connect to an already-running WebDriver server.
    pub async fn connect(webdriver_url: &str, options: &SessionOptions) -> Result<Self, SessionError> {
        info!("Connecting to WebDriver at {}...", webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities(options))
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                SessionError::Backend(format!(
                    "failed to connect to WebDriver at {}: {}",
                    webdriver_url, e
                ))
            })?;
        Ok(Self {
            client,
            driver: None,
        })
    }

    /// Launch a local chromedriver on the standard port and connect to it.
    pub async fn launch(options: &SessionOptions) -> Result<Self, SessionError> {
        Self::launch_on_port(options, driver::DEFAULT_DRIVER_PORT).await
    }

    /// Launch a local chromedriver on a specific port. Useful for parallel
    /// test runs.
    pub async fn launch_on_port(
        options: &SessionOptions,
        port: u16,
    ) -> Result<Self, SessionError> {
        let driver = driver::launch_chromedriver(port)
            .await
            .map_err(SessionError::Backend)?;
        let url = driver.webdriver_url();
        let mut session = Self::connect(&url, options).await?;
        session.driver = Some(driver);
        Ok(session)
    }
}

/// Build the Chrome capability map from the configured session options.
fn chrome_capabilities(options: &SessionOptions) -> serde_json::Map<String, serde_json::Value> {
    let mut args: Vec<String> = vec![
        format!("--window-size={}", options.window_size),
        "--disable-gpu".into(),
        "--no-sandbox".into(),
        "--disable-dev-shm-usage".into(),
    ];
    if options.headless {
        args.push("--headless=new".into());
    }
    if options.normalize_fingerprint {
        args.push("--disable-blink-features=AutomationControlled".into());
    }
    if let Some(ua) = &options.user_agent {
        args.push(format!("--user-agent={}", ua));
    }

    let mut chrome_options = serde_json::Map::new();
    chrome_options.insert("args".into(), serde_json::json!(args));
    if options.normalize_fingerprint {
        chrome_options.insert(
            "excludeSwitches".into(),
            serde_json::json!(["enable-automation"]),
        );
    }

    let mut caps = serde_json::Map::new();
    caps.insert("goog:chromeOptions".into(), chrome_options.into());
    caps.insert(
        "acceptInsecureCerts".into(),
        serde_json::json!(options.accept_insecure_certs),
    );
    caps
}

fn map_err(e: CmdError) -> SessionError {
    classify(e.to_string())
}

fn classify(message: String) -> SessionError {
    let lower = message.to_lowercase();
    if lower.contains("click intercepted") || lower.contains("is not clickable") {
        SessionError::Intercepted(message)
    } else if lower.contains("stale element")
        || lower.contains("no such frame")
        || lower.contains("no such window")
        || lower.contains("detached")
    {
        SessionError::Detached(message)
    } else if lower.contains("no such element") {
        SessionError::ElementNotFound(message)
    } else if lower.contains("javascript error") {
        SessionError::Script(message)
    } else {
        SessionError::Backend(message)
    }
}

#[async_trait]
impl Session for WdSession {
    type Element = fantoccini::elements::Element;
    type Window = WindowHandle;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        info!("Navigating to: {}", url);
        self.client.goto(url).await.map_err(map_err)
    }

    async fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(self.client.current_url().await.map_err(map_err)?.to_string())
    }

    async fn title(&mut self) -> Result<String, SessionError> {
        self.client.title().await.map_err(map_err)
    }

    async fn find_elements(
        &mut self,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, SessionError> {
        // An empty locator matches nothing; the driver would reject "" as
        // an invalid selector.
        if locator.is_empty() {
            return Ok(Vec::new());
        }
        // Alternatives are joined into one CSS selector list, so document
        // order is preserved across them.
        let css = locator.as_css();
        self.client
            .find_all(fantoccini::Locator::Css(&css))
            .await
            .map_err(map_err)
    }

    async fn is_visible(&mut self, element: &Self::Element) -> Result<bool, SessionError> {
        element.is_displayed().await.map_err(map_err)
    }

    async fn is_clickable(&mut self, element: &Self::Element) -> Result<bool, SessionError> {
        let displayed = element.is_displayed().await.map_err(map_err)?;
        if !displayed {
            return Ok(false);
        }
        element.is_enabled().await.map_err(map_err)
    }

    async fn clear(&mut self, element: &Self::Element) -> Result<(), SessionError> {
        element.clear().await.map_err(map_err)
    }

    async fn send_keys(
        &mut self,
        element: &Self::Element,
        text: &str,
    ) -> Result<(), SessionError> {
        element.send_keys(text).await.map_err(map_err)
    }

    async fn click(&mut self, element: &Self::Element) -> Result<(), SessionError> {
        element.click().await.map_err(map_err)
    }

    async fn text(&mut self, element: &Self::Element) -> Result<String, SessionError> {
        element.text().await.map_err(map_err)
    }

    async fn switch_to_frame(&mut self, index: u16) -> Result<(), SessionError> {
        self.client.enter_frame(Some(index)).await.map_err(map_err)?;
        Ok(())
    }

    async fn switch_to_default(&mut self) -> Result<(), SessionError> {
        self.client.enter_frame(None).await.map_err(map_err)?;
        Ok(())
    }

    async fn window_handles(&mut self) -> Result<Vec<Self::Window>, SessionError> {
        self.client.windows().await.map_err(map_err)
    }

    async fn current_window(&mut self) -> Result<Self::Window, SessionError> {
        self.client.window().await.map_err(map_err)
    }

    async fn switch_to_window(&mut self, window: &Self::Window) -> Result<(), SessionError> {
        self.client
            .switch_to_window(window.clone())
            .await
            .map_err(map_err)
    }

    async fn execute_script(
        &mut self,
        script: &str,
        args: Vec<ScriptArg<Self::Element>>,
    ) -> Result<serde_json::Value, SessionError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(match arg {
                ScriptArg::Element(element) => serde_json::to_value(element)
                    .map_err(|e| SessionError::Script(e.to_string()))?,
                ScriptArg::Json(value) => value,
            });
        }
        self.client.execute(script, values).await.map_err(map_err)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.client.clone().close().await.map_err(map_err)?;
        self.driver = None;
        Ok(())
    }
}
