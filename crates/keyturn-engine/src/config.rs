//! Flow configuration: schema, defaults, and the YAML loader.
//!
//! Nothing in the core is hard-coded; every locator, timeout, and pattern
//! list here can be supplied externally. The defaults mirror a typical
//! ASP.NET banking portal (id-suffix selectors shared by its login
//! variants) so the binary works out of the box against that family.

use crate::detect::SuccessSignal;
use crate::wait::WaitSpec;
use keyturn_common::Locator;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Entry URLs and how to recognize them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    /// Login page to start from.
    pub primary: String,
    /// Secondary login page, navigated to when a forced redirect lands on
    /// neither known entry URL.
    pub fallback: Option<String>,
    /// URL fragments identifying a login entry page (case-insensitive).
    pub login_fragments: Vec<String>,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            primary: String::new(),
            fallback: None,
            login_fragments: vec!["signin.aspx".into(), "usermanager.aspx".into()],
        }
    }
}

/// Selector alternatives for each element role the flow touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub username: Vec<String>,
    pub password: Vec<String>,
    pub submit: Vec<String>,
    /// Transient overlay/spinner elements to wait out before evaluation.
    pub overlay: Vec<String>,
    /// Validation-message containers scanned for failure diagnostics.
    pub validation: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            username: vec![
                "input[id$='txtLoginName']".into(),
                "input[id$='txtUserName']".into(),
            ],
            password: vec!["input[id$='txtPassword']".into()],
            submit: vec![
                "input[id$='cmdContinue']".into(),
                "button[id$='cmdContinue']".into(),
                "a[id$='cmdContinue']".into(),
                "input[type='submit']".into(),
            ],
            overlay: vec![
                ".modal-backdrop".into(),
                ".blockUI".into(),
                ".loading".into(),
                ".spinner".into(),
                ".pace".into(),
            ],
            validation: vec![
                ".validation-summary".into(),
                ".alert-danger".into(),
                ".text-danger".into(),
                "span[id*='val']".into(),
                "span.field-validation-error".into(),
            ],
        }
    }
}

impl LocatorConfig {
    pub fn username_locator(&self) -> Locator {
        Locator::any_of(self.username.clone())
    }

    pub fn password_locator(&self) -> Locator {
        Locator::any_of(self.password.clone())
    }

    pub fn submit_locator(&self) -> Locator {
        Locator::any_of(self.submit.clone())
    }

    pub fn overlay_locator(&self) -> Locator {
        Locator::any_of(self.overlay.clone())
    }

    pub fn validation_locators(&self) -> Vec<Locator> {
        self.validation.iter().map(|s| Locator::css(s.clone())).collect()
    }
}

/// Per-wait budgets, all in milliseconds, sharing one poll interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub document_ready_ms: u64,
    /// Visibility wait for the credential fields.
    pub field_ms: u64,
    /// Clickability wait for the submit control.
    pub clickable_ms: u64,
    /// Overlay-invisibility wait (tolerated on timeout).
    pub overlay_ms: u64,
    /// Budget for the post-login verdict.
    pub post_login_ms: u64,
    /// Presence wait in the top-level document during frame resolution.
    pub top_level_ms: u64,
    /// Presence wait per child frame; deliberately shorter than the
    /// top-level wait since most frames will not match.
    pub per_frame_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            document_ready_ms: 30_000,
            field_ms: 20_000,
            clickable_ms: 15_000,
            overlay_ms: 10_000,
            post_login_ms: 20_000,
            top_level_ms: 3_000,
            per_frame_ms: 1_500,
            poll_interval_ms: 500,
        }
    }
}

impl TimeoutConfig {
    fn spec(&self, timeout_ms: u64) -> WaitSpec {
        WaitSpec::from_millis(timeout_ms, self.poll_interval_ms)
    }

    pub fn document_ready(&self) -> WaitSpec {
        self.spec(self.document_ready_ms)
    }

    pub fn field(&self) -> WaitSpec {
        self.spec(self.field_ms)
    }

    pub fn clickable(&self) -> WaitSpec {
        self.spec(self.clickable_ms)
    }

    pub fn overlay(&self) -> WaitSpec {
        self.spec(self.overlay_ms)
    }

    pub fn post_login(&self) -> WaitSpec {
        self.spec(self.post_login_ms)
    }

    pub fn top_level(&self) -> WaitSpec {
        self.spec(self.top_level_ms)
    }

    pub fn per_frame(&self) -> WaitSpec {
        self.spec(self.per_frame_ms)
    }
}

/// Success heuristics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessConfig {
    /// Post-login URL fragments.
    pub url_fragments: Vec<String>,
    /// Post-login title fragments.
    pub title_fragments: Vec<String>,
    /// Whether leaving all login entry URLs counts as (weak) success.
    pub away_from_login: bool,
}

impl Default for SuccessConfig {
    fn default() -> Self {
        Self {
            url_fragments: vec!["advanced".into(), "dashboard".into()],
            title_fragments: vec!["advanced".into(), "dashboard".into()],
            away_from_login: true,
        }
    }
}

impl SuccessConfig {
    /// Ordered, OR-combined signal list; the weak away-from-login
    /// fallback always comes last.
    pub fn signals(&self) -> Vec<SuccessSignal> {
        let mut signals = Vec::new();
        if !self.url_fragments.is_empty() {
            signals.push(SuccessSignal::UrlContains(self.url_fragments.clone()));
        }
        if !self.title_fragments.is_empty() {
            signals.push(SuccessSignal::TitleContains(self.title_fragments.clone()));
        }
        if self.away_from_login {
            signals.push(SuccessSignal::AwayFromLogin);
        }
        signals
    }
}

/// Browser session options, applied by the adapter when it builds the
/// underlying driver session. Fingerprint normalization here is plain
/// session configuration, not core logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub headless: bool,
    pub window_size: String,
    pub user_agent: Option<String>,
    pub accept_insecure_certs: bool,
    /// Disable the automation-controlled blink feature and similar
    /// giveaways.
    pub normalize_fingerprint: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: "1920,1080".into(),
            user_agent: None,
            accept_insecure_certs: true,
            normalize_fingerprint: true,
        }
    }
}

/// Complete configuration for one login verification flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub urls: UrlConfig,
    pub locators: LocatorConfig,
    pub timeouts: TimeoutConfig,
    pub success: SuccessConfig,
    pub session: SessionOptions,
    /// Frame nesting levels to search. 1 matches the observed structure;
    /// deeper trees need no redesign, only a bigger number.
    pub frame_depth: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            urls: UrlConfig::default(),
            locators: LocatorConfig::default(),
            timeouts: TimeoutConfig::default(),
            success: SuccessConfig::default(),
            session: SessionOptions::default(),
            frame_depth: 1,
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.urls.primary.is_empty() {
            return Err(ConfigError::Invalid("urls.primary must be set".into()));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "timeouts.poll_interval_ms must be nonzero".into(),
            ));
        }
        if self.locators.username.is_empty() || self.locators.password.is_empty() {
            return Err(ConfigError::Invalid(
                "username and password locators must be set".into(),
            ));
        }
        Ok(())
    }

    pub fn effective_frame_depth(&self) -> usize {
        self.frame_depth.max(1)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./keyturn.yaml
    /// 2. ~/.keyturn/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<FlowConfig, ConfigError> {
        let local_config = PathBuf::from("./keyturn.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".keyturn").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(FlowConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<FlowConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: FlowConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
