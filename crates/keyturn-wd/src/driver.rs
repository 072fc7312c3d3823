//! Chromedriver process management: discovery, launch, readiness, teardown.

use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Standard chromedriver port.
pub const DEFAULT_DRIVER_PORT: u16 = 9515;

/// Common paths where chromedriver might be installed.
const CHROMEDRIVER_PATHS: &[&str] = &[
    "/usr/bin/chromedriver",
    "/usr/local/bin/chromedriver",
    "/usr/lib/chromium-browser/chromedriver",
    "/opt/homebrew/bin/chromedriver",
    "/snap/bin/chromium.chromedriver",
];

/// Returns the default WebDriver URL for a local chromedriver instance.
pub fn default_driver_url() -> String {
    format!("http://localhost:{}", DEFAULT_DRIVER_PORT)
}

/// Find the chromedriver binary: PATH first, then common install locations.
pub fn find_chromedriver_binary() -> Option<String> {
    if let Ok(output) = Command::new("which").arg("chromedriver").output()
        && output.status.success()
        && let Ok(path) = String::from_utf8(output.stdout)
    {
        let path = path.trim();
        if !path.is_empty() {
            return Some(path.to_string());
        }
    }

    for path in CHROMEDRIVER_PATHS {
        if std::path::Path::new(path).exists() {
            return Some(path.to_string());
        }
    }

    None
}

/// Handle to a running chromedriver process. Killed on drop so a panicking
/// caller never leaks a driver.
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    /// The WebDriver URL served by this instance.
    pub fn webdriver_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        info!("Shutting down chromedriver process...");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Launch chromedriver on `port` and wait until its /status endpoint
/// reports ready.
pub async fn launch_chromedriver(port: u16) -> Result<DriverProcess, String> {
    let driver_path = find_chromedriver_binary().ok_or_else(|| {
        "chromedriver not found. Install it or point --webdriver-url at a running server"
            .to_string()
    })?;

    info!("Launching chromedriver from: {}", driver_path);

    let child = Command::new(&driver_path)
        .arg(format!("--port={}", port))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("Failed to launch chromedriver: {}", e))?;

    info!("chromedriver launched with PID: {}", child.id());

    let url = format!("http://localhost:{}/status", port);
    let client = reqwest::Client::new();

    for attempt in 1..=30 {
        sleep(Duration::from_millis(200)).await;

        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("chromedriver ready after {} attempts", attempt);
                return Ok(DriverProcess { child, port });
            }
            Ok(_) => {
                warn!("chromedriver responded but not ready yet (attempt {})", attempt);
            }
            Err(_) => {
                if attempt % 5 == 0 {
                    info!("Waiting for chromedriver... (attempt {})", attempt);
                }
            }
        }
    }

    Err("chromedriver did not become ready within timeout".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_uses_standard_port() {
        assert_eq!(default_driver_url(), "http://localhost:9515");
    }

    #[test]
    fn binary_discovery_does_not_panic() {
        // Actual availability depends on the system.
        let _ = find_chromedriver_binary();
    }
}
