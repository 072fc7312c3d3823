//! Harvest visible validation text for failure diagnostics.

use crate::session::Session;
use keyturn_common::Locator;
use tracing::debug;

/// Collects visible validation/error text from a configured container set
/// within the current frame context.
///
/// Purely diagnostic enrichment: it never errors and its output is never
/// an input to the outcome decision. Missing containers, invisible nodes,
/// and session hiccups all just shrink the result, down to an empty
/// string.
pub struct ErrorExtractor {
    containers: Vec<Locator>,
}

impl ErrorExtractor {
    pub fn new(containers: Vec<Locator>) -> Self {
        Self { containers }
    }

    /// Visible validation text in document order, newline-joined, trimmed.
    pub async fn extract<S: Session>(&self, session: &mut S) -> String {
        let mut collected: Vec<String> = Vec::new();
        for container in &self.containers {
            match Self::visible_text(session, container).await {
                Ok(mut lines) => collected.append(&mut lines),
                Err(e) => {
                    debug!(container = %container, error = %e, "validation scan failed, ignoring");
                }
            }
        }
        collected.join("\n").trim().to_string()
    }

    async fn visible_text<S: Session>(
        session: &mut S,
        container: &Locator,
    ) -> Result<Vec<String>, keyturn_common::SessionError> {
        let mut lines = Vec::new();
        for element in session.find_elements(container).await? {
            if !session.is_visible(&element).await? {
                continue;
            }
            let text = session.text(&element).await?;
            let text = text.trim();
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        Ok(lines)
    }
}
