use serde::{Deserialize, Serialize};

/// How the submitter actually fired the submission.
///
/// The fallback paths are visible variants of the contract rather than
/// hidden catch clauses, so tests can assert which branch ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Primary path: the submit control was clicked.
    Clicked,
    /// The click was intercepted or never became clickable; the same
    /// element was activated programmatically instead.
    ClickedViaFallback,
    /// No submit control existed; the password field received a terminal
    /// key press to trigger native form submission.
    SubmittedViaKey,
}

/// Final-state evidence packaged with a non-success outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// URL of the document at evaluation time.
    pub url: String,
    /// Title of the document at evaluation time.
    pub title: String,
    /// Visible validation/error text harvested from the page, possibly empty.
    pub validation_text: String,
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "URL={} Title={}", self.url, self.title)?;
        if !self.validation_text.is_empty() {
            write!(f, "\nVisible validation/errors:\n{}", self.validation_text)?;
        }
        Ok(())
    }
}

/// Result of one end-to-end login flow. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure(Diagnostics),
    TimedOut(Diagnostics),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(d) | Outcome::TimedOut(d) => Some(d),
        }
    }
}
