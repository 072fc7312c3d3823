//! Post-submission success heuristics.
//!
//! No server-issued signal tells us whether the login worked, so the
//! verdict comes from an ordered list of independently sufficient signals
//! (OR-combined), evaluated only after the page has stabilized.

use crate::session::{READY_STATE_SCRIPT, Session};
use crate::wait::{WaitError, WaitSpec, poll_until, probe};
use keyturn_common::Locator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Detector state machine. `Pending` is initial; `Success` and `Failure`
/// are terminal; `Unknown` means the budget ran out with no signal either
/// way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Pending,
    Success,
    Failure,
    Unknown,
}

/// One independently sufficient success heuristic.
///
/// The original flow variants disagreed on whether "title contains a
/// keyword" or "URL no longer looks like the login page" counts as
/// success, so each stays a separately configurable signal instead of a
/// single canonical rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessSignal {
    /// The current URL contains any of these fragments (case-insensitive).
    UrlContains(Vec<String>),
    /// The current title contains any of these fragments (case-insensitive).
    TitleContains(Vec<String>),
    /// Weak final fallback: the URL no longer contains any login entry
    /// fragment. Only meaningful once document readiness has stabilized.
    AwayFromLogin,
}

impl SuccessSignal {
    fn holds(&self, url: &str, title: &str, login_fragments: &[String]) -> bool {
        match self {
            SuccessSignal::UrlContains(fragments) => contains_any(url, fragments),
            SuccessSignal::TitleContains(fragments) => contains_any(title, fragments),
            SuccessSignal::AwayFromLogin => !contains_any(url, login_fragments),
        }
    }
}

fn contains_any(haystack: &str, fragments: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    fragments
        .iter()
        .any(|f| !f.is_empty() && haystack.contains(&f.to_lowercase()))
}

/// Evaluates the post-submission state once per flow and never regresses
/// after a verdict is reached.
pub struct SuccessDetector {
    signals: Vec<SuccessSignal>,
    login_fragments: Vec<String>,
    overlay: Locator,
    ready_spec: WaitSpec,
    overlay_spec: WaitSpec,
    verdict_spec: WaitSpec,
    resolved: Option<FlowState>,
}

impl SuccessDetector {
    pub fn new(
        signals: Vec<SuccessSignal>,
        login_fragments: Vec<String>,
        overlay: Locator,
        ready_spec: WaitSpec,
        overlay_spec: WaitSpec,
        verdict_spec: WaitSpec,
    ) -> Self {
        Self {
            signals,
            login_fragments,
            overlay,
            ready_spec,
            overlay_spec,
            verdict_spec,
            resolved: None,
        }
    }

    /// Current state without touching the session.
    pub fn state(&self) -> FlowState {
        self.resolved.unwrap_or(FlowState::Pending)
    }

    /// Stabilize the page, then read URL/title and apply the signal list.
    ///
    /// Re-evaluating a resolved detector returns the cached verdict; a
    /// flow evaluates once, and the state machine is monotonic within it.
    /// A readiness timeout surfaces as `WaitError::TimedOut` so the
    /// orchestrator can produce a `TimedOut` outcome with diagnostics.
    pub async fn evaluate<S: Session>(&mut self, session: &mut S) -> Result<FlowState, WaitError> {
        if let Some(state) = self.resolved {
            return Ok(state);
        }

        self.await_document_ready(session).await?;
        self.await_overlay_gone(session).await?;
        Self::follow_newest_window(session).await?;

        let state = self.await_verdict(session).await?;
        info!(?state, "post-login evaluation complete");
        self.resolved = Some(state);
        Ok(state)
    }

    /// A transitional blank page would satisfy "URL changed" spuriously,
    /// so URL/title are only read once the ready signal stabilizes.
    async fn await_document_ready<S: Session>(&self, session: &mut S) -> Result<(), WaitError> {
        poll_until(
            &self.ready_spec,
            session,
            probe(|s: &mut S| {
                Box::pin(async move {
                    let value = s.execute_script(READY_STATE_SCRIPT, Vec::new()).await?;
                    Ok(if value.as_str() == Some("complete") {
                        Some(())
                    } else {
                        None
                    })
                })
            }),
        )
        .await
    }

    /// Wait for a known transient overlay/spinner to become invisible.
    /// Its absence is fine; only a stuck overlay is worth logging.
    async fn await_overlay_gone<S: Session>(&self, session: &mut S) -> Result<(), WaitError> {
        if self.overlay.is_empty() {
            return Ok(());
        }
        let overlay = self.overlay.clone();
        let waited = poll_until(
            &self.overlay_spec,
            session,
            probe(move |s: &mut S| {
                let overlay = overlay.clone();
                Box::pin(async move {
                    for element in s.find_elements(&overlay).await? {
                        if s.is_visible(&element).await? {
                            return Ok(None);
                        }
                    }
                    Ok(Some(()))
                })
            }),
        )
        .await;
        match waited {
            Ok(()) => Ok(()),
            Err(WaitError::TimedOut { elapsed }) => {
                warn!(?elapsed, "overlay still visible, evaluating anyway");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// If submission opened a new window/tab, move the active handle to
    /// the most recently opened one; evaluating the original window would
    /// read stale state.
    async fn follow_newest_window<S: Session>(session: &mut S) -> Result<(), WaitError> {
        let current = session.current_window().await?;
        let handles = session.window_handles().await?;
        let newest = handles.iter().filter(|h| **h != current).next_back();
        if let Some(handle) = newest {
            debug!("following newly opened window");
            session.switch_to_window(handle).await?;
        }
        Ok(())
    }

    async fn await_verdict<S: Session>(&self, session: &mut S) -> Result<FlowState, WaitError> {
        let signals = self.signals.clone();
        let login_fragments = self.login_fragments.clone();
        let waited = poll_until(
            &self.verdict_spec,
            session,
            probe(move |s: &mut S| {
                let signals = signals.clone();
                let login_fragments = login_fragments.clone();
                Box::pin(async move {
                    let url = s.current_url().await?;
                    let title = s.title().await?;
                    let success = signals
                        .iter()
                        .any(|sig| sig.holds(&url, &title, &login_fragments));
                    Ok(if success { Some(FlowState::Success) } else { None })
                })
            }),
        )
        .await;

        match waited {
            Ok(state) => Ok(state),
            Err(WaitError::TimedOut { .. }) => {
                // Full budget elapsed with no success signal. Still on a
                // login entry URL means the submission was rejected.
                let url = session.current_url().await?;
                if contains_any(&url, &self.login_fragments) {
                    Ok(FlowState::Failure)
                } else {
                    Ok(FlowState::Unknown)
                }
            }
            Err(e) => Err(e),
        }
    }
}
