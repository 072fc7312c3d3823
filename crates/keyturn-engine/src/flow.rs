//! End-to-end orchestration: navigate, resolve the login frame, submit,
//! evaluate, and package one `Outcome` with diagnostics.

use crate::config::FlowConfig;
use crate::detect::{FlowState, SuccessDetector};
use crate::extract::ErrorExtractor;
use crate::frame::FrameResolver;
use crate::session::{READY_STATE_SCRIPT, Session};
use crate::submit::{FormLocators, Submitter};
use crate::wait::{WaitError, poll_until, probe};
use keyturn_common::{Credentials, Diagnostics, Outcome, SessionError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FlowError {
    /// The expected login form structure was not found in any explored
    /// frame. Structural, fatal, not retried.
    #[error("login form not found: {0}")]
    FormNotFound(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Runs one login verification flow over an exclusively owned session.
pub struct LoginFlow {
    config: FlowConfig,
}

impl LoginFlow {
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Execute the full pipeline and close the session.
    ///
    /// The session is torn down on every exit path, success or failure; a
    /// close failure is logged but never overrides the flow result.
    pub async fn execute<S: Session>(
        &self,
        session: &mut S,
        credentials: &Credentials,
    ) -> Result<Outcome, FlowError> {
        let result = self.run(session, credentials).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "session teardown failed");
        }
        result
    }

    async fn run<S: Session>(
        &self,
        session: &mut S,
        credentials: &Credentials,
    ) -> Result<Outcome, FlowError> {
        if let Some(elapsed) = self.open_login_page(session).await? {
            warn!(?elapsed, "login page never became ready");
            let diagnostics = self.diagnostics(session, String::new()).await;
            return Ok(Outcome::TimedOut(diagnostics));
        }

        let resolver = FrameResolver::new(self.config.effective_frame_depth());
        let username_locator = self.config.locators.username_locator();
        let context = resolver
            .resolve(
                session,
                &username_locator,
                &self.config.timeouts.top_level(),
                &self.config.timeouts.per_frame(),
            )
            .await?
            .ok_or_else(|| FlowError::FormNotFound(username_locator.as_css()))?;
        info!(context = %context, "login form located");

        let submitter = Submitter::new(
            self.config.timeouts.field(),
            self.config.timeouts.clickable(),
        );
        let locators = FormLocators {
            username: username_locator,
            password: self.config.locators.password_locator(),
            submit: self.config.locators.submit_locator(),
        };
        let action = submitter.submit(session, &locators, credentials).await?;
        info!(?action, "submission fired");

        let mut detector = SuccessDetector::new(
            self.config.success.signals(),
            self.config.urls.login_fragments.clone(),
            self.config.locators.overlay_locator(),
            self.config.timeouts.document_ready(),
            self.config.timeouts.overlay(),
            self.config.timeouts.post_login(),
        );
        match detector.evaluate(session).await {
            Ok(FlowState::Success) => Ok(Outcome::Success),
            Ok(state) => {
                info!(?state, "login not confirmed, harvesting diagnostics");
                let text = self.harvest_validation(session).await;
                Ok(Outcome::Failure(self.diagnostics(session, text).await))
            }
            Err(WaitError::TimedOut { elapsed }) => {
                warn!(?elapsed, "post-login stabilization timed out");
                let text = self.harvest_validation(session).await;
                Ok(Outcome::TimedOut(self.diagnostics(session, text).await))
            }
            Err(WaitError::Session(e)) => Err(e.into()),
        }
    }

    /// Navigate to the primary entry URL; if a forced redirect lands on
    /// neither known login page, navigate explicitly to the fallback.
    /// Returns the elapsed duration when readiness timed out, so the
    /// caller can turn it into a `TimedOut` outcome instead of an error.
    async fn open_login_page<S: Session>(
        &self,
        session: &mut S,
    ) -> Result<Option<std::time::Duration>, SessionError> {
        session.navigate(&self.config.urls.primary).await?;
        match self.await_ready(session).await {
            Ok(()) => {}
            Err(WaitError::TimedOut { elapsed }) => return Ok(Some(elapsed)),
            Err(WaitError::Session(e)) => return Err(e),
        }

        if let Some(fallback) = &self.config.urls.fallback {
            let url = session.current_url().await?.to_lowercase();
            let on_known_entry = self
                .config
                .urls
                .login_fragments
                .iter()
                .any(|f| url.contains(&f.to_lowercase()));
            if !on_known_entry {
                info!(%url, "redirected off known entry pages, navigating to fallback");
                session.navigate(fallback).await?;
                match self.await_ready(session).await {
                    Ok(()) => {}
                    Err(WaitError::TimedOut { elapsed }) => return Ok(Some(elapsed)),
                    Err(WaitError::Session(e)) => return Err(e),
                }
            }
        }
        Ok(None)
    }

    async fn await_ready<S: Session>(&self, session: &mut S) -> Result<(), WaitError> {
        poll_until(
            &self.config.timeouts.document_ready(),
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

    async fn harvest_validation<S: Session>(&self, session: &mut S) -> String {
        let extractor = ErrorExtractor::new(self.config.locators.validation_locators());
        extractor.extract(session).await
    }

    /// Final-state diagnostics; best effort, readable even when the
    /// session is half gone.
    async fn diagnostics<S: Session>(&self, session: &mut S, validation_text: String) -> Diagnostics {
        Diagnostics {
            url: session.current_url().await.unwrap_or_default(),
            title: session.title().await.unwrap_or_default(),
            validation_text,
        }
    }
}
