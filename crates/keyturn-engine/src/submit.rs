//! Credential fill and form submission with explicit fallback branches.

use crate::session::{ENTER_KEY, JS_CLICK_SCRIPT, SCROLL_INTO_VIEW_SCRIPT, ScriptArg, Session};
use crate::wait::{WaitError, WaitSpec, poll_until, probe};
use keyturn_common::{ActionOutcome, Credentials, Locator, SessionError};
use tracing::{debug, info, warn};

/// Locator set for the three login form roles.
#[derive(Debug, Clone)]
pub struct FormLocators {
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
}

/// Fills credentials and fires exactly one net submission per invocation.
pub struct Submitter {
    field_spec: WaitSpec,
    clickable_spec: WaitSpec,
}

impl Submitter {
    pub fn new(field_spec: WaitSpec, clickable_spec: WaitSpec) -> Self {
        Self {
            field_spec,
            clickable_spec,
        }
    }

    /// Locate, clear, and fill both credential fields in the session's
    /// active frame context, then submit.
    ///
    /// Submission order of preference: native click on the first submit
    /// candidate; on interception or a clickability timeout, a single
    /// programmatic activation of that same element; with no candidate at
    /// all, a terminal Enter key on the password field. Exactly one of
    /// the three fires.
    ///
    /// A missing username or password field is structural
    /// (`ElementNotFound`) and fatal to the flow; there is no retry.
    pub async fn submit<S: Session>(
        &self,
        session: &mut S,
        locators: &FormLocators,
        credentials: &Credentials,
    ) -> Result<ActionOutcome, SessionError> {
        let username_field = self.visible_field(session, &locators.username).await?;
        let password_field = self.visible_field(session, &locators.password).await?;

        // Clearing first is mandatory: browser autofill may have
        // pre-populated either field.
        session.clear(&username_field).await?;
        session.clear(&password_field).await?;
        session
            .send_keys(&username_field, credentials.username())
            .await?;
        session
            .send_keys(&password_field, credentials.password())
            .await?;
        debug!(username = credentials.username(), "credentials filled");

        let candidates = session.find_elements(&locators.submit).await?;
        let Some(button) = candidates.into_iter().next() else {
            info!("no submit control, sending Enter on password field");
            session.send_keys(&password_field, ENTER_KEY).await?;
            return Ok(ActionOutcome::SubmittedViaKey);
        };

        session
            .execute_script(
                SCROLL_INTO_VIEW_SCRIPT,
                vec![ScriptArg::Element(button.clone())],
            )
            .await?;

        match self.click_when_ready(session, &button).await {
            Ok(()) => Ok(ActionOutcome::Clicked),
            Err(WaitError::Session(SessionError::Intercepted(what))) => {
                warn!(target = %what, "click intercepted, activating programmatically");
                self.js_click(session, &button).await?;
                Ok(ActionOutcome::ClickedViaFallback)
            }
            Err(WaitError::TimedOut { elapsed }) => {
                warn!(?elapsed, "submit control never became clickable, activating programmatically");
                self.js_click(session, &button).await?;
                Ok(ActionOutcome::ClickedViaFallback)
            }
            Err(WaitError::Session(e)) => Err(e),
        }
    }

    /// First visible element matching `locator`, waited for with the
    /// field budget. A timeout converts to `ElementNotFound`: the expected
    /// form structure is simply not there.
    async fn visible_field<S: Session>(
        &self,
        session: &mut S,
        locator: &Locator,
    ) -> Result<S::Element, SessionError> {
        let target = locator.clone();
        let waited = poll_until(
            &self.field_spec,
            session,
            probe(move |s: &mut S| {
                let target = target.clone();
                Box::pin(async move {
                    for element in s.find_elements(&target).await? {
                        if s.is_visible(&element).await? {
                            return Ok(Some(element));
                        }
                    }
                    Ok(None)
                })
            }),
        )
        .await;
        match waited {
            Ok(element) => Ok(element),
            Err(WaitError::TimedOut { .. }) => {
                Err(SessionError::ElementNotFound(locator.as_css()))
            }
            Err(WaitError::Session(e)) => Err(e),
        }
    }

    /// Bounded wait for clickability followed by one native click.
    async fn click_when_ready<S: Session>(
        &self,
        session: &mut S,
        button: &S::Element,
    ) -> Result<(), WaitError> {
        let target = button.clone();
        poll_until(
            &self.clickable_spec,
            session,
            probe(move |s: &mut S| {
                let target = target.clone();
                Box::pin(async move {
                    Ok(if s.is_clickable(&target).await? {
                        Some(())
                    } else {
                        None
                    })
                })
            }),
        )
        .await?;
        session.click(button).await?;
        Ok(())
    }

    async fn js_click<S: Session>(
        &self,
        session: &mut S,
        button: &S::Element,
    ) -> Result<(), SessionError> {
        session
            .execute_script(JS_CLICK_SCRIPT, vec![ScriptArg::Element(button.clone())])
            .await?;
        Ok(())
    }
}
