use async_trait::async_trait;
use keyturn_common::{Locator, SessionError};

/// WebDriver key code for Enter, used for the no-button submission fallback.
pub const ENTER_KEY: &str = "\u{e007}";

/// Script evaluated to probe document readiness.
pub const READY_STATE_SCRIPT: &str = "return document.readyState;";

/// Script that scrolls its element argument into the viewport center
/// before a click attempt.
pub const SCROLL_INTO_VIEW_SCRIPT: &str = "arguments[0].scrollIntoView({block:'center'});";

/// Script for the programmatic click fallback when a native click is
/// intercepted by an overlay.
pub const JS_CLICK_SCRIPT: &str = "arguments[0].click();";

/// An argument passed to `Session::execute_script`.
#[derive(Debug, Clone)]
pub enum ScriptArg<E> {
    Element(E),
    Json(serde_json::Value),
}

/// Capability surface of one browser document, implemented by an adapter.
///
/// All element lookups are implicitly scoped to the session's active frame
/// context; `switch_to_frame`/`switch_to_default` move that scope. One flow
/// execution owns one session at a time, so the trait takes `&mut self`
/// throughout and needs no internal locking.
#[async_trait]
pub trait Session: Send {
    /// Adapter-specific element handle.
    type Element: Clone + Send + Sync;
    /// Adapter-specific window/tab handle.
    type Window: Clone + PartialEq + Send + Sync;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;
    async fn current_url(&mut self) -> Result<String, SessionError>;
    async fn title(&mut self) -> Result<String, SessionError>;

    /// All elements matching the locator in the active frame context,
    /// in document order. An empty result is not an error.
    async fn find_elements(
        &mut self,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, SessionError>;

    async fn is_visible(&mut self, element: &Self::Element) -> Result<bool, SessionError>;
    async fn is_clickable(&mut self, element: &Self::Element) -> Result<bool, SessionError>;
    async fn clear(&mut self, element: &Self::Element) -> Result<(), SessionError>;
    async fn send_keys(&mut self, element: &Self::Element, text: &str)
    -> Result<(), SessionError>;
    async fn click(&mut self, element: &Self::Element) -> Result<(), SessionError>;
    async fn text(&mut self, element: &Self::Element) -> Result<String, SessionError>;

    /// Enter the child frame at `index` of the active context.
    async fn switch_to_frame(&mut self, index: u16) -> Result<(), SessionError>;
    /// Reset the active context to the top-level document.
    async fn switch_to_default(&mut self) -> Result<(), SessionError>;

    async fn window_handles(&mut self) -> Result<Vec<Self::Window>, SessionError>;
    async fn current_window(&mut self) -> Result<Self::Window, SessionError>;
    async fn switch_to_window(&mut self, window: &Self::Window) -> Result<(), SessionError>;

    /// Evaluate a script in the active context. Used only for the
    /// document-readiness probe, scroll-into-view, and the fallback click.
    async fn execute_script(
        &mut self,
        script: &str,
        args: Vec<ScriptArg<Self::Element>>,
    ) -> Result<serde_json::Value, SessionError>;

    /// Tear down the underlying browser session. Called exactly once per
    /// flow, on every exit path.
    async fn close(&mut self) -> Result<(), SessionError>;
}
