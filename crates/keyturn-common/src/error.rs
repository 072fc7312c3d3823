use thiserror::Error;

/// Errors surfaced by a browser session adapter.
///
/// Transient conditions (`Intercepted`, `Detached`) are recovered inline by
/// the components that trigger them and never escape the engine; structural
/// conditions (`ElementNotFound`) terminate the flow.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A required locator matched nothing in any explored frame.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A click was obstructed by another element (overlay, backdrop).
    #[error("click intercepted on: {0}")]
    Intercepted(String),

    /// The target frame or element went away mid-operation (navigation,
    /// rerender). Treated as a non-match by frame probing.
    #[error("stale or detached context: {0}")]
    Detached(String),

    /// Script evaluation failed.
    #[error("script error: {0}")]
    Script(String),

    /// Any other backend/transport failure.
    #[error("session backend error: {0}")]
    Backend(String),
}
