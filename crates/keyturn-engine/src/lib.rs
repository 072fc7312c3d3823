pub mod config;
pub mod detect;
pub mod extract;
pub mod flow;
pub mod frame;
pub mod session;
pub mod submit;
pub mod wait;

pub use keyturn_common::{
    ActionOutcome, Credentials, Diagnostics, Locator, Outcome, SessionError,
};
