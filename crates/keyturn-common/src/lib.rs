pub mod credentials;
pub mod error;
pub mod locator;
pub mod outcome;

pub use credentials::Credentials;
pub use error::SessionError;
pub use locator::Locator;
pub use outcome::{ActionOutcome, Diagnostics, Outcome};
