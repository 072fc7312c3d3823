//! Chrome WebDriver backend for the login verification engine.

pub mod adapter;
pub mod driver;
