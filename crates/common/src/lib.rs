//! Common utilities and types shared across keepalived-check components.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
