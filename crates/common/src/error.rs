//! Errors shared by the keepalived-check collaborators.
//!
//! Configuration loading has its own error type in `keepalived-conf`; this
//! one covers what happens around it: querying the host and emitting reports.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The local interface addresses could not be listed.
    #[error("host query failed: {0}")]
    HostQuery(String),

    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn host_query(msg: impl fmt::Display) -> Self {
        Error::HostQuery(msg.to_string())
    }

    /// Whether the status phase failed rather than report output.
    pub fn is_host_query(&self) -> bool {
        matches!(self, Error::HostQuery(_))
    }
}
