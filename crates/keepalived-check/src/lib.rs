//! keepalived-check
//!
//! Command-line front end for `keepalived-conf`: validates a keepalived
//! configuration, then checks that the VIPs of each VRRP instance are where
//! its priority says they should be.

pub mod app;
pub mod cli;
pub mod report;
pub mod settings;
pub mod status;

pub use app::{RunOptions, RunOutcome, exit_code, run};
pub use cli::{Cli, OutputFormat};
pub use report::{Renderer, render_json};
pub use settings::{Settings, SettingsError};
pub use status::{AddressSource, InterfaceAddresses, StatusChecker, StatusReport};
