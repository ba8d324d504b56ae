//! Static consistency checks for keepalived configuration files.
//!
//! Loads a configuration tree (following `include` directives), scopes the
//! VRRP and virtual-server directives to their enclosing blocks, and reports
//! duplicate identifiers, dangling group references and virtual servers on
//! addresses no VRRP instance manages.
//!
//! # Components
//!
//! - **Loader**: reads files, strips comments, expands includes
//! - **Extractors**: ordered (pattern, handler) table of recognized directives
//! - **BlockParser**: tracks brace depth and the open VRRP instance
//! - **Validator**: runs the consistency checks
//!
//! # Example
//!
//! ```no_run
//! use keepalived_conf::{ParsedConfig, Validator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ParsedConfig::load("/etc/keepalived/keepalived.conf")?;
//! let report = Validator::new(&config).run();
//! for finding in report.findings().filter(|f| !f.passed()) {
//!     println!("{}", finding.check);
//!     for violation in &finding.violations {
//!         println!("  {} at {:?}", violation.key, violation.locations);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extractors;
pub mod loader;
pub mod parser;
pub mod types;
pub mod validate;

pub use error::{LoadError, Result};
pub use extractors::{Directive, precedence};
pub use loader::{DEFAULT_MAX_INCLUDE_DEPTH, Loader, LoaderOptions};
pub use parser::{BlockParser, ParsedConfig, parse, parse_str};
pub use types::{
    DEFAULT_PRIORITY, InstanceBinding, Priority, Protocol, RawLine, SourceLocation,
    StructuralWarning, VirtualIp, VirtualRouterId, VirtualServer, VirtualServerGroup,
    VirtualServerGroupEndpoint, VrrpInstance, WarningKind,
};
pub use validate::{Check, Finding, GroupReport, ValidationReport, Validator, Violation};
