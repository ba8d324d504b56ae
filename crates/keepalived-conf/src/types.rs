//! Entity records extracted from a keepalived configuration.
//!
//! Every record carries the [`SourceLocation`] of the line that defined it.
//! Records are plain values: once the parser finalizes one it is never changed.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Priority keepalived assigns to an instance that declares none.
pub const DEFAULT_PRIORITY: u32 = 100;

/// File and 1-based line number of a directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// A directive with its comment stripped, as produced by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    pub location: SourceLocation,
}

impl RawLine {
    pub fn new(text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            text: text.into(),
            location,
        }
    }
}

/// Transport protocol of a virtual server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
    Other(String),
}

impl Protocol {
    /// Parse a protocol name. Matching is case-insensitive; unknown names are kept lower-cased.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            "sctp" => Protocol::Sctp,
            _ => Protocol::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
            Protocol::Other(name) => name,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One `vrrp_instance NAME { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VrrpInstance {
    pub name: String,
    pub location: SourceLocation,
}

/// A `virtual_router_id` directive inside a VRRP instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualRouterId {
    pub id: u32,
    /// Instance the directive was attributed to.
    pub instance: String,
    pub location: SourceLocation,
}

/// A `priority` directive inside a VRRP instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Priority {
    pub value: u32,
    pub instance: String,
    pub location: SourceLocation,
}

/// An address line inside a VRRP instance, i.e. a `virtual_ipaddress` entry.
///
/// The address is kept as written so that duplicates compare textually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualIp {
    pub address: String,
    pub instance: String,
    pub location: SourceLocation,
}

/// A `virtual_server VIP PORT { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualServer {
    pub vip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub location: SourceLocation,
}

impl VirtualServer {
    /// Identity of the service: address, port and protocol.
    pub fn key(&self) -> (&str, u16, &Protocol) {
        (&self.vip, self.port, &self.protocol)
    }
}

impl fmt::Display for VirtualServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.vip, self.port, self.protocol)
    }
}

/// A `virtual_server_group NAME { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualServerGroup {
    pub name: String,
    pub location: SourceLocation,
}

/// A `virtual_server group NAME { ... }` block: a virtual server backed by a named group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualServerGroupEndpoint {
    pub group: String,
    pub protocol: Protocol,
    pub location: SourceLocation,
}

/// Priority and addresses declared by one VRRP instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceBinding {
    pub name: String,
    pub priority: Option<u32>,
    pub vips: Vec<String>,
}

impl InstanceBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: None,
            vips: Vec::new(),
        }
    }

    /// Declared priority, or keepalived's default when the instance has none.
    pub fn effective_priority(&self) -> u32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// Why a line left the block structure in a suspicious state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// More closing braces than opening ones so far.
    NegativeDepth,
    /// Input ended while blocks were still open.
    UnclosedBlock,
}

/// A non-fatal structural problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralWarning {
    pub kind: WarningKind,
    pub depth: i64,
    pub text: String,
    pub location: SourceLocation,
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::NegativeDepth => write!(
                f,
                "config structure maybe wrong at {} (depth {}): {}",
                self.location,
                self.depth,
                self.text.trim()
            ),
            WarningKind::UnclosedBlock => write!(
                f,
                "{} block(s) still open at end of input, last line {}",
                self.depth, self.location
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = SourceLocation::new("/etc/keepalived/keepalived.conf", 12);
        assert_eq!(loc.to_string(), "/etc/keepalived/keepalived.conf:12");
    }

    #[test]
    fn test_protocol_from_name() {
        assert_eq!(Protocol::from_name("TCP"), Protocol::Tcp);
        assert_eq!(Protocol::from_name("udp"), Protocol::Udp);
        assert_eq!(Protocol::from_name("Sctp"), Protocol::Sctp);
        assert_eq!(Protocol::from_name("QUIC"), Protocol::Other("quic".into()));
        assert_eq!(Protocol::default().to_string(), "tcp");
    }

    #[test]
    fn test_virtual_server_display() {
        let vs = VirtualServer {
            vip: "10.0.0.5".into(),
            port: 80,
            protocol: Protocol::Udp,
            location: SourceLocation::new("a.conf", 1),
        };
        assert_eq!(vs.to_string(), "10.0.0.5:80/udp");
    }

    #[test]
    fn test_effective_priority_defaults() {
        let mut binding = InstanceBinding::new("VI_1");
        assert_eq!(binding.effective_priority(), DEFAULT_PRIORITY);
        binding.priority = Some(5);
        assert_eq!(binding.effective_priority(), 5);
    }
}
