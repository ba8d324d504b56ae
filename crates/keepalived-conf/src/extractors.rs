//! Directive recognizers used by the block parser.
//!
//! The table is evaluated top to bottom for every line. An extractor whose
//! pattern matches runs its handler, which either consumes the line (no later
//! extractor sees it) or lets it fall through. Extractors scoped to VRRP only
//! run while a `vrrp_instance` block is open, so an address inside that block
//! is always read as a virtual IP first.

use crate::parser::BlockParser;
use crate::types::{
    Protocol, SourceLocation, VirtualServer, VirtualServerGroup, VirtualServerGroupEndpoint,
};
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

/// Directive kinds in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    VrrpInstance,
    VirtualRouterId,
    Priority,
    VirtualIpAddress,
    VirtualServer,
    VirtualServerGroup,
    VirtualServerGroupEndpoint,
    Protocol,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Directive::VrrpInstance => "vrrp_instance",
            Directive::VirtualRouterId => "virtual_router_id",
            Directive::Priority => "priority",
            Directive::VirtualIpAddress => "virtual_ipaddress",
            Directive::VirtualServer => "virtual_server",
            Directive::VirtualServerGroup => "virtual_server_group",
            Directive::VirtualServerGroupEndpoint => "virtual_server group",
            Directive::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// Where an extractor is allowed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Anywhere,
    Vrrp,
}

/// What the parser does after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stop; the line is fully handled.
    Consumed,
    /// Keep trying the remaining extractors.
    FallThrough,
}

type Handler = fn(&mut BlockParser, &Captures<'_>, &SourceLocation) -> Outcome;

/// A (pattern, handler) pair.
pub struct Extractor {
    pub directive: Directive,
    pub scope: Scope,
    pattern: Regex,
    handler: Handler,
}

impl Extractor {
    fn new(directive: Directive, scope: Scope, pattern: &str, handler: Handler) -> Self {
        Self {
            directive,
            scope,
            pattern: Regex::new(pattern).expect("directive pattern is valid"),
            handler,
        }
    }

    /// Run the extractor against `text`. Returns `None` when the pattern does not match.
    pub(crate) fn apply(
        &self,
        parser: &mut BlockParser,
        text: &str,
        location: &SourceLocation,
    ) -> Option<Outcome> {
        let caps = self.pattern.captures(text)?;
        Some((self.handler)(parser, &caps, location))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("directive", &self.directive)
            .field("scope", &self.scope)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

const IPV4: &str = r"(?:\d{1,3}\.){3}\d{1,3}";

/// The extractor table, in precedence order.
pub static EXTRACTORS: LazyLock<Vec<Extractor>> = LazyLock::new(|| {
    vec![
        Extractor::new(
            Directive::VrrpInstance,
            Scope::Anywhere,
            r"(?i)^\s*vrrp_instance\s+(?P<name>[^{\s]+)",
            vrrp_instance,
        ),
        Extractor::new(
            Directive::VirtualRouterId,
            Scope::Vrrp,
            r"(?i)^\s*virtual_router_id\s+(?P<id>\d+)",
            virtual_router_id,
        ),
        Extractor::new(
            Directive::Priority,
            Scope::Vrrp,
            r"(?i)^\s*priority\s+(?P<value>\d+)",
            priority,
        ),
        Extractor::new(
            Directive::VirtualIpAddress,
            Scope::Vrrp,
            &format!(r"^\s*(?P<vip>{IPV4})\b"),
            virtual_ip,
        ),
        Extractor::new(
            Directive::VirtualServer,
            Scope::Anywhere,
            &format!(r"(?i)^\s*virtual_server\s+(?P<vip>{IPV4})\s+(?P<port>\d+)"),
            virtual_server,
        ),
        Extractor::new(
            Directive::VirtualServerGroup,
            Scope::Anywhere,
            r"(?i)^\s*virtual_server_group\s+(?P<name>[^{\s]+)",
            virtual_server_group,
        ),
        Extractor::new(
            Directive::VirtualServerGroupEndpoint,
            Scope::Anywhere,
            r"(?i)^\s*virtual_server\s+group\s+(?P<name>[^{\s]+)",
            virtual_server_group_endpoint,
        ),
        Extractor::new(
            Directive::Protocol,
            Scope::Anywhere,
            r"(?i)^\s*protocol\s+(?P<proto>[^\s{}]+)",
            protocol,
        ),
    ]
});

/// Directive kinds in the order the parser tries them.
pub fn precedence() -> Vec<Directive> {
    EXTRACTORS.iter().map(|e| e.directive).collect()
}

fn vrrp_instance(
    parser: &mut BlockParser,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Outcome {
    parser.open_vrrp_instance(&caps["name"], location);
    Outcome::Consumed
}

fn virtual_router_id(
    parser: &mut BlockParser,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Outcome {
    match caps["id"].parse::<u32>() {
        Ok(id) => {
            parser.add_router_id(id, location);
            Outcome::Consumed
        }
        Err(_) => Outcome::FallThrough,
    }
}

fn priority(parser: &mut BlockParser, caps: &Captures<'_>, location: &SourceLocation) -> Outcome {
    match caps["value"].parse::<u32>() {
        Ok(value) => {
            parser.add_priority(value, location);
            Outcome::Consumed
        }
        Err(_) => Outcome::FallThrough,
    }
}

fn virtual_ip(parser: &mut BlockParser, caps: &Captures<'_>, location: &SourceLocation) -> Outcome {
    parser.add_virtual_ip(&caps["vip"], location);
    Outcome::Consumed
}

fn virtual_server(
    parser: &mut BlockParser,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Outcome {
    let Ok(port) = caps["port"].parse::<u16>() else {
        return Outcome::FallThrough;
    };
    parser.start_virtual_server(VirtualServer {
        vip: caps["vip"].to_string(),
        port,
        protocol: Protocol::default(),
        location: location.clone(),
    });
    Outcome::Consumed
}

fn virtual_server_group(
    parser: &mut BlockParser,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Outcome {
    parser.start_group(VirtualServerGroup {
        name: caps["name"].to_string(),
        location: location.clone(),
    });
    Outcome::FallThrough
}

fn virtual_server_group_endpoint(
    parser: &mut BlockParser,
    caps: &Captures<'_>,
    location: &SourceLocation,
) -> Outcome {
    parser.start_group_endpoint(VirtualServerGroupEndpoint {
        group: caps["name"].to_string(),
        protocol: Protocol::default(),
        location: location.clone(),
    });
    Outcome::Consumed
}

fn protocol(parser: &mut BlockParser, caps: &Captures<'_>, _location: &SourceLocation) -> Outcome {
    parser.set_pending_protocol(Protocol::from_name(&caps["proto"]));
    Outcome::Consumed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(directive: Directive) -> &'static Extractor {
        EXTRACTORS
            .iter()
            .find(|e| e.directive == directive)
            .unwrap()
    }

    #[test]
    fn test_precedence_order() {
        assert_eq!(
            precedence(),
            vec![
                Directive::VrrpInstance,
                Directive::VirtualRouterId,
                Directive::Priority,
                Directive::VirtualIpAddress,
                Directive::VirtualServer,
                Directive::VirtualServerGroup,
                Directive::VirtualServerGroupEndpoint,
                Directive::Protocol,
            ]
        );
    }

    #[test]
    fn test_vrrp_scoped_extractors() {
        let scoped: Vec<_> = EXTRACTORS
            .iter()
            .filter(|e| e.scope == Scope::Vrrp)
            .map(|e| e.directive)
            .collect();
        assert_eq!(
            scoped,
            vec![
                Directive::VirtualRouterId,
                Directive::Priority,
                Directive::VirtualIpAddress
            ]
        );
    }

    #[test]
    fn test_patterns_are_case_insensitive_and_whitespace_tolerant() {
        assert!(extractor(Directive::VrrpInstance).is_match("  VRRP_INSTANCE   VI_1 {"));
        assert!(extractor(Directive::VirtualRouterId).is_match("\tVirtual_Router_Id 51"));
        assert!(extractor(Directive::Protocol).is_match("    PROTOCOL UDP"));
        assert!(!extractor(Directive::Priority).is_match("priority high"));
    }

    #[test]
    fn test_address_shapes() {
        let vip = extractor(Directive::VirtualIpAddress);
        assert!(vip.is_match("10.0.0.1"));
        assert!(vip.is_match("  192.168.1.10/24 dev eth0 label eth0:1"));
        assert!(!vip.is_match("10.0.0.1234"));
        assert!(!vip.is_match("lvs_sync_daemon_interface eth0"));
    }

    #[test]
    fn test_group_endpoint_does_not_match_group_definition() {
        let endpoint = extractor(Directive::VirtualServerGroupEndpoint);
        assert!(endpoint.is_match("virtual_server group backend_pool {"));
        assert!(!endpoint.is_match("virtual_server_group backend_pool {"));

        let vs = extractor(Directive::VirtualServer);
        assert!(!vs.is_match("virtual_server group backend_pool {"));
        assert!(vs.is_match("virtual_server 10.0.0.5 80 {"));
    }

    #[test]
    fn test_protocol_stops_at_brace() {
        let caps = extractor(Directive::Protocol)
            .pattern
            .captures("protocol tcp}")
            .unwrap();
        assert_eq!(&caps["proto"], "tcp");
    }
}
