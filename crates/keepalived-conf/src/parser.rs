//! Block parser: scopes directives to their enclosing blocks.
//!
//! Nesting is tracked by counting brace characters per line. A VRRP instance
//! scope lasts from its `vrrp_instance` line until depth returns to where it
//! was opened. Virtual servers, groups and group endpoints stay pending until
//! depth returns to 0, then they are finalized into their collections.

use crate::error::Result;
use crate::extractors::{EXTRACTORS, Outcome, Scope};
use crate::loader::{Loader, LoaderOptions, strip_comment};
use crate::types::{
    InstanceBinding, Priority, Protocol, RawLine, SourceLocation, StructuralWarning, VirtualIp,
    VirtualRouterId, VirtualServer, VirtualServerGroup, VirtualServerGroupEndpoint, VrrpInstance,
    WarningKind,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything extracted from one configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedConfig {
    pub vrrp_instances: Vec<VrrpInstance>,
    pub router_ids: Vec<VirtualRouterId>,
    pub priorities: Vec<Priority>,
    pub virtual_ips: Vec<VirtualIp>,
    pub virtual_servers: Vec<VirtualServer>,
    pub groups: Vec<VirtualServerGroup>,
    pub group_endpoints: Vec<VirtualServerGroupEndpoint>,
    /// Per-instance priority and addresses, in declaration order.
    pub bindings: Vec<InstanceBinding>,
    pub warnings: Vec<StructuralWarning>,
    /// Nesting depth after the last line. Zero for balanced input.
    pub final_depth: i64,
}

impl ParsedConfig {
    /// Load and parse `path` with default loader options.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, LoaderOptions::default())
    }

    /// Load and parse `path`, expanding includes.
    pub fn load_with(path: impl AsRef<Path>, options: LoaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let lines = Loader::new(options).load(path)?;
        info!(path = %path.display(), lines = lines.len(), "config loaded");
        Ok(parse(&lines))
    }

    /// Binding of the named instance.
    pub fn binding(&self, name: &str) -> Option<&InstanceBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Virtual IPs attributed to the named instance.
    pub fn virtual_ips_of<'a>(&'a self, instance: &'a str) -> impl Iterator<Item = &'a VirtualIp> {
        self.virtual_ips.iter().filter(move |v| v.instance == instance)
    }
}

#[derive(Debug, Clone)]
struct VrrpScope {
    name: String,
    opened_at: i64,
}

/// Incremental parser state. Feed lines in loader order, then call [`BlockParser::finish`].
#[derive(Debug, Default)]
pub struct BlockParser {
    depth: i64,
    line_start_depth: i64,
    vrrp: Option<VrrpScope>,
    pending_server: Option<VirtualServer>,
    pending_group: Option<VirtualServerGroup>,
    pending_endpoint: Option<VirtualServerGroupEndpoint>,
    last_location: Option<SourceLocation>,
    config: ParsedConfig,
}

impl BlockParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth. May be negative after unbalanced closing braces.
    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// Name of the VRRP instance whose block is currently open.
    pub fn current_instance(&self) -> Option<&str> {
        self.vrrp.as_ref().map(|s| s.name.as_str())
    }

    /// Process one line.
    pub fn feed(&mut self, line: &RawLine) {
        self.line_start_depth = self.depth;
        self.depth += brace_delta(&line.text);
        self.last_location = Some(line.location.clone());

        if self.depth == 0 {
            self.finalize_pending();
        }
        let depth = self.depth;
        if self
            .vrrp
            .as_ref()
            .is_some_and(|scope| depth == 0 || depth <= scope.opened_at)
        {
            self.vrrp = None;
        }
        if self.depth < 0 {
            self.structural_warning(WarningKind::NegativeDepth, &line.text, &line.location);
        }

        let in_vrrp = self.vrrp.is_some();
        for extractor in EXTRACTORS.iter() {
            if extractor.scope == Scope::Vrrp && !in_vrrp {
                continue;
            }
            if extractor.apply(self, &line.text, &line.location) == Some(Outcome::Consumed) {
                break;
            }
        }
    }

    /// Finalize whatever is still pending and return the collected entities.
    pub fn finish(mut self) -> ParsedConfig {
        self.finalize_pending();
        // Negative depth was already reported on the line that caused it.
        if self.depth > 0 {
            if let Some(location) = self.last_location.clone() {
                self.structural_warning(WarningKind::UnclosedBlock, "", &location);
            }
        }
        self.config.final_depth = self.depth;
        debug!(
            vrrp_instances = self.config.vrrp_instances.len(),
            virtual_servers = self.config.virtual_servers.len(),
            groups = self.config.groups.len(),
            "config parse end"
        );
        self.config
    }

    fn structural_warning(&mut self, kind: WarningKind, text: &str, location: &SourceLocation) {
        let warning = StructuralWarning {
            kind,
            depth: self.depth,
            text: text.to_string(),
            location: location.clone(),
        };
        warn!(location = %location, depth = self.depth, "{warning}");
        self.config.warnings.push(warning);
    }

    fn finalize_pending(&mut self) {
        if let Some(vs) = self.pending_server.take() {
            debug!(location = %vs.location, "virtual_server '{vs}' defined");
            self.config.virtual_servers.push(vs);
        }
        if let Some(group) = self.pending_group.take() {
            debug!(location = %group.location, "virtual_server_group '{}' defined", group.name);
            self.config.groups.push(group);
        }
        if let Some(endpoint) = self.pending_endpoint.take() {
            debug!(
                location = %endpoint.location,
                "virtual_server group '{}' defined with protocol {}",
                endpoint.group,
                endpoint.protocol
            );
            self.config.group_endpoints.push(endpoint);
        }
    }

    pub(crate) fn open_vrrp_instance(&mut self, name: &str, location: &SourceLocation) {
        debug!(location = %location, "vrrp_instance '{name}' defined");
        self.config.vrrp_instances.push(VrrpInstance {
            name: name.to_string(),
            location: location.clone(),
        });
        self.vrrp = Some(VrrpScope {
            name: name.to_string(),
            opened_at: self.line_start_depth,
        });

        let fresh = InstanceBinding::new(name);
        match self.config.bindings.iter_mut().find(|b| b.name == name) {
            Some(existing) => *existing = fresh,
            None => self.config.bindings.push(fresh),
        }
    }

    pub(crate) fn add_router_id(&mut self, id: u32, location: &SourceLocation) {
        let Some(instance) = self.current_instance().map(str::to_string) else {
            return;
        };
        debug!(location = %location, instance = %instance, "virtual_router_id '{id}' defined");
        self.config.router_ids.push(VirtualRouterId {
            id,
            instance,
            location: location.clone(),
        });
    }

    pub(crate) fn add_priority(&mut self, value: u32, location: &SourceLocation) {
        let Some(instance) = self.current_instance().map(str::to_string) else {
            return;
        };
        debug!(location = %location, instance = %instance, "priority '{value}' defined");
        if let Some(binding) = self.config.bindings.iter_mut().find(|b| b.name == instance) {
            binding.priority = Some(value);
        }
        self.config.priorities.push(Priority {
            value,
            instance,
            location: location.clone(),
        });
    }

    pub(crate) fn add_virtual_ip(&mut self, address: &str, location: &SourceLocation) {
        let Some(instance) = self.current_instance().map(str::to_string) else {
            return;
        };
        debug!(location = %location, instance = %instance, "vip '{address}' defined");
        if let Some(binding) = self.config.bindings.iter_mut().find(|b| b.name == instance) {
            binding.vips.push(address.to_string());
        }
        self.config.virtual_ips.push(VirtualIp {
            address: address.to_string(),
            instance,
            location: location.clone(),
        });
    }

    pub(crate) fn start_virtual_server(&mut self, vs: VirtualServer) {
        if let Some(previous) = self.pending_server.replace(vs) {
            self.config.virtual_servers.push(previous);
        }
    }

    pub(crate) fn start_group(&mut self, group: VirtualServerGroup) {
        if let Some(previous) = self.pending_group.replace(group) {
            self.config.groups.push(previous);
        }
    }

    pub(crate) fn start_group_endpoint(&mut self, endpoint: VirtualServerGroupEndpoint) {
        if let Some(previous) = self.pending_endpoint.replace(endpoint) {
            self.config.group_endpoints.push(previous);
        }
    }

    pub(crate) fn set_pending_protocol(&mut self, protocol: Protocol) {
        if let Some(vs) = self.pending_server.as_mut() {
            vs.protocol = protocol;
        } else if let Some(endpoint) = self.pending_endpoint.as_mut() {
            endpoint.protocol = protocol;
        }
    }
}

/// Net change in nesting depth caused by `text`.
pub fn brace_delta(text: &str) -> i64 {
    text.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

/// Parse loader output.
pub fn parse<'a>(lines: impl IntoIterator<Item = &'a RawLine>) -> ParsedConfig {
    let mut parser = BlockParser::new();
    for line in lines {
        parser.feed(line);
    }
    parser.finish()
}

/// Parse in-memory text as if it were the file at `path`.
///
/// Comments are stripped as the loader does; `include` directives are not expanded.
pub fn parse_str(input: &str, path: impl Into<PathBuf>) -> ParsedConfig {
    let path = path.into();
    let lines: Vec<RawLine> = input
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            strip_comment(line)
                .map(|text| RawLine::new(text, SourceLocation::new(&path, index + 1)))
        })
        .collect();
    parse(&lines)
}
