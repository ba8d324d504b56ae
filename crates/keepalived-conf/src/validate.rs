//! Consistency checks over a parsed configuration.
//!
//! Each check returns every offending key together with all the locations
//! that produced it. Checks never short-circuit one another: the aggregate
//! groups run all of their checks and fail if any of them found something.

use crate::parser::ParsedConfig;
use crate::types::SourceLocation;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// Individual consistency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    DuplicateVrrpInstances,
    DuplicateRouterIds,
    DuplicateVirtualIps,
    DuplicateVirtualServers,
    UnmanagedVirtualServerVips,
    DuplicateGroups,
    DuplicateGroupEndpoints,
    UndefinedGroupReferences,
}

impl Check {
    pub const ALL: [Check; 8] = [
        Check::DuplicateVrrpInstances,
        Check::DuplicateRouterIds,
        Check::DuplicateVirtualIps,
        Check::DuplicateVirtualServers,
        Check::UnmanagedVirtualServerVips,
        Check::DuplicateGroups,
        Check::DuplicateGroupEndpoints,
        Check::UndefinedGroupReferences,
    ];

    /// Headline printed above the violations of this check.
    pub fn title(&self) -> &'static str {
        match self {
            Check::DuplicateVrrpInstances => "'vrrp_instance' duplications found",
            Check::DuplicateRouterIds => "'virtual_router_id' duplications found",
            Check::DuplicateVirtualIps => "'virtual_ipaddress' duplications found",
            Check::DuplicateVirtualServers => "'virtual_server' duplications found",
            Check::UnmanagedVirtualServerVips => "'virtual_server' uses unmanaged VIP",
            Check::DuplicateGroups => "'virtual_server_group' duplications found",
            Check::DuplicateGroupEndpoints => "'virtual_server group' duplications found",
            Check::UndefinedGroupReferences => "'virtual_server group' uses undefined group name",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One offending key and every location that produced it, first occurrence first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub key: String,
    pub locations: Vec<SourceLocation>,
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub check: Check,
    pub violations: Vec<Violation>,
}

impl Finding {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Offending keys, in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.key.as_str()).collect()
    }
}

/// Result of an aggregate check (`vrrps`, `vips` or `groups`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub name: &'static str,
    pub findings: Vec<Finding>,
}

impl GroupReport {
    pub fn passed(&self) -> bool {
        self.findings.iter().all(Finding::passed)
    }

    pub fn finding(&self, check: Check) -> Option<&Finding> {
        self.findings.iter().find(|f| f.check == check)
    }
}

/// Results of every aggregate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub groups: Vec<GroupReport>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.groups.iter().all(GroupReport::passed)
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.groups.iter().flat_map(|g| g.findings.iter())
    }

    pub fn finding(&self, check: Check) -> Option<&Finding> {
        self.findings().find(|f| f.check == check)
    }

    /// Number of violating keys across all checks.
    pub fn violation_count(&self) -> usize {
        self.findings().map(|f| f.violations.len()).sum()
    }
}

/// Runs the checks against one parsed configuration.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    config: &'a ParsedConfig,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a ParsedConfig) -> Self {
        Self { config }
    }

    /// Run every aggregate check.
    pub fn run(&self) -> ValidationReport {
        ValidationReport {
            groups: vec![self.check_vrrps(), self.check_vips(), self.check_groups()],
        }
    }

    /// Duplicate instance names and router ids.
    pub fn check_vrrps(&self) -> GroupReport {
        GroupReport {
            name: "vrrps",
            findings: vec![
                self.run_check(Check::DuplicateVrrpInstances),
                self.run_check(Check::DuplicateRouterIds),
            ],
        }
    }

    /// Duplicate addresses and services, and services on unmanaged addresses.
    pub fn check_vips(&self) -> GroupReport {
        GroupReport {
            name: "vips",
            findings: vec![
                self.run_check(Check::DuplicateVirtualIps),
                self.run_check(Check::DuplicateVirtualServers),
                self.run_check(Check::UnmanagedVirtualServerVips),
            ],
        }
    }

    /// Duplicate groups and endpoints, and endpoints naming unknown groups.
    pub fn check_groups(&self) -> GroupReport {
        GroupReport {
            name: "groups",
            findings: vec![
                self.run_check(Check::DuplicateGroups),
                self.run_check(Check::DuplicateGroupEndpoints),
                self.run_check(Check::UndefinedGroupReferences),
            ],
        }
    }

    /// Run a single check.
    pub fn run_check(&self, check: Check) -> Finding {
        let c = self.config;
        let violations = match check {
            Check::DuplicateVrrpInstances => duplicates(
                c.vrrp_instances.iter().map(|v| (v.name.clone(), &v.location)),
            ),
            Check::DuplicateRouterIds => {
                duplicates(c.router_ids.iter().map(|v| (v.id.to_string(), &v.location)))
            }
            Check::DuplicateVirtualIps => {
                duplicates(c.virtual_ips.iter().map(|v| (v.address.clone(), &v.location)))
            }
            Check::DuplicateVirtualServers => {
                duplicates(c.virtual_servers.iter().map(|v| (v.to_string(), &v.location)))
            }
            Check::UnmanagedVirtualServerVips => {
                let managed: HashSet<&str> =
                    c.virtual_ips.iter().map(|v| v.address.as_str()).collect();
                collect(
                    c.virtual_servers
                        .iter()
                        .filter(|vs| !managed.contains(vs.vip.as_str()))
                        .map(|vs| (vs.to_string(), &vs.location)),
                )
            }
            Check::DuplicateGroups => {
                duplicates(c.groups.iter().map(|v| (v.name.clone(), &v.location)))
            }
            Check::DuplicateGroupEndpoints => {
                duplicates(c.group_endpoints.iter().map(|v| (v.group.clone(), &v.location)))
            }
            Check::UndefinedGroupReferences => {
                let defined: HashSet<&str> = c.groups.iter().map(|g| g.name.as_str()).collect();
                collect(
                    c.group_endpoints
                        .iter()
                        .filter(|e| !defined.contains(e.group.as_str()))
                        .map(|e| (e.group.clone(), &e.location)),
                )
            }
        };
        Finding { check, violations }
    }
}

/// Group locations by key, keeping keys and locations in first-seen order.
fn group_by_key<'l, K>(
    items: impl Iterator<Item = (K, &'l SourceLocation)>,
) -> Vec<(K, Vec<SourceLocation>)>
where
    K: Eq + Hash + Clone,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<SourceLocation>)> = Vec::new();
    for (key, location) in items {
        match index.get(&key) {
            Some(&i) => groups[i].1.push(location.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![location.clone()]));
            }
        }
    }
    groups
}

fn duplicates<'l>(items: impl Iterator<Item = (String, &'l SourceLocation)>) -> Vec<Violation> {
    group_by_key(items)
        .into_iter()
        .filter(|(_, locations)| locations.len() > 1)
        .map(|(key, locations)| Violation { key, locations })
        .collect()
}

fn collect<'l>(items: impl Iterator<Item = (String, &'l SourceLocation)>) -> Vec<Violation> {
    group_by_key(items)
        .into_iter()
        .map(|(key, locations)| Violation { key, locations })
        .collect()
}
