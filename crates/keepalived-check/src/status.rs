//! VIP placement check against the addresses configured on this host.
//!
//! An instance whose priority is at or above the threshold is expected to be
//! MASTER here, so all of its VIPs should be present; below the threshold
//! none of them should be.

use common::{Error, Result};
use keepalived_conf::InstanceBinding;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, SocketAddrV4};
use tracing::{debug, trace};

/// Priority at or above which the local host is expected to be MASTER.
pub const DEFAULT_PRIORITY_THRESHOLD: u32 = 10;

/// Source of the addresses currently configured on the host.
#[cfg_attr(test, mockall::automock)]
pub trait AddressSource {
    fn addresses(&self) -> Result<Vec<IpAddr>>;
}

/// Lists IPv4 interface addresses with `getifaddrs(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterfaceAddresses;

impl AddressSource for InterfaceAddresses {
    fn addresses(&self) -> Result<Vec<IpAddr>> {
        let ifaddrs = nix::ifaddrs::getifaddrs()
            .map_err(|e| Error::host_query(format!("getifaddrs failed: {e}")))?;

        let mut out = Vec::new();
        for ifaddr in ifaddrs {
            let Some(sin) = ifaddr.address.as_ref().and_then(|a| a.as_sockaddr_in()) else {
                continue;
            };
            let ip = IpAddr::V4(*SocketAddrV4::from(*sin).ip());
            trace!(interface = %ifaddr.interface_name, address = %ip, "host address");
            if !out.contains(&ip) {
                out.push(ip);
            }
        }
        debug!(count = out.len(), "host addresses listed");
        Ok(out)
    }
}

/// Role the local host should have for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    Backup,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "MASTER"),
            Role::Backup => write!(f, "BACKUP"),
        }
    }
}

/// Whether a VIP's presence matches the expected role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Expected,
    Unexpected,
}

/// One VIP of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VipStatus {
    pub address: String,
    pub present: bool,
    pub placement: Placement,
}

/// All VIPs of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceStatus {
    pub name: String,
    pub priority: u32,
    /// False when the instance declares no priority and keepalived's default was assumed.
    pub priority_declared: bool,
    pub expected_role: Role,
    pub vips: Vec<VipStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub threshold: u32,
    pub instances: Vec<InstanceStatus>,
}

impl StatusReport {
    pub fn passed(&self) -> bool {
        self.unexpected().next().is_none()
    }

    /// VIPs whose presence contradicts the expected role.
    pub fn unexpected(&self) -> impl Iterator<Item = (&InstanceStatus, &VipStatus)> {
        self.instances.iter().flat_map(|instance| {
            instance
                .vips
                .iter()
                .filter(|v| v.placement == Placement::Unexpected)
                .map(move |v| (instance, v))
        })
    }
}

/// Compares instance bindings against host addresses.
#[derive(Debug, Clone, Copy)]
pub struct StatusChecker {
    threshold: u32,
}

impl StatusChecker {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Query `source` and classify every VIP of every binding.
    pub fn check(
        &self,
        bindings: &[InstanceBinding],
        source: &dyn AddressSource,
    ) -> Result<StatusReport> {
        let host: HashSet<String> = source
            .addresses()?
            .into_iter()
            .map(|ip| ip.to_string())
            .collect();
        Ok(self.classify(bindings, &host))
    }

    /// Classify every VIP against a known set of host addresses.
    pub fn classify(&self, bindings: &[InstanceBinding], host: &HashSet<String>) -> StatusReport {
        let instances = bindings
            .iter()
            .map(|binding| {
                let priority = binding.effective_priority();
                let expected_role = if priority >= self.threshold {
                    Role::Master
                } else {
                    Role::Backup
                };
                let vips = binding
                    .vips
                    .iter()
                    .map(|address| {
                        let present = host.contains(address);
                        let placement = match (expected_role, present) {
                            (Role::Master, true) | (Role::Backup, false) => Placement::Expected,
                            (Role::Master, false) | (Role::Backup, true) => Placement::Unexpected,
                        };
                        VipStatus {
                            address: address.clone(),
                            present,
                            placement,
                        }
                    })
                    .collect();
                InstanceStatus {
                    name: binding.name.clone(),
                    priority,
                    priority_declared: binding.priority.is_some(),
                    expected_role,
                    vips,
                }
            })
            .collect();

        StatusReport {
            threshold: self.threshold,
            instances,
        }
    }
}

impl Default for StatusChecker {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str, priority: Option<u32>, vips: &[&str]) -> InstanceBinding {
        InstanceBinding {
            name: name.to_string(),
            priority,
            vips: vips.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn host(addrs: &[&str]) -> MockAddressSource {
        let addrs: Vec<IpAddr> = addrs.iter().map(|a| a.parse().unwrap()).collect();
        let mut source = MockAddressSource::new();
        source
            .expect_addresses()
            .times(1)
            .returning(move || Ok(addrs.clone()));
        source
    }

    #[test]
    fn test_master_with_vips_present() {
        let source = host(&["127.0.0.1", "10.0.0.1", "10.0.0.2"]);
        let report = StatusChecker::new(10)
            .check(&[binding("VI_1", Some(100), &["10.0.0.1", "10.0.0.2"])], &source)
            .unwrap();

        assert!(report.passed());
        let instance = &report.instances[0];
        assert_eq!(instance.expected_role, Role::Master);
        assert!(instance.vips.iter().all(|v| v.present));
    }

    #[test]
    fn test_master_missing_vip_is_unexpected() {
        let source = host(&["10.0.0.1"]);
        let report = StatusChecker::new(10)
            .check(&[binding("VI_1", Some(100), &["10.0.0.1", "10.0.0.2"])], &source)
            .unwrap();

        assert!(!report.passed());
        let unexpected: Vec<_> = report.unexpected().map(|(_, v)| v.address.as_str()).collect();
        assert_eq!(unexpected, vec!["10.0.0.2"]);
    }

    #[test]
    fn test_backup_holding_vip_is_unexpected() {
        let source = host(&["10.0.0.9"]);
        let report = StatusChecker::new(10)
            .check(
                &[
                    binding("low", Some(5), &["10.0.0.9"]),
                    binding("idle", Some(9), &["10.0.0.10"]),
                ],
                &source,
            )
            .unwrap();

        assert_eq!(report.instances[0].expected_role, Role::Backup);
        assert_eq!(report.instances[0].vips[0].placement, Placement::Unexpected);
        assert_eq!(report.instances[1].vips[0].placement, Placement::Expected);
        assert!(!report.instances[1].vips[0].present);
        assert!(!report.passed());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let hosts: HashSet<String> = ["10.0.0.1".to_string()].into();
        let report =
            StatusChecker::new(50).classify(&[binding("eq", Some(50), &["10.0.0.1"])], &hosts);
        assert_eq!(report.instances[0].expected_role, Role::Master);
        assert!(report.passed());
    }

    #[test]
    fn test_missing_priority_uses_keepalived_default() {
        let hosts = HashSet::new();
        let report =
            StatusChecker::new(101).classify(&[binding("VI_1", None, &["10.0.0.1"])], &hosts);
        let instance = &report.instances[0];
        assert_eq!(instance.priority, 100);
        assert!(!instance.priority_declared);
        assert_eq!(instance.expected_role, Role::Backup);
        assert!(report.passed());
    }

    #[test]
    fn test_host_query_error_propagates() {
        let mut source = MockAddressSource::new();
        source
            .expect_addresses()
            .returning(|| Err(Error::host_query("permission denied")));

        let err = StatusChecker::default()
            .check(&[binding("VI_1", Some(100), &["10.0.0.1"])], &source)
            .unwrap_err();
        assert!(err.is_host_query());
    }

    #[test]
    fn test_interface_addresses_are_ipv4() {
        let Ok(addrs) = InterfaceAddresses.addresses() else {
            return;
        };
        assert!(addrs.iter().all(|a| a.is_ipv4()));
    }
}
