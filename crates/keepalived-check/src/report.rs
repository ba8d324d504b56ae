//! Rendering of a run outcome as colored text or JSON.

use crate::app::RunOutcome;
use crate::status::{Placement, StatusReport};
use console::Style;
use keepalived_conf::{Finding, ValidationReport};
use serde::Serialize;
use std::fmt::{Display, Write};

/// Text renderer.
#[derive(Debug, Clone)]
pub struct Renderer {
    colors: bool,
    ok_style: Style,
    not_ok_style: Style,
    warn_style: Style,
    info_style: Style,
}

impl Renderer {
    pub fn new(colors: bool) -> Self {
        Self {
            colors,
            ok_style: Style::new().green(),
            not_ok_style: Style::new().red(),
            warn_style: Style::new().yellow(),
            info_style: Style::new().blue(),
        }
    }

    /// Colors when stdout is a terminal that supports them.
    pub fn for_stdout() -> Self {
        Self::new(console::colors_enabled())
    }

    fn paint(&self, style: &Style, text: impl Display) -> String {
        if self.colors {
            style.clone().force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn emit(&self, out: &mut String, style: &Style, text: impl Display) {
        let _ = writeln!(out, "{}", self.paint(style, text));
    }

    pub fn render(&self, outcome: &RunOutcome) -> String {
        let mut out = String::new();

        for warning in &outcome.warnings {
            self.emit(&mut out, &self.warn_style, format_args!("Warning: {warning}"));
        }

        if let Some(report) = &outcome.config {
            self.render_config(&mut out, report);
        }
        if outcome.status_skipped {
            self.emit(&mut out, &self.not_ok_style, "We won't check status");
        }
        if let Some(status) = &outcome.status {
            self.render_status(&mut out, status);
        }
        if let Some(error) = &outcome.status_error {
            let message = format!("Could not determine local ips: {error}");
            self.emit(&mut out, &self.not_ok_style, message);
        }
        out
    }

    fn render_config(&self, out: &mut String, report: &ValidationReport) {
        for finding in report.findings().filter(|f| !f.passed()) {
            self.render_finding(out, finding);
        }
        if report.passed() {
            self.emit(out, &self.ok_style, "Config OK");
        } else {
            self.emit(out, &self.not_ok_style, "Config not good!");
        }
    }

    fn render_finding(&self, out: &mut String, finding: &Finding) {
        let _ = writeln!(out, "{}:", finding.check);
        for violation in &finding.violations {
            let _ = writeln!(out, "\t{}", violation.key);
            for location in &violation.locations {
                let _ = writeln!(out, "\t\t- {location}");
            }
        }
        out.push('\n');
    }

    fn render_status(&self, out: &mut String, status: &StatusReport) {
        for instance in &status.instances {
            self.emit(out, &self.info_style, format_args!("Instance {}:", instance.name));
            for vip in &instance.vips {
                let on_host = if vip.present {
                    "is on this host"
                } else {
                    "is not on this host"
                };
                let (style, verdict) = match (vip.placement, vip.present) {
                    (Placement::Expected, true) => (&self.ok_style, "Expected"),
                    (Placement::Expected, false) => (&self.warn_style, "Expected"),
                    (Placement::Unexpected, _) => (&self.not_ok_style, "Unexpected"),
                };
                let line = format!("{} {on_host} ({verdict})", vip.address);
                let _ = writeln!(out, "    {}", self.paint(style, line));
            }
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    outcome: &'a RunOutcome,
    ok: bool,
}

/// Render the outcome as a single pretty-printed JSON document.
pub fn render_json(outcome: &RunOutcome) -> common::Result<String> {
    let report = JsonReport {
        outcome,
        ok: outcome.passed(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusChecker;
    use keepalived_conf::{InstanceBinding, Validator, parse_str};
    use std::collections::HashSet;

    fn to_json(outcome: &RunOutcome) -> serde_json::Value {
        serde_json::from_str(&render_json(outcome).unwrap()).unwrap()
    }

    fn outcome(conf: &str, host: &[&str], threshold: u32) -> RunOutcome {
        let config = parse_str(conf, "keepalived.conf");
        let report = Validator::new(&config).run();
        let status = report.passed().then(|| {
            let addrs: HashSet<String> = host.iter().map(|a| a.to_string()).collect();
            StatusChecker::new(threshold).classify(&config.bindings, &addrs)
        });
        RunOutcome {
            status_skipped: !report.passed(),
            config: Some(report),
            warnings: config.warnings,
            status,
            status_error: None,
        }
    }

    #[test]
    fn test_duplicates_render_key_and_locations() {
        let outcome = outcome(
            concat!(
                "vrrp_instance A {\n    virtual_router_id 7\n}\n",
                "vrrp_instance A {\n    virtual_router_id 8\n}\n",
            ),
            &[],
            10,
        );
        let text = Renderer::new(false).render(&outcome);
        assert!(text.contains("'vrrp_instance' duplications found:\n\tA\n"));
        assert!(text.contains("\t\t- keepalived.conf:1\n\t\t- keepalived.conf:4\n"));
        assert!(text.contains("Config not good!"));
        assert!(text.contains("We won't check status"));
        assert!(!text.contains("Config OK"));
    }

    #[test]
    fn test_status_lines() {
        let conf = r#"
vrrp_instance high {
    priority 100
    virtual_ipaddress {
        10.0.0.1
        10.0.0.2
    }
}
vrrp_instance low {
    priority 5
    virtual_ipaddress {
        10.0.0.3
        10.0.0.4
    }
}
"#;
        let text = Renderer::new(false).render(&outcome(conf, &["10.0.0.1", "10.0.0.3"], 10));
        assert!(text.contains("Config OK"));
        assert!(text.contains("Instance high:"));
        assert!(text.contains("    10.0.0.1 is on this host (Expected)"));
        assert!(text.contains("    10.0.0.2 is not on this host (Unexpected)"));
        assert!(text.contains("    10.0.0.3 is on this host (Unexpected)"));
        assert!(text.contains("    10.0.0.4 is not on this host (Expected)"));
    }

    #[test]
    fn test_colors_only_when_enabled() {
        let outcome = outcome("vrrp_instance A {\n}\n", &[], 10);
        assert!(!Renderer::new(false).render(&outcome).contains('\u{1b}'));
        assert!(Renderer::new(true).render(&outcome).contains('\u{1b}'));
    }

    #[test]
    fn test_warnings_are_rendered() {
        let outcome = outcome("}\nvrrp_instance A {\n", &[], 10);
        let text = Renderer::new(false).render(&outcome);
        assert!(text.contains("Warning: config structure maybe wrong"));
    }

    #[test]
    fn test_json_shape() {
        let mut outcome = outcome("vrrp_instance A {\n    priority 50\n}\n", &[], 10);
        outcome.status = Some(StatusChecker::new(10).classify(
            &[InstanceBinding {
                name: "A".to_string(),
                priority: Some(50),
                vips: vec!["10.0.0.1".to_string()],
            }],
            &HashSet::new(),
        ));

        let json = to_json(&outcome);
        assert_eq!(json["ok"], false);
        assert!(json["config"]["groups"].is_array());
        assert!(json["warnings"].as_array().unwrap().is_empty());
        assert_eq!(json["status"]["instances"][0]["expected_role"], "master");
        assert_eq!(json["status"]["instances"][0]["vips"][0]["placement"], "unexpected");
        assert_eq!(json["status_skipped"], false);
    }

    #[test]
    fn test_json_disabled_phases_are_null() {
        let outcome = RunOutcome {
            config: None,
            warnings: Vec::new(),
            status: None,
            status_skipped: false,
            status_error: None,
        };
        let json = to_json(&outcome);
        assert!(json["config"].is_null());
        assert!(json["status"].is_null());
        assert_eq!(json["status_skipped"], false);
        assert!(json.get("status_error").is_none());
        assert_eq!(json["ok"], true);
    }

    #[test]
    fn test_json_distinguishes_skipped_status() {
        let outcome = outcome("vrrp_instance A {\n}\nvrrp_instance A {\n}\n", &[], 10);
        assert!(outcome.status_skipped);

        let json = to_json(&outcome);
        assert!(json["status"].is_null());
        assert_eq!(json["status_skipped"], true);
        assert_eq!(json["ok"], false);
    }

    #[test]
    fn test_host_query_failure_is_reported() {
        let mut outcome = outcome("vrrp_instance A {\n}\n", &[], 10);
        outcome.status = None;
        outcome.status_error = Some("host query failed: EPERM".to_string());

        let text = Renderer::new(false).render(&outcome);
        assert!(text.contains("Config OK"));
        assert!(text.contains("Could not determine local ips: host query failed: EPERM"));

        let json = to_json(&outcome);
        assert_eq!(json["status_error"], "host query failed: EPERM");
        assert_eq!(json["ok"], false);
    }
}
