//! Orchestration of the configuration and status checks.

use crate::cli::Cli;
use crate::settings::Settings;
use crate::status::{AddressSource, StatusChecker, StatusReport};
use anyhow::Context;
use common::logging::LogFormat;
use keepalived_conf::{LoaderOptions, ParsedConfig, StructuralWarning, ValidationReport, Validator};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Process exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    /// Every check that ran passed (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// A configuration or status check failed (exit code 1).
    pub const CHECK_FAILED: ExitCode = ExitCode::FAILURE;

    /// Runtime error (exit code 2): unreadable settings or configuration, host query failure.
    ///
    /// `ExitCode::from()` is not `const fn`.
    pub fn runtime_error() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Effective options after merging CLI flags over the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub conf_path: PathBuf,
    pub loader: LoaderOptions,
    pub config_test: bool,
    pub status_test: bool,
    pub priority_threshold: u32,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl RunOptions {
    pub fn resolve(cli: &Cli, settings: &Settings) -> Self {
        let log_level = if cli.verbose {
            "debug".to_string()
        } else {
            settings
                .logging
                .level
                .clone()
                .unwrap_or_else(|| "info".to_string())
        };

        Self {
            conf_path: cli
                .conf_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.keepalived.config_path)),
            loader: settings.loader_options(),
            config_test: settings.checks.config && !cli.no_config_test,
            status_test: settings.checks.status && !cli.no_status_test,
            priority_threshold: cli
                .priority_master
                .unwrap_or(settings.status.priority_threshold),
            log_level,
            log_format: settings
                .logging
                .format
                .as_deref()
                .map(LogFormat::from_name)
                .unwrap_or_default(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// `None` when the configuration test was disabled.
    pub config: Option<ValidationReport>,
    pub warnings: Vec<StructuralWarning>,
    /// `None` when the status test was disabled or skipped.
    pub status: Option<StatusReport>,
    /// Status test was requested but skipped because the configuration test failed.
    pub status_skipped: bool,
    /// The host addresses could not be listed, so no status comparison was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_error: Option<String>,
}

impl RunOutcome {
    pub fn config_passed(&self) -> bool {
        self.config.as_ref().is_none_or(ValidationReport::passed)
    }

    pub fn passed(&self) -> bool {
        self.status_error.is_none()
            && self.config_passed()
            && self.status.as_ref().is_none_or(StatusReport::passed)
    }
}

/// Load the configuration, validate it and compare it with the host.
///
/// File access and include errors abort the run. A host query failure only
/// ends the status phase and is recorded in the outcome next to the findings.
pub fn run(options: &RunOptions, source: &dyn AddressSource) -> anyhow::Result<RunOutcome> {
    let config = ParsedConfig::load_with(&options.conf_path, options.loader).with_context(|| {
        format!(
            "failed to load keepalived configuration {}",
            options.conf_path.display()
        )
    })?;
    info!(
        instances = config.vrrp_instances.len(),
        virtual_servers = config.virtual_servers.len(),
        warnings = config.warnings.len(),
        "configuration parsed"
    );

    let report = options.config_test.then(|| Validator::new(&config).run());
    let config_passed = report.as_ref().is_none_or(ValidationReport::passed);
    if !config_passed {
        warn!(
            violations = report.as_ref().map_or(0, ValidationReport::violation_count),
            "configuration check failed"
        );
    }

    let mut status = None;
    let mut status_skipped = false;
    let mut status_error = None;
    if options.status_test {
        if config_passed {
            let checker = StatusChecker::new(options.priority_threshold);
            match checker.check(&config.bindings, source) {
                Ok(result) => {
                    info!(
                        instances = result.instances.len(),
                        passed = result.passed(),
                        "status checked"
                    );
                    status = Some(result);
                }
                Err(e) => {
                    error!(error = %e, "could not determine local addresses");
                    status_error = Some(e.to_string());
                }
            }
        } else {
            status_skipped = true;
        }
    }

    Ok(RunOutcome {
        config: report,
        warnings: config.warnings,
        status,
        status_skipped,
        status_error,
    })
}
