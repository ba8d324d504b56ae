//! keepalived-check binary

use keepalived_check::{
    Cli, InterfaceAddresses, OutputFormat, Renderer, RunOptions, Settings, exit_code,
    render_json, run,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Tracing is not initialized yet
    let (settings, settings_path) = match Settings::load(cli.settings.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Settings error: {e}");
            return exit_code::runtime_error();
        }
    };

    let options = RunOptions::resolve(&cli, &settings);
    common::logging::init_with(&options.log_level, options.log_format);
    match &settings_path {
        Some(path) => tracing::info!(path = %path.display(), "settings loaded"),
        None => tracing::debug!("no settings file found, using defaults"),
    }
    tracing::debug!(conf_path = %options.conf_path.display(), "keepalived-check starting");

    let outcome = match run(&options, &InterfaceAddresses) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return exit_code::runtime_error();
        }
    };

    match cli.format {
        OutputFormat::Text => print!("{}", Renderer::for_stdout().render(&outcome)),
        OutputFormat::Json => match render_json(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                return exit_code::runtime_error();
            }
        },
    }

    if outcome.status_error.is_some() {
        exit_code::runtime_error()
    } else if outcome.passed() {
        exit_code::SUCCESS
    } else {
        exit_code::CHECK_FAILED
    }
}
