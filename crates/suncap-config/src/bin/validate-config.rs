//! Config validation CLI tool
//!
//! Validates a suncap configuration file and reports any errors.

use suncap_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a suncap configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match suncap_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", suncap_config::CURRENT_CONFIG_VERSION);
            println!("  Camera: {}", settings.camera.url);
            println!(
                "  Capture: {} ±{} min every {}s ({})",
                settings.capture.event_type,
                settings.capture.offset.as_secs() / 60,
                settings.capture.interval.as_secs(),
                if settings.capture.enabled { "enabled" } else { "disabled" }
            );
            println!(
                "  Location: {:.4}, {:.4} ({}){}",
                settings.location.latitude,
                settings.location.longitude,
                settings.location.timezone,
                settings
                    .location
                    .name
                    .as_deref()
                    .map(|n| format!(" {}", n))
                    .unwrap_or_default()
            );
            println!("  Daily refresh: {}", settings.service.refresh_at);
            match &settings.artifact.command {
                Some(argv) => println!("  Artifact builder: {}", argv.join(" ")),
                None => println!("  Artifact builder: frame manifest"),
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                suncap_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                suncap_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                suncap_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                suncap_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        suncap_config::CURRENT_CONFIG_VERSION
                    );
                }
                other => eprintln!("{}", other),
            }
            ExitCode::from(1)
        }
    }
}
