//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SinkType, StabilizerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::load_blueprint;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    line_delay_s: f64,
    readout_ms: f64,
    kernel: String,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_blueprint(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    line_delay_s: blueprint.camera.line_delay_s,
                    readout_ms: readout_ms(&blueprint),
                    kernel: format!("{:?}", blueprint.kernel.kind),
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Readout span of the configured mock camera (milliseconds)
fn readout_ms(blueprint: &StabilizerBlueprint) -> f64 {
    let rows = blueprint.sources.camera.height.saturating_sub(1) as f64;
    (blueprint.camera.line_delay_s * rows).abs() * 1000.0
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &StabilizerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - stabilized frames will be dropped".to_string());
    }

    if blueprint.camera.line_delay_s == 0.0 {
        warnings.push("camera.line_delay_s is 0 - global shutter, no per-row correction".to_string());
    }

    let frame_period_ms = 1000.0 / blueprint.sources.camera.frequency_hz;
    if readout_ms(blueprint) > frame_period_ms {
        warnings.push(format!(
            "readout span {:.2} ms exceeds frame period {:.2} ms",
            readout_ms(blueprint),
            frame_period_ms
        ));
    }

    // below one readout span plus the IMU latency, the bound is overrun while frames wait
    let history_ms =
        blueprint.scheduler.history_capacity as f64 * 1000.0 / blueprint.sources.imu.frequency_hz;
    let needed_ms = readout_ms(blueprint) + blueprint.sources.imu.latency_ms as f64;
    if history_ms < needed_ms {
        warnings.push(format!(
            "history_capacity holds {:.1} ms of gyro data, frames need {:.1} ms; the bound will be exceeded while frames wait",
            history_ms, needed_ms
        ));
    }

    if blueprint.filter.decay == 1.0 {
        warnings.push("filter.decay is 1.0 - filtered orientation never converges".to_string());
    }

    if !blueprint
        .sinks
        .iter()
        .any(|sink| sink.sink_type == SinkType::File)
    {
        info!("No file sink configured - stabilized frames are not persisted");
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Line delay: {} s", summary.line_delay_s);
            println!("  Readout span: {:.3} ms", summary.readout_ms);
            println!("  Kernel: {}", summary.kernel);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint(json: &str) -> StabilizerBlueprint {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_warnings_for_bare_config() {
        let bp = blueprint(r#"{ "camera": { "line_delay_s": 0.0 } }"#);
        let warnings = collect_warnings(&bp);
        assert!(warnings.iter().any(|w| w.contains("No sinks")));
        assert!(warnings.iter().any(|w| w.contains("global shutter")));
    }

    #[test]
    fn test_readout_longer_than_frame_period() {
        // 239 rows * 0.2 ms = 47.8 ms > 33.3 ms
        let bp = blueprint(r#"{ "camera": { "line_delay_s": -0.0002 } }"#);
        assert!((readout_ms(&bp) - 47.8).abs() < 1e-9);
        let warnings = collect_warnings(&bp);
        assert!(warnings.iter().any(|w| w.contains("exceeds frame period")));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/gimbal.toml".into(),
            json: true,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
