//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::ExportBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Slop above which matched frames are unlikely to show the same scene
const LARGE_SLOP_S: f64 = 0.1;

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
    summary: Option<JobSummary>,
}

#[derive(Serialize)]
struct JobSummary {
    version: String,
    log: String,
    streams: Vec<String>,
    format: String,
    export: String,
    queue_size: usize,
    slop: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<(f64, f64)>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating export job");

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
        anyhow::bail!("Export job validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(JobSummary {
                    version: format!("{:?}", blueprint.version),
                    log: blueprint.input.path.display().to_string(),
                    streams: blueprint
                        .streams
                        .all()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    format: blueprint.export.format.clone(),
                    export: blueprint.export.path.display().to_string(),
                    queue_size: blueprint.sync.queue_size,
                    slop: blueprint.sync.slop,
                    range: blueprint.range.map(|r| (r.start, r.end)),
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

/// Collect non-fatal issues
fn collect_warnings(blueprint: &ExportBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.streams.pose.is_none() {
        warnings.push("No pose stream selected - the pose log will be empty".to_string());
    }

    if blueprint.export.path.exists() {
        warnings.push(format!(
            "Export path {} exists already - the export will refuse to run",
            blueprint.export.path.display()
        ));
    }

    if !blueprint.input.path.exists() {
        warnings.push(format!(
            "Log {} not found",
            blueprint.input.path.display()
        ));
    }

    if blueprint.sync.slop > LARGE_SLOP_S {
        warnings.push(format!(
            "sync.slop of {}s is large - frames may pair images from different moments",
            blueprint.sync.slop
        ));
    }

    if let Some(range) = blueprint.range {
        if range.start == range.end {
            warnings.push("range is empty - no frames will be exported".to_string());
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Export job is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Log: {}", summary.log);
            println!("  Streams: {}", summary.streams.join(", "));
            println!("  Format: {}", summary.format);
            println!("  Export: {}", summary.export);
            println!("  Queue size: {}", summary.queue_size);
            println!("  Slop: {}s", summary.slop);
            if let Some((start, end)) = summary.range {
                println!("  Range: [{start}, {end})");
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Export job is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
