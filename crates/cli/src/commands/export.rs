//! `export` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{
    ConfigVersion, ExportBlueprint, ExportConfig, InputConfig, RangeConfig, StreamSelection,
};
use tracing::{info, warn};

use crate::cli::ExportArgs;
use crate::error::CliError;
use crate::pipeline::ExportPipeline;

/// Execute the `export` command
pub async fn run_export(args: &ExportArgs) -> Result<()> {
    let blueprint = build_blueprint(args)?;
    ConfigLoader::validate(&blueprint).context("Invalid export job")?;

    info!(
        log = %blueprint.input.path.display(),
        colour = %blueprint.streams.colour,
        depth = %blueprint.streams.depth,
        info = %blueprint.streams.info,
        pose = ?blueprint.streams.pose,
        "Export job ready"
    );

    if args.dry_run {
        info!("Dry run mode - export job is valid, exiting");
        println!("{}", ConfigLoader::to_toml(&blueprint)?);
        return Ok(());
    }

    let pipeline = ExportPipeline::new(blueprint);
    let cancel = pipeline.cancel_flag();

    let signal_task = tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                warn!("Received shutdown signal, stopping export...");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install signal handler"),
        }
    });

    let result = tokio::task::spawn_blocking(move || pipeline.run())
        .await
        .context("Export task panicked")?;
    signal_task.abort();

    let stats = result?;
    info!(
        frames = stats.tuples_written,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Export finished"
    );
    stats.print_summary();

    if stats.cancelled {
        return Err(CliError::Interrupted {
            frames: stats.tuples_written,
        }
        .into());
    }
    Ok(())
}

/// Merge the optional job file with command-line flags (flags win)
pub(crate) fn build_blueprint(args: &ExportArgs) -> Result<ExportBlueprint> {
    let base = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::ConfigNotFound { path: path.clone() }.into());
            }
            let blueprint = ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Some(blueprint)
        }
        None => None,
    };

    let range = match &args.range {
        Some(values) => match values.as_slice() {
            [start, end] => Some(RangeConfig {
                start: *start,
                end: *end,
            }),
            other => return Err(CliError::InvalidRange { count: other.len() }.into()),
        },
        None => base.as_ref().and_then(|b| b.range),
    };

    let mut sync = base
        .as_ref()
        .map(|b| b.sync.clone())
        .unwrap_or_default();
    if let Some(queue_size) = args.sync_queue_size {
        sync.queue_size = queue_size;
    }
    if let Some(slop) = args.sync_slop {
        sync.slop = slop;
    }

    let base_streams = base.as_ref().map(|b| &b.streams);
    let streams = StreamSelection {
        colour: pick(&args.colour, base_streams.map(|s| &s.colour), "colour stream", "-c")?,
        depth: pick(&args.depth, base_streams.map(|s| &s.depth), "depth stream", "-d")?,
        info: pick(&args.info, base_streams.map(|s| &s.info), "camera info stream", "-i")?,
        pose: args
            .pose
            .clone()
            .or_else(|| base_streams.and_then(|s| s.pose.clone())),
    };

    let input = InputConfig {
        path: pick(&args.log, base.as_ref().map(|b| &b.input.path), "log path", "<LOG>")?,
    };
    let export = ExportConfig {
        format: pick(
            &args.format,
            base.as_ref().map(|b| &b.export.format),
            "export format",
            "-f",
        )?,
        path: pick(
            &args.export_path,
            base.as_ref().map(|b| &b.export.path),
            "export path",
            "-e",
        )?,
    };

    Ok(ExportBlueprint {
        version: base.as_ref().map(|b| b.version).unwrap_or(ConfigVersion::V1),
        input,
        streams,
        sync,
        range,
        export,
    })
}

fn pick<T: Clone>(
    flag: &Option<T>,
    file: Option<&T>,
    what: &'static str,
    flag_name: &'static str,
) -> Result<T, CliError> {
    flag.clone()
        .or_else(|| file.cloned())
        .ok_or_else(|| CliError::missing(what, flag_name))
}

/// Wait for Ctrl+C or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use contracts::DEFAULT_QUEUE_SIZE;
    use std::path::Path;

    fn export_args(argv: &[&str]) -> ExportArgs {
        let mut full = vec!["rgbd-export", "export"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Export(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_flags_only() {
        let args = export_args(&[
            "log", "-c", "/rgb", "-d", "/depth", "-i", "/info", "-f", "ICL", "-e", "out",
        ]);
        let bp = build_blueprint(&args).unwrap();
        assert_eq!(bp.input.path, Path::new("log"));
        assert_eq!(bp.sync.queue_size, DEFAULT_QUEUE_SIZE);
        assert!(bp.range.is_none());
        assert!(ConfigLoader::validate(&bp).is_ok());
    }

    #[test]
    fn test_missing_required_flag() {
        let args = export_args(&["log", "-c", "/rgb", "-d", "/depth", "-f", "ICL", "-e", "out"]);
        let err = build_blueprint(&args).unwrap_err();
        assert!(err.to_string().contains("camera info stream"), "got: {err}");
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("job.toml");
        std::fs::write(
            &job,
            r#"
[input]
path = "from-file"

[streams]
colour = "/rgb"
depth = "/depth"
info = "/info"

[sync]
queue_size = 20

[range]
start = 1.0
end = 2.0

[export]
format = "ICL"
path = "out"
"#,
        )
        .unwrap();

        let job_arg = job.to_string_lossy().to_string();
        let args = export_args(&[
            "--config", job_arg.as_str(), "-p", "/pose", "-r", "5", "10", "--sync-slop", "0.03",
        ]);
        let bp = build_blueprint(&args).unwrap();
        assert_eq!(bp.input.path, Path::new("from-file"));
        assert_eq!(bp.streams.pose.as_deref(), Some("/pose"));
        assert_eq!(bp.sync.queue_size, 20);
        assert_eq!(bp.sync.slop, 0.03);
        assert_eq!(bp.range.map(|r| (r.start, r.end)), Some((5.0, 10.0)));
    }

    #[test]
    fn test_missing_config_file() {
        let args = export_args(&["--config", "/nonexistent/job.toml"]);
        let err = build_blueprint(&args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigNotFound { .. })
        ));
    }
}
