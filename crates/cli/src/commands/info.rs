//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{nanos_to_seconds, MessageKind};
use ingestion::{RecordingReader, TypeRegistry};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Log info for JSON output
#[derive(Serialize)]
struct LogInfo {
    path: String,
    records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    streams: Vec<StreamInfo>,
}

#[derive(Serialize)]
struct StreamInfo {
    name: String,
    type_name: String,
    /// `None` when the exporter cannot decode the type
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<MessageKind>,
    count: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(log = %args.log.display(), "Loading log info");

    if !args.log.exists() {
        return Err(CliError::LogNotFound {
            path: args.log.clone(),
        }
        .into());
    }

    let reader = RecordingReader::open(&args.log)
        .with_context(|| format!("Failed to open log {}", args.log.display()))?;
    let info = build_log_info(&reader);

    if args.json {
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize log info")?;
        println!("{}", json);
    } else {
        print_log_info(&info);
    }

    Ok(())
}

fn build_log_info(reader: &RecordingReader) -> LogInfo {
    let registry = TypeRegistry::default();
    let streams = reader
        .message_counts()
        .into_iter()
        .map(|(desc, count)| StreamInfo {
            kind: registry.resolve(&desc.type_name),
            name: desc.name.to_string(),
            type_name: desc.type_name,
            count,
        })
        .collect();

    LogInfo {
        path: reader.path().display().to_string(),
        records: reader.len(),
        duration_secs: reader
            .time_span()
            .map(|(first, last)| nanos_to_seconds(last - first)),
        streams,
    }
}

fn print_log_info(info: &LogInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Recorded Log                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📁 {}", info.path);
    println!("   ├─ Records: {}", info.records);
    match info.duration_secs {
        Some(secs) => println!("   └─ Duration: {:.3}s", secs),
        None => println!("   └─ Duration: (empty log)"),
    }

    println!("\n📡 Streams ({})", info.streams.len());
    for (i, stream) in info.streams.iter().enumerate() {
        let prefix = if i == info.streams.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        let marker = if stream.kind.is_some() { "" } else { " (unsupported)" };
        println!(
            "   {} {} [{}] {} msgs{}",
            prefix, stream.name, stream.type_name, stream.count, marker
        );
    }

    println!();
}
