//! # RGB-D Export CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 导出任务加载与验证
//! - 日志流信息查看
//! - 回放导出与优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_export, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging (and metrics) based on CLI options
    init_observability(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "RGB-D Export CLI starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Export(args) => run_export(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

fn init_observability(cli: &Cli) -> Result<()> {
    let metrics_port = match &cli.command {
        Commands::Export(args) if args.metrics_port != 0 => Some(args.metrics_port),
        _ => None,
    };

    let config = ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port,
        ..Default::default()
    }
    .with_verbosity(cli.verbose, cli.quiet);

    observability::init_with_config(config)
}
