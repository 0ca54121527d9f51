use anyhow::Result;
use clap::Parser;
use logpulse_core::{Config, ReportFormat};
use logpulse_ingestion::LineReader;
use logpulse_output::ReportWriter;
use logpulse_pipeline::{Analyzer, ShutdownReason};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// LogPulse - live log stream analyzer
#[derive(Parser, Debug)]
#[command(name = "logpulse")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report format: text or json (overrides config)
    #[arg(short, long)]
    format: Option<String>,

    /// Seconds between reports (overrides config)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // CLI overrides config
    if let Some(ref format) = args.format {
        config.report.format = format.clone();
    }
    if let Some(interval) = args.interval {
        config.report.interval_seconds = interval;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        let config = Config::default();
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let config = load_config(&args)?;

    // Diagnostics always go to stderr, reports to stdout
    let level = if args.verbose {
        Level::DEBUG
    } else {
        parse_level(&config.general.log_level)
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    info!(instance = %config.general.instance_name, "Starting LogPulse");

    let format = ReportFormat::parse(&config.report.format)?;
    let writer = ReportWriter::stdout_with_format(format);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nShutting down log analyzer...");
                interrupt.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let summary = match Analyzer::new(config).run(LineReader::stdin(), writer, cancel).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "fatal: analyzer stopped");
            return Err(e.into());
        }
    };

    info!(
        processed = summary.lines_processed,
        reports = summary.reports_emitted,
        "Processing complete"
    );

    if summary.reason == ShutdownReason::Interrupted {
        // A pending blocking read on stdin would keep the runtime alive
        std::process::exit(0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("unknown"), Level::WARN);
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from(["logpulse", "--format", "json", "--interval", "5"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.report.format, "json");
        assert_eq!(config.report.interval_seconds, 5);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["logpulse", "--interval", "0"]);
        assert!(load_config(&args).is_err());
    }
}
