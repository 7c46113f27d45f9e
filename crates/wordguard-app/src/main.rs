//! WordGuard - sensitive word detection for text headed to language models.
//!
//! Runs a single detection, a file or batch scan, an evaluation against a
//! labeled dataset, or the HTTP guard server.

mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wordguard_core::{evaluation, loader, DetectorConfig, SensitiveWordDetector};
use wordguard_server::{AppState, Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};

use output::OutputFormat;

/// WordGuard - dictionary-based sensitive word detection
#[derive(Parser, Debug)]
#[command(name = "wordguard", version, about)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["text", "file", "batch", "evaluate", "serve"])
))]
struct Args {
    /// Text to check
    #[arg(short, long)]
    text: Option<String>,

    /// File whose whole content is checked as one text
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// File with one text per line to check as a batch
    #[arg(short, long)]
    batch: Option<PathBuf>,

    /// JSON dataset of labeled questions to score the detector against
    #[arg(long, value_name = "DATASET")]
    evaluate: Option<PathBuf>,

    /// Run the HTTP guard server
    #[arg(long)]
    serve: bool,

    /// Custom word list file
    #[arg(short, long)]
    words: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Detector config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host for --serve
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port for --serve
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Initialize logging. Logs go to stderr so stdout carries only results.
fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wordguard={},warn", log_level)));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let Some(path) = args.log_file.as_deref() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("invalid log file path: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::debug!("Logging to {}", path.display());
    Ok(Some(guard))
}

/// Resolves the detector config from flags and the config file.
fn load_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => DetectorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DetectorConfig::load_or_default().context("failed to load default config")?,
    };

    if let Some(words) = &args.words {
        config = config.with_dictionary_path(words);
    }
    Ok(config)
}

fn build_detector(config: DetectorConfig) -> Result<SensitiveWordDetector> {
    let source = config
        .dictionary_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "bundled word list".to_string());

    let detector = SensitiveWordDetector::new(config)
        .with_context(|| format!("failed to load dictionary from {}", source))?;
    tracing::info!(words = detector.word_count(), source = %source, "Detector ready");
    Ok(detector)
}

fn check_text(detector: &SensitiveWordDetector, text: &str, format: OutputFormat) -> Result<()> {
    let result = detector.detect(text)?;
    print!("{}", output::render_detection(text, &result, format)?);
    Ok(())
}

fn check_file(detector: &SensitiveWordDetector, path: &Path, format: OutputFormat) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    check_text(detector, text.trim(), format)
}

fn check_batch(detector: &SensitiveWordDetector, path: &Path, format: OutputFormat) -> Result<()> {
    let texts = loader::load_batch_file(path)?;
    let batch = detector.batch_detect(&texts);
    print!("{}", output::render_batch(&texts, &batch, format)?);
    Ok(())
}

fn run_evaluation(
    detector: &SensitiveWordDetector,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let samples = evaluation::load_dataset(path)
        .with_context(|| format!("failed to load dataset {}", path.display()))?;
    let report = evaluation::evaluate(detector, &samples);
    print!("{}", output::render_report(&report, format)?);
    Ok(())
}

async fn serve(detector: SensitiveWordDetector, host: &str, port: u16) -> Result<()> {
    let config = ServerConfig::default().with_host(host).with_port(port);
    let server = Server::with_state(config, AppState::new(Arc::new(detector)))?;
    server.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args)?;

    let config = load_config(&args)?;
    let detector = build_detector(config)?;

    if let Some(text) = &args.text {
        check_text(&detector, text, args.format)
    } else if let Some(path) = &args.file {
        check_file(&detector, path, args.format)
    } else if let Some(path) = &args.batch {
        check_batch(&detector, path, args.format)
    } else if let Some(path) = &args.evaluate {
        run_evaluation(&detector, path, args.format)
    } else {
        serve(detector, &args.host, args.port).await
    }
}
