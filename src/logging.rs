//! Logging System
//!
//! Structured logging via the `tracing` crate. Level, format, and
//! destination come from configuration with `PINBOX_LOG*` environment
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is file; None means the platform state
    /// directory
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
        }
    }
}

/// Initialization failure: an invalid directive or an unusable log file.
#[derive(Debug, thiserror::Error)]
#[error("logging setup failed: {0}")]
pub struct LoggingInitError(String);

/// Resolve the log file path: explicit config, `PINBOX_LOG_FILE`, or the
/// platform state directory.
pub fn resolve_log_file_path(config_file: Option<PathBuf>) -> Result<PathBuf, LoggingInitError> {
    if let Ok(env_path) = std::env::var("PINBOX_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(p) = config_file {
        if !p.as_os_str().is_empty() {
            return Ok(p);
        }
    }
    let project_dirs = directories::ProjectDirs::from("", "pinbox", "pinbox").ok_or_else(|| {
        LoggingInitError("could not determine platform state directory".to_string())
    })?;
    let state_dir = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_dir())
        .to_path_buf();
    Ok(state_dir.join("pinbox.log"))
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest): `PINBOX_LOG*` environment
/// variables, the passed configuration, defaults. Call once per process.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), LoggingInitError> {
    let disabled = config.map(|c| !c.enabled).unwrap_or(false);
    if disabled {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .init();
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;

    let base = Registry::default().with(filter);
    match (format.as_str(), output) {
        ("json", Output::Stdout) => base
            .with(json_layer().with_writer(std::io::stdout))
            .init(),
        ("json", Output::Stderr) => base
            .with(json_layer().with_writer(std::io::stderr))
            .init(),
        ("json", Output::File) => base
            .with(json_layer().with_writer(open_log_file(config)?))
            .init(),
        (_, Output::Stdout) => base
            .with(text_layer(true).with_writer(std::io::stdout))
            .init(),
        (_, Output::Stderr) => base
            .with(text_layer(true).with_writer(std::io::stderr))
            .init(),
        (_, Output::File) => base
            .with(text_layer(false).with_writer(open_log_file(config)?))
            .init(),
    }
    Ok(())
}

fn json_layer<S>() -> fmt::Layer<S, fmt::format::JsonFields, fmt::format::Format<fmt::format::Json, ChronoUtc>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
}

fn text_layer<S>(ansi: bool) -> fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format<fmt::format::Full, ChronoUtc>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(ansi)
}

fn open_log_file(config: Option<&LoggingConfig>) -> Result<std::fs::File, LoggingInitError> {
    let path = resolve_log_file_path(config.and_then(|c| c.file.clone()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LoggingInitError(format!("failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| LoggingInitError(format!("failed to open log file {:?}: {}", path, e)))
}

fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, LoggingInitError> {
    if let Ok(filter) = EnvFilter::try_from_env("PINBOX_LOG") {
        return Ok(filter);
    }
    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    EnvFilter::try_new(level).map_err(|e| LoggingInitError(format!("invalid log level: {}", e)))
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<String, LoggingInitError> {
    if let Ok(format) = std::env::var("PINBOX_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }
    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(LoggingInitError(format!(
            "invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
    File,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<Output, LoggingInitError> {
    let value = std::env::var("PINBOX_LOG_OUTPUT")
        .ok()
        .unwrap_or_else(|| config.map(|c| c.output.clone()).unwrap_or_default());
    match value.as_str() {
        "stdout" => Ok(Output::Stdout),
        "" | "stderr" => Ok(Output::Stderr),
        "file" => Ok(Output::File),
        other => Err(LoggingInitError(format!(
            "invalid log output: {} (must be 'stdout', 'stderr', or 'file')",
            other
        ))),
    }
}
