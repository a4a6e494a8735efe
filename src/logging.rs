use std::env;
use std::fmt;
use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Output format for driver log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        };
        f.write_str(text)
    }
}

/// Logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(text)
    }
}

/// Environment-provided log configuration.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LogLevel::Warn,
    };

    /// Read `SVFRONT_LOG_FORMAT` and `SVFRONT_LOG_LEVEL`, keeping the
    /// defaults for anything missing or unrecognized.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_specs(
            env::var("SVFRONT_LOG_FORMAT").ok().as_deref(),
            env::var("SVFRONT_LOG_LEVEL").ok().as_deref(),
        )
    }

    fn from_specs(format: Option<&str>, level: Option<&str>) -> Self {
        Self {
            format: format
                .and_then(LogFormat::parse)
                .unwrap_or(Self::DEFAULT.format),
            level: level
                .and_then(LogLevel::parse)
                .unwrap_or(Self::DEFAULT.level),
        }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Install the global tracing subscriber once; later calls are no-ops.
///
/// The caller owns the styling decision: the driver passes the same answer
/// it uses for diagnostic colors, so `--color-diagnostics` and terminal
/// detection govern log output too. `RUST_LOG` overrides the configured
/// level when set.
pub fn init_logging(options: &LogOptions, use_ansi: bool) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    let _ = INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_ansi(use_ansi)
            .with_target(true)
            .with_env_filter(filter);
        let _ = match options.format {
            LogFormat::Json => {
                tracing::subscriber::set_global_default(subscriber.json().finish())
            }
            _ => tracing::subscriber::set_global_default(subscriber.compact().finish()),
        };
    });
}
