//! Structured logging setup for the pipe
//!
//! Events go to stderr so the copy itself never mixes with log output. ANSI
//! colors are used only when stderr is a terminal.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `pmdpipe=info,warn`)
//! - `PMDPIPE_LOG_FORMAT`: `pretty`, `json` or `compact` (default: `pretty`)
//!
//! Command line flags take precedence over both.
//!
//! # Example
//!
//! ```no_run
//! use pmdpipe::logging::{init_logging, LogFormat, LogSettings};
//!
//! let settings = LogSettings::from_env().format(LogFormat::Json).verbosity(1);
//! init_logging(&settings)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV_VAR: &str = "PMDPIPE_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "pmdpipe=info,warn";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human readable
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
    /// One line per event
    Compact,
}

impl LogFormat {
    /// Format named by `PMDPIPE_LOG_FORMAT`, unknown names fall back to pretty
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV_VAR)
            .ok()
            .and_then(|name| <Self as clap::ValueEnum>::from_str(name.trim(), true).ok())
            .unwrap_or_default()
    }
}

/// How the pipe logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Filter directives in `RUST_LOG` syntax
    pub filter: String,
    /// Attach source file and line to every event
    pub locations: bool,
}

impl LogSettings {
    /// Settings from `RUST_LOG` and `PMDPIPE_LOG_FORMAT`
    pub fn from_env() -> Self {
        Self {
            format: LogFormat::from_env(),
            filter: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
            locations: false,
        }
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Raise the pipe's own level: 1 for debug, 2 and more for trace
    ///
    /// 0 keeps the filter as it is.
    pub fn verbosity(mut self, level: u8) -> Self {
        let directive = match level {
            0 => return self,
            1 => "pmdpipe=debug",
            _ => "pmdpipe=trace",
        };
        self.filter = format!("{},{directive}", self.filter);
        self
    }

    pub fn locations(mut self, on: bool) -> Self {
        self.locations = on;
        self
    }
}

/// Install the global subscriber
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_new(&settings.filter)
        .with_context(|| format!("invalid log filter {:?}", settings.filter))?;
    let ansi = std::io::stderr().is_terminal();
    let base = fmt::layer().with_writer(std::io::stderr);

    let layer = match settings.format {
        LogFormat::Pretty => base
            .pretty()
            .with_ansi(ansi)
            .with_file(settings.locations)
            .with_line_number(settings.locations)
            .boxed(),
        LogFormat::Json => base
            .json()
            .with_file(settings.locations)
            .with_line_number(settings.locations)
            .boxed(),
        LogFormat::Compact => base
            .compact()
            .with_ansi(ansi)
            .with_file(settings.locations)
            .with_line_number(settings.locations)
            .boxed(),
    };
    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;
    Ok(())
}
