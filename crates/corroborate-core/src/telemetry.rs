use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

use crate::ResearchError;

static TELEMETRY_GUARD: OnceLock<()> = OnceLock::new();

/// Filter used when neither an explicit filter nor `RUST_LOG` is set.
const QUIET_FILTER: &str = "warn,corroborate_core=info";

#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    /// Explicit filter directive. Takes precedence over `RUST_LOG` and `verbosity`.
    pub env_filter: Option<String>,
    /// Number of `-v` flags: 0 keeps provider chatter at warn, 1 info, 2 debug, 3+ trace.
    pub verbosity: u8,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            env_filter: None,
            verbosity: 0,
            with_ansi: std::io::stderr().is_terminal(),
            with_target: false,
        }
    }
}

impl TelemetryOptions {
    pub fn with_verbosity(verbosity: u8) -> Self {
        Self {
            verbosity,
            with_target: verbosity >= 2,
            ..Self::default()
        }
    }

    fn directive(&self, rust_log: Option<String>) -> String {
        if let Some(filter) = self.env_filter.clone().or(rust_log) {
            return filter;
        }
        match self.verbosity {
            0 => QUIET_FILTER.to_string(),
            1 => "info".to_string(),
            2 => "info,corroborate_core=debug".to_string(),
            _ => "debug,corroborate_core=trace".to_string(),
        }
    }
}

/// Install the global tracing subscriber, writing to stderr so report output
/// on stdout stays clean.
///
/// Only the first call installs anything; later calls return `Ok(())`.
pub fn init_telemetry(options: TelemetryOptions) -> Result<(), ResearchError> {
    if TELEMETRY_GUARD.get().is_some() {
        return Ok(());
    }

    let directive = options.directive(std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive).map_err(|err| {
        ResearchError::InvalidConfiguration(format!("invalid log filter {directive:?}: {err}"))
    })?;

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_ansi(options.with_ansi)
        .with_target(options.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| {
            ResearchError::InvalidConfiguration(format!("telemetry init failed: {err}"))
        })?;

    TELEMETRY_GUARD.get_or_init(|| ());
    Ok(())
}
