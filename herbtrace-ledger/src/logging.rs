//! Tracing subscriber setup
//!
//! The subscriber is installed before configuration is read so config
//! loading is itself logged. A log level from the config file is applied
//! afterwards through a reload handle.

use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

pub const DEFAULT_LOG_FILTER: &str = "herbtrace_ledger=info,herbtrace_common=info,tower_http=info";

/// Pick the active filter directive
///
/// Precedence: `RUST_LOG`, then `--log-level`/`HERBTRACE_LOG_LEVEL`, then the
/// config file, then the built-in default. Blank values are skipped.
pub fn select_log_filter(
    rust_log: Option<&str>,
    cli_level: Option<&str>,
    config_level: Option<&str>,
) -> String {
    [rust_log, cli_level, config_level]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(DEFAULT_LOG_FILTER)
        .to_string()
}

/// Parse a directive, falling back to the default on a bad one
fn parse_filter(directive: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_LOG_FILTER), Some(e.to_string())),
    }
}

/// Handle for swapping the filter of the installed subscriber
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    active: String,
}

impl LogFilterHandle {
    /// Directive currently in effect
    pub fn active(&self) -> &str {
        &self.active
    }

    /// Replace the filter when `directive` differs from the active one
    pub fn set_filter(&mut self, directive: &str) {
        if directive == self.active {
            return;
        }
        match EnvFilter::try_new(directive) {
            Ok(filter) => match self.handle.reload(filter) {
                Ok(()) => self.active = directive.to_string(),
                Err(e) => warn!(error = %e, "Failed to apply log filter"),
            },
            Err(e) => warn!(filter = directive, error = %e, "Ignoring invalid log filter"),
        }
    }
}

/// Install the global subscriber with `directive` as its filter
pub fn init_tracing(directive: &str) -> LogFilterHandle {
    let (filter, parse_error) = parse_filter(directive);
    let (filter_layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let active = match parse_error {
        None => directive.to_string(),
        Some(error) => {
            warn!(filter = directive, %error, "Invalid log filter, using default");
            DEFAULT_LOG_FILTER.to_string()
        }
    };
    LogFilterHandle { handle, active }
}
