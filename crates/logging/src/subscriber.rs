//! Process-wide subscriber installation.

use std::env;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use super::config::VerbosityConfig;

/// Environment variable whose directives replace the verbosity-derived ones.
///
/// `RUST_LOG` is consulted when this one is unset.
pub const ENV_VAR: &str = "TREESYNC_LOG";

/// Builds the filter for `config`, honouring `TREESYNC_LOG` and `RUST_LOG`.
#[must_use]
pub fn env_filter(config: &VerbosityConfig) -> EnvFilter {
    let override_directives = env::var(ENV_VAR).or_else(|_| env::var("RUST_LOG")).ok();
    filter_for(override_directives.as_deref(), config)
}

/// Builds the filter from explicit `directives`, falling back to `config`.
///
/// Blank or unparsable directives are ignored.
#[must_use]
pub fn filter_for(directives: Option<&str>, config: &VerbosityConfig) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(config.directives()))
}

/// Installs a stderr `fmt` subscriber filtered by `config` and the environment.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &VerbosityConfig) -> Result<(), TryInitError> {
    init_tracing_with_filter(env_filter(config))
}

/// Installs a stderr `fmt` subscriber with a caller-supplied filter.
pub fn init_tracing_with_filter(filter: EnvFilter) -> Result<(), TryInitError> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time();

    tracing_subscriber::registry().with(filter).with(layer).try_init()
}
