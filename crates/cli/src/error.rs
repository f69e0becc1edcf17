use std::io;

use engine::SyncError;

use crate::config::ConfigError;

/// Failure of a command, mapped to an exit status by [`CliError::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The configuration or the roots it names are unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listing, planning or execution failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The working directory is unavailable.
    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    /// The confirmation answer could not be read.
    #[error("failed to read the confirmation answer: {0}")]
    Input(#[source] io::Error),

    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Exit status reported for this error: `2` for sync failures, `1` otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Sync(_) => 2,
            Self::Config(_)
            | Self::Runtime(_)
            | Self::CurrentDir(_)
            | Self::Input(_)
            | Self::Output(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_failures_exit_with_two() {
        let error = CliError::from(SyncError::RootNotFound {
            root: "/missing".to_owned(),
        });
        assert_eq!(error.exit_code(), 2);
        assert_eq!(error.to_string(), "/missing not found");
    }

    #[test]
    fn configuration_failures_exit_with_one() {
        let error = CliError::from(ConfigError::MissingTarget);
        assert_eq!(error.exit_code(), 1);
        assert_eq!(CliError::from(io::Error::other("closed")).exit_code(), 1);
    }
}
