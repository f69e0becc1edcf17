use std::io;
use std::path::PathBuf;

/// Errors produced while building an [`IgnoreSet`](crate::IgnoreSet).
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A pattern could not be compiled into a glob matcher.
    #[error("failed to compile ignore pattern '{pattern}': {source}")]
    Pattern {
        /// The offending pattern as written.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: globset::Error,
    },

    /// An ignore file exists but could not be read.
    #[error("failed to read ignore file {}: {source}", path.display())]
    Read {
        /// Path of the ignore file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl FilterError {
    /// Returns the offending pattern for compile errors.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::Pattern { pattern, .. } => Some(pattern),
            Self::Read { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FilterError;
    use globset::GlobBuilder;
    use std::error::Error as _;

    #[test]
    fn pattern_error_preserves_pattern_and_source() {
        let glob_err = GlobBuilder::new("[").build().expect_err("unclosed class");
        let error = FilterError::Pattern {
            pattern: "[".into(),
            source: glob_err.clone(),
        };

        assert_eq!(error.pattern(), Some("["));
        assert!(error.to_string().contains("failed to compile"));
        assert_eq!(
            error.source().map(ToString::to_string),
            Some(glob_err.to_string())
        );
    }
}
