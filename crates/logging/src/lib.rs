#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` turns the command line's `-v` count into [`tracing`] filter
//! directives and installs the process-wide subscriber. Library crates only
//! emit events; this crate decides which of them reach stderr.
//!
//! # Design
//!
//! - [`VerbosityLevel`] is the coarse `-v` scale, clamped to `0..=3`.
//! - [`VerbosityConfig`] holds one [`LevelFilter`](tracing::level_filters::LevelFilter)
//!   per [`LogArea`] (`treesync::list`, `treesync::plan`, `treesync::run`,
//!   `treesync::walk`) and renders them as an `EnvFilter` directive string.
//! - [`init_tracing`] installs a `fmt` layer writing to stderr. A
//!   `TREESYNC_LOG` or `RUST_LOG` environment variable replaces the
//!   verbosity-derived directives entirely.
//!
//! # Examples
//!
//! ```
//! use logging::{LogArea, VerbosityConfig};
//! use tracing::level_filters::LevelFilter;
//!
//! let config = VerbosityConfig::from_verbose_level(1);
//! assert_eq!(config.level(LogArea::Plan), LevelFilter::INFO);
//! assert_eq!(config.level(LogArea::Walk), LevelFilter::WARN);
//! assert!(config.directives().contains("treesync::plan=info"));
//! ```

mod config;
mod levels;
mod subscriber;

pub use config::VerbosityConfig;
pub use levels::{LogArea, VerbosityLevel};
pub use subscriber::{ENV_VAR, env_filter, filter_for, init_tracing, init_tracing_with_filter};
