#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `filters` decides which entries a provider leaves out of its enumeration.
//! Patterns use `.gitignore` syntax so an existing ignore file can be reused
//! as-is for a sync root.
//!
//! # Design
//!
//! - [`IgnoreRule`] is one parsed pattern: its glob, whether it is negated
//!   (leading `!`), directory-only (trailing `/`) or anchored to the root
//!   (leading or inner `/`).
//! - [`IgnoreSet`] compiles rules with [`globset`]. The last matching rule
//!   wins, so a later `!pattern` re-includes a path an earlier rule ignored.
//!   A path inside an ignored directory stays ignored no matter what later
//!   rules say, as in git.
//! - Unanchored patterns match at any depth by implicitly prefixing `**/`.
//!   `*` never crosses a `/`.
//!
//! # Errors
//!
//! [`IgnoreSet::from_patterns`] reports [`FilterError::Pattern`] when a pattern
//! is not a valid glob. [`load_ignore_file`] reports [`FilterError::Read`] when
//! an existing ignore file cannot be read.
//!
//! # Examples
//!
//! ```
//! use filters::IgnoreSet;
//!
//! let ignores =
//!     IgnoreSet::from_patterns(["*.txt", "!A.txt", "build/"]).expect("patterns compile");
//!
//! assert!(ignores.is_ignored("B.txt", false));
//! assert!(!ignores.is_ignored("A.txt", false));
//! assert!(ignores.is_ignored("build/app.js", false));
//! assert!(!ignores.is_ignored("C.md", false));
//! ```

mod error;
mod file;
mod rule;
mod set;

pub use error::FilterError;
pub use file::{load_ignore_file, parse_patterns};
pub use rule::IgnoreRule;
pub use set::IgnoreSet;
