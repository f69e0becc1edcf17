#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `walk` enumerates a local directory tree for the filesystem provider. Every
//! entry below the root is reported with a forward-slash key relative to the
//! root, so the same file has the same key on every platform and can be
//! matched against keys coming from an object store.
//!
//! # Design
//!
//! - [`WalkBuilder`] configures the traversal root and whether symbolic links
//!   are followed.
//! - [`Walker`] implements [`Iterator`] and yields [`WalkEntry`] values in
//!   depth-first order. Directory contents are sorted by name before they are
//!   yielded, so repeated walks over an unchanged tree produce the same
//!   sequence.
//! - A directory is yielded before its children. Calling
//!   [`Walker::skip_current_dir`] right after receiving a directory prunes
//!   it, which is how ignored directories are left out without reading them.
//! - [`WalkError`] carries the failing path and the underlying [`io::Error`].
//!   The first error ends the walk.
//!
//! # Examples
//!
//! ```
//! use walk::WalkBuilder;
//! use std::fs;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! fs::create_dir_all(temp.path().join("assets/img"))?;
//! fs::create_dir_all(temp.path().join("cache"))?;
//! fs::write(temp.path().join("index.html"), b"<html>")?;
//! fs::write(temp.path().join("assets/img/logo.png"), b"png")?;
//! fs::write(temp.path().join("cache/blob"), b"tmp")?;
//!
//! let mut walker = WalkBuilder::new(temp.path()).build()?;
//! let mut files = Vec::new();
//! while let Some(entry) = walker.next() {
//!     let entry = entry?;
//!     if entry.is_dir() && entry.key() == "cache" {
//!         walker.skip_current_dir();
//!     } else if entry.is_file() {
//!         files.push(entry.key().to_owned());
//!     }
//! }
//!
//! assert_eq!(files, ["assets/img/logo.png", "index.html"]);
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```
//!
//! [`io::Error`]: std::io::Error

mod builder;
mod entry;
mod error;
mod walker;

pub use builder::WalkBuilder;
pub use entry::WalkEntry;
pub use error::{WalkError, WalkErrorKind};
pub use walker::Walker;
