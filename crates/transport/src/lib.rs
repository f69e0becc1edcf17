#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `transport` houses the concrete [`Provider`](engine::Provider)
//! implementations treesync can sync between, and the resolution step that
//! turns a root string from the command line into one of them.
//!
//! # Design
//!
//! - [`local::FsProvider`] serves a directory tree under the `file` protocol.
//!   Enumeration walks the tree with [`walk`] on the blocking pool, following
//!   symbolic links unless
//!   [`follow_symlinks`](method@ProviderOptions::follow_symlinks) is off. Hashes
//!   are MD5 digests computed by [`checksums`], and ignore patterns are
//!   [`filters::IgnoreSet`]s.
//! - [`s3::S3Provider`] serves the objects below a bucket prefix under the
//!   `s3` protocol. Hashes come from the listing ETags, uploads carry a
//!   guessed content type and the origin MD5, and requests are sent through
//!   an [`s3::S3Bridge`].
//! - [`params_hook`](method@ProviderOptions::params_hook) lets callers
//!   rewrite the parameters of every put, copy and delete before it is built.
//! - [`provider_for_root`] maps `file://` roots and plain paths to an
//!   [`FsProvider`] and `s3://` roots to an [`S3Provider`]. Any other
//!   `scheme://` root is rejected with [`TransportError::UnsupportedProtocol`].
//!
//! # Features
//!
//! - `s3` (default): the AWS SDK bridge and `s3://` root resolution. Without
//!   it, [`S3Provider`] still works with a caller-supplied bridge.
//!
//! # Invariants
//!
//! - Building an operation never changes the target. All writes happen
//!   inside the operation's job.
//! - Files are written to a staging file next to the destination and renamed
//!   into place, so a failed put never leaves a truncated file behind.
//!
//! # Examples
//!
//! ```no_run
//! use transport::{ProviderOptions, provider_for_root};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let origin = provider_for_root("./site", ProviderOptions::default())?;
//! let entries = origin.enumerate(None).await?;
//! for entry in entries.iter() {
//!     println!("{} {:?}", entry.key(), entry.size());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod local;
mod options;
mod resolve;
pub mod s3;

pub use error::TransportError;
pub use local::FsProvider;
pub use options::{ParamsHook, ProviderOptions};
pub use resolve::{FILE_PROTOCOL, provider_for_root, split_scheme};
pub use s3::S3Provider;
