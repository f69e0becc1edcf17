#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Diff-and-plan engine for one-directional content tree mirroring.
//!
//! The crate reconciles two independently enumerated trees behind the
//! [`Provider`] contract and runs the resulting work with bounded
//! concurrency:
//!
//! - [`list_entries`] enumerates providers through the [`TaskRunner`].
//! - [`SyncPlanner::plan`] diffs an origin against a target and returns the
//!   [`Operation`]s that mirror it, deciding copy versus put by protocol.
//! - [`run_operations`] executes those operations' deferred jobs.
//!
//! Building a plan performs no writes. Nothing happens to the target until
//! the caller hands the operations to [`run_operations`].
//!
//! ```ignore
//! use engine::{PlanOptions, RunOptions, SyncPlanner, run_operations};
//!
//! let planner = SyncPlanner::new(origin, target).delete_orphans(true);
//! let operations = planner.plan(&PlanOptions::new()).await?;
//! if !operations.is_empty() {
//!     run_operations(operations, &RunOptions::new().concurrency(4)).await?;
//! }
//! ```

mod compare;
mod entry;
mod error;
mod execution;
mod listing;
mod operation;
mod planner;
mod provider;
mod runner;

pub use compare::{Compare, EntryComparator, FnComparator, ModifiedComparator, SizeComparator};
pub use entry::{Entry, EntryMap};
pub use error::{IoResultExt, SyncError, SyncResult};
pub use execution::{OperationResult, RunOptions, run_operations};
pub use listing::{ListOptions, ListResult, list_entries};
pub use operation::{FnJob, Job, Operation, OperationKind, Reason, SkipEvent, SkipHook, job_fn};
pub use planner::{PlanOptions, SyncPlanner};
pub use provider::{ByteStream, EntryHook, Provider};
pub use runner::{TaskRunner, clamp_concurrency};
