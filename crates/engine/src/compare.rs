//! Change-detection policies for matched origin/target pairs.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entry::Entry;
use crate::error::SyncResult;

/// Caller-defined change detection.
///
/// Returns `true` when `origin` is unchanged relative to `target` and no
/// upload is needed.
#[async_trait]
pub trait EntryComparator: Send + Sync {
    /// Decides whether the pair is unchanged.
    async fn unchanged(&self, origin: &Arc<Entry>, target: &Arc<Entry>) -> SyncResult<bool>;
}

/// How the planner decides whether a matched pair changed.
#[derive(Clone, Default)]
pub enum Compare {
    /// Content hashes from both sides must be equal.
    #[default]
    ContentHash,
    /// Every matched pair is treated as changed.
    AlwaysChanged,
    /// Delegate to a custom predicate.
    Custom(Arc<dyn EntryComparator>),
}

impl Compare {
    /// Wraps a custom comparator.
    pub fn custom<C>(comparator: C) -> Self
    where
        C: EntryComparator + 'static,
    {
        Self::Custom(Arc::new(comparator))
    }

    /// Runs the policy against a matched pair.
    pub async fn unchanged(&self, origin: &Arc<Entry>, target: &Arc<Entry>) -> SyncResult<bool> {
        match self {
            Self::AlwaysChanged => Ok(false),
            Self::Custom(comparator) => comparator.unchanged(origin, target).await,
            Self::ContentHash => {
                let origin_hash = origin.content_hash().await?;
                let target_hash = target.content_hash().await?;
                Ok(origin_hash == target_hash)
            }
        }
    }
}

impl fmt::Debug for Compare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentHash => f.write_str("ContentHash"),
            Self::AlwaysChanged => f.write_str("AlwaysChanged"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Unchanged when both sizes are known and equal.
#[derive(Clone, Copy, Debug, Default)]
pub struct SizeComparator;

#[async_trait]
impl EntryComparator for SizeComparator {
    async fn unchanged(&self, origin: &Arc<Entry>, target: &Arc<Entry>) -> SyncResult<bool> {
        Ok(matches!((origin.size(), target.size()), (Some(a), Some(b)) if a == b))
    }
}

/// Unchanged unless the origin was modified after the target.
///
/// A missing timestamp on either side counts as changed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModifiedComparator;

#[async_trait]
impl EntryComparator for ModifiedComparator {
    async fn unchanged(&self, origin: &Arc<Entry>, target: &Arc<Entry>) -> SyncResult<bool> {
        Ok(match (origin.last_modified(), target.last_modified()) {
            (Some(origin), Some(target)) => origin <= target,
            _ => false,
        })
    }
}

/// [`EntryComparator`] backed by a closure.
pub struct FnComparator<F>(F);

impl<F> FnComparator<F> {
    /// Wraps `f`, which receives owned handles to the origin and target entries.
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> EntryComparator for FnComparator<F>
where
    F: Fn(Arc<Entry>, Arc<Entry>) -> Fut + Send + Sync,
    Fut: Future<Output = SyncResult<bool>> + Send,
{
    async fn unchanged(&self, origin: &Arc<Entry>, target: &Arc<Entry>) -> SyncResult<bool> {
        (self.0)(Arc::clone(origin), Arc::clone(target)).await
    }
}
