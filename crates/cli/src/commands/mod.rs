pub(crate) mod init;
pub(crate) mod ls;
pub(crate) mod sync;

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use engine::{Entry, EntryHook, SyncResult};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::CliError;

/// Drives `work` to completion, handing every event it emits to `handle`
/// on the calling task as soon as it arrives.
async fn relay<T, E, Fut, H>(
    work: Fut,
    events: &mut UnboundedReceiver<E>,
    mut handle: H,
) -> Result<T, CliError>
where
    Fut: Future<Output = SyncResult<T>>,
    H: FnMut(E) -> io::Result<()>,
{
    tokio::pin!(work);
    let result = loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => handle(event)?,
            result = &mut work => break result,
        }
    };
    while let Ok(event) = events.try_recv() {
        handle(event)?;
    }
    Ok(result?)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ignored entries grouped by the root of the provider that excluded them.
#[derive(Clone, Default)]
struct IgnoredEntries {
    by_root: Arc<Mutex<BTreeMap<String, Vec<Arc<Entry>>>>>,
}

impl IgnoredEntries {
    fn hook(&self) -> EntryHook {
        let by_root = Arc::clone(&self.by_root);
        Arc::new(move |entry: &Arc<Entry>| {
            let root = entry
                .provider()
                .map(|provider| provider.root().to_owned())
                .unwrap_or_default();
            lock(&by_root).entry(root).or_default().push(Arc::clone(entry));
        })
    }

    fn take(&self, root: &str) -> Vec<Arc<Entry>> {
        lock(&self.by_root).remove(root).unwrap_or_default()
    }

    fn take_all(&self) -> BTreeMap<String, Vec<Arc<Entry>>> {
        mem::take(&mut *lock(&self.by_root))
    }
}
