//! `treesync ls`: enumerate providers and print their entries.

use std::io::Write;
use std::sync::Arc;

use engine::{ListOptions, ListResult, Provider, list_entries};
use tokio::sync::mpsc;
use tracing::debug;

use super::{IgnoredEntries, relay};
use crate::error::CliError;
use crate::render::{Listing, Renderer};
use crate::settings::LsSettings;

/// Lists every configured root, printing each one as soon as it finishes.
pub(crate) async fn execute<Out>(
    settings: LsSettings,
    renderer: &Renderer,
    out: &mut Out,
) -> Result<(), CliError>
where
    Out: Write,
{
    let providers = settings
        .providers
        .iter()
        .map(|provider| provider.build())
        .collect::<Result<Vec<Arc<dyn Provider>>, _>>()?;
    debug!(
        target: "treesync::cli",
        providers = providers.len(),
        concurrency = settings.list_concurrency,
        "listing"
    );

    let ignored = IgnoredEntries::default();
    let (sender, mut events) = mpsc::unbounded_channel::<(String, ListResult)>();
    let options = ListOptions::new()
        .concurrency(settings.list_concurrency)
        .compute_hashes(renderer.show_hashes)
        .on_ignore(Some(ignored.hook()))
        .on_end(move |provider, result| {
            let _ = sender.send((provider.root().to_owned(), result.clone()));
        });

    relay(list_entries(&providers, &options), &mut events, |(root, result)| {
        let excluded = ignored.take(&root);
        renderer.ls_result(
            &mut *out,
            &Listing {
                root: &root,
                result: &result,
                ignored: &excluded,
            },
        )
    })
    .await?;
    Ok(())
}
