//! `treesync sync`: plan, confirm and execute a mirror of origin onto target.

use std::io::{BufRead, Write};
use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use engine::{
    Operation, OperationResult, PlanOptions, Provider, RunOptions, SkipEvent, SyncPlanner,
    run_operations,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{IgnoredEntries, lock, relay};
use crate::error::CliError;
use crate::prompt;
use crate::render::{PlanReport, Renderer};
use crate::settings::SyncSettings;

pub(crate) async fn execute<In, Out, Err>(
    settings: SyncSettings,
    renderer: &Renderer,
    input: &mut In,
    out: &mut Out,
    err: &mut Err,
) -> Result<(), CliError>
where
    In: BufRead,
    Out: Write,
    Err: Write,
{
    let origin: Arc<dyn Provider> = settings.origin.build()?;
    let target: Arc<dyn Provider> = settings.target.build()?;
    debug!(
        target: "treesync::cli",
        origin = origin.root(),
        target = target.root(),
        compare = %settings.compare,
        "planning"
    );

    let planner = SyncPlanner::new(origin, target)
        .add_missing(settings.add_missing)
        .delete_orphans(settings.delete)
        .compare(settings.compare.comparator())
        .compare_concurrency(settings.compare_concurrency)
        .list_concurrency(settings.list_concurrency);

    let ignored = IgnoredEntries::default();
    let skipped = Arc::new(Mutex::new(Vec::<SkipEvent>::new()));
    let on_ignore = ignored.hook();
    let skip_sink = Arc::clone(&skipped);
    let options = PlanOptions::new()
        .on_ignore(move |entry| on_ignore(entry))
        .on_skip(move |event| lock(&skip_sink).push(event.clone()));

    let operations = planner.plan(&options).await?;
    let skipped = mem::take(&mut *lock(&skipped));
    let ignored = ignored.take_all();
    renderer.plan_result(
        &mut *out,
        &PlanReport {
            operations: &operations,
            skipped: &skipped,
            ignored: &ignored,
        },
    )?;
    if operations.is_empty() {
        return Ok(());
    }

    let confirmed = match settings.proceed {
        Some(proceed) => proceed,
        None if renderer.json => prompt::confirm(input, err, operations.len())?,
        None => prompt::confirm(input, out, operations.len())?,
    };
    if !confirmed {
        info!(target: "treesync::cli", operations = operations.len(), "not executing plan");
        return Ok(());
    }

    let (sender, mut events) = mpsc::unbounded_channel::<(Operation, OperationResult)>();
    let options = RunOptions::new()
        .concurrency(settings.concurrency)
        .on_end(move |operation, result| {
            let _ = sender.send((operation.clone(), *result));
        });

    let mut total = Duration::ZERO;
    relay(run_operations(operations, &options), &mut events, |(operation, result)| {
        total += result.duration;
        renderer.operation_result(&mut *out, &operation, &result)
    })
    .await?;

    renderer.sync_result(&mut *out, total)?;
    Ok(())
}
