use std::iter;
use std::sync::Arc;

use engine::{Entry, Operation, OperationKind, Reason, SkipEvent};

use super::{Listing, PlanReport, Renderer};

const TAB_WIDTH: usize = 8;
const HASH_WIDTH: usize = 36;
const SIZE_WIDTH: usize = 11;

/// Joins columns, padding each but the last to the next tab stop.
fn tab_stop(columns: &[&str]) -> String {
    let mut line = String::new();
    let last = columns.len().saturating_sub(1);
    for (index, column) in columns.iter().enumerate() {
        line.push_str(column);
        if index < last {
            let width = line.chars().count();
            let next = (width / TAB_WIDTH + 1) * TAB_WIDTH;
            line.extend(iter::repeat_n(' ', next - width));
        }
    }
    line
}

fn by_key(a: &&Arc<Entry>, b: &&Arc<Entry>) -> std::cmp::Ordering {
    a.key().cmp(b.key())
}

impl Renderer {
    fn file_row(&self, entry: &Entry, ignored: bool) -> String {
        let prefix = if ignored { "! " } else { "  " };
        let hash = if self.show_hashes {
            format!("{:<HASH_WIDTH$}", entry.cached_hash().unwrap_or_default())
        } else {
            String::new()
        };
        let date_width = if self.porcelain { 24 } else { 22 };
        let date = entry
            .last_modified()
            .map(|time| self.date_text(time))
            .unwrap_or_default();
        let date = format!("{date:<date_width$}");
        // Bytes get a trailing space so the unit column lines up with "KB".
        let size = self.size_text(entry.size().unwrap_or(0)).replace(" B", " B ");
        let size = format!("{size:>SIZE_WIDTH$}");
        format!("{prefix}{hash}{}", tab_stop(&[&date, &size, entry.key()]))
    }
}

pub(super) fn ls_result(renderer: &Renderer, listing: &Listing<'_>) -> String {
    let mut lines = vec![format!("# {}", renderer.display_root(listing.root))];

    let mut files: Vec<&Arc<Entry>> = listing.result.entries.iter().collect();
    files.sort_by(by_key);
    let mut ignored: Vec<&Arc<Entry>> = if renderer.show_ignored {
        listing.ignored.iter().collect()
    } else {
        Vec::new()
    };
    ignored.sort_by(by_key);

    let total: u64 = files.iter().filter_map(|entry| entry.size()).sum();
    let file_count = files.len();
    let mut files = files.into_iter().peekable();
    let mut ignored = ignored.into_iter().peekable();
    loop {
        let take_file = match (files.peek(), ignored.peek()) {
            (Some(file), Some(excluded)) => file.key() < excluded.key(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_file { files.next() } else { ignored.next() };
        if let Some(entry) = next {
            lines.push(renderer.file_row(entry, !take_file));
        }
    }

    lines.push(format!("# {} ignored", listing.ignored.len()));
    lines.push(format!(
        "# {file_count} files ({})",
        renderer.size_text(total)
    ));
    lines.push(format!(
        "# Finished in {}",
        renderer.duration_text(listing.result.duration)
    ));
    lines.join("\n")
}

enum PlanRow<'a> {
    Operation(&'a Operation),
    Skipped(&'a SkipEvent),
}

impl PlanRow<'_> {
    fn key(&self) -> &str {
        match self {
            Self::Operation(operation) => operation.key(),
            Self::Skipped(event) => event.entry.key(),
        }
    }
}

fn operation_line(renderer: &Renderer, operation: &Operation) -> String {
    match (operation.kind(), operation.reason()) {
        (OperationKind::Delete, _) | (_, None) => format!("- {}", operation.key()),
        (_, Some(reason)) => {
            let symbol = if reason == Reason::Add { '+' } else { '%' };
            let size = renderer.size_text(operation.entry().size().unwrap_or(0));
            format!("{symbol} {} ({size})", operation.key())
        }
    }
}

pub(super) fn plan_result(renderer: &Renderer, plan: &PlanReport<'_>) -> String {
    let mut lines = Vec::new();

    if renderer.show_ignored {
        for (root, entries) in plan.ignored {
            if entries.is_empty() {
                continue;
            }
            lines.push(format!("# Ignored in {}", renderer.display_root(root)));
            let mut entries: Vec<&Arc<Entry>> = entries.iter().collect();
            entries.sort_by(by_key);
            lines.extend(entries.iter().map(|entry| format!("! {}", entry.key())));
        }
    }

    lines.push("# Plan".to_owned());

    let skipped: &[SkipEvent] = if renderer.show_skipped { plan.skipped } else { &[] };
    let mut rows: Vec<PlanRow<'_>> = plan
        .operations
        .iter()
        .map(PlanRow::Operation)
        .chain(skipped.iter().map(PlanRow::Skipped))
        .collect();
    rows.sort_by(|a, b| a.key().cmp(b.key()));

    for row in rows {
        match row {
            PlanRow::Operation(operation) => {
                lines.push(operation_line(renderer, operation));
                if renderer.show_params && !operation.params().is_null() {
                    let params =
                        serde_json::to_string_pretty(operation.params()).unwrap_or_default();
                    lines.push(format!("{} {params}", operation.kind()));
                }
            }
            PlanRow::Skipped(event) => {
                let symbol = if event.reason == Reason::Add { '?' } else { '=' };
                lines.push(format!("{symbol} {}", event.entry.key()));
            }
        }
    }

    lines.push(format!("# {} ignored", plan.ignored_count()));
    lines.push(format!("# {} skipped", plan.skipped.len()));
    lines.push(format!(
        "# {} operations ({} to transfer)",
        plan.operations.len(),
        renderer.size_text(plan.transfer_size())
    ));
    if plan.operations.is_empty() {
        lines.push("Nothing to do".to_owned());
    }
    lines.join("\n")
}
