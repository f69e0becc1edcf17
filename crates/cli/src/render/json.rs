use serde_json::{Map, Value, json};

use engine::{Entry, Operation, OperationResult, SkipEvent};

use super::{Listing, PlanReport, Renderer};

impl Renderer {
    fn entry_value(&self, entry: &Entry) -> Value {
        let mut value = json!({
            "key": entry.key(),
            "size": self.size_value(entry.size().unwrap_or(0)),
            "last_modified": entry.last_modified().map(|time| self.date_text(time)),
        });
        if self.show_hashes {
            value["hash"] = json!(entry.cached_hash());
        }
        value
    }

    fn operation_value(&self, operation: &Operation) -> Value {
        let mut value = json!({
            "type": operation.kind(),
            "reason": operation.reason(),
            "file": self.entry_value(operation.entry()),
        });
        if self.show_params {
            value["params"] = operation.params().clone();
        }
        value
    }

    fn skip_value(&self, event: &SkipEvent) -> Value {
        json!({
            "file": self.entry_value(&event.entry),
            "target_file": event.target_entry.as_ref().map(|entry| self.entry_value(entry)),
            "reason": event.reason,
        })
    }
}

pub(super) fn ls_result(renderer: &Renderer, listing: &Listing<'_>) -> Value {
    let mut value = json!({
        "type": "ls:result",
        "provider": { "root": listing.root },
        "files": listing
            .result
            .entries
            .iter()
            .map(|entry| renderer.entry_value(entry))
            .collect::<Vec<_>>(),
        "ignored_count": listing.ignored.len(),
        "duration": renderer.duration_value(listing.result.duration),
    });
    if renderer.show_ignored {
        value["ignored"] = listing
            .ignored
            .iter()
            .map(|entry| json!({ "file": renderer.entry_value(entry) }))
            .collect();
    }
    value
}

pub(super) fn plan_result(renderer: &Renderer, plan: &PlanReport<'_>) -> Value {
    let mut value = json!({
        "type": "sync:plan:result",
        "operations": plan
            .operations
            .iter()
            .map(|operation| renderer.operation_value(operation))
            .collect::<Vec<_>>(),
        "skipped_count": plan.skipped.len(),
        "ignored_count": plan.ignored_count(),
    });
    if renderer.show_skipped {
        value["skipped"] = plan
            .skipped
            .iter()
            .map(|event| renderer.skip_value(event))
            .collect();
    }
    if renderer.show_ignored {
        let by_root: Map<String, Value> = plan
            .ignored
            .iter()
            .map(|(root, entries)| {
                let files: Value = entries
                    .iter()
                    .map(|entry| json!({ "file": renderer.entry_value(entry) }))
                    .collect();
                (root.clone(), files)
            })
            .collect();
        value["ignored"] = Value::Object(by_root);
    }
    value
}

pub(super) fn operation_result(
    renderer: &Renderer,
    operation: &Operation,
    result: &OperationResult,
) -> Value {
    json!({
        "type": "sync:operation:result",
        "operation": renderer.operation_value(operation),
        "duration": renderer.duration_value(result.duration),
    })
}
