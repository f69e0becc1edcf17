//! Text and JSON rendering of command results.
//!
//! Text output is meant for people: sizes are human readable, rows are
//! aligned on 8-column tab stops without emitting tab characters. JSON output
//! is one pretty-printed document per result, each tagged with a `type`.
//! `--porcelain` switches both to raw bytes, milliseconds and ISO 8601 dates.

mod json;
mod text;

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use engine::{Entry, ListResult, Operation, OperationResult, SkipEvent};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::arguments::GlobalArgs;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count in base 1024 with at most one decimal, e.g. `1.5 KB`.
///
/// ```
/// assert_eq!(cli::format_size(122), "122 B");
/// assert_eq!(cli::format_size(1024), "1 KB");
/// assert_eq!(cli::format_size(1536), "1.5 KB");
/// assert_eq!(cli::format_size(5 * 1024 * 1024), "5 MB");
/// ```
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{value:.1}");
    let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{rendered} {}", SIZE_UNITS[unit])
}

/// Formats a duration compactly, e.g. `850ms`, `1.5s` or `2m 5s`.
///
/// ```
/// use std::time::Duration;
///
/// assert_eq!(cli::format_duration(Duration::from_millis(850)), "850ms");
/// assert_eq!(cli::format_duration(Duration::from_millis(1500)), "1.5s");
/// assert_eq!(cli::format_duration(Duration::from_secs(125)), "2m 5s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    if secs < 60 {
        let rendered = format!("{:.1}", duration.as_secs_f64());
        let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
        return format!("{rendered}s");
    }

    let parts = [
        (secs / 86_400, "d"),
        (secs / 3600 % 24, "h"),
        (secs / 60 % 60, "m"),
        (secs % 60, "s"),
    ];
    parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit_json(out: &mut dyn Write, value: &serde_json::Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

/// One provider's listing, ready to render.
pub(crate) struct Listing<'a> {
    pub root: &'a str,
    pub result: &'a ListResult,
    pub ignored: &'a [Arc<Entry>],
}

/// A plan and its side-channel events, ready to render.
pub(crate) struct PlanReport<'a> {
    pub operations: &'a [Operation],
    pub skipped: &'a [SkipEvent],
    pub ignored: &'a BTreeMap<String, Vec<Arc<Entry>>>,
}

impl PlanReport<'_> {
    fn ignored_count(&self) -> usize {
        self.ignored.values().map(Vec::len).sum()
    }

    fn transfer_size(&self) -> u64 {
        self.operations
            .iter()
            .filter(|operation| operation.reason().is_some())
            .filter_map(|operation| operation.entry().size())
            .sum()
    }
}

/// Output settings shared by every command.
#[derive(Clone, Debug, Default)]
pub(crate) struct Renderer {
    pub json: bool,
    pub porcelain: bool,
    pub show_hashes: bool,
    pub show_ignored: bool,
    pub show_skipped: bool,
    pub show_params: bool,
    cwd: PathBuf,
}

impl Renderer {
    pub(crate) fn new(global: &GlobalArgs, cwd: PathBuf) -> Self {
        Self {
            json: global.json,
            porcelain: global.porcelain,
            show_hashes: global.show_hashes,
            show_ignored: global.show_ignored,
            show_skipped: false,
            show_params: false,
            cwd,
        }
    }

    pub(crate) fn ls_result(&self, out: &mut dyn Write, listing: &Listing<'_>) -> io::Result<()> {
        if self.json {
            emit_json(out, &json::ls_result(self, listing))
        } else {
            writeln!(out, "{}", text::ls_result(self, listing))
        }
    }

    pub(crate) fn plan_result(&self, out: &mut dyn Write, plan: &PlanReport<'_>) -> io::Result<()> {
        if self.json {
            emit_json(out, &json::plan_result(self, plan))
        } else {
            writeln!(out, "{}", text::plan_result(self, plan))
        }
    }

    pub(crate) fn operation_result(
        &self,
        out: &mut dyn Write,
        operation: &Operation,
        result: &OperationResult,
    ) -> io::Result<()> {
        if self.json {
            emit_json(out, &json::operation_result(self, operation, result))
        } else {
            writeln!(
                out,
                "{} {} ({})",
                operation.kind(),
                operation.key(),
                self.duration_text(result.duration)
            )
        }
    }

    pub(crate) fn sync_result(&self, out: &mut dyn Write, duration: Duration) -> io::Result<()> {
        if self.json {
            emit_json(
                out,
                &serde_json::json!({
                    "type": "sync:result",
                    "duration": self.duration_value(duration),
                }),
            )
        } else {
            writeln!(out, "# Finished in {}", self.duration_text(duration))
        }
    }

    pub(crate) fn init_result(&self, out: &mut dyn Write, wrote: &Path) -> io::Result<()> {
        if self.json {
            emit_json(
                out,
                &serde_json::json!({ "type": "init:result", "wrote": wrote.display().to_string() }),
            )
        } else {
            writeln!(out, "Wrote {}", wrote.display())
        }
    }

    /// Expands a leading `.` to the working directory.
    fn display_root(&self, root: &str) -> String {
        if root == "." {
            return self.cwd.display().to_string();
        }
        match root.strip_prefix("./") {
            Some(rest) => self.cwd.join(rest).display().to_string(),
            None => root.to_owned(),
        }
    }

    fn size_text(&self, bytes: u64) -> String {
        if self.porcelain {
            format!("{bytes} B")
        } else {
            format_size(bytes)
        }
    }

    fn size_value(&self, bytes: u64) -> serde_json::Value {
        if self.porcelain {
            bytes.into()
        } else {
            format_size(bytes).into()
        }
    }

    fn duration_text(&self, duration: Duration) -> String {
        if self.porcelain {
            format!("{}ms", duration.as_millis())
        } else {
            format_duration(duration)
        }
    }

    fn duration_value(&self, duration: Duration) -> serde_json::Value {
        if self.porcelain {
            u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).into()
        } else {
            format_duration(duration).into()
        }
    }

    /// UTC timestamp: `2024-03-01 12:30:00`, or ISO 8601 with `--porcelain`.
    fn date_text(&self, time: SystemTime) -> String {
        let date = OffsetDateTime::from(time);
        let formatted = if self.porcelain {
            date.format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
            ))
        } else {
            date.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        };
        formatted.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_round_to_one_decimal() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1100), "1.1 KB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3 GB");
        assert_eq!(format_size(u64::MAX), "16777216 TB");
    }

    #[test]
    fn durations_drop_zero_components() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[test]
    fn porcelain_uses_raw_units() {
        let renderer = Renderer {
            porcelain: true,
            ..Renderer::default()
        };
        assert_eq!(renderer.size_text(2048), "2048 B");
        assert_eq!(renderer.duration_text(Duration::from_millis(1500)), "1500ms");
        assert_eq!(renderer.duration_value(Duration::from_millis(12)), 12);
        assert_eq!(
            renderer.date_text(SystemTime::UNIX_EPOCH),
            "1970-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn dates_render_in_utc() {
        let renderer = Renderer::default();
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(renderer.date_text(time), "2023-11-14 22:13:20");
    }

    #[test]
    fn relative_roots_expand_against_cwd() {
        let renderer = Renderer {
            cwd: PathBuf::from("/work"),
            ..Renderer::default()
        };
        assert_eq!(renderer.display_root("."), "/work");
        assert_eq!(renderer.display_root("./site"), "/work/site");
        assert_eq!(renderer.display_root("/srv/www"), "/srv/www");
        assert_eq!(renderer.display_root("file:///srv"), "file:///srv");
    }
}
