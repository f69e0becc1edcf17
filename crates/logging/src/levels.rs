use std::fmt;

/// Coarse verbosity selected with repeated `-v` flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum VerbosityLevel {
    /// Warnings and errors only.
    #[default]
    Quiet,
    /// Stage summaries.
    Normal,
    /// Per-task progress.
    Verbose,
    /// Per-entry decisions.
    Trace,
}

impl VerbosityLevel {
    /// Maps a `-v` count to a level; counts above three saturate.
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Quiet,
            1 => Self::Normal,
            2 => Self::Verbose,
            _ => Self::Trace,
        }
    }

    /// Number of `-v` flags this level corresponds to.
    #[must_use]
    pub const fn count(self) -> u8 {
        self as u8
    }
}

/// Event target family a filter level applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LogArea {
    /// Enumeration of provider roots.
    List,
    /// Reconciliation of origin and target.
    Plan,
    /// Execution of operations.
    Run,
    /// Local directory traversal.
    Walk,
}

impl LogArea {
    /// Every area, in directive order.
    pub const ALL: [Self; 4] = [Self::List, Self::Plan, Self::Run, Self::Walk];

    /// `tracing` target the area's events are emitted under.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::List => "treesync::list",
            Self::Plan => "treesync::plan",
            Self::Run => "treesync::run",
            Self::Walk => "treesync::walk",
        }
    }
}

impl fmt::Display for LogArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_saturate_at_trace() {
        assert_eq!(VerbosityLevel::from_count(0), VerbosityLevel::Quiet);
        assert_eq!(VerbosityLevel::from_count(3), VerbosityLevel::Trace);
        assert_eq!(VerbosityLevel::from_count(9), VerbosityLevel::Trace);
        assert_eq!(VerbosityLevel::from_count(2).count(), 2);
    }

    #[test]
    fn areas_map_to_treesync_targets() {
        let targets: Vec<_> = LogArea::ALL.iter().map(|area| area.target()).collect();
        assert_eq!(
            targets,
            ["treesync::list", "treesync::plan", "treesync::run", "treesync::walk"]
        );
    }
}
