//! Per-area filter levels derived from the `-v` count.

use std::fmt::Write as _;

use tracing::level_filters::LevelFilter;

use super::levels::{LogArea, VerbosityLevel};

/// Filter level for every [`LogArea`], plus the default for other targets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerbosityConfig {
    /// Level applied to targets outside treesync's areas.
    pub default: LevelFilter,
    /// Level for `treesync::list`.
    pub list: LevelFilter,
    /// Level for `treesync::plan`.
    pub plan: LevelFilter,
    /// Level for `treesync::run`.
    pub run: LevelFilter,
    /// Level for `treesync::walk`.
    pub walk: LevelFilter,
}

impl Default for VerbosityConfig {
    fn default() -> Self {
        Self::from_level(VerbosityLevel::Quiet)
    }
}

impl VerbosityConfig {
    /// Builds the configuration for a `-v` count (0-3, higher saturates).
    #[must_use]
    pub fn from_verbose_level(count: u8) -> Self {
        Self::from_level(VerbosityLevel::from_count(count))
    }

    /// Builds the configuration for `level`.
    #[must_use]
    pub fn from_level(level: VerbosityLevel) -> Self {
        let uniform = |area: LevelFilter, walk: LevelFilter| Self {
            default: LevelFilter::WARN,
            list: area,
            plan: area,
            run: area,
            walk,
        };
        match level {
            VerbosityLevel::Quiet => uniform(LevelFilter::WARN, LevelFilter::WARN),
            VerbosityLevel::Normal => uniform(LevelFilter::INFO, LevelFilter::WARN),
            VerbosityLevel::Verbose => uniform(LevelFilter::DEBUG, LevelFilter::DEBUG),
            VerbosityLevel::Trace => uniform(LevelFilter::TRACE, LevelFilter::TRACE),
        }
    }

    /// Level configured for `area`.
    #[must_use]
    pub const fn level(&self, area: LogArea) -> LevelFilter {
        match area {
            LogArea::List => self.list,
            LogArea::Plan => self.plan,
            LogArea::Run => self.run,
            LogArea::Walk => self.walk,
        }
    }

    /// Overrides the level of one area.
    #[must_use]
    pub fn with_level(mut self, area: LogArea, level: LevelFilter) -> Self {
        match area {
            LogArea::List => self.list = level,
            LogArea::Plan => self.plan = level,
            LogArea::Run => self.run = level,
            LogArea::Walk => self.walk = level,
        }
        self
    }

    /// Renders the configuration as `EnvFilter` directives,
    /// e.g. `warn,treesync::list=info,...`.
    #[must_use]
    pub fn directives(&self) -> String {
        let mut out = level_name(self.default).to_owned();
        for area in LogArea::ALL {
            let _ = write!(out, ",{}={}", area.target(), level_name(self.level(area)));
        }
        out
    }
}

fn level_name(level: LevelFilter) -> &'static str {
    [
        (LevelFilter::OFF, "off"),
        (LevelFilter::ERROR, "error"),
        (LevelFilter::WARN, "warn"),
        (LevelFilter::INFO, "info"),
        (LevelFilter::DEBUG, "debug"),
    ]
    .into_iter()
    .find_map(|(candidate, name)| (candidate == level).then_some(name))
    .unwrap_or("trace")
}
