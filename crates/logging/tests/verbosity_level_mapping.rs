//! Integration tests for verbosity level mapping.
//!
//! Test coverage:
//! 1. No `-v` keeps every area at warnings
//! 2. `-v`, `-vv`, `-vvv` raise the stage areas progressively
//! 3. Traversal logging only opens up from `-vv`
//! 4. Directives render in a stable order usable by `EnvFilter`

use logging::{LogArea, VerbosityConfig, VerbosityLevel, filter_for};
use tracing::level_filters::LevelFilter;

// ============================================================================
// Level mapping
// ============================================================================

#[test]
fn quiet_keeps_everything_at_warn() {
    let config = VerbosityConfig::from_verbose_level(0);
    for area in LogArea::ALL {
        assert_eq!(config.level(area), LevelFilter::WARN, "{area}");
    }
    assert_eq!(config, VerbosityConfig::default());
}

#[test]
fn single_v_enables_stage_summaries() {
    let config = VerbosityConfig::from_verbose_level(1);
    assert_eq!(config.level(LogArea::List), LevelFilter::INFO);
    assert_eq!(config.level(LogArea::Plan), LevelFilter::INFO);
    assert_eq!(config.level(LogArea::Run), LevelFilter::INFO);
    assert_eq!(config.level(LogArea::Walk), LevelFilter::WARN);
}

#[test]
fn double_v_enables_debug_including_walk() {
    let config = VerbosityConfig::from_verbose_level(2);
    for area in LogArea::ALL {
        assert_eq!(config.level(area), LevelFilter::DEBUG, "{area}");
    }
}

#[test]
fn levels_above_three_saturate_at_trace() {
    assert_eq!(
        VerbosityConfig::from_verbose_level(7),
        VerbosityConfig::from_level(VerbosityLevel::Trace)
    );
    assert_eq!(
        VerbosityConfig::from_verbose_level(3).level(LogArea::Walk),
        LevelFilter::TRACE
    );
}

#[test]
fn default_level_stays_warn_at_every_verbosity() {
    for count in 0..=3 {
        assert_eq!(VerbosityConfig::from_verbose_level(count).default, LevelFilter::WARN);
    }
}

// ============================================================================
// Directives
// ============================================================================

#[test]
fn directives_list_every_area_in_order() {
    let config = VerbosityConfig::from_verbose_level(1);
    assert_eq!(
        config.directives(),
        "warn,treesync::list=info,treesync::plan=info,treesync::run=info,treesync::walk=warn"
    );
}

#[test]
fn area_override_is_reflected_in_directives() {
    let config =
        VerbosityConfig::from_verbose_level(0).with_level(LogArea::Run, LevelFilter::DEBUG);
    assert!(config.directives().contains("treesync::run=debug"));
    assert!(config.directives().contains("treesync::plan=warn"));
}

#[test]
fn generated_directives_parse_as_env_filter() {
    for count in 0..=3 {
        let config = VerbosityConfig::from_verbose_level(count);
        let rendered = filter_for(None, &config).to_string();
        assert!(rendered.contains("treesync::list"), "{rendered}");
    }
}
