use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};

use crate::{FilterError, IgnoreRule};

#[derive(Debug)]
struct CompiledRule {
    rule: IgnoreRule,
    matcher: GlobMatcher,
}

impl CompiledRule {
    fn new(rule: IgnoreRule) -> Result<Self, FilterError> {
        let matcher = GlobBuilder::new(&rule.glob)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .map_err(|source| FilterError::Pattern {
                pattern: rule.pattern.clone(),
                source,
            })?
            .compile_matcher();
        Ok(Self { rule, matcher })
    }

    fn matches(&self, path: &str, is_dir: bool) -> bool {
        (!self.rule.dir_only || is_dir) && self.matcher.is_match(path)
    }
}

/// Compiled, immutable list of ignore rules.
///
/// Cheaply cloneable; the compiled matchers sit behind an [`Arc`].
///
/// # Examples
///
/// ```
/// use filters::IgnoreSet;
///
/// let set = IgnoreSet::from_patterns([".*", "node_modules/"]).unwrap();
/// assert!(set.is_ignored(".env", false));
/// assert!(set.is_ignored("web/node_modules/react/index.js", false));
/// assert!(!set.is_ignored("web/index.html", false));
/// ```
#[derive(Clone, Debug, Default)]
pub struct IgnoreSet {
    rules: Arc<Vec<CompiledRule>>,
}

impl IgnoreSet {
    /// Compiles `patterns` in order. Blank lines and `#` comments are skipped.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_rules(
            patterns
                .into_iter()
                .filter_map(|pattern| IgnoreRule::parse(pattern.as_ref())),
        )
    }

    /// Compiles already parsed rules in order.
    pub fn from_rules<I>(rules: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = IgnoreRule>,
    {
        let rules = rules
            .into_iter()
            .map(CompiledRule::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules: Arc::new(rules),
        })
    }

    /// Returns `true` when no rules were compiled; such a set ignores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of compiled rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Iterates the compiled rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &IgnoreRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    /// Returns `true` when `path` (forward-slash, relative to the root) is ignored.
    ///
    /// `is_dir` should be `true` when the path names a directory, which
    /// affects directory-only rules. Every parent directory of `path` is
    /// checked first; an ignored parent ignores the whole subtree.
    #[must_use]
    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let path = path.trim_matches('/');
        let mut parents = path.match_indices('/').map(|(index, _)| &path[..index]);
        if parents.any(|parent| self.decide(parent, true)) {
            return true;
        }
        self.decide(path, is_dir)
    }

    fn decide(&self, path: &str, is_dir: bool) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|compiled| compiled.matches(path, is_dir))
            .is_some_and(|compiled| !compiled.rule.negated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_ignores_nothing() {
        let set = IgnoreSet::default();
        assert!(set.is_empty());
        assert!(!set.is_ignored("anything", false));
    }

    #[test]
    fn last_matching_rule_wins() {
        let set = IgnoreSet::from_patterns(["*.txt", "!A.txt"]).expect("compile");
        assert!(!set.is_ignored("A.txt", false));
        assert!(set.is_ignored("B.txt", false));

        let reversed = IgnoreSet::from_patterns(["!A.txt", "*.txt"]).expect("compile");
        assert!(reversed.is_ignored("A.txt", false));
    }

    #[test]
    fn dir_only_rule_skips_files() {
        let set = IgnoreSet::from_patterns(["logs/"]).expect("compile");
        assert!(set.is_ignored("logs", true));
        assert!(!set.is_ignored("logs", false));
        assert!(set.is_ignored("logs/today.log", false));
    }

    #[test]
    fn ignored_parent_cannot_be_reincluded() {
        let set = IgnoreSet::from_patterns(["build/", "!build/keep.txt"]).expect("compile");
        assert!(set.is_ignored("build/keep.txt", false));
    }

    #[test]
    fn star_does_not_cross_separator() {
        let set = IgnoreSet::from_patterns(["/assets/*.png"]).expect("compile");
        assert!(set.is_ignored("assets/logo.png", false));
        assert!(!set.is_ignored("assets/icons/logo.png", false));
    }

    #[test]
    fn invalid_glob_reports_pattern() {
        let error = IgnoreSet::from_patterns(["ok", "[broken"]).expect_err("bad glob");
        assert_eq!(error.pattern(), Some("[broken"));
    }
}
