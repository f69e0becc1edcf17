/// One parsed `.gitignore`-style pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IgnoreRule {
    pub(crate) pattern: String,
    pub(crate) glob: String,
    pub(crate) negated: bool,
    pub(crate) dir_only: bool,
    pub(crate) anchored: bool,
}

impl IgnoreRule {
    /// Parses `pattern`. Returns `None` for blank lines and `#` comments.
    ///
    /// # Examples
    /// ```
    /// use filters::IgnoreRule;
    /// let rule = IgnoreRule::parse("!/build/").expect("rule");
    /// assert!(rule.is_negated());
    /// assert!(rule.is_dir_only());
    /// assert!(rule.is_anchored());
    /// assert!(IgnoreRule::parse("# comment").is_none());
    /// ```
    #[must_use]
    pub fn parse(pattern: &str) -> Option<Self> {
        let original = pattern.trim_end();
        if original.is_empty() || original.starts_with('#') {
            return None;
        }

        let mut body = original;
        let negated = body.starts_with('!');
        if negated {
            body = &body[1..];
        }
        // `\#` and `\!` escape a literal leading character.
        if body.starts_with("\\#") || body.starts_with("\\!") {
            body = &body[1..];
        }

        let dir_only = body.len() > 1 && body.ends_with('/');
        if dir_only {
            body = &body[..body.len() - 1];
        }

        let anchored = body.starts_with('/') || body.contains('/');
        let body = body.trim_start_matches('/');
        if body.is_empty() {
            return None;
        }

        let glob = if anchored || body.starts_with("**/") {
            body.to_owned()
        } else {
            format!("**/{body}")
        };

        Some(Self {
            pattern: original.to_owned(),
            glob,
            negated,
            dir_only,
            anchored,
        })
    }

    /// The pattern as written.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The glob the pattern compiles to.
    #[must_use]
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Whether a match re-includes the path (`!pattern`).
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether the rule only matches directories (`pattern/`).
    #[must_use]
    pub const fn is_dir_only(&self) -> bool {
        self.dir_only
    }

    /// Whether the rule is relative to the root rather than any depth.
    #[must_use]
    pub const fn is_anchored(&self) -> bool {
        self.anchored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanchored_patterns_match_at_any_depth() {
        let rule = IgnoreRule::parse("*.md").expect("rule");
        assert_eq!(rule.glob(), "**/*.md");
        assert!(!rule.is_anchored());
    }

    #[test]
    fn inner_slash_anchors_pattern() {
        let rule = IgnoreRule::parse("docs/*.md").expect("rule");
        assert_eq!(rule.glob(), "docs/*.md");
        assert!(rule.is_anchored());
    }

    #[test]
    fn leading_slash_is_stripped() {
        let rule = IgnoreRule::parse("/dist").expect("rule");
        assert_eq!(rule.glob(), "dist");
        assert!(rule.is_anchored());
    }

    #[test]
    fn escaped_hash_is_a_pattern() {
        let rule = IgnoreRule::parse("\\#notes").expect("rule");
        assert_eq!(rule.glob(), "**/#notes");
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(IgnoreRule::parse("").is_none());
        assert!(IgnoreRule::parse("   ").is_none());
        assert!(IgnoreRule::parse("# build output").is_none());
        assert!(IgnoreRule::parse("/").is_none());
    }
}
