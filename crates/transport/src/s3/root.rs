use crate::resolve::split_scheme;

/// Scheme of bucket roots, e.g. `s3://bucket/prefix`.
pub const S3_PROTOCOL: &str = "s3";

/// Bucket and key prefix parsed from an `s3://` root.
///
/// The prefix is kept without leading or trailing slashes so that object
/// keys are always `prefix/key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Root {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix below the bucket, possibly empty.
    pub prefix: String,
}

impl S3Root {
    /// Parses `s3://bucket[/prefix]`. The scheme is matched case-insensitively.
    ///
    /// ```
    /// use transport::s3::S3Root;
    ///
    /// let root = S3Root::parse("s3://assets/site/v2/").expect("valid root");
    /// assert_eq!(root.bucket, "assets");
    /// assert_eq!(root.prefix, "site/v2");
    /// assert_eq!(S3Root::parse("s3://"), None);
    /// assert_eq!(S3Root::parse("./site"), None);
    /// ```
    #[must_use]
    pub fn parse(root: &str) -> Option<Self> {
        let (scheme, rest) = split_scheme(root)?;
        if !scheme.eq_ignore_ascii_case(S3_PROTOCOL) {
            return None;
        }
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.to_owned(),
            prefix: prefix.trim_matches('/').to_owned(),
        })
    }

    /// Prefix sent with list requests. Non-empty prefixes end in `/` so a
    /// sibling such as `site-old/` is not listed under `site`.
    #[must_use]
    pub fn list_prefix(&self) -> String {
        if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        }
    }

    /// Full object key of `key` below the prefix.
    #[must_use]
    pub fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{}/{key}", self.prefix)
        }
    }

    /// Provider key of a listed object, or `None` for the prefix itself and
    /// for folder placeholders ending in `/`.
    #[must_use]
    pub fn relative_key<'a>(&self, object_key: &'a str) -> Option<&'a str> {
        let key = object_key
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(object_key)
            .trim_start_matches('/');
        (!key.is_empty() && !key.ends_with('/')).then_some(key)
    }

    /// `bucket/prefix/key` descriptor used as the source of a server-side copy.
    #[must_use]
    pub fn copy_source(&self, key: &str) -> String {
        format!("{}/{}", self.bucket, self.object_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(bucket: &str, prefix: &str) -> S3Root {
        S3Root {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
        }
    }

    #[test]
    fn parses_bucket_and_prefix() {
        assert_eq!(S3Root::parse("s3://b"), Some(root("b", "")));
        assert_eq!(S3Root::parse("s3://b/"), Some(root("b", "")));
        assert_eq!(S3Root::parse("S3://b/a/b"), Some(root("b", "a/b")));
        assert_eq!(S3Root::parse("s3://b//a//"), Some(root("b", "a")));
    }

    #[test]
    fn rejects_other_roots() {
        assert_eq!(S3Root::parse("s3:///prefix"), None);
        assert_eq!(S3Root::parse("file:///srv"), None);
        assert_eq!(S3Root::parse("bucket/prefix"), None);
    }

    #[test]
    fn keys_join_under_prefix() {
        let site = root("b", "site");
        assert_eq!(site.list_prefix(), "site/");
        assert_eq!(site.object_key("css/a.css"), "site/css/a.css");
        assert_eq!(site.copy_source("css/a.css"), "b/site/css/a.css");

        let bare = root("b", "");
        assert_eq!(bare.list_prefix(), "");
        assert_eq!(bare.object_key("/a.css"), "a.css");
        assert_eq!(bare.copy_source("a.css"), "b/a.css");
    }

    #[test]
    fn relative_key_skips_prefix_and_folders() {
        let site = root("b", "site");
        assert_eq!(site.relative_key("site/index.html"), Some("index.html"));
        assert_eq!(site.relative_key("site//x.js"), Some("x.js"));
        assert_eq!(site.relative_key("site/"), None);
        assert_eq!(site.relative_key("site/img/"), None);
        assert_eq!(site.relative_key("site"), None);
    }
}
