//! Effective settings: command-line flags merged over the config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine::{OperationKind, Provider};
use filters::{IgnoreSet, load_ignore_file};
use serde_json::{Map, Value};
use transport::{ProviderOptions, provider_for_root};

use crate::arguments::{LsArgs, ProviderArgs, SyncArgs};
use crate::config::{
    CompareMode, ConfigError, ConfigFile, DEFAULT_COMPARE_CONCURRENCY,
    DEFAULT_REQUEST_CONCURRENCY, ProviderConfig,
};

pub(crate) const ORIGIN_IGNORE_FILE: &str = ".treesync.origin.ignore";
pub(crate) const TARGET_IGNORE_FILE: &str = ".treesync.target.ignore";
const DEFAULT_ORIGIN_ROOT: &str = ".";

/// Extra request parameters per operation kind, merged over the ones the
/// provider builds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RequestParams {
    pub put: Map<String, Value>,
    pub copy: Map<String, Value>,
    pub delete: Map<String, Value>,
}

impl RequestParams {
    fn is_empty(&self) -> bool {
        self.put.is_empty() && self.copy.is_empty() && self.delete.is_empty()
    }

    /// Shallow merge: top-level keys replace the built value.
    fn merge_into(&self, kind: OperationKind, params: &mut Value) {
        let extra = match kind {
            OperationKind::Put => &self.put,
            OperationKind::Copy => &self.copy,
            OperationKind::Delete => &self.delete,
        };
        if let Value::Object(params) = params {
            for (key, value) in extra {
                params.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Everything needed to build one provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ProviderSettings {
    pub root: String,
    /// Loaded first; a missing file contributes nothing.
    pub ignore_file: Option<PathBuf>,
    /// Applied after the ignore file, so they can re-include its matches.
    pub patterns: Vec<String>,
    pub strip_suffix: Option<String>,
    pub follow_symlinks: bool,
    pub checksum: bool,
    pub params: RequestParams,
}

impl ProviderSettings {
    fn merge(
        config: Option<&ProviderConfig>,
        args: &ProviderArgs,
        default_root: Option<&str>,
        default_ignore_file: PathBuf,
    ) -> Option<Self> {
        let section = config.map(ProviderConfig::to_section).unwrap_or_default();
        let root = args
            .root
            .clone()
            .or_else(|| section.root.clone())
            .or_else(|| default_root.map(str::to_owned))?;

        let ignore_file = match args.ignore_file.clone().or(section.ignore_file) {
            Some(path) if path.as_os_str().is_empty() => None,
            Some(path) => Some(path),
            None => Some(default_ignore_file),
        };
        let mut patterns = section.ignore_patterns;
        patterns.extend(args.ignore.iter().cloned());

        Some(Self {
            root,
            ignore_file,
            patterns,
            strip_suffix: section.strip_suffix,
            follow_symlinks: section.follow_symlinks.unwrap_or(true),
            checksum: section.checksum.unwrap_or(true),
            params: RequestParams {
                put: section.put_params.unwrap_or_default(),
                copy: section.copy_params.unwrap_or_default(),
                delete: section.delete_params.unwrap_or_default(),
            },
        })
    }

    /// Plain settings for a root named on the command line.
    fn bare(root: &str) -> Self {
        Self {
            root: root.to_owned(),
            ignore_file: None,
            patterns: Vec::new(),
            strip_suffix: None,
            follow_symlinks: true,
            checksum: true,
            params: RequestParams::default(),
        }
    }

    /// Compiles the ignore rules and resolves the provider for the root.
    pub(crate) fn build(&self) -> Result<Arc<dyn Provider>, ConfigError> {
        let mut patterns = match &self.ignore_file {
            Some(path) => load_ignore_file(path)?,
            None => Vec::new(),
        };
        patterns.extend(self.patterns.iter().cloned());

        let mut options = ProviderOptions::default()
            .ignores(IgnoreSet::from_patterns(&patterns)?)
            .follow_symlinks(self.follow_symlinks)
            .checksum(self.checksum);
        if let Some(suffix) = &self.strip_suffix {
            options = options.strip_suffix(suffix.clone());
        }
        if !self.params.is_empty() {
            let params = self.params.clone();
            options = options.params_hook(move |kind, _, value| params.merge_into(kind, value));
        }
        Ok(provider_for_root(&self.root, options)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LsSettings {
    pub providers: Vec<ProviderSettings>,
    pub list_concurrency: usize,
}

impl LsSettings {
    /// Roots named on the command line are listed as given. Without any,
    /// the configured origin and (when set) target are listed with their
    /// ignore rules.
    pub(crate) fn resolve(config: &ConfigFile, args: &LsArgs, cwd: &Path) -> Self {
        let providers: Vec<ProviderSettings> = if args.roots.is_empty() {
            let none = ProviderArgs::default();
            [
                ProviderSettings::merge(
                    config.origin.as_ref(),
                    &none,
                    Some(DEFAULT_ORIGIN_ROOT),
                    cwd.join(ORIGIN_IGNORE_FILE),
                ),
                ProviderSettings::merge(
                    config.target.as_ref(),
                    &none,
                    None,
                    cwd.join(TARGET_IGNORE_FILE),
                ),
            ]
            .into_iter()
            .flatten()
            .collect()
        } else {
            args.roots.iter().map(|root| ProviderSettings::bare(root)).collect()
        };
        let providers = providers
            .into_iter()
            .map(|mut provider| {
                provider.follow_symlinks &= !args.no_follow_symlinks;
                provider
            })
            .collect();

        Self {
            providers,
            list_concurrency: args
                .list_concurrency
                .or(config.list_concurrency)
                .unwrap_or(DEFAULT_REQUEST_CONCURRENCY),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SyncSettings {
    pub origin: ProviderSettings,
    pub target: ProviderSettings,
    pub delete: bool,
    pub add_missing: bool,
    pub compare: CompareMode,
    pub compare_concurrency: usize,
    pub list_concurrency: usize,
    pub concurrency: usize,
    /// `Some(true)` runs without asking, `Some(false)` only previews,
    /// `None` prompts.
    pub proceed: Option<bool>,
}

impl SyncSettings {
    pub(crate) fn resolve(
        config: &ConfigFile,
        args: &SyncArgs,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        let mut origin = ProviderSettings::merge(
            config.origin.as_ref(),
            &args.origin,
            Some(DEFAULT_ORIGIN_ROOT),
            cwd.join(ORIGIN_IGNORE_FILE),
        )
        .unwrap_or_else(|| ProviderSettings::bare(DEFAULT_ORIGIN_ROOT));
        let mut target = ProviderSettings::merge(
            config.target.as_ref(),
            &args.target,
            None,
            cwd.join(TARGET_IGNORE_FILE),
        )
        .ok_or(ConfigError::MissingTarget)?;
        if let Some(suffix) = &args.strip_suffix {
            target.strip_suffix = Some(suffix.clone());
        }
        if args.no_checksum {
            target.checksum = false;
        }
        if args.no_follow_symlinks {
            origin.follow_symlinks = false;
            target.follow_symlinks = false;
        }

        let proceed = if args.dry_run {
            Some(false)
        } else if args.yes {
            Some(true)
        } else {
            None
        };

        Ok(Self {
            origin,
            target,
            delete: args.delete || config.delete.unwrap_or(false),
            add_missing: !args.no_add && config.add_missing.unwrap_or(true),
            compare: args.compare.or(config.compare).unwrap_or_default(),
            compare_concurrency: args
                .compare_concurrency
                .or(config.compare_concurrency)
                .unwrap_or(DEFAULT_COMPARE_CONCURRENCY),
            list_concurrency: args
                .list_concurrency
                .or(config.list_concurrency)
                .unwrap_or(DEFAULT_REQUEST_CONCURRENCY),
            concurrency: args
                .concurrency
                .or(config.concurrency)
                .unwrap_or(DEFAULT_REQUEST_CONCURRENCY),
            proceed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn sync_args(origin: Option<&str>, target: Option<&str>) -> SyncArgs {
        SyncArgs {
            origin: ProviderArgs {
                root: origin.map(str::to_owned),
                ..ProviderArgs::default()
            },
            target: ProviderArgs {
                root: target.map(str::to_owned),
                ..ProviderArgs::default()
            },
            ..SyncArgs::default()
        }
    }

    #[test]
    fn defaults_apply_without_config() {
        let settings = SyncSettings::resolve(
            &ConfigFile::default(),
            &sync_args(None, Some("/srv/www")),
            Path::new("/work"),
        )
        .expect("settings");
        assert_eq!(settings.origin.root, ".");
        assert_eq!(
            settings.origin.ignore_file,
            Some(PathBuf::from("/work/.treesync.origin.ignore"))
        );
        assert_eq!(settings.target.root, "/srv/www");
        assert!(!settings.delete);
        assert!(settings.add_missing);
        assert_eq!(settings.compare, CompareMode::Hash);
        assert_eq!(settings.compare_concurrency, DEFAULT_COMPARE_CONCURRENCY);
        assert_eq!(settings.concurrency, DEFAULT_REQUEST_CONCURRENCY);
        assert_eq!(settings.proceed, None);
    }

    #[test]
    fn flags_override_config() {
        let config: ConfigFile = serde_json::from_str(
            r#"{
                "origin": { "root": "site", "ignore_patterns": ["*.tmp"] },
                "target": { "root": "/srv/www", "strip_suffix": ".gz" },
                "add_missing": true,
                "compare": "size",
                "concurrency": 8
            }"#,
        )
        .expect("config");
        let mut args = sync_args(Some("public"), None);
        args.origin.ignore = vec!["!keep.tmp".to_owned()];
        args.no_add = true;
        args.compare = Some(CompareMode::Always);
        args.yes = true;

        let settings = SyncSettings::resolve(&config, &args, Path::new("/work")).expect("settings");
        assert_eq!(settings.origin.root, "public");
        assert_eq!(settings.origin.patterns, ["*.tmp", "!keep.tmp"]);
        assert_eq!(settings.target.root, "/srv/www");
        assert_eq!(settings.target.strip_suffix.as_deref(), Some(".gz"));
        assert!(!settings.add_missing);
        assert_eq!(settings.compare, CompareMode::Always);
        assert_eq!(settings.concurrency, 8);
        assert_eq!(settings.proceed, Some(true));
    }

    #[test]
    fn missing_target_is_reported() {
        let error = SyncSettings::resolve(
            &ConfigFile::default(),
            &sync_args(Some("site"), None),
            Path::new("/work"),
        )
        .expect_err("target required");
        assert!(matches!(error, ConfigError::MissingTarget));
    }

    #[test]
    fn empty_ignore_file_disables_default() {
        let config: ConfigFile =
            serde_json::from_str(r#"{ "target": { "root": "out", "ignore_file": "" } }"#)
                .expect("config");
        let settings =
            SyncSettings::resolve(&config, &SyncArgs::default(), Path::new("/work")).expect("ok");
        assert_eq!(settings.target.ignore_file, None);
    }

    #[test]
    fn ls_lists_configured_roots_by_default() {
        let config: ConfigFile =
            serde_json::from_str(r#"{ "target": "out" }"#).expect("config");
        let settings = LsSettings::resolve(&config, &LsArgs::default(), Path::new("/work"));
        let roots: Vec<_> = settings.providers.iter().map(|p| p.root.as_str()).collect();
        assert_eq!(roots, [".", "out"]);

        let args = LsArgs {
            roots: vec!["a".to_owned()],
            list_concurrency: Some(1),
            ..LsArgs::default()
        };
        let settings = LsSettings::resolve(&config, &args, Path::new("/work"));
        assert_eq!(settings.providers, [ProviderSettings::bare("a")]);
        assert_eq!(settings.list_concurrency, 1);
    }

    #[test]
    fn ignore_file_patterns_precede_explicit_patterns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ignore_file = dir.path().join("origin.ignore");
        fs::write(&ignore_file, "*.log\n").expect("write ignore file");
        fs::write(dir.path().join("keep.log"), b"kept").expect("write");
        fs::write(dir.path().join("drop.log"), b"dropped").expect("write");

        let settings = ProviderSettings {
            ignore_file: Some(ignore_file),
            patterns: vec!["!keep.log".to_owned()],
            ..ProviderSettings::bare(&dir.path().to_string_lossy())
        };
        let provider = settings.build().expect("provider");
        assert_eq!(provider.protocol(), "file");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let entries = runtime.block_on(provider.enumerate(None)).expect("enumerate");
        let keys: Vec<_> = entries.keys().collect();
        assert_eq!(keys, ["keep.log", "origin.ignore"]);
    }

    #[test]
    fn unsupported_scheme_is_a_config_error() {
        let error = ProviderSettings::bare("gs://bucket").build().err().expect("scheme");
        assert!(matches!(error, ConfigError::Transport(_)));
    }

    #[test]
    fn link_and_checksum_settings_merge_with_flags() {
        let config: ConfigFile = serde_json::from_str(
            r#"{
                "origin": { "root": "site", "follow_symlinks": true },
                "target": {
                    "root": "s3://b",
                    "checksum": false,
                    "put_params": { "ACL": "private" }
                }
            }"#,
        )
        .expect("config");

        let settings =
            SyncSettings::resolve(&config, &SyncArgs::default(), Path::new("/work")).expect("ok");
        assert!(settings.origin.follow_symlinks);
        assert!(settings.target.follow_symlinks);
        assert!(settings.origin.checksum);
        assert!(!settings.target.checksum);
        assert_eq!(settings.target.params.put["ACL"], "private");

        let args = SyncArgs {
            no_follow_symlinks: true,
            no_checksum: true,
            ..SyncArgs::default()
        };
        let settings = SyncSettings::resolve(&config, &args, Path::new("/work")).expect("ok");
        assert!(!settings.origin.follow_symlinks);
        assert!(!settings.target.follow_symlinks);
        assert!(!settings.target.checksum);

        let ls = LsSettings::resolve(
            &config,
            &LsArgs {
                roots: vec!["a".to_owned()],
                no_follow_symlinks: true,
                ..LsArgs::default()
            },
            Path::new("/work"),
        );
        assert!(!ls.providers[0].follow_symlinks);
    }

    #[test]
    fn request_params_merge_shallowly_per_kind() {
        let params = RequestParams {
            put: serde_json::from_str(r#"{ "ContentEncoding": "gzip", "Key": "override" }"#)
                .expect("map"),
            ..RequestParams::default()
        };
        let mut put = serde_json::json!({ "Bucket": "b", "Key": "app.js" });
        params.merge_into(OperationKind::Put, &mut put);
        assert_eq!(
            put,
            serde_json::json!({ "Bucket": "b", "Key": "override", "ContentEncoding": "gzip" })
        );

        let mut delete = serde_json::json!({ "Bucket": "b", "Key": "app.js" });
        params.merge_into(OperationKind::Delete, &mut delete);
        assert_eq!(delete, serde_json::json!({ "Bucket": "b", "Key": "app.js" }));
    }

    #[test]
    fn configured_put_params_reach_built_operations() {
        let origin = tempfile::tempdir().expect("tempdir");
        fs::write(origin.path().join("page.html"), b"<p>").expect("write");
        let target = tempfile::tempdir().expect("tempdir");
        let mut settings = ProviderSettings::bare(&target.path().to_string_lossy());
        settings.params.put.insert("mode".to_owned(), "0644".into());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let origin = ProviderSettings::bare(&origin.path().to_string_lossy())
            .build()
            .expect("origin");
        let target = settings.build().expect("target");
        let entries = runtime.block_on(origin.enumerate(None)).expect("enumerate");
        let entry = entries.get("page.html").expect("entry");

        let put = runtime
            .block_on(target.build_put(entry, engine::Reason::Add))
            .expect("put");
        assert_eq!(put.params()["mode"], "0644");
        assert_eq!(put.params()["key"], "page.html");
    }
}
