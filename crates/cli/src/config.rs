//! JSON configuration file.
//!
//! The file is optional. Without `--config`, `treesync.json` in the current
//! directory is loaded when it exists. Every field may be omitted and every
//! command-line flag takes precedence over the file.
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "origin": { "root": "site", "ignore_patterns": [".*"] },
//!   "target": {
//!     "root": "s3://assets/site",
//!     "put_params": { "CacheControl": "max-age=300" }
//!   },
//!   "delete": true,
//!   "compare": "hash"
//! }
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use engine::{Compare, ModifiedComparator, SizeComparator};
use filters::FilterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use transport::TransportError;

/// File name looked up in the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "treesync.json";

/// The only `schema_version` this build understands.
pub const SCHEMA_VERSION: u32 = 1;

/// Default ceiling for concurrent comparisons.
pub const DEFAULT_COMPARE_CONCURRENCY: usize = 10;

/// Default ceiling for concurrent listings and operations.
pub const DEFAULT_REQUEST_CONCURRENCY: usize = 3;

/// How matched origin and target entries are compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Unchanged when content hashes are equal.
    #[default]
    Hash,
    /// Every matched entry is treated as changed.
    Always,
    /// Unchanged when sizes are equal.
    Size,
    /// Unchanged unless the origin is newer than the target.
    Modified,
}

impl CompareMode {
    /// Every mode, in help order.
    pub const ALL: [Self; 4] = [Self::Hash, Self::Always, Self::Size, Self::Modified];

    /// Name used on the command line and in the config file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Always => "always",
            Self::Size => "size",
            Self::Modified => "modified",
        }
    }

    /// Planner policy implementing this mode.
    #[must_use]
    pub fn comparator(self) -> Compare {
        match self {
            Self::Hash => Compare::ContentHash,
            Self::Always => Compare::AlwaysChanged,
            Self::Size => Compare::custom(SizeComparator),
            Self::Modified => Compare::custom(ModifiedComparator),
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                format!("unknown compare mode '{value}' (expected hash, always, size or modified)")
            })
    }
}

/// Contents of a config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Must be [`SCHEMA_VERSION`] when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    /// Origin provider. The root defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ProviderConfig>,
    /// Target provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ProviderConfig>,
    /// Delete target entries missing from the origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
    /// Upload origin entries missing from the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_missing: Option<bool>,
    /// Comparison applied to matched entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<CompareMode>,
    /// Maximum concurrent comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_concurrency: Option<usize>,
    /// Maximum concurrent listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_concurrency: Option<usize>,
    /// Maximum concurrent operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

impl ConfigFile {
    /// Starter configuration written by `treesync init`.
    #[must_use]
    pub fn template() -> Self {
        Self {
            schema_version: Some(SCHEMA_VERSION),
            origin: Some(ProviderConfig::Section(ProviderSection {
                root: Some(".".to_owned()),
                ignore_patterns: vec![".*".to_owned(), DEFAULT_CONFIG_FILE.to_owned()],
                ..ProviderSection::default()
            })),
            target: Some(ProviderConfig::Root("../mirror".to_owned())),
            delete: Some(false),
            add_missing: Some(true),
            compare: Some(CompareMode::Hash),
            compare_concurrency: Some(DEFAULT_COMPARE_CONCURRENCY),
            list_concurrency: Some(DEFAULT_REQUEST_CONCURRENCY),
            concurrency: Some(DEFAULT_REQUEST_CONCURRENCY),
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        for provider in [self.origin.as_mut(), self.target.as_mut()].into_iter().flatten() {
            if let ProviderConfig::Section(section) = provider {
                section.ignore_file = section
                    .ignore_file
                    .take()
                    .map(|path| if path.as_os_str().is_empty() { path } else { base.join(path) });
            }
        }
    }
}

/// A provider given either as a bare root string or as a full section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// `"target": "file:///srv/www"`
    Root(String),
    /// `"target": { "root": "...", ... }`
    Section(ProviderSection),
}

impl ProviderConfig {
    /// Normalises both forms into a section.
    #[must_use]
    pub fn to_section(&self) -> ProviderSection {
        match self {
            Self::Root(root) => ProviderSection {
                root: Some(root.clone()),
                ..ProviderSection::default()
            },
            Self::Section(section) => section.clone(),
        }
    }
}

/// Provider settings in the config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSection {
    /// Root location; a path or a `scheme://` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Gitignore-style patterns, applied after those of `ignore_file`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_patterns: Vec<String>,
    /// File of patterns, relative to the config file. An empty string
    /// disables the default ignore file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_file: Option<PathBuf>,
    /// Suffix removed from keys written to this provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_suffix: Option<String>,
    /// Resolve symbolic links while listing a local tree. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    /// Send the origin MD5 with bucket uploads. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<bool>,
    /// Request parameters merged into every put built for this provider,
    /// e.g. `{ "ContentEncoding": "gzip" }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put_params: Option<Map<String, Value>>,
    /// Request parameters merged into every copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_params: Option<Map<String, Value>>,
    /// Request parameters merged into every delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_params: Option<Map<String, Value>>,
}

/// Errors raised while loading configuration or building providers from it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The config file is not valid JSON for [`ConfigFile`].
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The config file declares a schema this build does not understand.
    #[error("unsupported schema_version {found} in {} (expected 1)", path.display())]
    SchemaVersion {
        /// Config file path.
        path: PathBuf,
        /// Declared version.
        found: u32,
    },

    /// `sync` was invoked without a target root.
    #[error("no target root given; pass TARGET or set \"target\" in the config file")]
    MissingTarget,

    /// `init` refused to overwrite an existing file.
    #[error("{} exists; use --force to overwrite", path.display())]
    AlreadyExists {
        /// Existing file.
        path: PathBuf,
    },

    /// `init` could not write the config file.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An ignore pattern or ignore file is invalid.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// A root names an unsupported backend.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Loads the config file.
///
/// With `explicit` set the file must exist. Otherwise [`DEFAULT_CONFIG_FILE`]
/// in `cwd` is used when present and an empty configuration when not.
/// Relative `ignore_file` paths are resolved against the file's directory.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<ConfigFile, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (cwd.join(path), true),
        None => (cwd.join(DEFAULT_CONFIG_FILE), false),
    };

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(error) if !required && error.kind() == io::ErrorKind::NotFound => {
            return Ok(ConfigFile::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let mut config: ConfigFile = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    if let Some(found) = config.schema_version.filter(|found| *found != SCHEMA_VERSION) {
        return Err(ConfigError::SchemaVersion { path, found });
    }

    config.resolve_paths(path.parent().unwrap_or(cwd));
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ConfigFile {
        serde_json::from_str(text).expect("valid config")
    }

    #[test]
    fn providers_accept_string_or_section() {
        let config = parse(
            r#"{
                "origin": {
                    "root": "site",
                    "ignore_patterns": ["*.tmp"],
                    "ignore_file": ".ignore"
                },
                "target": "file:///srv/www"
            }"#,
        );
        let origin = config.origin.expect("origin").to_section();
        assert_eq!(origin.root.as_deref(), Some("site"));
        assert_eq!(origin.ignore_patterns, ["*.tmp"]);
        assert_eq!(origin.ignore_file, Some(PathBuf::from(".ignore")));

        let target = config.target.expect("target").to_section();
        assert_eq!(target.root.as_deref(), Some("file:///srv/www"));
        assert!(target.ignore_patterns.is_empty());
    }

    #[test]
    fn provider_sections_carry_request_settings() {
        let config = parse(
            r#"{
                "target": {
                    "root": "s3://assets/site",
                    "strip_suffix": ".gz",
                    "follow_symlinks": false,
                    "checksum": false,
                    "put_params": { "ContentEncoding": "gzip", "ACL": "public-read" },
                    "delete_params": {}
                }
            }"#,
        );
        let target = config.target.expect("target").to_section();
        assert_eq!(target.follow_symlinks, Some(false));
        assert_eq!(target.checksum, Some(false));
        let put = target.put_params.expect("put params");
        assert_eq!(put["ContentEncoding"], "gzip");
        assert_eq!(put["ACL"], "public-read");
        assert_eq!(target.copy_params, None);
        assert_eq!(target.delete_params, Some(Map::new()));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<ConfigFile>(r#"{ "dleete": true }"#).is_err());
    }

    #[test]
    fn compare_modes_parse_case_insensitively() {
        assert_eq!("SIZE".parse::<CompareMode>(), Ok(CompareMode::Size));
        assert_eq!(parse(r#"{ "compare": "modified" }"#).compare, Some(CompareMode::Modified));
        let error = "fuzzy".parse::<CompareMode>().expect_err("unknown mode");
        assert!(error.contains("fuzzy"));
    }

    #[test]
    fn compare_modes_select_planner_policy() {
        assert!(matches!(CompareMode::Hash.comparator(), Compare::ContentHash));
        assert!(matches!(CompareMode::Always.comparator(), Compare::AlwaysChanged));
        assert!(matches!(CompareMode::Size.comparator(), Compare::Custom(_)));
    }

    #[test]
    fn template_round_trips_through_json() {
        let template = ConfigFile::template();
        let text = serde_json::to_string_pretty(&template).expect("serialize");
        assert!(text.contains("\"schema_version\": 1"));
        assert_eq!(parse(&text), template);
    }

    #[test]
    fn ignore_files_resolve_against_config_directory() {
        let mut config = parse(
            r#"{
                "origin": { "ignore_file": "rules/origin.ignore" },
                "target": { "ignore_file": "" }
            }"#,
        );
        config.resolve_paths(Path::new("/etc/treesync"));
        let origin = config.origin.expect("origin").to_section();
        assert_eq!(
            origin.ignore_file,
            Some(PathBuf::from("/etc/treesync/rules/origin.ignore"))
        );
        let target = config.target.expect("target").to_section();
        assert_eq!(target.ignore_file, Some(PathBuf::new()));
    }
}
