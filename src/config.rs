//! Project configuration read from `.phpantom.toml`.
//!
//! ```toml
//! [analysis]
//! union_limit = 8
//!
//! [index]
//! extensions = ["php", "phtml"]
//! exclude = ["vendor/*/tests"]
//! builtins = true
//! ```
//!
//! Every key is optional.  A missing file yields the defaults; a file
//! that cannot be read or parsed is reported and the defaults are used.

use std::fs;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::type_string::DEFAULT_UNION_LIMIT;

/// Name of the per-project configuration file.
pub const CONFIG_FILE: &str = ".phpantom.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

/// Type inference settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Unions with more atoms than this collapse to `mixed`.
    #[serde(default = "default_union_limit")]
    pub union_limit: usize,
}

/// Which files the indexer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// File extensions treated as PHP, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns, relative to the project root, that are skipped in
    /// addition to `.gitignore`d paths.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Load the embedded built-in declarations.
    #[serde(default = "default_builtins")]
    pub builtins: bool,
}

fn default_union_limit() -> usize {
    DEFAULT_UNION_LIMIT
}

fn default_extensions() -> Vec<String> {
    vec!["php".to_string()]
}

fn default_builtins() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            union_limit: default_union_limit(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
            builtins: default_builtins(),
        }
    }
}

impl IndexConfig {
    /// Whether `path` has one of the configured extensions.
    pub fn is_php_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

impl Config {
    /// Parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The configuration of the project at `root`.
    pub fn load_from_project(root: &Path) -> Self {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            debug!(root = %root.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config");
                config
            }
            Err(err) => {
                warn!("{err}; using defaults");
                Self::default()
            }
        }
    }
}

/// Default directory for store snapshots: the user cache directory
/// (`$XDG_CACHE_HOME/phpantom` and platform equivalents).
pub fn default_cache_dir() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.cache_dir().join("phpantom"))
}

/// Default snapshot file for the project at `root`, named after the
/// project directory so several projects can share the cache.
pub fn default_snapshot_path(root: &Path) -> Option<PathBuf> {
    let name = root
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("project");
    let hash = crate::types::hash32(&root.to_string_lossy());
    Some(default_cache_dir()?.join(format!("{name}-{hash:08x}.json")))
}
