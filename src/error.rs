//! Error types surfaced by the symbol store and snapshot I/O.
//!
//! The reader passes never fail: malformed input and unresolvable names
//! degrade to missing declarations or empty types.  Only store integrity
//! problems and snapshot I/O reach the caller, as the types below.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Store integrity violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A table for this uri is already present.  Use
    /// [`SymbolStore::replace`](crate::symbol_store::SymbolStore::replace)
    /// to swap a re-analysed file in.
    #[error("duplicate key: {uri} is already in the store")]
    DuplicateKey { uri: String },

    /// The declaration carries no location, so it cannot be mapped back
    /// to a file.  Built-in and synthesized declarations hit this.
    #[error("declaration {name} has no location")]
    MissingLocation { name: String },

    /// No table is registered under the uri hash of a location.
    #[error("no symbol table for uri hash {uri_hash}")]
    MissingTable { uri_hash: u32 },
}

/// Failures while writing or reading a store snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures while reading `.phpantom.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
