//! Semantic core of PHPantom.
//!
//! Two passes over each PHP file feed a project-wide index:
//!
//! 1. The declaration pass ([`symbol_reader`]) builds a Declaration Tree
//!    per file, absorbing documentation-comment types as it goes.  The
//!    tree is wrapped in a [`SymbolTable`] and added to the
//!    [`SymbolStore`], which indexes every global name for exact and
//!    word-prefix lookup.
//! 2. The reference pass ([`reference_reader`]) walks the file again and
//!    resolves every name, variable and member access against the store,
//!    tracking variable types flow-sensitively.  The result is a
//!    [`ReferenceTable`].
//!
//! Inheritance queries go through [`TypeAggregate`], which merges
//! members across a class's traits, parents and interfaces under a
//! caller-chosen [`MemberMergeStrategy`].
//!
//! ```
//! use phpantom_core::{ParsedDocument, SymbolKind, SymbolStore, analyze};
//!
//! let mut store = SymbolStore::with_builtins();
//! let doc = ParsedDocument::new("file:///a.php", "<?php\n$n = strlen('x');\n");
//! let references = analyze(&mut store, &doc).unwrap();
//! let n = references
//!     .filter(|r| r.kind == SymbolKind::Variable && r.name == "$n")
//!     .pop()
//!     .unwrap();
//! assert_eq!(n.ty.to_string(), "int");
//! ```

pub mod config;
pub mod docblock;
pub mod error;
pub mod name_resolver;
pub mod reference_reader;
pub mod reference_table;
pub mod symbol_reader;
pub mod symbol_store;
pub mod syntax;
pub mod tree;
pub mod type_aggregate;
pub mod type_string;
pub mod types;
pub mod variable_table;

pub use config::Config;
pub use error::{ConfigError, SnapshotError, StoreError};
pub use name_resolver::NameResolver;
pub use reference_reader::{read_references, read_references_with_limit};
pub use reference_table::{ReferenceStore, ReferenceTable};
pub use symbol_reader::read_declarations;
pub use symbol_store::{SharedStore, StoreSnapshot, SymbolStore, SymbolTable};
pub use syntax::ParsedDocument;
pub use type_aggregate::{MemberMergeStrategy, TypeAggregate};
pub use type_string::TypeDescriptor;
pub use types::{
    Declaration, Location, Position, Range, Reference, SymbolKind, SymbolModifiers,
};

/// Run both passes over `document`: its declarations replace any earlier
/// table for the same uri in `store`, then its references are read.
pub fn analyze(store: &mut SymbolStore, document: &ParsedDocument) -> Result<ReferenceTable, StoreError> {
    analyze_with_limit(store, document, type_string::DEFAULT_UNION_LIMIT)
}

/// [`analyze`] with an explicit union size limit.
pub fn analyze_with_limit(
    store: &mut SymbolStore,
    document: &ParsedDocument,
    union_limit: usize,
) -> Result<ReferenceTable, StoreError> {
    store.replace(SymbolTable::create(document))?;
    Ok(read_references_with_limit(document, store, union_limit))
}
