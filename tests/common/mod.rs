#![allow(dead_code)]

use std::fs;
use std::path::Path;

use phpantom_core::{
    ParsedDocument, Reference, ReferenceTable, SymbolKind, SymbolStore, SymbolTable, analyze,
};

/// A store holding the built-in declarations.
pub fn create_store() -> SymbolStore {
    SymbolStore::with_builtins()
}

pub fn uri(name: &str) -> String {
    format!("file:///{name}")
}

/// Run the declaration pass over `src` and add the table to `store`.
pub fn add_file(store: &mut SymbolStore, name: &str, src: &str) -> ParsedDocument {
    let document = ParsedDocument::new(uri(name), src);
    store
        .add(SymbolTable::create(&document))
        .expect("file should not be in the store yet");
    document
}

/// Run both passes over `src`.
pub fn analyze_file(store: &mut SymbolStore, name: &str, src: &str) -> ReferenceTable {
    let document = ParsedDocument::new(uri(name), src);
    analyze(store, &document).expect("analysis should succeed")
}

/// Analyse a single file against the built-ins.
pub fn analyze_source(src: &str) -> ReferenceTable {
    let mut store = create_store();
    analyze_file(&mut store, "test.php", src)
}

/// The last reference of `kind` named `name`.
pub fn last_reference<'t>(table: &'t ReferenceTable, kind: SymbolKind, name: &str) -> &'t Reference {
    table
        .filter(|r| r.kind == kind && r.name == name)
        .pop()
        .unwrap_or_else(|| panic!("expected a {kind} reference named {name}"))
}

/// The type carried by the last reference to variable `name`.
pub fn variable_type(table: &ReferenceTable, name: &str) -> String {
    last_reference(table, SymbolKind::Variable, name).ty.to_string()
}

/// Write `files` below `root`, creating directories as needed.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel_path, content) in files {
        let full = root.join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write PHP file");
    }
}
