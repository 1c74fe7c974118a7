//! Reference Trees and the project-wide reference index.
//!
//! A [`ReferenceTable`] holds the Reference Tree of one file: nested
//! [`Scope`] nodes mirroring the lexical structure, with the
//! [`Reference`]s written inside each scope as leaves.  The
//! [`ReferenceStore`] keeps one table per file plus a lower-case name
//! index so that every use of a name can be found without walking every
//! tree.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tree::{TreeNode, TreeVisitor};
use crate::types::{Location, Position, Reference, hash32};

/// A lexical region of a Reference Tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReferenceNode>,
}

impl Scope {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            children: Vec::new(),
        }
    }

    /// References directly inside this scope.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.children.iter().filter_map(ReferenceNode::reference)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReferenceNode {
    Scope(Scope),
    Reference(Reference),
}

impl ReferenceNode {
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            ReferenceNode::Reference(r) => Some(r),
            ReferenceNode::Scope(_) => None,
        }
    }

    pub fn scope(&self) -> Option<&Scope> {
        match self {
            ReferenceNode::Scope(s) => Some(s),
            ReferenceNode::Reference(_) => None,
        }
    }
}

impl TreeNode for ReferenceNode {
    fn children(&self) -> &[ReferenceNode] {
        match self {
            ReferenceNode::Scope(s) => &s.children,
            ReferenceNode::Reference(_) => &[],
        }
    }
}

// ─── Reference table ────────────────────────────────────────────────────────

/// The Reference Tree of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    uri: String,
    hash: u32,
    root: ReferenceNode,
}

impl ReferenceTable {
    pub fn new(uri: impl Into<String>, root: Scope) -> Self {
        let uri = uri.into();
        let hash = hash32(&uri);
        Self {
            uri,
            hash,
            root: ReferenceNode::Scope(root),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn root(&self) -> &ReferenceNode {
        &self.root
    }

    /// Every reference in pre-order.
    pub fn references(&self) -> Vec<&Reference> {
        self.filter(|_| true)
    }

    pub fn filter<F>(&self, mut predicate: F) -> Vec<&Reference>
    where
        F: FnMut(&Reference) -> bool,
    {
        crate::tree::filter(&self.root, |node| node.reference().is_some_and(&mut predicate))
            .into_iter()
            .filter_map(ReferenceNode::reference)
            .collect()
    }

    pub fn traverse<V>(&self, visitor: &mut V)
    where
        V: TreeVisitor<ReferenceNode> + ?Sized,
    {
        crate::tree::traverse(&self.root, visitor);
    }

    /// Innermost scope whose range holds `pos`; the file scope otherwise.
    pub fn scope_at_position(&self, pos: Position) -> Option<&Scope> {
        let mut current = self.root.scope()?;
        while let Some(inner) = current
            .children
            .iter()
            .filter_map(ReferenceNode::scope)
            .find(|s| s.location.range.contains(pos))
        {
            current = inner;
        }
        Some(current)
    }

    /// The reference written at `pos`, looking only at the references
    /// directly inside the innermost scope.
    pub fn reference_at_position(&self, pos: Position) -> Option<&Reference> {
        self.scope_at_position(pos)?
            .references()
            .find(|r| r.location.range.contains(pos))
    }
}

// ─── Reference store ────────────────────────────────────────────────────────

/// Reference Tables of every analysed file.
#[derive(Debug, Default, Clone)]
pub struct ReferenceStore {
    tables: HashMap<String, ReferenceTable>,
    /// Lower-cased reference name to the uris that use it.
    names: HashMap<String, BTreeSet<String>>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, uri: &str) -> Option<&ReferenceTable> {
        self.tables.get(uri)
    }

    pub fn tables(&self) -> impl Iterator<Item = &ReferenceTable> {
        self.tables.values()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Insert `table`, replacing any earlier table for its uri.
    pub fn add(&mut self, table: ReferenceTable) {
        self.remove(table.uri());
        let uri = table.uri().to_string();
        for reference in table.references() {
            for key in index_keys(reference) {
                self.names.entry(key).or_default().insert(uri.clone());
            }
        }
        debug!(uri = %uri, references = table.references().len(), "indexed references");
        self.tables.insert(uri, table);
    }

    pub fn remove(&mut self, uri: &str) -> Option<ReferenceTable> {
        let table = self.tables.remove(uri)?;
        for reference in table.references() {
            for key in index_keys(reference) {
                if let Some(uris) = self.names.get_mut(&key) {
                    uris.remove(uri);
                    if uris.is_empty() {
                        self.names.remove(&key);
                    }
                }
            }
        }
        Some(table)
    }

    /// Every reference named `name` (or written as `name`) that passes
    /// `predicate`, across all files.
    pub fn find<F>(&self, name: &str, mut predicate: F) -> Vec<&Reference>
    where
        F: FnMut(&Reference) -> bool,
    {
        let name = name.strip_prefix('\\').unwrap_or(name);
        let Some(uris) = self.names.get(&name.to_lowercase()) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for uri in uris {
            let Some(table) = self.tables.get(uri) else {
                continue;
            };
            found.extend(table.filter(|r| {
                let matches = |candidate: &str| {
                    if r.kind.is_case_sensitive() {
                        candidate == name
                    } else {
                        candidate.eq_ignore_ascii_case(name)
                    }
                };
                (matches(&r.name) || r.alt_name.as_deref().is_some_and(matches)) && predicate(r)
            }));
        }
        found
    }
}

fn index_keys(reference: &Reference) -> impl Iterator<Item = String> + '_ {
    std::iter::once(&reference.name)
        .chain(reference.alt_name.as_ref())
        .filter(|n| !n.is_empty())
        .map(|n| n.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Range, SymbolKind};

    fn loc(line: u32, start: u32, end: u32) -> Location {
        Location::new(
            "file:///a.php",
            Range::new(Position::new(line, start), Position::new(line, end)),
        )
    }

    fn sample() -> ReferenceTable {
        let mut method = Scope::new(Location::new(
            "file:///a.php",
            Range::new(Position::new(2, 0), Position::new(4, 1)),
        ));
        method
            .children
            .push(ReferenceNode::Reference(Reference::new(SymbolKind::Variable, "$x", loc(3, 4, 6))));
        let mut root = Scope::new(Location::new(
            "file:///a.php",
            Range::new(Position::new(0, 0), Position::new(9, 0)),
        ));
        let mut strlen = Reference::new(SymbolKind::Function, "App\\strlen", loc(1, 0, 6));
        strlen.alt_name = Some("strlen".to_string());
        root.children.push(ReferenceNode::Reference(strlen));
        root.children.push(ReferenceNode::Scope(method));
        ReferenceTable::new("file:///a.php", root)
    }

    #[test]
    fn position_queries() {
        let table = sample();
        assert_eq!(table.references().len(), 2);
        let scope = table.scope_at_position(Position::new(3, 5)).unwrap();
        assert_eq!(scope.location.range.start, Position::new(2, 0));
        assert_eq!(
            table.reference_at_position(Position::new(3, 5)).map(|r| r.name.as_str()),
            Some("$x")
        );
        assert!(table.reference_at_position(Position::new(3, 9)).is_none());
        assert_eq!(
            table.reference_at_position(Position::new(1, 2)).map(|r| r.name.as_str()),
            Some("App\\strlen")
        );
    }

    #[test]
    fn store_finds_by_name_and_alternate_name() {
        let mut store = ReferenceStore::new();
        store.add(sample());
        assert_eq!(store.find("\\app\\STRLEN", |_| true).len(), 1);
        assert_eq!(store.find("strlen", |_| true).len(), 1);
        assert_eq!(store.find("$X", |_| true).len(), 0);
        assert_eq!(store.find("$x", |r| r.kind == SymbolKind::Variable).len(), 1);

        store.add(sample());
        assert_eq!(store.table_count(), 1);
        assert_eq!(store.find("strlen", |_| true).len(), 1);

        assert!(store.remove("file:///a.php").is_some());
        assert!(store.find("strlen", |_| true).is_empty());
        assert!(store.remove("file:///a.php").is_none());
    }
}
