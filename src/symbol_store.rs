//! Symbol tables and the project-wide symbol store.
//!
//! A [`SymbolTable`] owns the Declaration Tree of one file.  The
//! [`SymbolStore`] keeps every table in a hash-bucketed index sorted by
//! the stable hash of the file uri, plus a global name index over all
//! non-local declarations for exact and prefix-of-word lookup.
//!
//! Declarations carry no pointer back to their table.  A declaration's
//! [`HashedLocation`] holds the uri hash, which selects the bucket; when
//! several uris share a hash the owning table is found by containment.
//!
//! # Concurrency
//!
//! The store is a plain owned value.  Mutation (`add`, `remove`,
//! `replace`) needs `&mut`, queries need `&`, so the borrow checker
//! enforces the single-writer/multi-reader contract within one thread.
//! [`SharedStore`] carries the same contract across threads.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SnapshotError, StoreError};
use crate::name_resolver::{ClassContext, ImportRule, NameResolver};
use crate::symbol_reader::read_declarations;
use crate::syntax::ParsedDocument;
use crate::tree::{TreeVisitor, traverse};
use crate::type_aggregate::{MemberMergeStrategy, TypeAggregate};
use crate::type_string::TypeDescriptor;
use crate::types::{Declaration, Location, Position, Reference, SymbolKind, SymbolModifiers, hash32};

/// Uri of the built-in symbol table.
pub const BUILTINS_URI: &str = "php";

const BUILTIN_STUBS: &str = include_str!("stubs/builtins.php");

// ─── Symbol table ───────────────────────────────────────────────────────────

/// The Declaration Tree of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    uri: String,
    hash: u32,
    root: Declaration,
}

impl SymbolTable {
    pub fn new(uri: impl Into<String>, root: Declaration) -> Self {
        let uri = uri.into();
        let hash = hash32(&uri);
        Self { uri, hash, root }
    }

    /// Run the declaration pass over `document`.
    pub fn create(document: &ParsedDocument) -> Self {
        let root = read_declarations(document);
        let table = Self::new(document.uri(), root);
        debug!(
            uri = %table.uri,
            symbols = table.symbol_count(),
            "read declarations"
        );
        table
    }

    /// Declarations of the embedded PHP stubs, without locations.
    pub fn builtins() -> Self {
        let document = ParsedDocument::new(BUILTINS_URI, BUILTIN_STUBS);
        let mut root = read_declarations(&document);
        root.strip_locations();
        Self::new(BUILTINS_URI, root)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn root(&self) -> &Declaration {
        &self.root
    }

    /// Every declaration in pre-order, the root excluded.
    pub fn symbols(&self) -> Vec<&Declaration> {
        self.root.descendants()
    }

    pub fn symbol_count(&self) -> usize {
        self.root.descendants().len()
    }

    pub fn filter<F>(&self, predicate: F) -> Vec<&Declaration>
    where
        F: FnMut(&Declaration) -> bool,
    {
        crate::tree::filter(&self.root, predicate)
    }

    pub fn find<F>(&self, predicate: F) -> Option<&Declaration>
    where
        F: FnMut(&Declaration) -> bool,
    {
        crate::tree::find(&self.root, predicate)
    }

    /// The declaration whose children hold `symbol`.
    pub fn parent_of(&self, symbol: &Declaration) -> Option<&Declaration> {
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if node.children.iter().any(|c| std::ptr::eq(c, symbol)) {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// The name resolution context in effect at `pos`.
    pub fn name_resolver(&self, pos: Position) -> NameResolver {
        let mut visitor = NameResolverVisitor {
            pos,
            resolver: NameResolver::new(),
            halted: false,
        };
        traverse(&self.root, &mut visitor);
        visitor.resolver
    }

    /// Innermost namespace, class-like, function or method containing
    /// `pos`; the root when nothing narrower does.
    pub fn scope(&self, pos: Position) -> &Declaration {
        self.scope_at(pos, false)
    }

    /// Like [`scope`](Self::scope) but closures are looked through.
    pub fn absolute_scope(&self, pos: Position) -> &Declaration {
        self.scope_at(pos, true)
    }

    fn scope_at(&self, pos: Position, absolute: bool) -> &Declaration {
        let mut visitor = ScopeVisitor {
            pos,
            absolute,
            stack: Vec::new(),
            halted: false,
        };
        visitor.walk(&self.root);
        visitor.stack.last().copied().unwrap_or(&self.root)
    }

    /// Scope-opening declarations in pre-order.
    pub fn scope_symbols(&self) -> Vec<&Declaration> {
        self.filter(|d| d.kind.is_scope() && !d.has(SymbolModifiers::USE))
    }

    /// The last declaration whose range starts exactly at `pos`.
    pub fn symbol_at_position(&self, pos: Position) -> Option<&Declaration> {
        self.filter(|d| d.location.is_some_and(|l| l.range.start == pos))
            .pop()
    }

    /// Whether `symbol` is part of this table.  Declarations borrowed from
    /// the table match by identity, copies by kind, name and location.
    pub fn contains(&self, symbol: &Declaration) -> bool {
        let Some(location) = symbol.location else {
            return false;
        };
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if std::ptr::eq(node, symbol)
                || (node.kind == symbol.kind
                    && node.name == symbol.name
                    && node.location == Some(location))
            {
                return true;
            }
            let inside = node
                .location
                .is_none_or(|l| l.range.contains(location.range.start));
            if inside {
                stack.extend(node.children.iter());
            }
        }
        false
    }
}

struct NameResolverVisitor {
    pos: Position,
    resolver: NameResolver,
    halted: bool,
}

impl TreeVisitor<Declaration> for NameResolverVisitor {
    fn preorder(&mut self, node: &Declaration, _spine: &[&Declaration]) -> bool {
        if node.location.is_some_and(|l| l.range.start.line > self.pos.line) {
            self.halted = true;
            return false;
        }
        if node.has(SymbolModifiers::USE)
            && matches!(
                node.kind,
                SymbolKind::Class | SymbolKind::Function | SymbolKind::Constant
            )
        {
            if let Some(rule) = ImportRule::from_declaration(node) {
                self.resolver.push_rule(rule);
            }
        } else if node.kind == SymbolKind::Namespace {
            self.resolver.set_namespace(node.name.clone());
        } else if node.kind.is_class_like() {
            self.resolver.push_class(ClassContext::from_declaration(node));
        }
        true
    }

    fn postorder(&mut self, node: &Declaration, _spine: &[&Declaration]) {
        if node.location.is_some_and(|l| l.range.end.line > self.pos.line) {
            self.halted = true;
            return;
        }
        if node.kind.is_class_like() && !node.has(SymbolModifiers::USE) {
            self.resolver.pop_class();
        }
    }

    fn halted(&self) -> bool {
        self.halted
    }
}

struct ScopeVisitor<'a> {
    pos: Position,
    absolute: bool,
    stack: Vec<&'a Declaration>,
    halted: bool,
}

impl<'a> ScopeVisitor<'a> {
    fn enter(&mut self, node: &'a Declaration) -> bool {
        if node.location.is_some_and(|l| l.range.start.line > self.pos.line) {
            self.halted = true;
            return false;
        }
        match node.location {
            Some(l) if !l.range.contains(self.pos) => return false,
            None if node.kind != SymbolKind::File => return false,
            _ => {}
        }
        let closure = node.kind == SymbolKind::Function && node.has(SymbolModifiers::ANONYMOUS);
        if node.kind.is_scope() && !node.has(SymbolModifiers::USE) && !(self.absolute && closure)
        {
            self.stack.push(node);
        }
        true
    }

    // `TreeVisitor` callbacks cannot keep node borrows, so this walks by hand.
    fn walk(&mut self, node: &'a Declaration) {
        if self.halted || !self.enter(node) {
            return;
        }
        for child in &node.children {
            self.walk(child);
            if self.halted {
                return;
            }
        }
    }
}

// ─── Table index ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Bucket {
    hash: u32,
    tables: Vec<Arc<SymbolTable>>,
}

/// Tables sorted by uri hash; uris sharing a hash share a bucket.
#[derive(Debug, Clone, Default)]
struct TableIndex {
    buckets: Vec<Bucket>,
    count: usize,
}

impl TableIndex {
    fn add(&mut self, table: Arc<SymbolTable>) -> Result<(), StoreError> {
        match self.buckets.binary_search_by_key(&table.hash, |b| b.hash) {
            Ok(i) => {
                let bucket = &mut self.buckets[i];
                if bucket.tables.iter().any(|t| t.uri == table.uri) {
                    return Err(StoreError::DuplicateKey {
                        uri: table.uri.clone(),
                    });
                }
                bucket.tables.push(table);
            }
            Err(i) => self.buckets.insert(
                i,
                Bucket {
                    hash: table.hash,
                    tables: vec![table],
                },
            ),
        }
        self.count += 1;
        Ok(())
    }

    fn remove(&mut self, uri: &str) -> Option<Arc<SymbolTable>> {
        let i = self.bucket_index(hash32(uri))?;
        let bucket = &mut self.buckets[i];
        let pos = bucket.tables.iter().position(|t| t.uri == uri)?;
        let table = bucket.tables.remove(pos);
        if bucket.tables.is_empty() {
            self.buckets.remove(i);
        }
        self.count -= 1;
        Some(table)
    }

    fn find(&self, uri: &str) -> Option<&Arc<SymbolTable>> {
        let i = self.bucket_index(hash32(uri))?;
        self.buckets[i].tables.iter().find(|t| t.uri == uri)
    }

    fn bucket_index(&self, hash: u32) -> Option<usize> {
        self.buckets.binary_search_by_key(&hash, |b| b.hash).ok()
    }

    fn find_by_symbol(&self, symbol: &Declaration) -> Result<&Arc<SymbolTable>, StoreError> {
        let location = symbol.location.ok_or_else(|| StoreError::MissingLocation {
            name: symbol.name.clone(),
        })?;
        let missing = || StoreError::MissingTable {
            uri_hash: location.uri_hash,
        };
        let i = self.bucket_index(location.uri_hash).ok_or_else(missing)?;
        match self.buckets[i].tables.as_slice() {
            [only] => Ok(only),
            tables => tables.iter().find(|t| t.contains(symbol)).ok_or_else(missing),
        }
    }

    fn tables(&self) -> impl Iterator<Item = &Arc<SymbolTable>> {
        self.buckets.iter().flat_map(|b| b.tables.iter())
    }
}

// ─── Name index ─────────────────────────────────────────────────────────────

/// Position of a declaration inside a table: child indices from the root.
#[derive(Debug, Clone)]
struct SymbolHandle {
    table: Arc<SymbolTable>,
    path: Box<[u32]>,
}

impl SymbolHandle {
    fn resolve(&self) -> Option<&Declaration> {
        let mut node = &self.table.root;
        for &i in self.path.iter() {
            node = node.children.get(i as usize)?;
        }
        Some(node)
    }
}

/// Keys a declaration is indexed under: its lower-cased full name, and
/// every suffix of its short name that starts a word (camel-case hump or
/// after `_`/`$`).
pub fn index_keys(name: &str) -> Vec<String> {
    let mut keys = vec![name.to_lowercase()];
    let short = name.rsplit('\\').next().unwrap_or(name);
    let lower_short = short.to_lowercase();
    if !keys.contains(&lower_short) {
        keys.push(lower_short);
    }
    let chars: Vec<(usize, char)> = short.char_indices().collect();
    for (n, &(offset, c)) in chars.iter().enumerate() {
        if matches!(c, '_' | '$') {
            continue;
        }
        let starts_word = match n.checked_sub(1).map(|p| chars[p].1) {
            None => true,
            Some(prev) => matches!(prev, '_' | '$') || (c.is_uppercase() && !prev.is_uppercase()),
        };
        if starts_word {
            let key = short[offset..].to_lowercase();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Declarations that go into the global name index.
fn is_indexed(decl: &Declaration) -> bool {
    !matches!(decl.kind, SymbolKind::Parameter | SymbolKind::File)
        && !decl.has(SymbolModifiers::USE)
        && !(decl.kind == SymbolKind::Variable && decl.location.is_some())
        && !decl.name.is_empty()
}

#[derive(Debug, Clone, Default)]
struct NameIndex {
    keys: BTreeMap<String, Vec<SymbolHandle>>,
}

impl NameIndex {
    fn add_table(&mut self, table: &Arc<SymbolTable>) {
        let mut path = Vec::new();
        self.add_children(table, &table.root, &mut path);
    }

    fn add_children(&mut self, table: &Arc<SymbolTable>, node: &Declaration, path: &mut Vec<u32>) {
        for (i, child) in node.children.iter().enumerate() {
            path.push(i as u32);
            if is_indexed(child) {
                let handle = SymbolHandle {
                    table: Arc::clone(table),
                    path: path.clone().into_boxed_slice(),
                };
                for key in index_keys(&child.name) {
                    self.keys.entry(key).or_default().push(handle.clone());
                }
            }
            self.add_children(table, child, path);
            path.pop();
        }
    }

    fn remove_table(&mut self, table: &Arc<SymbolTable>) {
        for decl in table.root.descendants() {
            if !is_indexed(decl) {
                continue;
            }
            for key in index_keys(&decl.name) {
                if let Some(handles) = self.keys.get_mut(&key) {
                    handles.retain(|h| !Arc::ptr_eq(&h.table, table));
                    if handles.is_empty() {
                        self.keys.remove(&key);
                    }
                }
            }
        }
    }

    fn get(&self, key: &str) -> impl Iterator<Item = &Declaration> {
        self.keys
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(SymbolHandle::resolve)
    }
}

/// Lazy, deduplicated prefix match over the name index.
pub struct MatchIter<'s, F> {
    prefix: String,
    done: bool,
    keys: std::collections::btree_map::Range<'s, String, Vec<SymbolHandle>>,
    current: std::slice::Iter<'s, SymbolHandle>,
    seen: HashSet<usize>,
    filter: F,
}

impl<'s, F> Iterator for MatchIter<'s, F>
where
    F: FnMut(&Declaration) -> bool,
{
    type Item = &'s Declaration;

    fn next(&mut self) -> Option<&'s Declaration> {
        loop {
            if let Some(handle) = self.current.next() {
                let Some(decl) = handle.resolve() else {
                    continue;
                };
                let id = decl as *const Declaration as usize;
                if (self.filter)(decl) && self.seen.insert(id) {
                    return Some(decl);
                }
                continue;
            }
            if self.done {
                return None;
            }
            let Some((key, handles)) = self.keys.next() else {
                self.done = true;
                return None;
            };
            if !key.starts_with(&self.prefix) {
                self.done = true;
                return None;
            }
            self.current = handles.iter();
        }
    }
}

// ─── Store ──────────────────────────────────────────────────────────────────

/// Every known file's declarations plus the global name index.
#[derive(Debug, Clone, Default)]
pub struct SymbolStore {
    tables: TableIndex,
    names: NameIndex,
    symbol_count: usize,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the built-in PHP declarations.
    pub fn with_builtins() -> Self {
        let mut store = Self::new();
        if let Err(err) = store.add(SymbolTable::builtins()) {
            warn!(%err, "builtin declarations were not loaded");
        }
        store
    }

    pub fn table(&self, uri: &str) -> Option<&SymbolTable> {
        self.tables.find(uri).map(|t| t.as_ref())
    }

    pub fn tables(&self) -> impl Iterator<Item = &SymbolTable> {
        self.tables.tables().map(|t| t.as_ref())
    }

    pub fn table_count(&self) -> usize {
        self.tables.count
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// Insert a table.  A table for the same uri must not be present.
    pub fn add(&mut self, table: SymbolTable) -> Result<(), StoreError> {
        let table = Arc::new(table);
        if let Err(err) = self.tables.add(Arc::clone(&table)) {
            warn!(uri = %table.uri, "rejected duplicate symbol table");
            return Err(err);
        }
        self.names.add_table(&table);
        self.symbol_count += table.symbol_count();
        debug!(uri = %table.uri, symbols = table.symbol_count(), "added symbol table");
        Ok(())
    }

    /// Remove the table for `uri`.  Unknown uris are ignored.
    pub fn remove(&mut self, uri: &str) -> Option<SymbolTable> {
        let table = self.tables.remove(uri)?;
        self.names.remove_table(&table);
        self.symbol_count -= table.symbol_count();
        debug!(uri, "removed symbol table");
        Some(Arc::unwrap_or_clone(table))
    }

    /// Swap in a re-analysed file: remove then add.
    pub fn replace(&mut self, table: SymbolTable) -> Result<(), StoreError> {
        self.remove(&table.uri);
        self.add(table)?;
        Ok(())
    }

    /// Declarations named exactly `name`.  Constants and variables
    /// compare case-sensitively, everything else case-insensitively.
    pub fn find<F>(&self, name: &str, mut filter: F) -> Vec<&Declaration>
    where
        F: FnMut(&Declaration) -> bool,
    {
        if name.is_empty() {
            return Vec::new();
        }
        let name = name.strip_prefix('\\').unwrap_or(name);
        let mut seen = HashSet::new();
        self.names
            .get(&name.to_lowercase())
            .filter(|d| {
                let exact = matches!(d.kind, SymbolKind::Constant | SymbolKind::Variable);
                let matches = if exact {
                    d.name == name
                } else {
                    d.name.eq_ignore_ascii_case(name)
                };
                matches && filter(d) && seen.insert(*d as *const Declaration as usize)
            })
            .collect()
    }

    /// Declarations with a word starting with `text`.
    pub fn match_symbols<F>(&self, text: &str, filter: F) -> Vec<&Declaration>
    where
        F: FnMut(&Declaration) -> bool,
    {
        self.match_iterator(text, filter).collect()
    }

    /// Lazy form of [`match_symbols`](Self::match_symbols).
    pub fn match_iterator<F>(&self, text: &str, filter: F) -> MatchIter<'_, F>
    where
        F: FnMut(&Declaration) -> bool,
    {
        let prefix = text.to_lowercase();
        MatchIter {
            keys: self.names.keys.range(prefix.clone()..),
            // an empty query matches nothing
            done: prefix.is_empty(),
            prefix,
            current: [].iter(),
            seen: HashSet::new(),
            filter,
        }
    }

    /// Declarations a reference resolves to.
    pub fn find_by_reference(
        &self,
        reference: &Reference,
        strategy: MemberMergeStrategy,
    ) -> Vec<Cow<'_, Declaration>> {
        let name = reference.name.as_str();
        fn borrowed(decls: Vec<&Declaration>) -> Vec<Cow<'_, Declaration>> {
            decls.into_iter().map(Cow::Borrowed).collect()
        }
        match reference.kind {
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait => {
                borrowed(self.find(name, |d| d.kind.is_class_like()))
            }
            SymbolKind::Function | SymbolKind::Constant => {
                let kind = reference.kind;
                let mut found = self.find(name, |d| d.kind == kind);
                if found.is_empty()
                    && let Some(alt) = &reference.alt_name
                {
                    found = self.find(alt, |d| d.kind == kind);
                }
                borrowed(found)
            }
            SymbolKind::Method | SymbolKind::Property | SymbolKind::ClassConstant => {
                let Some(scope) = reference.scope.as_deref() else {
                    return Vec::new();
                };
                let kind = reference.kind;
                self.find_members(scope, strategy, |d| d.kind == kind && d.name_matches(name))
            }
            SymbolKind::Variable | SymbolKind::Parameter => {
                let Some(table) = self.table(&reference.location.uri) else {
                    return Vec::new();
                };
                let scope = table.scope(reference.location.range.start);
                scope
                    .children
                    .iter()
                    .find(|d| {
                        matches!(d.kind, SymbolKind::Variable | SymbolKind::Parameter)
                            && d.name == name
                    })
                    .map(Cow::Borrowed)
                    .into_iter()
                    .collect()
            }
            SymbolKind::Constructor => self.find_members(name, strategy, |d| {
                d.kind == SymbolKind::Method && d.name.eq_ignore_ascii_case("__construct")
            }),
            SymbolKind::Namespace | SymbolKind::File => Vec::new(),
        }
    }

    /// Members of every class named in the type string `scope`.
    pub fn find_members<F>(
        &self,
        scope: &str,
        strategy: MemberMergeStrategy,
        mut predicate: F,
    ) -> Vec<Cow<'_, Declaration>>
    where
        F: FnMut(&Declaration) -> bool,
    {
        let ty = TypeDescriptor::parse(scope);
        let mut members: Vec<Cow<'_, Declaration>> = Vec::new();
        for class_name in ty.atomic_class_names() {
            let Some(aggregate) = TypeAggregate::create(self, class_name) else {
                continue;
            };
            for member in aggregate.members(strategy, &mut predicate) {
                if !members.iter().any(|m| same_declaration(m, &member)) {
                    members.push(member);
                }
            }
        }
        members
    }

    /// The member of `scope` called `name`, of any member kind.
    pub fn find_member_by_name(
        &self,
        scope: &str,
        name: &str,
        strategy: MemberMergeStrategy,
    ) -> Option<Cow<'_, Declaration>> {
        self.find_members(scope, strategy, |d| d.kind.is_member() && d.name_matches(name))
            .into_iter()
            .next()
    }

    /// The most-base declaration `symbol` overrides, or `symbol` itself.
    pub fn find_base_member<'a>(&'a self, symbol: &'a Declaration) -> Cow<'a, Declaration> {
        let Some(scope) = symbol.scope.as_deref() else {
            return Cow::Borrowed(symbol);
        };
        if !symbol.kind.is_member() || symbol.has(SymbolModifiers::PRIVATE) {
            return Cow::Borrowed(symbol);
        }
        self.find_members(scope, MemberMergeStrategy::Base, |d| {
            d.kind == symbol.kind && d.modifiers == symbol.modifiers && d.name_matches(&symbol.name)
        })
        .into_iter()
        .next()
        .unwrap_or(Cow::Borrowed(symbol))
    }

    /// Map a declaration back to its file.
    pub fn symbol_location(&self, symbol: &Declaration) -> Result<Location, StoreError> {
        let table = self.tables.find_by_symbol(symbol)?;
        let location = symbol.location.ok_or_else(|| StoreError::MissingLocation {
            name: symbol.name.clone(),
        })?;
        Ok(Location::new(table.uri.clone(), location.range))
    }

    /// The type a reference evaluates to.
    pub fn type_of(&self, reference: &Reference) -> TypeDescriptor {
        match reference.kind {
            SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Trait
            | SymbolKind::Constructor => TypeDescriptor::atomic(&reference.name),
            SymbolKind::Function
            | SymbolKind::Method
            | SymbolKind::Property
            | SymbolKind::Constant
            | SymbolKind::ClassConstant => self
                .find_by_reference(reference, MemberMergeStrategy::Documented)
                .iter()
                .fold(TypeDescriptor::empty(), |acc, d| acc.merge(&d.resolved_type())),
            SymbolKind::Variable | SymbolKind::Parameter => reference.ty.clone(),
            SymbolKind::Namespace | SymbolKind::File => TypeDescriptor::empty(),
        }
    }

    // ─── Snapshots ──────────────────────────────────────────────────────

    /// An owned copy of the store's persistent state.
    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            tables: self.tables().cloned().collect(),
            symbol_count: self.symbol_count,
        }
    }

    /// Rebuild a store from a snapshot; the name index is recomputed.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for table in snapshot.tables {
            store.add(table)?;
        }
        if store.symbol_count != snapshot.symbol_count {
            warn!(
                expected = snapshot.symbol_count,
                found = store.symbol_count,
                "snapshot symbol count mismatch"
            );
        }
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.snapshot_ref())?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot)?)
    }

    /// Write a snapshot file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        serde_json::to_writer(BufWriter::new(file), &self.snapshot_ref())?;
        debug!(path = %path.display(), tables = self.table_count(), "saved snapshot");
        Ok(())
    }

    /// Read a snapshot file written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let file = File::open(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: StoreSnapshot = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::from_snapshot(snapshot)?)
    }

    fn snapshot_ref(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            tables: self.tables().collect(),
            symbol_count: self.symbol_count,
        }
    }
}

fn same_declaration(a: &Declaration, b: &Declaration) -> bool {
    std::ptr::eq(a, b) || (a.kind == b.kind && a.name == b.name && a.location == b.location && a.scope == b.scope)
}

/// Serializable form of a [`SymbolStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub tables: Vec<SymbolTable>,
    pub symbol_count: usize,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    tables: Vec<&'a SymbolTable>,
    symbol_count: usize,
}

// ─── Shared store ───────────────────────────────────────────────────────────

/// A [`SymbolStore`] shared between threads: any number of readers or a
/// single writer at a time.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<SymbolStore>>,
}

impl SharedStore {
    pub fn new(store: SymbolStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SymbolStore> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SymbolStore> {
        self.inner.write()
    }

    /// Replace a file's table under the write lock.
    pub fn replace(&self, table: SymbolTable) -> Result<(), StoreError> {
        self.inner.write().replace(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Range;

    fn table(uri: &str, src: &str) -> SymbolTable {
        SymbolTable::create(&ParsedDocument::new(uri, src))
    }

    #[test]
    fn index_keys_split_words() {
        assert_eq!(
            index_keys("App\\getUserName"),
            vec!["app\\getusername", "getusername", "username", "name"]
        );
        assert_eq!(index_keys("$snake_case"), vec!["$snake_case", "snake_case", "case"]);
        assert_eq!(index_keys("HTTPClient"), vec!["httpclient"]);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut store = SymbolStore::new();
        store.add(table("file:///a.php", "<?php class A {}")).unwrap();
        let err = store.add(table("file:///a.php", "<?php class B {}")).unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                uri: "file:///a.php".to_string()
            }
        );
        assert_eq!(store.table_count(), 1);
        assert_eq!(store.find("B", |_| true).len(), 0);
    }

    #[test]
    fn replace_reports_success_and_reindexes() {
        let mut store = SymbolStore::new();
        store.add(table("file:///a.php", "<?php class A {}")).unwrap();
        assert_eq!(store.replace(table("file:///a.php", "<?php class B {}")), Ok(()));
        // an unknown uri is simply added
        assert_eq!(store.replace(table("file:///c.php", "<?php class C {}")), Ok(()));
        assert_eq!(store.table_count(), 2);
        assert!(store.find("A", |_| true).is_empty());
        assert_eq!(store.find("B", |_| true).len(), 1);
    }

    #[test]
    fn references_resolve_by_kind() {
        let mut store = SymbolStore::new();
        store
            .add(table(
                "file:///r.php",
                concat!(
                    "<?php\n",
                    "function helper() {}\n",
                    "class A { public function __construct() {} public function run() {} }\n",
                ),
            ))
            .unwrap();
        let at = Location::new("file:///use.php", Range::new(Position::new(0, 0), Position::new(0, 0)));

        // namespaced function call falls back to the global name
        let mut call = Reference::new(SymbolKind::Function, "App\\helper", at.clone());
        call.alt_name = Some("helper".to_string());
        let found = store.find_by_reference(&call, MemberMergeStrategy::None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "helper");

        let class = Reference::new(SymbolKind::Class, "A", at.clone());
        assert_eq!(store.find_by_reference(&class, MemberMergeStrategy::None).len(), 1);

        let ctor = Reference::new(SymbolKind::Constructor, "A", at.clone());
        let found = store.find_by_reference(&ctor, MemberMergeStrategy::None);
        assert_eq!(found[0].name, "__construct");

        let mut method = Reference::new(SymbolKind::Method, "RUN", at);
        assert!(store.find_by_reference(&method, MemberMergeStrategy::None).is_empty());
        method.scope = Some("A".to_string());
        assert_eq!(store.find_by_reference(&method, MemberMergeStrategy::None).len(), 1);
    }

    #[test]
    fn scope_and_resolver_at_position() {
        let t = table(
            "file:///s.php",
            concat!(
                "<?php\n",
                "namespace App;\n",
                "use Lib\\Thing;\n",
                "class A {\n",
                "    function f() {\n",
                "        $x = 1;\n",
                "    }\n",
                "}\n",
            ),
        );
        let scope = t.scope(Position::new(5, 9));
        assert_eq!(scope.name, "f");
        assert_eq!(t.absolute_scope(Position::new(5, 9)).name, "f");
        let resolver = t.name_resolver(Position::new(5, 0));
        assert_eq!(resolver.namespace(), "App");
        assert_eq!(resolver.class_name(), Some("App\\A"));
        assert_eq!(
            resolver.resolve_not_fully_qualified("Thing", SymbolKind::Class),
            "Lib\\Thing"
        );
        let f = t.find(|d| d.name == "f").unwrap();
        assert_eq!(t.parent_of(f).unwrap().name, "App\\A");
        assert!(t.contains(f));
    }

    #[test]
    fn symbol_location_maps_back_to_uri() {
        let mut store = SymbolStore::new();
        store.add(table("file:///a.php", "<?php\nclass A {}\n")).unwrap();
        let a = store.find("a", |_| true)[0];
        let location = store.symbol_location(a).unwrap();
        assert_eq!(location.uri, "file:///a.php");
        assert_eq!(location.range.start.line, 1);

        let synthetic = Declaration::new(SymbolKind::Class, "X");
        assert!(matches!(
            store.symbol_location(&synthetic),
            Err(StoreError::MissingLocation { .. })
        ));
    }

    #[test]
    fn builtins_have_no_locations() {
        let store = SymbolStore::with_builtins();
        let exception = store.find("Exception", |d| d.kind == SymbolKind::Class);
        assert_eq!(exception.len(), 1);
        assert!(exception[0].location.is_none());
    }
}
