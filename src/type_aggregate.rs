//! Inheritance closure and merged member views of a class-like.
//!
//! A [`TypeAggregate`] is built per query from one or more class-like
//! declarations (several for union-typed expressions) and the store it
//! was found in.  Nothing is cached between queries: the ancestor walk is
//! computed lazily on first use and dropped with the aggregate.
//!
//! Ancestors are visited in PHP's precedence order:
//!
//!   own traits > parent chain (each with its traits) > interfaces
//!
//! Circular inheritance is cut by a visited set and a depth limit of 20.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::symbol_store::SymbolStore;
use crate::type_string::TypeDescriptor;
use crate::types::{Declaration, SymbolKind, SymbolModifiers};

const MAX_DEPTH: u32 = 20;

/// Which declaration wins when a member appears more than once in an
/// inheritance closure.  Callers choose per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MemberMergeStrategy {
    /// Own members only; nothing inherited.
    None,
    /// The nearest declaration wins.
    #[default]
    Override,
    /// Like `Override`, but a documented ancestor replaces an undocumented
    /// (or `{@inheritdoc}`) override.
    Documented,
    /// The most-base declaration wins.
    Base,
}

pub struct TypeAggregate<'s> {
    store: &'s SymbolStore,
    roots: Vec<&'s Declaration>,
    exclude_traits: bool,
    associated: OnceCell<Vec<&'s Declaration>>,
}

impl<'s> TypeAggregate<'s> {
    /// Aggregate over the class-like named `fqn`.  Returns `None` when the
    /// store has no such declaration.
    pub fn create(store: &'s SymbolStore, fqn: &str) -> Option<Self> {
        let roots = store.find(fqn, |d| d.kind.is_class_like());
        if roots.is_empty() {
            trace!(name = fqn, "no class-like to aggregate");
            return None;
        }
        Some(Self::from_roots(store, roots))
    }

    /// Aggregate over an already resolved class-like declaration.
    pub fn new(store: &'s SymbolStore, root: &'s Declaration) -> Self {
        Self::from_roots(store, vec![root])
    }

    /// Aggregate over every class named in a union type.
    pub fn from_union(store: &'s SymbolStore, ty: &TypeDescriptor) -> Option<Self> {
        let mut roots: Vec<&'s Declaration> = Vec::new();
        for name in ty.atomic_class_names() {
            for decl in store.find(name, |d| d.kind.is_class_like()) {
                if !roots.iter().any(|r| std::ptr::eq(*r, decl)) {
                    roots.push(decl);
                }
            }
        }
        (!roots.is_empty()).then(|| Self::from_roots(store, roots))
    }

    fn from_roots(store: &'s SymbolStore, roots: Vec<&'s Declaration>) -> Self {
        Self {
            store,
            roots,
            exclude_traits: false,
            associated: OnceCell::new(),
        }
    }

    /// Leave used traits out of the ancestor closure.
    pub fn exclude_traits(mut self) -> Self {
        self.exclude_traits = true;
        self.associated = OnceCell::new();
        self
    }

    /// Name of the first root.
    pub fn name(&self) -> &str {
        self.roots.first().map(|r| r.name.as_str()).unwrap_or_default()
    }

    pub fn roots(&self) -> &[&'s Declaration] {
        &self.roots
    }

    /// Whether `name` is a class in the parent chain.
    pub fn is_base_class(&self, name: &str) -> bool {
        self.closure()
            .iter()
            .any(|d| d.kind == SymbolKind::Class && d.name.eq_ignore_ascii_case(name))
    }

    /// Whether `name` is any ancestor: parent class, interface or trait.
    pub fn is_associated(&self, name: &str) -> bool {
        self.closure().iter().any(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// The ancestor closure, filtered.
    pub fn associated<F>(&self, mut predicate: F) -> Vec<&'s Declaration>
    where
        F: FnMut(&Declaration) -> bool,
    {
        self.closure().iter().copied().filter(|d| predicate(d)).collect()
    }

    /// Own and inherited members merged under `strategy`.
    pub fn members<F>(&self, strategy: MemberMergeStrategy, mut predicate: F) -> Vec<Cow<'s, Declaration>>
    where
        F: FnMut(&Declaration) -> bool,
    {
        let mut merged: Vec<&'s Declaration> = Vec::new();
        let mut index: HashMap<(SymbolKind, String), usize> = HashMap::new();

        let own = self.roots.iter().flat_map(|&r| r.children.iter());
        for member in own.filter(|m| m.kind.is_member() && predicate(m)) {
            // duplicates within one class are kept as declared
            index.entry(member_key(member)).or_insert(merged.len());
            merged.push(member);
        }

        if strategy != MemberMergeStrategy::None {
            for &ancestor in self.closure() {
                for member in inherited_members(ancestor).filter(|m| predicate(m)) {
                    match index.get(&member_key(member)) {
                        None => {
                            index.insert(member_key(member), merged.len());
                            merged.push(member);
                        }
                        Some(&i) => {
                            if replaces(strategy, merged[i], member) {
                                merged[i] = member;
                            }
                        }
                    }
                }
            }
        }

        merged.into_iter().map(|m| self.rebind(m)).collect()
    }

    /// The first member matching `predicate`, nearest declaration first.
    pub fn first_member<F>(&self, mut predicate: F) -> Option<Cow<'s, Declaration>>
    where
        F: FnMut(&Declaration) -> bool,
    {
        let own = self
            .roots
            .iter()
            .flat_map(|&r| r.children.iter())
            .filter(|m| m.kind.is_member());
        let found = own
            .chain(self.closure().iter().flat_map(|&a| inherited_members(a)))
            .find(|m| predicate(m))?;
        Some(self.rebind(found))
    }

    fn closure(&self) -> &[&'s Declaration] {
        self.associated.get_or_init(|| {
            let mut out = Vec::new();
            let mut visited: HashSet<String> =
                self.roots.iter().map(|r| r.name.to_ascii_lowercase()).collect();
            for &root in &self.roots {
                self.walk(root, 0, &mut visited, &mut out);
            }
            out
        })
    }

    fn walk(
        &self,
        decl: &'s Declaration,
        depth: u32,
        visited: &mut HashSet<String>,
        out: &mut Vec<&'s Declaration>,
    ) {
        if depth >= MAX_DEPTH {
            trace!(name = %decl.name, "inheritance depth limit reached");
            return;
        }
        let order = [SymbolKind::Trait, SymbolKind::Class, SymbolKind::Interface];
        for kind in order {
            if kind == SymbolKind::Trait && self.exclude_traits {
                continue;
            }
            for link in decl.associated.iter().filter(|a| a.kind == kind) {
                if !visited.insert(link.name.to_ascii_lowercase()) {
                    continue;
                }
                let Some(ancestor) = self
                    .store
                    .find(&link.name, |d| d.kind.is_class_like())
                    .into_iter()
                    .next()
                else {
                    continue;
                };
                out.push(ancestor);
                self.walk(ancestor, depth + 1, visited, out);
            }
        }
    }

    /// Rebind `$this`/`static` in a member's types to the aggregate's type.
    fn rebind(&self, member: &'s Declaration) -> Cow<'s, Declaration> {
        let [root] = self.roots.as_slice() else {
            return Cow::Borrowed(member);
        };
        if !matches!(member.kind, SymbolKind::Method | SymbolKind::Property) {
            return Cow::Borrowed(member);
        }
        let ty = member.ty.resolve_this_or_static(&root.name);
        let doc_ty = member
            .doc
            .as_ref()
            .map(|doc| doc.ty.resolve_this_or_static(&root.name));
        let doc_changed = match (&member.doc, &doc_ty) {
            (Some(doc), Some(ty)) => doc.ty != *ty,
            _ => false,
        };
        if ty == member.ty && !doc_changed {
            return Cow::Borrowed(member);
        }
        let mut owned = member.clone();
        owned.ty = ty;
        if let (Some(doc), Some(ty)) = (owned.doc.as_mut(), doc_ty) {
            doc.ty = ty;
        }
        Cow::Owned(owned)
    }
}

/// Members an ancestor contributes: everything except private members of
/// parent classes.  Trait members are copied into the user, privates too.
fn inherited_members(ancestor: &Declaration) -> impl Iterator<Item = &Declaration> {
    let is_class = ancestor.kind == SymbolKind::Class;
    ancestor
        .children
        .iter()
        .filter(move |m| m.kind.is_member() && !(is_class && m.has(SymbolModifiers::PRIVATE)))
}

fn member_key(member: &Declaration) -> (SymbolKind, String) {
    let name = if member.kind == SymbolKind::Method {
        member.name.to_ascii_lowercase()
    } else {
        member.name.clone()
    };
    (member.kind, name)
}

fn replaces(strategy: MemberMergeStrategy, kept: &Declaration, candidate: &Declaration) -> bool {
    match strategy {
        MemberMergeStrategy::None | MemberMergeStrategy::Override => false,
        MemberMergeStrategy::Base => true,
        MemberMergeStrategy::Documented => {
            let kept_documented = kept.doc.as_ref().is_some_and(|d| !d.is_inherit_doc());
            !kept_documented && candidate.doc.is_some()
        }
    }
}
