//! Data types shared by every layer of the semantic core.
//!
//! This module contains the "model" structs and enums that describe
//! what the reader passes extract from PHP source: positions and
//! locations, declaration kinds and modifier flags, the [`Declaration`]
//! tree node and the [`Reference`] use-site record.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::tree::TreeNode;
use crate::type_string::TypeDescriptor;

// ─── Positions ──────────────────────────────────────────────────────────────

/// A zero-based line/character position inside a document.
///
/// `character` counts UTF-16 code units, matching what editors send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open range between two positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `pos` lies inside this range (both ends inclusive).
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// A range inside a named document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

impl Location {
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
        }
    }
}

/// A location whose document is identified by the stable hash of its uri.
///
/// Declarations store this instead of a full [`Location`] so that they
/// carry no back-pointer to their owning symbol table; the store maps the
/// hash back to a uri.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashedLocation {
    pub uri_hash: u32,
    pub range: Range,
}

/// Stable 32-bit hash of a string.
///
/// Uses the classic `h * 31 + c` string hash over UTF-16 code units and
/// returns its absolute value, so snapshots written by one build can be
/// read by another.
pub fn hash32(text: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

// ─── Declaration kinds ──────────────────────────────────────────────────────

/// What a [`Declaration`] or [`Reference`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Namespace,
    Class,
    Interface,
    Trait,
    Function,
    Method,
    Constructor,
    Property,
    ClassConstant,
    Constant,
    Parameter,
    Variable,
    File,
}

impl SymbolKind {
    /// Class, interface or trait.
    pub fn is_class_like(self) -> bool {
        matches!(self, SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait)
    }

    /// Kinds that live inside a class-like body.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::Property | SymbolKind::ClassConstant
        )
    }

    /// Kinds that open a lexical scope in the declaration tree.
    pub fn is_scope(self) -> bool {
        matches!(
            self,
            SymbolKind::Namespace
                | SymbolKind::Class
                | SymbolKind::Interface
                | SymbolKind::Trait
                | SymbolKind::Function
                | SymbolKind::Method
                | SymbolKind::File
        )
    }

    /// Kinds whose names compare case-sensitively in PHP.
    pub fn is_case_sensitive(self) -> bool {
        matches!(
            self,
            SymbolKind::Constant
                | SymbolKind::Variable
                | SymbolKind::Parameter
                | SymbolKind::Property
                | SymbolKind::ClassConstant
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SymbolKind::Namespace => "namespace",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Property => "property",
            SymbolKind::ClassConstant => "class constant",
            SymbolKind::Constant => "constant",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Variable => "variable",
            SymbolKind::File => "file",
        };
        f.write_str(label)
    }
}

bitflags! {
    /// Modifier flags of a [`Declaration`].
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SymbolModifiers: u16 {
        const PUBLIC = 1;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const ABSTRACT = 1 << 4;
        const FINAL = 1 << 5;
        const ANONYMOUS = 1 << 6;
        const MAGIC = 1 << 7;
        const USE = 1 << 8;
        const REFERENCE = 1 << 9;
        const VARIADIC = 1 << 10;
        const READ_ONLY = 1 << 11;
        const WRITE_ONLY = 1 << 12;
    }
}

impl SymbolModifiers {
    pub const VISIBILITY: SymbolModifiers = SymbolModifiers::PUBLIC
        .union(SymbolModifiers::PROTECTED)
        .union(SymbolModifiers::PRIVATE);

    /// Map a modifier keyword (`public`, `static`, `var`, ...) to its flag.
    pub fn from_keyword(keyword: &str) -> SymbolModifiers {
        match keyword.to_ascii_lowercase().as_str() {
            "public" | "var" => SymbolModifiers::PUBLIC,
            "protected" => SymbolModifiers::PROTECTED,
            "private" => SymbolModifiers::PRIVATE,
            "static" => SymbolModifiers::STATIC,
            "abstract" => SymbolModifiers::ABSTRACT,
            "final" => SymbolModifiers::FINAL,
            "readonly" => SymbolModifiers::READ_ONLY,
            _ => SymbolModifiers::empty(),
        }
    }
}

// ─── Declarations ───────────────────────────────────────────────────────────

/// Documentation attached to a declaration: the free-text description of
/// its doc comment and the type the comment declares for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolDoc {
    pub description: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

impl SymbolDoc {
    pub fn new(description: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            description: description.into(),
            ty,
        }
    }

    /// Whether the description asks to inherit the parent's documentation.
    pub fn is_inherit_doc(&self) -> bool {
        self.description.to_ascii_lowercase().contains("inheritdoc")
    }
}

/// One node of a Declaration Tree.
///
/// Names are fully qualified for namespaces, class-likes, functions and
/// constants; members keep their short name (properties with the `$`
/// prefix) and record the owning type in `scope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: SymbolKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "SymbolModifiers::is_empty")]
    pub modifiers: SymbolModifiers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "TypeDescriptor::is_empty")]
    pub ty: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<HashedLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associated: Vec<Declaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<SymbolDoc>,
}

impl Declaration {
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            modifiers: SymbolModifiers::empty(),
            scope: None,
            ty: TypeDescriptor::empty(),
            location: None,
            children: Vec::new(),
            associated: Vec::new(),
            value: None,
            doc: None,
        }
    }

    pub fn with_location(mut self, location: HashedLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_modifiers(mut self, modifiers: SymbolModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// The type a use of this declaration evaluates to: the documented
    /// type when present, otherwise the declared one.
    pub fn resolved_type(&self) -> TypeDescriptor {
        match &self.doc {
            Some(doc) if !doc.ty.is_empty() => doc.ty.clone(),
            _ => self.ty.clone(),
        }
    }

    /// The last namespace segment of the name.
    pub fn short_name(&self) -> &str {
        match self.name.rfind('\\') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    pub fn has(&self, modifiers: SymbolModifiers) -> bool {
        self.modifiers.intersects(modifiers)
    }

    /// Whether `name` names this declaration under PHP's case rules.
    pub fn name_matches(&self, name: &str) -> bool {
        if self.kind.is_case_sensitive() {
            self.name == name
        } else {
            self.name.eq_ignore_ascii_case(name)
        }
    }

    /// Collect this declaration and every descendant in pre-order.
    pub fn descendants(&self) -> Vec<&Declaration> {
        let mut out = Vec::new();
        let mut stack: Vec<&Declaration> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Clear locations recursively; used for built-in stubs.
    pub fn strip_locations(&mut self) {
        self.location = None;
        for child in &mut self.children {
            child.strip_locations();
        }
    }
}

impl TreeNode for Declaration {
    fn children(&self) -> &[Declaration] {
        &self.children
    }
}

// ─── References ─────────────────────────────────────────────────────────────

/// A use site of a name or expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: SymbolKind,
    pub name: String,
    /// Unqualified fallback for names whose namespaced form may not exist
    /// (global functions and constants), or the `self`/`static`/`parent`
    /// keyword the name was written as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_name: Option<String>,
    pub location: Location,
    /// Owning type of a member reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "TypeDescriptor::is_empty")]
    pub ty: TypeDescriptor,
}

impl Reference {
    pub fn new(kind: SymbolKind, name: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            name: name.into(),
            alt_name: None,
            location,
            scope: None,
            ty: TypeDescriptor::empty(),
        }
    }
}
