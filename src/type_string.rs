//! Type descriptor algebra.
//!
//! A [`TypeDescriptor`] is a normalised union of atomic types.  Each atom
//! is a class/interface/trait name, a scalar keyword or `mixed`, paired
//! with an array-nesting depth (`Foo[][]` is `Foo` at depth 2).  All
//! operations are pure and infallible: anything that cannot be expressed
//! degrades to `mixed`.
//!
//! Descriptors are parsed from PHPDoc syntax (`int|Foo[]`, `?Bar`,
//! `array<int, Baz>`, `list<Qux>`) and serialise back to the same
//! canonical string form.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::name_resolver::NameResolver;
use crate::types::SymbolKind;

/// Union size past which [`TypeDescriptor::merge`] collapses to `mixed`.
pub const DEFAULT_UNION_LIMIT: usize = 8;

/// Keywords that are never resolved as class names.
const KEYWORDS: &[&str] = &[
    "string", "int", "bool", "float", "object", "mixed", "array", "resource", "void", "null",
    "false", "true", "callable", "iterable", "never", "static", "$this", "self", "parent",
    "integer", "boolean", "double", "number", "scalar", "array-key", "class-string", "list",
    "non-empty-array", "non-empty-list", "non-empty-string", "positive-int", "negative-int",
];

/// Whether `name` is a scalar/pseudo type keyword rather than a class name.
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(name))
}

fn normalise_keyword(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "integer" | "positive-int" | "negative-int" => "int".to_string(),
        "boolean" => "bool".to_string(),
        "double" => "float".to_string(),
        "non-empty-string" | "class-string" => "string".to_string(),
        "$this" => "$this".to_string(),
        lower if is_keyword(lower) => lower.to_string(),
        _ => name.trim_start_matches('\\').to_string(),
    }
}

/// One member of a union.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeAtom {
    pub name: String,
    pub depth: u32,
}

impl TypeAtom {
    pub fn new(name: impl Into<String>, depth: u32) -> Self {
        Self {
            name: name.into(),
            depth,
        }
    }

    fn same_as(&self, other: &TypeAtom) -> bool {
        self.depth == other.depth && self.name.eq_ignore_ascii_case(&other.name)
    }

    fn is_mixed(&self) -> bool {
        self.name == "mixed"
    }
}

impl fmt::Display for TypeAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for _ in 0..self.depth {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// A deduplicated union of [`TypeAtom`]s.  The empty union means "no
/// information".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDescriptor {
    atoms: Vec<TypeAtom>,
}

impl TypeDescriptor {
    pub fn empty() -> Self {
        Self { atoms: Vec::new() }
    }

    pub fn mixed() -> Self {
        Self::atomic("mixed")
    }

    /// A single atom at depth zero.
    pub fn atomic(name: impl AsRef<str>) -> Self {
        Self {
            atoms: vec![TypeAtom::new(normalise_keyword(name.as_ref()), 0)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn is_mixed(&self) -> bool {
        self.atoms.iter().any(|a| a.is_mixed() && a.depth == 0)
    }

    pub fn atoms(&self) -> &[TypeAtom] {
        &self.atoms
    }

    /// Parse PHPDoc type syntax.  Unparseable fragments are dropped.
    pub fn parse(text: &str) -> Self {
        let mut out = TypeDescriptor::empty();
        for part in split_union(text.trim()) {
            out.push_parsed(part.trim(), 0);
        }
        out
    }

    fn push_parsed(&mut self, part: &str, depth: u32) {
        if part.is_empty() {
            return;
        }
        if let Some(inner) = part.strip_prefix('?') {
            self.push_parsed(inner, depth);
            self.push_atom(TypeAtom::new("null", depth));
            return;
        }
        if let Some(inner) = part.strip_suffix("[]") {
            let inner = inner.trim();
            if let Some(grouped) = inner.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
                for member in split_union(grouped) {
                    self.push_parsed(member.trim(), depth + 1);
                }
            } else {
                self.push_parsed(inner, depth + 1);
            }
            return;
        }
        if let Some(grouped) = part.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            for member in split_union(grouped) {
                self.push_parsed(member.trim(), depth);
            }
            return;
        }
        if let Some(open) = part.find('<') {
            let base = part[..open].trim();
            let args = part[open + 1..].trim_end_matches('>');
            let lower = base.to_ascii_lowercase();
            if matches!(
                lower.as_str(),
                "array" | "list" | "iterable" | "non-empty-array" | "non-empty-list"
            ) {
                let value = split_generic_args(args).pop().unwrap_or_default();
                if value.is_empty() {
                    self.push_atom(TypeAtom::new("array", depth));
                } else {
                    self.push_parsed(value.trim(), depth + 1);
                }
            } else {
                self.push_parsed(base, depth);
            }
            return;
        }
        if part.starts_with('{') || part.contains('{') {
            // array shapes
            self.push_atom(TypeAtom::new("array", depth));
            return;
        }
        let name = normalise_keyword(part);
        let name = match name.as_str() {
            "list" | "non-empty-array" | "non-empty-list" => "array".to_string(),
            _ => name,
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return;
        }
        self.push_atom(TypeAtom::new(name, depth));
    }

    fn push_atom(&mut self, atom: TypeAtom) {
        if !self.atoms.iter().any(|a| a.same_as(&atom)) {
            self.atoms.push(atom);
        }
    }

    /// Order-independent union, capped at [`DEFAULT_UNION_LIMIT`] atoms.
    pub fn merge(&self, other: &TypeDescriptor) -> TypeDescriptor {
        self.merge_with_limit(other, DEFAULT_UNION_LIMIT)
    }

    /// Union of both descriptors; collapses to `mixed` when the result
    /// would hold more than `limit` atoms.
    pub fn merge_with_limit(&self, other: &TypeDescriptor, limit: usize) -> TypeDescriptor {
        let mut out = self.clone();
        for atom in &other.atoms {
            out.push_atom(atom.clone());
        }
        out.normalise(limit)
    }

    fn normalise(mut self, limit: usize) -> TypeDescriptor {
        if self.is_mixed() || self.atoms.len() > limit {
            return TypeDescriptor::mixed();
        }
        self.atoms.sort_by(|a, b| {
            a.name
                .to_ascii_lowercase()
                .cmp(&b.name.to_ascii_lowercase())
                .then(a.depth.cmp(&b.depth))
        });
        self
    }

    /// Fold an iterator of descriptors with [`merge`](Self::merge).
    pub fn merge_all<'a>(types: impl IntoIterator<Item = &'a TypeDescriptor>) -> TypeDescriptor {
        types
            .into_iter()
            .fold(TypeDescriptor::empty(), |acc, t| acc.merge(t))
    }

    /// "Array of" this type.
    pub fn array_wrap(&self) -> TypeDescriptor {
        TypeDescriptor {
            atoms: self
                .atoms
                .iter()
                .map(|a| TypeAtom::new(a.name.clone(), a.depth + 1))
                .collect(),
        }
    }

    /// Element type of this type.  Atoms that are not arrays degrade to
    /// `mixed`; `null` and `false` members of a nullable array are dropped.
    pub fn array_unwrap(&self) -> TypeDescriptor {
        let mut out = TypeDescriptor::empty();
        for atom in &self.atoms {
            if atom.depth > 0 {
                out.push_atom(TypeAtom::new(atom.name.clone(), atom.depth - 1));
            } else if matches!(atom.name.as_str(), "null" | "false" | "void") {
                continue;
            } else {
                return TypeDescriptor::mixed();
            }
        }
        if out.is_empty() && !self.is_empty() {
            return TypeDescriptor::mixed();
        }
        out
    }

    /// Rewrite class-name atoms to fully-qualified names.
    pub fn resolve_names(&self, resolver: &NameResolver) -> TypeDescriptor {
        let mut out = TypeDescriptor::empty();
        for atom in &self.atoms {
            let name = if atom.name.eq_ignore_ascii_case("self") {
                resolver
                    .class_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| atom.name.clone())
            } else if is_keyword(&atom.name) {
                atom.name.clone()
            } else if let Some(fqn) = atom.name.strip_prefix('\\') {
                fqn.to_string()
            } else {
                resolver.resolve_not_fully_qualified(&atom.name, SymbolKind::Class)
            };
            out.push_atom(TypeAtom::new(name, atom.depth));
        }
        out
    }

    /// Replace `$this` and `static` atoms with `name`.
    pub fn resolve_this_or_static(&self, name: &str) -> TypeDescriptor {
        let mut out = TypeDescriptor::empty();
        for atom in &self.atoms {
            if atom.name == "$this" || atom.name.eq_ignore_ascii_case("static") {
                out.push_atom(TypeAtom::new(name, atom.depth));
            } else {
                out.push_atom(atom.clone());
            }
        }
        out
    }

    /// Non-keyword atoms at depth zero: the classes a member access on a
    /// value of this type could dispatch to.
    pub fn atomic_class_names(&self) -> Vec<&str> {
        self.atoms
            .iter()
            .filter(|a| a.depth == 0 && !is_keyword(&a.name))
            .map(|a| a.name.as_str())
            .collect()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{atom}")?;
        }
        Ok(())
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(TypeDescriptor::parse(&text))
    }
}

/// Split on top-level `|`, ignoring separators nested in `<>`, `()` or `{}`.
fn split_union(text: &str) -> Vec<&str> {
    split_top_level(text, '|')
}

fn split_generic_args(text: &str) -> Vec<&str> {
    split_top_level(text, ',')
}

fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '{' => depth += 1,
            '>' | ')' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unions_arrays_and_nullables() {
        assert_eq!(TypeDescriptor::parse("int|string").to_string(), "int|string");
        assert_eq!(TypeDescriptor::parse("Foo[]").to_string(), "Foo[]");
        assert_eq!(TypeDescriptor::parse("?Foo").to_string(), "Foo|null");
        assert_eq!(TypeDescriptor::parse("(A|B)[]").to_string(), "A[]|B[]");
        assert_eq!(TypeDescriptor::parse("array<int, User>").to_string(), "User[]");
        assert_eq!(TypeDescriptor::parse("list<User>").to_string(), "User[]");
        assert_eq!(TypeDescriptor::parse("Collection<User>").to_string(), "Collection");
        assert_eq!(TypeDescriptor::parse("\\App\\Foo").to_string(), "App\\Foo");
        assert_eq!(TypeDescriptor::parse("integer|boolean").to_string(), "int|bool");
        assert!(TypeDescriptor::parse("").is_empty());
    }

    #[test]
    fn merge_is_idempotent_and_order_independent() {
        let a = TypeDescriptor::parse("int");
        let b = TypeDescriptor::parse("string");
        assert_eq!(a.merge(&a), a);
        assert_eq!(a.merge(&b), b.merge(&a));
        assert_eq!(a.merge(&b).to_string(), "int|string");
        let foo = TypeDescriptor::parse("Foo");
        assert_eq!(foo.merge(&TypeDescriptor::parse("foo")).atoms().len(), 1);
    }

    #[test]
    fn merge_collapses_past_limit() {
        let many = TypeDescriptor::parse("A|B|C");
        let more = TypeDescriptor::parse("D|E");
        assert!(many.merge_with_limit(&more, 4).is_mixed());
        assert_eq!(many.merge_with_limit(&more, 5).atoms().len(), 5);
        assert!(many.merge(&TypeDescriptor::mixed()).is_mixed());
    }

    #[test]
    fn wrap_then_unwrap_is_identity() {
        for name in ["int", "Foo", "mixed", "App\\Bar"] {
            let t = TypeDescriptor::atomic(name);
            assert_eq!(t.array_wrap().array_unwrap(), t);
        }
        assert!(TypeDescriptor::parse("Foo").array_unwrap().is_mixed());
        assert!(TypeDescriptor::parse("array").array_unwrap().is_mixed());
        assert_eq!(TypeDescriptor::parse("Foo[][]").array_unwrap().to_string(), "Foo[]");
    }

    #[test]
    fn rebinding_this_and_static() {
        let t = TypeDescriptor::parse("static|$this[]|null");
        assert_eq!(t.resolve_this_or_static("App\\B").to_string(), "App\\B|App\\B[]|null");
    }

    #[test]
    fn atomic_class_names_skip_keywords_and_arrays() {
        let t = TypeDescriptor::parse("Foo|int|Bar[]|null");
        assert_eq!(t.atomic_class_names(), vec!["Foo"]);
    }

    #[test]
    fn serialises_as_string() {
        let t = TypeDescriptor::parse("Foo[]|int");
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"Foo[]|int\"");
        let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
