//! Namespace-aware name resolution.
//!
//! A [`NameResolver`] carries the context needed to turn a name as written
//! in source into a fully-qualified name:
//!
//!   - the current namespace,
//!   - the `use` import rules seen so far (alias → target, per kind),
//!   - the stack of enclosing classes (for `self`, `static` and `parent`).
//!
//! Both reader passes drive a resolver while they walk a file, and the
//! symbol table can rebuild one for any position after the fact.
//!
//! # Resolution rules
//!
//!   - `\Foo\Bar` is already fully qualified; the leading `\` is dropped.
//!   - `namespace\Foo` is relative: always prefixed with the namespace.
//!   - `Foo\Bar` looks up `Foo` among class imports, otherwise it is
//!     prefixed with the current namespace.
//!   - `Foo` looks up an import of the requested kind, otherwise it is
//!     prefixed with the current namespace.  For functions and constants
//!     PHP falls back to the global name at runtime, so callers keep the
//!     bare name as an alternate (see [`NameResolver::resolve_with_fallback`]).
//!
//! Nothing here fails: a name with no better resolution passes through
//! namespaced or unchanged.

use crate::types::{Declaration, SymbolKind, SymbolModifiers};

/// An import rule created by a `use` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRule {
    /// The alias the import is visible as (`Baz` in `use Foo\Bar as Baz`).
    pub alias: String,
    /// Fully-qualified target (`Foo\Bar`).
    pub target: String,
    /// Class, Function or Constant.
    pub kind: SymbolKind,
}

impl ImportRule {
    /// Build a rule from a `use` declaration, if it is one.
    pub fn from_declaration(decl: &Declaration) -> Option<ImportRule> {
        if !decl.modifiers.contains(SymbolModifiers::USE) {
            return None;
        }
        let target = decl.associated.first()?;
        Some(ImportRule {
            alias: decl.name.clone(),
            target: target.name.clone(),
            kind: decl.kind,
        })
    }
}

/// The class context `self`/`static`/`parent` resolve against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassContext {
    pub name: String,
    pub base: Option<String>,
}

impl ClassContext {
    /// Context for a class-like declaration; the base class is the first
    /// associated Class entry.
    pub fn from_declaration(decl: &Declaration) -> ClassContext {
        let base = if decl.kind == SymbolKind::Class {
            decl.associated
                .iter()
                .find(|a| a.kind == SymbolKind::Class)
                .map(|a| a.name.clone())
        } else {
            None
        };
        ClassContext {
            name: decl.name.clone(),
            base,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    namespace: String,
    rules: Vec<ImportRule>,
    classes: Vec<ClassContext>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Enter a namespace.  Import rules belong to a namespace block, so
    /// they are cleared.
    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
        self.rules.clear();
    }

    pub fn rules(&self) -> &[ImportRule] {
        &self.rules
    }

    pub fn push_rule(&mut self, rule: ImportRule) {
        self.rules.push(rule);
    }

    pub fn push_class(&mut self, class: ClassContext) {
        self.classes.push(class);
    }

    pub fn pop_class(&mut self) -> Option<ClassContext> {
        self.classes.pop()
    }

    /// Replace the innermost class context.  The declaration pass learns
    /// a class's name only after it entered the class.
    pub fn update_class(&mut self, class: ClassContext) {
        match self.classes.last_mut() {
            Some(top) => *top = class,
            None => self.classes.push(class),
        }
    }

    /// Name of the innermost enclosing class, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.classes
            .last()
            .map(|c| c.name.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Base class name of the innermost enclosing class, if any.
    pub fn class_base_name(&self) -> Option<&str> {
        self.classes.last().and_then(|c| c.base.as_deref())
    }

    /// Prefix `name` with the current namespace, ignoring imports.
    pub fn resolve_relative(&self, name: &str) -> String {
        concat_namespace_name(&self.namespace, name)
    }

    /// Resolve a name written without a leading `\`.
    pub fn resolve_not_fully_qualified(&self, name: &str, kind: SymbolKind) -> String {
        if name.is_empty() {
            return String::new();
        }
        match name.to_ascii_lowercase().as_str() {
            "self" | "static" => {
                return self.class_name().map(str::to_string).unwrap_or_else(|| name.to_string());
            }
            "parent" => {
                return self
                    .class_base_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| name.to_string());
            }
            _ => {}
        }
        match name.find('\\') {
            Some(pos) => self.resolve_qualified(name, pos),
            None => self.resolve_unqualified(name, kind),
        }
    }

    /// Resolve `name` and report the bare global name as alternate when
    /// PHP would fall back to it at runtime (unqualified functions and
    /// constants with no import).
    pub fn resolve_with_fallback(&self, name: &str, kind: SymbolKind) -> (String, Option<String>) {
        let resolved = self.resolve_not_fully_qualified(name, kind);
        let falls_back = matches!(kind, SymbolKind::Function | SymbolKind::Constant)
            && !name.contains('\\')
            && self.match_import(name, kind).is_none()
            && resolved != name;
        let alt = falls_back.then(|| name.to_string());
        (resolved, alt)
    }

    /// Resolve a name exactly as the parser spells it: `\Foo` is fully
    /// qualified, `namespace\Foo` is relative and anything else goes
    /// through imports.  The alternate is the global fallback, as in
    /// [`NameResolver::resolve_with_fallback`].
    pub fn resolve_written(&self, name: &str, kind: SymbolKind) -> (String, Option<String>) {
        if let Some(qualified) = name.strip_prefix('\\') {
            return (qualified.to_string(), None);
        }
        let relative = name
            .get(..10)
            .filter(|prefix| prefix.eq_ignore_ascii_case("namespace\\"))
            .and_then(|_| name.get(10..));
        match relative {
            Some(rest) => (self.resolve_relative(rest), None),
            None => self.resolve_with_fallback(name, kind),
        }
    }

    fn resolve_qualified(&self, name: &str, pos: usize) -> String {
        match self.match_import(&name[..pos], SymbolKind::Class) {
            Some(rule) => format!("{}{}", rule.target, &name[pos..]),
            None => self.resolve_relative(name),
        }
    }

    fn resolve_unqualified(&self, name: &str, kind: SymbolKind) -> String {
        let kind = match kind {
            SymbolKind::Constructor | SymbolKind::Interface | SymbolKind::Trait => SymbolKind::Class,
            other => other,
        };
        match self.match_import(name, kind) {
            Some(rule) => rule.target.clone(),
            None => self.resolve_relative(name),
        }
    }

    /// Latest import rule of `kind` whose alias matches `alias`.
    pub fn match_import(&self, alias: &str, kind: SymbolKind) -> Option<&ImportRule> {
        self.rules.iter().rev().find(|rule| {
            let kind_matches = match kind {
                SymbolKind::Class => rule.kind.is_class_like(),
                other => rule.kind == other,
            };
            kind_matches
                && if kind == SymbolKind::Constant {
                    rule.alias == alias
                } else {
                    rule.alias.eq_ignore_ascii_case(alias)
                }
        })
    }
}

/// Join a namespace and a name with `\`, skipping empty parts.
pub fn concat_namespace_name(prefix: &str, suffix: &str) -> String {
    match (prefix.is_empty(), suffix.is_empty()) {
        (true, _) => suffix.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}\\{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NameResolver {
        let mut r = NameResolver::new();
        r.set_namespace("App");
        r.push_rule(ImportRule {
            alias: "Baz".into(),
            target: "Foo\\Bar".into(),
            kind: SymbolKind::Class,
        });
        r.push_rule(ImportRule {
            alias: "helper".into(),
            target: "Lib\\helper".into(),
            kind: SymbolKind::Function,
        });
        r
    }

    #[test]
    fn alias_resolves_to_import_target() {
        let r = resolver();
        assert_eq!(r.resolve_not_fully_qualified("Baz", SymbolKind::Class), "Foo\\Bar");
        assert_eq!(r.resolve_not_fully_qualified("baz", SymbolKind::Class), "Foo\\Bar");
        assert_eq!(r.resolve_not_fully_qualified("Baz\\Sub", SymbolKind::Class), "Foo\\Bar\\Sub");
    }

    #[test]
    fn unimported_names_are_namespaced() {
        let r = resolver();
        assert_eq!(r.resolve_not_fully_qualified("Qux", SymbolKind::Class), "App\\Qux");
        assert_eq!(r.resolve_relative("Baz"), "App\\Baz");
        let (name, alt) = r.resolve_with_fallback("Qux", SymbolKind::Function);
        assert_eq!(name, "App\\Qux");
        assert_eq!(alt.as_deref(), Some("Qux"));
        let (_, alt) = r.resolve_with_fallback("Qux", SymbolKind::Class);
        assert_eq!(alt, None);
    }

    #[test]
    fn imports_are_kind_specific() {
        let r = resolver();
        assert_eq!(r.resolve_not_fully_qualified("helper", SymbolKind::Function), "Lib\\helper");
        assert_eq!(r.resolve_not_fully_qualified("helper", SymbolKind::Class), "App\\helper");
        let (name, alt) = r.resolve_with_fallback("helper", SymbolKind::Function);
        assert_eq!(name, "Lib\\helper");
        assert_eq!(alt, None, "imported functions never fall back");
    }

    #[test]
    fn class_keywords_use_the_class_stack() {
        let mut r = resolver();
        r.push_class(ClassContext {
            name: "App\\B".into(),
            base: Some("App\\A".into()),
        });
        assert_eq!(r.resolve_not_fully_qualified("self", SymbolKind::Class), "App\\B");
        assert_eq!(r.resolve_not_fully_qualified("static", SymbolKind::Class), "App\\B");
        assert_eq!(r.resolve_not_fully_qualified("parent", SymbolKind::Class), "App\\A");
        r.pop_class();
        assert_eq!(r.class_name(), None);
    }

    #[test]
    fn written_names_honour_leading_separators() {
        let r = resolver();
        assert_eq!(r.resolve_written("\\Baz", SymbolKind::Class), ("Baz".to_string(), None));
        assert_eq!(r.resolve_written("namespace\\Baz", SymbolKind::Class).0, "App\\Baz");
        assert_eq!(r.resolve_written("Baz", SymbolKind::Class).0, "Foo\\Bar");
        let (name, alt) = r.resolve_written("strlen", SymbolKind::Function);
        assert_eq!(name, "App\\strlen");
        assert_eq!(alt.as_deref(), Some("strlen"));
    }

    #[test]
    fn global_namespace_keeps_bare_names() {
        let r = NameResolver::new();
        assert_eq!(r.resolve_not_fully_qualified("Foo", SymbolKind::Class), "Foo");
        assert_eq!(r.resolve_with_fallback("strlen", SymbolKind::Function).1, None);
    }
}
