//! Reference reader.
//!
//! The second pass over a file.  It walks the same program as the
//! declaration reader but builds a Reference Tree: one [`Scope`] per
//! namespace, class-like, function, method and closure, holding a
//! [`Reference`] for every name, variable and member written inside it.
//!
//! Expressions are evaluated bottom-up: each one returns its type to the
//! construct that contains it, and constructs the reader does not model
//! return no type, so a type never leaks out of an expression that would
//! change it.  Their children are still read for references.
//!
//! Variable types are tracked flow-sensitively in a [`VariableTable`]:
//! assignments, `foreach`, `instanceof`, `catch` and `@var` comments
//! update it as they are read, and conditionals open one branch per arm.
//! Cross-file types come from the [`SymbolStore`], so the file's own
//! declaration pass must already be in the store.

use std::collections::HashMap;

use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;
use tracing::{debug, trace};

use crate::docblock::PhpDoc;
use crate::name_resolver::{ClassContext, ImportRule, NameResolver};
use crate::reference_table::{ReferenceNode, ReferenceTable, Scope};
use crate::symbol_reader::literal_type;
use crate::symbol_store::{SymbolStore, SymbolTable};
use crate::syntax::walk::{Node, argument_value};
use crate::syntax::{Comments, ParsedDocument};
use crate::type_aggregate::{MemberMergeStrategy, TypeAggregate};
use crate::type_string::{self, DEFAULT_UNION_LIMIT, TypeDescriptor};
use crate::types::{Declaration, Location, Position, Range, Reference, SymbolKind, SymbolModifiers};
use crate::variable_table::VariableTable;

/// Build the Reference Tree of `document`.
pub fn read_references(document: &ParsedDocument, store: &SymbolStore) -> ReferenceTable {
    read_references_with_limit(document, store, DEFAULT_UNION_LIMIT)
}

/// [`read_references`] with an explicit union size limit for inferred
/// variable types.
pub fn read_references_with_limit(
    document: &ParsedDocument,
    store: &SymbolStore,
    union_limit: usize,
) -> ReferenceTable {
    let owned;
    let table = match store.table(document.uri()) {
        Some(table) => table,
        None => {
            debug!(uri = document.uri(), "file not in store, reading declarations");
            owned = SymbolTable::create(document);
            &owned
        }
    };
    let mut reader = ReferenceReader::new(document, table, store).with_union_limit(union_limit);
    document.with_program(|program| reader.read(program));
    let table = reader.into_table();
    debug!(
        uri = table.uri(),
        references = table.references().len(),
        "read references"
    );
    table
}

/// A variable written by an assignment target, waiting for its type.
#[derive(Debug, Clone)]
struct Target {
    name: String,
    /// Array nesting of the written position: `1` for `$a[] = ..`, `-1`
    /// for each `list()` level.
    depth: i32,
    /// Index of the variable's reference in the current scope.
    slot: Option<usize>,
}

impl Target {
    /// The variable's own type when `ty` is stored at its position.
    fn base_type(&self, ty: &TypeDescriptor) -> TypeDescriptor {
        let mut out = ty.clone();
        if self.depth > 0 {
            for _ in 0..self.depth {
                out = out.array_wrap();
            }
        } else {
            for _ in self.depth..0 {
                out = out.array_unwrap();
            }
        }
        out
    }

    fn nested(mut self, by: i32) -> Self {
        self.depth += by;
        self
    }
}

/// A `@var` tag waiting for the next assignment.
#[derive(Debug, Clone)]
struct VarHint {
    name: String,
    ty: TypeDescriptor,
}

/// Type of a binary operator's result, for operators whose result type
/// does not depend on the operands.
fn operator_type(operator: &str) -> Option<&'static str> {
    let name = match operator.to_ascii_lowercase().as_str() {
        "." => "string",
        "==" | "!=" | "<>" | "===" | "!==" | "<" | "<=" | ">" | ">=" => "bool",
        "&&" | "||" | "and" | "or" | "xor" => "bool",
        "<=>" => "int",
        _ => return None,
    };
    Some(name)
}

/// Type of a cast written as `(int)`, `( string )` and so on.
fn cast_type(operator: &str) -> Option<&'static str> {
    let inner = operator.strip_prefix('(')?.strip_suffix(')')?.trim();
    let name = match inner.to_ascii_lowercase().as_str() {
        "int" | "integer" => "int",
        "float" | "double" | "real" => "float",
        "string" | "binary" => "string",
        "bool" | "boolean" => "bool",
        "array" => "array",
        "object" => "object",
        "unset" => "null",
        _ => return None,
    };
    Some(name)
}

/// Type of a keyword written where a name is expected.
fn builtin_name_type(kind: SymbolKind, text: &str) -> TypeDescriptor {
    match text.to_ascii_lowercase().as_str() {
        "true" | "false" if kind == SymbolKind::Constant => TypeDescriptor::atomic("bool"),
        "null" if kind == SymbolKind::Constant => TypeDescriptor::atomic("null"),
        _ if kind == SymbolKind::Class => TypeDescriptor::parse(text),
        _ => TypeDescriptor::empty(),
    }
}

fn use_items<'u, 'a>(items: &'u UseItems<'a>) -> Vec<&'u UseItem<'a>> {
    match items {
        UseItems::Sequence(sequence) => sequence.items.iter().collect(),
        UseItems::TypedSequence(sequence) => sequence.items.iter().collect(),
        UseItems::TypedList(list) => list.items.iter().collect(),
        UseItems::MixedList(list) => list.items.iter().map(|typed| &typed.item).collect(),
    }
}

// ─── Reader ─────────────────────────────────────────────────────────────────

struct ClassFrame<'a> {
    name: String,
    aggregate: Option<TypeAggregate<'a>>,
}

/// The program reader producing a Reference Tree.  Most callers want
/// [`read_references`].
pub struct ReferenceReader<'a> {
    document: &'a ParsedDocument,
    store: &'a SymbolStore,
    /// Scope-opening and `use` declarations of the file by start position.
    declarations: HashMap<Position, Vec<&'a Declaration>>,
    comments: Comments,
    resolver: NameResolver,
    variables: VariableTable,
    root: Scope,
    open: Vec<Scope>,
    classes: Vec<ClassFrame<'a>>,
    hints: Vec<VarHint>,
    union_limit: usize,
}

impl<'a> ReferenceReader<'a> {
    pub fn new(document: &'a ParsedDocument, table: &'a SymbolTable, store: &'a SymbolStore) -> Self {
        let mut declarations: HashMap<Position, Vec<&'a Declaration>> = HashMap::new();
        for decl in table.symbols() {
            let wanted = (decl.kind.is_scope() || decl.has(SymbolModifiers::USE))
                && !decl.has(SymbolModifiers::MAGIC);
            if let Some(location) = decl.location.as_ref().filter(|_| wanted) {
                declarations.entry(location.range.start).or_default().push(decl);
            }
        }
        Self {
            document,
            store,
            declarations,
            comments: Comments::default(),
            resolver: NameResolver::new(),
            variables: VariableTable::new(),
            root: Scope::new(Location::new(document.uri(), document.document_range())),
            open: Vec::new(),
            classes: Vec::new(),
            hints: Vec::new(),
            union_limit: DEFAULT_UNION_LIMIT,
        }
    }

    pub fn with_union_limit(mut self, limit: usize) -> Self {
        self.union_limit = limit;
        self.variables = VariableTable::new().with_union_limit(limit);
        self
    }

    /// Read every statement of `program`.
    pub fn read(&mut self, program: &Program<'_>) {
        self.comments = Comments::new(program.trivia.as_slice());
        for statement in program.statements.iter() {
            self.statement(statement);
        }
    }

    /// Finish the walk and return the file's Reference Table.
    pub fn into_table(mut self) -> ReferenceTable {
        while !self.open.is_empty() {
            self.close_scope();
        }
        ReferenceTable::new(self.document.uri(), self.root)
    }

    // ─── Bookkeeping ────────────────────────────────────────────────────

    fn scope_mut(&mut self) -> &mut Scope {
        match self.open.last_mut() {
            Some(scope) => scope,
            None => &mut self.root,
        }
    }

    /// Append `reference` to the current scope and return its slot.
    fn emit(&mut self, reference: Reference) -> usize {
        trace!(kind = %reference.kind, name = %reference.name, ty = %reference.ty, "reference");
        let scope = self.scope_mut();
        scope.children.push(ReferenceNode::Reference(reference));
        scope.children.len() - 1
    }

    fn patch(&mut self, slot: usize, ty: &TypeDescriptor) {
        if let Some(ReferenceNode::Reference(reference)) = self.scope_mut().children.get_mut(slot) {
            reference.ty = ty.clone();
        }
    }

    fn location(&self, span: Span) -> Location {
        self.document.span_location(span)
    }

    fn text(&self, span: Span) -> &'a str {
        self.document.span_text(span)
    }

    fn merge(&self, a: &TypeDescriptor, b: &TypeDescriptor) -> TypeDescriptor {
        a.merge_with_limit(b, self.union_limit)
    }

    fn class_name(&self) -> &str {
        self.classes.last().map(|c| c.name.as_str()).unwrap_or("")
    }

    /// Fold of the types of every declaration `reference` resolves to.
    fn resolve(&self, reference: &Reference) -> TypeDescriptor {
        self.store
            .find_by_reference(reference, MemberMergeStrategy::Documented)
            .iter()
            .fold(TypeDescriptor::empty(), |acc, d| self.merge(&acc, &d.resolved_type()))
    }

    fn declaration_at<F>(&self, span: Span, predicate: F) -> Option<&'a Declaration>
    where
        F: Fn(&Declaration) -> bool,
    {
        let start = self.document.position_at(span.start.offset);
        self.declarations
            .get(&start)?
            .iter()
            .copied()
            .find(|d| predicate(d))
    }

    fn open_scope(&mut self, location: Location) {
        self.open.push(Scope::new(location));
    }

    fn close_scope(&mut self) {
        let Some(scope) = self.open.pop() else {
            return;
        };
        self.scope_mut().children.push(ReferenceNode::Scope(scope));
    }

    fn set_parameters(&mut self, decl: &Declaration) {
        for param in decl.children.iter().filter(|d| d.kind == SymbolKind::Parameter) {
            self.variables.set_variable(&param.name, param.resolved_type());
        }
    }

    /// Apply the `@var` tags of the doc comment before `span`; they also
    /// type the next assignment.
    fn read_var_doc(&mut self, span: Span) {
        self.hints.clear();
        let Some(block) = self.comments.doc_before(self.document.text(), span.start.offset) else {
            return;
        };
        let Some(doc) = PhpDoc::parse(block.text) else {
            return;
        };
        for tag in doc.var_tags() {
            let ty = TypeDescriptor::parse(&tag.type_string).resolve_names(&self.resolver);
            if ty.is_empty() {
                continue;
            }
            if !tag.name.is_empty() {
                self.variables.set_variable(&tag.name, ty.clone());
            }
            self.hints.push(VarHint {
                name: tag.name.clone(),
                ty,
            });
        }
    }

    // ─── Names ──────────────────────────────────────────────────────────

    /// Emit the reference a written name stands for and return its type.
    /// Language keywords (`int`, `true`, ...) yield a type but no
    /// reference.
    fn name(&mut self, written: &str, span: Span, kind: SymbolKind) -> TypeDescriptor {
        let lower = written.to_ascii_lowercase();
        let keyword = match kind {
            SymbolKind::Constant => matches!(lower.as_str(), "true" | "false" | "null"),
            SymbolKind::Class => type_string::is_keyword(written) && !is_relative_keyword(&lower),
            _ => false,
        };
        if keyword {
            return builtin_name_type(kind, written);
        }
        let (name, alt_name) = match kind {
            SymbolKind::Class | SymbolKind::Constructor if is_relative_keyword(&lower) => {
                (self.resolver.resolve_not_fully_qualified(written, kind), Some(lower))
            }
            SymbolKind::Function | SymbolKind::Constant => self.resolver.resolve_written(written, kind),
            _ => (self.resolver.resolve_written(written, kind).0, None),
        };
        let mut reference = Reference::new(kind, name, self.location(span));
        reference.alt_name = alt_name;
        reference.ty = self.store.type_of(&reference);
        let ty = reference.ty.clone();
        self.emit(reference);
        ty
    }

    /// `static` used as a class name: the enclosing class, remembered as
    /// written.
    fn relative_static(&mut self, span: Span) -> TypeDescriptor {
        let name = self.class_name().to_string();
        if name.is_empty() {
            return TypeDescriptor::empty();
        }
        let ty = TypeDescriptor::atomic(&name);
        let mut reference = Reference::new(SymbolKind::Class, name, self.location(span));
        reference.alt_name = Some("static".to_string());
        reference.ty = ty.clone();
        self.emit(reference);
        ty
    }

    /// The class named by the left side of `::`, `new` or `instanceof`.
    /// Returns `None` for dynamic class expressions.
    fn class_reference(&mut self, class: &Expression<'_>, kind: SymbolKind) -> Option<TypeDescriptor> {
        let ty = match class {
            Expression::Identifier(identifier) => {
                self.name(identifier.value(), identifier.span(), kind)
            }
            Expression::Self_(_) | Expression::Parent(_) => {
                self.name(self.text(class.span()), class.span(), kind)
            }
            Expression::Static(_) => self.relative_static(class.span()),
            _ => return None,
        };
        Some(ty)
    }

    fn member_reference(
        &mut self,
        kind: SymbolKind,
        name: String,
        span: Span,
        scope: &TypeDescriptor,
    ) -> TypeDescriptor {
        let mut reference = Reference::new(kind, name, self.location(span));
        reference.scope = Some(scope.to_string()).filter(|s| !s.is_empty());
        reference.ty = self.resolve(&reference);
        let ty = reference.ty.clone();
        self.emit(reference);
        ty
    }

    /// Header reference of a class-like member.
    fn member_header(&mut self, kind: SymbolKind, name: &str, span: Span) {
        let mut reference = Reference::new(kind, name, self.location(span));
        reference.scope = Some(self.class_name().to_string()).filter(|s| !s.is_empty());
        reference.ty = self.store.type_of(&reference);
        self.emit(reference);
    }

    /// Header reference of a namespaced declaration.
    fn header(&mut self, kind: SymbolKind, name: &str, span: Span) {
        let mut reference = Reference::new(kind, self.resolver.resolve_relative(name), self.location(span));
        reference.ty = self.store.type_of(&reference);
        self.emit(reference);
    }

    /// Emit the class names of a type hint and return the hinted type.
    fn hint(&mut self, hint: &Hint<'_>) -> TypeDescriptor {
        match hint {
            Hint::Identifier(identifier) => {
                self.name(identifier.value(), identifier.span(), SymbolKind::Class)
            }
            Hint::Nullable(nullable) => {
                let ty = self.hint(nullable.hint);
                self.merge(&ty, &TypeDescriptor::atomic("null"))
            }
            Hint::Union(union) => {
                let left = self.hint(union.left);
                let right = self.hint(union.right);
                self.merge(&left, &right)
            }
            Hint::Intersection(intersection) => {
                let left = self.hint(intersection.left);
                let right = self.hint(intersection.right);
                self.merge(&left, &right)
            }
            Hint::Parenthesized(inner) => self.hint(inner.hint),
            Hint::Self_(_) | Hint::Parent(_) => TypeDescriptor::atomic(
                self.resolver
                    .resolve_not_fully_qualified(self.text(hint.span()), SymbolKind::Class),
            ),
            _ => TypeDescriptor::parse(self.text(hint.span())),
        }
    }

    fn optional_hint(&mut self, hint: Option<&Hint<'_>>) {
        if let Some(hint) = hint {
            self.hint(hint);
        }
    }

    // ─── Statements ─────────────────────────────────────────────────────

    fn node(&mut self, node: Node<'_>) {
        match node {
            Node::Statement(statement) => self.statement(statement),
            Node::Member(member) => self.member(member),
            Node::Expression(expression) => {
                self.expression(expression);
            }
        }
    }

    /// Read the children of a construct the reader does not model.
    fn children(&mut self, node: Node<'_>) {
        for child in node.children() {
            self.node(child);
        }
    }

    fn statements<'s, 'n: 's>(&mut self, statements: impl IntoIterator<Item = &'s Statement<'n>>) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement<'_>) {
        self.read_var_doc(statement.span());
        match statement {
            Statement::Namespace(namespace) => self.namespace(namespace),
            Statement::Use(r#use) => self.use_statement(&r#use.items),
            Statement::Class(class) => {
                self.enter_class_like(class.span());
                self.header(SymbolKind::Class, class.name.value, class.name.span());
                if let Some(extends) = &class.extends {
                    self.names(extends.types.iter(), SymbolKind::Class);
                }
                if let Some(implements) = &class.implements {
                    self.names(implements.types.iter(), SymbolKind::Class);
                }
                self.members(class.members.iter());
                self.leave_class_like();
            }
            Statement::Interface(interface) => {
                self.enter_class_like(interface.span());
                self.header(SymbolKind::Interface, interface.name.value, interface.name.span());
                if let Some(extends) = &interface.extends {
                    self.names(extends.types.iter(), SymbolKind::Class);
                }
                self.members(interface.members.iter());
                self.leave_class_like();
            }
            Statement::Trait(r#trait) => {
                self.enter_class_like(r#trait.span());
                self.header(SymbolKind::Trait, r#trait.name.value, r#trait.name.span());
                self.members(r#trait.members.iter());
                self.leave_class_like();
            }
            Statement::Enum(r#enum) => {
                self.enter_class_like(r#enum.span());
                self.header(SymbolKind::Class, r#enum.name.value, r#enum.name.span());
                if let Some(implements) = &r#enum.implements {
                    self.names(implements.types.iter(), SymbolKind::Class);
                }
                self.members(r#enum.members.iter());
                self.leave_class_like();
            }
            Statement::Function(function) => self.function(function),
            Statement::Constant(constant) => {
                for item in constant.items.iter() {
                    self.header(SymbolKind::Constant, item.name.value, item.name.span());
                    self.expression(item.value);
                }
            }
            Statement::If(r#if) => self.if_statement(r#if),
            Statement::Switch(switch) => self.switch_statement(switch),
            Statement::Foreach(foreach) => self.foreach_statement(foreach),
            Statement::Try(r#try) => self.try_statement(r#try),
            Statement::Global(global) => {
                for variable in global.variables.iter() {
                    if let Variable::Direct(variable) = variable {
                        self.variable(variable);
                    }
                }
            }
            Statement::Static(r#static) => {
                for item in r#static.items.iter() {
                    self.variable(item.variable());
                }
            }
            _ => self.children(Node::Statement(statement)),
        }
        self.hints.clear();
    }

    fn names<'s, 'n: 's>(&mut self, names: impl IntoIterator<Item = &'s Identifier<'n>>, kind: SymbolKind) {
        for name in names {
            self.name(name.value(), name.span(), kind);
        }
    }

    fn namespace(&mut self, namespace: &Namespace<'_>) {
        let span = namespace.span();
        let name = self
            .declaration_at(span, |d| d.kind == SymbolKind::Namespace)
            .map(|d| d.name.clone())
            .unwrap_or_default();
        self.resolver.set_namespace(name.clone());

        // an unbraced namespace runs to the end of its last statement
        let end = namespace
            .statements()
            .iter()
            .last()
            .map_or(span.end.offset, |last| last.span().end.offset.max(span.end.offset));
        let range = Range::new(
            self.document.position_at(span.start.offset),
            self.document.position_at(end),
        );
        self.open_scope(Location::new(self.document.uri(), range));
        if let Some(identifier) = &namespace.name {
            let location = self.location(identifier.span());
            self.emit(Reference::new(SymbolKind::Namespace, name, location));
        }
        self.statements(namespace.statements().iter());
        self.close_scope();
    }

    fn use_statement(&mut self, items: &UseItems<'_>) {
        for item in use_items(items) {
            let Some(decl) = self.declaration_at(item.span(), |d| d.has(SymbolModifiers::USE)) else {
                continue;
            };
            if let Some(rule) = ImportRule::from_declaration(decl) {
                self.resolver.push_rule(rule);
            }
            if let Some(target) = decl.associated.first() {
                let mut reference =
                    Reference::new(target.kind, target.name.clone(), self.location(item.name.span()));
                reference.ty = self.store.type_of(&reference);
                self.emit(reference);
            }
        }
    }

    fn if_statement(&mut self, r#if: &If<'_>) {
        self.variables.push_branch();
        self.expression(r#if.condition);
        let exhaustive = match &r#if.body {
            IfBody::Statement(body) => {
                self.statement(body.statement);
                for clause in body.else_if_clauses.iter() {
                    self.next_branch();
                    self.expression(clause.condition);
                    self.statement(clause.statement);
                }
                if let Some(clause) = &body.else_clause {
                    self.next_branch();
                    self.statement(clause.statement);
                }
                body.else_clause.is_some()
            }
            IfBody::ColonDelimited(body) => {
                self.statements(body.statements.iter());
                for clause in body.else_if_clauses.iter() {
                    self.next_branch();
                    self.expression(clause.condition);
                    self.statements(clause.statements.iter());
                }
                if let Some(clause) = &body.else_clause {
                    self.next_branch();
                    self.statements(clause.statements.iter());
                }
                body.else_clause.is_some()
            }
        };
        self.variables.pop_branch();
        self.variables.prune_branches(exhaustive);
    }

    fn next_branch(&mut self) {
        self.variables.pop_branch();
        self.variables.push_branch();
    }

    fn switch_statement(&mut self, switch: &Switch<'_>) {
        self.expression(switch.expression);
        let cases = match &switch.body {
            SwitchBody::BraceDelimited(body) => &body.cases,
            SwitchBody::ColonDelimited(body) => &body.cases,
        };
        let mut exhaustive = false;
        for case in cases.iter() {
            self.variables.push_branch();
            if let SwitchCase::Expression(case) = case {
                self.expression(case.expression);
            } else {
                exhaustive = true;
            }
            self.statements(case.statements().iter());
            self.variables.pop_branch();
        }
        self.variables.prune_branches(exhaustive);
    }

    fn foreach_statement(&mut self, foreach: &Foreach<'_>) {
        let hints = std::mem::take(&mut self.hints);
        let element = self.expression(foreach.expression).array_unwrap();
        if let Some(key) = foreach.target.key() {
            self.expression(key);
        }
        let targets = self.targets(foreach.target.value());
        for variable in targets {
            let ty = hints
                .iter()
                .find(|h| h.name == variable.name)
                .map(|h| h.ty.clone())
                .unwrap_or_else(|| variable.base_type(&element));
            self.variables.set_variable(&variable.name, ty.clone());
            if let Some(slot) = variable.slot {
                self.patch(slot, &ty);
            }
        }
        self.statements(foreach.body.statements());
    }

    fn try_statement(&mut self, r#try: &Try<'_>) {
        self.statements(r#try.block.statements.iter());
        for catch in r#try.catch_clauses.iter() {
            let ty = self.hint(&catch.hint);
            if let Some(variable) = &catch.variable {
                let mut reference =
                    Reference::new(SymbolKind::Variable, variable.name, self.location(variable.span()));
                reference.ty = ty.clone();
                self.variables.set_variable(variable.name, ty);
                self.emit(reference);
            }
            self.statements(catch.block.statements.iter());
        }
        if let Some(finally) = &r#try.finally_clause {
            self.statements(finally.block.statements.iter());
        }
    }

    // ─── Declarations ───────────────────────────────────────────────────

    fn enter_class_like(&mut self, span: Span) {
        let decl = self.declaration_at(span, |d| d.kind.is_class_like());
        let name = decl.map(|d| d.name.clone()).unwrap_or_default();
        self.resolver
            .push_class(decl.map(ClassContext::from_declaration).unwrap_or_default());
        self.classes.push(ClassFrame {
            name: name.clone(),
            aggregate: decl.map(|d| TypeAggregate::new(self.store, d)),
        });
        self.open_scope(self.location(span));
        self.variables.push_scope::<&str>(&[]);
        self.variables.set_variable("$this", TypeDescriptor::atomic(&name));
    }

    fn leave_class_like(&mut self) {
        self.classes.pop();
        self.resolver.pop_class();
        self.variables.pop_scope();
        self.close_scope();
    }

    fn members<'m, 'n: 'm>(&mut self, members: impl IntoIterator<Item = &'m ClassLikeMember<'n>>) {
        for member in members {
            self.member(member);
        }
    }

    fn member(&mut self, member: &ClassLikeMember<'_>) {
        match member {
            ClassLikeMember::Method(method) => self.method(method, member.span()),
            ClassLikeMember::Property(property) => {
                self.optional_hint(property.hint());
                let items: Vec<&PropertyItem<'_>> = match property {
                    Property::Plain(plain) => plain.items.iter().collect(),
                    Property::Hooked(hooked) => vec![&hooked.item],
                };
                for item in items {
                    let variable = item.variable();
                    self.member_header(SymbolKind::Property, variable.name, variable.span());
                    if let PropertyItem::Concrete(concrete) = item {
                        self.expression(&concrete.value);
                    }
                }
            }
            ClassLikeMember::Constant(constant) => {
                self.optional_hint(constant.hint.as_ref());
                for item in constant.items.iter() {
                    self.member_header(SymbolKind::ClassConstant, item.name.value, item.name.span());
                    self.expression(item.value);
                }
            }
            ClassLikeMember::EnumCase(case) => {
                let name = case.item.name();
                self.member_header(SymbolKind::ClassConstant, name.value, name.span());
            }
            ClassLikeMember::TraitUse(trait_use) => {
                self.names(trait_use.trait_names.iter(), SymbolKind::Class);
            }
        }
    }

    fn parameters(&mut self, list: &FunctionLikeParameterList<'_>) {
        for param in list.parameters.iter() {
            self.optional_hint(param.hint.as_ref());
            let name = param.variable.name;
            let mut reference = Reference::new(SymbolKind::Parameter, name, self.location(param.variable.span()));
            reference.ty = self.variables.get_type(name).unwrap_or_default();
            self.emit(reference);
            if let Some(default) = &param.default_value {
                self.expression(&default.value);
            }
        }
    }

    fn function(&mut self, function: &Function<'_>) {
        self.open_scope(self.location(function.span()));
        self.variables.push_scope::<&str>(&[]);
        let decl = self.declaration_at(function.span(), |d| {
            d.kind == SymbolKind::Function && !d.has(SymbolModifiers::ANONYMOUS)
        });
        if let Some(decl) = decl {
            self.set_parameters(decl);
        }
        self.header(SymbolKind::Function, function.name.value, function.name.span());
        self.parameters(&function.parameter_list);
        self.optional_hint(function.return_type_hint.as_ref().map(|r| &r.hint));
        self.statements(function.body.statements.iter());
        self.variables.pop_scope();
        self.close_scope();
    }

    fn method(&mut self, method: &Method<'_>, span: Span) {
        self.open_scope(self.location(span));
        self.variables.push_scope(&["$this"]);
        if let Some(decl) = self.declaration_at(span, |d| d.kind == SymbolKind::Method) {
            let documented = self.classes.last().and_then(|frame| {
                frame
                    .aggregate
                    .as_ref()?
                    .members(MemberMergeStrategy::Documented, |d| {
                        d.kind == SymbolKind::Method && d.name.eq_ignore_ascii_case(&decl.name)
                    })
                    .into_iter()
                    .next()
            });
            match documented {
                Some(member) => self.set_parameters(&member),
                None => self.set_parameters(decl),
            }
        }
        self.member_header(SymbolKind::Method, method.name.value, method.name.span());
        self.parameters(&method.parameter_list);
        self.optional_hint(method.return_type_hint.as_ref().map(|r| &r.hint));
        if let MethodBody::Concrete(block) = &method.body {
            self.statements(block.statements.iter());
        }
        self.variables.pop_scope();
        self.close_scope();
    }

    fn closure(&mut self, closure: &Closure<'_>) -> TypeDescriptor {
        let span = closure.span();
        let decl = self.declaration_at(span, |d| {
            d.kind == SymbolKind::Function && d.has(SymbolModifiers::ANONYMOUS)
        });
        let mut carry = vec!["$this".to_string()];
        if let Some(use_clause) = &closure.use_clause {
            carry.extend(use_clause.variables.iter().map(|v| v.variable.name.to_string()));
        }
        self.variables.push_scope(&carry);
        self.open_scope(self.location(span));
        if let Some(decl) = decl {
            self.set_parameters(decl);
        }
        self.parameters(&closure.parameter_list);
        if let Some(use_clause) = &closure.use_clause {
            for used in use_clause.variables.iter() {
                self.variable(&used.variable);
            }
        }
        self.optional_hint(closure.return_type_hint.as_ref().map(|r| &r.hint));
        self.statements(closure.body.statements.iter());
        self.variables.pop_scope();
        self.close_scope();
        TypeDescriptor::atomic("Closure")
    }

    fn arrow_function(&mut self, arrow: &ArrowFunction<'_>) -> TypeDescriptor {
        let span = arrow.span();
        let decl = self.declaration_at(span, |d| {
            d.kind == SymbolKind::Function && d.has(SymbolModifiers::ANONYMOUS)
        });
        self.variables.push_scope_with_all();
        self.open_scope(self.location(span));
        if let Some(decl) = decl {
            self.set_parameters(decl);
        }
        self.parameters(&arrow.parameter_list);
        self.optional_hint(arrow.return_type_hint.as_ref().map(|r| &r.hint));
        self.expression(arrow.expression);
        self.variables.pop_scope();
        self.close_scope();
        TypeDescriptor::atomic("Closure")
    }

    fn anonymous_class(&mut self, class: &AnonymousClass<'_>) -> TypeDescriptor {
        if let Some(arguments) = &class.argument_list {
            self.arguments(arguments);
        }
        self.enter_class_like(class.span());
        let ty = TypeDescriptor::atomic(self.class_name());
        if let Some(extends) = &class.extends {
            self.names(extends.types.iter(), SymbolKind::Class);
        }
        if let Some(implements) = &class.implements {
            self.names(implements.types.iter(), SymbolKind::Class);
        }
        self.members(class.members.iter());
        self.leave_class_like();
        ty
    }

    // ─── Expressions ────────────────────────────────────────────────────

    fn arguments(&mut self, list: &ArgumentList<'_>) {
        for argument in list.arguments.iter() {
            self.expression(argument_value(argument));
        }
    }

    /// Emit a variable read and return its current type with its slot.
    fn variable(&mut self, variable: &DirectVariable<'_>) -> (TypeDescriptor, usize) {
        let ty = self.variables.get_type(variable.name).unwrap_or_default();
        let mut reference = Reference::new(SymbolKind::Variable, variable.name, self.location(variable.span()));
        reference.ty = ty.clone();
        (ty, self.emit(reference))
    }

    /// Read the type of `expression`, emitting the references inside it.
    fn expression(&mut self, expression: &Expression<'_>) -> TypeDescriptor {
        match expression {
            Expression::Literal(_) => literal_type(self.text(expression.span())),
            Expression::CompositeString(_) => {
                self.children(Node::Expression(expression));
                TypeDescriptor::atomic("string")
            }
            Expression::Variable(Variable::Direct(variable)) => self.variable(variable).0,
            Expression::Identifier(identifier) => {
                self.name(identifier.value(), identifier.span(), SymbolKind::Constant)
            }
            Expression::ConstantAccess(access) => {
                self.name(access.name.value(), access.name.span(), SymbolKind::Constant)
            }
            Expression::Self_(_) | Expression::Parent(_) | Expression::Static(_) => self
                .class_reference(expression, SymbolKind::Class)
                .unwrap_or_default(),
            Expression::Parenthesized(inner) => self.expression(inner.expression),
            Expression::Assignment(assignment) => self.assignment(assignment),
            Expression::Binary(binary) => self.binary(binary),
            Expression::UnaryPrefix(unary) => {
                let operand = self.expression(unary.operand);
                let operator = self.text(unary.operator.span()).trim();
                match cast_type(operator) {
                    Some(name) => TypeDescriptor::atomic(name),
                    None if operator == "!" => TypeDescriptor::atomic("bool"),
                    None if operator == "~" => TypeDescriptor::atomic("int"),
                    None => operand,
                }
            }
            Expression::UnaryPostfix(unary) => self.expression(unary.operand),
            Expression::Conditional(conditional) => {
                let condition = self.expression(conditional.condition);
                let then = match conditional.then {
                    Some(then) => self.expression(then),
                    None => condition,
                };
                let otherwise = self.expression(conditional.r#else);
                self.merge(&then, &otherwise)
            }
            Expression::Array(array) => self.array(array.elements.iter()),
            Expression::LegacyArray(array) => self.array(array.elements.iter()),
            Expression::ArrayAccess(access) => {
                let ty = self.expression(access.array).array_unwrap();
                self.expression(access.index);
                ty
            }
            Expression::Closure(closure) => self.closure(closure),
            Expression::ArrowFunction(arrow) => self.arrow_function(arrow),
            Expression::AnonymousClass(class) => self.anonymous_class(class),
            Expression::Call(call) => self.call(call),
            Expression::Access(access) => self.access(access),
            Expression::Instantiation(instantiation) => {
                let ty = match self.class_reference(instantiation.class, SymbolKind::Constructor) {
                    Some(ty) => ty,
                    None => {
                        self.expression(instantiation.class);
                        TypeDescriptor::empty()
                    }
                };
                if let Some(arguments) = &instantiation.argument_list {
                    self.arguments(arguments);
                }
                ty
            }
            Expression::Match(r#match) => self.match_expression(r#match),
            Expression::Clone(clone) => self.expression(clone.object),
            Expression::Construct(Construct::Isset(_) | Construct::Empty(_)) => {
                self.children(Node::Expression(expression));
                TypeDescriptor::atomic("bool")
            }
            _ => {
                self.children(Node::Expression(expression));
                TypeDescriptor::empty()
            }
        }
    }

    fn binary(&mut self, binary: &Binary<'_>) -> TypeDescriptor {
        if binary.operator.is_instanceof() {
            return self.instanceof(binary);
        }
        let left = self.expression(binary.lhs);
        let right = self.expression(binary.rhs);
        if binary.operator.is_null_coalesce() {
            return self.merge(&left, &right);
        }
        operator_type(self.text(binary.operator.span()))
            .map(TypeDescriptor::atomic)
            .unwrap_or_default()
    }

    /// `$x instanceof Foo` narrows `$x` to `Foo` from here on.
    fn instanceof(&mut self, binary: &Binary<'_>) -> TypeDescriptor {
        let narrowed = match binary.lhs {
            Expression::Variable(Variable::Direct(variable)) => {
                self.variable(variable);
                Some(variable.name)
            }
            other => {
                self.expression(other);
                None
            }
        };
        let ty = match self.class_reference(binary.rhs, SymbolKind::Class) {
            Some(ty) => ty,
            None => {
                self.expression(binary.rhs);
                TypeDescriptor::empty()
            }
        };
        if let Some(name) = narrowed
            && !ty.is_empty()
        {
            self.variables.set_variable(name, ty);
        }
        TypeDescriptor::atomic("bool")
    }

    /// Element types of the first three valued elements decide the array
    /// type; wider mixes degrade to `mixed[]`.
    fn array<'e, 'n: 'e>(&mut self, elements: impl IntoIterator<Item = &'e ArrayElement<'n>>) -> TypeDescriptor {
        let mut samples: Vec<TypeDescriptor> = Vec::new();
        for element in elements {
            let ty = match element {
                ArrayElement::KeyValue(pair) => {
                    self.expression(pair.key);
                    self.expression(pair.value)
                }
                ArrayElement::Value(value) => self.expression(value.value),
                ArrayElement::Variadic(variadic) => self.expression(variadic.value).array_unwrap(),
                ArrayElement::Missing(_) => continue,
            };
            if samples.len() < 3 && !ty.is_empty() {
                samples.push(ty);
            }
        }
        let merged = samples
            .iter()
            .fold(TypeDescriptor::empty(), |acc, t| self.merge(&acc, t));
        if merged.is_empty() {
            TypeDescriptor::atomic("array")
        } else if merged.is_mixed() || merged.atoms().len() >= 3 {
            TypeDescriptor::mixed().array_wrap()
        } else {
            merged.array_wrap()
        }
    }

    /// A `match` is the union of its arms; each arm is a branch.
    fn match_expression(&mut self, r#match: &Match<'_>) -> TypeDescriptor {
        self.expression(r#match.expression);
        let mut ty = TypeDescriptor::empty();
        let mut exhaustive = false;
        for arm in r#match.arms.iter() {
            self.variables.push_branch();
            if let MatchArm::Expression(arm) = arm {
                for condition in arm.conditions.iter() {
                    self.expression(condition);
                }
            } else {
                exhaustive = true;
            }
            let arm_ty = self.expression(arm.expression());
            ty = self.merge(&ty, &arm_ty);
            self.variables.pop_branch();
        }
        self.variables.prune_branches(exhaustive);
        ty
    }

    fn call(&mut self, call: &Call<'_>) -> TypeDescriptor {
        match call {
            Call::Function(call) => {
                let ty = match call.function {
                    Expression::Identifier(identifier) => {
                        self.name(identifier.value(), identifier.span(), SymbolKind::Function)
                    }
                    callee => {
                        self.expression(callee);
                        TypeDescriptor::empty()
                    }
                };
                self.arguments(&call.argument_list);
                ty
            }
            Call::Method(call) => {
                let object = self.expression(call.object);
                let ty = self.selected_member(SymbolKind::Method, &call.method, &object);
                self.arguments(&call.argument_list);
                ty
            }
            Call::NullSafeMethod(call) => {
                let object = self.expression(call.object);
                let ty = self.selected_member(SymbolKind::Method, &call.method, &object);
                self.arguments(&call.argument_list);
                ty
            }
            Call::StaticMethod(call) => {
                let class = self.class_scope(call.class);
                let ty = self.selected_member(SymbolKind::Method, &call.method, &class);
                self.arguments(&call.argument_list);
                ty
            }
        }
    }

    /// Type of the left side of `::`.
    fn class_scope(&mut self, class: &Expression<'_>) -> TypeDescriptor {
        match self.class_reference(class, SymbolKind::Class) {
            Some(ty) => ty,
            None => self.expression(class),
        }
    }

    fn selected_member(
        &mut self,
        kind: SymbolKind,
        selector: &ClassLikeMemberSelector<'_>,
        scope: &TypeDescriptor,
    ) -> TypeDescriptor {
        let ClassLikeMemberSelector::Identifier(identifier) = selector else {
            return TypeDescriptor::empty();
        };
        let name = match kind {
            SymbolKind::Property => format!("${}", identifier.value),
            _ => identifier.value.to_string(),
        };
        self.member_reference(kind, name, identifier.span(), scope)
    }

    fn access(&mut self, access: &Access<'_>) -> TypeDescriptor {
        match access {
            Access::Property(access) => {
                let object = self.expression(access.object);
                self.selected_member(SymbolKind::Property, &access.property, &object)
            }
            Access::NullSafeProperty(access) => {
                let object = self.expression(access.object);
                self.selected_member(SymbolKind::Property, &access.property, &object)
            }
            Access::StaticProperty(access) => {
                let class = self.class_scope(access.class);
                match &access.property {
                    Variable::Direct(variable) => self.member_reference(
                        SymbolKind::Property,
                        variable.name.to_string(),
                        variable.span(),
                        &class,
                    ),
                    _ => TypeDescriptor::empty(),
                }
            }
            Access::ClassConstant(access) => {
                let class = self.class_scope(access.class);
                let ClassLikeConstantSelector::Identifier(identifier) = &access.constant else {
                    return TypeDescriptor::empty();
                };
                if identifier.value.eq_ignore_ascii_case("class") {
                    return TypeDescriptor::atomic("string");
                }
                self.member_reference(
                    SymbolKind::ClassConstant,
                    identifier.value.to_string(),
                    identifier.span(),
                    &class,
                )
            }
        }
    }

    // ─── Assignment ─────────────────────────────────────────────────────

    fn assignment(&mut self, assignment: &Assignment<'_>) -> TypeDescriptor {
        let hints = std::mem::take(&mut self.hints);
        if !assignment.operator.is_assign() {
            let target = self.expression(assignment.lhs);
            self.expression(assignment.rhs);
            return match self.text(assignment.operator.span()) {
                ".=" => TypeDescriptor::atomic("string"),
                _ => target,
            };
        }
        let targets = self.targets(assignment.lhs);
        let ty = self.expression(assignment.rhs);
        let single = targets.len() == 1;
        for variable in targets {
            let hinted = hints
                .iter()
                .find(|h| h.name == variable.name || (single && h.name.is_empty()))
                .map(|h| h.ty.clone());
            let assigned = hinted.unwrap_or_else(|| variable.base_type(&ty));
            self.variables.set_variable(&variable.name, assigned.clone());
            if let Some(slot) = variable.slot
                && !assigned.is_empty()
            {
                self.patch(slot, &assigned);
            }
        }
        ty
    }

    /// Variables written by an assignment target.  Targets that are not
    /// variables (properties, static members) are read as expressions.
    fn targets(&mut self, target: &Expression<'_>) -> Vec<Target> {
        match target {
            Expression::Variable(Variable::Direct(variable)) => {
                let (_, slot) = self.variable(variable);
                vec![Target {
                    name: variable.name.to_string(),
                    depth: 0,
                    slot: Some(slot),
                }]
            }
            Expression::ArrayAccess(access) => {
                let variables = self.targets(access.array);
                self.expression(access.index);
                variables.into_iter().take(1).map(|v| v.nested(1)).collect()
            }
            Expression::ArrayAppend(append) => {
                let variables = self.targets(append.array);
                variables.into_iter().take(1).map(|v| v.nested(1)).collect()
            }
            Expression::List(list) => self.destructure(list.elements.iter()),
            Expression::Array(array) => self.destructure(array.elements.iter()),
            Expression::LegacyArray(array) => self.destructure(array.elements.iter()),
            Expression::Parenthesized(inner) => self.targets(inner.expression),
            other => {
                self.expression(other);
                Vec::new()
            }
        }
    }

    fn destructure<'e, 'n: 'e>(&mut self, elements: impl IntoIterator<Item = &'e ArrayElement<'n>>) -> Vec<Target> {
        let mut variables = Vec::new();
        for element in elements {
            let value = match element {
                ArrayElement::KeyValue(pair) => {
                    self.expression(pair.key);
                    pair.value
                }
                ArrayElement::Value(value) => value.value,
                ArrayElement::Variadic(variadic) => variadic.value,
                ArrayElement::Missing(_) => continue,
            };
            variables.extend(self.targets(value).into_iter().map(|v| v.nested(-1)));
        }
        variables
    }
}

fn is_relative_keyword(lower: &str) -> bool {
    matches!(lower, "self" | "parent" | "static")
}
