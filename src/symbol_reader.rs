//! Declaration reader.
//!
//! Walks the program of one [`ParsedDocument`] and builds its Declaration
//! Tree: a `File` declaration whose children are the namespaces, imports,
//! class-likes, functions, constants and variables declared in the file.
//!
//! The reader keeps a stack of open frames, one per declaration that can
//! own children (file, namespace, class-like, function, method, closure).
//! Leaf declarations are added to the innermost frame as they are met;
//! a frame is closed, scoped and handed to its parent when the walk leaves
//! the node that opened it.
//!
//! Name resolution happens during the walk: namespace definitions and
//! `use` statements update the [`NameResolver`] as they are read, so a
//! name is resolved against exactly the imports visible where it is
//! written.

use std::collections::HashSet;

use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;
use tracing::debug;

use crate::docblock::{PhpDoc, TagKind};
use crate::name_resolver::{ClassContext, ImportRule, NameResolver};
use crate::syntax::walk::{self, Node, Visitor, argument_value};
use crate::syntax::{Comments, ParsedDocument};
use crate::type_string::{self, TypeDescriptor};
use crate::types::{Declaration, HashedLocation, SymbolDoc, SymbolKind, SymbolModifiers};

/// Variables PHP defines in every scope; they never become declarations.
pub const SUPERGLOBALS: &[&str] = &[
    "$GLOBALS",
    "$_SERVER",
    "$_GET",
    "$_POST",
    "$_FILES",
    "$_REQUEST",
    "$_SESSION",
    "$_ENV",
    "$_COOKIE",
    "$php_errormsg",
    "$HTTP_RAW_POST_DATA",
    "$http_response_header",
    "$argc",
    "$argv",
    "$this",
];

/// Build the Declaration Tree of `document`.
pub fn read_declarations(document: &ParsedDocument) -> Declaration {
    let file = document
        .with_program(|program| {
            let mut reader = SymbolReader::new(document, Comments::new(program.trivia.as_slice()));
            walk::walk(program.statements.iter(), &mut reader);
            reader.into_declaration()
        })
        .unwrap_or_else(|| SymbolReader::file_declaration(document));
    debug!(
        uri = document.uri(),
        declarations = file.descendants().len(),
        "read declarations"
    );
    file
}

/// A doc comment and where it sits.
#[derive(Debug)]
struct DocComment {
    doc: PhpDoc,
    location: HashedLocation,
}

/// Children of a scope, with variables and parameters kept unique by name.
#[derive(Debug)]
struct UniqueSymbols {
    symbols: Vec<Declaration>,
    seen: HashSet<String>,
}

impl UniqueSymbols {
    fn new() -> Self {
        Self {
            symbols: Vec::new(),
            seen: SUPERGLOBALS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn push(&mut self, decl: Declaration) {
        match decl.kind {
            SymbolKind::Variable | SymbolKind::Parameter => {
                if decl.name.is_empty() || !self.seen.insert(decl.name.clone()) {
                    return;
                }
            }
            SymbolKind::Constant if decl.name.is_empty() => return,
            _ => {}
        }
        self.symbols.push(decl);
    }
}

/// A declaration that is still collecting children.
#[derive(Debug)]
struct Frame {
    decl: Declaration,
    children: UniqueSymbols,
}

impl Frame {
    fn new(decl: Declaration) -> Self {
        Self {
            decl,
            children: UniqueSymbols::new(),
        }
    }

    fn finish(self) -> Declaration {
        let Frame { mut decl, children } = self;
        decl.children = match decl.kind {
            SymbolKind::File | SymbolKind::Namespace => children.symbols,
            _ => {
                let scope = decl.name.clone();
                children
                    .symbols
                    .into_iter()
                    .map(|child| with_scope(child, &scope))
                    .collect()
            }
        };
        decl
    }
}

// ─── Documentation ──────────────────────────────────────────────────────────

fn doc_type(text: &str, resolver: &NameResolver) -> TypeDescriptor {
    TypeDescriptor::parse(text).resolve_names(resolver)
}

fn apply_element_doc(decl: &mut Declaration, doc: &DocComment, resolver: &NameResolver) {
    let tag = match decl.kind {
        SymbolKind::Parameter => doc.doc.find_param_tag(&decl.name),
        _ => doc.doc.find_var_tag(&decl.name),
    };
    if let Some(tag) = tag {
        decl.doc = Some(SymbolDoc::new(
            tag.description.clone(),
            doc_type(&tag.type_string, resolver),
        ));
    }
}

/// `@property*` and `@method` tags of a class doc comment.
fn magic_members(doc: &DocComment, resolver: &NameResolver) -> Vec<Declaration> {
    let mut members = Vec::new();
    for tag in doc.doc.property_tags() {
        let mut modifiers = SymbolModifiers::MAGIC | SymbolModifiers::PUBLIC;
        match tag.kind {
            TagKind::PropertyRead => modifiers |= SymbolModifiers::READ_ONLY,
            TagKind::PropertyWrite => modifiers |= SymbolModifiers::WRITE_ONLY,
            _ => {}
        }
        let mut property = Declaration::new(SymbolKind::Property, tag.name.clone())
            .with_modifiers(modifiers)
            .with_location(doc.location);
        property.doc = Some(SymbolDoc::new(
            tag.description.clone(),
            doc_type(&tag.type_string, resolver),
        ));
        members.push(property);
    }
    for tag in doc.doc.method_tags() {
        let mut modifiers = SymbolModifiers::MAGIC | SymbolModifiers::PUBLIC;
        if tag.is_static {
            modifiers |= SymbolModifiers::STATIC;
        }
        let mut method = Declaration::new(SymbolKind::Method, tag.name.clone())
            .with_modifiers(modifiers)
            .with_location(doc.location);
        method.doc = Some(SymbolDoc::new(
            tag.description.clone(),
            doc_type(&tag.type_string, resolver),
        ));
        method.children = tag
            .parameters
            .iter()
            .map(|p| {
                let mut parameter = Declaration::new(SymbolKind::Parameter, p.name.clone())
                    .with_modifiers(SymbolModifiers::MAGIC)
                    .with_location(doc.location);
                parameter.doc = Some(SymbolDoc::new("", doc_type(&p.type_string, resolver)));
                parameter.scope = Some(tag.name.clone());
                parameter
            })
            .collect();
        members.push(method);
    }
    members
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Set the owning scope of a child declaration.  Named class-likes and
/// functions declared inside a function body keep their global identity.
fn with_scope(mut decl: Declaration, scope: &str) -> Declaration {
    let global = (decl.kind.is_class_like() || decl.kind == SymbolKind::Function)
        && !decl.has(SymbolModifiers::ANONYMOUS);
    if !global {
        decl.scope = Some(scope.to_string());
    }
    decl
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    if text.len() >= 2 && (text.starts_with('\'') || text.starts_with('"')) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// The type of a constant initialised with `value`, when it is a literal.
pub(crate) fn literal_type(value: &str) -> TypeDescriptor {
    let value = value.trim();
    let unsigned = value.trim_start_matches(['-', '+']);
    let name = match value.to_ascii_lowercase().as_str() {
        "true" | "false" => "bool",
        "null" => "null",
        _ if value.starts_with(['\'', '"']) || value.starts_with("<<<") => "string",
        _ if unsigned.starts_with(|c: char| c.is_ascii_digit()) => {
            let lower = unsigned.to_ascii_lowercase();
            let is_radix = lower.starts_with("0x") || lower.starts_with("0b");
            if !is_radix && (lower.contains('.') || lower.contains('e')) {
                "float"
            } else if unsigned.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                "int"
            } else {
                return TypeDescriptor::empty();
            }
        }
        _ if value.starts_with('[') || value.to_ascii_lowercase().starts_with("array(") => "array",
        _ => return TypeDescriptor::empty(),
    };
    TypeDescriptor::atomic(name)
}

/// Whether entering `node` opens a frame.  `leave` relies on the answer
/// being the same on the way out.
fn opens_frame(node: Node<'_>) -> bool {
    match node {
        Node::Statement(statement) => matches!(
            statement,
            Statement::Namespace(_)
                | Statement::Class(_)
                | Statement::Interface(_)
                | Statement::Trait(_)
                | Statement::Enum(_)
                | Statement::Function(_)
        ),
        Node::Member(member) => matches!(member, ClassLikeMember::Method(_)),
        Node::Expression(expression) => matches!(
            expression,
            Expression::Closure(_) | Expression::ArrowFunction(_) | Expression::AnonymousClass(_)
        ),
    }
}

/// `define('NAME', value)` calls: the callee is the bare `define` function.
fn define_call<'a>(call: &'a FunctionCall<'a>) -> Option<&'a ArgumentList<'a>> {
    let Expression::Identifier(identifier) = call.function else {
        return None;
    };
    identifier
        .value()
        .trim_start_matches('\\')
        .eq_ignore_ascii_case("define")
        .then_some(&call.argument_list)
}

// ─── Reader ─────────────────────────────────────────────────────────────────

/// The visitor producing a Declaration Tree.  Most callers want
/// [`read_declarations`].
pub struct SymbolReader<'d> {
    document: &'d ParsedDocument,
    comments: Comments,
    resolver: NameResolver,
    frames: Vec<Frame>,
}

impl<'d> SymbolReader<'d> {
    pub fn new(document: &'d ParsedDocument, comments: Comments) -> Self {
        Self {
            document,
            comments,
            resolver: NameResolver::new(),
            frames: vec![Frame::new(Self::file_declaration(document))],
        }
    }

    fn file_declaration(document: &ParsedDocument) -> Declaration {
        Declaration::new(SymbolKind::File, document.uri()).with_location(HashedLocation {
            uri_hash: document.uri_hash(),
            range: document.document_range(),
        })
    }

    /// The resolver state at the end of the walk.
    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Finish the walk and return the `File` declaration.
    pub fn into_declaration(mut self) -> Declaration {
        while self.frames.len() > 1 {
            self.close_frame();
        }
        match self.frames.pop() {
            Some(file) => file.finish(),
            None => Self::file_declaration(self.document),
        }
    }

    fn location(&self, span: Span) -> HashedLocation {
        self.document.span_hashed_location(span)
    }

    fn text(&self, span: Span) -> &'d str {
        self.document.span_text(span)
    }

    /// The doc comment right before `span`.
    fn doc_for(&self, span: Span) -> Option<DocComment> {
        let block = self
            .comments
            .doc_before(self.document.text(), span.start.offset)?;
        Some(DocComment {
            doc: PhpDoc::parse(block.text)?,
            location: self.document.hashed_location(block.start, block.end),
        })
    }

    fn add(&mut self, decl: Declaration) {
        if let Some(frame) = self.frames.last_mut() {
            frame.children.push(decl);
        }
    }

    fn open_frame(&mut self, decl: Declaration) {
        self.frames.push(Frame::new(decl));
    }

    fn close_frame(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if frame.decl.kind.is_class_like() {
            self.resolver.pop_class();
        }
        let decl = frame.finish();
        self.add(decl);
    }

    fn current_class(&mut self) -> Option<&mut Declaration> {
        self.frames
            .last_mut()
            .map(|frame| &mut frame.decl)
            .filter(|decl| decl.kind.is_class_like())
    }

    fn resolve(&self, written: &str) -> String {
        self.resolver.resolve_written(written, SymbolKind::Class).0
    }

    fn modifiers<'m, 'n: 'm>(
        &self,
        modifiers: impl IntoIterator<Item = &'m Modifier<'n>>,
    ) -> SymbolModifiers {
        modifiers
            .into_iter()
            .fold(SymbolModifiers::empty(), |acc, modifier| {
                acc | SymbolModifiers::from_keyword(self.text(modifier.span()))
            })
    }

    fn member_modifiers<'m, 'n: 'm>(
        &self,
        modifiers: impl IntoIterator<Item = &'m Modifier<'n>>,
    ) -> SymbolModifiers {
        let mut modifiers = self.modifiers(modifiers);
        if !modifiers.intersects(SymbolModifiers::VISIBILITY) {
            modifiers |= SymbolModifiers::PUBLIC;
        }
        modifiers
    }

    // ─── Types ──────────────────────────────────────────────────────────

    fn hint_type(&self, hint: &Hint<'_>) -> TypeDescriptor {
        let mut parts = Vec::new();
        self.hint_parts(hint, &mut parts);
        TypeDescriptor::parse(&parts.join("|"))
    }

    fn hint_parts(&self, hint: &Hint<'_>, parts: &mut Vec<String>) {
        match hint {
            Hint::Identifier(identifier) => {
                let written = identifier.value();
                if type_string::is_keyword(written) {
                    parts.push(written.to_string());
                } else {
                    parts.push(self.resolve(written));
                }
            }
            Hint::Nullable(nullable) => {
                self.hint_parts(nullable.hint, parts);
                parts.push("null".to_string());
            }
            Hint::Union(union) => {
                self.hint_parts(union.left, parts);
                self.hint_parts(union.right, parts);
            }
            Hint::Intersection(intersection) => {
                self.hint_parts(intersection.left, parts);
                self.hint_parts(intersection.right, parts);
            }
            Hint::Parenthesized(inner) => self.hint_parts(inner.hint, parts),
            Hint::Self_(keyword) | Hint::Parent(keyword) => parts.push(
                self.resolver
                    .resolve_not_fully_qualified(keyword.value, SymbolKind::Class),
            ),
            Hint::Array(keyword) | Hint::Callable(keyword) | Hint::Static(keyword) => {
                parts.push(keyword.value.to_ascii_lowercase())
            }
            Hint::Null(keyword) | Hint::True(keyword) | Hint::False(keyword) => {
                parts.push(keyword.value.to_string())
            }
            Hint::Void(identifier)
            | Hint::Never(identifier)
            | Hint::Float(identifier)
            | Hint::Bool(identifier)
            | Hint::Integer(identifier)
            | Hint::String(identifier)
            | Hint::Object(identifier)
            | Hint::Mixed(identifier)
            | Hint::Iterable(identifier) => parts.push(identifier.value.to_string()),
        }
    }

    fn optional_hint_type(&self, hint: Option<&Hint<'_>>) -> TypeDescriptor {
        hint.map(|hint| self.hint_type(hint)).unwrap_or_default()
    }

    // ─── Declarations ───────────────────────────────────────────────────

    fn parameters(
        &self,
        list: &FunctionLikeParameterList<'_>,
        doc: Option<&DocComment>,
    ) -> Vec<Declaration> {
        list.parameters
            .iter()
            .map(|param| {
                let mut modifiers = SymbolModifiers::empty();
                if param.ampersand.is_some() {
                    modifiers |= SymbolModifiers::REFERENCE;
                }
                if param.ellipsis.is_some() {
                    modifiers |= SymbolModifiers::VARIADIC;
                }
                let mut decl = Declaration::new(SymbolKind::Parameter, param.variable.name)
                    .with_modifiers(modifiers)
                    .with_location(self.location(param.span()));
                decl.ty = self.optional_hint_type(param.hint.as_ref());
                decl.value = param
                    .default_value
                    .as_ref()
                    .map(|default| self.text(default.value.span()).to_string());
                if let Some(doc) = doc {
                    apply_element_doc(&mut decl, doc, &self.resolver);
                }
                decl
            })
            .collect()
    }

    /// Constructor parameters with a visibility or `readonly` modifier also
    /// declare a property of the class.
    fn promoted_properties(
        &self,
        list: &FunctionLikeParameterList<'_>,
        doc: Option<&DocComment>,
    ) -> Vec<Declaration> {
        list.parameters
            .iter()
            .filter(|param| param.is_promoted_property())
            .map(|param| {
                let modifiers = self.member_modifiers(param.modifiers.iter());
                let mut property = Declaration::new(SymbolKind::Property, param.variable.name)
                    .with_modifiers(modifiers)
                    .with_location(self.location(param.span()));
                property.ty = self.optional_hint_type(param.hint.as_ref());
                if let Some(tag) = doc.and_then(|doc| doc.doc.find_param_tag(param.variable.name)) {
                    property.doc = Some(SymbolDoc::new(
                        tag.description.clone(),
                        doc_type(&tag.type_string, &self.resolver),
                    ));
                }
                property
            })
            .collect()
    }

    fn callable_doc(&self, decl: &mut Declaration, doc: Option<&DocComment>) {
        if let Some(doc) = doc {
            let ty = doc
                .doc
                .return_tag()
                .map(|tag| doc_type(&tag.type_string, &self.resolver))
                .unwrap_or_default();
            decl.doc = Some(SymbolDoc::new(doc.doc.text.clone(), ty));
        }
    }

    fn open_callable(&mut self, decl: Declaration, parameters: Vec<Declaration>) {
        self.open_frame(decl);
        for parameter in parameters {
            self.add(parameter);
        }
    }

    /// Open the frame of a class-like and push its class context.
    fn open_class_like(
        &mut self,
        mut decl: Declaration,
        doc: Option<DocComment>,
    ) {
        let base = decl
            .associated
            .iter()
            .find(|a| a.kind == SymbolKind::Class)
            .map(|a| a.name.clone());
        self.resolver.push_class(ClassContext {
            name: decl.name.clone(),
            base,
        });
        let magic = match &doc {
            Some(doc) => {
                decl.doc = Some(SymbolDoc::new(doc.doc.text.clone(), TypeDescriptor::empty()));
                magic_members(doc, &self.resolver)
            }
            None => Vec::new(),
        };
        self.open_frame(decl);
        for member in magic {
            self.add(member);
        }
    }

    fn named_types<'m, 'n: 'm>(
        &self,
        kind: SymbolKind,
        names: impl IntoIterator<Item = &'m Identifier<'n>>,
    ) -> Vec<Declaration> {
        names
            .into_iter()
            .map(|name| Declaration::new(kind, self.resolve(name.value())))
            .collect()
    }

    fn enter_class(&mut self, class: &Class<'_>) {
        let mut decl = Declaration::new(SymbolKind::Class, self.resolver.resolve_relative(class.name.value))
            .with_modifiers(self.modifiers(class.modifiers.iter()))
            .with_location(self.location(class.span()));
        if let Some(extends) = &class.extends {
            decl.associated
                .extend(self.named_types(SymbolKind::Class, extends.types.iter().take(1)));
        }
        if let Some(implements) = &class.implements {
            decl.associated
                .extend(self.named_types(SymbolKind::Interface, implements.types.iter()));
        }
        let doc = self.doc_for(class.span());
        self.open_class_like(decl, doc);
    }

    fn enter_interface(&mut self, interface: &Interface<'_>) {
        let mut decl = Declaration::new(
            SymbolKind::Interface,
            self.resolver.resolve_relative(interface.name.value),
        )
        .with_location(self.location(interface.span()));
        if let Some(extends) = &interface.extends {
            decl.associated
                .extend(self.named_types(SymbolKind::Interface, extends.types.iter()));
        }
        let doc = self.doc_for(interface.span());
        self.open_class_like(decl, doc);
    }

    fn enter_trait(&mut self, r#trait: &Trait<'_>) {
        let decl = Declaration::new(SymbolKind::Trait, self.resolver.resolve_relative(r#trait.name.value))
            .with_location(self.location(r#trait.span()));
        let doc = self.doc_for(r#trait.span());
        self.open_class_like(decl, doc);
    }

    /// Enums are final classes implementing `UnitEnum`, or `BackedEnum`
    /// when they declare a backing type.  Their cases are static constants
    /// of the enum type.
    fn enter_enum(&mut self, r#enum: &Enum<'_>) {
        let mut decl = Declaration::new(SymbolKind::Class, self.resolver.resolve_relative(r#enum.name.value))
            .with_modifiers(SymbolModifiers::FINAL)
            .with_location(self.location(r#enum.span()));
        if let Some(implements) = &r#enum.implements {
            decl.associated
                .extend(self.named_types(SymbolKind::Interface, implements.types.iter()));
        }
        let implicit = if r#enum.backing_type_hint.is_some() {
            "BackedEnum"
        } else {
            "UnitEnum"
        };
        decl.associated
            .push(Declaration::new(SymbolKind::Interface, implicit));
        let doc = self.doc_for(r#enum.span());
        self.open_class_like(decl, doc);
    }

    fn enter_anonymous_class(&mut self, class: &AnonymousClass<'_>) {
        let mut decl = Declaration::new(
            SymbolKind::Class,
            self.document.create_anonymous_name(class.span().start.offset),
        )
        .with_modifiers(SymbolModifiers::ANONYMOUS)
        .with_location(self.location(class.span()));
        if let Some(extends) = &class.extends {
            decl.associated
                .extend(self.named_types(SymbolKind::Class, extends.types.iter().take(1)));
        }
        if let Some(implements) = &class.implements {
            decl.associated
                .extend(self.named_types(SymbolKind::Interface, implements.types.iter()));
        }
        self.open_class_like(decl, None);
    }

    fn enter_function(&mut self, function: &Function<'_>) {
        let doc = self.doc_for(function.span());
        let mut decl = Declaration::new(
            SymbolKind::Function,
            self.resolver.resolve_relative(function.name.value),
        )
        .with_location(self.location(function.span()));
        decl.ty = self.optional_hint_type(function.return_type_hint.as_ref().map(|r| &r.hint));
        self.callable_doc(&mut decl, doc.as_ref());
        let parameters = self.parameters(&function.parameter_list, doc.as_ref());
        self.open_callable(decl, parameters);
    }

    fn enter_method(&mut self, method: &Method<'_>, member: &ClassLikeMember<'_>) {
        let doc = self.doc_for(member.span());
        if method.name.value.eq_ignore_ascii_case("__construct") {
            for property in self.promoted_properties(&method.parameter_list, doc.as_ref()) {
                self.add(property);
            }
        }
        let mut decl = Declaration::new(SymbolKind::Method, method.name.value)
            .with_modifiers(self.member_modifiers(method.modifiers.iter()))
            .with_location(self.location(member.span()));
        decl.ty = self.optional_hint_type(method.return_type_hint.as_ref().map(|r| &r.hint));
        self.callable_doc(&mut decl, doc.as_ref());
        let parameters = self.parameters(&method.parameter_list, doc.as_ref());
        self.open_callable(decl, parameters);
    }

    fn enter_closure(&mut self, closure: &Closure<'_>) {
        let mut decl = Declaration::new(
            SymbolKind::Function,
            self.document.create_anonymous_name(closure.span().start.offset),
        )
        .with_modifiers(SymbolModifiers::ANONYMOUS)
        .with_location(self.location(closure.span()));
        decl.ty = self.optional_hint_type(closure.return_type_hint.as_ref().map(|r| &r.hint));
        let mut children = self.parameters(&closure.parameter_list, None);
        if let Some(use_clause) = &closure.use_clause {
            for variable in use_clause.variables.iter() {
                let mut modifiers = SymbolModifiers::USE;
                if variable.ampersand.is_some() {
                    modifiers |= SymbolModifiers::REFERENCE;
                }
                children.push(
                    Declaration::new(SymbolKind::Variable, variable.variable.name)
                        .with_modifiers(modifiers)
                        .with_location(self.location(variable.variable.span())),
                );
            }
        }
        self.open_callable(decl, children);
    }

    fn enter_arrow_function(&mut self, arrow: &ArrowFunction<'_>) {
        let mut decl = Declaration::new(
            SymbolKind::Function,
            self.document.create_anonymous_name(arrow.span().start.offset),
        )
        .with_modifiers(SymbolModifiers::ANONYMOUS)
        .with_location(self.location(arrow.span()));
        decl.ty = self.optional_hint_type(arrow.return_type_hint.as_ref().map(|r| &r.hint));
        let parameters = self.parameters(&arrow.parameter_list, None);
        self.open_callable(decl, parameters);
    }

    fn enter_namespace(&mut self, namespace: &Namespace<'_>) {
        let name = namespace
            .name
            .as_ref()
            .map(|name| name.value().to_string())
            .unwrap_or_default();
        self.resolver.set_namespace(name.clone());
        let decl = Declaration::new(SymbolKind::Namespace, name).with_location(self.location(namespace.span()));
        self.open_frame(decl);
    }

    fn read_use(&mut self, items: &UseItems<'_>) {
        let mut decls = Vec::new();
        match items {
            UseItems::Sequence(sequence) => {
                for item in sequence.items.iter() {
                    decls.push(self.use_item(item, None, SymbolKind::Class));
                }
            }
            UseItems::TypedSequence(sequence) => {
                let kind = use_kind(Some(&sequence.r#type));
                for item in sequence.items.iter() {
                    decls.push(self.use_item(item, None, kind));
                }
            }
            UseItems::TypedList(list) => {
                let kind = use_kind(Some(&list.r#type));
                let prefix = list.namespace.value();
                for item in list.items.iter() {
                    decls.push(self.use_item(item, Some(prefix), kind));
                }
            }
            UseItems::MixedList(list) => {
                let prefix = list.namespace.value();
                for typed in list.items.iter() {
                    let kind = use_kind(typed.r#type.as_ref());
                    decls.push(self.use_item(&typed.item, Some(prefix), kind));
                }
            }
        }
        for decl in decls {
            if let Some(rule) = ImportRule::from_declaration(&decl) {
                self.resolver.push_rule(rule);
            }
            self.add(decl);
        }
    }

    fn use_item(&self, item: &UseItem<'_>, prefix: Option<&str>, kind: SymbolKind) -> Declaration {
        let written = item.name.value().trim_start_matches('\\');
        let target = match prefix {
            Some(prefix) => format!("{}\\{written}", prefix.trim_start_matches('\\')),
            None => written.to_string(),
        };
        let name = match &item.alias {
            Some(alias) => alias.identifier.value.to_string(),
            None => target.rsplit('\\').next().unwrap_or(&target).to_string(),
        };
        let mut decl = Declaration::new(kind, name)
            .with_modifiers(SymbolModifiers::USE)
            .with_location(self.location(item.span()));
        decl.associated = vec![Declaration::new(kind, target)];
        decl
    }

    fn read_constant_statement(&mut self, constant: &Constant<'_>) {
        let doc = self.doc_for(constant.span());
        for item in constant.items.iter() {
            let value = self.text(item.value.span()).to_string();
            let mut decl = Declaration::new(
                SymbolKind::Constant,
                self.resolver.resolve_relative(item.name.value),
            )
            .with_location(self.location(item.span()));
            decl.ty = literal_type(&value);
            decl.value = Some(value);
            if let Some(doc) = &doc {
                apply_element_doc(&mut decl, doc, &self.resolver);
            }
            self.add(decl);
        }
    }

    fn read_define(&mut self, call: &FunctionCall<'_>, arguments: &ArgumentList<'_>) {
        let mut values = arguments.arguments.iter().map(argument_value);
        let Some(first) = values.next() else {
            return;
        };
        let name = match first {
            Expression::Literal(Literal::String(literal)) => match literal.value {
                Some(value) => value.to_string(),
                None => strip_quotes(self.text(literal.span())).to_string(),
            },
            _ => return,
        };
        let mut decl = Declaration::new(SymbolKind::Constant, name.trim_start_matches('\\'))
            .with_location(self.location(call.span()));
        if let Some(value) = values.next() {
            let value = self.text(value.span()).to_string();
            decl.ty = literal_type(&value);
            decl.value = Some(value);
        }
        self.add(decl);
    }

    fn read_property(&mut self, property: &Property<'_>, member: &ClassLikeMember<'_>) {
        let doc = self.doc_for(member.span());
        let modifiers = self.member_modifiers(property.modifiers().iter());
        let ty = self.optional_hint_type(property.hint());
        let items: Vec<&PropertyItem<'_>> = match property {
            Property::Plain(plain) => plain.items.iter().collect(),
            Property::Hooked(hooked) => vec![&hooked.item],
        };
        for item in items {
            let variable = item.variable();
            let mut decl = Declaration::new(SymbolKind::Property, variable.name)
                .with_modifiers(modifiers)
                .with_location(self.location(item.span()));
            decl.ty = ty.clone();
            if let PropertyItem::Concrete(concrete) = item {
                decl.value = Some(self.text(concrete.value.span()).to_string());
            }
            if let Some(doc) = &doc {
                apply_element_doc(&mut decl, doc, &self.resolver);
            }
            self.add(decl);
        }
    }

    fn read_class_constant(&mut self, constant: &ClassLikeConstant<'_>, member: &ClassLikeMember<'_>) {
        let doc = self.doc_for(member.span());
        let modifiers = self.member_modifiers(constant.modifiers.iter()) | SymbolModifiers::STATIC;
        let hinted = self.optional_hint_type(constant.hint.as_ref());
        for item in constant.items.iter() {
            let value = self.text(item.value.span()).to_string();
            let mut decl = Declaration::new(SymbolKind::ClassConstant, item.name.value)
                .with_modifiers(modifiers)
                .with_location(self.location(item.span()));
            decl.ty = if hinted.is_empty() {
                literal_type(&value)
            } else {
                hinted.clone()
            };
            decl.value = Some(value);
            if let Some(doc) = &doc {
                apply_element_doc(&mut decl, doc, &self.resolver);
            }
            self.add(decl);
        }
    }

    fn read_enum_case(&mut self, case: &EnumCase<'_>, member: &ClassLikeMember<'_>) {
        let Some(name) = self.current_class().map(|class| class.name.clone()) else {
            return;
        };
        let mut decl = Declaration::new(SymbolKind::ClassConstant, case.item.name().value)
            .with_modifiers(SymbolModifiers::STATIC | SymbolModifiers::PUBLIC)
            .with_location(self.location(member.span()));
        decl.ty = TypeDescriptor::atomic(name);
        self.add(decl);
    }

    fn read_trait_use(&mut self, trait_use: &TraitUse<'_>) {
        let traits = self.named_types(SymbolKind::Trait, trait_use.trait_names.iter());
        if let Some(class) = self.current_class() {
            class.associated.extend(traits);
        }
    }

    fn variable(&mut self, variable: &DirectVariable<'_>) {
        let decl = Declaration::new(SymbolKind::Variable, variable.name)
            .with_location(self.location(variable.span()));
        self.add(decl);
    }

    fn enter_statement(&mut self, statement: &Statement<'_>) -> bool {
        match statement {
            Statement::Namespace(namespace) => self.enter_namespace(namespace),
            Statement::Use(r#use) => {
                self.read_use(&r#use.items);
                return false;
            }
            Statement::Class(class) => self.enter_class(class),
            Statement::Interface(interface) => self.enter_interface(interface),
            Statement::Trait(r#trait) => self.enter_trait(r#trait),
            Statement::Enum(r#enum) => self.enter_enum(r#enum),
            Statement::Function(function) => self.enter_function(function),
            Statement::Constant(constant) => self.read_constant_statement(constant),
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
            Statement::Try(r#try) => {
                for catch in r#try.catch_clauses.iter() {
                    if let Some(variable) = &catch.variable {
                        self.variable(variable);
                    }
                }
            }
            _ => {}
        }
        true
    }

    fn enter_member(&mut self, member: &ClassLikeMember<'_>) -> bool {
        match member {
            ClassLikeMember::Method(method) => {
                self.enter_method(method, member);
                return true;
            }
            ClassLikeMember::Property(property) => self.read_property(property, member),
            ClassLikeMember::Constant(constant) => self.read_class_constant(constant, member),
            ClassLikeMember::EnumCase(case) => self.read_enum_case(case, member),
            ClassLikeMember::TraitUse(trait_use) => self.read_trait_use(trait_use),
        }
        false
    }
}

fn use_kind(r#type: Option<&UseType<'_>>) -> SymbolKind {
    match r#type {
        Some(t) if t.is_function() => SymbolKind::Function,
        Some(t) if t.is_const() => SymbolKind::Constant,
        _ => SymbolKind::Class,
    }
}

impl<'a> Visitor<'a> for SymbolReader<'_> {
    fn enter(&mut self, node: Node<'a>, spine: &[Node<'a>]) -> bool {
        match node {
            Node::Statement(statement) => self.enter_statement(statement),
            Node::Member(member) => self.enter_member(member),
            Node::Expression(expression) => {
                match expression {
                    Expression::Variable(Variable::Direct(variable)) => self.variable(variable),
                    Expression::Call(Call::Function(call)) => {
                        if let Some(arguments) = define_call(call) {
                            self.read_define(call, arguments);
                        }
                    }
                    Expression::Closure(closure) => self.enter_closure(closure),
                    Expression::ArrowFunction(arrow) => self.enter_arrow_function(arrow),
                    Expression::AnonymousClass(class) => {
                        if let Some(arguments) = &class.argument_list {
                            let mut outer = spine.to_vec();
                            for argument in arguments.arguments.iter() {
                                walk::walk_node(
                                    Node::Expression(argument_value(argument)),
                                    self,
                                    &mut outer,
                                );
                            }
                        }
                        self.enter_anonymous_class(class);
                    }
                    _ => {}
                }
                true
            }
        }
    }

    fn leave(&mut self, node: Node<'a>, _spine: &[Node<'a>]) {
        if opens_frame(node) {
            self.close_frame();
        }
    }
}
