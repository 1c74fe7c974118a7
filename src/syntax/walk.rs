//! Pre-order/post-order walk over a parsed program.
//!
//! mago's AST has no generic child accessor, so [`Node`] wraps the three
//! node families the readers care about (statements, class-like members
//! and expressions) and lists the children of each construct in source
//! order.  [`walk`] drives a [`Visitor`] with the same protocol as
//! [`tree::traverse`](crate::tree::traverse): `enter` may skip a subtree,
//! `leave` runs for every entered node, and a sticky halt flag is checked
//! on the way in and out.

use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;

/// A statement, member or expression of the program.
#[derive(Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a Statement<'a>),
    Member(&'a ClassLikeMember<'a>),
    Expression(&'a Expression<'a>),
}

impl<'a> Node<'a> {
    pub fn span(&self) -> Span {
        match self {
            Node::Statement(statement) => statement.span(),
            Node::Member(member) => member.span(),
            Node::Expression(expression) => expression.span(),
        }
    }

    /// Direct children, in source order.
    pub fn children(&self) -> Vec<Node<'a>> {
        let mut out = Children(Vec::new());
        match *self {
            Node::Statement(statement) => out.statement(statement),
            Node::Member(member) => out.member(member),
            Node::Expression(expression) => out.expression(expression),
        }
        out.0
    }
}

/// Callbacks invoked by [`walk`].  `spine` holds the ancestors of `node`,
/// outermost first.
pub trait Visitor<'a> {
    /// Called on entering `node`.  Return `false` to skip its children.
    fn enter(&mut self, node: Node<'a>, spine: &[Node<'a>]) -> bool;

    /// Called on leaving `node`, also when its children were skipped.
    fn leave(&mut self, _node: Node<'a>, _spine: &[Node<'a>]) {}

    /// Sticky request to abort the whole walk.
    fn halted(&self) -> bool {
        false
    }
}

/// Walk `statements` depth-first.
pub fn walk<'a, V>(statements: impl IntoIterator<Item = &'a Statement<'a>>, visitor: &mut V)
where
    V: Visitor<'a> + ?Sized,
{
    let mut spine = Vec::new();
    for statement in statements {
        if !walk_node(Node::Statement(statement), visitor, &mut spine) {
            return;
        }
    }
}

/// Walk one subtree.  Returns `false` once the visitor has halted.
pub fn walk_node<'a, V>(node: Node<'a>, visitor: &mut V, spine: &mut Vec<Node<'a>>) -> bool
where
    V: Visitor<'a> + ?Sized,
{
    if visitor.halted() {
        return false;
    }
    let descend = visitor.enter(node, spine);
    if visitor.halted() {
        return false;
    }
    if descend {
        spine.push(node);
        for child in node.children() {
            if !walk_node(child, visitor, spine) {
                return false;
            }
        }
        spine.pop();
    }
    visitor.leave(node, spine);
    !visitor.halted()
}

/// Value of a call argument.
pub fn argument_value<'a>(argument: &'a Argument<'a>) -> &'a Expression<'a> {
    match argument {
        Argument::Positional(positional) => positional.value,
        Argument::Named(named) => named.value,
    }
}

struct Children<'a>(Vec<Node<'a>>);

impl<'a> Children<'a> {
    fn push_statement(&mut self, statement: &'a Statement<'a>) {
        self.0.push(Node::Statement(statement));
    }

    fn push_expression(&mut self, expression: &'a Expression<'a>) {
        self.0.push(Node::Expression(expression));
    }

    fn statements(&mut self, statements: impl IntoIterator<Item = &'a Statement<'a>>) {
        self.0.extend(statements.into_iter().map(Node::Statement));
    }

    fn members(&mut self, members: impl IntoIterator<Item = &'a ClassLikeMember<'a>>) {
        self.0.extend(members.into_iter().map(Node::Member));
    }

    fn arguments(&mut self, arguments: &'a ArgumentList<'a>) {
        for argument in arguments.arguments.iter() {
            self.push_expression(argument_value(argument));
        }
    }

    fn elements(&mut self, elements: impl IntoIterator<Item = &'a ArrayElement<'a>>) {
        for element in elements {
            match element {
                ArrayElement::KeyValue(kv) => {
                    self.push_expression(kv.key);
                    self.push_expression(kv.value);
                }
                ArrayElement::Value(value) => self.push_expression(value.value),
                ArrayElement::Variadic(variadic) => self.push_expression(variadic.value),
                ArrayElement::Missing(_) => {}
            }
        }
    }

    fn statement(&mut self, statement: &'a Statement<'a>) {
        match statement {
            Statement::Namespace(namespace) => self.statements(namespace.statements().iter()),
            Statement::Class(class) => self.members(class.members.iter()),
            Statement::Interface(interface) => self.members(interface.members.iter()),
            Statement::Trait(r#trait) => self.members(r#trait.members.iter()),
            Statement::Enum(r#enum) => self.members(r#enum.members.iter()),
            Statement::Function(function) => self.statements(function.body.statements.iter()),
            Statement::Block(block) => self.statements(block.statements.iter()),
            Statement::Expression(statement) => self.push_expression(statement.expression),
            Statement::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.push_expression(value);
                }
            }
            Statement::Echo(echo) => {
                for value in echo.values.iter() {
                    self.push_expression(value);
                }
            }
            Statement::Constant(constant) => {
                for item in constant.items.iter() {
                    self.push_expression(item.value);
                }
            }
            Statement::If(r#if) => {
                self.push_expression(r#if.condition);
                match &r#if.body {
                    IfBody::Statement(body) => {
                        self.push_statement(body.statement);
                        for clause in body.else_if_clauses.iter() {
                            self.push_expression(clause.condition);
                            self.push_statement(clause.statement);
                        }
                        if let Some(clause) = &body.else_clause {
                            self.push_statement(clause.statement);
                        }
                    }
                    IfBody::ColonDelimited(body) => {
                        self.statements(body.statements.iter());
                        for clause in body.else_if_clauses.iter() {
                            self.push_expression(clause.condition);
                            self.statements(clause.statements.iter());
                        }
                        if let Some(clause) = &body.else_clause {
                            self.statements(clause.statements.iter());
                        }
                    }
                }
            }
            Statement::Foreach(foreach) => {
                self.push_expression(foreach.expression);
                if let Some(key) = foreach.target.key() {
                    self.push_expression(key);
                }
                self.push_expression(foreach.target.value());
                self.statements(foreach.body.statements());
            }
            Statement::For(r#for) => {
                for expression in r#for.initializations.iter() {
                    self.push_expression(expression);
                }
                for expression in r#for.conditions.iter() {
                    self.push_expression(expression);
                }
                for expression in r#for.increments.iter() {
                    self.push_expression(expression);
                }
                match &r#for.body {
                    ForBody::Statement(inner) => self.push_statement(inner),
                    ForBody::ColonDelimited(body) => self.statements(body.statements.iter()),
                }
            }
            Statement::While(r#while) => {
                self.push_expression(r#while.condition);
                match &r#while.body {
                    WhileBody::Statement(inner) => self.push_statement(inner),
                    WhileBody::ColonDelimited(body) => self.statements(body.statements.iter()),
                }
            }
            Statement::DoWhile(do_while) => {
                self.push_statement(do_while.statement);
                self.push_expression(do_while.condition);
            }
            Statement::Try(r#try) => {
                self.statements(r#try.block.statements.iter());
                for catch in r#try.catch_clauses.iter() {
                    self.statements(catch.block.statements.iter());
                }
                if let Some(finally) = &r#try.finally_clause {
                    self.statements(finally.block.statements.iter());
                }
            }
            Statement::Switch(switch) => {
                self.push_expression(switch.expression);
                let cases = match &switch.body {
                    SwitchBody::BraceDelimited(body) => &body.cases,
                    SwitchBody::ColonDelimited(body) => &body.cases,
                };
                for case in cases.iter() {
                    if let SwitchCase::Expression(case) = case {
                        self.push_expression(case.expression);
                    }
                    self.statements(case.statements().iter());
                }
            }
            _ => {}
        }
    }

    fn member(&mut self, member: &'a ClassLikeMember<'a>) {
        match member {
            ClassLikeMember::Method(method) => {
                if let MethodBody::Concrete(block) = &method.body {
                    self.statements(block.statements.iter());
                }
            }
            ClassLikeMember::Constant(constant) => {
                for item in constant.items.iter() {
                    self.push_expression(item.value);
                }
            }
            _ => {}
        }
    }

    fn expression(&mut self, expression: &'a Expression<'a>) {
        match expression {
            Expression::Binary(binary) => {
                self.push_expression(binary.lhs);
                self.push_expression(binary.rhs);
            }
            Expression::UnaryPrefix(unary) => self.push_expression(unary.operand),
            Expression::UnaryPostfix(unary) => self.push_expression(unary.operand),
            Expression::Parenthesized(inner) => self.push_expression(inner.expression),
            Expression::Assignment(assignment) => {
                self.push_expression(assignment.lhs);
                self.push_expression(assignment.rhs);
            }
            Expression::Conditional(conditional) => {
                self.push_expression(conditional.condition);
                if let Some(then) = conditional.then {
                    self.push_expression(then);
                }
                self.push_expression(conditional.r#else);
            }
            Expression::Array(array) => self.elements(array.elements.iter()),
            Expression::LegacyArray(array) => self.elements(array.elements.iter()),
            Expression::List(list) => self.elements(list.elements.iter()),
            Expression::ArrayAccess(access) => {
                self.push_expression(access.array);
                self.push_expression(access.index);
            }
            Expression::ArrayAppend(append) => self.push_expression(append.array),
            // constructor arguments run in the enclosing scope; visitors
            // that track scopes read them before entering the class
            Expression::AnonymousClass(class) => self.members(class.members.iter()),
            Expression::Closure(closure) => self.statements(closure.body.statements.iter()),
            Expression::ArrowFunction(arrow) => self.push_expression(arrow.expression),
            Expression::Call(call) => match call {
                Call::Function(call) => {
                    self.push_expression(call.function);
                    self.arguments(&call.argument_list);
                }
                Call::Method(call) => {
                    self.push_expression(call.object);
                    self.arguments(&call.argument_list);
                }
                Call::NullSafeMethod(call) => {
                    self.push_expression(call.object);
                    self.arguments(&call.argument_list);
                }
                Call::StaticMethod(call) => {
                    self.push_expression(call.class);
                    self.arguments(&call.argument_list);
                }
            },
            Expression::Access(access) => match access {
                Access::Property(access) => self.push_expression(access.object),
                Access::NullSafeProperty(access) => self.push_expression(access.object),
                Access::StaticProperty(access) => self.push_expression(access.class),
                Access::ClassConstant(access) => self.push_expression(access.class),
            },
            Expression::Instantiation(instantiation) => {
                self.push_expression(instantiation.class);
                if let Some(arguments) = &instantiation.argument_list {
                    self.arguments(arguments);
                }
            }
            Expression::Match(r#match) => {
                self.push_expression(r#match.expression);
                for arm in r#match.arms.iter() {
                    if let MatchArm::Expression(arm) = arm {
                        for condition in arm.conditions.iter() {
                            self.push_expression(condition);
                        }
                    }
                    self.push_expression(arm.expression());
                }
            }
            Expression::Throw(throw) => self.push_expression(throw.exception),
            Expression::Clone(clone) => self.push_expression(clone.object),
            Expression::Yield(r#yield) => match r#yield {
                Yield::Value(value) => {
                    if let Some(value) = &value.value {
                        self.push_expression(value);
                    }
                }
                Yield::Pair(pair) => {
                    self.push_expression(pair.key);
                    self.push_expression(pair.value);
                }
                Yield::From(from) => self.push_expression(from.iterator),
            },
            Expression::Pipe(pipe) => {
                self.push_expression(pipe.input);
                self.push_expression(pipe.callable);
            }
            Expression::Construct(construct) => match construct {
                Construct::Isset(isset) => {
                    for value in isset.values.iter() {
                        self.push_expression(value);
                    }
                }
                Construct::Empty(empty) => self.push_expression(empty.value),
                _ => {}
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::ParsedDocument;

    use super::*;

    /// Records the source text of every direct variable, and stops at the
    /// first one named `$stop`.
    #[derive(Default)]
    struct Variables<'d> {
        document: Option<&'d ParsedDocument>,
        seen: Vec<String>,
        depth: usize,
        max_depth: usize,
        halt: bool,
    }

    impl<'a> Visitor<'a> for Variables<'_> {
        fn enter(&mut self, node: Node<'a>, spine: &[Node<'a>]) -> bool {
            self.max_depth = self.max_depth.max(spine.len());
            self.depth += 1;
            if let Node::Expression(Expression::Variable(Variable::Direct(variable))) = node {
                self.seen.push(variable.name.to_string());
                self.halt = variable.name == "$stop";
            }
            if let (Node::Expression(Expression::Closure(_)), Some(document)) = (node, self.document)
            {
                return !document.span_text(node.span()).contains("skip");
            }
            true
        }

        fn leave(&mut self, _node: Node<'a>, _spine: &[Node<'a>]) {
            self.depth -= 1;
        }

        fn halted(&self) -> bool {
            self.halt
        }
    }

    fn variables(src: &str) -> Vec<String> {
        let document = ParsedDocument::new("file:///walk.php", src);
        document
            .with_program(|program| {
                let mut visitor = Variables {
                    document: Some(&document),
                    ..Variables::default()
                };
                walk(program.statements.iter(), &mut visitor);
                visitor.seen
            })
            .unwrap()
    }

    #[test]
    fn variables_are_visited_in_source_order() {
        let seen = variables(concat!(
            "<?php\n",
            "$a = $b + foo($c);\n",
            "if ($d) { echo $e; } else { $f[] = $g; }\n",
            "foreach ($h as $i => $j) {}\n",
        ));
        assert_eq!(seen, vec!["$a", "$b", "$c", "$d", "$e", "$f", "$g", "$h", "$i", "$j"]);
    }

    #[test]
    fn skipped_subtrees_and_halting() {
        let seen = variables(concat!(
            "<?php\n",
            "$f = function () { $skip = 1; };\n",
            "$g = function () { $inner = 1; };\n",
            "$stop = 1;\n",
            "$after = 2;\n",
        ));
        assert_eq!(seen, vec!["$f", "$g", "$inner", "$stop"]);
    }

    #[test]
    fn enter_and_leave_balance() {
        let document = ParsedDocument::new(
            "file:///walk.php",
            "<?php\nclass A { function f() { return [1, $x ?? 2]; } }\n",
        );
        let (depth, max_depth) = document
            .with_program(|program| {
                let mut visitor = Variables::default();
                walk(program.statements.iter(), &mut visitor);
                (visitor.depth, visitor.max_depth)
            })
            .unwrap();
        assert_eq!(depth, 0);
        assert!(max_depth >= 4, "got {max_depth}");
    }
}
