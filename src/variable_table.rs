//! Flow-sensitive variable types for the reference pass.
//!
//! The table is a stack of variable sets.  A *scope* set is opened for
//! every function, method, closure and class body and hides everything
//! below it.  A *branch* set is opened for each arm of a conditional; it
//! sees the variables of its parent but records assignments locally.
//! When the conditional ends, [`VariableTable::prune_branches`] folds
//! the arms back into the parent by union.

use std::collections::HashMap;

use crate::type_string::{DEFAULT_UNION_LIMIT, TypeDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetKind {
    Scope,
    Branch,
}

#[derive(Debug, Clone)]
struct VariableSet {
    kind: SetKind,
    variables: HashMap<String, TypeDescriptor>,
    /// Closed arms of a conditional that is still open in this set.
    branches: Vec<VariableSet>,
}

impl VariableSet {
    fn new(kind: SetKind) -> Self {
        Self {
            kind,
            variables: HashMap::new(),
            branches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableTable {
    stack: Vec<VariableSet>,
    union_limit: usize,
}

impl Default for VariableTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableTable {
    /// A table holding the file-level scope.
    pub fn new() -> Self {
        Self {
            stack: vec![VariableSet::new(SetKind::Scope)],
            union_limit: DEFAULT_UNION_LIMIT,
        }
    }

    pub fn with_union_limit(mut self, limit: usize) -> Self {
        self.union_limit = limit;
        self
    }

    /// Open a scope.  The named variables keep their current types.
    pub fn push_scope<S: AsRef<str>>(&mut self, carry: &[S]) {
        let mut set = VariableSet::new(SetKind::Scope);
        for name in carry {
            let name = name.as_ref();
            if let Some(ty) = self.get_type(name) {
                set.variables.insert(name.to_string(), ty);
            }
        }
        self.stack.push(set);
    }

    /// Open a scope that sees every variable visible here.
    pub fn push_scope_with_all(&mut self) {
        let mut set = VariableSet::new(SetKind::Scope);
        set.variables = self.visible();
        self.stack.push(set);
    }

    /// Close the innermost scope together with any branches left open in it.
    pub fn pop_scope(&mut self) {
        while self.stack.len() > 1 {
            if let Some(set) = self.stack.pop()
                && set.kind == SetKind::Scope
            {
                return;
            }
        }
    }

    pub fn push_branch(&mut self) {
        self.stack.push(VariableSet::new(SetKind::Branch));
    }

    /// Close the innermost branch and keep it for the next prune.
    pub fn pop_branch(&mut self) {
        let is_branch = self
            .stack
            .last()
            .is_some_and(|set| set.kind == SetKind::Branch);
        if !is_branch {
            return;
        }
        if let Some(branch) = self.stack.pop()
            && let Some(parent) = self.stack.last_mut()
        {
            parent.branches.push(branch);
        }
    }

    /// Merge the closed branches into the current set.
    ///
    /// When `exhaustive` is set (an `else` or `default` arm exists) and
    /// every arm assigned a variable, the arms' union replaces the prior
    /// type; otherwise the prior type stays part of the union.
    pub fn prune_branches(&mut self, exhaustive: bool) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        let branches = std::mem::take(&mut top.branches);
        if branches.is_empty() {
            return;
        }

        let mut names: Vec<&String> = Vec::new();
        for branch in &branches {
            for name in branch.variables.keys() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names.sort();

        for name in names {
            let mut ty = TypeDescriptor::empty();
            let mut covered = true;
            for branch in &branches {
                match branch.variables.get(name) {
                    Some(t) => ty = ty.merge_with_limit(t, self.union_limit),
                    None => covered = false,
                }
            }
            if !(exhaustive && covered)
                && let Some(prior) = self.get_type(name)
            {
                ty = prior.merge_with_limit(&ty, self.union_limit);
            }
            self.set_variable(name, ty);
        }
    }

    /// The type of `name` as seen from the innermost set.
    pub fn get_type(&self, name: &str) -> Option<TypeDescriptor> {
        for set in self.stack.iter().rev() {
            if let Some(ty) = set.variables.get(name) {
                return Some(ty.clone());
            }
            if set.kind == SetKind::Scope {
                break;
            }
        }
        None
    }

    /// Record an assignment.  Empty names and types are ignored.
    pub fn set_variable(&mut self, name: &str, ty: TypeDescriptor) {
        if name.is_empty() || ty.is_empty() {
            return;
        }
        if let Some(top) = self.stack.last_mut() {
            top.variables.insert(name.to_string(), ty);
        }
    }

    /// Every variable visible from the innermost set.
    pub fn visible(&self) -> HashMap<String, TypeDescriptor> {
        let start = self
            .stack
            .iter()
            .rposition(|set| set.kind == SetKind::Scope)
            .unwrap_or(0);
        let mut out = HashMap::new();
        for set in &self.stack[start..] {
            for (name, ty) in &set.variables {
                out.insert(name.clone(), ty.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> TypeDescriptor {
        TypeDescriptor::parse(s)
    }

    fn type_of(table: &VariableTable, name: &str) -> String {
        table.get_type(name).map(|t| t.to_string()).unwrap_or_default()
    }

    #[test]
    fn scopes_hide_outer_variables_unless_carried() {
        let mut table = VariableTable::new();
        table.set_variable("$a", ty("int"));
        table.set_variable("$b", ty("string"));
        table.push_scope(&["$a"]);
        assert_eq!(type_of(&table, "$a"), "int");
        assert_eq!(type_of(&table, "$b"), "");
        table.pop_scope();
        assert_eq!(type_of(&table, "$b"), "string");

        table.push_scope_with_all();
        assert_eq!(type_of(&table, "$b"), "string");
    }

    #[test]
    fn exhaustive_branches_replace_prior_type() {
        let mut table = VariableTable::new();
        table.set_variable("$x", ty("bool"));
        table.push_branch();
        table.set_variable("$x", ty("int"));
        table.pop_branch();
        table.push_branch();
        table.set_variable("$x", ty("string"));
        table.pop_branch();
        table.prune_branches(true);
        assert_eq!(type_of(&table, "$x"), "int|string");
    }

    #[test]
    fn partial_branches_keep_prior_type() {
        let mut table = VariableTable::new();
        table.set_variable("$x", ty("bool"));
        table.push_branch();
        table.set_variable("$x", ty("int"));
        table.pop_branch();
        table.prune_branches(false);
        assert_eq!(type_of(&table, "$x"), "bool|int");
    }

    #[test]
    fn branches_see_parent_variables() {
        let mut table = VariableTable::new();
        table.set_variable("$x", ty("int"));
        table.push_branch();
        assert_eq!(type_of(&table, "$x"), "int");
        table.pop_branch();
        table.prune_branches(false);
        assert_eq!(type_of(&table, "$x"), "int");
    }

    #[test]
    fn empty_names_and_types_are_ignored() {
        let mut table = VariableTable::new();
        table.set_variable("", ty("int"));
        table.set_variable("$x", TypeDescriptor::empty());
        assert!(table.visible().is_empty());
    }
}
