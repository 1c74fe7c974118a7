//! Generic pre-order/post-order tree traversal.
//!
//! Syntax trees, Declaration Trees and Reference Trees all implement
//! [`TreeNode`], so one traverser drives every pass and query.  A
//! [`TreeVisitor`] can skip a subtree (return `false` from
//! [`preorder`](TreeVisitor::preorder)) or stop the walk entirely
//! ([`halted`](TreeVisitor::halted) is checked when entering and leaving
//! every node, and once it returns `true` the walk unwinds without any
//! further callbacks).

/// A node with ordered children.
pub trait TreeNode: Sized {
    fn children(&self) -> &[Self];
}

/// Callbacks invoked by [`traverse`].
///
/// `spine` holds the ancestors of `node`, root first.
pub trait TreeVisitor<T: TreeNode> {
    /// Called on entering `node`.  Return `false` to skip its children.
    fn preorder(&mut self, node: &T, spine: &[&T]) -> bool;

    /// Called on leaving `node`, also when its children were skipped.
    fn postorder(&mut self, _node: &T, _spine: &[&T]) {}

    /// Sticky request to abort the whole traversal.
    fn halted(&self) -> bool {
        false
    }
}

/// Walk `root` depth-first, calling `visitor` on every node.
pub fn traverse<T, V>(root: &T, visitor: &mut V)
where
    T: TreeNode,
    V: TreeVisitor<T> + ?Sized,
{
    let mut spine: Vec<&T> = Vec::new();
    walk(root, visitor, &mut spine);
}

/// Returns `false` once the visitor has halted.
fn walk<'a, T, V>(node: &'a T, visitor: &mut V, spine: &mut Vec<&'a T>) -> bool
where
    T: TreeNode,
    V: TreeVisitor<T> + ?Sized,
{
    if visitor.halted() {
        return false;
    }
    let descend = visitor.preorder(node, spine);
    if visitor.halted() {
        return false;
    }
    if descend && !node.children().is_empty() {
        spine.push(node);
        for child in node.children() {
            if !walk(child, visitor, spine) {
                return false;
            }
        }
        spine.pop();
    }
    visitor.postorder(node, spine);
    !visitor.halted()
}

/// Every node matching `predicate`, in pre-order.
pub fn filter<'a, T, F>(root: &'a T, mut predicate: F) -> Vec<&'a T>
where
    T: TreeNode,
    F: FnMut(&T) -> bool,
{
    let mut found = Vec::new();
    let mut stack: Vec<&'a T> = vec![root];
    while let Some(node) = stack.pop() {
        if predicate(node) {
            found.push(node);
        }
        stack.extend(node.children().iter().rev());
    }
    found
}

/// First node in pre-order matching `predicate`.
pub fn find<'a, T, F>(root: &'a T, mut predicate: F) -> Option<&'a T>
where
    T: TreeNode,
    F: FnMut(&T) -> bool,
{
    if predicate(root) {
        return Some(root);
    }
    let mut stack: Vec<&'a T> = root.children().iter().rev().collect();
    while let Some(node) = stack.pop() {
        if predicate(node) {
            return Some(node);
        }
        stack.extend(node.children().iter().rev());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        id: u32,
        children: Vec<Node>,
    }

    impl TreeNode for Node {
        fn children(&self) -> &[Node] {
            &self.children
        }
    }

    fn leaf(id: u32) -> Node {
        Node {
            id,
            children: Vec::new(),
        }
    }

    fn sample() -> Node {
        Node {
            id: 1,
            children: vec![
                Node {
                    id: 2,
                    children: vec![leaf(3), leaf(4)],
                },
                leaf(5),
            ],
        }
    }

    struct Recorder {
        events: Vec<String>,
        skip: Option<u32>,
        halt_at: Option<u32>,
        halted: bool,
    }

    impl TreeVisitor<Node> for Recorder {
        fn preorder(&mut self, node: &Node, spine: &[&Node]) -> bool {
            self.events.push(format!("+{}@{}", node.id, spine.len()));
            if Some(node.id) == self.halt_at {
                self.halted = true;
            }
            Some(node.id) != self.skip
        }

        fn postorder(&mut self, node: &Node, _spine: &[&Node]) {
            self.events.push(format!("-{}", node.id));
        }

        fn halted(&self) -> bool {
            self.halted
        }
    }

    fn recorder(skip: Option<u32>, halt_at: Option<u32>) -> Recorder {
        Recorder {
            events: Vec::new(),
            skip,
            halt_at,
            halted: false,
        }
    }

    #[test]
    fn visits_in_pre_and_post_order() {
        let mut v = recorder(None, None);
        traverse(&sample(), &mut v);
        assert_eq!(
            v.events,
            vec!["+1@0", "+2@1", "+3@2", "-3", "+4@2", "-4", "-2", "+5@1", "-5", "-1"]
        );
    }

    #[test]
    fn skipping_a_subtree_still_leaves_it() {
        let mut v = recorder(Some(2), None);
        traverse(&sample(), &mut v);
        assert_eq!(v.events, vec!["+1@0", "+2@1", "-2", "+5@1", "-5", "-1"]);
    }

    #[test]
    fn halt_is_sticky() {
        let mut v = recorder(None, Some(3));
        traverse(&sample(), &mut v);
        assert_eq!(v.events, vec!["+1@0", "+2@1", "+3@2"]);
    }

    #[test]
    fn filter_and_find() {
        let tree = sample();
        let even: Vec<u32> = filter(&tree, |n| n.id % 2 == 0).iter().map(|n| n.id).collect();
        assert_eq!(even, vec![2, 4]);
        assert_eq!(find(&tree, |n| n.id > 3).map(|n| n.id), Some(4));
    }
}
