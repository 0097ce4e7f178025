//! Evaluation Context
//!
//! The evaluation context tracks which nodes are currently running. This is
//! what makes automatic dependency tracking work: when an entry is read, the
//! node on top of the stack is the one that depends on it.
//!
//! # Implementation
//!
//! Each graph owns its own stack; nothing is thread-local or global, so
//! independent graphs never see each other's evaluations. Entering a node
//! pushes it and returns a [`Frame`] guard that pops it again when dropped,
//! which keeps the stack balanced even if a computation panics.
//!
//! A node may appear on the stack at most once. Pushing a node that is
//! already running is the circular dependency condition; callers check
//! [`EvalContext::contains`] before entering.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::graph::Node;

/// The stack of nodes mid-evaluation, oldest first.
#[derive(Debug, Default)]
pub(crate) struct EvalContext {
    stack: SmallVec<[Node; 8]>,
}

impl EvalContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push `node` and return a guard that pops it on drop.
    pub(crate) fn enter(context: &RefCell<Self>, node: Node) -> Frame<'_> {
        context.borrow_mut().stack.push(node.clone());
        Frame { context, node }
    }

    /// The innermost running node, if any.
    pub(crate) fn running(&self) -> Option<&Node> {
        self.stack.last()
    }

    /// True when no evaluation is in progress.
    pub(crate) fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    pub(crate) fn contains(&self, node: &Node) -> bool {
        self.stack.contains(node)
    }

    /// Render the loop that re-entering `node` would close.
    ///
    /// Starts at the earlier occurrence of `node` and ends with `node` again,
    /// e.g. `["x", "y", "x"]`.
    pub(crate) fn cycle_path(&self, node: &Node) -> Vec<String> {
        let start = self
            .stack
            .iter()
            .position(|running| running == node)
            .unwrap_or(self.stack.len());
        self.stack[start..]
            .iter()
            .chain(std::iter::once(node))
            .map(ToString::to_string)
            .collect()
    }

    /// Copy of the stack, oldest first.
    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.stack.iter().map(ToString::to_string).collect()
    }
}

/// Guard for one node on the evaluation stack.
pub(crate) struct Frame<'a> {
    context: &'a RefCell<EvalContext>,
    node: Node,
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let popped = self.context.borrow_mut().stack.pop();

        if let Some(popped) = popped {
            debug_assert_eq!(
                popped, self.node,
                "evaluation stack mismatch: expected {}, got {}",
                self.node, popped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_pops_on_drop() {
        let context = RefCell::new(EvalContext::new());
        assert!(context.borrow().is_idle());

        {
            let _frame = EvalContext::enter(&context, Node::entry("a"));
            assert_eq!(context.borrow().running(), Some(&Node::entry("a")));
        }

        assert!(context.borrow().is_idle());
        assert!(context.borrow().running().is_none());
    }

    #[test]
    fn nested_frames() {
        let context = RefCell::new(EvalContext::new());

        let _outer = EvalContext::enter(&context, Node::entry("c"));
        {
            let _inner = EvalContext::enter(&context, Node::entry("b"));
            assert_eq!(context.borrow().running(), Some(&Node::entry("b")));
            assert_eq!(context.borrow().snapshot(), vec!["c", "b"]);
        }

        assert_eq!(context.borrow().running(), Some(&Node::entry("c")));
    }

    #[test]
    fn cycle_path_starts_at_first_occurrence() {
        let context = RefCell::new(EvalContext::new());
        let _w = EvalContext::enter(&context, Node::entry("w"));
        let _x = EvalContext::enter(&context, Node::entry("x"));
        let _y = EvalContext::enter(&context, Node::entry("y"));

        let ctx = context.borrow();
        assert!(ctx.contains(&Node::entry("x")));
        assert!(!ctx.contains(&Node::entry("z")));
        assert_eq!(ctx.cycle_path(&Node::entry("x")), vec!["x", "y", "x"]);
    }

    #[test]
    fn frame_pops_during_unwind() {
        let context = RefCell::new(EvalContext::new());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _frame = EvalContext::enter(&context, Node::entry("boom"));
            panic!("computation failed");
        }));

        assert!(result.is_err());
        assert!(context.borrow().is_idle());
    }
}
