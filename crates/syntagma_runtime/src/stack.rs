//! The GLR stack graph.
//!
//! Parse stacks share suffixes: a node has one `prev` link, and any
//! number of nodes may point at it. Nodes are reference counted, with
//! one reference held per presence in the tops list and one per
//! incoming `prev` or `sub` link.
//!
//! Dropping the last handle to a long stack must not recurse node by
//! node, so [`NodeRef`]'s destructor tears chains down with an explicit
//! worklist: each exclusively-owned node surrenders its `prev` and
//! `sub` links into the worklist instead of dropping them in place.

use crate::tables::Reduce;
use std::rc::Rc;

/// Payload of a stack node.
#[derive(Debug)]
pub enum NodeVariant<'v, V> {
    /// Shift of a value-less terminal, or the start state.
    Plain,
    /// Shift of a valued terminal; the value lives in a pool owned by
    /// the scanner side.
    Value(&'v V),
    /// Result of a reduce. `sub` is the last stack node of the reduced
    /// span (the span is walked backwards through `prev` links).
    Nt {
        reduce: Reduce,
        sub: Option<NodeRef<'v, V>>,
    },
}

/// One node of the stack graph.
#[derive(Debug)]
pub struct StackNode<'v, V> {
    state: u32,
    prev: Option<NodeRef<'v, V>>,
    variant: NodeVariant<'v, V>,
}

impl<'v, V> StackNode<'v, V> {
    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn prev(&self) -> Option<&StackNode<'v, V>> {
        self.prev.as_deref()
    }

    /// The owning handle of the predecessor, for linking new nodes to
    /// an existing chain.
    pub fn prev_handle(&self) -> Option<&NodeRef<'v, V>> {
        self.prev.as_ref()
    }

    pub fn variant(&self) -> &NodeVariant<'v, V> {
        &self.variant
    }

    /// The value of a valued-terminal node.
    ///
    /// # Panics
    ///
    /// Panics on non-value nodes; callers dispatch on the reduce rule
    /// and know the element shapes.
    pub fn value(&self) -> &'v V {
        match self.variant {
            NodeVariant::Value(value) => value,
            _ => panic!("illegal state: value of a non-value stack node"),
        }
    }

    /// The reduce that produced a nonterminal node.
    ///
    /// # Panics
    ///
    /// Panics on non-nonterminal nodes.
    pub fn reduce(&self) -> Reduce {
        match self.variant {
            NodeVariant::Nt { reduce, .. } => reduce,
            _ => panic!("illegal state: reduce of a non-nonterminal stack node"),
        }
    }

    /// The nodes of the reduced span, first element first.
    ///
    /// # Panics
    ///
    /// Panics on non-nonterminal nodes.
    pub fn sub_elements(&self) -> Vec<&StackNode<'v, V>> {
        let (reduce, sub) = match &self.variant {
            NodeVariant::Nt { reduce, sub } => (reduce, sub),
            _ => panic!("illegal state: sub elements of a non-nonterminal stack node"),
        };
        let mut elements: Vec<&StackNode<'v, V>> = Vec::with_capacity(reduce.length as usize);
        let mut current = sub.as_deref();
        for _ in 0..reduce.length {
            let node = current.expect("reduce span shorter than its length");
            elements.push(node);
            current = node.prev();
        }
        elements.reverse();
        elements
    }
}

/// Owning handle to a stack node.
///
/// Cloning bumps the reference count; dropping the last clone frees
/// the node and iteratively releases whatever it was the only owner
/// of.
#[derive(Debug)]
pub struct NodeRef<'v, V>(Option<Rc<StackNode<'v, V>>>);

impl<'v, V> NodeRef<'v, V> {
    /// A node occupying a start state, with no predecessor.
    pub fn start(state: u32) -> Self {
        Self::make(state, None, NodeVariant::Plain)
    }

    /// A node produced by shifting a value-less terminal.
    pub fn plain(state: u32, prev: NodeRef<'v, V>) -> Self {
        Self::make(state, Some(prev), NodeVariant::Plain)
    }

    /// A node produced by shifting a valued terminal.
    pub fn value(state: u32, prev: NodeRef<'v, V>, value: &'v V) -> Self {
        Self::make(state, Some(prev), NodeVariant::Value(value))
    }

    /// A node produced by a reduce. `prev` is the node below the
    /// reduced span; `sub` is the span's last node.
    pub fn nonterminal(
        state: u32,
        prev: NodeRef<'v, V>,
        reduce: Reduce,
        sub: NodeRef<'v, V>,
    ) -> Self {
        Self::make(state, Some(prev), NodeVariant::Nt { reduce, sub: Some(sub) })
    }

    fn make(state: u32, prev: Option<NodeRef<'v, V>>, variant: NodeVariant<'v, V>) -> Self {
        NodeRef(Some(Rc::new(StackNode { state, prev, variant })))
    }

    fn rc(&self) -> &Rc<StackNode<'v, V>> {
        self.0.as_ref().expect("use of a dismantled stack handle")
    }
}

impl<'v, V> Clone for NodeRef<'v, V> {
    fn clone(&self) -> Self {
        NodeRef(Some(Rc::clone(self.rc())))
    }
}

impl<'v, V> std::ops::Deref for NodeRef<'v, V> {
    type Target = StackNode<'v, V>;

    fn deref(&self) -> &StackNode<'v, V> {
        self.rc()
    }
}

impl<'v, V> Drop for NodeRef<'v, V> {
    fn drop(&mut self) {
        // Nonterminal nodes reference two chains (previous and sub
        // elements), so teardown is a worklist, not a walk.
        let mut pending: Vec<Rc<StackNode<'v, V>>> = Vec::new();
        let mut current = self.0.take();
        while let Some(rc) = current {
            if let Ok(node) = Rc::try_unwrap(rc) {
                if let Some(mut prev) = node.prev {
                    if let Some(inner) = prev.0.take() {
                        pending.push(inner);
                    }
                }
                if let NodeVariant::Nt { sub: Some(mut sub), .. } = node.variant {
                    if let Some(inner) = sub.0.take() {
                        pending.push(inner);
                    }
                }
            }
            current = pending.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{Reduce, ReduceAction};

    fn reduce(length: u32) -> Reduce {
        Reduce {
            length,
            nt: 0,
            action: ReduceAction::Rule(0),
        }
    }

    #[test]
    fn sub_elements_come_back_in_span_order() {
        let value_a = 10u32;
        let value_b = 20u32;
        let start = NodeRef::start(0);
        let a = NodeRef::value(1, start.clone(), &value_a);
        let b = NodeRef::value(2, a.clone(), &value_b);
        let nt = NodeRef::nonterminal(3, start.clone(), reduce(2), b.clone());

        let elements = nt.sub_elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(*elements[0].value(), 10);
        assert_eq!(*elements[1].value(), 20);
    }

    #[test]
    fn zero_length_reduce_has_no_sub_elements() {
        let start = NodeRef::<u32>::start(0);
        let nt = NodeRef::nonterminal(1, start.clone(), reduce(0), start.clone());
        assert!(nt.sub_elements().is_empty());
    }

    #[test]
    fn shared_suffixes_survive_dropping_one_branch() {
        let start = NodeRef::<u32>::start(0);
        let shared = NodeRef::plain(1, start.clone());
        let left = NodeRef::plain(2, shared.clone());
        let right = NodeRef::plain(3, shared.clone());

        drop(left);
        assert_eq!(right.prev().unwrap().state(), 1);
        assert_eq!(right.prev().unwrap().prev().unwrap().state(), 0);
        drop(right);
        drop(shared);
        assert_eq!(start.state(), 0);
    }

    #[test]
    fn dropping_a_deep_stack_does_not_recurse() {
        // Would overflow the thread stack if teardown were recursive.
        let mut top = NodeRef::<u32>::start(0);
        for i in 1..200_000u32 {
            top = NodeRef::plain(i, top);
        }
        drop(top);
    }
}
