//! Node storage for one grammar load.
//!
//! The loader builds the AST bottom-up while walking the accepted
//! stack graph: every declaration, syntax expression and constant
//! expression is placed into an arena and wired to its children with
//! plain references. Cross-links between declarations (a name
//! reference to its symbol, a cast to its type) are dense ids resolved
//! by the analysis passes, so the node graph itself stays acyclic and
//! immutable once built.
//!
//! An arena never moves or frees an individual node; everything it
//! holds dies together when the generator run ends. Element
//! destructors do not run, which is deliberate: nodes own nothing but
//! ids, interned symbols and references into sibling arenas.
//!
//! ## Example
//!
//! ```
//! use syntagma_base::Arena;
//!
//! struct Alternation<'a>(&'a [&'a u32]);
//!
//! let atoms: Arena<u32> = Arena::new();
//! let atom_refs: Arena<&u32> = Arena::new();
//! let alternations: Arena<Alternation<'_>> = Arena::new();
//!
//! let one = atoms.alloc(1);
//! let two = atoms.alloc(2);
//! let both = alternations.alloc(Alternation(atom_refs.alloc_slice(vec![one, two])));
//! assert_eq!(*both.0[1], 2);
//! assert_eq!(atoms.len(), 2);
//! ```

use bumpalo::Bump;
use std::cell::Cell;

/// Bump storage for one kind of AST node.
///
/// References handed out stay valid until the arena is dropped; the
/// arena is the only owner. [`len`](Arena::len) counts placed nodes,
/// slices by their element count.
pub struct Arena<T> {
    bump: Bump,
    count: Cell<usize>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Arena {
            bump: Bump::new(),
            count: Cell::new(0),
            _marker: std::marker::PhantomData,
        }
    }

    /// Places one node.
    pub fn alloc(&self, node: T) -> &T {
        self.count.set(self.count.get() + 1);
        self.bump.alloc(node)
    }

    /// Places a collected node list as one contiguous slice.
    ///
    /// Child lists come out of left-recursive parse trees, so callers
    /// gather them into a `Vec` first and hand the finished list over
    /// in one piece.
    pub fn alloc_slice(&self, nodes: Vec<T>) -> &[T] {
        self.count.set(self.count.get() + nodes.len());
        self.bump.alloc_slice_fill_iter(nodes)
    }

    /// Number of nodes placed so far.
    pub fn len(&self) -> usize {
        self.count.get()
    }

    /// True while nothing has been placed.
    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in for an expression node: a dense id plus a child list
    /// living in a sibling arena, the way the grammar AST links its
    /// sub-expressions.
    struct Node<'a> {
        id: u32,
        children: &'a [&'a Node<'a>],
    }

    fn leaf<'a>(nodes: &'a Arena<Node<'a>>, id: u32) -> &'a Node<'a> {
        nodes.alloc(Node { id, children: &[] })
    }

    #[test]
    fn nodes_wire_into_a_graph() {
        let nodes: Arena<Node<'_>> = Arena::new();
        let refs: Arena<&Node<'_>> = Arena::new();

        let first = leaf(&nodes, 1);
        let second = leaf(&nodes, 2);
        let parent = nodes.alloc(Node {
            id: 3,
            children: refs.alloc_slice(vec![first, second]),
        });

        assert_eq!(parent.id, 3);
        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.children[0].id, 1);
        assert_eq!(parent.children[1].id, 2);
    }

    #[test]
    fn references_survive_later_allocations() {
        let arena: Arena<u64> = Arena::new();
        let first = arena.alloc(7);
        for value in 0..4096 {
            arena.alloc(value);
        }
        assert_eq!(*first, 7);
        assert_eq!(arena.len(), 4097);
    }

    #[test]
    fn len_counts_nodes_and_slice_elements() {
        let arena: Arena<u8> = Arena::new();
        assert!(arena.is_empty());

        let slice = arena.alloc_slice(vec![3, 1, 4]);
        assert_eq!(slice, &[3, 1, 4]);
        assert_eq!(arena.len(), 3);

        let empty = arena.alloc_slice(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(arena.len(), 3);

        arena.alloc(9);
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn deep_chains_stay_valid() {
        let nodes: Arena<Node<'_>> = Arena::new();
        let refs: Arena<&Node<'_>> = Arena::new();

        let mut current = leaf(&nodes, 0);
        for id in 1..500 {
            current = nodes.alloc(Node {
                id,
                children: refs.alloc_slice(vec![current]),
            });
        }

        let mut depth = 0;
        let mut walk = current;
        while let Some(&child) = walk.children.first() {
            depth += 1;
            walk = child;
        }
        assert_eq!(depth, 499);
    }
}
