//! Index arena with stack-discipline checkpoints.
//!
//! Tree-based engines allocate their nodes here and refer to them by
//! [`NodeId`]. A [`Mark`] taken before a speculative copy lets the whole copy
//! be released in one step by [`Arena::rollback`].

use std::ops::{Index, IndexMut};

pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

#[derive(Debug, Clone)]
pub struct Arena<T> {
    nodes: Vec<T>,
    peak: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), peak: 0 }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { nodes: Vec::with_capacity(capacity), peak: 0 }
    }

    pub fn alloc(&mut self, node: T) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        if self.nodes.len() > self.peak {
            self.peak = self.nodes.len();
        }
        id
    }

    pub fn mark(&self) -> Mark {
        Mark(self.nodes.len())
    }

    /// Frees every node allocated after `mark`.
    pub fn rollback(&mut self, mark: Mark) {
        debug_assert!(mark.0 <= self.nodes.len());
        self.nodes.truncate(mark.0);
    }

    /// Nodes allocated since `mark`.
    pub fn since(&self, mark: Mark) -> usize {
        self.nodes.len() - mark.0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id as usize]
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<NodeId> for Arena<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &T {
        &self.nodes[id as usize]
    }
}

impl<T> IndexMut<NodeId> for Arena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id as usize]
    }
}
