//! Prefix tree over transaction suffixes for the tree variants of RElim and
//! SaM. Sibling lists are kept in descending word [`rank`], so packed masks
//! trail the item nodes of every level. Nodes live in an [`Arena`]; copies
//! made for a projection are released by rolling back to a mark.

use std::cmp::Ordering;

use super::suffix::{rank, END};
use super::{Suffixes, Supp};
use crate::arena::{Arena, Mark, NodeId};

pub const NIL: NodeId = NodeId::MAX;

#[derive(Debug, Clone, Copy)]
pub struct TreeNode {
    /// Raw suffix word: an item or a packed mask.
    pub word: usize,
    pub wgt: Supp,
    pub sibling: NodeId,
    pub children: NodeId,
}

#[derive(Debug)]
pub struct PrefixTree {
    nodes: Arena<TreeNode>,
    root: NodeId,
}

impl PrefixTree {
    /// Builds the tree of all transactions of `suffixes`.
    pub fn build(suffixes: &Suffixes) -> Self {
        let mut nodes = Arena::with_capacity(suffixes.len() + 1);
        let root = nodes.alloc(TreeNode { word: END, wgt: 0, sibling: NIL, children: NIL });
        let mut tree = Self { nodes, root };
        for t in 0..suffixes.len() {
            let (start, wgt) = suffixes.transaction(t);
            tree.add(suffixes, start, wgt);
        }
        tree
    }

    fn add(&mut self, suffixes: &Suffixes, mut pos: usize, wgt: Supp) {
        let mut node = self.root;
        loop {
            self.nodes[node].wgt += wgt;
            let w = suffixes.raw(pos);
            if w == END {
                return;
            }
            pos += 1;
            let mut prev = NIL;
            let mut child = self.nodes[node].children;
            while child != NIL && rank(self.nodes[child].word) > rank(w) {
                prev = child;
                child = self.nodes[child].sibling;
            }
            if child != NIL && self.nodes[child].word == w {
                node = child;
                continue;
            }
            let created = self.nodes.alloc(TreeNode { word: w, wgt: 0, sibling: child, children: NIL });
            if prev == NIL {
                self.nodes[node].children = created;
            } else {
                self.nodes[prev].sibling = created;
            }
            node = created;
        }
    }

    /// First top-level node.
    pub fn top(&self) -> NodeId {
        self.nodes[self.root].children
    }

    /// Weight of the whole tree.
    pub fn weight(&self) -> Supp {
        self.nodes[self.root].wgt
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> TreeNode {
        self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top() == NIL
    }

    pub fn mark(&self) -> Mark {
        self.nodes.mark()
    }

    pub fn rollback(&mut self, mark: Mark) {
        self.nodes.rollback(mark);
    }

    pub fn since(&self, mark: Mark) -> usize {
        self.nodes.since(mark)
    }

    /// Deep copy of `src` and its subtree, detached from its siblings.
    pub fn copy(&mut self, src: NodeId) -> NodeId {
        let TreeNode { word, wgt, children, .. } = self.nodes[src];
        let dst = self.nodes.alloc(TreeNode { word, wgt, sibling: NIL, children: NIL });
        let copied = self.copy_list(children);
        self.nodes[dst].children = copied;
        dst
    }

    /// Deep copy of the sibling list starting at `src`.
    pub fn copy_list(&mut self, mut src: NodeId) -> NodeId {
        let mut head = NIL;
        let mut last = NIL;
        while src != NIL {
            let copied = self.copy(src);
            if last == NIL {
                head = copied;
            } else {
                self.nodes[last].sibling = copied;
            }
            last = copied;
            src = self.nodes[src].sibling;
        }
        head
    }

    /// Merges two descending sibling lists, combining nodes of equal words.
    pub fn merge(&mut self, mut a: NodeId, mut b: NodeId) -> NodeId {
        if a == NIL {
            return b;
        }
        if b == NIL {
            return a;
        }
        let mut head = NIL;
        let mut tail = NIL;
        while a != NIL && b != NIL {
            let taken = match rank(self.nodes[a].word).cmp(&rank(self.nodes[b].word)) {
                Ordering::Greater => {
                    let t = a;
                    a = self.nodes[a].sibling;
                    t
                }
                Ordering::Less => {
                    let t = b;
                    b = self.nodes[b].sibling;
                    t
                }
                Ordering::Equal => {
                    let (ca, cb) = (self.nodes[a].children, self.nodes[b].children);
                    let merged = self.merge(ca, cb);
                    let wb = self.nodes[b].wgt;
                    self.nodes[a].children = merged;
                    self.nodes[a].wgt += wb;
                    b = self.nodes[b].sibling;
                    let t = a;
                    a = self.nodes[a].sibling;
                    t
                }
            };
            if tail == NIL {
                head = taken;
            } else {
                self.nodes[tail].sibling = taken;
            }
            tail = taken;
        }
        self.nodes[tail].sibling = if a != NIL { a } else { b };
        head
    }
}
