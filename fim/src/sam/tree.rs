//! SaM on a prefix tree. A top-level node is the split part of its item;
//! after processing it the node's children are merged into the remaining
//! top-level list.

use crate::arena::NodeId;
use crate::data::prefix::{TreeNode, NIL};
use crate::data::suffix::word;
use crate::data::{PrefixTree, Suffixes, Supp, Word};
use crate::error::Result;
use crate::fim16::Fim16;
use crate::memory::estimate_tree;
use crate::miner::Context;
use crate::report::Reporter;

pub(super) struct Tree<'a, 'c, R> {
    tree: PrefixTree,
    smin: Supp,
    perfect: bool,
    m16: Option<Fim16>,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
}

impl<'a, 'c, R: Reporter> Tree<'a, 'c, R> {
    pub(super) fn new(
        suffixes: &Suffixes,
        smin: Supp,
        perfect: bool,
        m16: Option<Fim16>,
        rep: &'a mut R,
        ctx: &'a Context<'c>,
    ) -> Self {
        Self { tree: PrefixTree::build(suffixes), smin, perfect, m16, rep, ctx }
    }

    pub(super) fn run(&mut self) -> Result<()> {
        let _guard = self.ctx.reserve(estimate_tree::<TreeNode>(self.tree.len()))?;
        let top = self.tree.top();
        self.rec(top)
    }

    fn rec(&mut self, mut list: NodeId) -> Result<()> {
        self.ctx.check()?;
        let pex = if self.perfect { self.rep.support() } else { Supp::MAX };
        while list != NIL {
            let node = self.tree.node(list);
            let Word::Item(item) = word(node.word) else {
                if let Some(m16) = self.m16.as_mut() {
                    while list != NIL {
                        let n = self.tree.node(list);
                        if let Word::Packed(mask) = word(n.word) {
                            m16.add(mask, n.wgt);
                        }
                        list = n.sibling;
                    }
                    m16.mine(&mut *self.rep, self.ctx)?;
                }
                break;
            };
            if node.wgt >= self.smin {
                if node.wgt >= pex {
                    self.rep.add_pex(item);
                } else if self.rep.add(item, node.wgt)? {
                    if node.children != NIL && self.rep.extendable(1) {
                        let mark = self.tree.mark();
                        let proj = self.tree.copy_list(node.children);
                        let _guard = self.ctx.reserve(estimate_tree::<TreeNode>(self.tree.since(mark)))?;
                        self.rec(proj)?;
                        self.tree.rollback(mark);
                    }
                    self.rep.report()?;
                    self.rep.remove(1);
                }
            }
            list = self.tree.merge(node.sibling, node.children);
        }
        Ok(())
    }
}
