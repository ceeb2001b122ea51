//! Tree-based RElim: the transactions form a prefix tree over descending
//! items. Processing the first top-level node copies its subtree for the
//! recursion and merges its children into the remaining siblings, which is
//! the tree form of elimination. Copies live above an arena mark and are
//! released by one rollback.

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
            let Word::Item(item) = word(self.tree.node(list).word) else {
                break;
            };
            let mark = self.tree.mark();
            let proj = self.tree.copy(list);
            let TreeNode { children, sibling, .. } = self.tree.node(list);
            list = self.tree.merge(children, sibling);
            let TreeNode { wgt, children: sub, .. } = self.tree.node(proj);
            if wgt >= pex {
                self.rep.add_pex(item);
            } else if wgt >= self.smin && self.rep.add(item, wgt)? {
                if sub != NIL && self.rep.extendable(1) {
                    let _guard = self.ctx.reserve(estimate_tree::<TreeNode>(self.tree.since(mark)))?;
                    self.rec(sub)?;
                }
                self.rep.report()?;
                self.rep.remove(1);
            }
            self.tree.rollback(mark);
        }
        if list != NIL {
            if let Some(m16) = self.m16.as_mut() {
                while list != NIL {
                    let node = self.tree.node(list);
                    if let Word::Packed(mask) = word(node.word) {
                        m16.add(mask, node.wgt);
                    }
                    list = node.sibling;
                }
                m16.mine(&mut *self.rep, self.ctx)?;
            }
        }
        Ok(())
    }
}
