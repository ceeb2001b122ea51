//! FP-growth: pattern growth on a prefix tree of the transactions.
//!
//! For every item, the paths leading to its nodes form the conditional
//! database of the item, which is compressed into a conditional tree and
//! mined recursively. A tree without branches is enumerated directly.

pub mod builder;
pub mod tree;

pub use tree::{FpNode, FpTree};

use log::debug;

use self::builder::{build_conditional_fp_tree, build_fp_tree};
use crate::config::MinerConfig;
use crate::data::{Item, Supp, TransactionStore};
use crate::error::Result;
use crate::memory::estimate_tree;
use crate::miner::Context;
use crate::report::Reporter;

struct FpGrowth<'a, 'c, R> {
    smin: Supp,
    perfect: bool,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
}

impl<'a, 'c, R: Reporter> FpGrowth<'a, 'c, R> {
    fn rec(&mut self, tree: &FpTree) -> Result<()> {
        self.ctx.check()?;
        if let Some(path) = tree.single_path() {
            return self.single(&path);
        }
        let pex = if self.perfect { self.rep.support() } else { Supp::MAX };
        let items: Vec<(Item, Supp)> = tree
            .items()
            .into_iter()
            .map(|item| (item, tree.support(item)))
            .filter(|&(_, supp)| supp >= self.smin)
            .collect();
        let mut exclude = Vec::new();
        for &(item, supp) in &items {
            if supp >= pex {
                self.rep.add_pex(item);
                exclude.push(item);
            }
        }
        for &(item, supp) in items.iter().rev() {
            if supp >= pex || !self.rep.add(item, supp)? {
                continue;
            }
            if self.rep.extendable(1) {
                let paths = tree.prefix_paths(item);
                if !paths.is_empty() {
                    let cond = build_conditional_fp_tree(&paths, self.smin, &exclude);
                    let _guard = self.ctx.reserve(estimate_tree::<FpNode>(cond.len()))?;
                    if !cond.is_empty() {
                        self.rec(&cond)?;
                    }
                }
            }
            self.rep.report()?;
            self.rep.remove(1);
        }
        Ok(())
    }

    /// Enumerates the subsets of a branch-free tree. Counts do not grow
    /// along the path, so below an item every item above it has the item's
    /// own count.
    fn single(&mut self, path: &[(Item, Supp)]) -> Result<()> {
        let pex = if self.perfect { self.rep.support() } else { Supp::MAX };
        let folded = path.iter().take_while(|&&(_, supp)| supp >= pex).count();
        for &(item, _) in &path[..folded] {
            self.rep.add_pex(item);
        }
        for j in (folded..path.len()).rev() {
            let (item, supp) = path[j];
            if supp < self.smin || !self.rep.add(item, supp)? {
                continue;
            }
            if j > folded && self.rep.extendable(1) {
                let above: Vec<(Item, Supp)> = path[folded..j].iter().map(|&(i, _)| (i, supp)).collect();
                self.single(&above)?;
            }
            self.rep.report()?;
            self.rep.remove(1);
        }
        Ok(())
    }
}

/// Runs FP-growth over a prepared store, reporting the empty set last.
pub fn mine<R: Reporter>(
    store: &TransactionStore,
    config: &MinerConfig,
    rep: &mut R,
    ctx: &Context<'_>,
) -> Result<()> {
    let smin = rep.min_support();
    if store.total_weight() < smin {
        return Ok(());
    }
    let tree = build_fp_tree(store, smin);
    let _guard = ctx.reserve(estimate_tree::<FpNode>(tree.len()))?;
    debug!("fpgrowth: {} node(s) over {} item(s)", tree.len(), tree.header_table.len());
    let mut miner = FpGrowth { smin, perfect: config.mode.perfect, rep: &mut *rep, ctx };
    if miner.rep.extendable(1) {
        miner.rec(&tree)?;
    }
    rep.report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::miner::RunState;
    use crate::report::ItemSetReporter;

    fn scenario() -> TransactionStore {
        TransactionStore::from_transactions(
            &[vec![0, 1, 2], vec![0, 1], vec![0, 2, 3], vec![1, 2], vec![0, 1, 2, 3]],
            2,
        )
    }

    fn run(cfg: &MinerConfig, store: &TransactionStore) -> Vec<(Vec<usize>, u64)> {
        let state = RunState::default();
        let mut rep = ItemSetReporter::new(cfg, store);
        mine(store, cfg, &mut rep, &state.context()).unwrap();
        rep.finish().to_pairs()
    }

    #[test]
    fn test_scenario_all_sets() {
        for perfect in [true, false] {
            let mut cfg = MinerConfig::new(Target::All, -2.0);
            cfg.mode.perfect = perfect;
            let found = run(&cfg, &scenario());
            assert_eq!(found.len(), 11);
            assert!(found.contains(&(vec![0, 2, 3], 2)));
            assert!(!found.iter().any(|(items, _)| items == &vec![1, 3]));
        }
    }

    #[test]
    fn test_single_path_tree() {
        let store = TransactionStore::from_transactions(&[vec![0, 1, 2], vec![0, 1, 2], vec![0, 1]], 1);
        for perfect in [true, false] {
            let mut cfg = MinerConfig::new(Target::All, -1.0);
            cfg.mode.perfect = perfect;
            let found = run(&cfg, &store);
            assert_eq!(found.len(), 7);
            assert!(found.contains(&(vec![0, 1], 3)));
            assert!(found.contains(&(vec![0, 1, 2], 2)));
            assert!(found.contains(&(vec![2], 2)));
        }
    }

    #[test]
    fn test_closed_from_single_path() {
        let store = TransactionStore::from_transactions(&[vec![0, 1, 2], vec![0, 1, 2], vec![0, 1]], 1);
        let found = run(&MinerConfig::new(Target::Closed, -1.0), &store);
        assert_eq!(found, vec![(vec![0, 1], 3), (vec![0, 1, 2], 2)]);
    }
}
