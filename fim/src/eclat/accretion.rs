//! Accretion: grows item sets by statistically significant extensions.
//!
//! The lists of a level are ordered by the p-value of extending the prefix
//! with their item. Only extensions below the significance level are
//! followed, and below the root at most `maxext` of them. Every other
//! remaining item is a candidate for the next level, so one set can be
//! reached along several item orders; the reporter must drop repeats.

use log::debug;

use super::TidLists;
use crate::config::{AccretionConfig, MinerConfig, Target};
use crate::data::{Supp, TransactionStore};
use crate::error::Result;
use crate::eval::{Significance, SignificanceTest};
use crate::memory::estimate_tidlists;
use crate::miner::Context;
use crate::report::Reporter;

struct Accretion<'a, 'c, R> {
    target: Target,
    stat: SignificanceTest,
    invbxs: bool,
    siglvl: f64,
    maxext: usize,
    isect: usize,
    smin: Supp,
    total: Supp,
    /// Global support per item.
    supports: Vec<Supp>,
    muls: Vec<Supp>,
    marks: Vec<Supp>,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
}

impl<'a, 'c, R: Reporter> Accretion<'a, 'c, R> {
    fn pvalue(&self, supp: Supp, body: Supp, head: Supp) -> Result<f64> {
        if self.invbxs && (supp as f64) * (self.total as f64) <= (body as f64) * (head as f64) {
            return Ok(1.0);
        }
        self.stat.pvalue(supp, body, head, self.total)
    }

    /// Returns the largest support among the sets reported below `lists`.
    fn rec(&mut self, lists: &mut TidLists) -> Result<Supp> {
        self.ctx.check()?;
        let k = lists.len();
        let project = k > 1 && self.rep.extendable(2);
        lists.sort_by(|a, b| {
            a.pval
                .total_cmp(&b.pval)
                .then_with(|| b.supp.cmp(&a.supp))
                .then_with(|| a.item.cmp(&b.item))
        });
        let tried = if self.rep.is_empty() || k < self.maxext { k } else { self.maxext };
        let mut smax = 0;
        for i in 0..tried {
            let head = lists.head(i);
            if head.pval > self.siglvl {
                break;
            }
            if !self.rep.add(head.item, head.supp)? {
                continue;
            }
            let mut s = 0;
            if project {
                let own = lists.tids(i).len();
                let bound: usize = (0..k).filter(|&j| j != i).map(|j| lists.tids(j).len().min(own)).sum();
                let _guard = self.ctx.reserve(estimate_tidlists(k - 1, bound))?;
                let mut proj = self.project(lists, i, bound)?;
                if !proj.is_empty() {
                    s = self.rec(&mut proj)?;
                    smax = smax.max(s);
                }
            }
            if self.qualifies(s, head.supp) {
                smax = smax.max(head.supp);
                self.rep.report_eval(head.pval)?;
            }
            self.rep.remove(1);
        }
        Ok(smax)
    }

    /// Whether a set of support `supp` whose reported supersets reach at
    /// most `sub` is reported for the target.
    fn qualifies(&self, sub: Supp, supp: Supp) -> bool {
        match self.target {
            Target::Maximal => sub < self.smin,
            Target::Closed => sub < supp,
            _ => true,
        }
    }

    fn project(&mut self, lists: &TidLists, i: usize, bound: usize) -> Result<TidLists> {
        let k = lists.len();
        let head = lists.head(i);
        let own = lists.tids(i);
        let mut proj = TidLists::with_capacity(k - 1, bound);
        let marked = k > self.isect;
        if marked {
            for &t in own {
                self.marks[t as usize] = self.muls[t as usize];
            }
        }
        for j in (0..k).filter(|&j| j != i) {
            let other = lists.head(j);
            let supp = if marked {
                proj.push_filter(other.item, lists.tids(j), &self.marks)
            } else {
                proj.push_isect(other.item, lists.tids(j), own, &self.muls)
            };
            if supp < self.smin {
                proj.pop();
                continue;
            }
            let pval = self.pvalue(supp, head.supp, self.supports[other.item])?;
            proj.set_pval(pval);
        }
        if marked {
            for &t in own {
                self.marks[t as usize] = 0;
            }
        }
        Ok(proj)
    }
}

/// Runs Accretion over a prepared store. Closed and maximal selection is
/// done here, so the reporter should collect all reported sets.
pub fn mine<R: Reporter>(
    store: &TransactionStore,
    config: &MinerConfig,
    rep: &mut R,
    ctx: &Context<'_>,
) -> Result<()> {
    let smin = rep.min_support();
    let total = store.total_weight();
    if total < smin {
        return Ok(());
    }
    let AccretionConfig { stat, siglvl, maxext } = config.accretion;
    let (mut lists, muls) = TidLists::build(store);
    lists.retain(|h| h.supp >= smin);
    let _guard = ctx.reserve(estimate_tidlists(lists.len(), lists.extent()))?;
    debug!("accretion: {} item(s), test {:?}, level {}%", lists.len(), stat, siglvl);
    let mut miner = Accretion {
        target: config.target,
        stat,
        invbxs: config.mode.invbxs,
        siglvl: if siglvl > 0.0 { siglvl / 100.0 } else { 0.01 },
        maxext: maxext.max(1),
        isect: config.heuristics.eclat_isect,
        smin,
        total,
        supports: store.supports().to_vec(),
        marks: vec![0; muls.len()],
        muls,
        rep: &mut *rep,
        ctx,
    };
    let mut w = 0;
    if !lists.is_empty() {
        w = miner.rec(&mut lists)?;
    }
    if miner.qualifies(w, total) {
        rep.report_eval(1.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::RunState;
    use crate::report::ItemSetReporter;

    fn run(cfg: &MinerConfig, store: &TransactionStore) -> Vec<(Vec<usize>, u64)> {
        let state = RunState::default();
        let mut all = cfg.clone();
        all.target = Target::All;
        let mut rep = ItemSetReporter::new(&all, store).with_dedup();
        mine(store, cfg, &mut rep, &state.context()).unwrap();
        rep.finish().to_pairs()
    }

    fn correlated() -> TransactionStore {
        // items 0 and 1 always together, 2 independent of both
        let mut tracts = Vec::new();
        for i in 0..40 {
            let mut t = Vec::new();
            if i % 2 == 0 {
                t.extend([0, 1]);
            }
            if i % 4 < 2 {
                t.push(2);
            }
            tracts.push(t);
        }
        TransactionStore::from_transactions(&tracts, 1)
    }

    #[test]
    fn test_without_statistic_finds_all_frequent_sets() {
        let store = TransactionStore::from_transactions(
            &[vec![0, 1, 2], vec![0, 1], vec![0, 2, 3], vec![1, 2], vec![0, 1, 2, 3]],
            2,
        );
        let mut cfg = MinerConfig::new(Target::All, -2.0);
        cfg.accretion.stat = SignificanceTest::None;
        cfg.accretion.maxext = 10;
        let found = run(&cfg, &store);
        assert_eq!(found.len(), 11);
        assert_eq!(found[4], (vec![0, 1], 3));
    }

    #[test]
    fn test_only_significant_extensions() {
        let store = correlated();
        let mut cfg = MinerConfig::new(Target::All, -5.0);
        cfg.accretion.stat = SignificanceTest::ChiSquare;
        let found = run(&cfg, &store);
        let pairs: Vec<_> = found.iter().filter(|(items, _)| items.len() == 2).collect();
        assert_eq!(pairs, vec![&(vec![0, 1], 20)]);
    }

    #[test]
    fn test_closed_keeps_pair_only() {
        let store = correlated();
        let mut cfg = MinerConfig::new(Target::Closed, -5.0);
        cfg.accretion.stat = SignificanceTest::ChiSquare;
        let found = run(&cfg, &store);
        assert!(found.contains(&(vec![0, 1], 20)));
        assert!(!found.contains(&(vec![0], 20)));
        assert!(found.contains(&(vec![2], 20)));
    }
}
