//! Transaction id list engines: Eclat and Accretion.
//!
//! Every item keeps the ascending list of the transactions containing it.
//! Extending a prefix by an item intersects the item's list with the lists
//! of the other remaining items; the intersections are the projection for
//! the next level. All lists of one level share a single id buffer.

pub mod accretion;

use std::cmp::Ordering;

use log::debug;

use crate::config::MinerConfig;
use crate::data::{Item, Supp, TransactionStore};
use crate::error::Result;
use crate::memory::estimate_tidlists;
use crate::miner::Context;
use crate::report::Reporter;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Head {
    pub item: Item,
    pub supp: Supp,
    /// Extension p-value (Accretion); zero otherwise.
    pub pval: f64,
    start: usize,
    end: usize,
}

/// The tid lists of one recursion level.
#[derive(Debug, Default)]
pub(crate) struct TidLists {
    heads: Vec<Head>,
    tids: Vec<u32>,
}

impl TidLists {
    pub fn with_capacity(lists: usize, tids: usize) -> Self {
        Self { heads: Vec::with_capacity(lists), tids: Vec::with_capacity(tids) }
    }

    /// One list per item of `store`, with the transaction weights.
    pub fn build(store: &TransactionStore) -> (Self, Vec<Supp>) {
        let counts = store.occurrence_counts();
        let mut heads = Vec::with_capacity(counts.len());
        let mut start = 0;
        for (item, &c) in counts.iter().enumerate() {
            heads.push(Head { item, supp: 0, pval: 0.0, start, end: start });
            start += c;
        }
        let mut tids = vec![0u32; start];
        let mut muls = Vec::with_capacity(store.len());
        for (tid, t) in store.iter().enumerate() {
            muls.push(t.weight);
            for &item in &t.items {
                let h = &mut heads[item];
                tids[h.end] = tid as u32;
                h.end += 1;
                h.supp += t.weight;
            }
        }
        (Self { heads, tids }, muls)
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    pub fn head(&self, i: usize) -> Head {
        self.heads[i]
    }

    pub fn heads(&self) -> &[Head] {
        &self.heads
    }

    pub fn tids(&self, i: usize) -> &[u32] {
        let h = &self.heads[i];
        &self.tids[h.start..h.end]
    }

    /// Number of ids over all lists.
    pub fn extent(&self) -> usize {
        self.tids.len()
    }

    /// Keeps the lists matching `keep`, compacting the id buffer.
    pub fn retain(&mut self, mut keep: impl FnMut(&Head) -> bool) {
        let mut tids = Vec::with_capacity(self.tids.len());
        let mut heads = Vec::with_capacity(self.heads.len());
        for h in &self.heads {
            if keep(h) {
                let start = tids.len();
                tids.extend_from_slice(&self.tids[h.start..h.end]);
                heads.push(Head { start, end: tids.len(), ..*h });
            }
        }
        self.heads = heads;
        self.tids = tids;
    }

    /// Sorts the lists by `cmp` (the id buffer stays in place).
    pub fn sort_by(&mut self, cmp: impl FnMut(&Head, &Head) -> Ordering) {
        self.heads.sort_by(cmp);
    }

    /// Appends the intersection of two id lists as a list for `item`.
    pub fn push_isect(&mut self, item: Item, a: &[u32], b: &[u32], muls: &[Supp]) -> Supp {
        let start = self.tids.len();
        let mut supp = 0;
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    self.tids.push(a[i]);
                    supp += muls[a[i] as usize];
                    i += 1;
                    j += 1;
                }
            }
        }
        self.heads.push(Head { item, supp, pval: 0.0, start, end: self.tids.len() });
        supp
    }

    /// Appends the ids of `src` that carry a non-zero mark as a list for `item`.
    pub fn push_filter(&mut self, item: Item, src: &[u32], marks: &[Supp]) -> Supp {
        let start = self.tids.len();
        let mut supp = 0;
        for &tid in src {
            let m = marks[tid as usize];
            if m > 0 {
                self.tids.push(tid);
                supp += m;
            }
        }
        self.heads.push(Head { item, supp, pval: 0.0, start, end: self.tids.len() });
        supp
    }

    pub fn set_pval(&mut self, pval: f64) {
        if let Some(h) = self.heads.last_mut() {
            h.pval = pval;
        }
    }

    /// Drops the list appended last.
    pub fn pop(&mut self) {
        if let Some(h) = self.heads.pop() {
            self.tids.truncate(h.start);
        }
    }
}

struct Eclat<'a, 'c, R> {
    muls: Vec<Supp>,
    marks: Vec<Supp>,
    smin: Supp,
    perfect: bool,
    isect: usize,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
}

impl<'a, 'c, R: Reporter> Eclat<'a, 'c, R> {
    fn rec(&mut self, lists: &TidLists) -> Result<()> {
        self.ctx.check()?;
        for i in (0..lists.len()).rev() {
            let head = lists.head(i);
            if !self.rep.add(head.item, head.supp)? {
                continue;
            }
            if i > 0 && self.rep.extendable(1) {
                let own = lists.tids(i).len();
                let bound: usize = (0..i).map(|j| lists.tids(j).len().min(own)).sum();
                let _guard = self.ctx.reserve(estimate_tidlists(i, bound))?;
                let proj = self.project(lists, i, bound);
                if !proj.is_empty() {
                    self.rec(&proj)?;
                }
            }
            self.rep.report()?;
            self.rep.remove(1);
        }
        Ok(())
    }

    /// Intersects list `i` with lists `0..i`. Perfect extensions go to the
    /// reporter, infrequent intersections are dropped.
    fn project(&mut self, lists: &TidLists, i: usize, bound: usize) -> TidLists {
        let head = lists.head(i);
        let own = lists.tids(i);
        let pex = if self.perfect { head.supp } else { Supp::MAX };
        let mut proj = TidLists::with_capacity(i, bound);
        let marked = i > self.isect;
        if marked {
            for &t in own {
                self.marks[t as usize] = self.muls[t as usize];
            }
        }
        for j in 0..i {
            let other = lists.head(j);
            let supp = if marked {
                proj.push_filter(other.item, lists.tids(j), &self.marks)
            } else {
                proj.push_isect(other.item, lists.tids(j), own, &self.muls)
            };
            if supp >= pex {
                proj.pop();
                self.rep.add_pex(other.item);
            } else if supp < self.smin {
                proj.pop();
            }
        }
        if marked {
            for &t in own {
                self.marks[t as usize] = 0;
            }
        }
        proj
    }
}

/// Runs Eclat over a prepared store, reporting the empty set last.
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
    let (mut lists, muls) = TidLists::build(store);
    let _guard = ctx.reserve(estimate_tidlists(lists.len(), lists.extent()))?;
    let perfect = config.mode.perfect;
    let total = rep.support();
    for h in lists.heads() {
        if perfect && h.supp >= total {
            rep.add_pex(h.item);
        }
    }
    lists.retain(|h| h.supp >= smin && !(perfect && h.supp >= total));
    debug!("eclat: {} list(s), {} id(s)", lists.len(), lists.extent());
    let mut miner = Eclat {
        marks: vec![0; muls.len()],
        muls,
        smin,
        perfect,
        isect: config.heuristics.eclat_isect,
        rep: &mut *rep,
        ctx,
    };
    if miner.rep.extendable(1) {
        miner.rec(&lists)?;
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
    fn test_build_lists() {
        let store = scenario();
        let (lists, muls) = TidLists::build(&store);
        assert_eq!(lists.len(), 4);
        assert_eq!(muls, vec![1; 5]);
        assert_eq!(lists.head(3).supp, 2);
        assert_eq!(lists.tids(3), &[2, 4]);
    }

    #[test]
    fn test_isect_and_filter_agree() {
        let muls = vec![1, 2, 1, 3];
        let mut marks = vec![0; 4];
        let a = [0u32, 1, 3];
        let b = [1u32, 2, 3];
        for &t in &b {
            marks[t as usize] = muls[t as usize];
        }
        let mut lists = TidLists::default();
        assert_eq!(lists.push_isect(0, &a, &b, &muls), 5);
        assert_eq!(lists.push_filter(1, &a, &marks), 5);
        assert_eq!(lists.tids(0), lists.tids(1));
        lists.pop();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists.extent(), 2);
    }

    #[test]
    fn test_both_intersections_on_scenario() {
        let store = scenario();
        let mut expected = None;
        for isect in [0, 2, 100] {
            let mut cfg = MinerConfig::new(Target::All, -2.0);
            cfg.heuristics.eclat_isect = isect;
            let found = run(&cfg, &store);
            assert_eq!(found.len(), 11);
            assert_eq!(*expected.get_or_insert_with(|| found.clone()), found);
        }
    }

    #[test]
    fn test_maximal_scenario() {
        let cfg = MinerConfig::new(Target::Maximal, -2.0);
        let found = run(&cfg, &scenario());
        assert_eq!(found, vec![(vec![0, 1, 2], 2), (vec![0, 2, 3], 2)]);
    }

    #[test]
    fn test_perfect_extension_of_empty_prefix() {
        let store = TransactionStore::from_transactions(&[vec![0, 1], vec![0, 2], vec![0, 1, 2]], 1);
        let mut with = MinerConfig::new(Target::All, -1.0);
        with.zmin = 0;
        let mut without = with.clone();
        without.mode.perfect = false;
        let a = run(&with, &store);
        assert_eq!(a, run(&without, &store));
        assert_eq!(a.len(), 8);
    }
}
