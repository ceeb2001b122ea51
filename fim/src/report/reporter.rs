use std::collections::HashSet;

use log::debug;

use super::repository::Repository;
use super::storage::{Pattern, PatternSet};
use super::Reporter;
use crate::config::{MinerConfig, Target};
use crate::data::{Item, Supp, TransactionStore};
use crate::error::Result;
use crate::eval::{ld_ratio, EvalMeasure};

/// Collects the item sets reported by an engine into a [`PatternSet`].
///
/// For target [`Target::All`] every report is filtered and stored right
/// away, with all subsets of the perfect extensions added to the prefix.
/// For the other targets the candidates go into a [`Repository`] first and
/// are selected in [`finish`](ItemSetReporter::finish), once every
/// superset and subset is known.
#[derive(Debug)]
pub struct ItemSetReporter {
    target: Target,
    smin: Supp,
    smax: Supp,
    zmin: usize,
    zmax: usize,
    border: Vec<Supp>,
    eval: EvalMeasure,
    thresh: f64,
    total: Supp,
    item_supports: Vec<Supp>,
    original: Vec<usize>,

    items: Vec<Item>,
    supps: Vec<Supp>,
    wgts: Vec<f64>,
    pexs: Vec<Item>,
    marks: Vec<usize>,

    found: Vec<Pattern>,
    repo: Option<Repository>,
    seen: Option<HashSet<Vec<Item>>>,
}

impl ItemSetReporter {
    pub fn new(config: &MinerConfig, store: &TransactionStore) -> Self {
        let total = store.total_weight();
        let repo = match config.target {
            Target::All => None,
            _ => Some(Repository::new()),
        };
        Self {
            target: config.target,
            smin: config.min_support(total),
            smax: config.max_support(total),
            zmin: config.zmin,
            zmax: config.zmax.unwrap_or(usize::MAX),
            border: config.border.clone(),
            eval: config.eval,
            thresh: config.thresh / 100.0,
            total,
            item_supports: store.supports().to_vec(),
            original: store.original_ids().to_vec(),
            items: Vec::new(),
            supps: vec![total],
            wgts: vec![total as f64],
            pexs: Vec::new(),
            marks: Vec::new(),
            found: Vec::new(),
            repo,
            seen: None,
        }
    }

    /// Drops repeated reports of the same set (engines that reach a set
    /// along several item orders).
    pub fn with_dedup(mut self) -> Self {
        self.seen = Some(HashSet::new());
        self
    }

    pub fn total(&self) -> Supp {
        self.total
    }

    pub fn max_support(&self) -> Supp {
        self.smax
    }

    /// Current perfect extensions, outermost first.
    pub fn perfect_extensions(&self) -> &[Item] {
        &self.pexs
    }

    /// Number of sets collected so far (candidates for filtered targets).
    pub fn collected(&self) -> usize {
        self.found.len() + self.repo.as_ref().map_or(0, Repository::len)
    }

    fn admits(&self, len: usize, supp: Supp) -> bool {
        if len < self.zmin || len > self.zmax {
            return false;
        }
        if supp < self.smin || supp > self.smax {
            return false;
        }
        match self.border.get(len) {
            Some(&min) => supp >= min,
            None => true,
        }
    }

    fn evaluate(&self, set: &[Item], supp: Supp) -> Option<f64> {
        match self.eval {
            EvalMeasure::LdRatio => {
                if set.len() < 2 {
                    return Some(0.0);
                }
                let supports: Vec<Supp> = set.iter().map(|&i| self.item_supports[i]).collect();
                let value = ld_ratio(supp, &supports, self.total);
                (value >= self.thresh).then_some(value)
            }
            // rule measures are applied by the engine through `report_eval`
            _ => Some(0.0),
        }
    }

    fn emit(&mut self, set: Vec<Item>, supp: Supp, wgt: f64, eval: Option<f64>) {
        if !self.admits(set.len(), supp) {
            return;
        }
        let value = match eval {
            Some(v) => v,
            None => match self.evaluate(&set, supp) {
                Some(v) => v,
                None => return,
            },
        };
        if let Some(seen) = &mut self.seen {
            if !seen.insert(set.clone()) {
                return;
            }
        }
        self.found.push(Pattern { items: set, support: supp, weight: wgt, eval: value });
    }

    fn emit_all(&mut self, eval: Option<f64>) {
        let n = self.items.len();
        if n > self.zmax {
            return;
        }
        let supp = self.support();
        let wgt = self.weight();
        let lo = self.zmin.saturating_sub(n);
        let hi = (self.zmax - n).min(self.pexs.len());
        if lo > hi {
            return;
        }
        let base = self.items.clone();
        let pexs = self.pexs.clone();
        let mut combo = Vec::with_capacity(hi);
        for k in lo..=hi {
            for_each_combination(&pexs, k, 0, &mut combo, &mut |chosen| {
                let mut set = base.clone();
                set.extend_from_slice(chosen);
                set.sort_unstable();
                self.emit(set, supp, wgt, eval);
            });
        }
    }

    fn store(&mut self, eval: Option<f64>) {
        let supp = self.support();
        let wgt = self.weight();
        let mut set = self.items.clone();
        if self.target != Target::Generators {
            set.extend_from_slice(&self.pexs);
        }
        set.sort_unstable();
        if let Some(repo) = &mut self.repo {
            repo.add_weighted(&set, supp, wgt, eval);
        }
    }

    fn report_with(&mut self, eval: Option<f64>) -> Result<()> {
        if self.support() < self.smin {
            return Ok(());
        }
        match self.target {
            Target::All => self.emit_all(eval),
            _ => self.store(eval),
        }
        Ok(())
    }

    fn selects(&self, repo: &Repository, set: &[Item], supp: Supp) -> bool {
        match self.target {
            Target::All => true,
            Target::Closed => !repo.has_superset(set, supp, true),
            Target::Maximal => !repo.has_superset(set, self.smin, true),
            Target::Generators => (0..set.len()).all(|skip| {
                let sub: Vec<Item> = set
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != skip)
                    .map(|(_, &item)| item)
                    .collect();
                let sub_supp = if sub.is_empty() { Some(self.total) } else { repo.support(&sub) };
                sub_supp.is_some_and(|s| s > supp)
            }),
        }
    }

    /// Applies the target selection and returns the sets over original item ids.
    pub fn finish(mut self) -> PatternSet {
        if let Some(repo) = self.repo.take() {
            debug!("selecting {} sets from {} candidate(s)", self.target, repo.len());
            for (set, stored) in repo.sets() {
                if self.selects(&repo, &set, stored.supp) {
                    self.emit(set, stored.supp, stored.wgt, stored.eval);
                }
            }
        }
        let original = &self.original;
        let mut patterns = std::mem::take(&mut self.found);
        for pattern in &mut patterns {
            for item in &mut pattern.items {
                *item = original[*item];
            }
            pattern.items.sort_unstable();
        }
        PatternSet::new(patterns)
    }
}

impl Reporter for ItemSetReporter {
    fn add(&mut self, item: Item, supp: Supp) -> Result<bool> {
        self.add_weighted(item, supp, supp as f64)
    }

    fn add_weighted(&mut self, item: Item, supp: Supp, wgt: f64) -> Result<bool> {
        if self.target == Target::Generators && supp >= self.support() {
            return Ok(false);
        }
        self.marks.push(self.pexs.len());
        self.items.push(item);
        self.supps.push(supp);
        self.wgts.push(wgt);
        Ok(true)
    }

    fn add_pex(&mut self, item: Item) {
        self.pexs.push(item);
    }

    fn remove(&mut self, n: usize) {
        for _ in 0..n {
            if self.items.pop().is_none() {
                break;
            }
            self.supps.pop();
            self.wgts.pop();
            if let Some(mark) = self.marks.pop() {
                self.pexs.truncate(mark);
            }
        }
    }

    fn report(&mut self) -> Result<()> {
        self.report_with(None)
    }

    fn report_eval(&mut self, eval: f64) -> Result<()> {
        self.report_with(Some(eval))
    }

    fn report_set(&mut self, items: &[Item], supp: Supp) -> Result<()> {
        if supp < self.smin {
            return Ok(());
        }
        let mut set = items.to_vec();
        set.sort_unstable();
        match &mut self.repo {
            Some(repo) => {
                repo.add(&set, supp);
            }
            None => self.emit(set, supp, supp as f64, None),
        }
        Ok(())
    }

    fn extendable(&self, n: usize) -> bool {
        let limit = match self.target {
            Target::Closed | Target::Maximal => self.zmax.saturating_add(1),
            _ => self.zmax,
        };
        self.items.len() + n <= limit
    }

    fn support(&self) -> Supp {
        self.supps.last().copied().unwrap_or(self.total)
    }

    fn weight(&self) -> f64 {
        self.wgts.last().copied().unwrap_or(self.total as f64)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn target(&self) -> Target {
        self.target
    }

    fn min_support(&self) -> Supp {
        self.smin
    }
}

fn for_each_combination<F>(items: &[Item], k: usize, start: usize, current: &mut Vec<Item>, callback: &mut F)
where
    F: FnMut(&[Item]),
{
    if current.len() == k {
        callback(current);
        return;
    }
    for i in start..items.len() {
        current.push(items[i]);
        for_each_combination(items, k, i + 1, current, callback);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TransactionStore {
        TransactionStore::from_transactions(
            &[vec![0, 1, 2], vec![0, 1], vec![0, 2, 3], vec![1, 2], vec![0, 1, 2, 3]],
            1,
        )
    }

    fn config(target: Target) -> MinerConfig {
        MinerConfig::new(target, -2.0)
    }

    #[test]
    fn test_perfect_extensions_expand_to_subsets() {
        let store = store();
        let mut rep = ItemSetReporter::new(&config(Target::All), &store);
        assert!(rep.add(3, 2).unwrap());
        rep.add_pex(0);
        rep.add_pex(2);
        rep.report().unwrap();
        rep.remove(1);
        assert!(rep.perfect_extensions().is_empty());
        let result = rep.finish();
        assert_eq!(
            result.to_pairs(),
            vec![(vec![3], 2), (vec![0, 3], 2), (vec![2, 3], 2), (vec![0, 2, 3], 2)]
        );
    }

    #[test]
    fn test_size_limits_restrict_subsets() {
        let store = store();
        let cfg = config(Target::All).with_size(2, Some(2));
        let mut rep = ItemSetReporter::new(&cfg, &store);
        rep.add(3, 2).unwrap();
        rep.add_pex(0);
        rep.add_pex(2);
        assert!(!rep.extendable(2));
        assert!(rep.extendable(1));
        rep.report().unwrap();
        let result = rep.finish();
        assert_eq!(result.to_pairs(), vec![(vec![0, 3], 2), (vec![2, 3], 2)]);
    }

    #[test]
    fn test_closed_selection() {
        let store = store();
        let mut rep = ItemSetReporter::new(&config(Target::Closed), &store);
        rep.report_set(&[0], 4).unwrap();
        rep.report_set(&[0, 1], 3).unwrap();
        rep.report_set(&[1], 3).unwrap();
        rep.report_set(&[3, 0, 2], 2).unwrap();
        rep.report_set(&[0, 3], 2).unwrap();
        rep.report_set(&[2], 1).unwrap();
        let result = rep.finish();
        assert_eq!(result.to_pairs(), vec![(vec![0], 4), (vec![0, 1], 3), (vec![0, 2, 3], 2)]);
    }

    #[test]
    fn test_maximal_selection() {
        let store = store();
        let mut rep = ItemSetReporter::new(&config(Target::Maximal), &store);
        rep.report_set(&[0, 1, 2], 2).unwrap();
        rep.report_set(&[0, 1], 3).unwrap();
        rep.report_set(&[0, 2, 3], 2).unwrap();
        let result = rep.finish();
        assert_eq!(result.to_pairs(), vec![(vec![0, 1, 2], 2), (vec![0, 2, 3], 2)]);
    }

    #[test]
    fn test_generators_need_strictly_larger_subsets() {
        let store = store();
        let mut rep = ItemSetReporter::new(&config(Target::Generators), &store);
        rep.add(0, 4).unwrap();
        rep.report().unwrap();
        assert!(rep.add(3, 2).unwrap());
        rep.report().unwrap();
        rep.remove(2);
        rep.add(3, 2).unwrap();
        rep.report().unwrap();
        // equal support to the prefix: never a generator
        assert!(!rep.add(2, 2).unwrap());
        rep.remove(1);
        let result = rep.finish();
        assert_eq!(result.to_pairs(), vec![(vec![0], 4), (vec![3], 2)]);
    }

    #[test]
    fn test_ld_ratio_threshold() {
        let store = store();
        let mut cfg = config(Target::All);
        cfg.eval = EvalMeasure::LdRatio;
        cfg.thresh = 0.0;
        let mut rep = ItemSetReporter::new(&cfg, &store);
        rep.add(0, 4).unwrap();
        rep.report().unwrap();
        rep.add(3, 2).unwrap();
        // log2(2*5/(4*2)) > 0
        rep.report().unwrap();
        rep.remove(1);
        rep.add(1, 3).unwrap();
        // log2(3*5/(4*4)) < 0
        rep.report().unwrap();
        rep.remove(2);
        let result = rep.finish();
        assert_eq!(result.to_pairs(), vec![(vec![0], 4), (vec![0, 3], 2)]);
        assert!(result.patterns()[1].eval > 0.0);
    }

    #[test]
    fn test_dedup() {
        let store = store();
        let mut rep = ItemSetReporter::new(&config(Target::All), &store).with_dedup();
        rep.report_set(&[1, 0], 3).unwrap();
        rep.report_set(&[0, 1], 3).unwrap();
        assert_eq!(rep.finish().len(), 1);
    }
}
