//! Apriori: level-wise candidate generation and counting.
//!
//! The candidates live in a tree whose level `h` holds the sets of size
//! `h + 1`; the children of a node extend its set by one larger item.
//! Each round joins siblings into the next level, keeps the candidates
//! whose subsets are all frequent and counts them in one pass over the
//! transactions, either against a transaction prefix tree or the plain bag.

mod tatree;

use std::ops::Range;
use std::time::Instant;

use log::{debug, trace};

use self::tatree::{TaNode, TaTree};
use crate::config::{Algorithm, AprioriPrune, MinerConfig, Target};
use crate::data::{Item, Supp, Transaction, TransactionStore};
use crate::error::Result;
use crate::eval::{ld_ratio, EvalAgg, EvalMeasure};
use crate::memory::estimate_tree;
use crate::miner::Context;
use crate::report::Reporter;

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    /// Support equal to the parent's; folded into the parent when reporting.
    Perfect,
    /// Failed the evaluation and dropped.
    Removed,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    item: Item,
    supp: Supp,
    parent: u32,
    first: u32,
    end: u32,
    state: State,
    /// Failed the evaluation but stays joinable (weak forward pruning).
    failed: bool,
}

impl Node {
    fn new(item: Item, parent: u32) -> Self {
        Self { item, supp: 0, parent, first: 0, end: 0, state: State::Open, failed: false }
    }

    fn children(&self) -> Range<usize> {
        self.first as usize..self.end as usize
    }
}

/// Evaluation of the candidates, for forward pruning and, with a rule
/// measure, for filtering the output. A set of `k` items is rated by the
/// `k` rules with one item as head, combined as configured.
struct Evaluation {
    measure: EvalMeasure,
    agg: EvalAgg,
    invbxs: bool,
    /// `Some(strong)` for forward pruning.
    forward: Option<bool>,
    /// Smaller sets are not evaluated and count as passing.
    min: usize,
    thresh: f64,
    total: Supp,
    supports: Vec<Supp>,
}

impl Evaluation {
    fn new(config: &MinerConfig, store: &TransactionStore) -> Option<Self> {
        let (forward, min) = match config.apriori.prune {
            AprioriPrune::None => (None, 0),
            AprioriPrune::Backward(min) => (None, min),
            AprioriPrune::WeakForward(min) => (Some(false), min),
            AprioriPrune::StrongForward(min) => (Some(true), min),
        };
        // the log-ratio filters the output in the reporter
        if config.eval == EvalMeasure::None || (forward.is_none() && !config.eval.is_rule_measure()) {
            return None;
        }
        Some(Self {
            measure: config.eval,
            agg: config.apriori.agg,
            invbxs: config.mode.invbxs,
            forward,
            min: min.max(2),
            thresh: config.thresh / 100.0,
            total: store.total_weight(),
            supports: store.supports().to_vec(),
        })
    }

    fn filters_output(&self) -> bool {
        self.measure.is_rule_measure()
    }

    fn passes(&self, value: f64) -> bool {
        self.measure.passes(value, self.thresh)
    }

    fn rule(&self, supp: Supp, body: Supp, head: Supp) -> Result<f64> {
        if self.invbxs && (supp as f64) * (self.total as f64) <= (body as f64) * (head as f64) {
            return Ok(self.measure.worst());
        }
        self.measure.rule_value(supp, body, head, self.total)
    }

    /// Value of the set at node `i` of level `h`, `None` below the minimum size.
    fn value(&self, tree: &CandidateTree, h: usize, i: usize) -> Result<Option<f64>> {
        if h + 1 < self.min {
            return Ok(None);
        }
        let items = tree.path(h, i);
        let supp = tree.levels[h][i].supp;
        if self.measure == EvalMeasure::LdRatio {
            let supports: Vec<Supp> = items.iter().map(|&it| self.supports[it]).collect();
            return Ok(Some(ld_ratio(supp, &supports, self.total)));
        }
        let heads = match self.agg {
            EvalAgg::First => items.len() - 1..items.len(),
            _ => 0..items.len(),
        };
        let mut acc = match self.agg {
            EvalAgg::Min => f64::INFINITY,
            EvalAgg::Max => f64::NEG_INFINITY,
            _ => 0.0,
        };
        let mut rated = 0;
        let mut body: Vec<Item> = Vec::with_capacity(items.len());
        for x in heads {
            body.clear();
            body.extend(items.iter().enumerate().filter(|&(k, _)| k != x).map(|(_, &it)| it));
            let Some(b) = tree.find(&body) else {
                continue;
            };
            let v = self.rule(supp, b.supp, self.supports[items[x]])?;
            acc = match self.agg {
                EvalAgg::Min => acc.min(v),
                EvalAgg::Max => acc.max(v),
                _ => acc + v,
            };
            rated += 1;
        }
        if rated == 0 {
            return Ok(None);
        }
        if self.agg == EvalAgg::Avg {
            acc /= rated as f64;
        }
        Ok(Some(acc))
    }
}

/// The Apriori configuration of Apriori-style accretion: every rule of a
/// set must pass the significance test of `config.accretion`.
pub fn accretion_config(config: &MinerConfig) -> MinerConfig {
    let mut cfg = config.clone();
    cfg.algorithm = Algorithm::Apriori;
    cfg.eval = config.accretion.stat.into();
    cfg.thresh = config.accretion.siglvl;
    cfg.apriori.agg = EvalAgg::Max;
    cfg
}

struct CandidateTree {
    levels: Vec<Vec<Node>>,
    smin: Supp,
}

impl CandidateTree {
    fn new(items: usize, smin: Supp) -> Self {
        Self { levels: vec![(0..items).map(|i| Node::new(i, NIL)).collect()], smin }
    }

    fn height(&self) -> usize {
        self.levels.len()
    }

    fn joinable(&self, n: &Node) -> bool {
        n.supp >= self.smin && n.state == State::Open
    }

    fn path(&self, mut lvl: usize, mut idx: usize) -> Vec<Item> {
        let mut items = Vec::with_capacity(lvl + 1);
        loop {
            let n = &self.levels[lvl][idx];
            items.push(n.item);
            if lvl == 0 {
                break;
            }
            lvl -= 1;
            idx = n.parent as usize;
        }
        items.reverse();
        items
    }

    fn find(&self, items: &[Item]) -> Option<&Node> {
        let mut range = 0..self.levels[0].len();
        for (d, &item) in items.iter().enumerate() {
            let nodes = &self.levels.get(d)?[range];
            let node = &nodes[nodes.binary_search_by_key(&item, |n| n.item).ok()?];
            if d + 1 == items.len() {
                return Some(node);
            }
            range = node.children();
        }
        None
    }

    fn present(&self, items: &[Item]) -> Option<&Node> {
        self.find(items).filter(|n| n.supp >= self.smin && n.state != State::Removed)
    }

    /// Joins the siblings of the deepest level into a new level and
    /// returns the number of candidates created.
    fn add_level(&mut self) -> usize {
        let h = self.levels.len() - 1;
        let groups: Vec<Range<usize>> = if h == 0 {
            vec![0..self.levels[0].len()]
        } else {
            self.levels[h - 1].iter().map(Node::children).filter(|r| !r.is_empty()).collect()
        };
        let mut next = Vec::new();
        let mut cand: Vec<Item> = Vec::with_capacity(h + 2);
        let mut sub: Vec<Item> = Vec::with_capacity(h + 1);
        for group in groups {
            for i in group.clone() {
                let a = self.levels[h][i];
                let first = next.len() as u32;
                if self.joinable(&a) {
                    let base = self.path(h, i);
                    for j in i + 1..group.end {
                        let b = self.levels[h][j];
                        if !self.joinable(&b) {
                            continue;
                        }
                        cand.clear();
                        cand.extend_from_slice(&base);
                        cand.push(b.item);
                        // the subsets without the last two items are the
                        // only ones not known to be frequent; at least one
                        // subset has to pass the evaluation
                        let mut qualified = !a.failed || !b.failed;
                        let frequent = (0..cand.len() - 2).all(|x| {
                            sub.clear();
                            sub.extend(cand.iter().enumerate().filter(|&(k, _)| k != x).map(|(_, &it)| it));
                            match self.present(&sub) {
                                Some(n) => {
                                    qualified |= !n.failed;
                                    true
                                }
                                None => false,
                            }
                        });
                        if frequent && qualified {
                            next.push(Node::new(b.item, i as u32));
                        }
                    }
                }
                let node = &mut self.levels[h][i];
                node.first = first;
                node.end = next.len() as u32;
            }
        }
        let added = next.len();
        if added > 0 {
            self.levels.push(next);
        }
        added
    }

    fn count_bag(&mut self, lvl: usize, range: Range<usize>, items: &[Item], w: Supp) {
        let target = self.levels.len() - 1;
        let need = target - lvl;
        let mut j = 0;
        for i in range {
            let item = self.levels[lvl][i].item;
            while j < items.len() && items[j] < item {
                j += 1;
            }
            if j + need >= items.len() {
                break;
            }
            if items[j] != item {
                continue;
            }
            if lvl == target {
                self.levels[lvl][i].supp += w;
            } else {
                let children = self.levels[lvl][i].children();
                if !children.is_empty() {
                    self.count_bag(lvl + 1, children, &items[j + 1..], w);
                }
            }
            j += 1;
        }
    }

    fn count_tree(&mut self, lvl: usize, range: Range<usize>, tree: &TaTree, node: u32) {
        let target = self.levels.len() - 1;
        let need = target - lvl + 1;
        let last = self.levels[lvl][range.end - 1].item;
        for &c in &tree.node(node).children {
            let t: &TaNode = tree.node(c);
            if t.item > last {
                break;
            }
            if t.depth < need {
                continue;
            }
            if let Ok(k) = self.levels[lvl][range.clone()].binary_search_by_key(&t.item, |n| n.item) {
                let i = range.start + k;
                if lvl == target {
                    self.levels[lvl][i].supp += t.wgt;
                } else {
                    let children = self.levels[lvl][i].children();
                    if !children.is_empty() {
                        self.count_tree(lvl + 1, children, tree, c);
                    }
                }
            }
            if t.depth > need {
                self.count_tree(lvl, range.clone(), tree, c);
            }
        }
    }

    /// Marks the perfect extensions and evaluation failures of the deepest
    /// level; returns the number of frequent candidates.
    fn commit(&mut self, total: Supp, perfect: bool, eval: Option<&Evaluation>) -> Result<usize> {
        let h = self.levels.len() - 1;
        let mut frequent = 0;
        for i in 0..self.levels[h].len() {
            let n = self.levels[h][i];
            if n.supp < self.smin {
                continue;
            }
            frequent += 1;
            let parent = if h == 0 { total } else { self.levels[h - 1][n.parent as usize].supp };
            let mut failed = false;
            let mut state = State::Open;
            if perfect && n.supp >= parent {
                state = State::Perfect;
            } else if let Some((ev, strong)) = eval.and_then(|ev| ev.forward.map(|strong| (ev, strong))) {
                failed = ev.value(self, h, i)?.is_some_and(|v| !ev.passes(v));
                if failed && strong {
                    state = State::Removed;
                }
            }
            let node = &mut self.levels[h][i];
            node.state = state;
            node.failed = failed;
        }
        Ok(frequent)
    }

    /// Items of the joinable sets of the deepest level.
    fn used_items(&self, items: usize) -> (Vec<bool>, usize) {
        let h = self.levels.len() - 1;
        let mut used = vec![false; items];
        for (i, n) in self.levels[h].iter().enumerate() {
            if self.joinable(n) {
                for item in self.path(h, i) {
                    used[item] = true;
                }
            }
        }
        let count = used.iter().filter(|&&u| u).count();
        (used, count)
    }

    fn report_children<R: Reporter>(
        &self,
        lvl: usize,
        range: Range<usize>,
        eval: Option<&Evaluation>,
        rep: &mut R,
        ctx: &Context<'_>,
    ) -> Result<()> {
        if range.is_empty() {
            return Ok(());
        }
        let start = range.start;
        let nodes = &self.levels[lvl][range];
        for n in nodes.iter().filter(|n| n.supp >= self.smin && n.state == State::Perfect) {
            rep.add_pex(n.item);
        }
        if !rep.extendable(1) {
            return Ok(());
        }
        for (off, n) in nodes.iter().enumerate() {
            if n.supp < self.smin || matches!(n.state, State::Perfect | State::Removed) {
                continue;
            }
            ctx.check()?;
            if !rep.add(n.item, n.supp)? {
                continue;
            }
            if lvl + 1 < self.levels.len() {
                self.report_children(lvl + 1, n.children(), eval, rep, ctx)?;
            }
            match eval.filter(|ev| ev.filters_output()) {
                Some(ev) => match ev.value(self, lvl, start + off)? {
                    None => rep.report()?,
                    Some(v) if ev.passes(v) => rep.report_eval(v)?,
                    Some(_) => {}
                },
                None => rep.report()?,
            }
            rep.remove(1);
        }
        Ok(())
    }
}

/// Removes unused items and transactions too short for the next level,
/// then collates equal transactions.
fn shrink(tracts: &mut Vec<Transaction>, used: &[bool], min_len: usize) {
    for t in tracts.iter_mut() {
        t.items.retain(|&i| used[i]);
    }
    tracts.retain(|t| t.len() >= min_len);
    tracts.sort_by(|a, b| a.items.cmp(&b.items));
    tracts.dedup_by(|later, kept| {
        if later.items == kept.items {
            kept.weight += later.weight;
            true
        } else {
            false
        }
    });
}

/// Runs Apriori over a prepared store, reporting the empty set last.
pub fn mine<R: Reporter>(
    store: &TransactionStore,
    config: &MinerConfig,
    rep: &mut R,
    ctx: &Context<'_>,
) -> Result<()> {
    let smin = rep.min_support();
    let total = store.total_weight();
    if store.held_weight() < smin {
        return Ok(());
    }
    let k = store.item_count();
    if k == 0 {
        return rep.report();
    }
    let closing = matches!(rep.target(), Target::Closed | Target::Maximal);
    let evaluation = Evaluation::new(config, store);
    let pruning = config.eval != EvalMeasure::None && config.apriori.prune != AprioriPrune::None;
    let perfect = config.mode.perfect && !closing && !pruning && !config.eval.is_rule_measure();
    let zmax = config.zmax.unwrap_or(usize::MAX);
    let xmax = if closing { zmax.saturating_add(1) } else { zmax }.min(store.max_len());
    let filter = config.apriori.filter;

    let started = Instant::now();
    let mut tracts: Vec<Transaction> = store.transactions().to_vec();
    let mut tatree = config.mode.tatree.then(|| TaTree::build(&tracts));
    let mut tt = started.elapsed().as_secs_f64();
    let mut guard = ctx.reserve(
        estimate_tree::<Node>(k) + tatree.as_ref().map_or(0, |t| estimate_tree::<TaNode>(t.len())),
    )?;
    debug!(
        "apriori: {} item(s), {} transaction(s), tree {}, perfect extensions {}",
        k,
        tracts.len(),
        tatree.as_ref().map_or(0, TaTree::len),
        perfect
    );

    let mut cands = CandidateTree::new(k, smin);
    for t in &tracts {
        for &item in &t.items {
            cands.levels[0][item].supp += t.weight;
        }
    }
    let frequent = cands.commit(total, perfect, evaluation.as_ref())?;
    trace!("apriori: level 1, {} candidate(s), {} frequent", k, frequent);

    let mut m = k;
    let mut tc = 0.0;
    loop {
        ctx.check()?;
        let size = cands.height();
        if size >= xmax {
            break;
        }
        let mut used = None;
        if filter != 0.0 {
            let (marks, count) = cands.used_items(k);
            if count <= size {
                break;
            }
            used = Some((marks, count));
        }
        let added = cands.add_level();
        if added == 0 {
            break;
        }
        guard.grow(estimate_tree::<Node>(added))?;
        if let Some((marks, count)) = used {
            let rebuild = (filter < 0.0 && (count as f64) < -filter * m as f64)
                || (filter > 0.0 && count < m && (count as f64) * tt < filter * (m as f64) * tc);
            if rebuild {
                m = count;
                let start = Instant::now();
                shrink(&mut tracts, &marks, size + 1);
                if tatree.is_some() {
                    tatree = Some(TaTree::build(&tracts));
                }
                tt = start.elapsed().as_secs_f64();
                trace!("apriori: filtered to {} item(s), {} transaction(s)", count, tracts.len());
            }
        }
        let start = Instant::now();
        let top = 0..cands.levels[0].len();
        match &tatree {
            Some(tree) => cands.count_tree(0, top, tree, TaTree::ROOT),
            None => {
                for t in &tracts {
                    cands.count_bag(0, top.clone(), &t.items, t.weight);
                }
            }
        }
        tc = start.elapsed().as_secs_f64();
        let frequent = cands.commit(total, perfect, evaluation.as_ref())?;
        trace!("apriori: level {}, {} candidate(s), {} frequent", size + 1, added, frequent);
    }
    debug!("apriori: {} level(s) in {:.3}s", cands.height(), started.elapsed().as_secs_f64());

    let top = 0..cands.levels[0].len();
    cands.report_children(0, top, evaluation.as_ref(), rep, ctx)?;
    rep.report()
}
