//! Carpenter: closed and maximal item sets by intersecting transactions.
//!
//! The search runs over transaction ids instead of items. Starting from the
//! set of all items, each step intersects the current set with one more
//! transaction, visiting transactions from the last to the first. Every
//! intersection is a closed set candidate and goes into a [`Repository`],
//! which keeps the largest support seen per set and cuts off branches
//! already explored with at least that support. The repository is handed to
//! the reporter once the search is done.
//!
//! Two representations decide which items survive an intersection:
//!
//! - a table with one row per transaction holding, for every item the row
//!   contains, the item's weight in this and all earlier transactions;
//! - per item lists of transaction ids, descending, consumed while the
//!   transactions are visited.
//!
//! An item survives only if the weight it can still collect reaches the
//! minimum support, so the intersections shrink faster than plain set
//! intersections would.

use log::debug;

use crate::config::{CarpenterVariant, MinerConfig, Target};
use crate::data::{Item, Supp, TransactionStore};
use crate::error::Result;
use crate::memory::{estimate_table, estimate_tidlists};
use crate::miner::Context;
use crate::report::{Repository, Reporter};

/// Weight an intersection still needs from the transactions not yet
/// visited, given the weight `supp` it already has.
#[inline]
fn needed(smin: Supp, supp: Supp, mul: Supp) -> Supp {
    smin.saturating_sub(supp).saturating_sub(mul)
}

struct Search<'a, 'c> {
    repo: Repository,
    muls: Vec<Supp>,
    /// All transactions have weight one, so the visit can stop once fewer
    /// transactions remain than weight is needed.
    unit: bool,
    smin: Supp,
    zmin: usize,
    perfect: bool,
    maxonly: bool,
    ctx: &'a Context<'c>,
}

impl<'a, 'c> Search<'a, 'c> {
    fn new(store: &TransactionStore, order: &[usize], config: &MinerConfig, smin: Supp, ctx: &'a Context<'c>) -> Self {
        let muls: Vec<Supp> = order.iter().map(|&t| store.transaction(t).weight).collect();
        Self {
            repo: Repository::new(),
            unit: muls.iter().all(|&w| w == 1),
            muls,
            smin,
            zmin: config.zmin,
            perfect: config.mode.perfect,
            maxonly: config.target == Target::Maximal && config.mode.perfect,
            ctx,
        }
    }

    #[inline]
    fn exhausted(&self, n: usize, s: Supp) -> bool {
        self.unit && (n as Supp) < s
    }

    /// Stores an intersection of two or more items unless it needs no
    /// further processing. Returns the support to recurse with.
    fn store(&mut self, set: &[Item], supp: Supp) -> Option<Supp> {
        if self.maxonly && self.repo.has_superset(set, self.smin, false) {
            return None;
        }
        self.repo.add(set, supp).then_some(supp)
    }
}

struct Table<'a, 'c> {
    search: Search<'a, 'c>,
    /// Row-major, `width` columns per transaction.
    tab: Vec<Supp>,
    width: usize,
}

impl<'a, 'c> Table<'a, 'c> {
    fn build(store: &TransactionStore, order: &[usize], search: Search<'a, 'c>) -> Self {
        let width = store.item_count();
        let mut tab = vec![0; order.len() * width];
        let mut frqs = vec![0; width];
        for (row, &t) in order.iter().enumerate() {
            let tract = store.transaction(t);
            for &item in &tract.items {
                frqs[item] += tract.weight;
                tab[row * width + item] = frqs[item];
            }
        }
        Self { search, tab, width }
    }

    fn rec(&mut self, set: &[Item], mut n: usize, mut supp: Supp) -> Result<Supp> {
        self.search.ctx.check()?;
        let pex = if self.search.perfect { set.len() } else { usize::MAX };
        let mut dst: Vec<Item> = Vec::with_capacity(set.len());
        while n > 0 {
            n -= 1;
            let mul = self.search.muls[n];
            // rows hold the weight of transaction `n` itself
            let s = needed(self.search.smin, supp, 1);
            if self.search.exhausted(n, s) {
                break;
            }
            let row = &self.tab[n * self.width..(n + 1) * self.width];
            dst.clear();
            dst.extend(set.iter().copied().filter(|&i| row[i] > s));
            let m = dst.len();
            if m < self.search.zmin || m == 0 {
                continue;
            }
            if m == 1 {
                self.search.repo.add(&dst, supp + row[dst[0]]);
                continue;
            }
            if m >= pex {
                supp += mul;
                continue;
            }
            let Some(s) = self.search.store(&dst, supp + mul) else {
                continue;
            };
            let r = self.rec(&dst, n, s)?;
            if r > s {
                self.search.repo.add(&dst, r);
            }
        }
        Ok(supp)
    }
}

#[derive(Debug, Clone, Copy)]
struct TidList {
    item: Item,
    /// Weight of the transactions still ahead in the list.
    supp: Supp,
    pos: usize,
}

struct Tids<'a, 'c> {
    search: Search<'a, 'c>,
    /// Descending ids per item, each list closed by `u32::MAX`.
    tids: Vec<u32>,
}

impl<'a, 'c> Tids<'a, 'c> {
    fn build(store: &TransactionStore, order: &[usize], search: Search<'a, 'c>) -> (Self, Vec<TidList>) {
        let k = store.item_count();
        let mut counts = vec![0usize; k];
        for &t in order {
            for &item in &store.transaction(t).items {
                counts[item] += 1;
            }
        }
        let mut lists = Vec::with_capacity(k);
        let mut next = Vec::with_capacity(k);
        let mut pos = 0;
        for (item, &c) in counts.iter().enumerate() {
            lists.push(TidList { item, supp: 0, pos });
            next.push(pos);
            pos += c + 1;
        }
        let mut tids = vec![u32::MAX; pos];
        for (row, &t) in order.iter().enumerate().rev() {
            let tract = store.transaction(t);
            for &item in &tract.items {
                lists[item].supp += tract.weight;
                tids[next[item]] = row as u32;
                next[item] += 1;
            }
        }
        (Self { search, tids }, lists)
    }

    fn rec(&mut self, lists: &mut [TidList], mut n: usize, mut supp: Supp) -> Result<Supp> {
        self.search.ctx.check()?;
        let pex = if self.search.perfect { lists.len() } else { usize::MAX };
        let mut dst: Vec<TidList> = Vec::with_capacity(lists.len());
        let mut set: Vec<Item> = Vec::with_capacity(lists.len());
        while n > 0 {
            n -= 1;
            let mul = self.search.muls[n];
            let s = needed(self.search.smin, supp, mul);
            if self.search.exhausted(n, s) {
                break;
            }
            dst.clear();
            for l in lists.iter_mut() {
                if self.tids[l.pos] == n as u32 {
                    l.pos += 1;
                    l.supp -= mul;
                    if l.supp >= s {
                        dst.push(*l);
                    }
                }
            }
            let m = dst.len();
            if m < self.search.zmin || m == 0 {
                continue;
            }
            if m == 1 {
                self.search.repo.add(&[dst[0].item], supp + mul + dst[0].supp);
                continue;
            }
            if m >= pex {
                supp += mul;
                continue;
            }
            set.clear();
            set.extend(dst.iter().map(|l| l.item));
            let Some(s) = self.search.store(&set, supp + mul) else {
                continue;
            };
            let r = self.rec(&mut dst, n, s)?;
            if r > s {
                self.search.repo.add(&set, r);
            }
        }
        Ok(supp)
    }
}

/// Picks the representation for `items` items over `tracts` transactions.
pub fn choose_variant(config: &MinerConfig, items: usize, tracts: usize) -> CarpenterVariant {
    match config.carpenter {
        CarpenterVariant::Auto => {
            if items.saturating_mul(tracts) > config.heuristics.carpenter_table {
                CarpenterVariant::Tidlist
            } else {
                CarpenterVariant::Table
            }
        }
        v => v,
    }
}

/// Runs Carpenter over a prepared store and passes the collected
/// intersections to `rep`, whose target selection does the rest.
pub fn mine<R: Reporter>(
    store: &TransactionStore,
    config: &MinerConfig,
    rep: &mut R,
    ctx: &Context<'_>,
) -> Result<()> {
    let smin = rep.min_support();
    let k = store.item_count();
    let n = store.len();
    let mut repo = if store.held_weight() < smin || store.max_len() < config.zmin || k == 0 {
        Repository::new()
    } else {
        // longest transactions first, so the visit starts with the shortest
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| store.transaction(b).len().cmp(&store.transaction(a).len()));
        let search = Search::new(store, &order, config, smin, ctx);
        let all: Vec<Item> = (0..k).collect();
        let variant = choose_variant(config, k, n);
        debug!("carpenter: {:?} over {} item(s), {} transaction(s)", variant, k, n);
        let (w, mut search) = match variant {
            CarpenterVariant::Tidlist => {
                let _guard = ctx.reserve(estimate_tidlists(k, store.extent() + k))?;
                let (mut tids, mut lists) = Tids::build(store, &order, search);
                let w = tids.rec(&mut lists, n, 0)?;
                (w, tids.search)
            }
            _ => {
                let _guard = ctx.reserve(estimate_table(n, k))?;
                let mut table = Table::build(store, &order, search);
                let w = table.rec(&all, n, 0)?;
                (w, table.search)
            }
        };
        if w > 0 {
            search.repo.add(&all, w);
        }
        search.repo
    };
    repo.add(&[], store.total_weight());
    debug!("carpenter: {} intersection(s), {} node(s)", repo.len(), repo.node_count());
    for (set, stored) in repo.sets() {
        if stored.supp >= smin {
            rep.report_set(&set, stored.supp)?;
        }
    }
    Ok(())
}
