//! Split and merge (SaM).
//!
//! The transactions are kept as one array sorted in descending
//! lexicographic order over descending items. The leading run of the array
//! shares its first item: it is split off, the item is stripped, and the
//! result is the projection for that item. The projection is then merged
//! back into the rest so the next item leads the array.

mod array;
mod dsb;
mod insertion;
mod tree;

use std::cmp::Ordering;

use log::debug;

use crate::config::{MinerConfig, SamVariant};
use crate::data::{Suffixes, Supp, TransactionStore, Word};
use crate::error::Result;
use crate::fim16::{Fim16, MAX_ITEMS};
use crate::miner::Context;
use crate::report::Reporter;
use crate::tnorm::TNorm;
use crate::weight::Counted;

/// A transaction suffix and the number of transactions sharing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tract {
    pub pos: usize,
    pub occ: Supp,
}

/// All non-empty transactions in descending order, equal ones combined.
pub(crate) fn initial(suffixes: &Suffixes) -> Vec<Tract> {
    let mut a: Vec<Tract> = (0..suffixes.len())
        .map(|t| suffixes.transaction(t))
        .filter(|&(start, _)| suffixes.at(start) != Word::End)
        .map(|(pos, occ)| Tract { pos, occ })
        .collect();
    a.sort_by(|x, y| suffixes.compare(y.pos, x.pos));
    let mut out: Vec<Tract> = Vec::with_capacity(a.len());
    for t in a {
        match out.last_mut() {
            Some(last) if suffixes.compare(last.pos, t.pos).is_eq() => last.occ += t.occ,
            _ => out.push(t),
        }
    }
    out
}

/// Merges two descending arrays into `out`, adding up equal suffixes.
pub(crate) fn merge(suffixes: &Suffixes, a: &[Tract], b: &[Tract], out: &mut Vec<Tract>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match suffixes.compare(a[i].pos, b[j].pos) {
            Ordering::Greater => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Less => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(Tract { pos: a[i].pos, occ: a[i].occ + b[j].occ });
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

/// Merges a short array `few` into a long one `many` by locating each
/// insertion point with a binary search.
pub(crate) fn merge_bsearch(suffixes: &Suffixes, many: &[Tract], few: &[Tract], out: &mut Vec<Tract>) {
    let mut from = 0;
    for t in few {
        let rest = &many[from..];
        let at = from + rest.partition_point(|m| suffixes.compare(m.pos, t.pos) == Ordering::Greater);
        out.extend_from_slice(&many[from..at]);
        if at < many.len() && suffixes.compare(many[at].pos, t.pos).is_eq() {
            out.push(Tract { pos: t.pos, occ: many[at].occ + t.occ });
            from = at + 1;
        } else {
            out.push(*t);
            from = at;
        }
    }
    out.extend_from_slice(&many[from..]);
}

/// Hands the packed masks of `tracts` to the 16-items machine and mines them.
pub(crate) fn mine_packed<R: Reporter>(
    suffixes: &Suffixes,
    tracts: impl IntoIterator<Item = Tract>,
    m16: &mut Fim16,
    rep: &mut R,
    ctx: &Context<'_>,
) -> Result<()> {
    for t in tracts {
        if let Word::Packed(mask) = suffixes.at(t.pos) {
            m16.add(mask, t.occ);
        }
    }
    m16.mine(rep, ctx)
}

/// Runs SaM over a prepared store, reporting the empty set last.
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
    if store.item_count() == 0 {
        return rep.report();
    }
    let perfect = config.mode.perfect;

    if let Some(ins) = &config.insertion {
        let isup = config.min_insertion_support(store.total_weight());
        let suffixes = Suffixes::new(store, 0);
        if ins.limited() || ins.tnorm != TNorm::Product {
            debug!("sam: limited item insertion (twgt {})", ins.twgt);
            insertion::Insertion::<R, Counted>::new(&suffixes, store, ins, smin, isup, perfect, rep, ctx).run()?;
        } else {
            debug!("sam: unlimited item insertion");
            insertion::Insertion::<R, f64>::new(&suffixes, store, ins, smin, isup, perfect, rep, ctx).run()?;
        }
        return rep.report();
    }

    let packed = if config.mode.fim16 {
        config.heuristics.pack.min(MAX_ITEMS).min(store.item_count())
    } else {
        0
    };
    let m16 = (packed > 0).then(|| Fim16::new(smin, packed, perfect));
    let suffixes = Suffixes::new(store, packed);
    match config.sam {
        SamVariant::Tree => {
            debug!("sam: tree variant, {} packed item(s)", packed);
            tree::Tree::new(&suffixes, smin, perfect, m16, rep, ctx).run()?;
        }
        SamVariant::DoubleSource => {
            debug!("sam: double source buffering, merge limit {}", config.heuristics.sam_merge);
            dsb::DoubleSource::new(&suffixes, smin, perfect, config.heuristics.sam_merge, m16, rep, ctx).run()?;
        }
        SamVariant::Bsearch | SamVariant::Auto => {
            let ratio = config.heuristics.sam_bsearch_ratio.max(1);
            debug!("sam: binary search merge (ratio {}), {} packed item(s)", ratio, packed);
            array::Arrays::new(&suffixes, smin, perfect, Some(ratio), m16, rep, ctx).run()?;
        }
        SamVariant::Basic => {
            debug!("sam: basic variant, {} packed item(s)", packed);
            array::Arrays::new(&suffixes, smin, perfect, None, m16, rep, ctx).run()?;
        }
    }
    rep.report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InsertionConfig, Target};
    use crate::data::StoreBuilder;
    use crate::miner::RunState;
    use crate::report::ItemSetReporter;

    fn tracts() -> Vec<Vec<usize>> {
        vec![vec![0, 1, 2], vec![0, 1], vec![0, 2, 3], vec![1, 2], vec![0, 1, 2, 3]]
    }

    fn run(cfg: &MinerConfig, store: &TransactionStore) -> Vec<(Vec<usize>, u64)> {
        let state = RunState::default();
        let mut rep = ItemSetReporter::new(cfg, store);
        mine(store, cfg, &mut rep, &state.context()).unwrap();
        rep.finish().to_pairs()
    }

    fn frequent() -> Vec<(Vec<usize>, u64)> {
        vec![
            (vec![0], 4),
            (vec![1], 4),
            (vec![2], 4),
            (vec![3], 2),
            (vec![0, 1], 3),
            (vec![0, 2], 3),
            (vec![0, 3], 2),
            (vec![1, 2], 3),
            (vec![2, 3], 2),
            (vec![0, 1, 2], 2),
            (vec![0, 2, 3], 2),
        ]
    }

    #[test]
    fn test_variants_agree_on_scenario() {
        let store = TransactionStore::from_transactions(&tracts(), 2);
        for variant in [SamVariant::Basic, SamVariant::Bsearch, SamVariant::DoubleSource, SamVariant::Tree] {
            for fim16 in [false, true] {
                let mut cfg = MinerConfig::new(Target::All, -2.0);
                cfg.sam = variant;
                cfg.mode.fim16 = fim16;
                cfg.heuristics.pack = 2;
                // force both sources and the binary search into play
                cfg.heuristics.sam_merge = 1;
                cfg.heuristics.sam_bsearch_ratio = 1;
                assert_eq!(run(&cfg, &store), frequent(), "{:?} fim16={}", variant, fim16);
            }
        }
    }

    #[test]
    fn test_merge_variants_agree() {
        let store = TransactionStore::from_transactions(&[vec![0, 1], vec![0, 2], vec![1], vec![0, 1], vec![2]], 1);
        let s = Suffixes::new(&store, 0);
        let a = initial(&s);
        let (head, tail) = a.split_at(1);
        let mut x = Vec::new();
        let mut y = Vec::new();
        merge(&s, tail, head, &mut x);
        merge_bsearch(&s, tail, head, &mut y);
        assert_eq!(x, y);
        assert_eq!(x, a);
    }

    #[test]
    fn test_initial_combines_duplicates() {
        let store = TransactionStore::from_transactions(&[vec![0, 1], vec![0, 1], vec![], vec![1]], 1);
        let s = Suffixes::new(&store, 0);
        let a = initial(&s);
        assert_eq!(a.len(), 2);
        assert_eq!(a.iter().map(|t| t.occ).sum::<Supp>(), 3);
        assert_eq!(s.compare(a[0].pos, a[1].pos), Ordering::Greater);
    }

    #[test]
    fn test_zero_penalties_match_plain_mining() {
        let store = TransactionStore::from_transactions(&tracts(), 2);
        for (tnorm, twgt) in [(TNorm::Product, 0.0), (TNorm::Min, 0.0), (TNorm::Product, 0.25)] {
            let ins = InsertionConfig { tnorm, twgt, sins: -2.0 };
            let cfg = MinerConfig::new(Target::All, -2.0).with_insertion(ins);
            assert_eq!(run(&cfg, &store), frequent(), "{:?} twgt={}", tnorm, twgt);
        }
    }

    #[test]
    fn test_penalty_inserts_missing_item() {
        let mut builder = StoreBuilder::new();
        for t in tracts() {
            builder.add(&t);
        }
        builder.penalty(1, 0.5).unwrap();
        let store = builder.build(1);
        for twgt in [0.0, 0.5] {
            let ins = InsertionConfig { tnorm: TNorm::Product, twgt, sins: -2.5 };
            let mut cfg = MinerConfig::new(Target::All, -2.0).with_insertion(ins);
            cfg.zmin = 3;
            let state = RunState::default();
            let mut rep = ItemSetReporter::new(&cfg, &store);
            mine(&store, &cfg, &mut rep, &state.context()).unwrap();
            let result = rep.finish();
            assert!(result.iter().all(|p| p.items != vec![0, 1, 3]));
            let abc = result.iter().find(|p| p.items == vec![0, 1, 2]).unwrap();
            assert_eq!(abc.support, 2);
            assert!((abc.weight - 2.5).abs() < 1e-9, "twgt={}", twgt);
        }
    }
}
