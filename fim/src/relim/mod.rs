//! Recursive elimination (RElim).
//!
//! Transactions are bucketed by their leading (largest) item. Items are
//! processed from the largest id down: the bucket of the current item is
//! projected for the recursion and then eliminated, i.e. every suffix in it
//! moves on to the bucket of its next item.

mod insertion;
mod lists;
mod tree;

use log::debug;

use crate::config::{MinerConfig, RelimVariant};
use crate::data::{Suffixes, TransactionStore};
use crate::error::Result;
use crate::fim16::{Fim16, MAX_ITEMS};
use crate::miner::Context;
use crate::report::Reporter;
use crate::tnorm::TNorm;
use crate::weight::Counted;

pub(crate) const NIL: u32 = u32::MAX;

/// Runs RElim over a prepared store, reporting the empty set last.
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
    let sort = config.heuristics.relim_sort;
    let perfect = config.mode.perfect;

    if let Some(ins) = &config.insertion {
        let isup = config.min_insertion_support(store.total_weight());
        let suffixes = Suffixes::new(store, 0);
        // merged suffixes carry summed weights, which only the product
        // norm may combine with a penalty in one step
        if ins.limited() || ins.tnorm != TNorm::Product {
            debug!("relim: limited item insertion (twgt {})", ins.twgt);
            let mut miner = insertion::Insertion::<R, Counted>::new(
                &suffixes, store, ins, smin, isup, sort, perfect, rep, ctx,
            );
            miner.run()?;
        } else {
            debug!("relim: unlimited item insertion");
            let mut miner = insertion::Insertion::<R, f64>::new(
                &suffixes, store, ins, smin, isup, sort, perfect, rep, ctx,
            );
            miner.run()?;
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
    match config.relim {
        RelimVariant::Tree => {
            debug!("relim: tree variant, {} packed item(s)", packed);
            tree::Tree::new(&suffixes, smin, perfect, m16, rep, ctx).run()?;
        }
        RelimVariant::Auto | RelimVariant::Lists => {
            debug!("relim: list variant, {} packed item(s)", packed);
            lists::Lists::new(&suffixes, store.item_count(), smin, sort, perfect, m16, rep, ctx).run()?;
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
        for (variant, fim16) in [
            (RelimVariant::Lists, false),
            (RelimVariant::Lists, true),
            (RelimVariant::Tree, false),
            (RelimVariant::Tree, true),
        ] {
            let mut cfg = MinerConfig::new(Target::All, -2.0);
            cfg.relim = variant;
            cfg.mode.fim16 = fim16;
            cfg.heuristics.pack = 2;
            assert_eq!(run(&cfg, &store), frequent(), "{:?} fim16={}", variant, fim16);
        }
    }

    #[test]
    fn test_zero_penalties_match_plain_mining() {
        let store = TransactionStore::from_transactions(&tracts(), 2);
        for tnorm in [TNorm::Product, TNorm::Min] {
            let ins = InsertionConfig { tnorm, twgt: 0.0, sins: -2.0 };
            let cfg = MinerConfig::new(Target::All, -2.0).with_insertion(ins);
            let found = run(&cfg, &store);
            assert_eq!(found, frequent(), "{:?}", tnorm);
        }
    }

    #[test]
    fn test_penalty_inserts_missing_item() {
        // item 1 is missing from {0,2,3} but may be inserted at weight 0.5
        let mut builder = StoreBuilder::new();
        for t in tracts() {
            builder.add(&t);
        }
        builder.penalty(1, 0.5).unwrap();
        let store = builder.build(1);
        let ins = InsertionConfig { tnorm: TNorm::Product, twgt: 0.0, sins: -2.5 };
        let mut cfg = MinerConfig::new(Target::All, -2.0).with_insertion(ins);
        cfg.zmin = 3;
        let state = RunState::default();
        let mut rep = ItemSetReporter::new(&cfg, &store);
        mine(&store, &cfg, &mut rep, &state.context()).unwrap();
        let result = rep.finish();
        // {0,1,3}: one real occurrence, weight 1 + 0.5; {0,1,2,3}: 1 + 0.5
        let abd = result.iter().find(|p| p.items == vec![0, 1, 3]);
        assert!(abd.is_none(), "support 1 stays below the minimum");
        let abc = result.iter().find(|p| p.items == vec![0, 1, 2]).unwrap();
        assert_eq!(abc.support, 2);
        assert!((abc.weight - 2.5).abs() < 1e-9);
    }
}
