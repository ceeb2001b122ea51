//! IsTa: closed and maximal item sets by cumulative transaction intersection.
//!
//! Transactions are added one at a time, shortest first. The repository
//! holds the intersections of the transactions seen so far. Adding a
//! transaction intersects it with every stored set and raises the support
//! of each result to the best support it was reached from plus the
//! transaction weight.
//!
//! After every step the supports of the closed sets of the processed part
//! are exact. Other stored sets may be undercounted; each of them has a
//! stored superset with at least its support, so the reporter's closed and
//! maximal selection drops them.
//!
//! Once the weight still to come falls below the minimum support, sets that
//! can no longer become frequent are removed every few transactions.

use std::collections::HashMap;

use log::debug;

use crate::config::MinerConfig;
use crate::data::{Item, Supp, TransactionStore};
use crate::error::Result;
use crate::miner::Context;
use crate::report::{Repository, Reporter};

/// Transactions between two pruning passes.
const PRUNE_EVERY: usize = 16;

pub fn mine<R: Reporter>(
    store: &TransactionStore,
    config: &MinerConfig,
    rep: &mut R,
    ctx: &Context<'_>,
) -> Result<()> {
    let smin = rep.min_support();
    let k = store.item_count();
    let mut repo = Repository::new();
    if store.held_weight() >= smin && store.max_len() >= config.zmin && k > 0 {
        let mut order: Vec<usize> = (0..store.len()).collect();
        order.sort_by_key(|&t| store.transaction(t).len());

        let mut guard = ctx.reserve(repo.bytes())?;
        let mut keep = vec![false; k];
        let mut found: HashMap<Vec<Item>, Supp> = HashMap::new();
        let mut remaining = store.held_weight();
        let mut pruned = 0;
        for (step, &t) in order.iter().enumerate() {
            ctx.check()?;
            let tract = store.transaction(t);
            remaining -= tract.weight;
            if tract.items.is_empty() {
                continue;
            }
            for &i in &tract.items {
                keep[i] = true;
            }
            found.clear();
            found.insert(tract.items.clone(), tract.weight);
            repo.for_each_intersection(&keep, |set, supp| {
                if set.is_empty() {
                    return;
                }
                let supp = supp + tract.weight;
                match found.get_mut(set) {
                    Some(best) => *best = (*best).max(supp),
                    None => {
                        found.insert(set.to_vec(), supp);
                    }
                }
            });
            for &i in &tract.items {
                keep[i] = false;
            }
            for (set, supp) in found.drain() {
                repo.add(&set, supp);
            }

            if config.ista.prune && remaining < smin && step % PRUNE_EVERY == PRUNE_EVERY - 1 {
                let before = repo.len();
                repo.retain(|_, stored| stored.supp + remaining >= smin);
                pruned += before - repo.len();
            }
            let bytes = repo.bytes();
            if bytes > guard.bytes() {
                guard.grow(bytes - guard.bytes())?;
            }
        }
        debug!(
            "ista: {} intersection(s), {} pruned, {} node(s)",
            repo.len(),
            pruned,
            repo.node_count()
        );
    }

    repo.add(&[], store.total_weight());
    for (set, stored) in repo.sets() {
        if stored.supp >= smin {
            rep.report_set(&set, stored.supp)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::data::StoreBuilder;
    use crate::error::MineError;
    use crate::miner::RunState;
    use crate::report::ItemSetReporter;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

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
    fn test_closed_and_maximal_sets() {
        let store = scenario();
        let closed = run(&MinerConfig::new(Target::Closed, -2.0), &store);
        assert_eq!(
            closed,
            vec![
                (vec![0], 4),
                (vec![1], 4),
                (vec![2], 4),
                (vec![0, 1], 3),
                (vec![0, 2], 3),
                (vec![1, 2], 3),
                (vec![0, 1, 2], 2),
                (vec![0, 2, 3], 2),
            ]
        );
        let maximal = run(&MinerConfig::new(Target::Maximal, -2.0), &store);
        assert_eq!(maximal, vec![(vec![0, 1, 2], 2), (vec![0, 2, 3], 2)]);
    }

    #[test]
    fn test_weighted_transactions() {
        let mut builder = StoreBuilder::new();
        builder.add_weighted(&[0, 1], 3).add_weighted(&[0, 1, 2], 1).add_weighted(&[2], 2);
        let store = builder.build(1);
        let found = run(&MinerConfig::new(Target::Closed, -1.0), &store);
        assert_eq!(found.len(), 3);
        assert!(found.contains(&(vec![0, 1], 4)));
        assert!(found.contains(&(vec![0, 1, 2], 1)));
        assert!(found.contains(&(vec![2], 3)));
    }

    #[test]
    fn test_pruning_keeps_the_result() {
        let mut rng = StdRng::seed_from_u64(23);
        let tracts: Vec<Vec<usize>> = (0..60)
            .map(|_| (0..9).filter(|&i| rng.gen_bool(0.25 + 0.05 * (i % 4) as f64)).collect())
            .collect();
        let store = TransactionStore::from_transactions(&tracts, 1);
        for target in [Target::Closed, Target::Maximal] {
            let mut cfg = MinerConfig::new(target, -15.0);
            let pruned = run(&cfg, &store);
            cfg.ista.prune = false;
            assert!(!pruned.is_empty());
            assert_eq!(pruned, run(&cfg, &store), "{}", target);
        }
    }

    #[test]
    fn test_cancelled_before_first_transaction() {
        let store = scenario();
        let cfg = MinerConfig::new(Target::Closed, -2.0);
        let state = RunState::default();
        state.cancel.cancel();
        let mut rep = ItemSetReporter::new(&cfg, &store);
        let result = mine(&store, &cfg, &mut rep, &state.context());
        assert!(matches!(result, Err(MineError::Aborted)));
    }
}
