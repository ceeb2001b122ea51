//! The mining facade: prepares a store, picks an engine and collects its
//! output.

use std::time::Instant;

use log::{debug, info};
use ndarray::ArrayView2;

use crate::cancel::CancelToken;
use crate::config::{Algorithm, MinerConfig, Target};
use crate::data::{from_dense, StoreBuilder, TransactionStore};
use crate::error::{MineError, Result};
use crate::memory::{MemoryBudget, MemoryGuard};
use crate::report::{ItemSetReporter, PatternSet};
use crate::{apriori, carpenter, eclat, fpgrowth, ista, relim, sam};

/// Per-run resources handed down every recursion.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub cancel: &'a CancelToken,
    pub budget: &'a MemoryBudget,
}

impl<'a> Context<'a> {
    pub fn new(cancel: &'a CancelToken, budget: &'a MemoryBudget) -> Self {
        Self { cancel, budget }
    }

    #[inline]
    pub fn check(&self) -> Result<()> {
        self.cancel.check()
    }

    /// Reserves `bytes` of the budget until the guard is dropped.
    pub fn reserve(&self, bytes: usize) -> Result<MemoryGuard<'a>> {
        MemoryGuard::new(self.budget, bytes)
    }
}

/// Owns the cancellation token and budget of one run.
#[derive(Debug, Default)]
pub struct RunState {
    pub cancel: CancelToken,
    pub budget: MemoryBudget,
}

impl RunState {
    pub fn new(cancel: CancelToken, budget: MemoryBudget) -> Self {
        Self { cancel, budget }
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(&self.cancel, &self.budget)
    }
}

/// Resolves [`Algorithm::Auto`] for a store of `items` items over
/// `tracts` transactions.
///
/// Item insertion runs on SaM. Closed and maximal sets of data with more
/// items than transactions go to Carpenter, which enumerates transaction
/// sets instead of item sets. Rule evaluation measures need the candidate
/// tree of Apriori. Everything else runs on Eclat. Accretion, Apriacc and
/// IsTa are never chosen automatically.
pub fn select_algorithm(config: &MinerConfig, items: usize, tracts: usize) -> Algorithm {
    if config.algorithm != Algorithm::Auto {
        return config.algorithm;
    }
    if config.insertion.is_some() {
        return Algorithm::Sam;
    }
    if config.eval.is_rule_measure() {
        return Algorithm::Apriori;
    }
    match config.target {
        Target::Closed | Target::Maximal if items > tracts => Algorithm::Carpenter,
        _ => Algorithm::Eclat,
    }
}

/// Runs one configured mining task.
///
/// ```
/// use fim::{Miner, MinerConfig, Target};
///
/// let miner = Miner::new(MinerConfig::new(Target::Closed, -2.0)).unwrap();
/// let found = miner.mine_transactions(&[vec![1, 2], vec![1, 2, 3], vec![1]]).unwrap();
/// assert_eq!(found.support_of(&[1, 2]), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct Miner {
    config: MinerConfig,
    cancel: CancelToken,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, cancel: CancelToken::new() })
    }

    /// Shares `cancel` with the caller, who may abort a run from another thread.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Mines unit-weight transactions given as lists of item ids.
    pub fn mine_transactions(&self, tracts: &[Vec<usize>]) -> Result<PatternSet> {
        let mut builder = StoreBuilder::new();
        for t in tracts {
            builder.add(t);
        }
        self.mine_builder(&builder)
    }

    /// Mines weighted transactions.
    pub fn mine_weighted(&self, tracts: &[(Vec<usize>, u64)]) -> Result<PatternSet> {
        let mut builder = StoreBuilder::new();
        for (items, weight) in tracts {
            builder.add_weighted(items, *weight);
        }
        self.mine_builder(&builder)
    }

    /// Mines a 0/1 matrix with one row per transaction; items are column indices.
    pub fn mine_dense(&self, matrix: ArrayView2<i32>) -> Result<PatternSet> {
        self.mine_builder(&from_dense(matrix)?)
    }

    /// Builds the store at the configured minimum support and mines it.
    pub fn mine_builder(&self, builder: &StoreBuilder) -> Result<PatternSet> {
        let smin = self.config.min_support(builder.total_weight());
        self.mine(&builder.build(smin))
    }

    /// Mines `store`, which must have been built with at most the
    /// configured minimum support.
    pub fn mine(&self, store: &TransactionStore) -> Result<PatternSet> {
        let config = &self.config;
        let algorithm = select_algorithm(config, store.item_count(), store.len());
        check_algorithm(config, algorithm)?;
        let store = self.prepare(store, algorithm);

        let budget = config.memory_limit.map_or_else(MemoryBudget::unlimited, MemoryBudget::new);
        let ctx = Context::new(&self.cancel, &budget);
        let started = Instant::now();
        let found = match algorithm {
            Algorithm::Accretion => {
                let all = MinerConfig { target: Target::All, ..config.clone() };
                let mut rep = ItemSetReporter::new(&all, &store).with_dedup();
                eclat::accretion::mine(&store, config, &mut rep, &ctx)?;
                rep.finish()
            }
            Algorithm::Apriacc => {
                let acc = apriori::accretion_config(config);
                let mut rep = ItemSetReporter::new(&acc, &store);
                apriori::mine(&store, &acc, &mut rep, &ctx)?;
                rep.finish()
            }
            _ => {
                let mut rep = ItemSetReporter::new(config, &store);
                match algorithm {
                    Algorithm::Apriori => apriori::mine(&store, config, &mut rep, &ctx)?,
                    Algorithm::Relim => relim::mine(&store, config, &mut rep, &ctx)?,
                    Algorithm::Sam => sam::mine(&store, config, &mut rep, &ctx)?,
                    Algorithm::Carpenter => carpenter::mine(&store, config, &mut rep, &ctx)?,
                    Algorithm::Ista => ista::mine(&store, config, &mut rep, &ctx)?,
                    Algorithm::FpGrowth => fpgrowth::mine(&store, config, &mut rep, &ctx)?,
                    _ => eclat::mine(&store, config, &mut rep, &ctx)?,
                }
                rep.finish()
            }
        };
        info!(
            "{:?}: {} {} item set(s) in {:.3}s, peak memory {} bytes",
            algorithm,
            found.len(),
            config.target,
            started.elapsed().as_secs_f64(),
            budget.peak_usage()
        );
        Ok(found)
    }

    fn prepare(&self, store: &TransactionStore, algorithm: Algorithm) -> TransactionStore {
        let config = &self.config;
        let mut store = store.clone();
        if config.mode.collate {
            store.reduce();
        }
        // Shorter transactions cannot hold a reported set, but the
        // generator check still needs the supports of smaller subsets.
        let filters = matches!(
            algorithm,
            Algorithm::Carpenter | Algorithm::Ista | Algorithm::Relim | Algorithm::Sam
        ) && config.insertion.is_none()
            && config.target != Target::Generators;
        if filters {
            store.filter_min_len(config.zmin);
        }
        debug!(
            "prepared {} item(s), {} transaction(s), total weight {}",
            store.item_count(),
            store.len(),
            store.total_weight()
        );
        store
    }
}

fn check_algorithm(config: &MinerConfig, algorithm: Algorithm) -> Result<()> {
    if config.insertion.is_some() {
        if !matches!(algorithm, Algorithm::Relim | Algorithm::Sam) {
            return Err(MineError::Config(format!(
                "item insertion needs relim or sam, not {:?}",
                algorithm
            )));
        }
        if config.target == Target::Generators {
            return Err(MineError::Config(
                "generators cannot be mined with item insertion".to_string(),
            ));
        }
    }
    if matches!(algorithm, Algorithm::Carpenter | Algorithm::Ista)
        && !matches!(config.target, Target::Closed | Target::Maximal)
    {
        return Err(MineError::Config(format!(
            "{:?} mines closed or maximal item sets only, not {}",
            algorithm, config.target
        )));
    }
    if config.eval.is_rule_measure() && !matches!(algorithm, Algorithm::Apriori | Algorithm::Apriacc) {
        return Err(MineError::Config(format!(
            "evaluation measure {:?} needs apriori, not {:?}",
            config.eval, algorithm
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsertionConfig;
    use crate::eval::EvalMeasure;

    fn scenario() -> Vec<Vec<usize>> {
        vec![vec![0, 1, 2], vec![0, 1], vec![0, 2, 3], vec![1, 2], vec![0, 1, 2, 3]]
    }

    #[test]
    fn test_auto_selection() {
        let closed = MinerConfig::new(Target::Closed, 10.0);
        assert_eq!(select_algorithm(&closed, 100, 10), Algorithm::Carpenter);
        assert_eq!(select_algorithm(&closed, 10, 100), Algorithm::Eclat);
        let all = MinerConfig::new(Target::All, 10.0);
        assert_eq!(select_algorithm(&all, 100, 10), Algorithm::Eclat);
        let ins = all.clone().with_insertion(InsertionConfig::default());
        assert_eq!(select_algorithm(&ins, 10, 10), Algorithm::Sam);
        let fixed = all.clone().with_algorithm(Algorithm::Apriori);
        assert_eq!(select_algorithm(&fixed, 100, 10), Algorithm::Apriori);
        let mut rated = all.clone();
        rated.eval = EvalMeasure::Conf;
        assert_eq!(select_algorithm(&rated, 100, 10), Algorithm::Apriori);
        rated.insertion = Some(InsertionConfig::default());
        assert_eq!(select_algorithm(&rated, 100, 10), Algorithm::Sam);
        assert!(matches!(check_algorithm(&rated, Algorithm::Sam), Err(MineError::Config(_))));
    }

    #[test]
    fn test_apriacc_and_ista_dispatch() {
        let mut tracts = Vec::new();
        for i in 0..40 {
            let mut t = Vec::new();
            if i % 2 == 0 {
                t.extend([5, 6]);
            }
            if i % 4 < 2 {
                t.push(7);
            }
            tracts.push(t);
        }
        let cfg = MinerConfig::new(Target::Maximal, -5.0).with_algorithm(Algorithm::Apriacc);
        let found = Miner::new(cfg.with_size(2, None)).unwrap().mine_transactions(&tracts).unwrap();
        assert_eq!(found.to_pairs(), vec![(vec![5, 6], 20)]);

        let cfg = MinerConfig::new(Target::Maximal, -2.0).with_algorithm(Algorithm::Ista);
        let found = Miner::new(cfg).unwrap().mine_transactions(&scenario()).unwrap();
        assert_eq!(found.to_pairs(), vec![(vec![0, 1, 2], 2), (vec![0, 2, 3], 2)]);
    }

    #[test]
    fn test_invalid_combinations() {
        let cfg = MinerConfig::new(Target::All, -2.0)
            .with_algorithm(Algorithm::Eclat)
            .with_insertion(InsertionConfig::default());
        let miner = Miner::new(cfg).unwrap();
        assert!(matches!(miner.mine_transactions(&scenario()), Err(MineError::Config(_))));

        let cfg = MinerConfig::new(Target::Generators, -2.0).with_insertion(InsertionConfig::default());
        let miner = Miner::new(cfg).unwrap();
        assert!(matches!(miner.mine_transactions(&scenario()), Err(MineError::Config(_))));
    }

    #[test]
    fn test_original_ids_survive_recoding() {
        let tracts = vec![vec![7, 3], vec![7], vec![3, 7, 9], vec![9, 7]];
        let miner = Miner::new(MinerConfig::new(Target::All, -2.0)).unwrap();
        let found = miner.mine_transactions(&tracts).unwrap();
        assert_eq!(
            found.to_pairs(),
            vec![(vec![3], 2), (vec![7], 4), (vec![9], 2), (vec![3, 7], 2), (vec![7, 9], 2)]
        );
    }

    #[test]
    fn test_weighted_equals_repeated() {
        let miner = Miner::new(MinerConfig::new(Target::Closed, -3.0)).unwrap();
        let weighted = miner
            .mine_weighted(&[(vec![0, 1], 2), (vec![0, 2], 1), (vec![0, 1, 2], 1)])
            .unwrap();
        let repeated = miner
            .mine_transactions(&[vec![0, 1], vec![0, 1], vec![0, 2], vec![0, 1, 2]])
            .unwrap();
        assert_eq!(weighted.to_pairs(), repeated.to_pairs());
        assert_eq!(weighted.to_pairs(), vec![(vec![0], 4), (vec![0, 1], 3)]);
    }

    #[test]
    fn test_zmin_filter_keeps_generators() {
        for algorithm in [Algorithm::Relim, Algorithm::Sam, Algorithm::Eclat] {
            let cfg = MinerConfig::new(Target::Generators, -2.0)
                .with_algorithm(algorithm)
                .with_size(2, None);
            let found = Miner::new(cfg).unwrap().mine_transactions(&scenario()).unwrap();
            assert_eq!(
                found.to_pairs(),
                vec![(vec![0, 1], 3), (vec![0, 2], 3), (vec![1, 2], 3), (vec![0, 1, 2], 2)],
                "{:?}",
                algorithm
            );
        }
    }
}
