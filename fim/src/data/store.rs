use std::collections::{BTreeMap, HashMap};

use log::debug;

use super::{Item, Supp};
use crate::error::{MineError, Result};

/// A recoded transaction: ascending item ids plus a multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub items: Vec<Item>,
    pub weight: Supp,
}

impl Transaction {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: Item) -> bool {
        self.items.binary_search(&item).is_ok()
    }
}

/// Collects raw transactions over original item ids before recoding.
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    raw: Vec<(Vec<usize>, Supp)>,
    penalties: HashMap<usize, f64>,
    default_penalty: f64,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, items: &[usize]) -> &mut Self {
        self.add_weighted(items, 1)
    }

    pub fn add_weighted(&mut self, items: &[usize], weight: Supp) -> &mut Self {
        let mut items = items.to_vec();
        items.sort_unstable();
        items.dedup();
        self.raw.push((items, weight));
        self
    }

    /// Sets the insertion penalty of one original item.
    pub fn penalty(&mut self, item: usize, penalty: f64) -> Result<&mut Self> {
        if !(0.0..=1.0).contains(&penalty) {
            return Err(MineError::Data(format!(
                "insertion penalty {} of item {} outside [0,1]",
                penalty, item
            )));
        }
        self.penalties.insert(item, penalty);
        Ok(self)
    }

    /// Penalty used for items without an explicit one.
    pub fn default_penalty(&mut self, penalty: f64) -> Result<&mut Self> {
        if !(0.0..=1.0).contains(&penalty) {
            return Err(MineError::Data(format!("default penalty {} outside [0,1]", penalty)));
        }
        self.default_penalty = penalty;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn total_weight(&self) -> Supp {
        self.raw.iter().map(|(_, w)| *w).sum()
    }

    /// Support of every original item, ordered by item id.
    pub fn item_supports(&self) -> BTreeMap<usize, Supp> {
        let mut counts = BTreeMap::new();
        for (items, weight) in &self.raw {
            for &item in items {
                *counts.entry(item).or_insert(0) += *weight;
            }
        }
        counts
    }

    /// Recodes the collected transactions, dropping items whose support is
    /// below `min_support`. More frequent items receive smaller ids.
    pub fn build(&self, min_support: Supp) -> TransactionStore {
        let mut frequent: Vec<(usize, Supp)> = self
            .item_supports()
            .into_iter()
            .filter(|&(_, supp)| supp >= min_support)
            .collect();
        frequent.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let code: HashMap<usize, Item> = frequent
            .iter()
            .enumerate()
            .map(|(id, &(item, _))| (item, id))
            .collect();

        let transactions: Vec<Transaction> = self
            .raw
            .iter()
            .map(|(items, weight)| {
                let mut recoded: Vec<Item> =
                    items.iter().filter_map(|item| code.get(item).copied()).collect();
                recoded.sort_unstable();
                Transaction { items: recoded, weight: *weight }
            })
            .collect();

        let penalties = frequent
            .iter()
            .map(|(item, _)| *self.penalties.get(item).unwrap_or(&self.default_penalty))
            .collect();

        let store = TransactionStore::assemble(
            transactions,
            frequent.iter().map(|&(item, _)| item).collect(),
            frequent.iter().map(|&(_, supp)| supp).collect(),
            penalties,
            self.total_weight(),
        );
        debug!(
            "recoded {} transaction(s) over {} item(s), total weight {}",
            store.len(),
            store.item_count(),
            store.total_weight()
        );
        store
    }
}

/// Immutable, recoded transaction database consumed by every engine.
#[derive(Debug, Clone)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
    original: Vec<usize>,
    supports: Vec<Supp>,
    penalties: Vec<f64>,
    total_weight: Supp,
    max_len: usize,
    extent: usize,
}

impl TransactionStore {
    fn assemble(
        transactions: Vec<Transaction>,
        original: Vec<usize>,
        supports: Vec<Supp>,
        penalties: Vec<f64>,
        total_weight: Supp,
    ) -> Self {
        let max_len = transactions.iter().map(Transaction::len).max().unwrap_or(0);
        let extent = transactions.iter().map(Transaction::len).sum();
        Self { transactions, original, supports, penalties, total_weight, max_len, extent }
    }

    /// Builds a store from unit-weight transactions over original ids.
    pub fn from_transactions(transactions: &[Vec<usize>], min_support: Supp) -> Self {
        let mut builder = StoreBuilder::new();
        for t in transactions {
            builder.add(t);
        }
        builder.build(min_support)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.original.len()
    }

    /// Weight of the whole database, including transactions removed by
    /// [`filter_min_len`](Self::filter_min_len).
    pub fn total_weight(&self) -> Supp {
        self.total_weight
    }

    /// Weight of the transactions currently held.
    pub fn held_weight(&self) -> Supp {
        self.transactions.iter().map(|t| t.weight).sum()
    }

    pub fn support(&self, item: Item) -> Supp {
        self.supports[item]
    }

    pub fn supports(&self) -> &[Supp] {
        &self.supports
    }

    pub fn transaction(&self, idx: usize) -> &Transaction {
        &self.transactions[idx]
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Number of item instances over all transactions.
    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn original_id(&self, item: Item) -> usize {
        self.original[item]
    }

    pub fn original_ids(&self) -> &[usize] {
        &self.original
    }

    pub fn penalty(&self, item: Item) -> f64 {
        self.penalties[item]
    }

    pub fn has_penalties(&self) -> bool {
        self.penalties.iter().any(|&p| p > 0.0)
    }

    /// True when every transaction has weight one.
    pub fn unit_weights(&self) -> bool {
        self.transactions.iter().all(|t| t.weight == 1)
    }

    /// Number of transactions containing each item (not weighted).
    pub fn occurrence_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.item_count()];
        for t in &self.transactions {
            for &item in &t.items {
                counts[item] += 1;
            }
        }
        counts
    }

    /// Collates identical transactions into one, summing their weights.
    /// Leaves the transactions sorted lexicographically.
    pub fn reduce(&mut self) {
        if self.transactions.len() < 2 {
            return;
        }
        self.transactions.sort_by(|a, b| a.items.cmp(&b.items));
        let mut reduced: Vec<Transaction> = Vec::with_capacity(self.transactions.len());
        for t in self.transactions.drain(..) {
            match reduced.last_mut() {
                Some(last) if last.items == t.items => last.weight += t.weight,
                _ => reduced.push(t),
            }
        }
        debug!("reduced to {} unique transaction(s)", reduced.len());
        self.transactions = reduced;
        self.refresh();
    }

    /// Drops transactions with fewer than `min_len` items.
    pub fn filter_min_len(&mut self, min_len: usize) {
        if min_len == 0 {
            return;
        }
        self.transactions.retain(|t| t.len() >= min_len);
        self.refresh();
    }

    fn refresh(&mut self) {
        self.max_len = self.transactions.iter().map(Transaction::len).max().unwrap_or(0);
        self.extent = self.transactions.iter().map(Transaction::len).sum();
    }

    /// Maps recoded items back to original ids, sorted ascending.
    pub fn decode(&self, items: &[Item]) -> Vec<usize> {
        let mut decoded: Vec<usize> = items.iter().map(|&i| self.original[i]).collect();
        decoded.sort_unstable();
        decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoreBuilder {
        let mut b = StoreBuilder::new();
        b.add(&[10, 20, 30]);
        b.add(&[10, 20]);
        b.add(&[10, 30, 40]);
        b.add(&[20, 30]);
        b.add(&[10, 20, 30, 40]);
        b
    }

    #[test]
    fn test_recoding_orders_by_frequency() {
        let store = sample().build(1);
        assert_eq!(store.item_count(), 4);
        // supports: 10:4, 20:4, 30:4, 40:2 -> ties broken by original id
        assert_eq!(store.original_ids(), &[10, 20, 30, 40]);
        assert_eq!(store.supports(), &[4, 4, 4, 2]);
        assert_eq!(store.total_weight(), 5);
        assert_eq!(store.max_len(), 4);
        assert_eq!(store.extent(), 14);
    }

    #[test]
    fn test_infrequent_items_removed() {
        let mut b = StoreBuilder::new();
        b.add(&[5, 1]);
        b.add(&[1]);
        b.add(&[7, 1, 5]);
        let store = b.build(2);
        assert_eq!(store.original_ids(), &[1, 5]);
        assert_eq!(store.transaction(2).items, vec![0, 1]);
        assert_eq!(store.decode(&[1, 0]), vec![1, 5]);
    }

    #[test]
    fn test_reduce_sums_weights() {
        let mut b = StoreBuilder::new();
        b.add(&[1, 2]);
        b.add(&[2, 1]);
        b.add_weighted(&[1], 3);
        let mut store = b.build(1);
        store.reduce();
        assert_eq!(store.len(), 2);
        assert_eq!(store.held_weight(), 5);
        let pair = store.iter().find(|t| t.len() == 2).unwrap();
        assert_eq!(pair.weight, 2);
    }

    #[test]
    fn test_filter_keeps_total_weight() {
        let mut store = sample().build(1);
        store.filter_min_len(3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.total_weight(), 5);
        assert_eq!(store.held_weight(), 3);
    }

    #[test]
    fn test_penalty_bounds() {
        let mut b = sample();
        assert!(b.penalty(10, 1.5).is_err());
        b.penalty(40, 0.5).unwrap();
        let store = b.build(1);
        assert_eq!(store.penalty(3), 0.5);
        assert_eq!(store.penalty(0), 0.0);
        assert!(store.has_penalties());
    }
}
