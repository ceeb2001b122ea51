use std::collections::HashMap;

use crate::data::Supp;

/// One reported item set over original item ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub items: Vec<usize>,
    pub support: Supp,
    /// Weighted support; equals `support` unless item insertion is used.
    pub weight: f64,
    /// Evaluation value (log-ratio or p-value), 0 when none is computed.
    pub eval: f64,
}

impl Pattern {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Flat item storage for sets of one size.
#[derive(Debug, Clone, Default)]
pub struct ItemsetStorage {
    items: Vec<usize>,
    offsets: Vec<(usize, usize)>,
    supports: Vec<Supp>,
}

impl ItemsetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(estimated_items: usize, estimated_itemsets: usize) -> Self {
        Self {
            items: Vec::with_capacity(estimated_items),
            offsets: Vec::with_capacity(estimated_itemsets),
            supports: Vec::with_capacity(estimated_itemsets),
        }
    }

    pub fn add_itemset(&mut self, items: &[usize], support: Supp) -> usize {
        let start = self.items.len();
        self.items.extend_from_slice(items);
        self.offsets.push((start, items.len()));
        self.supports.push(support);
        self.offsets.len() - 1
    }

    pub fn get_itemset(&self, idx: usize) -> &[usize] {
        let (start, len) = self.offsets[idx];
        &self.items[start..start + len]
    }

    pub fn support(&self, idx: usize) -> Supp {
        self.supports[idx]
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// All reported sets of one size.
#[derive(Debug, Clone)]
pub struct FrequentLevel {
    pub storage: ItemsetStorage,
    pub itemset_size: usize,
}

impl FrequentLevel {
    pub fn new(itemset_size: usize) -> Self {
        Self { storage: ItemsetStorage::new(), itemset_size }
    }

    pub fn with_capacity(itemset_size: usize, estimated_itemsets: usize) -> Self {
        Self {
            storage: ItemsetStorage::with_capacity(
                estimated_itemsets * itemset_size,
                estimated_itemsets,
            ),
            itemset_size,
        }
    }

    pub fn add_itemset(&mut self, items: &[usize], support: Supp) -> usize {
        debug_assert_eq!(items.len(), self.itemset_size);
        self.storage.add_itemset(items, support)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn get_itemset(&self, idx: usize) -> &[usize] {
        self.storage.get_itemset(idx)
    }

    pub fn iter_itemsets(&self) -> impl Iterator<Item = &[usize]> {
        (0..self.storage.len()).map(move |idx| self.get_itemset(idx))
    }

    pub fn iter_with_support(&self) -> impl Iterator<Item = (&[usize], Supp)> {
        (0..self.storage.len()).map(move |idx| (self.get_itemset(idx), self.storage.support(idx)))
    }
}

/// Result of one mining run, ordered by set size and then lexicographically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new(mut patterns: Vec<Pattern>) -> Self {
        patterns.sort_by(|a, b| a.items.len().cmp(&b.items.len()).then_with(|| a.items.cmp(&b.items)));
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn into_patterns(self) -> Vec<Pattern> {
        self.patterns
    }

    /// Support of the set with exactly these (sorted) items, if reported.
    pub fn support_of(&self, items: &[usize]) -> Option<Supp> {
        self.patterns
            .binary_search_by(|p| p.items.len().cmp(&items.len()).then_with(|| p.items.as_slice().cmp(items)))
            .ok()
            .map(|idx| self.patterns[idx].support)
    }

    /// (items, support) pairs in output order.
    pub fn to_pairs(&self) -> Vec<(Vec<usize>, Supp)> {
        self.patterns.iter().map(|p| (p.items.clone(), p.support)).collect()
    }

    pub fn as_map(&self) -> HashMap<Vec<usize>, Supp> {
        self.patterns.iter().map(|p| (p.items.clone(), p.support)).collect()
    }

    /// Groups the sets by size; level `i` holds the sets of size `i + 1`.
    pub fn levels(&self) -> Vec<FrequentLevel> {
        let mut result: Vec<FrequentLevel> = Vec::new();
        for pattern in self.patterns.iter().filter(|p| !p.is_empty()) {
            while result.len() < pattern.len() {
                result.push(FrequentLevel::new(result.len() + 1));
            }
            result[pattern.len() - 1].add_itemset(&pattern.items, pattern.support);
        }
        result
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}
