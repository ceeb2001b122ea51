use std::collections::HashMap;

use super::tree::FpTree;
use crate::data::{Item, Supp, TransactionStore};

/// Builds the tree over the items of `store` with support at least `smin`.
/// Recoded ids put the most frequent items next to the root.
pub fn build_fp_tree(store: &TransactionStore, smin: Supp) -> FpTree {
    let mut tree = FpTree::new();
    let mut items: Vec<Item> = Vec::new();
    for t in store.iter() {
        items.clear();
        items.extend(t.items.iter().copied().filter(|&i| store.support(i) >= smin));
        tree.insert(&items, t.weight);
    }
    tree
}

/// Builds the conditional tree of one item from its prefix paths, keeping
/// the items with support at least `smin` that are not in `exclude`.
pub fn build_conditional_fp_tree(prefix_paths: &[(Vec<Item>, Supp)], smin: Supp, exclude: &[Item]) -> FpTree {
    let mut item_counts: HashMap<Item, Supp> = HashMap::new();
    for (path, count) in prefix_paths {
        for &item in path {
            *item_counts.entry(item).or_insert(0) += count;
        }
    }
    let mut conditional_tree = FpTree::new();
    let mut filtered: Vec<Item> = Vec::new();
    for (path, count) in prefix_paths {
        filtered.clear();
        filtered.extend(
            path.iter()
                .copied()
                .filter(|item| item_counts[item] >= smin && !exclude.contains(item)),
        );
        if !filtered.is_empty() {
            conditional_tree.insert(&filtered, *count);
        }
    }
    conditional_tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditional_tree_drops_rare_and_excluded_items() {
        let paths = vec![(vec![0, 1, 2], 2), (vec![0, 2], 1), (vec![1, 3], 1)];
        let tree = build_conditional_fp_tree(&paths, 2, &[1]);
        assert_eq!(tree.items(), vec![0, 2]);
        assert_eq!(tree.support(0), 3);
        assert_eq!(tree.single_path(), Some(vec![(0, 3), (2, 3)]));
    }

    #[test]
    fn test_build_filters_by_support() {
        let store = TransactionStore::from_transactions(&[vec![0, 1], vec![0, 2], vec![0, 1, 3]], 1);
        let tree = build_fp_tree(&store, 2);
        assert_eq!(tree.items(), vec![0, 1]);
        assert_eq!(tree.nodes[tree.root_index].count, 3);
    }
}
