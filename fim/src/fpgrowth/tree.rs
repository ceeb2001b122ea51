use std::collections::HashMap;

use crate::data::{Item, Supp};

#[derive(Debug, Clone)]
pub struct FpNode {
    pub item: Option<Item>,
    pub count: Supp,
    pub parent: Option<usize>,
    pub children: HashMap<Item, usize>,
}

/// Prefix tree of transactions with one header list per item linking all
/// nodes of that item.
#[derive(Debug, Clone)]
pub struct FpTree {
    pub nodes: Vec<FpNode>,
    pub header_table: HashMap<Item, Vec<usize>>,
    pub root_index: usize,
}

impl FpNode {
    pub fn new_root() -> Self {
        Self { item: None, count: 0, parent: None, children: HashMap::new() }
    }

    pub fn new_item(item: Item, count: Supp, parent: Option<usize>) -> Self {
        Self { item: Some(item), count, parent, children: HashMap::new() }
    }
}

impl Default for FpTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FpTree {
    pub fn new() -> Self {
        Self { nodes: vec![FpNode::new_root()], header_table: HashMap::new(), root_index: 0 }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Inserts a path of items (in tree order) carrying weight `count`.
    pub fn insert(&mut self, items: &[Item], count: Supp) {
        let mut current = self.root_index;
        self.nodes[current].count += count;
        for &item in items {
            if let Some(&child) = self.nodes[current].children.get(&item) {
                self.nodes[child].count += count;
                current = child;
            } else {
                let idx = self.nodes.len();
                self.nodes.push(FpNode::new_item(item, count, Some(current)));
                self.nodes[current].children.insert(item, idx);
                self.header_table.entry(item).or_default().push(idx);
                current = idx;
            }
        }
    }

    /// Sum of the counts of all nodes of `item`.
    pub fn support(&self, item: Item) -> Supp {
        self.header_table
            .get(&item)
            .map_or(0, |nodes| nodes.iter().map(|&idx| self.nodes[idx].count).sum())
    }

    /// Items present in the tree, ascending.
    pub fn items(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.header_table.keys().copied().collect();
        items.sort_unstable();
        items
    }

    /// The paths from the root to the parents of the nodes of `item`, each
    /// with the count of the node it leads to. Empty paths are skipped.
    pub fn prefix_paths(&self, item: Item) -> Vec<(Vec<Item>, Supp)> {
        self.header_table.get(&item).map_or(Vec::new(), |nodes| {
            nodes
                .iter()
                .filter_map(|&idx| {
                    let mut path = Vec::new();
                    let mut current = self.nodes[idx].parent;
                    while let Some(i) = current {
                        if let Some(item) = self.nodes[i].item {
                            path.push(item);
                        }
                        current = self.nodes[i].parent;
                    }
                    path.reverse();
                    (!path.is_empty()).then_some((path, self.nodes[idx].count))
                })
                .collect()
        })
    }

    /// The items and counts along the tree if it has no branches.
    pub fn single_path(&self) -> Option<Vec<(Item, Supp)>> {
        let mut path = Vec::new();
        let mut current = self.root_index;
        loop {
            let node = &self.nodes[current];
            match node.children.len() {
                0 => return Some(path),
                1 => {
                    current = *node.children.values().next()?;
                    let child = &self.nodes[current];
                    if let Some(item) = child.item {
                        path.push((item, child.count));
                    }
                }
                _ => return None,
            }
        }
    }
}
