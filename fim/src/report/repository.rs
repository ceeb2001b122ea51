//! Prefix tree of item sets with support, used to collect candidates that
//! can only be judged once the search is complete (closed, maximal and
//! generator filtering, Carpenter's intersection results).

use crate::arena::{Arena, NodeId};
use crate::data::{Item, Supp};
use crate::memory::estimate_tree;

/// Values stored for one item set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stored {
    pub supp: Supp,
    pub wgt: f64,
    pub eval: Option<f64>,
}

#[derive(Debug, Clone)]
struct RepoNode {
    item: Item,
    set: Option<Stored>,
    /// Largest support stored in this subtree.
    max: Supp,
    /// Longest path below this node.
    height: usize,
    /// Largest item below this node.
    last: Item,
    children: Vec<NodeId>,
}

impl RepoNode {
    fn new(item: Item) -> Self {
        Self { item, set: None, max: 0, height: 0, last: 0, children: Vec::new() }
    }

    /// Whether the subtree below can hold all of `items` with support `min`.
    fn may_hold(&self, items: &[Item], min: Supp) -> bool {
        self.max >= min
            && self.height >= items.len()
            && items.last().map_or(true, |&l| self.last >= l)
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    nodes: Arena<RepoNode>,
    root: NodeId,
    count: usize,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(RepoNode::new(Item::MAX));
        Self { nodes, root, count: 0 }
    }

    /// Number of stored sets.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Approximate size of the node arena.
    pub fn bytes(&self) -> usize {
        estimate_tree::<RepoNode>(self.nodes.len())
    }

    fn child(&self, node: NodeId, item: Item) -> Result<usize, usize> {
        self.nodes[node]
            .children
            .binary_search_by_key(&item, |&c| self.nodes[c].item)
    }

    fn find_or_insert(&mut self, items: &[Item], supp: Supp) -> NodeId {
        let last = items.last().copied().unwrap_or(0);
        let mut node = self.root;
        for (depth, &item) in items.iter().enumerate() {
            let n = &mut self.nodes[node];
            n.max = n.max.max(supp);
            n.height = n.height.max(items.len() - depth);
            n.last = n.last.max(last);
            node = match self.child(node, item) {
                Ok(idx) => self.nodes[node].children[idx],
                Err(idx) => {
                    let id = self.nodes.alloc(RepoNode::new(item));
                    self.nodes[node].children.insert(idx, id);
                    id
                }
            };
        }
        self.nodes[node].max = self.nodes[node].max.max(supp);
        node
    }

    /// Adds a set (items ascending) or raises its support.
    /// Returns `true` if the set was new or its support increased.
    pub fn add(&mut self, items: &[Item], supp: Supp) -> bool {
        self.add_weighted(items, supp, supp as f64, None)
    }

    pub fn add_weighted(&mut self, items: &[Item], supp: Supp, wgt: f64, eval: Option<f64>) -> bool {
        debug_assert!(items.windows(2).all(|w| w[0] < w[1]));
        let node = self.find_or_insert(items, supp);
        let slot = &mut self.nodes[node].set;
        match slot {
            Some(stored) if stored.supp >= supp => false,
            Some(stored) => {
                *stored = Stored { supp, wgt, eval };
                true
            }
            None => {
                *slot = Some(Stored { supp, wgt, eval });
                self.count += 1;
                true
            }
        }
    }

    pub fn get(&self, items: &[Item]) -> Option<Stored> {
        let mut node = self.root;
        for &item in items {
            let idx = self.child(node, item).ok()?;
            node = self.nodes[node].children[idx];
        }
        self.nodes[node].set
    }

    pub fn support(&self, items: &[Item]) -> Option<Supp> {
        self.get(items).map(|s| s.supp)
    }

    /// Whether a stored superset of `items` has support at least `min`.
    /// With `proper`, the set itself does not count.
    pub fn has_superset(&self, items: &[Item], min: Supp, proper: bool) -> bool {
        self.superset_rec(self.root, items, min, !proper)
    }

    /// `items` must all be found strictly below `node`.
    fn superset_rec(&self, node: NodeId, items: &[Item], min: Supp, extended: bool) -> bool {
        let n = &self.nodes[node];
        if !n.may_hold(items, min) {
            return false;
        }
        let Some((&first, rest)) = items.split_first() else {
            if extended && n.set.is_some_and(|s| s.supp >= min) {
                return true;
            }
            return n.children.iter().any(|&c| self.nodes[c].max >= min && self.subtree_has(c, min));
        };
        for &c in &n.children {
            let child = &self.nodes[c];
            if child.item > first {
                break;
            }
            let found = if child.item == first {
                self.superset_rec(c, rest, min, extended)
            } else {
                child.may_hold(items, min) && self.superset_rec(c, items, min, true)
            };
            if found {
                return true;
            }
        }
        false
    }

    fn subtree_has(&self, node: NodeId, min: Supp) -> bool {
        let n = &self.nodes[node];
        if n.max < min {
            return false;
        }
        if n.set.is_some_and(|s| s.supp >= min) {
            return true;
        }
        n.children.iter().any(|&c| self.subtree_has(c, min))
    }

    /// Calls `f` with the intersection of every stored set and the items
    /// flagged in `keep`, together with the stored support. The same
    /// intersection is passed once per stored set producing it.
    pub fn for_each_intersection<F: FnMut(&[Item], Supp)>(&self, keep: &[bool], mut f: F) {
        let mut path = Vec::new();
        self.intersect(self.root, keep, &mut path, &mut f);
    }

    fn intersect<F: FnMut(&[Item], Supp)>(
        &self,
        node: NodeId,
        keep: &[bool],
        path: &mut Vec<Item>,
        f: &mut F,
    ) {
        if let Some(stored) = self.nodes[node].set {
            f(path, stored.supp);
        }
        for &c in &self.nodes[node].children {
            let item = self.nodes[c].item;
            let kept = keep.get(item).copied().unwrap_or(false);
            if kept {
                path.push(item);
            }
            self.intersect(c, keep, path, f);
            if kept {
                path.pop();
            }
        }
    }

    /// Keeps only the sets for which `f` holds, rebuilding the tree.
    pub fn retain<F: FnMut(&[Item], &Stored) -> bool>(&mut self, mut f: F) {
        let mut kept = Repository::new();
        for (set, stored) in self.sets() {
            if f(&set, &stored) {
                kept.add_weighted(&set, stored.supp, stored.wgt, stored.eval);
            }
        }
        *self = kept;
    }

    /// Every stored set with its values, in depth-first (lexicographic) order.
    pub fn sets(&self) -> Vec<(Vec<Item>, Stored)> {
        let mut out = Vec::with_capacity(self.count);
        let mut path = Vec::new();
        self.collect(self.root, &mut path, &mut out);
        out
    }

    fn collect(&self, node: NodeId, path: &mut Vec<Item>, out: &mut Vec<(Vec<Item>, Stored)>) {
        if let Some(stored) = self.nodes[node].set {
            out.push((path.clone(), stored));
        }
        for &c in &self.nodes[node].children {
            path.push(self.nodes[c].item);
            self.collect(c, path, out);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_maximum() {
        let mut repo = Repository::new();
        assert!(repo.add(&[0, 2], 3));
        assert!(!repo.add(&[0, 2], 2));
        assert!(repo.add(&[0, 2], 5));
        assert_eq!(repo.support(&[0, 2]), Some(5));
        assert_eq!(repo.support(&[0]), None);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_superset_queries() {
        let mut repo = Repository::new();
        repo.add(&[0, 1, 3], 2);
        repo.add(&[1], 4);
        repo.add(&[2, 3], 1);

        assert!(repo.has_superset(&[1, 3], 2, true));
        assert!(!repo.has_superset(&[1, 3], 3, true));
        assert!(repo.has_superset(&[1], 4, false));
        assert!(!repo.has_superset(&[1], 4, true));
        assert!(repo.has_superset(&[1], 2, true));
        assert!(repo.has_superset(&[3], 1, true));
        assert!(!repo.has_superset(&[0, 1, 3], 0, true));
        assert!(repo.has_superset(&[], 4, true));
    }

    #[test]
    fn test_superset_bounds_agree_with_scan() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(17);
        let mut repo = Repository::new();
        let mut stored: Vec<(Vec<Item>, Supp)> = Vec::new();
        for _ in 0..60 {
            let set: Vec<Item> = (0..12).filter(|_| rng.gen_bool(0.3)).collect();
            let supp = rng.gen_range(1..=8);
            repo.add(&set, supp);
            stored.push((set, supp));
        }
        for _ in 0..200 {
            let query: Vec<Item> = (0..12).filter(|_| rng.gen_bool(0.2)).collect();
            let min = rng.gen_range(1..=8);
            let proper = rng.gen_bool(0.5);
            let expected = stored.iter().any(|(set, _)| {
                let supp = repo.support(set).unwrap_or(0);
                supp >= min && query.iter().all(|i| set.contains(i)) && (!proper || set.len() > query.len())
            });
            assert_eq!(repo.has_superset(&query, min, proper), expected, "{:?} {} {}", query, min, proper);
        }
    }

    #[test]
    fn test_intersections_and_retain() {
        let mut repo = Repository::new();
        repo.add(&[0, 1, 3], 2);
        repo.add(&[1, 2], 4);
        repo.add(&[2], 1);

        let keep = [false, true, true, true];
        let mut seen = Vec::new();
        repo.for_each_intersection(&keep, |set, supp| seen.push((set.to_vec(), supp)));
        assert_eq!(seen, vec![(vec![1, 3], 2), (vec![1, 2], 4), (vec![2], 1)]);

        repo.retain(|set, stored| set.len() > 1 && stored.supp >= 2);
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.support(&[2]), None);
        assert!(repo.has_superset(&[1], 4, true));
        assert!(!repo.has_superset(&[3], 3, true));
    }

    #[test]
    fn test_sets_are_lexicographic() {
        let mut repo = Repository::new();
        repo.add(&[1], 4);
        repo.add(&[], 5);
        repo.add(&[0, 1], 2);
        let sets: Vec<Vec<Item>> = repo.sets().into_iter().map(|(s, _)| s).collect();
        assert_eq!(sets, vec![vec![], vec![0, 1], vec![1]]);
    }
}
