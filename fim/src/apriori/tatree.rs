//! Transaction prefix tree. Transactions sharing a prefix share the nodes
//! of that prefix, so a candidate set is matched once per distinct prefix
//! instead of once per transaction.

use crate::data::{Item, Supp, Transaction};

#[derive(Debug, Clone)]
pub(super) struct TaNode {
    pub item: Item,
    /// Weight of the transactions passing through this node.
    pub wgt: Supp,
    /// Items on the longest path starting at this node (the node included).
    pub depth: usize,
    /// Ascending by item.
    pub children: Vec<u32>,
}

#[derive(Debug, Clone)]
pub(super) struct TaTree {
    nodes: Vec<TaNode>,
}

impl TaTree {
    pub const ROOT: u32 = 0;

    pub fn build(tracts: &[Transaction]) -> Self {
        let mut nodes = vec![TaNode { item: Item::MAX, wgt: 0, depth: 0, children: Vec::new() }];
        for t in tracts {
            let mut node = 0usize;
            nodes[0].wgt += t.weight;
            for &item in &t.items {
                let pos = nodes[node].children.binary_search_by_key(&item, |&c| nodes[c as usize].item);
                node = match pos {
                    Ok(idx) => nodes[node].children[idx] as usize,
                    Err(idx) => {
                        let id = nodes.len();
                        nodes.push(TaNode { item, wgt: 0, depth: 0, children: Vec::new() });
                        nodes[node].children.insert(idx, id as u32);
                        id
                    }
                };
                nodes[node].wgt += t.weight;
            }
        }
        // children are always created after their parent
        for i in (0..nodes.len()).rev() {
            let below = nodes[i].children.iter().map(|&c| nodes[c as usize].depth).max().unwrap_or(0);
            nodes[i].depth = below + usize::from(i != 0);
        }
        Self { nodes }
    }

    #[inline]
    pub fn node(&self, id: u32) -> &TaNode {
        &self.nodes[id as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tract(items: &[Item], weight: Supp) -> Transaction {
        Transaction { items: items.to_vec(), weight }
    }

    #[test]
    fn test_shared_prefixes() {
        let tree = TaTree::build(&[tract(&[0, 1, 2], 1), tract(&[0, 1], 2), tract(&[1, 3], 1)]);
        assert_eq!(tree.len(), 6);
        let root = tree.node(TaTree::ROOT);
        assert_eq!(root.wgt, 4);
        assert_eq!(root.depth, 3);
        let zero = tree.node(root.children[0]);
        assert_eq!((zero.item, zero.wgt, zero.depth), (0, 3, 3));
        let one = tree.node(zero.children[0]);
        assert_eq!((one.item, one.wgt, one.depth), (1, 3, 2));
        let other = tree.node(root.children[1]);
        assert_eq!((other.item, other.wgt, other.depth), (1, 1, 2));
    }
}
