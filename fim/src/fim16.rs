//! The 16-items machine: mines up to sixteen items whose occurrences in a
//! projection are packed into one `u16` mask per transaction.
//!
//! Transactions are kept in buckets keyed by their highest set bit. Items
//! are processed from the highest bit down; each bucket is projected (bit
//! removed, masks collated) for the recursion and then eliminated into the
//! bucket of the next lower bit, so no mask is ever copied twice per level.

use crate::data::{Item, Supp};
use crate::error::Result;
use crate::miner::Context;
use crate::report::Reporter;

/// Largest number of items a mask can hold.
pub const MAX_ITEMS: usize = 16;

type Masks = Vec<(u16, Supp)>;

#[derive(Debug, Clone)]
pub struct Fim16 {
    smin: Supp,
    dim: usize,
    perfect: bool,
    pending: Masks,
}

impl Fim16 {
    /// Machine for items `0..dim` (bit `i` stands for item `i`).
    pub fn new(smin: Supp, dim: usize, perfect: bool) -> Self {
        debug_assert!(dim <= MAX_ITEMS);
        Self { smin: smin.max(1), dim: dim.min(MAX_ITEMS), perfect, pending: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queues a packed transaction for the next [`mine`](Fim16::mine).
    pub fn add(&mut self, mask: u16, supp: Supp) {
        if mask != 0 && supp > 0 {
            self.pending.push((mask, supp));
        }
    }

    /// Reports every frequent combination of the queued masks as an
    /// extension of the reporter's current prefix and clears the queue.
    pub fn mine<R: Reporter>(&mut self, rep: &mut R, ctx: &Context<'_>) -> Result<()> {
        let mut masks = std::mem::take(&mut self.pending);
        if masks.is_empty() {
            return Ok(());
        }
        collate(&mut masks);
        let _guard = ctx.reserve(bytes(masks.len()))?;
        let buckets = distribute(masks, self.dim);
        self.rec(buckets, self.dim, rep, ctx)
    }

    fn rec<R: Reporter>(&self, mut buckets: Vec<Masks>, k: usize, rep: &mut R, ctx: &Context<'_>) -> Result<()> {
        ctx.check()?;
        let pex = if self.perfect { rep.support() } else { Supp::MAX };
        for i in (0..k).rev() {
            let list = std::mem::take(&mut buckets[i]);
            if list.is_empty() {
                continue;
            }
            let bit = 1u16 << i;
            let supp: Supp = list.iter().map(|&(_, w)| w).sum();
            if supp >= pex {
                rep.add_pex(i as Item);
            } else if supp >= self.smin && rep.add(i as Item, supp)? {
                if i > 0 && rep.extendable(1) {
                    let mut proj: Masks = list
                        .iter()
                        .map(|&(m, w)| (m & !bit, w))
                        .filter(|&(m, _)| m != 0)
                        .collect();
                    if !proj.is_empty() {
                        collate(&mut proj);
                        let _guard = ctx.reserve(bytes(proj.len()))?;
                        self.rec(distribute(proj, i), i, rep, ctx)?;
                    }
                }
                rep.report()?;
                rep.remove(1);
            }
            for (m, w) in list {
                let rest = m & !bit;
                if rest != 0 {
                    buckets[highest(rest)].push((rest, w));
                }
            }
        }
        Ok(())
    }
}

fn highest(mask: u16) -> usize {
    15 - mask.leading_zeros() as usize
}

fn bytes(n: usize) -> usize {
    n * std::mem::size_of::<(u16, Supp)>()
}

/// Sorts by mask and merges equal masks.
fn collate(masks: &mut Masks) {
    masks.sort_unstable_by_key(|&(m, _)| m);
    masks.dedup_by(|next, kept| {
        if next.0 == kept.0 {
            kept.1 += next.1;
            true
        } else {
            false
        }
    });
}

fn distribute(masks: Masks, k: usize) -> Vec<Masks> {
    let mut buckets: Vec<Masks> = vec![Vec::new(); k];
    for (m, w) in masks {
        buckets[highest(m)].push((m, w));
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MinerConfig, Target};
    use crate::data::TransactionStore;
    use crate::miner::RunState;
    use crate::report::ItemSetReporter;

    fn run(target: Target, smin: i64, masks: &[(u16, Supp)]) -> Vec<(Vec<usize>, Supp)> {
        // items must already be in frequency order for the bits to line up
        let mut tracts = Vec::new();
        for &(m, w) in masks {
            let items: Vec<usize> = (0..4).filter(|&i| m & (1 << i) != 0).collect();
            tracts.extend(std::iter::repeat(items).take(w as usize));
        }
        let store = TransactionStore::from_transactions(&tracts, 1);
        let mut cfg = MinerConfig::new(target, -(smin as f64));
        cfg.zmin = 1;
        let mut rep = ItemSetReporter::new(&cfg, &store);
        let state = RunState::default();
        let ctx = state.context();
        let mut m16 = Fim16::new(smin as Supp, 4, true);
        for &(m, w) in masks {
            m16.add(m, w);
        }
        m16.mine(&mut rep, &ctx).unwrap();
        assert!(m16.is_empty());
        rep.finish().to_pairs()
    }

    #[test]
    fn test_mines_packed_transactions() {
        // {0,1,2} {0,1} {0,2,3} {1,2} {0,1,2,3}
        let masks = [(0b0111, 1), (0b0011, 1), (0b1101, 1), (0b0110, 1), (0b1111, 1)];
        let found = run(Target::All, 2, &masks);
        let expected = vec![
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
        ];
        assert_eq!(found, expected);
    }

    #[test]
    fn test_equal_masks_are_collated() {
        let found = run(Target::All, 3, &[(0b10, 1), (0b11, 1), (0b11, 1), (0b01, 2)]);
        assert_eq!(found, vec![(vec![0], 4), (vec![1], 3)]);
    }

    #[test]
    fn test_highest_bit() {
        assert_eq!(highest(1), 0);
        assert_eq!(highest(0b1010), 3);
        assert_eq!(highest(0x8000), 15);
    }
}
