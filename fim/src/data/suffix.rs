//! Flat item arrays with transactions in descending item order, shared by
//! the suffix-list engines (RElim, SaM).
//!
//! Each transaction occupies a run of words terminated by [`END`]. Items
//! below the packing limit are folded into one trailing word tagged with
//! [`PACKED`], which holds their bit mask. A transaction suffix is then just
//! a position in this array.

use std::cmp::Ordering;

use super::{Item, Supp, TransactionStore};

pub const END: usize = usize::MAX;
pub const PACKED: usize = 1 << (usize::BITS - 1);

/// What a word of the flat array holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    Item(Item),
    Packed(u16),
    End,
}

#[inline]
pub fn word(w: usize) -> Word {
    if w == END {
        Word::End
    } else if w & PACKED != 0 {
        Word::Packed((w & 0xFFFF) as u16)
    } else {
        Word::Item(w)
    }
}

/// Sort key of a raw word: the end of a suffix ranks below a packed mask,
/// which ranks below every item.
#[inline]
pub fn rank(w: usize) -> (u8, usize) {
    match word(w) {
        Word::End => (0, 0),
        Word::Packed(m) => (1, m as usize),
        Word::Item(i) => (2, i),
    }
}

#[derive(Debug, Clone)]
pub struct Suffixes {
    words: Vec<usize>,
    starts: Vec<usize>,
    weights: Vec<Supp>,
    packed: usize,
}

impl Suffixes {
    /// Encodes `store`, packing items `0..packed` (at most 16) into masks.
    pub fn new(store: &TransactionStore, packed: usize) -> Self {
        debug_assert!(packed <= 16);
        let mut words = Vec::with_capacity(store.extent() + 2 * store.len());
        let mut starts = Vec::with_capacity(store.len());
        let mut weights = Vec::with_capacity(store.len());
        for t in store.iter() {
            starts.push(words.len());
            weights.push(t.weight);
            let mut mask = 0u16;
            for &item in t.items.iter().rev() {
                if item < packed {
                    mask |= 1 << item;
                } else {
                    words.push(item);
                }
            }
            if mask != 0 {
                words.push(PACKED | mask as usize);
            }
            words.push(END);
        }
        Self { words, starts, weights, packed }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Number of packed items (0 if nothing is packed).
    pub fn packed(&self) -> usize {
        self.packed
    }

    /// Start position and weight of transaction `idx`.
    pub fn transaction(&self, idx: usize) -> (usize, Supp) {
        (self.starts[idx], self.weights[idx])
    }

    #[inline]
    pub fn at(&self, pos: usize) -> Word {
        word(self.words[pos])
    }

    #[inline]
    pub fn raw(&self, pos: usize) -> usize {
        self.words[pos]
    }

    /// The suffix starting at `pos`, sentinel excluded.
    pub fn suffix(&self, pos: usize) -> &[usize] {
        let len = self.words[pos..].iter().position(|&w| w == END).unwrap_or(0);
        &self.words[pos..pos + len]
    }

    /// Lexicographic comparison of two suffixes by word [`rank`]; a proper
    /// prefix compares less.
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (mut i, mut j) = (a, b);
        loop {
            let (x, y) = (self.words[i], self.words[j]);
            if x == y {
                if x == END {
                    return Ordering::Equal;
                }
                i += 1;
                j += 1;
                continue;
            }
            return rank(x).cmp(&rank(y));
        }
    }
}
