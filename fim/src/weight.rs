//! Weights of transaction suffixes under item insertion, shared by the
//! RElim and SaM insertion variants.

use crate::data::Supp;
use crate::tnorm::TNorm;

/// Weight carried by one suffix-list element.
pub trait SuffixWeight: Copy + std::fmt::Debug {
    /// Weight of `occ` identical transactions that contain every prefix item.
    fn from_occ(occ: Supp) -> Self;

    /// Contribution to the weight of the list the element is in.
    fn total(&self) -> f64;

    /// Weight after inserting an item with penalty `pen`, or `None` if the
    /// result falls below the transaction weight limit.
    fn penalize(&self, pen: f64, tnorm: TNorm, twgt: f64) -> Option<Self>;

    /// Tie breaker when sorting equal suffixes.
    fn key(&self) -> f64;

    /// Absorbs `other` (same suffix); `false` if the two cannot be combined.
    fn absorb(&mut self, other: &Self) -> bool;
}

/// Unlimited insertion: the summed weight of the element's transactions.
impl SuffixWeight for f64 {
    fn from_occ(occ: Supp) -> Self {
        occ as f64
    }

    fn total(&self) -> f64 {
        *self
    }

    fn penalize(&self, pen: f64, tnorm: TNorm, _twgt: f64) -> Option<Self> {
        Some(tnorm.apply(*self, pen))
    }

    fn key(&self) -> f64 {
        0.0
    }

    fn absorb(&mut self, other: &Self) -> bool {
        *self += other;
        true
    }
}

/// Limited insertion: a per-transaction weight and the number of
/// transactions sharing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Counted {
    wgt: f64,
    cnt: Supp,
}

impl SuffixWeight for Counted {
    fn from_occ(occ: Supp) -> Self {
        Counted { wgt: 1.0, cnt: occ }
    }

    fn total(&self) -> f64 {
        self.wgt * self.cnt as f64
    }

    fn penalize(&self, pen: f64, tnorm: TNorm, twgt: f64) -> Option<Self> {
        let wgt = tnorm.apply(self.wgt, pen);
        (wgt >= twgt).then_some(Counted { wgt, cnt: self.cnt })
    }

    fn key(&self) -> f64 {
        self.wgt
    }

    fn absorb(&mut self, other: &Self) -> bool {
        if self.wgt != other.wgt {
            return false;
        }
        self.cnt += other.cnt;
        true
    }
}
