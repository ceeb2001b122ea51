//! Single-array SaM. With a binary search ratio the projection is merged
//! back by locating insertion points whenever it is that many times shorter
//! than the rest of the array.

use super::{initial, merge, merge_bsearch, mine_packed, Tract};
use crate::data::{Suffixes, Supp, Word};
use crate::error::Result;
use crate::fim16::Fim16;
use crate::memory::estimate_suffix_lists;
use crate::miner::Context;
use crate::report::Reporter;

pub(super) struct Arrays<'a, 'c, R> {
    suffixes: &'a Suffixes,
    smin: Supp,
    perfect: bool,
    bsearch: Option<usize>,
    m16: Option<Fim16>,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
}

impl<'a, 'c, R: Reporter> Arrays<'a, 'c, R> {
    pub(super) fn new(
        suffixes: &'a Suffixes,
        smin: Supp,
        perfect: bool,
        bsearch: Option<usize>,
        m16: Option<Fim16>,
        rep: &'a mut R,
        ctx: &'a Context<'c>,
    ) -> Self {
        Self { suffixes, smin, perfect, bsearch, m16, rep, ctx }
    }

    pub(super) fn run(&mut self) -> Result<()> {
        let mut a = initial(self.suffixes);
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Tract>(0, a.len()))?;
        self.rec(&mut a)
    }

    fn rec(&mut self, a: &mut Vec<Tract>) -> Result<()> {
        self.ctx.check()?;
        let n = a.len();
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Tract>(0, 2 * n))?;
        let mut proj: Vec<Tract> = Vec::with_capacity(n);
        let mut buf: Vec<Tract> = Vec::with_capacity(n);
        let pex = if self.perfect { self.rep.support() } else { Supp::MAX };
        while let Some(first) = a.first() {
            let item = match self.suffixes.at(first.pos) {
                Word::Item(i) => i,
                Word::Packed(_) => {
                    if let Some(m16) = self.m16.as_mut() {
                        mine_packed(self.suffixes, a.iter().copied(), m16, &mut *self.rep, self.ctx)?;
                    }
                    break;
                }
                Word::End => break,
            };
            let split = a.iter().take_while(|t| self.suffixes.at(t.pos) == Word::Item(item)).count();
            let mut supp: Supp = 0;
            for t in &mut a[..split] {
                t.pos += 1;
                supp += t.occ;
            }
            if supp >= pex {
                // every transaction held the item, so the array stays sorted
                self.rep.add_pex(item);
                if a.last().is_some_and(|t| self.suffixes.at(t.pos) == Word::End) {
                    a.pop();
                }
                continue;
            }
            proj.clear();
            proj.extend(a[..split].iter().copied().filter(|t| self.suffixes.at(t.pos) != Word::End));
            buf.clear();
            let rest = &a[split..];
            match self.bsearch {
                Some(ratio) if proj.len().saturating_mul(ratio) <= rest.len() => {
                    merge_bsearch(self.suffixes, rest, &proj, &mut buf)
                }
                _ => merge(self.suffixes, rest, &proj, &mut buf),
            }
            std::mem::swap(a, &mut buf);
            if supp < self.smin || !self.rep.add(item, supp)? {
                continue;
            }
            if !proj.is_empty() && self.rep.extendable(1) {
                self.rec(&mut proj)?;
            }
            self.rep.report()?;
            self.rep.remove(1);
        }
        Ok(())
    }
}
