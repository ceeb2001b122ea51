//! SaM with double source buffering: the transactions are spread over two
//! sorted sources and a projection is merged back into the shorter one.
//! The sources are combined once both have grown past the merge limit.

use super::{initial, merge, mine_packed, Tract};
use crate::data::suffix::{rank, word};
use crate::data::{Suffixes, Supp, Word};
use crate::error::Result;
use crate::fim16::Fim16;
use crate::memory::estimate_suffix_lists;
use crate::miner::Context;
use crate::report::Reporter;

pub(super) struct DoubleSource<'a, 'c, R> {
    suffixes: &'a Suffixes,
    smin: Supp,
    perfect: bool,
    limit: usize,
    m16: Option<Fim16>,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
}

impl<'a, 'c, R: Reporter> DoubleSource<'a, 'c, R> {
    pub(super) fn new(
        suffixes: &'a Suffixes,
        smin: Supp,
        perfect: bool,
        limit: usize,
        m16: Option<Fim16>,
        rep: &'a mut R,
        ctx: &'a Context<'c>,
    ) -> Self {
        Self { suffixes, smin, perfect, limit, m16, rep, ctx }
    }

    pub(super) fn run(&mut self) -> Result<()> {
        let a = initial(self.suffixes);
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Tract>(0, a.len()))?;
        self.rec(a)
    }

    /// Leading word of the larger of the two source heads.
    fn lead(&self, src: &[Vec<Tract>; 2]) -> Option<Word> {
        let words = src.iter().filter_map(|s| s.first()).map(|t| self.suffixes.raw(t.pos));
        words.max_by_key(|&w| rank(w)).map(word)
    }

    /// Number of leading elements of `s` that start with `item`.
    fn run_of(&self, s: &[Tract], item: usize) -> usize {
        s.iter().take_while(|t| self.suffixes.at(t.pos) == Word::Item(item)).count()
    }

    fn rec(&mut self, a: Vec<Tract>) -> Result<()> {
        self.ctx.check()?;
        let n = a.len();
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Tract>(0, 3 * n))?;
        let pex = if self.perfect { self.rep.support() } else { Supp::MAX };
        let mut src: [Vec<Tract>; 2] = [a, Vec::new()];
        let mut proj: Vec<Tract> = Vec::with_capacity(n);
        let mut buf: Vec<Tract> = Vec::with_capacity(n);
        while let Some(lead) = self.lead(&src) {
            let item = match lead {
                Word::Item(i) => i,
                Word::Packed(_) => {
                    if let Some(m16) = self.m16.as_mut() {
                        let tracts = src[0].iter().chain(src[1].iter()).copied();
                        mine_packed(self.suffixes, tracts, m16, &mut *self.rep, self.ctx)?;
                    }
                    break;
                }
                Word::End => break,
            };
            let split = [self.run_of(&src[0], item), self.run_of(&src[1], item)];
            let mut supp: Supp = 0;
            for (s, &k) in src.iter_mut().zip(&split) {
                for t in &mut s[..k] {
                    t.pos += 1;
                    supp += t.occ;
                }
            }
            if supp >= pex {
                self.rep.add_pex(item);
                for s in src.iter_mut() {
                    if s.last().is_some_and(|t| self.suffixes.at(t.pos) == Word::End) {
                        s.pop();
                    }
                }
                continue;
            }
            proj.clear();
            merge(self.suffixes, &src[0][..split[0]], &src[1][..split[1]], &mut proj);
            if proj.last().is_some_and(|t| self.suffixes.at(t.pos) == Word::End) {
                proj.pop();
            }
            src[0].drain(..split[0]);
            src[1].drain(..split[1]);
            let into = if src[0].len() < src[1].len() { 0 } else { 1 };
            buf.clear();
            merge(self.suffixes, &src[into], &proj, &mut buf);
            std::mem::swap(&mut src[into], &mut buf);
            if src[0].len() > self.limit && src[1].len() > self.limit {
                buf.clear();
                merge(self.suffixes, &src[0], &src[1], &mut buf);
                std::mem::swap(&mut src[0], &mut buf);
                src[1].clear();
            }
            if supp < self.smin || !self.rep.add(item, supp)? {
                continue;
            }
            if !proj.is_empty() && self.rep.extendable(1) {
                self.rec(std::mem::take(&mut proj))?;
            }
            self.rep.report()?;
            self.rep.remove(1);
        }
        Ok(())
    }
}
