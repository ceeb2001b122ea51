//! SaM with item insertion. Items are visited from the largest id down
//! whether or not they lead a transaction, since transactions that lack an
//! item may still support it with a penalized weight. Those transactions
//! enter the projection with no occurrences; empty suffixes are kept as
//! they can receive further insertions.

use std::cmp::Ordering;
use std::marker::PhantomData;

use crate::config::InsertionConfig;
use crate::data::{Suffixes, Supp, TransactionStore, Word};
use crate::error::Result;
use crate::memory::estimate_suffix_lists;
use crate::miner::Context;
use crate::report::Reporter;
use crate::tnorm::TNorm;
use crate::weight::SuffixWeight;

#[derive(Debug, Clone, Copy)]
struct Elem<W> {
    pos: usize,
    occ: Supp,
    w: W,
}

pub(super) struct Insertion<'a, 'c, R, W> {
    suffixes: &'a Suffixes,
    store: &'a TransactionStore,
    tnorm: TNorm,
    twgt: f64,
    smin: Supp,
    isup: f64,
    perfect: bool,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
    weight: PhantomData<W>,
}

impl<'a, 'c, R: Reporter, W: SuffixWeight> Insertion<'a, 'c, R, W> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        suffixes: &'a Suffixes,
        store: &'a TransactionStore,
        ins: &InsertionConfig,
        smin: Supp,
        isup: f64,
        perfect: bool,
        rep: &'a mut R,
        ctx: &'a Context<'c>,
    ) -> Self {
        Self {
            suffixes,
            store,
            tnorm: ins.tnorm,
            twgt: ins.twgt,
            smin,
            isup,
            perfect,
            rep,
            ctx,
            weight: PhantomData,
        }
    }

    /// Descending suffixes; equal suffixes ascending by weight key.
    fn order(&self, a: &Elem<W>, b: &Elem<W>) -> Ordering {
        self.suffixes
            .compare(b.pos, a.pos)
            .then_with(|| a.w.key().total_cmp(&b.w.key()))
    }

    pub(super) fn run(&mut self) -> Result<()> {
        let n = self.suffixes.len();
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Elem<W>>(0, n))?;
        let mut a: Vec<Elem<W>> = (0..n)
            .map(|t| {
                let (pos, occ) = self.suffixes.transaction(t);
                Elem { pos, occ, w: W::from_occ(occ) }
            })
            .collect();
        a.sort_by(|x, y| self.order(x, y));
        let mut out = Vec::with_capacity(a.len());
        for e in a {
            self.push(&mut out, e);
        }
        self.rec(&mut out, self.store.item_count())
    }

    /// Appends `e` to a sorted array, absorbing it into the last element
    /// where suffix and weight allow.
    fn push(&self, out: &mut Vec<Elem<W>>, e: Elem<W>) {
        if let Some(last) = out.last_mut() {
            if self.suffixes.compare(last.pos, e.pos).is_eq() && last.w.absorb(&e.w) {
                last.occ += e.occ;
                return;
            }
        }
        out.push(e);
    }

    /// Appends a group of elements with one suffix, ordered by weight key.
    fn push_group(&self, out: &mut Vec<Elem<W>>, mut group: Vec<Elem<W>>) {
        group.sort_by(|a, b| a.w.key().total_cmp(&b.w.key()));
        for e in group {
            self.push(out, e);
        }
    }

    fn rec(&mut self, a: &mut Vec<Elem<W>>, k: usize) -> Result<()> {
        self.ctx.check()?;
        let n = a.len();
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Elem<W>>(0, 3 * n))?;
        let pex = if self.perfect { self.rep.weight() } else { f64::INFINITY };
        let mut proj: Vec<Elem<W>> = Vec::with_capacity(n);
        let mut merged: Vec<Elem<W>> = Vec::with_capacity(n);
        for item in (0..k).rev() {
            let split = a.iter().take_while(|e| self.suffixes.at(e.pos) == Word::Item(item)).count();
            if split == 0 {
                continue;
            }
            let pen = self.store.penalty(item);
            let mut supp: Supp = 0;
            let mut sum = 0.0;
            let mut t: Vec<Elem<W>> = a[..split].to_vec();
            for e in t.iter_mut() {
                e.pos += 1;
                supp += e.occ;
                sum += e.w.total();
            }
            let real = sum;
            proj.clear();
            merged.clear();
            sum += self.merge(&a[split..], &t, pen, &mut merged, &mut proj);
            std::mem::swap(a, &mut merged);
            if real >= pex {
                self.rep.add_pex(item);
                continue;
            }
            if supp < self.smin || sum < self.isup || !self.rep.add_weighted(item, supp, sum)? {
                continue;
            }
            if !proj.is_empty() && self.rep.extendable(1) {
                self.rec(&mut proj, item)?;
            }
            self.rep.report()?;
            self.rep.remove(1);
        }
        Ok(())
    }

    /// Merges the transactions `s` that lack the current item with the
    /// stripped transactions `t` that hold it into `out` (item removed), and
    /// builds the projection `proj` from `t` plus penalized copies of `s`.
    /// Returns the weight the penalized copies add.
    fn merge(&self, s: &[Elem<W>], t: &[Elem<W>], pen: f64, out: &mut Vec<Elem<W>>, proj: &mut Vec<Elem<W>>) -> f64 {
        let penalize = |e: &Elem<W>| -> Option<Elem<W>> {
            if pen <= 0.0 {
                return None;
            }
            e.w.penalize(pen, self.tnorm, self.twgt).map(|w| Elem { pos: e.pos, occ: 0, w })
        };
        let mut added = 0.0;
        let (mut i, mut j) = (0, 0);
        while i < s.len() && j < t.len() {
            match self.suffixes.compare(s[i].pos, t[j].pos) {
                Ordering::Less => {
                    out.push(t[j]);
                    proj.push(t[j]);
                    j += 1;
                }
                Ordering::Greater => {
                    if let Some(p) = penalize(&s[i]) {
                        added += p.w.total();
                        proj.push(p);
                    }
                    out.push(s[i]);
                    i += 1;
                }
                Ordering::Equal => {
                    let x = i + s[i..].iter().take_while(|e| self.suffixes.compare(e.pos, s[i].pos).is_eq()).count();
                    let y = j + t[j..].iter().take_while(|e| self.suffixes.compare(e.pos, t[j].pos).is_eq()).count();
                    let mut copies: Vec<Elem<W>> = t[j..y].to_vec();
                    for e in &s[i..x] {
                        if let Some(p) = penalize(e) {
                            added += p.w.total();
                            copies.push(p);
                        }
                    }
                    self.push_group(proj, copies);
                    self.push_group(out, s[i..x].iter().chain(&t[j..y]).copied().collect());
                    i = x;
                    j = y;
                }
            }
        }
        for e in &t[j..] {
            out.push(*e);
            proj.push(*e);
        }
        for e in &s[i..] {
            if let Some(p) = penalize(e) {
                added += p.w.total();
                proj.push(p);
            }
            out.push(*e);
        }
        added
    }
}
