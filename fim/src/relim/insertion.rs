//! RElim with item insertion: a transaction that lacks the current item
//! still supports it with a penalized weight. List 0 holds the suffixes
//! that are used up, list `i + 1` those led by item `i`.

use std::cmp::Ordering;
use std::marker::PhantomData;

use super::NIL;
use crate::config::InsertionConfig;
use crate::data::{Item, Suffixes, Supp, TransactionStore, Word};
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
    succ: u32,
}

#[derive(Debug, Clone, Copy)]
struct List {
    occ: Supp,
    wgt: f64,
    head: u32,
}

const EMPTY: List = List { occ: 0, wgt: 0.0, head: NIL };

struct Frame<W> {
    lists: Vec<List>,
    elems: Vec<Elem<W>>,
}

impl<W: SuffixWeight> Frame<W> {
    fn new(lists: usize, n: usize) -> Self {
        Self { lists: vec![EMPTY; lists], elems: Vec::with_capacity(n) }
    }

    fn clear(&mut self) {
        self.lists.fill(EMPTY);
        self.elems.clear();
    }

    fn push(&mut self, list: usize, pos: usize, occ: Supp, w: W) {
        let id = self.elems.len() as u32;
        let l = &mut self.lists[list];
        l.occ += occ;
        l.wgt += w.total();
        self.elems.push(Elem { pos, occ, w, succ: l.head });
        l.head = id;
    }
}

pub(super) struct Insertion<'a, 'c, R, W> {
    suffixes: &'a Suffixes,
    store: &'a TransactionStore,
    tnorm: TNorm,
    twgt: f64,
    smin: Supp,
    isup: f64,
    sort: usize,
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
        sort: usize,
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
            sort,
            perfect,
            rep,
            ctx,
            weight: PhantomData,
        }
    }

    /// List index and suffix position for an element positioned at `pos`.
    fn target(&self, pos: usize) -> (usize, usize) {
        match self.suffixes.at(pos) {
            Word::Item(i) => (i + 1, pos + 1),
            _ => (0, pos),
        }
    }

    pub(super) fn run(&mut self) -> Result<()> {
        let k = self.store.item_count();
        let n = self.suffixes.len();
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Elem<W>>(k + 1, n))?;
        let mut frame = Frame::new(k + 1, n);
        for t in 0..n {
            let (start, wgt) = self.suffixes.transaction(t);
            let (list, pos) = self.target(start);
            frame.push(list, pos, wgt, W::from_occ(wgt));
        }
        self.rec(&mut frame, k)
    }

    fn rec(&mut self, frame: &mut Frame<W>, k: usize) -> Result<()> {
        self.ctx.check()?;
        let n = frame.elems.len();
        let (mut proj, _guard) = if k > 1 && self.rep.extendable(2) {
            // inserted copies may double the element count
            let guard = self.ctx.reserve(estimate_suffix_lists::<Elem<W>>(k, 2 * n))?;
            (Some(Frame::<W>::new(k, 2 * n)), Some(guard))
        } else {
            (None, None)
        };
        let pex = if self.perfect { self.rep.weight() } else { f64::INFINITY };
        for item in (0..k).rev() {
            let cur = item + 1;
            if let Some(proj) = proj.as_mut() {
                proj.clear();
            }
            let pen = self.store.penalty(item);
            if pen > 0.0 {
                self.insert(frame, item, pen, proj.as_mut());
            }
            let List { occ, wgt, head } = frame.lists[cur];
            if wgt >= pex {
                self.rep.add_pex(item);
            } else if occ >= self.smin && wgt >= self.isup && self.rep.add_weighted(item, occ, wgt)? {
                if item > 0 && head != NIL {
                    if let Some(proj) = proj.as_mut() {
                        if item <= self.sort && frame.elems[head as usize].succ != NIL {
                            self.sort_list(frame, cur);
                        }
                        self.project(frame, cur, proj);
                        self.rec(proj, item)?;
                    }
                }
                self.rep.report()?;
                self.rep.remove(1);
            }
            self.eliminate(frame, cur);
        }
        Ok(())
    }

    /// Adds the penalized weight of every transaction lacking `item` to the
    /// list of `item` and copies those transactions into the projection.
    fn insert(&self, frame: &mut Frame<W>, item: Item, pen: f64, mut proj: Option<&mut Frame<W>>) {
        let mut added = 0.0;
        for list in 0..=item {
            let mut e = frame.lists[list].head;
            while e != NIL {
                let src = frame.elems[e as usize];
                if let Some(w) = src.w.penalize(pen, self.tnorm, self.twgt) {
                    added += w.total();
                    if let Some(p) = proj.as_deref_mut() {
                        p.push(list, src.pos, 0, w);
                    }
                }
                e = src.succ;
            }
        }
        frame.lists[item + 1].wgt += added;
    }

    fn project(&self, frame: &Frame<W>, cur: usize, proj: &mut Frame<W>) {
        let mut e = frame.lists[cur].head;
        while e != NIL {
            let src = frame.elems[e as usize];
            let (list, pos) = self.target(src.pos);
            proj.push(list, pos, src.occ, src.w);
            e = src.succ;
        }
    }

    fn eliminate(&self, frame: &mut Frame<W>, cur: usize) {
        let mut e = frame.lists[cur].head;
        frame.lists[cur] = EMPTY;
        while e != NIL {
            let src = frame.elems[e as usize];
            let (list, pos) = self.target(src.pos);
            let l = &mut frame.lists[list];
            l.occ += src.occ;
            l.wgt += src.w.total();
            frame.elems[e as usize].pos = pos;
            frame.elems[e as usize].succ = l.head;
            l.head = e;
            e = src.succ;
        }
    }

    /// Sorts list `cur` by suffix (then weight) and merges what can be merged.
    fn sort_list(&self, frame: &mut Frame<W>, cur: usize) {
        let mut ids = Vec::new();
        let mut e = frame.lists[cur].head;
        while e != NIL {
            ids.push(e);
            e = frame.elems[e as usize].succ;
        }
        let elems = &mut frame.elems;
        let order = |a: &Elem<W>, b: &Elem<W>| {
            self.suffixes
                .compare(a.pos, b.pos)
                .then_with(|| a.w.key().partial_cmp(&b.w.key()).unwrap_or(Ordering::Equal))
        };
        ids.sort_by(|&a, &b| order(&elems[a as usize], &elems[b as usize]));
        let mut kept: Vec<u32> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(&last) = kept.last() {
                let other = elems[id as usize];
                let into = &mut elems[last as usize];
                if self.suffixes.compare(into.pos, other.pos).is_eq() && into.w.absorb(&other.w) {
                    into.occ += other.occ;
                    continue;
                }
            }
            kept.push(id);
        }
        let mut head = NIL;
        for &id in kept.iter().rev() {
            elems[id as usize].succ = head;
            head = id;
        }
        frame.lists[cur].head = head;
    }
}
