//! Array-of-lists RElim, optionally handing the packed items of every
//! projection to the 16-items machine.

use super::NIL;
use crate::data::{Item, Suffixes, Supp, Word};
use crate::error::Result;
use crate::fim16::Fim16;
use crate::memory::estimate_suffix_lists;
use crate::miner::Context;
use crate::report::Reporter;

#[derive(Debug, Clone, Copy)]
struct Elem {
    /// Position of the first item after the one the element is listed under.
    pos: usize,
    occ: Supp,
    succ: u32,
}

#[derive(Debug, Clone, Copy)]
struct List {
    occ: Supp,
    head: u32,
}

const EMPTY: List = List { occ: 0, head: NIL };

/// One level of the recursion: a list per item plus the catchment list for
/// suffixes that consist of packed items only.
struct Frame {
    lists: Vec<List>,
    basin: List,
    elems: Vec<Elem>,
}

impl Frame {
    fn new(k: usize, n: usize) -> Self {
        Self { lists: vec![EMPTY; k], basin: EMPTY, elems: Vec::with_capacity(n) }
    }

    fn clear(&mut self, k: usize) {
        self.lists[..k].fill(EMPTY);
        self.basin = EMPTY;
        self.elems.clear();
    }

    fn push(&mut self, item: Option<Item>, pos: usize, occ: Supp) {
        let id = self.elems.len() as u32;
        let list = match item {
            Some(i) => &mut self.lists[i],
            None => &mut self.basin,
        };
        self.elems.push(Elem { pos, occ, succ: list.head });
        list.head = id;
    }

    /// Moves element `e` to the list of the word at its position.
    fn relink(&mut self, e: u32, item: Option<Item>) {
        let list = match item {
            Some(i) => &mut self.lists[i],
            None => &mut self.basin,
        };
        self.elems[e as usize].succ = list.head;
        list.head = e;
    }
}

pub(super) struct Lists<'a, 'c, R> {
    suffixes: &'a Suffixes,
    items: usize,
    smin: Supp,
    sort: usize,
    perfect: bool,
    m16: Option<Fim16>,
    rep: &'a mut R,
    ctx: &'a Context<'c>,
}

impl<'a, 'c, R: Reporter> Lists<'a, 'c, R> {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        suffixes: &'a Suffixes,
        items: usize,
        smin: Supp,
        sort: usize,
        perfect: bool,
        m16: Option<Fim16>,
        rep: &'a mut R,
        ctx: &'a Context<'c>,
    ) -> Self {
        Self { suffixes, items, smin, sort, perfect, m16, rep, ctx }
    }

    pub(super) fn run(&mut self) -> Result<()> {
        let n = self.suffixes.len();
        let _guard = self.ctx.reserve(estimate_suffix_lists::<Elem>(self.items, n))?;
        let mut frame = Frame::new(self.items, n);
        for t in 0..n {
            let (start, wgt) = self.suffixes.transaction(t);
            match self.suffixes.at(start) {
                Word::End => {}
                Word::Packed(_) => {
                    frame.basin.occ += wgt;
                    frame.push(None, start, wgt);
                }
                Word::Item(i) => {
                    frame.lists[i].occ += wgt;
                    if self.suffixes.at(start + 1) != Word::End {
                        frame.push(Some(i), start + 1, wgt);
                    }
                }
            }
        }
        self.rec(&mut frame, self.items)
    }

    fn rec(&mut self, frame: &mut Frame, k: usize) -> Result<()> {
        self.ctx.check()?;
        let packed = self.m16.as_ref().map_or(0, Fim16::dim);
        let n = frame.elems.len();
        let (mut proj, _guard) = if k > 1 && self.rep.extendable(2) {
            let guard = self.ctx.reserve(estimate_suffix_lists::<Elem>(k - 1, n))?;
            (Some(Frame::new(k - 1, n)), Some(guard))
        } else {
            (None, None)
        };
        let pex = if self.perfect { self.rep.support() } else { Supp::MAX };
        for i in (packed..k).rev() {
            let cur = frame.lists[i];
            if cur.occ >= pex {
                self.rep.add_pex(i);
            } else if cur.occ >= self.smin && self.rep.add(i, cur.occ)? {
                if cur.head != NIL {
                    if let Some(proj) = proj.as_mut() {
                        if i <= self.sort && frame.elems[cur.head as usize].succ != NIL {
                            self.sort_list(frame, i);
                        }
                        proj.clear(i);
                        self.project(frame, i, proj);
                        self.rec(proj, i)?;
                    }
                }
                self.rep.report()?;
                self.rep.remove(1);
            }
            self.eliminate(frame, i);
        }
        if packed > 0 && frame.basin.occ >= self.smin {
            if let Some(m16) = self.m16.as_mut() {
                let mut e = frame.basin.head;
                while e != NIL {
                    let elem = frame.elems[e as usize];
                    if let Word::Packed(mask) = self.suffixes.at(elem.pos) {
                        m16.add(mask, elem.occ);
                    }
                    e = elem.succ;
                }
                m16.mine(&mut *self.rep, self.ctx)?;
            }
        }
        frame.basin = EMPTY;
        Ok(())
    }

    /// Builds the projection of list `i` into `proj` (lists below `i`).
    fn project(&self, frame: &Frame, i: usize, proj: &mut Frame) {
        let mut e = frame.lists[i].head;
        while e != NIL {
            let src = frame.elems[e as usize];
            match self.suffixes.at(src.pos) {
                Word::Packed(_) => {
                    proj.basin.occ += src.occ;
                    proj.push(None, src.pos, src.occ);
                }
                Word::Item(j) => {
                    proj.lists[j].occ += src.occ;
                    if self.suffixes.at(src.pos + 1) != Word::End {
                        proj.push(Some(j), src.pos + 1, src.occ);
                    }
                }
                Word::End => {}
            }
            e = src.succ;
        }
    }

    /// Redistributes the suffixes of list `i` to the lists of their next items.
    fn eliminate(&self, frame: &mut Frame, i: usize) {
        let mut e = frame.lists[i].head;
        frame.lists[i] = EMPTY;
        while e != NIL {
            let next = frame.elems[e as usize].succ;
            let Elem { pos, occ, .. } = frame.elems[e as usize];
            match self.suffixes.at(pos) {
                Word::Packed(_) => {
                    frame.basin.occ += occ;
                    frame.relink(e, None);
                }
                Word::Item(j) => {
                    frame.lists[j].occ += occ;
                    if self.suffixes.at(pos + 1) != Word::End {
                        frame.elems[e as usize].pos = pos + 1;
                        frame.relink(e, Some(j));
                    }
                }
                Word::End => {}
            }
            e = next;
        }
    }

    /// Sorts list `i` by suffix and merges equal suffixes.
    fn sort_list(&self, frame: &mut Frame, i: usize) {
        let mut ids = Vec::new();
        let mut e = frame.lists[i].head;
        while e != NIL {
            ids.push(e);
            e = frame.elems[e as usize].succ;
        }
        let elems = &mut frame.elems;
        ids.sort_by(|&a, &b| self.suffixes.compare(elems[a as usize].pos, elems[b as usize].pos));
        let mut kept: Vec<u32> = Vec::with_capacity(ids.len());
        for id in ids {
            match kept.last() {
                Some(&last)
                    if self.suffixes.compare(elems[last as usize].pos, elems[id as usize].pos).is_eq() =>
                {
                    elems[last as usize].occ += elems[id as usize].occ;
                }
                _ => kept.push(id),
            }
        }
        let mut head = NIL;
        for &id in kept.iter().rev() {
            elems[id as usize].succ = head;
            head = id;
        }
        frame.lists[i].head = head;
    }
}
