//! The boundary between the enumeration engines and the output.
//!
//! Engines never build item sets themselves: they push items onto the
//! reporter as they descend, pop them as they return and ask it to report
//! the current prefix. The reporter applies the size, support, border and
//! evaluation filters and the closed/maximal/generator selection.

pub mod repository;
pub mod reporter;
pub mod storage;

pub use repository::{Repository, Stored};
pub use reporter::ItemSetReporter;
pub use storage::{FrequentLevel, ItemsetStorage, Pattern, PatternSet};

use crate::config::Target;
use crate::data::{Item, Supp};
use crate::error::Result;

pub trait Reporter {
    /// Pushes `item` with the support of the extended prefix.
    /// `Ok(false)` means the extension needs no further processing and
    /// nothing was pushed.
    fn add(&mut self, item: Item, supp: Supp) -> Result<bool>;

    /// Like [`add`](Reporter::add) with a separate weighted support
    /// (item insertion).
    fn add_weighted(&mut self, item: Item, supp: Supp, wgt: f64) -> Result<bool>;

    /// Records a perfect extension of the current prefix.
    fn add_pex(&mut self, item: Item);

    /// Pops the last `n` items together with their perfect extensions.
    fn remove(&mut self, n: usize);

    /// Reports the current prefix (and its perfect extensions).
    fn report(&mut self) -> Result<()>;

    /// Reports the current prefix with an externally computed evaluation.
    fn report_eval(&mut self, eval: f64) -> Result<()>;

    /// Reports a complete item set that was not built through `add`.
    fn report_set(&mut self, items: &[Item], supp: Supp) -> Result<()>;

    /// Whether `n` more items may still be added to the prefix.
    fn extendable(&self, n: usize) -> bool;

    /// Support of the current prefix (total weight for the empty prefix).
    fn support(&self) -> Supp;

    /// Weighted support of the current prefix.
    fn weight(&self) -> f64;

    /// Number of items in the prefix, perfect extensions excluded.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn target(&self) -> Target;

    fn min_support(&self) -> Supp;
}
