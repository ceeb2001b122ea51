//! Frequent item set mining.
//!
//! Several enumeration engines share one transaction store and one output
//! path: Eclat and Accretion on transaction id lists, Apriori on a
//! candidate tree, RElim and SaM on transaction suffixes (with optional
//! item insertion), Carpenter and IsTa on transaction sets and FP-growth
//! on a prefix tree. [`Miner`] picks an engine from a [`MinerConfig`] and
//! returns the reported sets as a [`PatternSet`].

pub mod arena;
pub mod cancel;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod fim16;
pub mod memory;
pub mod miner;
pub mod report;
pub mod tnorm;
pub mod weight;

pub mod apriori;
pub mod carpenter;
pub mod eclat;
pub mod fpgrowth;
pub mod ista;
pub mod relim;
pub mod sam;

#[cfg(feature = "python")]
mod python;


pub use cancel::CancelToken;
pub use config::{
    AccretionConfig, Algorithm, AprioriConfig, AprioriPrune, CarpenterVariant, Heuristics,
    InsertionConfig, IstaConfig, MinerConfig, Mode, RelimVariant, SamVariant, Target,
};
pub use data::{Item, StoreBuilder, Supp, Transaction, TransactionStore};
pub use error::{MineError, Result};
pub use eval::{EvalAgg, EvalMeasure, SignificanceTest};
pub use memory::MemoryBudget;
pub use miner::{select_algorithm, Context, Miner, RunState};
pub use report::{FrequentLevel, ItemSetReporter, Pattern, PatternSet, Reporter};
pub use tnorm::TNorm;
