pub mod dense;
pub mod prefix;
pub mod store;
pub mod suffix;

pub use dense::{column_supports, from_dense};
pub use prefix::PrefixTree;
pub use store::{StoreBuilder, Transaction, TransactionStore};
pub use suffix::{Suffixes, Word};

/// Recoded item identifier; dense in `0..item_count`, smaller ids are more frequent.
pub type Item = usize;

/// Support counter (sum of transaction weights).
pub type Supp = u64;
