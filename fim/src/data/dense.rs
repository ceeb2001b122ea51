use ndarray::{ArrayView2, Axis};

use super::{StoreBuilder, Supp};
use crate::error::{MineError, Result};

/// Converts a transaction matrix (rows = transactions, columns = items,
/// non-zero = present) into a builder over column indices.
pub fn from_dense(matrix: ArrayView2<i32>) -> Result<StoreBuilder> {
    if matrix.iter().any(|&v| v < 0) {
        return Err(MineError::Data("transaction matrix holds negative entries".to_string()));
    }
    let mut builder = StoreBuilder::new();
    for row in matrix.rows() {
        let items: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(j, _)| j)
            .collect();
        builder.add(&items);
    }
    Ok(builder)
}

/// Number of rows in which each column is non-zero.
pub fn column_supports(matrix: ArrayView2<i32>) -> Vec<Supp> {
    matrix
        .mapv(|v| (v != 0) as Supp)
        .sum_axis(Axis(0))
        .to_vec()
}
