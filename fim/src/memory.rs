use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::MineError;

/// Upper bound on the bytes held by live projection buffers.
///
/// Every recursion frame reserves the size of its projection through a
/// [`MemoryGuard`] before building it; the guard gives the bytes back when
/// the frame returns, normally or by `?`.
pub struct MemoryBudget {
    max_bytes: usize,
    current_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
}

impl MemoryBudget {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            current_bytes: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    pub fn allocate(&self, bytes: usize) -> Result<(), MineError> {
        let current = self.current_bytes.fetch_add(bytes, Ordering::SeqCst);
        if current.saturating_add(bytes) > self.max_bytes {
            self.current_bytes.fetch_sub(bytes, Ordering::SeqCst);
            return Err(MineError::BudgetExceeded {
                requested: bytes,
                available: self.max_bytes.saturating_sub(current),
            });
        }
        self.peak_bytes.fetch_max(current + bytes, Ordering::Relaxed);
        Ok(())
    }

    pub fn deallocate(&self, bytes: usize) {
        self.current_bytes.fetch_sub(bytes, Ordering::SeqCst);
    }

    pub fn current_usage(&self) -> usize {
        self.current_bytes.load(Ordering::SeqCst)
    }

    pub fn peak_usage(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    pub fn available(&self) -> usize {
        self.max_bytes.saturating_sub(self.current_usage())
    }

    pub fn usage_percentage(&self) -> f64 {
        (self.current_usage() as f64 / self.max_bytes as f64) * 100.0
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for MemoryBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBudget")
            .field("max_bytes", &self.max_bytes)
            .field("current_bytes", &self.current_usage())
            .finish()
    }
}

pub struct MemoryGuard<'a> {
    budget: &'a MemoryBudget,
    bytes: usize,
}

impl<'a> MemoryGuard<'a> {
    pub fn new(budget: &'a MemoryBudget, bytes: usize) -> Result<Self, MineError> {
        budget.allocate(bytes)?;
        Ok(Self { budget, bytes })
    }

    /// Reserves `additional` more bytes under the same guard.
    pub fn grow(&mut self, additional: usize) -> Result<(), MineError> {
        self.budget.allocate(additional)?;
        self.bytes += additional;
        Ok(())
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl<'a> Drop for MemoryGuard<'a> {
    fn drop(&mut self) {
        self.budget.deallocate(self.bytes);
    }
}

/// Bytes for one tid-list projection: `lists` headers plus `tids` ids.
pub fn estimate_tidlists(lists: usize, tids: usize) -> usize {
    let header = std::mem::size_of::<usize>() * 2 + std::mem::size_of::<f64>() + 8;
    lists * header + tids * std::mem::size_of::<u32>()
}

/// Bytes for a suffix-list frame of `lists` heads and `elems` elements of type `E`.
pub fn estimate_suffix_lists<E>(lists: usize, elems: usize) -> usize {
    let head = std::mem::size_of::<usize>() * 2 + std::mem::size_of::<f64>();
    lists * head + elems * std::mem::size_of::<E>()
}

/// Bytes for a dense `rows x cols` table of supports.
pub fn estimate_table(rows: usize, cols: usize) -> usize {
    rows.saturating_mul(cols).saturating_mul(std::mem::size_of::<u64>())
        + rows * std::mem::size_of::<usize>()
}

/// Bytes for an arena of `nodes` nodes of type `N`.
pub fn estimate_tree<N>(nodes: usize) -> usize {
    nodes * std::mem::size_of::<N>() + 64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let budget = MemoryBudget::new(1000);
        {
            let _a = MemoryGuard::new(&budget, 600).unwrap();
            assert_eq!(budget.current_usage(), 600);
            assert!(MemoryGuard::new(&budget, 500).is_err());
        }
        assert_eq!(budget.current_usage(), 0);
        assert_eq!(budget.peak_usage(), 600);
    }

    #[test]
    fn test_budget_exceeded_reports_available() {
        let budget = MemoryBudget::new(100);
        let _g = MemoryGuard::new(&budget, 40).unwrap();
        match budget.allocate(80) {
            Err(MineError::BudgetExceeded { requested, available }) => {
                assert_eq!(requested, 80);
                assert_eq!(available, 60);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(budget.current_usage(), 40);
    }

    #[test]
    fn test_guard_grow() {
        let budget = MemoryBudget::new(100);
        let mut g = MemoryGuard::new(&budget, 10).unwrap();
        g.grow(20).unwrap();
        assert_eq!(g.bytes(), 30);
        assert!(g.grow(100).is_err());
        drop(g);
        assert_eq!(budget.current_usage(), 0);
    }
}
