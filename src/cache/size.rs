//! Size Estimation Module
//!
//! Approximate memory footprint of cached values, charged against a cache's
//! memory budget. The figures are estimates, not an exact accounting.

use std::sync::Arc;

use bytes::Bytes;

/// Charge for values whose footprint cannot be cheaply measured.
pub const DEFAULT_SIZE_ESTIMATE: usize = 1024;

// == Size Estimate ==
/// Estimated footprint of a value in bytes.
///
/// Types that do not override [`estimated_size`](SizeEstimate::estimated_size)
/// are charged [`DEFAULT_SIZE_ESTIMATE`]. Callers storing large structured
/// values should override it with a closer figure.
pub trait SizeEstimate {
    fn estimated_size(&self) -> usize {
        DEFAULT_SIZE_ESTIMATE
    }
}

impl SizeEstimate for String {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl SizeEstimate for str {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl SizeEstimate for Bytes {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl<T: SizeEstimate> SizeEstimate for Vec<T> {
    fn estimated_size(&self) -> usize {
        self.iter().map(SizeEstimate::estimated_size).sum()
    }
}

impl<T: SizeEstimate> SizeEstimate for Option<T> {
    fn estimated_size(&self) -> usize {
        self.as_ref().map_or(0, SizeEstimate::estimated_size)
    }
}

impl<T: SizeEstimate + ?Sized> SizeEstimate for Arc<T> {
    fn estimated_size(&self) -> usize {
        (**self).estimated_size()
    }
}

impl SizeEstimate for u8 {
    fn estimated_size(&self) -> usize {
        1
    }
}
