//! Pagination descriptor

use serde::{Deserialize, Serialize};

use crate::query::Sort;

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: u64 = 5;

/// Page index and size for paginated reads
///
/// `index * size` is the skip offset. `count` is filled in once the
/// descriptor has been normalized against a record count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    /// Zero-based page index
    pub index: u64,
    /// Records per page
    pub size: u64,
    /// Optional sort
    pub sort: Option<Sort>,
    /// Record count the descriptor was normalized against
    pub count: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            index: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: None,
            count: None,
        }
    }
}

impl Pagination {
    /// Page `index` of `size` records
    pub fn new(index: u64, size: u64) -> Self {
        Self {
            index,
            size,
            ..Self::default()
        }
    }

    /// First page of `size` records
    pub fn first(size: u64) -> Self {
        Self::new(0, size)
    }

    /// Attach a sort
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Skip offset
    pub fn skip(&self) -> u64 {
        self.index.saturating_mul(self.size)
    }
}
