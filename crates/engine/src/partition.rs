//! Pagination and partition calculation
//!
//! `partition` suggests a uniform page size for a record count: small
//! collections fit one page, larger ones get pages of about `sqrt(count)`
//! records, never below the configured default and never above
//! [`MAX_PAGE_SIZE`]. `normalize` must run before every paginated read.

use myelin_core::{Error, Pagination, Result};

/// Largest page size `partition` suggests
pub const MAX_PAGE_SIZE: u64 = 100;

/// Suggested page layout for a record count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Records covered
    pub count: u64,
    /// Records per page
    pub page_size: u64,
    /// Pages needed to cover every record
    pub page_count: u64,
}

impl Partition {
    /// Descriptor for one page, if the index is in range
    pub fn page(&self, index: u64) -> Option<Pagination> {
        (index < self.page_count).then(|| Pagination {
            count: Some(self.count),
            ..Pagination::new(index, self.page_size)
        })
    }

    /// Descriptors for every page in order
    pub fn pages(&self) -> impl Iterator<Item = Pagination> + '_ {
        (0..self.page_count).filter_map(move |index| self.page(index))
    }
}

/// Suggest a page layout for `count` records
///
/// # Errors
///
/// `ZeroCount` when `count` is 0; `InvalidInput` when `default_size` is 0.
pub fn partition(count: u64, default_size: u64) -> Result<Partition> {
    if count == 0 {
        return Err(Error::ZeroCount);
    }
    if default_size == 0 {
        return Err(Error::InvalidInput("page size must be at least 1".to_string()));
    }
    if count <= default_size {
        return Ok(Partition {
            count,
            page_size: count,
            page_count: 1,
        });
    }

    let root = (count as f64).sqrt().round() as u64;
    let page_size = root.clamp(default_size, MAX_PAGE_SIZE.max(default_size));
    let page_count = (count + page_size - 1) / page_size;
    Ok(Partition {
        count,
        page_size,
        page_count,
    })
}

/// Fit a descriptor to a record count
///
/// When every record fits in one page of the requested size, the
/// descriptor collapses to that single page.
pub fn normalize(mut descriptor: Pagination, count: u64) -> Pagination {
    if count <= descriptor.size {
        descriptor.index = 0;
        descriptor.size = count;
    }
    descriptor.count = Some(count);
    descriptor
}
