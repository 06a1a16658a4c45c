//! V1 REST API handlers.

mod dashboard;
mod dependencies;
mod servers;
mod services;
mod system;

#[cfg(test)]
pub(crate) mod test_support;

pub use dashboard::*;
pub use dependencies::*;
pub use servers::*;
pub use services::*;
pub use system::*;

use crate::db::{PageSort, SortOrder};

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 500;

/// Translate the common `limit`/`offset`/`sort`/`order` query parameters.
pub(crate) fn page_sort(
    limit: Option<usize>,
    offset: Option<usize>,
    sort: Option<String>,
    order: Option<&str>,
) -> PageSort {
    PageSort {
        limit: Some(limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT)),
        offset,
        sort_by: sort,
        sort_order: order.and_then(|o| o.parse::<SortOrder>().ok()),
    }
}
