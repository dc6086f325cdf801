//! Pagination types for list queries.

use serde::{Deserialize, Serialize};

/// Limit/offset window for list queries.
///
/// Rows are always returned in ascending id order, so a window is stable as
/// long as no rows are deleted between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of rows to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Number of rows to skip.
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Creates a window of `limit` rows starting after `offset` rows.
    #[must_use]
    pub const fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Builds a window from a 1-indexed page number and page size.
    #[must_use]
    pub fn from_page(page: u64, per_page: u64) -> Self {
        Self {
            limit: per_page,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }

    /// Offset as a `usize`, saturating on narrow targets.
    #[must_use]
    pub fn offset_usize(&self) -> usize {
        usize::try_from(self.offset).unwrap_or(usize::MAX)
    }

    /// Limit as a `usize`, saturating on narrow targets.
    #[must_use]
    pub fn limit_usize(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(usize::MAX)
    }
}
