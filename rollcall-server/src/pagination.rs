//! Pagination utilities for the attendance listing

/// Page size when the client does not ask for one
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page a client may request
pub const MAX_LIMIT: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub limit: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Calculate pagination metadata from total results and the requested window
///
/// Page is raised to at least 1 and limit clamped to [1, MAX_LIMIT]. A page
/// past the end is kept as asked and yields an empty slice.
///
/// # Examples
/// ```
/// use rollcall_server::pagination::calculate_pagination;
///
/// // 25 records, 10 per page = 3 pages
/// let p = calculate_pagination(25, Some(2), Some(10));
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 10);
///
/// // Past the last page: the offset skips every row
/// let p = calculate_pagination(25, Some(99), Some(10));
/// assert_eq!(p.page, 99);
/// assert_eq!(p.offset, 980);
/// ```
pub fn calculate_pagination(
    total_results: i64,
    requested_page: Option<i64>,
    requested_limit: Option<i64>,
) -> Pagination {
    let limit = requested_limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let total_pages = (total_results + limit - 1) / limit;
    let page = requested_page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(limit);

    Pagination {
        page,
        limit,
        total_pages,
        offset,
    }
}
