use serde::{Deserialize, Serialize};

use crate::{error::ServiceError, form::PageRequest};

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// `page` is 1-based; `total_rows` counts every row matching the query, not
    /// just the ones in `rows`.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, page: i64) -> Self {
        if rows.is_empty() && page <= 1 {
            return Self::no_rows();
        }

        let page_count = (total_rows + page_size - 1) / page_size.max(1);

        Self {
            count: total_rows,
            next: (page < page_count).then_some(page + 1),
            previous: (page > 1).then(|| (page - 1).min(page_count.max(1))),
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}

/// Splits rows carrying a `COUNT(*) OVER()` column into the page items and the
/// total. An empty page past the first has no total to report and is rejected.
pub fn split_counted_rows<T>(
    rows: Vec<(T, i64)>,
    page: &PageRequest,
) -> Result<(Vec<T>, i64), ServiceError> {
    if rows.is_empty() && page.page > 1 {
        return Err(ServiceError::not_found("Invalid page"));
    }

    let total_count = rows.first().map(|row| row.1).unwrap_or(0);
    let items = rows.into_iter().map(|row| row.0).collect();

    Ok((items, total_count))
}
