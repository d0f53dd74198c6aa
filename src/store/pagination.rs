//! Cursor-based pagination.
//!
//! A page request is a watermark (the id of the last item already seen) and a
//! bounded page size. Pages are strictly descending by id and never include
//! the watermark itself, so walking from cursor 0 until an empty page visits
//! every row exactly once, provided nothing is inserted below the watermark
//! while the walk is in progress.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default and maximum page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw query parameters as they arrive on list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub last_id: Option<i64>,
    pub limit: Option<i64>,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    last_id: i64,
    limit: i64,
}

impl PageRequest {
    /// Build a request, clamping the limit into `[1, MAX_PAGE_SIZE]`.
    ///
    /// A limit of zero or below resets to the default. A negative cursor is
    /// rejected.
    pub fn new(last_id: Option<i64>, limit: Option<i64>) -> AppResult<Self> {
        let last_id = last_id.unwrap_or(0);
        if last_id < 0 {
            return Err(AppError::validation("lastId must not be negative"));
        }

        let limit = match limit {
            Some(l) if l > 0 => l.min(MAX_PAGE_SIZE),
            _ => MAX_PAGE_SIZE,
        };

        Ok(Self { last_id, limit })
    }

    /// First page with the given limit.
    pub fn first(limit: i64) -> AppResult<Self> {
        Self::new(None, Some(limit))
    }

    pub fn last_id(&self) -> i64 {
        self.last_id
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Exclusive upper bound for ids on this page.
    pub(crate) fn upper_bound(&self) -> i64 {
        if self.last_id == 0 {
            i64::MAX
        } else {
            self.last_id
        }
    }
}

impl TryFrom<PageParams> for PageRequest {
    type Error = AppError;

    fn try_from(params: PageParams) -> AppResult<Self> {
        Self::new(params.last_id, params.limit)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Id of the last item in `items`, or 0 when the page is empty.
    pub last_id: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    /// Assemble a page, taking the cursor from the last item.
    pub fn new(items: Vec<T>, request: PageRequest, id_of: impl Fn(&T) -> i64) -> Self {
        let last_id = items.last().map(id_of).unwrap_or(0);
        Self {
            items,
            last_id,
            limit: request.limit(),
        }
    }

    /// Request for the page that follows this one.
    pub fn next_request(&self) -> PageRequest {
        PageRequest {
            last_id: self.last_id,
            limit: self.limit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::new(None, None).unwrap();
        assert_eq!(req.last_id(), 0);
        assert_eq!(req.limit(), MAX_PAGE_SIZE);
        assert_eq!(req.upper_bound(), i64::MAX);
    }

    #[test]
    fn test_limit_clamping() {
        assert_eq!(PageRequest::new(None, Some(0)).unwrap().limit(), 100);
        assert_eq!(PageRequest::new(None, Some(-5)).unwrap().limit(), 100);
        assert_eq!(PageRequest::new(None, Some(250)).unwrap().limit(), 100);
        assert_eq!(PageRequest::new(None, Some(1)).unwrap().limit(), 1);
        assert_eq!(PageRequest::new(None, Some(37)).unwrap().limit(), 37);
    }

    #[test]
    fn test_negative_cursor_rejected() {
        let err = PageRequest::new(Some(-1), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_cursor_is_exclusive_upper_bound() {
        let req = PageRequest::new(Some(17), Some(5)).unwrap();
        assert_eq!(req.upper_bound(), 17);
    }

    #[test]
    fn test_page_cursor_from_last_item() {
        let req = PageRequest::first(3).unwrap();
        let page = Page::new(vec![9_i64, 8, 5], req, |v| *v);
        assert_eq!(page.last_id, 5);
        assert_eq!(page.limit, 3);

        let next = page.next_request();
        assert_eq!(next.last_id(), 5);
        assert_eq!(next.limit(), 3);
    }

    #[test]
    fn test_empty_page_cursor_is_zero() {
        let req = PageRequest::first(3).unwrap();
        let page: Page<i64> = Page::new(Vec::new(), req, |v| *v);
        assert!(page.is_empty());
        assert_eq!(page.last_id, 0);
    }

    #[test]
    fn test_page_params_deserialize_camel_case() {
        let params: PageParams = serde_json::from_str(r#"{"lastId": 4, "limit": 2}"#).unwrap();
        let req = PageRequest::try_from(params).unwrap();
        assert_eq!(req.last_id(), 4);
        assert_eq!(req.limit(), 2);
    }
}
