//! # Query Shaper
//!
//! Turns a request parameter map into filter, sort, projection and
//! pagination steps on a [`Queryable`]. Steps run in this order:
//!
//! 1. [`QueryShaper::filter`]
//! 2. [`QueryShaper::sort`]
//! 3. [`QueryShaper::limit_fields`]
//! 4. [`QueryShaper::paginate`]
//!
//! Nothing here executes the query. The caller runs the shaped handle and
//! propagates whatever the data layer reports.

use super::errors::{ShapeError, ShapeResult};
use super::filter::Filter;
use super::params::RequestParams;
use super::projection::Projection;
use super::queryable::Queryable;
use super::sort::SortSpec;

/// Page used when the request names none
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the request names none
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// A 1-based page of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageWindow {
    /// Read `page` and `limit`. Absent or blank values fall back to the
    /// defaults; anything else must be a whole number of at least 1.
    pub fn from_params(params: &RequestParams) -> ShapeResult<Self> {
        let page = match params.get_str("page") {
            Some(raw) => parse_positive("page", raw)?,
            None => DEFAULT_PAGE,
        };
        let page_size = match params.get_str("limit") {
            Some(raw) => parse_positive("limit", raw)?,
            None => DEFAULT_PAGE_SIZE,
        };
        Ok(Self { page, page_size })
    }

    /// Number of documents before this page
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Maximum number of documents on this page
    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// Out-of-band check for callers that want empty pages reported:
    /// a page whose offset reaches `total` does not exist.
    pub fn ensure_exists(&self, total: u64) -> ShapeResult<()> {
        if self.skip() >= total {
            return Err(ShapeError::PageNotFound {
                page: self.page,
                total,
            });
        }
        Ok(())
    }
}

fn parse_positive(key: &str, raw: &str) -> ShapeResult<u64> {
    let value: i64 = raw.trim().parse().map_err(|_| ShapeError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    })?;

    if value < 1 {
        return Err(ShapeError::BelowMinimum {
            key: key.to_string(),
            value,
        });
    }

    Ok(value as u64)
}

/// Per-request query builder
#[derive(Debug)]
pub struct QueryShaper<'p, Q> {
    query: Q,
    params: &'p RequestParams,
    window: Option<PageWindow>,
}

impl<'p, Q: Queryable> QueryShaper<'p, Q> {
    /// Wrap a base query. No I/O happens here.
    pub fn new(query: Q, params: &'p RequestParams) -> Self {
        Self {
            query,
            params,
            window: None,
        }
    }

    /// Step 1: filter by every non-reserved parameter.
    ///
    /// The filter is re-derived from the immutable parameter map each time and
    /// replaces conditions on the same fields, so calling this twice is
    /// harmless.
    pub fn filter(self) -> Self {
        let filter = Filter::from_params(self.params);
        Self {
            query: self.query.find(filter),
            params: self.params,
            window: self.window,
        }
    }

    /// Step 2: order by the `sort` parameter, newest first by default
    pub fn sort(self) -> Self {
        let spec = match self.params.get_str("sort") {
            Some(raw) => {
                let spec = SortSpec::parse(raw);
                if spec.is_empty() {
                    SortSpec::newest_first()
                } else {
                    spec
                }
            }
            None => SortSpec::newest_first(),
        };
        Self {
            query: self.query.sort(spec),
            params: self.params,
            window: self.window,
        }
    }

    /// Step 3: project the `fields` parameter, or hide the internal fields
    pub fn limit_fields(self) -> Self {
        let projection = match self.params.get_str("fields") {
            Some(raw) => {
                let projection = Projection::parse(raw);
                if projection.is_empty() {
                    Projection::default_hidden()
                } else {
                    projection
                }
            }
            None => Projection::default_hidden(),
        };
        Self {
            query: self.query.select(projection),
            params: self.params,
            window: self.window,
        }
    }

    /// Step 4: apply the page window from `page` and `limit`
    pub fn paginate(self) -> ShapeResult<Self> {
        let window = PageWindow::from_params(self.params)?;
        Ok(Self {
            query: self.query.skip(window.skip()).limit(window.limit()),
            params: self.params,
            window: Some(window),
        })
    }

    /// All four steps in order
    pub fn shape(self) -> ShapeResult<Self> {
        self.filter().sort().limit_fields().paginate()
    }

    /// The window chosen by [`QueryShaper::paginate`], if it ran
    pub fn window(&self) -> Option<PageWindow> {
        self.window
    }

    pub fn params(&self) -> &RequestParams {
        self.params
    }

    /// The shaped, not-yet-executed query
    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn into_query(self) -> Q {
        self.query
    }
}
