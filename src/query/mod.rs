//! # Query Shaping
//!
//! Translates the parameter map of a "list resources" request into filter,
//! sort, projection and pagination steps on a queryable collection.
//!
//! ```text
//! RequestParams ──► QueryShaper::filter ─► sort ─► limit_fields ─► paginate
//!                                                                   │
//!                              Executable::execute ◄── shaped query ┘
//! ```

pub mod errors;
pub mod filter;
pub mod params;
pub mod projection;
pub mod queryable;
pub mod shaper;
pub mod sort;

pub use errors::{ShapeError, ShapeResult};
pub use filter::{CmpOp, Filter, RESERVED_KEYS};
pub use params::{ParamValue, RequestParams};
pub use projection::{FieldMode, Projection, DEFAULT_EXCLUDED};
pub use queryable::{Executable, QuerySpec, Queryable};
pub use shaper::{PageWindow, QueryShaper, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
pub use sort::{SortDirection, SortKey, SortSpec, DEFAULT_SORT_FIELD};
