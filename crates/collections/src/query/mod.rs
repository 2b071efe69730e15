//! Query construction.
//!
//! - [`condition`] - the `(field, operator, value)` DSL and its resolution
//!   into boolean query clauses
//! - [`state`] - the request document being built
//! - [`builder`] - the fluent builder tying both together

pub mod builder;
pub mod condition;
pub mod state;

pub use builder::{OrderSpec, QueryBuilder};
pub use condition::{Condition, Operator};
pub use state::{BoolQuery, QueryState, SearchBody, SortDirection, SortSpec};
