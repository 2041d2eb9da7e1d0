//! Filter conditions.
//!
//! Turns `(key, value)` filter parameters into condition fragments against a
//! declared field set, and renders those fragments with SeaQuery.

mod builder;
mod filter_set;
mod key;
mod params;
mod types;

pub use builder::{BuilderFactory, ConditionBuilder, QueryConditionBuilder};
pub use filter_set::FilterSet;
pub use key::{ParsedKey, parse_field_filter_key};
pub use params::parse_query_string;
pub use types::{Condition, FilterValue, Operator};
