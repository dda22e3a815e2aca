//! Filter Expressions
//!
//! - [`Filter`] - the expression tree (booleans, `AND`/`OR`/`NOT`, leaf, edge
//!   and reverse-edge comparisons)
//! - [`optimize`] - validation against the schema plus boolean-algebra rewrites
//!   into a canonical, minimal form
//! - [`parse_filter`] / [`equality_filter`] - building trees from client input
//!   and from record-shaped values
//! - [`is_reference_only`] - whether an edge filter can be answered from the
//!   stored reference

mod ast;
mod error;
mod optimizer;
mod parser;
mod reference;

pub use ast::{
    EdgeComparison, EdgeOperator, Filter, LeafComparison, LeafOperator, ReverseEdgeComparison,
    ReverseEdgeOperator,
};
pub use error::FilterError;
pub use optimizer::optimize;
pub use parser::{equality_filter, parse_filter};
pub use reference::is_reference_only;
