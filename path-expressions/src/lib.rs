//! Path expressions describe the connectivity relations a mesh
//! compiler needs to lower neighbour aggregations ("map over the
//! neighbours of each vertex, then reduce") to sparse-matrix assembly.
//!
//! The crate is split in layers:
//!
//! - `ground` models the concrete sets of a mesh (vertices, edges and
//!   their incidence), as seen by the algebra;
//! - `algebra` builds, renames, binds and compares path expressions;
//! - `matching` turns a fully bound expression into a query plan of
//!   scans, joins, projections and unions;
//! - `execution` (with the default `dataflow` feature) runs these
//!   plans on differential dataflow, and materialises the relation
//!   with its sparsity pattern.
pub mod algebra;
mod error;
#[cfg(feature = "dataflow")]
pub mod execution;
pub mod ground;
pub mod matching;

pub use algebra::And;
pub use algebra::Binding;
pub use algebra::Link;
pub use algebra::LinkKind;
pub use algebra::Or;
pub use algebra::PathExpression;
pub use algebra::QuantifiedVar;
pub use algebra::Quantifier;
pub use algebra::Var;
pub use error::Error;
