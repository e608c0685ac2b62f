//! Matching turns a fully bound path expression into the tuples of
//! the relation it denotes.  Every link is a scan of `[edge,
//! endpoint]` incidence facts, matched against a `Pattern` of
//! variables; conjunctions join these scans on shared variables, and
//! disjunctions union them after padding unconstrained endpoints with
//! their whole domain.
//!
//! The execution of matching happens in two phases.  We first
//! generate a `Plan` tree that describes the steps we'll need to
//! convert incidence facts to endpoint tuples.  Then, the `execution`
//! module converts that tree to a Collection processing expression.
//! The indirection seems like spurious complexity at first, but having
//! a concrete representation for the plan helps introduce rewrites
//! (e.g., smarter join orders), and is also useful for debugging.
mod pattern;
pub mod plan;
mod planner;
mod project;

pub use pattern::Pattern;
pub use plan::Plan;
pub use plan::PlanOp;
pub use plan::ScanOp;
pub use plan::Source;
pub use planner::plan_path_expression;
pub use project::MultiProjection;
pub use project::Projection;
