//! The path-expression algebra describes connectivity patterns
//! between graph elements, e.g., "vertex incident to an edge", or
//! "vertices that share an edge", as relations over variables.
//!
//! Expressions are built bottom-up: `Link`s relate two variables
//! through an incidence, and `And` / `Or` compose sub-expressions,
//! optionally hiding intermediate variables behind existential
//! quantifiers.  The front-end then applies expressions to the
//! variables of each use site (`PathExpression::apply`), and binds
//! them to the concrete sets of a mesh (`PathExpression::bind`).
//!
//! Equality is alpha-equivalence: two expressions are equal if one
//! can be obtained from the other by consistently renaming variables,
//! regardless of how conjunctions and disjunctions are nested or
//! ordered.  Once variables are bound, the bound sets must also match.
//! The total order on expressions is compatible with that equality,
//! so expressions can key ordered and hashed containers.
mod binding;
mod canonical;
mod compose;
mod expression;
mod normal;
mod rename;
mod var;

pub use binding::Binding;
pub use compose::And;
pub use compose::Or;
pub use expression::Connective;
pub use expression::Link;
pub use expression::LinkKind;
pub use expression::Node;
pub use expression::PathExpression;
pub use var::QuantifiedVar;
pub use var::Quantifier;
pub use var::Var;
