//! The ground layer is the algebra's view of the graph: concrete sets
//! of elements (vertices, edges, or anything else a mesh declares),
//! the elements themselves, and tuples of elements produced when a
//! bound relation is evaluated.
//!
//! The algebra never inspects set contents to decide equality: sets
//! are compared by identity only.  Contents (cardinality and, for
//! edge sets, incidence rows) only matter once a bound relation is
//! planned and evaluated.

mod element;
mod set;
mod tuple;

pub use element::Element;
pub use set::ElementKind;
pub use set::Set;
pub use set::SetId;
pub use tuple::Tuple;
