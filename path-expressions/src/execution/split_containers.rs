//! Lowering plans to differential Collections is too dynamic for a
//! non-dependent type system like Rust's.  Rather than try to play
//! fancy type-level tricks, we track the shape of tuples dynamically.
//! Of course, doing so for each tuple in a collection would be
//! inefficient and error-prone (it's far too easy to hide type
//! mismatches in empty collections).
//!
//! Split collections are simple wrappers around differential dataflow
//! Collections, tagged with the shape of all their constituent items.
//! This static / dynamic split lets us check compatibility as we
//! construct the dataflow graph, rather than once per item.
use crate::algebra::Var;
use crate::ground::Tuple;
use differential_dataflow::collection::Collection;

/// A TupleCollection is a Collection of `ground::Tuple`s, all matching
/// the same list of variables.
pub type TupleCollection<G, R = isize> = SplitCollection<G, Vec<Var>, Tuple, R>;

/// A SplitCollection is a shape-tagged DD collection.
pub type SplitCollection<G, S, D, R = isize> = SplitContainer<S, Collection<G, D, R>>;

pub struct SplitContainer<Shape, Container> {
    pub shape: Shape,
    pub container: Container,
}

impl<Shape, Container> SplitContainer<Shape, Container> {
    #[cfg(not(tarpaulin_include))]
    pub fn new(shape: Shape, container: Container) -> Self {
        Self { shape, container }
    }
}

impl<S: Clone, C: Clone> Clone for SplitContainer<S, C> {
    #[cfg(not(tarpaulin_include))]
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            container: self.container.clone(),
        }
    }
}
