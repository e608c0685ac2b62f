//! The execution layer bridges the narrow gap between our query plans
//! and differential dataflow's collections, and runs plans to
//! completion to materialise bound relations.
mod lower_plan;
mod materialize;
mod sink;
mod split_containers;

pub use lower_plan::default_injector;
pub use lower_plan::lower_plan;
pub use materialize::materialize;
pub use materialize::Relation;
pub use materialize::SparsityPattern;
pub use sink::Sink;
pub use sink::SinkWriter;
pub use sink::TupleSink;
pub use sink::TupleWriter;
pub use split_containers::SplitCollection;
pub use split_containers::SplitContainer;
pub use split_containers::TupleCollection;
