//! Differential Dataflow collections are closer to pipes that
//! describe a computation's dataflow than to concrete collections.
//! In order to get tuples out of a DD computation, we must listen to
//! a collection's change stream, and reify the result into the
//! collection we want.
//!
//! The write end of a sink is decoupled from the read (snapshot) end:
//! the dataflow is built inside a closure that runs on a worker, and
//! that closure must own whatever it writes to.
use super::split_containers::SplitCollection;
use crate::algebra::Var;
use crate::ground::Tuple;
use crate::Error;
use differential_dataflow::difference::Semigroup;
use differential_dataflow::Data;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::AddAssign;
use std::sync::{Arc, Mutex, PoisonError};
use timely::dataflow::Scope;

pub type TupleSink = Sink<Tuple>;
pub type TupleWriter = SinkWriter<Tuple>;

/// A Sink accepts tuples of a certain shape (list of variables), and
/// exposes a running multiplicity snapshot for all the data it has
/// received (so far) from differential dataflow collections.
///
/// In order to hook up a collection to a Sink, one must first gain
/// ownership of a `SinkWriter`, by calling `Sink::writer()`.
#[derive(Clone, Debug)]
pub struct Sink<D, R = isize>
where
    D: Data + Eq + Hash,
    R: Semigroup,
{
    inner: Arc<SinkImpl<D, R>>,
}

impl<D, R> Sink<D, R>
where
    D: Data + Eq + Hash,
    R: Semigroup + for<'a> AddAssign<&'a R>,
{
    #[must_use]
    pub fn new(shape: Vec<Var>) -> Self {
        Self {
            inner: Arc::new(SinkImpl::new(shape)),
        }
    }

    /// Returns the shape of each item written to the sink.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn shape(&self) -> &[Var] {
        &self.inner.shape
    }

    /// Returns a fresh writer for the sink.
    #[must_use]
    pub fn writer(&self) -> SinkWriter<D, R> {
        SinkWriter {
            inner: self.inner.clone(),
        }
    }

    /// Collects all the values with non-zero multiplicities.
    pub fn values<Ret: std::iter::FromIterator<D>>(&self) -> Ret {
        self.with_snapshot(|map| map.keys().cloned().collect())
    }

    /// Calls `handler` with a snapshot of the data in the sink.  The
    /// key in the map is the data, and the value its multiplicity.
    /// There will never be a zero-valued entry, so it is safe to, e.g.,
    /// only look at the map's keys.
    pub fn with_snapshot<F, Ret>(&self, handler: F) -> Ret
    where
        F: FnOnce(&HashMap<D, R>) -> Ret,
    {
        self.inner.with_snapshot(handler)
    }
}

#[derive(Clone, Debug)]
pub struct SinkWriter<D, R = isize>
where
    D: Data + Eq + Hash,
    R: Semigroup,
{
    inner: Arc<SinkImpl<D, R>>,
}

impl<D, R> SinkWriter<D, R>
where
    D: Data + Eq + Hash,
    R: Semigroup + for<'a> AddAssign<&'a R>,
{
    /// Attaches an `inspect`or closure to the collection's underlying
    /// DD collection; the `Sink`'s state will be updated to reflect
    /// the multiplicity of the data in that collection.
    ///
    /// If the same sink is attached to multiple collections, it is
    /// equivalent to attaching it to the concatenation of these
    /// collections.
    ///
    /// # Errors
    ///
    /// Returns `Err(ShapeMismatch)` if the collection's shape differs
    /// from the sink's.
    pub fn attach<G: Scope>(
        &self,
        collection: &SplitCollection<G, Vec<Var>, D, R>,
    ) -> Result<(), Error> {
        SinkImpl::attach(self.inner.clone(), collection)
    }
}

#[derive(Debug)]
struct SinkImpl<D, R = isize>
where
    D: Data + Eq + Hash,
    R: Semigroup,
{
    shape: Vec<Var>,
    counts: Mutex<HashMap<D, R>>,
}

impl<D, R> SinkImpl<D, R>
where
    D: Data + Eq + Hash,
    R: Semigroup + for<'a> AddAssign<&'a R>,
{
    fn new(shape: Vec<Var>) -> Self {
        Self {
            shape,
            counts: Mutex::new(HashMap::new()),
        }
    }

    fn with_snapshot<F, Ret>(&self, handler: F) -> Ret
    where
        F: FnOnce(&HashMap<D, R>) -> Ret,
    {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        handler(&counts)
    }

    fn attach<G: Scope>(
        this: Arc<Self>,
        collection: &SplitCollection<G, Vec<Var>, D, R>,
    ) -> Result<(), Error> {
        if collection.shape != this.shape {
            return Err(Error::ShapeMismatch {
                expected: this.shape.iter().map(Var::kind).collect(),
                found: collection.shape.iter().map(Var::kind).collect(),
            });
        }

        collection.container.inspect(move |(data, _time, diff)| {
            let mut counts = this.counts.lock().unwrap_or_else(PoisonError::into_inner);
            if counts
                .entry(data.clone())
                .and_modify(|acc| *acc += diff)
                .or_insert_with(|| diff.clone())
                .is_zero()
            {
                counts.remove(data);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
fn unary(index: u32) -> Tuple {
    Tuple::from_slice(&[crate::ground::Element::new(index)])
}

#[test]
fn test_happy_path() {
    use super::TupleCollection;
    use differential_dataflow::input::InputSession;
    use std::collections::HashSet;

    let x = Var::new("x");
    let sink = TupleSink::new(vec![x.clone()]);
    let writer = sink.writer();

    timely::execute::example(move |scope| {
        let mut input = InputSession::new();

        let source = TupleCollection::new(vec![x], input.to_collection(scope));
        writer.attach(&source).expect("ok");

        input.advance_to(0);
        for i in 1..10 {
            input.insert(unary(i));
        }

        input.flush();
        input.advance_to(1);
    });

    assert_eq!(
        sink.values::<HashSet<_>>(),
        (1..10).map(unary).collect()
    );
}

#[test]
fn test_multi_counts() {
    use super::TupleCollection;
    use differential_dataflow::input::InputSession;

    let x = Var::new("x");
    let sink = TupleSink::new(vec![x.clone()]);
    let writer = sink.writer();

    timely::execute::example(move |scope| {
        let mut input = InputSession::new();

        let source = TupleCollection::new(vec![x], input.to_collection(scope));
        writer.attach(&source).expect("ok");

        input.advance_to(0);
        input.insert(unary(1));
        input.insert(unary(2));
        input.insert(unary(3));
        input.flush();
        input.advance_to(1);
        input.insert(unary(1));
        input.remove(unary(3));
        input.remove(unary(4));
        input.flush();
        input.advance_to(2);
    });

    assert_eq!(
        sink.with_snapshot(|map| map.clone()),
        vec![(unary(1), 2), (unary(2), 1), (unary(4), -1)]
            .into_iter()
            .collect()
    );
}

#[test]
fn test_mismatch_path() {
    use super::TupleCollection;
    use differential_dataflow::input::InputSession;

    let sink = TupleSink::new(vec![Var::new("x")]);
    let writer = sink.writer();

    timely::execute::example(move |scope| {
        let mut input = InputSession::<_, Tuple, isize>::new();

        let source = TupleCollection::new(vec![Var::new("y")], input.to_collection(scope));
        assert!(matches!(
            writer.attach(&source),
            Err(Error::ShapeMismatch { .. })
        ));
    });
}
