//! Sets belong to the graph layer; the algebra only holds references
//! to them.  A set has an element kind, a cardinality, and, for edge
//! sets, the list of endpoint sets along with one incidence row per
//! edge (the index of the edge's endpoint in each endpoint set).
//!
//! Identity is a process-wide sequence number: two sets with the same
//! name and contents are still different sets.
use super::Element;
use crate::Error;
use std::sync::Arc;

/// The role of graph elements.  `Generic` variables accept sets of any
/// kind; a `Generic` set only binds to `Generic` variables.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ElementKind {
    Vertex,
    Edge,
    Generic,
}

impl ElementKind {
    /// Returns whether a variable of kind `self` may stand for
    /// elements of kind `other`.
    #[inline]
    #[must_use]
    pub fn accepts(self, other: ElementKind) -> bool {
        self == ElementKind::Generic || self == other
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SetId(u64);

impl SetId {
    fn fresh() -> Self {
        #[cfg(not(tarpaulin_include))]
        fn id() -> u64 {
            use std::sync::atomic::{AtomicU64, Ordering};
            static SET_COUNTER: AtomicU64 = AtomicU64::new(1);

            SET_COUNTER.fetch_add(1, Ordering::Relaxed)
        }

        Self(id())
    }
}

/// A cheaply clonable handle on a concrete set.
#[derive(Clone)]
pub struct Set {
    inner: Arc<SetData>,
}

struct SetData {
    id: SetId,
    name: String,
    kind: ElementKind,
    cardinality: usize,
    endpoints: Vec<Set>,
    incidence: Vec<Box<[Element]>>,
}

impl Set {
    /// Returns a new set of `cardinality` elements of `kind`, without
    /// endpoint structure.
    #[must_use]
    pub fn new(name: &str, kind: ElementKind, cardinality: usize) -> Self {
        Self {
            inner: Arc::new(SetData {
                id: SetId::fresh(),
                name: name.into(),
                kind,
                cardinality,
                endpoints: Vec::new(),
                incidence: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn vertices(name: &str, cardinality: usize) -> Self {
        Self::new(name, ElementKind::Vertex, cardinality)
    }

    /// Returns a new edge set over `endpoints`.  Each row of
    /// `incidence` describes one edge, and lists the index of its
    /// endpoint in each of the `endpoints` sets, in order.
    ///
    /// # Errors
    ///
    /// Returns `Err(InvalidIncidence)` when there are no endpoint
    /// sets, a row's width differs from the number of endpoint sets,
    /// or an index is out of range for its endpoint set.
    pub fn edges(name: &str, endpoints: &[Set], incidence: Vec<Vec<u32>>) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidIncidence {
            set: name.into(),
            reason,
        };

        if endpoints.is_empty() {
            return Err(invalid("edge sets need at least one endpoint set".into()));
        }

        let mut rows = Vec::with_capacity(incidence.len());
        for (edge, row) in incidence.into_iter().enumerate() {
            if row.len() != endpoints.len() {
                return Err(invalid(format!(
                    "edge {} has {} endpoints, expected {}",
                    edge,
                    row.len(),
                    endpoints.len()
                )));
            }

            for (position, index) in row.iter().enumerate() {
                let target = &endpoints[position];
                if *index as usize >= target.cardinality() {
                    return Err(invalid(format!(
                        "edge {} refers to element {} of {}, which has {} elements",
                        edge,
                        index,
                        target.name(),
                        target.cardinality()
                    )));
                }
            }

            rows.push(
                row.into_iter()
                    .map(Element::new)
                    .collect::<Vec<_>>()
                    .into_boxed_slice(),
            );
        }

        Ok(Self {
            inner: Arc::new(SetData {
                id: SetId::fresh(),
                name: name.into(),
                kind: ElementKind::Edge,
                cardinality: rows.len(),
                endpoints: endpoints.to_vec(),
                incidence: rows,
            }),
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SetId {
        self.inner.id
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.inner.kind
    }

    #[inline]
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.inner.cardinality
    }

    /// Returns the endpoint sets of an edge set (empty for other
    /// sets).
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn endpoints(&self) -> &[Set] {
        &self.inner.endpoints
    }

    /// Returns one row of endpoint elements per edge.
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn incidence(&self) -> &[Box<[Element]>] {
        &self.inner.incidence
    }

    /// Returns the single set all endpoints of this edge set live in,
    /// if there is one.
    #[must_use]
    pub fn homogeneous_endpoints(&self) -> Option<&Set> {
        let (first, rest) = self.inner.endpoints.split_first()?;
        if rest.iter().all(|other| other == first) {
            Some(first)
        } else {
            None
        }
    }

    /// Returns whether some endpoint position of this set lives in
    /// `other`.
    #[must_use]
    pub fn has_endpoints_in(&self, other: &Set) -> bool {
        self.inner.endpoints.iter().any(|set| set == other)
    }

    /// Iterates over every element of the set.
    pub fn elements(&self) -> impl Iterator<Item = Element> {
        (0..self.cardinality()).map(|index| Element::new(index as u32))
    }
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Set {}

impl std::hash::Hash for Set {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl PartialOrd for Set {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Set {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.id.cmp(&other.inner.id)
    }
}

impl std::fmt::Debug for Set {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Set")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("cardinality", &self.inner.cardinality)
            .finish()
    }
}

impl std::fmt::Display for Set {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner.name)
    }
}

#[test]
fn test_identity() {
    let v0 = Set::vertices("V", 3);
    let v1 = Set::vertices("V", 3);

    assert_eq!(v0, v0.clone());
    assert_ne!(v0, v1);
    assert!(v0 < v1);
}

#[test]
fn test_accepts() {
    assert!(ElementKind::Generic.accepts(ElementKind::Edge));
    assert!(ElementKind::Vertex.accepts(ElementKind::Vertex));
    assert!(!ElementKind::Vertex.accepts(ElementKind::Edge));
    assert!(!ElementKind::Edge.accepts(ElementKind::Generic));
}

#[test]
fn test_edges_happy_path() {
    let v = Set::vertices("V", 3);
    let e = Set::edges("E", &[v.clone(), v.clone()], vec![vec![0, 1], vec![1, 2]])
        .expect("ok");

    assert_eq!(e.kind(), ElementKind::Edge);
    assert_eq!(e.cardinality(), 2);
    assert_eq!(e.homogeneous_endpoints(), Some(&v));
    assert!(e.has_endpoints_in(&v));
    assert_eq!(
        &*e.incidence()[1],
        &[Element::new(1), Element::new(2)]
    );
    assert_eq!(
        e.elements().collect::<Vec<_>>(),
        vec![Element::new(0), Element::new(1)]
    );
    assert_eq!(v.homogeneous_endpoints(), None);
}

#[test]
fn test_edges_heterogeneous() {
    let v = Set::vertices("V", 2);
    let u = Set::vertices("U", 2);
    let e = Set::edges("E", &[v.clone(), u.clone()], vec![vec![0, 1]]).expect("ok");

    assert_eq!(e.homogeneous_endpoints(), None);
    assert!(e.has_endpoints_in(&v));
    assert!(e.has_endpoints_in(&u));
}

#[test]
fn test_edges_invalid() {
    let v = Set::vertices("V", 2);

    assert!(matches!(
        Set::edges("E", &[], vec![]),
        Err(Error::InvalidIncidence { .. })
    ));
    assert!(matches!(
        Set::edges("E", &[v.clone(), v.clone()], vec![vec![0]]),
        Err(Error::InvalidIncidence { .. })
    ));
    assert!(matches!(
        Set::edges("E", &[v.clone(), v.clone()], vec![vec![0, 2]]),
        Err(Error::InvalidIncidence { .. })
    ));
}
