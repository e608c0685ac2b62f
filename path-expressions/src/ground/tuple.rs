//! A tuple of elements is what flows through the evaluation of a bound
//! relation: incidence facts read from edge sets, intermediate join
//! results, and finally endpoint tuples.  Which variable each position
//! stands for is tracked next to the container, never per tuple.

use super::Element;
#[cfg(feature = "dataflow")]
use abomonation::Abomonation;
#[cfg(feature = "dataflow")]
use std::io::Result as IOResult;
#[cfg(feature = "dataflow")]
use std::io::Write;

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Tuple {
    elements: Vec<Element>,
}

impl Tuple {
    #[inline]
    #[must_use]
    pub fn from_vec(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(elements: &[Element]) -> Self {
        Self::from_vec(elements.to_vec())
    }

    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T> From<T> for Tuple
where
    T: Sized + AsRef<[Element]>,
{
    #[inline]
    fn from(slice: T) -> Self {
        Self::from_slice(slice.as_ref())
    }
}

/// Differential dataflow wants exchangeable data; we only run on a
/// single worker, but the encoding is cheap to get right by
/// delegating to the element vector.
#[cfg(feature = "dataflow")]
impl Abomonation for Tuple {
    unsafe fn entomb<W: Write>(&self, write: &mut W) -> IOResult<()> {
        self.elements.entomb(write)
    }

    unsafe fn exhume<'a, 'b>(&'a mut self, bytes: &'b mut [u8]) -> Option<&'b mut [u8]> {
        self.elements.exhume(bytes)
    }

    fn extent(&self) -> usize {
        self.elements.extent()
    }
}

#[test]
fn construct() {
    let a = Element::new(1);
    let b = Element::new(2);

    let from_vec = Tuple::from_vec(vec![a, b]);
    let from_slice: Tuple = [a, b].into();
    assert_eq!(from_vec, from_slice);
    assert_eq!(from_vec.elements(), &[a, b]);
    assert_eq!(from_vec.len(), 2);
    assert!(!from_vec.is_empty());
    assert!(Tuple::default().is_empty());
}

#[test]
fn order_is_lexicographic() {
    let t = |xs: &[u32]| Tuple::from_vec(xs.iter().map(|x| Element::new(*x)).collect());

    assert!(t(&[0, 5]) < t(&[1, 0]));
    assert!(t(&[1]) < t(&[1, 0]));
    assert!(t(&[1, 0]) < t(&[1, 1]));
}
