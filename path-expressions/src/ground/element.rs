//! Elements are opaque positions in a set.  Everything else about an
//! element (its kind, the set it lives in) is hoisted out to the
//! shape of the containers that hold it.

/// An element is simply its index in the owning `Set`.  32 bits are
/// plenty for the meshes we compile against.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Element(u32);

impl Element {
    #[inline]
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Elements are plain old data: the default (no-op) methods are
/// exactly right.
#[cfg(feature = "dataflow")]
impl abomonation::Abomonation for Element {}

#[test]
fn test_index() {
    assert_eq!(Element::new(3).index(), 3);
    assert!(Element::new(1) < Element::new(2));
    assert_eq!(Element::new(7).to_string(), "7");
}
