use crate::ground::{ElementKind, Set, SetId};
use crate::Error;

/// A `Var` names a graph-element role in a path expression, e.g., the
/// edge in "vertex incident to some edge".
///
/// Vars are uniquely identified by their sequence id; the name is
/// only useful for pretty-printing, so two Vars named `e` are still
/// distinct.  A Var may carry the concrete `Set` it is bound to; the
/// binding does not participate in identity, so the bound and unbound
/// copies of a Var are the same Var.
///
/// The implicit order on Vars sorts by sequence id (ascending).
#[derive(Clone)]
pub struct Var {
    sequence: u64,
    name: String,
    kind: ElementKind,
    set: Option<Set>,
}

/// Everything about a Var that survives renaming: what the algebra's
/// equality compares at corresponding positions.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct Signature {
    kind: ElementKind,
    set: Option<SetId>,
}

impl Var {
    /// Returns a new generic Var with `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_kind(name, ElementKind::Generic)
    }

    #[must_use]
    pub fn vertex(name: &str) -> Self {
        Self::with_kind(name, ElementKind::Vertex)
    }

    #[must_use]
    pub fn edge(name: &str) -> Self {
        Self::with_kind(name, ElementKind::Edge)
    }

    #[must_use]
    pub fn with_kind(name: &str, kind: ElementKind) -> Self {
        #[cfg(not(tarpaulin_include))]
        fn id() -> u64 {
            use std::sync::atomic::{AtomicU64, Ordering};
            static VAR_COUNTER: AtomicU64 = AtomicU64::new(0);

            VAR_COUNTER.fetch_add(1, Ordering::Relaxed)
        }

        Self {
            sequence: id(),
            name: name.into(),
            kind,
            set: None,
        }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn set(&self) -> Option<&Set> {
        self.set.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.set.is_some()
    }

    /// Returns a copy of this Var bound to `set`.  Binding to the set
    /// the Var is already bound to is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Err(TypeMismatch)` if the Var cannot hold elements of
    /// `set`'s kind, and `Err(AlreadyBound)` if the Var is bound to a
    /// different set.
    pub fn bind(&self, set: &Set) -> Result<Var, Error> {
        if !self.kind.accepts(set.kind()) {
            return Err(Error::TypeMismatch {
                var: self.name.clone(),
                expected: self.kind,
                found: set.kind(),
            });
        }

        match &self.set {
            Some(bound) if bound != set => Err(Error::AlreadyBound {
                var: self.name.clone(),
                bound: bound.name().into(),
                requested: set.name().into(),
            }),
            _ => Ok(self.with_set(set)),
        }
    }

    /// Returns the same Var, bound to `set`, without any check.
    pub(crate) fn with_set(&self, set: &Set) -> Var {
        Var {
            set: Some(set.clone()),
            ..self.clone()
        }
    }

    /// Returns a brand new Var with the same name, kind and binding.
    pub(crate) fn refresh(&self) -> Var {
        Var {
            set: self.set.clone(),
            ..Var::with_kind(&self.name, self.kind)
        }
    }

    pub(crate) fn signature(&self) -> Signature {
        Signature {
            kind: self.kind,
            set: self.set.as_ref().map(Set::id),
        }
    }
}

impl std::hash::Hash for Var {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sequence.hash(state);
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for Var {}

impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Var {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.sequence)?;
        if let Some(set) = &self.set {
            write!(f, ":{}", set)?;
        }

        Ok(())
    }
}

impl std::fmt::Display for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Only existential quantification, for now.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Quantifier {
    Exist,
}

/// A `QuantifiedVar` marks a Var as internal to a composite path
/// expression rather than one of its endpoints.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct QuantifiedVar {
    quantifier: Quantifier,
    var: Var,
}

impl QuantifiedVar {
    #[must_use]
    pub fn new(quantifier: Quantifier, var: &Var) -> Self {
        Self {
            quantifier,
            var: var.clone(),
        }
    }

    #[must_use]
    pub fn exist(var: &Var) -> Self {
        Self::new(Quantifier::Exist, var)
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn quantifier(&self) -> Quantifier {
        self.quantifier
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn var(&self) -> &Var {
        &self.var
    }
}

impl std::fmt::Display for QuantifiedVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.quantifier {
            Quantifier::Exist => write!(f, "exist {}", self.var),
        }
    }
}

#[test]
fn test_smoke() {
    let v0 = Var::new("zxc");
    let v1 = Var::new("asd");

    assert!(v0 < v1);
    assert_ne!(v0, v1);
    assert_eq!(v0.kind(), ElementKind::Generic);
    assert!(!v0.is_bound());
}

#[test]
fn test_eq_hash() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    let v0 = Var::new("a");
    let v0_clone = v0.clone();
    // v0 and v1 should be distinct, despite their name.
    let v1 = Var::new("a");

    assert_eq!(v0, v0_clone);
    assert_ne!(v0, v1);

    let hash = |var: &Var| {
        let mut h = DefaultHasher::new();
        var.hash(&mut h);
        h.finish()
    };

    assert_eq!(hash(&v0), hash(&v0_clone));
    assert_ne!(hash(&v0), hash(&v1));
}

#[test]
fn test_bind() {
    let set = Set::vertices("V", 4);
    let other = Set::vertices("U", 4);
    let v = Var::vertex("v");

    let bound = v.bind(&set).expect("ok");
    assert!(bound.is_bound());
    assert_eq!(bound.set(), Some(&set));
    // Binding does not change identity, nor the original value.
    assert_eq!(bound, v);
    assert!(!v.is_bound());

    // Rebinding to the same set is idempotent.
    assert_eq!(bound.bind(&set).expect("ok").set(), Some(&set));
    assert!(matches!(
        bound.bind(&other),
        Err(Error::AlreadyBound { .. })
    ));
}

#[test]
fn test_bind_kind_mismatch() {
    let v = Set::vertices("V", 2);
    let e = Set::edges("E", &[v.clone(), v.clone()], vec![vec![0, 1]]).expect("ok");

    assert!(matches!(
        Var::vertex("v").bind(&e),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(Var::edge("e").bind(&e).is_ok());
    assert!(Var::new("x").bind(&e).is_ok());
    assert!(Var::new("x").bind(&v).is_ok());
}

#[test]
fn test_refresh() {
    let set = Set::vertices("V", 1);
    let v = Var::vertex("v").bind(&set).expect("ok");
    let fresh = v.refresh();

    assert_ne!(v, fresh);
    assert_eq!(fresh.name(), "v");
    assert_eq!(fresh.signature(), v.signature());
}

#[test]
fn test_display() {
    let e = Var::edge("e");
    assert_eq!(e.to_string(), "e");
    assert_eq!(QuantifiedVar::exist(&e).to_string(), "exist e");
}
