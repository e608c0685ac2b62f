//! Binding attaches concrete sets to the variables of a path
//! expression.  Bindings are values: binding an expression returns a
//! new tree, and leaves the receiver (and every other tree sharing
//! its variables) alone.
//!
//! Once the requested bindings are in place, we infer what we can
//! from the incidence structure: a link whose edge side is bound to
//! an edge set with a single endpoint set binds its vertex side to
//! that endpoint set.
use super::expression::{collect_sets, PathExpression};
use super::var::Var;
use crate::ground::Set;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};

/// A map from variables to the set they should be bound to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Binding {
    sets: BTreeMap<Var, Set>,
}

impl Binding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `var -> set` to the binding.
    ///
    /// # Errors
    ///
    /// Returns `Err(InconsistentBinding)` if `var` is already mapped
    /// to a different set.
    pub fn insert(&mut self, var: &Var, set: &Set) -> Result<(), Error> {
        match self.sets.get(var) {
            Some(prev) if prev != set => Err(Error::InconsistentBinding {
                var: var.name().into(),
                first: prev.name().into(),
                second: set.name().into(),
            }),
            Some(_) => Ok(()),
            None => {
                self.sets.insert(var.clone(), set.clone());
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, var: &Var) -> Option<&Set> {
        self.sets.get(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Set)> {
        self.sets.iter()
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl PathExpression {
    /// Binds the endpoints to `sets`, position by position.
    ///
    /// # Errors
    ///
    /// Returns `Err(ShapeMismatch)` if there isn't exactly one set per
    /// endpoint, and otherwise fails like `bind_vars`.
    pub fn bind(&self, sets: &[Set]) -> Result<PathExpression, Error> {
        if sets.len() != self.arity() {
            return Err(Error::ShapeMismatch {
                expected: self.endpoint_kinds(),
                found: sets.iter().map(Set::kind).collect(),
            });
        }

        let mut binding = Binding::new();
        for (var, set) in self.endpoints().iter().zip(sets.iter()) {
            binding.insert(var, set)?;
        }

        self.bind_vars(&binding)
    }

    /// Binds the variables in `binding`, wherever they occur in the
    /// tree, propagates the sets to every occurrence of these
    /// variables, and infers sets for the vertex side of links.
    ///
    /// # Errors
    ///
    /// Returns `Err(UnscopedVariable)` if `binding` mentions a variable
    /// that does not occur in the tree, `Err(TypeMismatch)` or
    /// `Err(AlreadyBound)` if a variable rejects its set,
    /// `Err(InconsistentBinding)` if inference finds two different
    /// sets for the same variable, and `Err(NotIncident)` if the result
    /// binds a link to unrelated sets.
    pub fn bind_vars(&self, binding: &Binding) -> Result<PathExpression, Error> {
        let occurring: BTreeSet<Var> = self.variables().into_iter().collect();

        let mut sets = collect_sets(self.node())?;
        for (var, set) in binding.iter() {
            let current = occurring
                .get(var)
                .ok_or_else(|| Error::UnscopedVariable {
                    var: var.name().into(),
                })?;

            current.bind(set)?;
            sets.insert(var.clone(), set.clone());
        }

        let inferred = infer(self, &mut sets)?;
        tracing::debug!(
            requested = binding.len(),
            inferred = inferred.len(),
            "binding path expression"
        );

        PathExpression::build(self.node().map_vars(&mut |var| match sets.get(var) {
            Some(set) => var.with_set(set),
            None => var.clone(),
        }))
    }
}

/// Binds the vertex side of links whose edge side is bound to an edge
/// set with homogeneous endpoints, until nothing changes.  Returns the
/// variables bound that way.
fn infer(expr: &PathExpression, sets: &mut BTreeMap<Var, Set>) -> Result<BTreeSet<Var>, Error> {
    let mut inferred = BTreeSet::new();

    loop {
        let mut candidates = Vec::new();
        expr.node().for_each_link(&mut |link| {
            let target = sets
                .get(link.edge())
                .and_then(|edges| edges.homogeneous_endpoints());
            if let Some(target) = target {
                candidates.push((link.vertex().clone(), target.clone()));
            }
        });

        let mut changed = false;
        for (var, target) in candidates {
            match sets.get(&var) {
                None => {
                    if !var.kind().accepts(target.kind()) {
                        return Err(Error::TypeMismatch {
                            var: var.name().into(),
                            expected: var.kind(),
                            found: target.kind(),
                        });
                    }

                    tracing::trace!(var = var.name(), set = target.name(), "inferred binding");
                    sets.insert(var.clone(), target);
                    inferred.insert(var);
                    changed = true;
                }
                Some(prev) if *prev != target && inferred.contains(&var) => {
                    return Err(Error::InconsistentBinding {
                        var: var.name().into(),
                        first: prev.name().into(),
                        second: target.name().into(),
                    });
                }
                // Explicit bindings that disagree with the incidence
                // structure are reported as `NotIncident` on rebuild.
                Some(_) => {}
            }
        }

        if !changed {
            return Ok(inferred);
        }
    }
}

#[cfg(test)]
use super::{And, Link, LinkKind, QuantifiedVar};

#[cfg(test)]
struct Mesh {
    vertices: Set,
    edges: Set,
}

#[cfg(test)]
fn mesh(name: &str) -> Mesh {
    let vertices = Set::vertices(&format!("{}V", name), 3);
    let edges = Set::edges(
        &format!("{}E", name),
        &[vertices.clone(), vertices.clone()],
        vec![vec![0, 1], vec![1, 2]],
    )
    .expect("ok");

    Mesh { vertices, edges }
}

#[cfg(test)]
fn vev() -> PathExpression {
    let vi = Var::vertex("vi");
    let vj = Var::vertex("vj");
    let e = Var::edge("e");

    And::make(
        &[vi.clone(), vj.clone()],
        &[QuantifiedVar::exist(&e)],
        vec![
            Link::make(&vi, &e, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&e, &vj, LinkKind::EdgeToVertex).expect("ok"),
        ],
    )
    .expect("ok")
}

#[test]
fn test_binding_insert() {
    let m = mesh("");
    let v = Var::vertex("v");
    let mut binding = Binding::new();

    assert!(binding.is_empty());
    binding.insert(&v, &m.vertices).expect("ok");
    binding.insert(&v, &m.vertices).expect("ok");
    assert_eq!(binding.len(), 1);
    assert_eq!(binding.get(&v), Some(&m.vertices));
    assert!(matches!(
        binding.insert(&v, &m.edges),
        Err(Error::InconsistentBinding { .. })
    ));
}

#[test]
fn test_bind_endpoints() {
    let m = mesh("");
    let expr = vev();
    let bound = expr.bind(&[m.vertices.clone(), m.vertices.clone()]).expect("ok");

    assert!(!expr.is_bound());
    assert_eq!(bound.endpoint(0).expect("ok").set(), Some(&m.vertices));
    // Nothing to infer the quantified edge from.
    assert!(!bound.is_bound());
    assert_ne!(bound, expr);

    // Re-binding to the same sets is idempotent.
    let again = bound.bind(&[m.vertices.clone(), m.vertices.clone()]).expect("ok");
    assert_eq!(again, bound);
}

#[test]
fn test_bind_quantified() {
    let m = mesh("");
    let expr = vev();
    let e = expr.quantified_vars()[0].var().clone();

    let mut binding = Binding::new();
    binding.insert(&e, &m.edges).expect("ok");
    let bound = expr.bind_vars(&binding).expect("ok");

    // Both vertices are inferred from the edge set.
    assert!(bound.is_bound());
    assert_eq!(bound.endpoint(1).expect("ok").set(), Some(&m.vertices));
    assert_eq!(
        bound,
        expr.bind(&[m.vertices.clone(), m.vertices.clone()])
            .and_then(|partial| partial.bind_vars(&binding))
            .expect("ok")
    );
}

#[test]
fn test_bind_errors() {
    let m = mesh("");
    let other = mesh("other");
    let expr = vev();

    assert!(matches!(
        expr.bind(&[m.vertices.clone()]),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
        expr.bind(&[m.edges.clone(), m.vertices.clone()]),
        Err(Error::TypeMismatch { .. })
    ));

    let bound = expr.bind(&[m.vertices.clone(), m.vertices.clone()]).expect("ok");
    assert!(matches!(
        bound.bind(&[other.vertices.clone(), other.vertices.clone()]),
        Err(Error::AlreadyBound { .. })
    ));

    // Variables that do not occur in the tree can't be bound.
    let mut binding = Binding::new();
    binding.insert(&Var::vertex("stranger"), &m.vertices).expect("ok");
    assert!(matches!(
        expr.bind_vars(&binding),
        Err(Error::UnscopedVariable { .. })
    ));

    // The edge set does not connect `other`'s vertices.
    let e = expr.quantified_vars()[0].var().clone();
    let mut binding = Binding::new();
    binding.insert(&e, &m.edges).expect("ok");
    binding.insert(&expr.endpoints()[0], &other.vertices).expect("ok");
    assert!(matches!(
        expr.bind_vars(&binding),
        Err(Error::NotIncident { .. })
    ));
}

#[test]
fn test_bind_conflicting_inference() {
    let m = mesh("");
    let other = mesh("other");
    let v = Var::vertex("v");
    let e = Var::edge("e");
    let f = Var::edge("f");

    // v is incident to both e and f, which live on different meshes.
    let expr = And::make(
        &[e.clone(), f.clone()],
        &[QuantifiedVar::exist(&v)],
        vec![
            Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&v, &f, LinkKind::VertexToEdge).expect("ok"),
        ],
    )
    .expect("ok");

    assert!(matches!(
        expr.bind(&[m.edges.clone(), other.edges.clone()]),
        Err(Error::InconsistentBinding { .. })
    ));
    assert!(expr.bind(&[m.edges.clone(), m.edges.clone()]).expect("ok").is_bound());
}

#[test]
fn test_bind_does_not_alias() {
    let m = mesh("");
    let other = mesh("other");
    let template = vev();

    let left = template.bind(&[m.vertices.clone(), m.vertices.clone()]).expect("ok");
    let right = template
        .bind(&[other.vertices.clone(), other.vertices.clone()])
        .expect("ok");

    assert_ne!(left, right);
    assert!(!template.endpoint(0).expect("ok").is_bound());
}

#[test]
fn test_bind_nested_quantified() {
    let m = mesh("");
    let template = vev();
    let x: Vec<Var> = (0..3).map(|i| Var::vertex(&format!("x{}", i))).collect();

    let two_hops = And::make(
        &[x[0].clone(), x[2].clone()],
        &[QuantifiedVar::exist(&x[1])],
        vec![
            template.apply(&[x[0].clone(), x[1].clone()]).expect("ok"),
            template.apply(&[x[1].clone(), x[2].clone()]).expect("ok"),
        ],
    )
    .expect("ok");

    // Binding every vertex leaves the inner edges alone.
    let mut vertices = Binding::new();
    for var in x.iter() {
        vertices.insert(var, &m.vertices).expect("ok");
    }
    let partial = two_hops.bind_vars(&vertices).expect("ok");
    assert!(!partial.is_bound());

    // The edges quantified by each operand are reachable too.
    let edges: Vec<Var> = two_hops
        .variables()
        .into_iter()
        .filter(|var| var.kind() == crate::ground::ElementKind::Edge)
        .collect();
    assert_eq!(edges.len(), 2);

    let mut binding = Binding::new();
    for var in edges.iter() {
        binding.insert(var, &m.edges).expect("ok");
    }
    let bound = two_hops.bind_vars(&binding).expect("ok");
    assert!(bound.is_bound());
    assert_eq!(bound, partial.bind_vars(&binding).expect("ok"));
    assert!(!two_hops.is_bound());
}
