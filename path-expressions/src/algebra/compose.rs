//! Composite path expressions.  Construction validates scoping
//! eagerly: once built, every variable mentioned by an operand is
//! either an endpoint of the composite or one of its quantified
//! variables.
use super::expression::{Connective, Node, PathExpression};
use super::var::{QuantifiedVar, Var};
use crate::ground::ElementKind;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};

/// Relational composition: joins the operands on shared variables,
/// then projects away the quantified ones.
#[derive(Clone, Copy, Debug)]
pub struct And;

/// Union of alternative relations over the same endpoints.
#[derive(Clone, Copy, Debug)]
pub struct Or;

impl And {
    /// Returns the conjunction of `operands`, with `endpoints` free
    /// and `quantified` existentially bound.
    ///
    /// # Errors
    ///
    /// Returns `Err(EmptyComposition)` without operands,
    /// `Err(DuplicateVariable)` if a variable is declared twice,
    /// `Err(UnscopedVariable)` if an operand mentions an undeclared
    /// variable, `Err(MissingEndpoint)` if an endpoint is not mentioned
    /// by any operand, `Err(DanglingQuantifier)` if a quantified
    /// variable does not link at least two operands, and
    /// `Err(InconsistentBinding)` if a variable is bound to different
    /// sets in different places.
    pub fn make(
        endpoints: &[Var],
        quantified: &[QuantifiedVar],
        operands: Vec<PathExpression>,
    ) -> Result<PathExpression, Error> {
        compose(Connector::And, endpoints, quantified, operands)
    }
}

impl Or {
    /// Returns the disjunction of `disjuncts`.  Each quantified
    /// variable is existential within each disjunct that mentions it.
    ///
    /// # Errors
    ///
    /// Fails like `And::make`, except that quantified variables only
    /// need to appear in one disjunct.  Also returns
    /// `Err(ShapeMismatch)` when a disjunct's arity or endpoint kinds
    /// are incompatible with `endpoints`.
    pub fn make(
        endpoints: &[Var],
        quantified: &[QuantifiedVar],
        disjuncts: Vec<PathExpression>,
    ) -> Result<PathExpression, Error> {
        compose(Connector::Or, endpoints, quantified, disjuncts)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Connector {
    And,
    Or,
}

impl Connector {
    /// Minimum number of operands each quantified variable must
    /// appear in.
    fn min_uses(self) -> usize {
        match self {
            Connector::And => 2,
            Connector::Or => 1,
        }
    }
}

fn compatible(x: ElementKind, y: ElementKind) -> bool {
    x == y || x == ElementKind::Generic || y == ElementKind::Generic
}

fn check_shape(endpoints: &[Var], disjunct: &PathExpression) -> Result<(), Error> {
    let expected: Vec<ElementKind> = endpoints.iter().map(Var::kind).collect();
    let found = disjunct.endpoint_kinds();

    if expected.len() != found.len()
        || expected
            .iter()
            .zip(found.iter())
            .any(|(x, y)| !compatible(*x, *y))
    {
        return Err(Error::ShapeMismatch { expected, found });
    }

    Ok(())
}

fn compose(
    connector: Connector,
    endpoints: &[Var],
    quantified: &[QuantifiedVar],
    operands: Vec<PathExpression>,
) -> Result<PathExpression, Error> {
    if operands.is_empty() {
        return Err(Error::EmptyComposition);
    }

    if connector == Connector::Or {
        for disjunct in operands.iter() {
            check_shape(endpoints, disjunct)?;
        }
    }

    let mut declared = BTreeSet::new();
    for var in endpoints
        .iter()
        .chain(quantified.iter().map(QuantifiedVar::var))
    {
        if !declared.insert(var.clone()) {
            return Err(Error::DuplicateVariable {
                var: var.name().into(),
            });
        }
    }

    let mut uses: BTreeMap<Var, usize> = BTreeMap::new();
    for operand in operands.iter() {
        for var in operand.endpoints().iter() {
            if !declared.contains(var) {
                return Err(Error::UnscopedVariable {
                    var: var.name().into(),
                });
            }

            *uses.entry(var.clone()).or_insert(0) += 1;
        }
    }

    for var in endpoints.iter() {
        if !uses.contains_key(var) {
            return Err(Error::MissingEndpoint {
                var: var.name().into(),
            });
        }
    }

    let required = connector.min_uses();
    for qvar in quantified.iter() {
        if uses.get(qvar.var()).copied().unwrap_or(0) < required {
            return Err(Error::DanglingQuantifier {
                var: qvar.var().name().into(),
                required,
            });
        }
    }

    let connective = Connective::new(endpoints, quantified, operands);
    PathExpression::build(match connector {
        Connector::And => Node::And(connective),
        Connector::Or => Node::Or(connective),
    })
}

#[cfg(test)]
use super::{Link, LinkKind};

#[cfg(test)]
fn vev() -> (Var, Var, Var, PathExpression) {
    let vi = Var::vertex("vi");
    let vj = Var::vertex("vj");
    let e = Var::edge("e");

    let expr = And::make(
        &[vi.clone(), vj.clone()],
        &[QuantifiedVar::exist(&e)],
        vec![
            Link::make(&vi, &e, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&e, &vj, LinkKind::EdgeToVertex).expect("ok"),
        ],
    )
    .expect("ok");

    (vi, vj, e, expr)
}

#[test]
fn test_and_happy_path() {
    let (vi, vj, e, expr) = vev();

    assert_eq!(expr.arity(), 2);
    assert_eq!(expr.endpoint(0), Ok(&vi));
    assert_eq!(expr.endpoint(1), Ok(&vj));
    assert_eq!(expr.quantified_vars(), &[QuantifiedVar::exist(&e)]);
    assert_eq!(expr.sub_expressions().len(), 2);
    assert_eq!(
        expr.to_string(),
        "(vi, vj) | exist e | ve(vi, e) and ev(e, vj)"
    );
}

#[test]
fn test_and_isomorphic() {
    let (_, _, _, left) = vev();
    let (_, _, _, right) = vev();

    assert_eq!(left, right);
    assert_eq!(left.cmp(&right), std::cmp::Ordering::Equal);
}

#[test]
fn test_and_operand_order() {
    let vi = Var::vertex("vi");
    let vj = Var::vertex("vj");
    let e = Var::edge("e");
    let first = Link::make(&vi, &e, LinkKind::VertexToEdge).expect("ok");
    let second = Link::make(&e, &vj, LinkKind::EdgeToVertex).expect("ok");

    let make = |operands| {
        And::make(
            &[vi.clone(), vj.clone()],
            &[QuantifiedVar::exist(&e)],
            operands,
        )
        .expect("ok")
    };

    let forward = make(vec![first.clone(), second.clone()]);
    assert_eq!(forward, make(vec![second.clone(), first.clone()]));
    // Duplicated conjuncts are idempotent.
    assert_eq!(forward, make(vec![first.clone(), second, first]));
}

#[test]
fn test_and_errors() {
    let a = Var::new("a");
    let b = Var::new("b");
    let c = Var::new("c");
    let q = Var::new("q");
    let ab = Link::make(&a, &b, LinkKind::VertexToEdge).expect("ok");
    let bc = Link::make(&b, &c, LinkKind::EdgeToVertex).expect("ok");

    assert_eq!(
        And::make(&[a.clone()], &[], vec![]),
        Err(Error::EmptyComposition)
    );
    assert!(matches!(
        And::make(
            &[a.clone(), b.clone()],
            &[QuantifiedVar::exist(&a)],
            vec![ab.clone()]
        ),
        Err(Error::DuplicateVariable { .. })
    ));
    assert!(matches!(
        And::make(&[a.clone(), b.clone()], &[], vec![ab.clone(), bc.clone()]),
        Err(Error::UnscopedVariable { .. })
    ));
    assert!(matches!(
        And::make(&[a.clone(), b.clone(), c.clone()], &[], vec![ab.clone()]),
        Err(Error::MissingEndpoint { .. })
    ));
    assert_eq!(
        And::make(
            &[a.clone(), b.clone()],
            &[QuantifiedVar::exist(&q)],
            vec![ab.clone()]
        ),
        Err(Error::DanglingQuantifier {
            var: "q".into(),
            required: 2
        })
    );
    // A quantifier that only touches one conjunct does not connect
    // anything.
    let aq = Link::make(&a, &q, LinkKind::VertexToEdge).expect("ok");
    assert!(matches!(
        And::make(
            &[a.clone(), b.clone()],
            &[QuantifiedVar::exist(&q)],
            vec![ab, aq]
        ),
        Err(Error::DanglingQuantifier { .. })
    ));
}

#[test]
fn test_and_inconsistent_binding() {
    use crate::ground::Set;

    let vertices = Set::vertices("V", 2);
    let others = Set::vertices("U", 2);
    let v = Var::new("v");
    let e = Var::new("e");
    let f = Var::new("f");

    let bound_v = v.bind(&vertices).expect("ok");
    let rebound_v = v.bind(&others).expect("ok");
    let bound = Link::make(&bound_v, &e, LinkKind::VertexToEdge).expect("ok");
    let rebound = Link::make(&rebound_v, &f, LinkKind::VertexToEdge).expect("ok");

    assert!(matches!(
        And::make(
            &[v.clone(), e.clone(), f.clone()],
            &[],
            vec![bound.clone(), rebound]
        ),
        Err(Error::InconsistentBinding { .. })
    ));

    // Unbound occurrences pick up the binding.
    let unbound = Link::make(&v, &f, LinkKind::VertexToEdge).expect("ok");
    let joined = And::make(&[v.clone(), e, f], &[], vec![bound, unbound]).expect("ok");
    assert_eq!(joined.endpoint(0).expect("ok").set(), Some(&vertices));
    assert!(joined.sub_expressions()[1]
        .endpoint(0)
        .expect("ok")
        .is_bound());
}

#[test]
fn test_or_scenario() {
    let v = Var::new("v");
    let e = Var::new("e");
    let u = Var::new("u");
    let f = Var::new("f");

    let make = |x: &Var, y: &Var| {
        Or::make(
            &[x.clone(), y.clone()],
            &[],
            vec![
                Link::make(x, y, LinkKind::VertexToEdge).expect("ok"),
                Link::make(y, x, LinkKind::VertexToEdge).expect("ok"),
            ],
        )
        .expect("ok")
    };

    let left = make(&v, &e);
    assert_eq!(left, make(&u, &f));
    assert_eq!(left.to_string(), "(v, e) | ve(v, e) or ve(e, v)");

    // Disjunct order does not matter.
    let swapped = Or::make(
        &[v.clone(), e.clone()],
        &[],
        vec![
            Link::make(&e, &v, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok"),
        ],
    )
    .expect("ok");
    assert_eq!(left, swapped);

    // A single alternative is the same as the alternative itself.
    let single = Or::make(
        &[v.clone(), e.clone()],
        &[],
        vec![Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok")],
    )
    .expect("ok");
    assert_eq!(single, Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok"));
    assert_ne!(single, left);
}

#[test]
fn test_or_shape_mismatch() {
    let v = Var::vertex("v");
    let e = Var::edge("e");
    let ve = Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok");
    let ev = Link::make(&e, &v, LinkKind::EdgeToVertex).expect("ok");

    assert_eq!(
        Or::make(&[v.clone(), e.clone()], &[], vec![ve.clone(), ev]),
        Err(Error::ShapeMismatch {
            expected: vec![ElementKind::Vertex, ElementKind::Edge],
            found: vec![ElementKind::Edge, ElementKind::Vertex],
        })
    );

    let w = Var::vertex("w");
    assert!(matches!(
        Or::make(&[v.clone(), e.clone(), w], &[], vec![ve.clone()]),
        Err(Error::ShapeMismatch { .. })
    ));

    // Generic positions accept any kind, so this one only fails on
    // scoping.
    let x = Var::new("x");
    let y = Var::new("y");
    assert!(matches!(
        Or::make(
            &[x.clone(), y.clone()],
            &[],
            vec![Link::make(&x, &y, LinkKind::VertexToEdge).expect("ok"), ve]
        ),
        Err(Error::UnscopedVariable { .. })
    ));
}

#[test]
fn test_or_quantifier() {
    let a = Var::new("a");
    let b = Var::new("b");
    let q = Var::new("q");
    let ab = Link::make(&a, &b, LinkKind::VertexToEdge).expect("ok");
    let aq = Link::make(&a, &q, LinkKind::VertexToEdge).expect("ok");

    let or = Or::make(
        &[a.clone(), b.clone()],
        &[QuantifiedVar::exist(&q)],
        vec![ab.clone(), aq],
    )
    .expect("ok");
    assert_eq!(or.quantified_vars().len(), 1);

    assert!(matches!(
        Or::make(&[a, b], &[QuantifiedVar::exist(&q)], vec![ab]),
        Err(Error::DanglingQuantifier { required: 1, .. })
    ));
}
