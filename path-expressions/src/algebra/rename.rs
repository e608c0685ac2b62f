//! Applying a path expression to new endpoint variables, like a
//! function call: quantified variables are local to each application,
//! so every level gets fresh ones.
use super::expression::{Connective, Node, PathExpression};
use super::var::{QuantifiedVar, Var};
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};

impl PathExpression {
    /// Returns a copy of `self` with the endpoints replaced by `vars`,
    /// position by position, and fresh quantified variables.  Sets
    /// bound on either side of the substitution carry over to the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns `Err(ShapeMismatch)` if `vars` and the endpoints differ
    /// in length, `Err(TypeMismatch)` if a replacement variable's kind
    /// differs from the endpoint's, `Err(DuplicateVariable)` if `vars`
    /// repeats a variable, and `Err(InconsistentBinding)` if a
    /// replacement and its endpoint are bound to different sets.
    pub fn apply(&self, vars: &[Var]) -> Result<PathExpression, Error> {
        if vars.len() != self.arity() {
            return Err(Error::ShapeMismatch {
                expected: self.endpoint_kinds(),
                found: vars.iter().map(Var::kind).collect(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut substitution = BTreeMap::new();
        for (old, new) in self.endpoints().iter().zip(vars.iter()) {
            if !seen.insert(new.clone()) {
                return Err(Error::DuplicateVariable {
                    var: new.name().into(),
                });
            }

            substitution.insert(old.clone(), merge(old, new)?);
        }

        PathExpression::build(rename(self.node(), &substitution))
    }
}

/// Returns `new`, bound to whatever set either `old` or `new` is
/// bound to.
fn merge(old: &Var, new: &Var) -> Result<Var, Error> {
    if old.kind() != new.kind() {
        return Err(Error::TypeMismatch {
            var: new.name().into(),
            expected: old.kind(),
            found: new.kind(),
        });
    }

    match (old.set(), new.set()) {
        (Some(first), Some(second)) if first != second => Err(Error::InconsistentBinding {
            var: new.name().into(),
            first: first.name().into(),
            second: second.name().into(),
        }),
        (Some(set), None) => Ok(new.with_set(set)),
        _ => Ok(new.clone()),
    }
}

fn rename(node: &Node, substitution: &BTreeMap<Var, Var>) -> Node {
    let lookup = |var: &Var| substitution.get(var).cloned().unwrap_or_else(|| var.clone());

    match node {
        Node::Link(link) => {
            let [a, b] = link.endpoints();
            Node::Link(link.with_endpoints(lookup(a), lookup(b)))
        }
        Node::And(connective) => Node::And(rename_connective(connective, substitution)),
        Node::Or(connective) => Node::Or(rename_connective(connective, substitution)),
    }
}

fn rename_connective(connective: &Connective, substitution: &BTreeMap<Var, Var>) -> Connective {
    let endpoints: Vec<Var> = connective
        .endpoints()
        .iter()
        .map(|var| substitution.get(var).cloned().unwrap_or_else(|| var.clone()))
        .collect();

    let mut inner = substitution.clone();
    let mut quantified = Vec::with_capacity(connective.quantified().len());
    for qvar in connective.quantified().iter() {
        let fresh = qvar.var().refresh();
        inner.insert(qvar.var().clone(), fresh.clone());
        quantified.push(QuantifiedVar::new(qvar.quantifier(), &fresh));
    }

    let operands = connective
        .operands()
        .iter()
        .map(|operand| PathExpression::seal(rename(operand.node(), &inner)))
        .collect();

    Connective::new(&endpoints, &quantified, operands)
}

#[cfg(test)]
use super::{And, Link, LinkKind};

#[cfg(test)]
fn two_hops() -> PathExpression {
    let a = Var::vertex("a");
    let b = Var::vertex("b");
    let e = Var::edge("e");

    And::make(
        &[a.clone(), b.clone()],
        &[QuantifiedVar::exist(&e)],
        vec![
            Link::make(&a, &e, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&e, &b, LinkKind::EdgeToVertex).expect("ok"),
        ],
    )
    .expect("ok")
}

#[test]
fn test_apply_link() {
    let v = Var::new("v");
    let e = Var::new("e");
    let link = Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok");

    let x = Var::new("x");
    let y = Var::new("y");
    let renamed = link.apply(&[x.clone(), y.clone()]).expect("ok");

    assert_eq!(renamed.endpoints(), &[x, y]);
    assert_eq!(renamed, link);
}

#[test]
fn test_apply_refreshes_quantifiers() {
    let expr = two_hops();
    let x = Var::vertex("x");
    let y = Var::vertex("y");
    let renamed = expr.apply(&[x.clone(), y.clone()]).expect("ok");

    assert_eq!(renamed, expr);
    assert_eq!(renamed.endpoints(), &[x.clone(), y.clone()]);
    assert_ne!(renamed.quantified_vars(), expr.quantified_vars());
    assert_eq!(renamed.quantified_vars()[0].var().name(), "e");

    // Operands see the new endpoints and the fresh quantified var.
    let first = &renamed.sub_expressions()[0];
    assert_eq!(first.endpoint(0), Ok(&x));
    assert_eq!(first.endpoint(1), Ok(renamed.quantified_vars()[0].var()));

    // The receiver is untouched.
    assert_ne!(expr.endpoint(0), Ok(&x));
}

#[test]
fn test_apply_swap() {
    let expr = two_hops();
    let a = expr.endpoint(0).expect("ok").clone();
    let b = expr.endpoint(1).expect("ok").clone();

    // The relation is symmetric, but ve and ev are not: direction is
    // part of the expression.
    let swapped = expr.apply(&[b.clone(), a.clone()]).expect("ok");
    assert_ne!(swapped, expr);
    assert_eq!(swapped.endpoints(), &[b.clone(), a.clone()]);
    assert_eq!(swapped.apply(&[a, b]).expect("ok"), expr);
}

#[test]
fn test_apply_errors() {
    use crate::ground::Set;

    let expr = two_hops();

    assert!(matches!(
        expr.apply(&[Var::vertex("x")]),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
        expr.apply(&[Var::vertex("x"), Var::new("y")]),
        Err(Error::TypeMismatch { .. })
    ));

    let x = Var::vertex("x");
    assert!(matches!(
        expr.apply(&[x.clone(), x.clone()]),
        Err(Error::DuplicateVariable { .. })
    ));

    let vertices = Set::vertices("V", 2);
    let others = Set::vertices("U", 2);
    let bound = expr.bind(&[vertices.clone(), vertices]).expect("ok");
    assert!(matches!(
        bound.apply(&[x.bind(&others).expect("ok"), Var::vertex("y")]),
        Err(Error::InconsistentBinding { .. })
    ));
}

#[test]
fn test_apply_merges_bindings() {
    use crate::ground::Set;

    let vertices = Set::vertices("V", 2);
    let expr = two_hops();
    let x = Var::vertex("x").bind(&vertices).expect("ok");
    let y = Var::vertex("y");

    let renamed = expr.apply(&[x, y]).expect("ok");
    assert_ne!(renamed, expr);
    // The new binding reached the first link.
    assert_eq!(
        renamed.sub_expressions()[0].endpoint(0).expect("ok").set(),
        Some(&vertices)
    );

    let bound = expr.bind(&[vertices.clone(), vertices.clone()]).expect("ok");
    let renamed = bound
        .apply(&[Var::vertex("p"), Var::vertex("q")])
        .expect("ok");
    assert_eq!(renamed, bound);
    assert_eq!(renamed.endpoint(1).expect("ok").set(), Some(&vertices));
}

#[test]
fn test_apply_refreshes_or_quantifiers() {
    use super::Or;

    let template = two_hops();
    let v = Var::vertex("v");
    let w = Var::vertex("w");
    let u = Var::vertex("u");

    // Either v and w are adjacent, or v has some neighbour u.
    let expr = Or::make(
        &[v.clone(), w.clone()],
        &[QuantifiedVar::exist(&u)],
        vec![
            template.apply(&[v.clone(), w.clone()]).expect("ok"),
            template.apply(&[v.clone(), u.clone()]).expect("ok"),
        ],
    )
    .expect("ok");

    let p = Var::vertex("p");
    let q = Var::vertex("q");
    let renamed = expr.apply(&[p.clone(), q.clone()]).expect("ok");
    assert_eq!(renamed, expr);
    assert_eq!(expr, renamed);
    assert_eq!(renamed.endpoints(), &[p.clone(), q]);

    let fresh = renamed.quantified_vars()[0].var();
    assert_ne!(fresh, &u);
    assert_eq!(fresh.name(), "u");

    // The disjunct that mentioned u now mentions the fresh variable,
    // and its own quantified edge was refreshed as well.
    let second = &renamed.sub_expressions()[1];
    assert_eq!(second.endpoints(), &[p, fresh.clone()]);
    assert_ne!(
        second.quantified_vars(),
        expr.sub_expressions()[1].quantified_vars()
    );
    assert!(!renamed.variables().contains(&u));
}
