//! Given a bound path expression, how should we figure out the
//! corresponding tuples?
//!
//! Start with a criminally bad plan that's easy to express in
//! Differential Dataflow: scan every link, join conjuncts in order,
//! and pad disjuncts with full domain scans for the endpoints they
//! don't constrain.
use super::plan::Source;
use super::Plan;
use crate::algebra::{Connective, Link, Node, PathExpression};
use crate::Error;

/// Returns a Plan that yields the tuples of `expr`, in the order of
/// `expr.endpoints()`.
///
/// # Errors
///
/// Returns `Err(Unbound)` if any variable in `expr` is not bound to a
/// set, and `Err(NotIncident)` if a link's edge set has no endpoint
/// structure to scan.
pub fn plan_path_expression(expr: &PathExpression) -> Result<Plan, Error> {
    let mut unbound = None;
    expr.node().for_each_var(&mut |var| {
        if unbound.is_none() && !var.is_bound() {
            unbound = Some(var.clone());
        }
    });

    if let Some(var) = unbound {
        return Err(Error::Unbound {
            var: var.name().into(),
        });
    }

    let plan = plan_node(expr.node())?;
    tracing::debug!(%expr, result = plan.result().len(), "planned path expression");
    Ok(plan)
}

fn plan_node(node: &Node) -> Result<Plan, Error> {
    match node {
        Node::Link(link) => plan_link(link),
        Node::And(connective) => plan_and(connective),
        Node::Or(connective) => plan_or(connective),
    }
}

fn unbound(var: &crate::algebra::Var) -> Error {
    Error::Unbound {
        var: var.name().into(),
    }
}

/// Links scan `[edge, vertex]` facts, and reorder them to match the
/// link's endpoints.
fn plan_link(link: &Link) -> Result<Plan, Error> {
    let edges = link.edge().set().ok_or_else(|| unbound(link.edge()))?;
    let endpoints = link.vertex().set().ok_or_else(|| unbound(link.vertex()))?;
    let source = Source::new(edges, endpoints)?;

    let scan = Plan::scan(source, &[link.edge().clone(), link.vertex().clone()])?;
    Plan::project(scan, link.endpoints())
}

fn plan_and(connective: &Connective) -> Result<Plan, Error> {
    let mut accumulator: Option<Plan> = None;

    // A good planner would try to be smart about the order in which
    // we perform binary joins... Let's do the bare minimum with
    // natural joins all the way.
    for operand in connective.operands().iter() {
        let operand_plan = plan_node(operand.node())?;

        accumulator = match accumulator {
            None => Some(operand_plan),
            Some(acc) => Some(Plan::natural_join(acc, operand_plan)),
        }
    }

    // Natural joins yield quantified variables too.  Drop everything
    // but the endpoints.
    match accumulator {
        None => Err(Error::EmptyComposition),
        Some(acc) => Plan::project(acc, connective.endpoints()),
    }
}

fn plan_or(connective: &Connective) -> Result<Plan, Error> {
    let mut disjuncts = Vec::with_capacity(connective.operands().len());

    for operand in connective.operands().iter() {
        let mut plan = plan_node(operand.node())?;

        // An endpoint the disjunct doesn't mention is unconstrained.
        for endpoint in connective.endpoints().iter() {
            if !plan.result().contains(endpoint) {
                plan = Plan::natural_join(plan, Plan::domain(endpoint)?);
            }
        }

        disjuncts.push(Plan::project(plan, connective.endpoints())?);
    }

    Plan::union(disjuncts)
}

#[cfg(test)]
use crate::algebra::{And, LinkKind, Or, QuantifiedVar, Var};
#[cfg(test)]
use crate::ground::Set;

#[cfg(test)]
fn mesh() -> (Set, Set) {
    let vertices = Set::vertices("V", 3);
    let edges = Set::edges(
        "E",
        &[vertices.clone(), vertices.clone()],
        vec![vec![0, 1], vec![1, 2]],
    )
    .expect("ok");

    (vertices, edges)
}

#[test]
fn test_plan_link() {
    use super::plan::PlanOp;

    let (vertices, edges) = mesh();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");
    let link = Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok");

    let plan = plan_path_expression(&link).expect("ok");
    assert_eq!(plan.result(), &[v.clone(), e.clone()]);
    // Scans sort their variables, which already fits the link.
    assert!(matches!(plan.op(), PlanOp::Scan(_)));

    let link = Link::make(&e, &v, LinkKind::EdgeToVertex).expect("ok");
    let plan = plan_path_expression(&link).expect("ok");
    assert_eq!(plan.result(), &[e, v]);
    assert!(matches!(plan.op(), PlanOp::Project(_)));
}

#[test]
fn test_plan_vev() {
    let (vertices, edges) = mesh();
    let vi = Var::vertex("vi");
    let vj = Var::vertex("vj");
    let e = Var::edge("e").bind(&edges).expect("ok");

    let expr = And::make(
        &[vi.clone(), vj.clone()],
        &[QuantifiedVar::exist(&e)],
        vec![
            Link::make(&vi, &e, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&e, &vj, LinkKind::EdgeToVertex).expect("ok"),
        ],
    )
    .expect("ok");

    let bound = expr.bind(&[vertices.clone(), vertices]).expect("ok");
    let plan = plan_path_expression(&bound).expect("ok");
    assert_eq!(plan.result(), bound.endpoints());
}

#[test]
fn test_plan_or_pads_missing_endpoints() {
    use super::plan::PlanOp;

    let (vertices, edges) = mesh();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let w = Var::vertex("w").bind(&vertices).expect("ok");
    let u = Var::vertex("u").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");
    let f = Var::edge("f").bind(&edges).expect("ok");

    let vev = |x: &Var, y: &Var, edge: &Var| {
        And::make(
            &[x.clone(), y.clone()],
            &[QuantifiedVar::exist(edge)],
            vec![
                Link::make(x, edge, LinkKind::VertexToEdge).expect("ok"),
                Link::make(edge, y, LinkKind::EdgeToVertex).expect("ok"),
            ],
        )
        .expect("ok")
    };

    // The second disjunct says nothing about `w`.
    let expr = Or::make(
        &[v.clone(), w.clone()],
        &[QuantifiedVar::exist(&u)],
        vec![vev(&v, &w, &e), vev(&v, &u, &f)],
    )
    .expect("ok");

    let plan = plan_path_expression(&expr).expect("ok");
    assert_eq!(plan.result(), &[v.clone(), w.clone()]);

    let disjuncts = match plan.op() {
        PlanOp::Union(disjuncts) => disjuncts,
        other => panic!("expected a union, got {:?}", other),
    };
    assert_eq!(disjuncts.len(), 2);
    for disjunct in disjuncts.iter() {
        assert_eq!(disjunct.result(), &[v.clone(), w.clone()]);
    }

    match disjuncts[1].op() {
        PlanOp::Project(inner) => match inner.op() {
            PlanOp::Join(_, padding) => assert!(matches!(padding.op(), PlanOp::Domain(_))),
            other => panic!("expected a join, got {:?}", other),
        },
        other => panic!("expected a projection, got {:?}", other),
    }
}

#[test]
fn test_plan_unbound() {
    let v = Var::vertex("v");
    let e = Var::edge("e");
    let link = Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok");

    assert!(matches!(
        plan_path_expression(&link),
        Err(Error::Unbound { .. })
    ));
}
