//! Evaluating bound path expressions on a small triangle strip.
#![cfg(feature = "dataflow")]
use path_expressions::execution::materialize;
use path_expressions::ground::{Element, ElementKind, Set};
use path_expressions::{
    And, Binding, Error, Link, LinkKind, Or, PathExpression, QuantifiedVar, Var,
};

/// Four vertices, five edges: two triangles sharing the edge (1, 2).
fn strip() -> (Set, Set) {
    let vertices = Set::vertices("V", 4);
    let edges = Set::edges(
        "E",
        &[vertices.clone(), vertices.clone()],
        vec![vec![0, 1], vec![0, 2], vec![1, 2], vec![1, 3], vec![2, 3]],
    )
    .expect("valid incidence");

    (vertices, edges)
}

/// Vertices that share an edge of `edges`.
fn vev(vi: &Var, vj: &Var, edges: &Set) -> PathExpression {
    let e = Var::edge("e").bind(edges).expect("ok");

    And::make(
        &[vi.clone(), vj.clone()],
        &[QuantifiedVar::exist(&e)],
        vec![
            Link::make(vi, &e, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&e, vj, LinkKind::EdgeToVertex).expect("ok"),
        ],
    )
    .expect("ok")
}

fn elements(xs: &[u32]) -> Vec<Element> {
    xs.iter().map(|x| Element::new(*x)).collect()
}

#[test]
fn neighbours_of_each_vertex() {
    let (vertices, edges) = strip();

    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let partial = Link::make(&v, &Var::edge("e"), LinkKind::VertexToEdge).expect("ok");
    assert!(matches!(materialize(&partial), Err(Error::Unbound { .. })));

    let expr = vev(&Var::vertex("vi"), &Var::vertex("vj"), &edges);
    let bound = expr
        .bind(&[vertices.clone(), vertices.clone()])
        .expect("ok");
    assert!(bound.is_bound());

    let relation = materialize(&bound).expect("ok");
    assert_eq!(relation.neighbors(Element::new(0)), Ok(elements(&[0, 1, 2])));
    assert_eq!(
        relation.neighbors(Element::new(1)),
        Ok(elements(&[0, 1, 2, 3]))
    );
    assert_eq!(relation.neighbors(Element::new(3)), Ok(elements(&[1, 2, 3])));
    assert!(relation.holds(&elements(&[2, 1])));
    assert!(!relation.holds(&elements(&[0, 3])));

    let pattern = relation.sparsity_pattern().expect("ok");
    assert_eq!(pattern.rows(), 4);
    assert_eq!(pattern.row_offsets(), &[0, 3, 7, 11, 14]);
    assert_eq!(pattern.nnz(), relation.len());
}

#[test]
fn renamed_expressions_evaluate_alike() {
    let (vertices, edges) = strip();
    let expr = vev(&Var::vertex("vi"), &Var::vertex("vj"), &edges)
        .bind(&[vertices.clone(), vertices])
        .expect("ok");

    let renamed = expr
        .apply(&[Var::vertex("p"), Var::vertex("q")])
        .expect("ok");
    assert_eq!(renamed, expr);

    let original = materialize(&expr).expect("ok");
    let copy = materialize(&renamed).expect("ok");
    assert_eq!(
        original.iter().collect::<Vec<_>>(),
        copy.iter().collect::<Vec<_>>()
    );
    assert_eq!(copy.endpoints()[0].name(), "p");
}

#[test]
fn disjunction_with_unconstrained_endpoint() {
    let (vertices, edges) = strip();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let w = Var::vertex("w").bind(&vertices).expect("ok");
    let u = Var::vertex("u").bind(&vertices).expect("ok");

    // Either v and w share an edge, or v has some neighbour u, and w
    // is unconstrained.
    let expr = Or::make(
        &[v.clone(), w.clone()],
        &[QuantifiedVar::exist(&u)],
        vec![vev(&v, &w, &edges), vev(&v, &u, &edges)],
    )
    .expect("ok");

    // Every vertex has a neighbour, so the second disjunct pairs every
    // vertex with every vertex.
    let relation = materialize(&expr).expect("ok");
    assert_eq!(relation.len(), 16);
    assert!(relation.holds(&elements(&[0, 3])));
}

/// `(vi, vj) | exist e | ve(vi, e) and ev(e, vj)`, with nothing bound.
fn template() -> PathExpression {
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
fn composed_templates_bind_all_the_way_down() {
    // A path of six vertices.
    let vertices = Set::vertices("V", 6);
    let edges = Set::edges(
        "E",
        &[vertices.clone(), vertices.clone()],
        vec![vec![0, 1], vec![1, 2], vec![2, 3], vec![3, 4], vec![4, 5]],
    )
    .expect("valid incidence");

    let template = template();
    let v: Vec<Var> = (0..5).map(|i| Var::vertex(&format!("v{}", i))).collect();
    let mut four_hops = template.apply(&[v[0].clone(), v[1].clone()]).expect("ok");
    for i in 1..4 {
        four_hops = And::make(
            &[v[0].clone(), v[i + 1].clone()],
            &[QuantifiedVar::exist(&v[i])],
            vec![
                four_hops,
                template.apply(&[v[i].clone(), v[i + 1].clone()]).expect("ok"),
            ],
        )
        .expect("ok");
    }

    // Endpoints alone can't reach the edges of the inner operands.
    let partial = four_hops
        .bind(&[vertices.clone(), vertices.clone()])
        .expect("ok");
    assert!(matches!(materialize(&partial), Err(Error::Unbound { .. })));

    let mut binding = Binding::new();
    for var in four_hops.variables().iter() {
        if var.kind() == ElementKind::Edge {
            binding.insert(var, &edges).expect("fresh binding");
        }
    }
    let bound = four_hops.bind_vars(&binding).expect("consistent binding");
    assert!(bound.is_bound());

    // Vertices at most four steps apart: every pair but (0, 5) and (5, 0).
    let relation = materialize(&bound).expect("ok");
    assert_eq!(relation.len(), 34);
    assert!(!relation.holds(&elements(&[0, 5])));
    assert_eq!(
        relation.neighbors(Element::new(0)),
        Ok(elements(&[0, 1, 2, 3, 4]))
    );
}
