//! End-to-end scenarios for building, renaming, binding and comparing
//! path expressions through the public API.
use path_expressions::ground::Set;
use path_expressions::{And, Binding, Error, Link, LinkKind, Or, PathExpression, QuantifiedVar, Var};

struct Mesh {
    vertices: Set,
    edges: Set,
}

fn mesh(name: &str) -> Mesh {
    let vertices = Set::vertices(&format!("{}V", name), 4);
    let edges = Set::edges(
        &format!("{}E", name),
        &[vertices.clone(), vertices.clone()],
        vec![vec![0, 1], vec![1, 2], vec![2, 3]],
    )
    .expect("valid incidence");

    Mesh { vertices, edges }
}

fn ve(a: &Var, b: &Var) -> PathExpression {
    Link::make(a, b, LinkKind::VertexToEdge).expect("distinct variables")
}

fn ev(a: &Var, b: &Var) -> PathExpression {
    Link::make(a, b, LinkKind::EdgeToVertex).expect("distinct variables")
}

/// `(vi, vj) | exist e | ve(vi, e) and ev(e, vj)`: vertices that share
/// an edge.
fn vev(vi: &Var, vj: &Var) -> PathExpression {
    let e = Var::edge("e");

    And::make(
        &[vi.clone(), vj.clone()],
        &[QuantifiedVar::exist(&e)],
        vec![ve(vi, &e), ev(&e, vj)],
    )
    .expect("well-scoped")
}

/// Binds both endpoints of a `vev` relation to the mesh's vertices, and
/// its quantified edge to the mesh's edges.
fn bind_vev(expr: &PathExpression, mesh: &Mesh) -> PathExpression {
    let mut binding = Binding::new();
    for endpoint in expr.endpoints().iter() {
        binding.insert(endpoint, &mesh.vertices).expect("fresh binding");
    }

    for qvar in expr.quantified_vars().iter() {
        binding.insert(qvar.var(), &mesh.edges).expect("fresh binding");
    }

    expr.bind_vars(&binding).expect("consistent binding")
}

#[test]
fn vev_and_ufu() {
    let vi = Var::vertex("vi");
    let vj = Var::vertex("vj");
    let vev = vev(&vi, &vj);

    assert_eq!(vev.endpoint(0), Ok(&vi));
    assert_eq!(vev.endpoint(1), Ok(&vj));

    let ui = Var::vertex("ui");
    let uj = Var::vertex("uj");
    let f = Var::edge("f");
    let ufu = And::make(
        &[ui.clone(), uj.clone()],
        &[QuantifiedVar::exist(&f)],
        vec![ve(&ui, &f), ev(&f, &uj)],
    )
    .expect("well-scoped");

    assert_eq!(vev, ufu);
    assert_eq!(ufu, vev);

    let m = mesh("");
    let bound_vev = bind_vev(&vev, &m);
    let bound_ufu = bind_vev(&ufu, &m);
    assert!(bound_vev.is_bound());
    assert_eq!(bound_vev, bound_ufu);
    assert_ne!(bound_vev, vev);

    let other = mesh("other");
    let other_ufu = bind_vev(&ufu, &other);
    assert_ne!(bound_vev, other_ufu);

    // Binding is a value operation: the unbound originals are intact.
    assert_eq!(vev, ufu);
    assert!(!ufu.is_bound());
}

#[test]
fn or_scenario() {
    let v = Var::new("v");
    let e = Var::new("e");
    let u = Var::new("u");
    let f = Var::new("f");

    let left = Or::make(&[v.clone(), e.clone()], &[], vec![ve(&v, &e), ve(&e, &v)]).expect("ok");
    let right = Or::make(&[u.clone(), f.clone()], &[], vec![ve(&u, &f), ve(&f, &u)]).expect("ok");
    assert_eq!(left, right);

    let first = Set::vertices("V", 2);
    let second = Set::vertices("E", 2);
    let third = Set::vertices("U", 2);
    let fourth = Set::vertices("F", 2);

    let bound_left = left.bind(&[first.clone(), second.clone()]).expect("ok");
    let bound_right = right.bind(&[third, fourth]).expect("ok");
    assert_ne!(bound_left, bound_right);

    let same_right = right.bind(&[first, second]).expect("ok");
    assert_eq!(bound_left, same_right);
}

#[test]
fn link_direction_is_load_bearing() {
    let v = Var::vertex("v");
    let e = Var::edge("e");

    let forward = ve(&v, &e);
    let backward = ve(&e, &v);
    assert_eq!(forward.endpoint(0), Ok(&v));
    assert_eq!(forward.endpoint(1), Ok(&e));
    assert_ne!(forward, backward);
    assert_ne!(ve(&v, &e), ev(&v, &e));
    assert_ne!(ve(&v, &e), ev(&e, &v));
}

#[test]
fn boundaries() {
    let vi = Var::vertex("vi");
    let vj = Var::vertex("vj");
    let expr = vev(&vi, &vj);

    assert_eq!(
        expr.endpoint(2),
        Err(Error::IndexOutOfRange { index: 2, arity: 2 })
    );

    let e = Var::edge("e");
    let stray = Var::edge("stray");
    assert_eq!(
        And::make(
            &[vi.clone(), vj.clone()],
            &[QuantifiedVar::exist(&e), QuantifiedVar::exist(&stray)],
            vec![ve(&vi, &e), ev(&e, &vj)],
        ),
        Err(Error::DanglingQuantifier {
            var: "stray".into(),
            required: 2
        })
    );
}

fn four_hops_left_leaning() -> PathExpression {
    let v: Vec<Var> = (0..5).map(|i| Var::vertex(&format!("v{}", i))).collect();

    let two = And::make(
        &[v[0].clone(), v[2].clone()],
        &[QuantifiedVar::exist(&v[1])],
        vec![vev(&v[0], &v[1]), vev(&v[1], &v[2])],
    )
    .expect("ok");
    let three = And::make(
        &[v[0].clone(), v[3].clone()],
        &[QuantifiedVar::exist(&v[2])],
        vec![two, vev(&v[2], &v[3])],
    )
    .expect("ok");

    And::make(
        &[v[0].clone(), v[4].clone()],
        &[QuantifiedVar::exist(&v[3])],
        vec![three, vev(&v[3], &v[4])],
    )
    .expect("ok")
}

fn four_hops_balanced() -> PathExpression {
    let w: Vec<Var> = (0..5).map(|i| Var::vertex(&format!("w{}", i))).collect();

    let left = And::make(
        &[w[0].clone(), w[2].clone()],
        &[QuantifiedVar::exist(&w[1])],
        vec![vev(&w[0], &w[1]), vev(&w[1], &w[2])],
    )
    .expect("ok");
    let right = And::make(
        &[w[2].clone(), w[4].clone()],
        &[QuantifiedVar::exist(&w[3])],
        vec![vev(&w[2], &w[3]), vev(&w[3], &w[4])],
    )
    .expect("ok");

    And::make(
        &[w[0].clone(), w[4].clone()],
        &[QuantifiedVar::exist(&w[2])],
        vec![left, right],
    )
    .expect("ok")
}

#[test]
fn composition_is_associative() {
    let left = four_hops_left_leaning();
    let balanced = four_hops_balanced();

    assert_eq!(left, balanced);
    assert_eq!(left.cmp(&balanced), std::cmp::Ordering::Equal);

    // Three hops are a different relation.
    let v: Vec<Var> = (0..4).map(|i| Var::vertex(&format!("x{}", i))).collect();
    let three = And::make(
        &[v[0].clone(), v[3].clone()],
        &[QuantifiedVar::exist(&v[1]), QuantifiedVar::exist(&v[2])],
        vec![vev(&v[0], &v[1]), vev(&v[1], &v[2]), vev(&v[2], &v[3])],
    )
    .expect("ok");
    assert_ne!(left, three);
}

#[test]
fn alpha_invariance_through_nesting() {
    let expr = four_hops_left_leaning();
    let p = Var::vertex("p");
    let q = Var::vertex("q");

    let renamed = expr.apply(&[p.clone(), q.clone()]).expect("ok");
    assert_eq!(renamed, expr);
    assert_eq!(expr, renamed);
    assert_eq!(renamed.endpoints(), &[p.clone(), q.clone()]);

    let again = renamed
        .apply(&[Var::vertex("r"), Var::vertex("s")])
        .expect("ok");
    assert_eq!(again, expr);

    // Renamed expressions share nothing with the original: binding one
    // leaves the other alone.
    let m = mesh("");
    let bound = renamed
        .bind(&[m.vertices.clone(), m.vertices.clone()])
        .expect("ok");
    assert!(!expr.endpoint(0).expect("ok").is_bound());
    assert_ne!(bound, expr);
    assert_eq!(
        bound,
        expr.bind(&[m.vertices.clone(), m.vertices]).expect("ok")
    );
}

#[test]
fn apply_uses_expression_as_a_function() {
    let a = Var::vertex("a");
    let b = Var::vertex("b");
    let template = vev(&a, &b);

    // Vertices two hops apart, through the template.
    let x = Var::vertex("x");
    let y = Var::vertex("y");
    let z = Var::vertex("z");
    let two_hops = And::make(
        &[x.clone(), z.clone()],
        &[QuantifiedVar::exist(&y)],
        vec![
            template.apply(&[x.clone(), y.clone()]).expect("ok"),
            template.apply(&[y.clone(), z.clone()]).expect("ok"),
        ],
    )
    .expect("ok");

    assert_eq!(two_hops.to_string().matches("exist e").count(), 2);
    assert_eq!(
        two_hops.to_string(),
        "(x, z) | exist y | ((x, y) | exist e | ve(x, e) and ev(e, y)) \
         and ((y, z) | exist e | ve(y, e) and ev(e, z))"
    );
}
