//! Property tests over randomly generated chains of hops: equality is
//! alpha-equivalence, agrees with the total order, and ignores how
//! conjunctions are nested.
use path_expressions::ground::Set;
use path_expressions::{And, Link, LinkKind, Or, PathExpression, QuantifiedVar, Var};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const MAX_HOPS: usize = 4;

/// One step from a vertex to the next.
#[derive(Clone, Copy, Debug)]
enum Hop {
    /// The two vertices share an edge.
    Adjacent,
    /// The next vertex is on the edge of the previous one, in either
    /// direction.
    Either,
    /// The first vertex's edge, then any vertex on it.
    Through,
}

fn hop_strategy() -> impl Strategy<Value = Hop> {
    prop_oneof![Just(Hop::Adjacent), Just(Hop::Either), Just(Hop::Through)]
}

fn hops_strategy() -> impl Strategy<Value = Vec<Hop>> {
    prop::collection::vec(hop_strategy(), 1..=MAX_HOPS)
}

fn vev(a: &Var, b: &Var) -> PathExpression {
    let e = Var::edge("e");

    And::make(
        &[a.clone(), b.clone()],
        &[QuantifiedVar::exist(&e)],
        vec![
            Link::make(a, &e, LinkKind::VertexToEdge).expect("ok"),
            Link::make(&e, b, LinkKind::EdgeToVertex).expect("ok"),
        ],
    )
    .expect("ok")
}

fn hop(kind: Hop, a: &Var, b: &Var) -> PathExpression {
    match kind {
        Hop::Adjacent => vev(a, b),
        Hop::Either => Or::make(&[a.clone(), b.clone()], &[], vec![vev(a, b), vev(b, a)])
            .expect("ok"),
        Hop::Through => {
            let e = Var::edge("f");
            let w = Var::vertex("w");
            And::make(
                &[a.clone(), b.clone()],
                &[QuantifiedVar::exist(&e), QuantifiedVar::exist(&w)],
                vec![
                    Link::make(a, &e, LinkKind::VertexToEdge).expect("ok"),
                    Link::make(&e, &w, LinkKind::EdgeToVertex).expect("ok"),
                    vev(&w, b),
                ],
            )
            .expect("ok")
        }
    }
}

fn fresh_vertices(prefix: &str, count: usize) -> Vec<Var> {
    (0..count)
        .map(|i| Var::vertex(&format!("{}{}", prefix, i)))
        .collect()
}

/// `(((h0 . h1) . h2) . h3)`
fn left_leaning(hops: &[Hop], vars: &[Var]) -> PathExpression {
    let mut acc = hop(hops[0], &vars[0], &vars[1]);

    for i in 1..hops.len() {
        acc = And::make(
            &[vars[0].clone(), vars[i + 1].clone()],
            &[QuantifiedVar::exist(&vars[i])],
            vec![acc, hop(hops[i], &vars[i], &vars[i + 1])],
        )
        .expect("ok");
    }

    acc
}

/// `((h0 . h1) . (h2 . h3))`
fn balanced(hops: &[Hop], vars: &[Var]) -> PathExpression {
    if hops.len() == 1 {
        return hop(hops[0], &vars[0], &vars[1]);
    }

    let mid = hops.len() / 2;
    let left = balanced(&hops[..mid], &vars[..=mid]);
    let right = balanced(&hops[mid..], &vars[mid..]);

    And::make(
        &[vars[0].clone(), vars[vars.len() - 1].clone()],
        &[QuantifiedVar::exist(&vars[mid])],
        vec![left, right],
    )
    .expect("ok")
}

/// `(h0 . h1 . h2 . h3)`, in a single conjunction.
fn flat(hops: &[Hop], vars: &[Var]) -> PathExpression {
    if hops.len() == 1 {
        return hop(hops[0], &vars[0], &vars[1]);
    }

    let quantified: Vec<QuantifiedVar> = vars[1..hops.len()]
        .iter()
        .map(QuantifiedVar::exist)
        .collect();
    let operands = hops
        .iter()
        .enumerate()
        .map(|(i, kind)| hop(*kind, &vars[i], &vars[i + 1]))
        .collect();

    And::make(
        &[vars[0].clone(), vars[hops.len()].clone()],
        &quantified,
        operands,
    )
    .expect("ok")
}

fn hash_of(expr: &PathExpression) -> u64 {
    let mut hasher = DefaultHasher::new();
    expr.hash(&mut hasher);
    hasher.finish()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn nesting_does_not_matter(hops in hops_strategy()) {
        let left = left_leaning(&hops, &fresh_vertices("l", hops.len() + 1));
        let right = balanced(&hops, &fresh_vertices("b", hops.len() + 1));
        let wide = flat(&hops, &fresh_vertices("f", hops.len() + 1));

        prop_assert_eq!(&left, &right);
        prop_assert_eq!(&left, &wide);
        prop_assert_eq!(hash_of(&left), hash_of(&right));
    }

    #[test]
    fn alpha_invariance(hops in hops_strategy()) {
        let expr = left_leaning(&hops, &fresh_vertices("v", hops.len() + 1));
        let renamed = expr
            .apply(&[Var::vertex("p"), Var::vertex("q")])
            .expect("ok");

        prop_assert_eq!(&renamed, &expr);
        prop_assert_eq!(&expr, &renamed);
        prop_assert_eq!(renamed.cmp(&expr), Ordering::Equal);
        prop_assert_eq!(hash_of(&renamed), hash_of(&expr));
    }

    #[test]
    fn equality_agrees_with_order(first in hops_strategy(), second in hops_strategy()) {
        let a = flat(&first, &fresh_vertices("a", first.len() + 1));
        let b = flat(&second, &fresh_vertices("b", second.len() + 1));

        prop_assert_eq!(a == b, a.cmp(&b) == Ordering::Equal);
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        if a == b {
            prop_assert_eq!(hash_of(&a), hash_of(&b));
        }
    }

    #[test]
    fn binding_monotonicity(hops in hops_strategy()) {
        let vertices = Set::vertices("V", 4);
        let others = Set::vertices("U", 4);

        let left = left_leaning(&hops, &fresh_vertices("l", hops.len() + 1));
        let right = balanced(&hops, &fresh_vertices("b", hops.len() + 1));

        let bound_left = left.bind(&[vertices.clone(), vertices.clone()]).expect("ok");
        let bound_right = right.bind(&[vertices.clone(), vertices.clone()]).expect("ok");
        prop_assert_eq!(&bound_left, &bound_right);
        prop_assert_ne!(&bound_left, &left);

        let mixed = right.bind(&[vertices, others]).expect("ok");
        prop_assert_ne!(&bound_left, &mixed);
    }
}
