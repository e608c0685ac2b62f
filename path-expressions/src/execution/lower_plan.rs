//! Lowering a plan converts a [Plan](crate::matching::Plan) to a
//! differential dataflow graph.
use super::TupleCollection;
use crate::ground::{Set, Tuple};
use crate::matching::{MultiProjection, Pattern, Plan, PlanOp, Projection, ScanOp};
use crate::Error;
use differential_dataflow::collection::concatenate;
use differential_dataflow::input::Input;
use differential_dataflow::lattice::Lattice;
use differential_dataflow::operators::reduce::Threshold as _;
use differential_dataflow::operators::Join as _;
use differential_dataflow::Collection;
use timely::dataflow::Scope;

/// Returns a collection for `scope`, initialised with `values`.
///
/// This is the injector `materialize` uses: the input handle is
/// dropped immediately, so the collection never changes.
pub fn default_injector<G: Input>(scope: &mut G, values: Vec<Tuple>) -> Collection<G, Tuple>
where
    G::Timestamp: Lattice,
{
    scope.new_collection_from(values).1
}

/// Recursively converts a plan to a differential dataflow graph.
///
/// The `injector` must be a callable that accepts `scope` and vector
/// of values, and returns a collection for `scope` initialised with
/// these values.  This injector is called once per scan or domain
/// node.
///
/// # Errors
///
/// Returns `Err` when a node's variables can't be wired to its
/// children's, which only happens for plans built by hand.
pub fn lower_plan<G: Scope, Injector>(
    scope: &mut G,
    injector: &mut Injector,
    plan: &Plan,
) -> Result<TupleCollection<G>, Error>
where
    G::Timestamp: Lattice + Ord,
    Injector: FnMut(&mut G, Vec<Tuple>) -> Collection<G, Tuple>,
{
    let planned_shape = plan.result();
    let result = match plan.op() {
        PlanOp::Scan(scan) => lower_scan(scope, injector, scan),
        PlanOp::Domain(set) => lower_domain(scope, injector, plan, set),
        PlanOp::Join(left, right) => lower_join(scope, injector, plan, left, right),
        PlanOp::Project(child) => lower_project(scope, injector, plan, child),
        PlanOp::Union(children) => lower_union(scope, injector, plan, children),
    }?;

    // If the result's shape does not match the plan, something went
    // horribly wrong.
    assert_eq!(planned_shape, &result.shape[..]);
    Ok(result)
}

type PlanResult<G> = Result<TupleCollection<G>, Error>;

/// A scan matches every incidence fact of its source against the
/// scan's pattern.
fn lower_scan<G: Scope, Injector>(
    scope: &mut G,
    injector: &mut Injector,
    scan: &ScanOp,
) -> PlanResult<G>
where
    G::Timestamp: Lattice + Ord,
    Injector: FnMut(&mut G, Vec<Tuple>) -> Collection<G, Tuple>,
{
    let pattern = Pattern::new(&scan.pattern[0], &scan.pattern[1])?;
    let shape = pattern.output().to_vec();
    let facts = injector(scope, scan.source.facts());

    tracing::trace!(
        edges = scan.source.edges().name(),
        endpoints = scan.source.endpoints().name(),
        "lowering scan"
    );
    Ok(TupleCollection::new(
        shape,
        facts.flat_map(move |fact| pattern.try_match(&fact)),
    ))
}

/// A domain node yields one unary tuple per element of the set.
fn lower_domain<G: Scope, Injector>(
    scope: &mut G,
    injector: &mut Injector,
    plan: &Plan,
    set: &Set,
) -> PlanResult<G>
where
    G::Timestamp: Lattice + Ord,
    Injector: FnMut(&mut G, Vec<Tuple>) -> Collection<G, Tuple>,
{
    let elements = set
        .elements()
        .map(|element| Tuple::from_slice(&[element]))
        .collect();

    Ok(TupleCollection::new(
        plan.result().to_vec(),
        injector(scope, elements),
    ))
}

/// Joins the two children on their common variables.  When there is
/// none, the join key is the empty tuple, and we get the cross
/// product.
fn lower_join<G: Scope, Injector>(
    scope: &mut G,
    injector: &mut Injector,
    plan: &Plan,
    left: &Plan,
    right: &Plan,
) -> PlanResult<G>
where
    G::Timestamp: Lattice + Ord,
    Injector: FnMut(&mut G, Vec<Tuple>) -> Collection<G, Tuple>,
{
    let left = lower_plan(scope, injector, left)?;
    let right = lower_plan(scope, injector, right)?;

    let key: Vec<_> = left
        .shape
        .iter()
        .filter(|var| right.shape.contains(var))
        .cloned()
        .collect();
    let left_key = Projection::new(&left.shape, &key)?;
    let right_key = Projection::new(&right.shape, &key)?;
    let merge = MultiProjection::new(
        &[
            left.shape.clone().into_boxed_slice(),
            right.shape.clone().into_boxed_slice(),
        ],
        plan.result(),
    )?;

    let left_keyed = left
        .container
        .map(move |tuple| (left_key.apply(&tuple), tuple));
    let right_keyed = right
        .container
        .map(move |tuple| (right_key.apply(&tuple), tuple));

    Ok(TupleCollection::new(
        plan.result().to_vec(),
        left_keyed.join_map(&right_keyed, move |_key, x, y| merge.from_pair(x, y)),
    ))
}

/// Projections may introduce duplicates, which we remove right away.
fn lower_project<G: Scope, Injector>(
    scope: &mut G,
    injector: &mut Injector,
    plan: &Plan,
    child: &Plan,
) -> PlanResult<G>
where
    G::Timestamp: Lattice + Ord,
    Injector: FnMut(&mut G, Vec<Tuple>) -> Collection<G, Tuple>,
{
    let child = lower_plan(scope, injector, child)?;
    let projection = Projection::new(&child.shape, plan.result())?;

    Ok(TupleCollection::new(
        plan.result().to_vec(),
        child
            .container
            .map(move |tuple| projection.apply(&tuple))
            .distinct(),
    ))
}

fn lower_union<G: Scope, Injector>(
    scope: &mut G,
    injector: &mut Injector,
    plan: &Plan,
    children: &[Plan],
) -> PlanResult<G>
where
    G::Timestamp: Lattice + Ord,
    Injector: FnMut(&mut G, Vec<Tuple>) -> Collection<G, Tuple>,
{
    let mut to_merge = Vec::with_capacity(children.len());
    for child in children.iter() {
        let lowered = lower_plan(scope, injector, child)?;
        if lowered.shape != plan.result() {
            // `Plan::union` checks for this.
            #[cfg(not(tarpaulin_include))]
            return Err(Error::ShapeMismatch {
                expected: plan.result().iter().map(|var| var.kind()).collect(),
                found: lowered.shape.iter().map(|var| var.kind()).collect(),
            });
        }

        to_merge.push(lowered.container);
    }

    Ok(TupleCollection::new(
        plan.result().to_vec(),
        concatenate(scope, to_merge).distinct(),
    ))
}

#[cfg(test)]
use crate::algebra::Var;
#[cfg(test)]
use crate::ground::Element;
#[cfg(test)]
use crate::matching::Source;

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

#[cfg(test)]
fn tuple(xs: &[u32]) -> Tuple {
    xs.iter().map(|x| Element::new(*x)).collect::<Vec<_>>().into()
}

/// Lowers `plan` in a fresh dataflow, and returns the set of tuples it
/// yields.
#[cfg(test)]
fn run(plan: Plan) -> std::collections::BTreeSet<Tuple> {
    use super::TupleSink;

    let sink = TupleSink::new(plan.result().to_vec());
    let writer = sink.writer();

    timely::execute::example(move |scope| {
        let tuples = lower_plan(scope, &mut default_injector, &plan).expect("ok");
        writer.attach(&tuples).expect("ok");
    });

    sink.values()
}

#[test]
fn test_scan_and_domain() {
    let (vertices, edges) = mesh();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");
    let source = Source::new(&edges, &vertices).expect("ok");

    // Scans yield sorted variables: [v, e].
    let scan = Plan::scan(source, &[e, v.clone()]).expect("ok");
    assert_eq!(
        run(scan),
        [tuple(&[0, 0]), tuple(&[1, 0]), tuple(&[1, 1]), tuple(&[2, 1])]
            .iter()
            .cloned()
            .collect()
    );

    assert_eq!(
        run(Plan::domain(&v).expect("ok")),
        [tuple(&[0]), tuple(&[1]), tuple(&[2])]
            .iter()
            .cloned()
            .collect()
    );
}

#[test]
fn test_join_project() {
    let (vertices, edges) = mesh();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let w = Var::vertex("w").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");
    let source = Source::new(&edges, &vertices).expect("ok");

    let joined = Plan::natural_join(
        Plan::scan(source.clone(), &[e.clone(), v.clone()]).expect("ok"),
        Plan::scan(source, &[e, w.clone()]).expect("ok"),
    );
    let plan = Plan::project(joined, &[v, w]).expect("ok");

    assert_eq!(
        run(plan),
        [
            tuple(&[0, 0]),
            tuple(&[0, 1]),
            tuple(&[1, 0]),
            tuple(&[1, 1]),
            tuple(&[1, 2]),
            tuple(&[2, 1]),
            tuple(&[2, 2])
        ]
        .iter()
        .cloned()
        .collect()
    );
}

#[test]
fn test_union_cross_product() {
    let vertices = Set::vertices("V", 2);
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let w = Var::vertex("w").bind(&vertices).expect("ok");

    let cross = || {
        Plan::natural_join(
            Plan::domain(&v).expect("ok"),
            Plan::domain(&w).expect("ok"),
        )
    };
    let plan = Plan::union(vec![cross(), cross()]).expect("ok");

    assert_eq!(
        run(plan),
        [
            tuple(&[0, 0]),
            tuple(&[0, 1]),
            tuple(&[1, 0]),
            tuple(&[1, 1])
        ]
        .iter()
        .cloned()
        .collect()
    );
}
