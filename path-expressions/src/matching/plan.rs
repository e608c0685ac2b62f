//! Given a bound path expression, how do we want to scan incidence
//! facts, join them, and project away variables that aren't needed
//! now that joins are done?
//!
//! There is no universally optimal answer to this question,
//! especially once we stop assuming binary joins.  Let's start with
//! operators that are trivial to express in Differential Dataflow,
//! and a criminally trivial plan.
use super::Pattern;
use crate::algebra::Var;
use crate::ground::{Set, Tuple};
use crate::Error;

/// A source is the incidence between an edge set and one of its
/// endpoint sets, read as `[edge, endpoint]` facts.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Source {
    edges: Set,
    endpoints: Set,
}

impl Source {
    /// Returns the source for the incidence between `edges` and
    /// `endpoints`.
    ///
    /// # Errors
    ///
    /// Returns `Err(NotIncident)` if no endpoint position of `edges`
    /// lives in `endpoints`.
    pub fn new(edges: &Set, endpoints: &Set) -> Result<Self, Error> {
        if !edges.has_endpoints_in(endpoints) {
            return Err(Error::NotIncident {
                edges: edges.name().into(),
                endpoints: endpoints.name().into(),
            });
        }

        Ok(Source {
            edges: edges.clone(),
            endpoints: endpoints.clone(),
        })
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn edges(&self) -> &Set {
        &self.edges
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn endpoints(&self) -> &Set {
        &self.endpoints
    }

    /// Returns one `[edge, endpoint]` fact for each endpoint of each
    /// edge that lives in `self.endpoints()`, without duplicates.
    #[must_use]
    pub fn facts(&self) -> Vec<Tuple> {
        let positions: Vec<usize> = self
            .edges
            .endpoints()
            .iter()
            .enumerate()
            .filter(|(_, set)| **set == self.endpoints)
            .map(|(position, _)| position)
            .collect();

        let mut facts = Vec::with_capacity(self.edges.cardinality() * positions.len());
        for (edge, row) in self.edges.elements().zip(self.edges.incidence().iter()) {
            for position in positions.iter().copied() {
                facts.push(Tuple::from_slice(&[edge, row[position]]));
            }
        }

        facts.sort();
        facts.dedup();
        facts
    }
}

/// A Plan represents (a tree of) steps to perform in order to find
/// the tuples of a bound relation.  The toplevel (root) operator for
/// a path expression should yield exactly its endpoints.
///
/// A Plan node always yields tuples of `Element`s matching its
/// `result` list of variables.
#[derive(Debug, Hash, Eq, PartialEq)]
pub struct Plan {
    /// Executing this plan yields tuples of `Element`s with this
    /// shape.
    result: Vec<Var>,
    op: PlanOp,
}

/// Scans the facts of `source` and matches them against `pattern`.
#[derive(Debug, Hash, Eq, PartialEq)]
pub struct ScanOp {
    pub source: Source,
    /// The `[edge, endpoint]` variables.
    pub pattern: [Var; 2],
}

#[derive(Debug, Hash, Eq, PartialEq)]
pub enum PlanOp {
    /// Yields the incidence facts of a source that match a pattern.
    Scan(ScanOp),
    /// Yields every element of a set, as unary tuples.
    Domain(Set),
    /// Natural join on the variables common to both subplans.
    Join(Box<Plan>, Box<Plan>),
    /// Drops or reorders variables, and removes duplicates.
    Project(Box<Plan>),
    /// Deduplicated union of plans that all yield the same shape.
    Union(Vec<Plan>),
}

impl Plan {
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn result(&self) -> &[Var] {
        &self.result
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn op(&self) -> &PlanOp {
        &self.op
    }

    /// Constructs a plan that matches the facts in `source` against
    /// `pattern`.  The result is the pattern's (sorted) variables.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the pattern is not a `[edge, endpoint]`
    /// pair.
    pub fn scan(source: Source, pattern: &[Var]) -> Result<Self, Error> {
        if pattern.len() != 2 {
            return Err(Error::ShapeMismatch {
                expected: vec![source.edges.kind(), source.endpoints.kind()],
                found: pattern.iter().map(Var::kind).collect(),
            });
        }

        let result = Pattern::new(&pattern[0], &pattern[1])?.output().to_vec();
        Ok(Plan {
            result,
            op: PlanOp::Scan(ScanOp {
                source,
                pattern: [pattern[0].clone(), pattern[1].clone()],
            }),
        })
    }

    /// Constructs a plan that yields every element of the set `var`
    /// is bound to.
    ///
    /// # Errors
    ///
    /// Returns `Err(Unbound)` if `var` isn't bound.
    pub fn domain(var: &Var) -> Result<Self, Error> {
        let set = var.set().ok_or_else(|| Error::Unbound {
            var: var.name().into(),
        })?;

        Ok(Plan {
            result: vec![var.clone()],
            op: PlanOp::Domain(set.clone()),
        })
    }

    /// Constructs the natural join of `left` and `right`.  The result
    /// lists `left`'s variables, followed by the ones only found in
    /// `right`.
    #[must_use]
    pub fn natural_join(left: Plan, right: Plan) -> Self {
        let mut result = left.result.clone();
        for var in right.result.iter() {
            if !result.contains(var) {
                result.push(var.clone());
            }
        }

        Plan {
            result,
            op: PlanOp::Join(Box::new(left), Box::new(right)),
        }
    }

    /// Constructs a plan that projects the result of `plan` to
    /// `vars`.  Returns `plan` itself when it already has that shape.
    ///
    /// # Errors
    ///
    /// Returns `Err(UnscopedVariable)` if `vars` mentions a variable
    /// absent from `plan`'s result.
    pub fn project(plan: Plan, vars: &[Var]) -> Result<Self, Error> {
        if plan.result == vars {
            return Ok(plan);
        }

        if let Some(missing) = vars.iter().find(|var| !plan.result.contains(var)) {
            return Err(Error::UnscopedVariable {
                var: missing.name().into(),
            });
        }

        Ok(Plan {
            result: vars.to_vec(),
            op: PlanOp::Project(Box::new(plan)),
        })
    }

    /// Constructs the union of `plans`.
    ///
    /// # Errors
    ///
    /// Returns `Err(EmptyComposition)` if there is no plan, and
    /// `Err(ShapeMismatch)` if the plans yield different variables.
    pub fn union(mut plans: Vec<Plan>) -> Result<Self, Error> {
        let first = match plans.first() {
            Some(plan) => plan.result.clone(),
            None => return Err(Error::EmptyComposition),
        };

        if let Some(other) = plans.iter().find(|plan| plan.result != first) {
            return Err(Error::ShapeMismatch {
                expected: first.iter().map(Var::kind).collect(),
                found: other.result.iter().map(Var::kind).collect(),
            });
        }

        if plans.len() == 1 {
            return Ok(plans.remove(0));
        }

        Ok(Plan {
            result: first,
            op: PlanOp::Union(plans),
        })
    }
}

#[cfg(test)]
fn mesh() -> (Set, Set) {
    let vertices = Set::vertices("V", 3);
    let edges = Set::edges(
        "E",
        &[vertices.clone(), vertices.clone()],
        vec![vec![0, 1], vec![1, 2], vec![2, 2]],
    )
    .expect("ok");

    (vertices, edges)
}

#[test]
fn test_source_facts() {
    use crate::ground::Element;

    let (vertices, edges) = mesh();
    let source = Source::new(&edges, &vertices).expect("ok");
    let pair = |e: u32, v: u32| Tuple::from_slice(&[Element::new(e), Element::new(v)]);

    // The self-loop only yields one fact.
    assert_eq!(
        source.facts(),
        vec![
            pair(0, 0),
            pair(0, 1),
            pair(1, 1),
            pair(1, 2),
            pair(2, 2)
        ]
    );

    assert!(matches!(
        Source::new(&edges, &Set::vertices("U", 1)),
        Err(Error::NotIncident { .. })
    ));
}

#[test]
fn test_plan_shapes() {
    let (vertices, edges) = mesh();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let w = Var::vertex("w").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");

    let source = Source::new(&edges, &vertices).expect("ok");
    let left = Plan::scan(source.clone(), &[e.clone(), v.clone()]).expect("ok");
    let right = Plan::scan(source, &[e.clone(), w.clone()]).expect("ok");

    let mut sorted = vec![e.clone(), v.clone()];
    sorted.sort();
    assert_eq!(left.result(), &sorted[..]);

    let joined = Plan::natural_join(left, right);
    assert_eq!(joined.result().len(), 3);
    assert_eq!(joined.result()[2], w);

    let projected = Plan::project(joined, &[w.clone(), v.clone()]).expect("ok");
    assert_eq!(projected.result(), &[w.clone(), v.clone()]);
    assert!(matches!(projected.op(), PlanOp::Project(_)));

    assert!(matches!(
        Plan::project(projected, &[e]),
        Err(Error::UnscopedVariable { .. })
    ));
}

#[test]
fn test_plan_domain_and_union() {
    let (vertices, _) = mesh();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let w = Var::vertex("w").bind(&vertices).expect("ok");

    assert!(matches!(
        Plan::domain(&Var::vertex("x")),
        Err(Error::Unbound { .. })
    ));

    let single = Plan::union(vec![Plan::domain(&v).expect("ok")]).expect("ok");
    assert!(matches!(single.op(), PlanOp::Domain(_)));

    let both = Plan::union(vec![
        Plan::domain(&v).expect("ok"),
        Plan::domain(&v).expect("ok"),
    ])
    .expect("ok");
    assert!(matches!(both.op(), PlanOp::Union(plans) if plans.len() == 2));

    assert!(matches!(
        Plan::union(vec![
            Plan::domain(&v).expect("ok"),
            Plan::domain(&w).expect("ok")
        ]),
        Err(Error::ShapeMismatch { .. })
    ));
    assert_eq!(Plan::union(Vec::new()), Err(Error::EmptyComposition));
}
