//! Patterns turn raw `[edge, endpoint]` incidence facts into tuples
//! indexed by variables.
use crate::algebra::Var;
use crate::ground::Tuple;
use crate::Error;

/// A pattern names the edge and endpoint columns of incidence facts.
/// Matching a fact yields a tuple with one element per variable, sorted
/// by variable.
#[derive(Clone, Debug)]
pub struct Pattern {
    output: [Var; 2],
    /// Whether the endpoint variable sorts before the edge variable.
    swap: bool,
}

impl Pattern {
    /// Constructs a new pattern that binds the first column of facts
    /// to `edge` and the second to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DuplicateVariable)` if `edge == endpoint`.
    pub fn new(edge: &Var, endpoint: &Var) -> Result<Self, Error> {
        if edge == endpoint {
            return Err(Error::DuplicateVariable {
                var: edge.name().into(),
            });
        }

        let swap = endpoint < edge;
        let output = if swap {
            [endpoint.clone(), edge.clone()]
        } else {
            [edge.clone(), endpoint.clone()]
        };

        Ok(Pattern { output, swap })
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn output(&self) -> &[Var] {
        &self.output
    }

    /// Returns the fact's elements in output order, or `None` if `fact`
    /// is not a pair.
    #[must_use]
    pub fn try_match(&self, fact: &Tuple) -> Option<Tuple> {
        match *fact.elements() {
            [edge, endpoint] if self.swap => Some(Tuple::from_slice(&[endpoint, edge])),
            [edge, endpoint] => Some(Tuple::from_slice(&[edge, endpoint])),
            _ => None,
        }
    }
}

#[cfg(test)]
fn tuple(xs: &[u32]) -> Tuple {
    xs.iter()
        .map(|x| crate::ground::Element::new(*x))
        .collect::<Vec<_>>()
        .into()
}

#[test]
fn test_pattern_sorts_output() {
    let v = Var::vertex("v");
    let e = Var::edge("e");

    // `v` was created first, so it sorts first.
    let pattern = Pattern::new(&e, &v).expect("ok");
    assert_eq!(pattern.output(), &[v.clone(), e.clone()]);
    assert_eq!(pattern.try_match(&tuple(&[7, 1])), Some(tuple(&[1, 7])));

    let f = Var::edge("f");
    let pattern = Pattern::new(&f, &v).expect("ok");
    assert_eq!(pattern.output(), &[v, f]);

    let w = Var::vertex("w");
    let pattern = Pattern::new(&e, &w).expect("ok");
    assert_eq!(pattern.output(), &[e, w]);
    assert_eq!(pattern.try_match(&tuple(&[7, 1])), Some(tuple(&[7, 1])));
}

#[test]
fn test_pattern_mismatch() {
    let v = Var::vertex("v");
    let e = Var::edge("e");
    let pattern = Pattern::new(&e, &v).expect("ok");

    assert_eq!(pattern.try_match(&tuple(&[2, 3, 4])), None);
    assert_eq!(pattern.try_match(&tuple(&[2])), None);
    assert!(matches!(
        Pattern::new(&e, &e),
        Err(Error::DuplicateVariable { .. })
    ));
}
