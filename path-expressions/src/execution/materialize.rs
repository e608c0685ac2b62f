//! Materialising a bound path expression runs its plan to completion
//! on a single timely worker, and keeps the resulting tuples around
//! for the questions lowering asks: does the relation hold between
//! these elements, what are the neighbours of this one, and where are
//! the non-zeros of the corresponding sparse matrix.
use super::{default_injector, lower_plan, TupleSink};
use crate::algebra::{PathExpression, Var};
use crate::ground::{Element, ElementKind, Tuple};
use crate::matching::plan_path_expression;
use crate::Error;
use std::collections::BTreeSet;

/// Evaluates `expr` and returns its tuples, in endpoint order.
///
/// # Errors
///
/// Returns `Err(Unbound)` if some variable of `expr` is not bound to a
/// set, and otherwise forwards planning errors.
pub fn materialize(expr: &PathExpression) -> Result<Relation, Error> {
    let plan = plan_path_expression(expr)?;
    let sink = TupleSink::new(plan.result().to_vec());
    let writer = sink.writer();

    timely::execute::example(move |scope| -> Result<(), Error> {
        let tuples = lower_plan(scope, &mut default_injector, &plan)?;
        writer.attach(&tuples)
    })?;

    let relation = Relation {
        endpoints: expr.endpoints().to_vec(),
        tuples: sink.values(),
    };

    tracing::debug!(%expr, tuples = relation.len(), "materialized path expression");
    Ok(relation)
}

/// The tuples of a bound path expression, sorted lexicographically.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Relation {
    endpoints: Vec<Var>,
    tuples: BTreeSet<Tuple>,
}

impl Relation {
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn endpoints(&self) -> &[Var] {
        &self.endpoints
    }

    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.endpoints.len()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// Returns whether the relation holds between `elements`, listed
    /// in endpoint order.
    #[must_use]
    pub fn holds(&self, elements: &[Element]) -> bool {
        self.tuples.contains(&Tuple::from_slice(elements))
    }

    /// Returns the elements related to `element`, for a binary
    /// relation, in increasing order.
    ///
    /// # Errors
    ///
    /// Returns `Err(ShapeMismatch)` unless the relation is binary.
    pub fn neighbors(&self, element: Element) -> Result<Vec<Element>, Error> {
        self.check_binary()?;

        // `[element]` sorts right before every `[element, _]`.
        Ok(self
            .tuples
            .range(Tuple::from_slice(&[element])..)
            .take_while(|tuple| tuple.elements()[0] == element)
            .map(|tuple| tuple.elements()[1])
            .collect())
    }

    /// Returns the compressed sparse row structure of a binary
    /// relation: one row per element of the first endpoint's set, with
    /// the related elements of the second endpoint's set as columns.
    ///
    /// # Errors
    ///
    /// Returns `Err(ShapeMismatch)` unless the relation is binary,
    /// `Err(Unbound)` if the first endpoint is not bound, and
    /// `Err(InvalidIncidence)` if a tuple's row is not an element of
    /// that set.
    pub fn sparsity_pattern(&self) -> Result<SparsityPattern, Error> {
        self.check_binary()?;

        let set = self.endpoints[0].set().ok_or_else(|| Error::Unbound {
            var: self.endpoints[0].name().into(),
        })?;
        let rows = set.cardinality();

        let mut row_offsets = Vec::with_capacity(rows + 1);
        let mut columns = Vec::with_capacity(self.tuples.len());
        row_offsets.push(0);

        // Tuples are sorted by row, then by column.
        let mut tuples = self.tuples.iter().peekable();
        for row in 0..rows {
            while let Some(tuple) = tuples.peek() {
                if tuple.elements()[0].index() != row {
                    break;
                }

                columns.push(tuple.elements()[1]);
                tuples.next();
            }

            row_offsets.push(columns.len());
        }

        if let Some(tuple) = tuples.peek() {
            return Err(Error::InvalidIncidence {
                set: set.name().into(),
                reason: format!("row {} out of range", tuple.elements()[0].index()),
            });
        }

        Ok(SparsityPattern {
            row_offsets,
            columns,
        })
    }

    fn check_binary(&self) -> Result<(), Error> {
        if self.arity() != 2 {
            return Err(Error::ShapeMismatch {
                expected: vec![ElementKind::Generic, ElementKind::Generic],
                found: self.endpoints.iter().map(Var::kind).collect(),
            });
        }

        Ok(())
    }
}

/// Row offsets and column indices of a sparse matrix, in compressed
/// sparse row format: the columns of row `i` are
/// `columns[row_offsets[i]..row_offsets[i + 1]]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SparsityPattern {
    row_offsets: Vec<usize>,
    columns: Vec<Element>,
}

impl SparsityPattern {
    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn columns(&self) -> &[Element] {
        &self.columns
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Number of non-zero entries.
    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.columns.len()
    }

    /// Returns the columns of row `index`, or `None` past the last row.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[Element]> {
        let begin = *self.row_offsets.get(index)?;
        let end = *self.row_offsets.get(index + 1)?;
        Some(&self.columns[begin..end])
    }
}

#[cfg(test)]
use crate::algebra::{And, Link, LinkKind, QuantifiedVar};
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

#[cfg(test)]
fn elements(xs: &[u32]) -> Vec<Element> {
    xs.iter().map(|x| Element::new(*x)).collect()
}

#[test]
fn test_materialize_link() {
    let (vertices, edges) = mesh();
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");

    let link = Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok");
    let relation = materialize(&link).expect("ok");
    assert_eq!(relation.arity(), 2);
    assert_eq!(relation.len(), 4);
    assert!(relation.holds(&elements(&[1, 0])));
    assert!(relation.holds(&elements(&[1, 1])));
    assert!(!relation.holds(&elements(&[0, 1])));
    assert_eq!(relation.neighbors(Element::new(1)), Ok(elements(&[0, 1])));
    assert_eq!(relation.neighbors(Element::new(2)), Ok(elements(&[1])));
}

#[test]
fn test_materialize_vev() {
    let (vertices, edges) = mesh();
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

    assert!(matches!(materialize(&expr), Err(Error::Unbound { .. })));

    let mut binding = crate::algebra::Binding::new();
    binding
        .insert(expr.quantified_vars()[0].var(), &edges)
        .expect("ok");
    let bound = expr.bind_vars(&binding).expect("ok");
    assert_eq!(bound.endpoint(0).expect("ok").set(), Some(&vertices));

    let relation = materialize(&bound).expect("ok");
    assert_eq!(relation.len(), 7);
    assert_eq!(relation.neighbors(Element::new(0)), Ok(elements(&[0, 1])));
    assert_eq!(
        relation.neighbors(Element::new(1)),
        Ok(elements(&[0, 1, 2]))
    );

    let pattern = relation.sparsity_pattern().expect("ok");
    assert_eq!(pattern.rows(), 3);
    assert_eq!(pattern.nnz(), 7);
    assert_eq!(pattern.row_offsets(), &[0, 2, 5, 7]);
    assert_eq!(pattern.columns(), &elements(&[0, 1, 0, 1, 2, 1, 2])[..]);
    assert_eq!(pattern.row(2), Some(&elements(&[1, 2])[..]));
    assert_eq!(pattern.row(3), None);
}

#[test]
fn test_sparsity_pattern_empty_rows() {
    let vertices = Set::vertices("V", 4);
    let edges =
        Set::edges("E", &[vertices.clone(), vertices.clone()], vec![vec![2, 3]]).expect("ok");
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");

    let link = Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok");
    let relation = materialize(&link).expect("ok");
    let pattern = relation.sparsity_pattern().expect("ok");

    assert_eq!(pattern.row_offsets(), &[0, 0, 0, 1, 2]);
    assert_eq!(pattern.row(0), Some(&[][..]));
    assert_eq!(relation.neighbors(Element::new(0)), Ok(Vec::new()));
}

#[test]
fn test_sparsity_pattern_row_out_of_range() {
    let vertices = Set::vertices("V", 2);
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let w = Var::vertex("w").bind(&vertices).expect("ok");

    let relation = Relation {
        endpoints: vec![v, w],
        tuples: [Tuple::from_slice(&elements(&[0, 1])), Tuple::from_slice(&elements(&[5, 0]))]
            .iter()
            .cloned()
            .collect(),
    };

    assert_eq!(relation.neighbors(Element::new(0)), Ok(elements(&[1])));
    assert!(matches!(
        relation.sparsity_pattern(),
        Err(Error::InvalidIncidence { .. })
    ));
}
