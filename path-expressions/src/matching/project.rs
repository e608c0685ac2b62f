//! As part of the join logic, we must restructure tuples by removing
//! or re-ordering variables, and applying the same transformation to
//! every tuple in a collection.
use crate::algebra::Var;
use crate::ground::{Element, Tuple};
use crate::Error;

fn unscoped(var: &Var) -> Error {
    Error::UnscopedVariable {
        var: var.name().into(),
    }
}

/// A Projection takes a single tuple (with shape `input`), and
/// returns an output of shape `output`.
pub struct Projection {
    input: Vec<Var>,
    output: Vec<Var>,
    fun: Box<dyn Fn(&Tuple) -> Tuple>,
}

impl Projection {
    /// Returns a Projection from `inp` into `out`.
    ///
    /// # Errors
    ///
    /// Returns `Err(UnscopedVariable)` if `out` refers to a variable
    /// absent from `inp`.
    pub fn new(inp: &[Var], out: &[Var]) -> Result<Projection, Error> {
        make_projection(inp, out)
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn input(&self) -> &[Var] {
        &self.input
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn output(&self) -> &[Var] {
        &self.output
    }

    #[inline]
    #[must_use]
    pub fn apply(&self, input: &Tuple) -> Tuple {
        (self.fun)(input)
    }
}

fn make_projection(inp: &[Var], out: &[Var]) -> Result<Projection, Error> {
    // The `indices` vector tells us where to find each output value
    // in the input tuple.  Store these indices as u8: we don't expect
    // very wide relations.
    let mut indices = Vec::<u8>::with_capacity(out.len());
    for needle in out.iter() {
        let index = inp
            .iter()
            .position(|haystack| haystack == needle)
            .ok_or_else(|| unscoped(needle))?;
        assert!(index <= u8::MAX as usize);
        indices.push(index as u8);
    }

    let expected_input_len = inp.len();
    let output_len = indices.len();
    let projector = move |tuple: &Tuple| {
        let elements = tuple.elements();
        let mut result = Vec::<Element>::with_capacity(output_len);

        assert_eq!(elements.len(), expected_input_len);
        for index in indices.iter().copied() {
            result.push(elements[index as usize]);
        }

        Tuple::from_vec(result)
    };

    Ok(Projection {
        input: inp.into(),
        output: out.into(),
        fun: Box::new(projector),
    })
}

/// A MultiProjection projects a single tuple from any number of
/// tuples.  This operation converts a pair of tuples into a single
/// one, after joining them on a common projected key.
pub struct MultiProjection {
    inputs: Vec<Box<[Var]>>,
    output: Vec<Var>,
    fun: Box<dyn Fn(&[&Tuple]) -> Tuple>,
}

impl MultiProjection {
    /// Returns a MultiProjection from `inp`s into `out`.
    ///
    /// The MultiProjection does not check that the input tuples match
    /// the shapes in `inp`; the caller is responsible for enforcing
    /// that relationship, e.g., by matching tuples with a join on
    /// common variables.
    ///
    /// # Errors
    ///
    /// Returns `Err(UnscopedVariable)` if `out` refers to a variable
    /// absent from all `inp`s.
    pub fn new(inp: &[Box<[Var]>], out: &[Var]) -> Result<MultiProjection, Error> {
        make_multi_projection(inp, out)
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn inputs(&self) -> &[Box<[Var]>] {
        &self.inputs
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn output(&self) -> &[Var] {
        &self.output
    }

    #[inline]
    #[must_use]
    pub fn apply(&self, input: &[&Tuple]) -> Tuple {
        (self.fun)(input)
    }

    #[inline]
    #[must_use]
    pub fn from_pair(&self, x: &Tuple, y: &Tuple) -> Tuple {
        self.apply(&[x, y])
    }
}

fn make_multi_projection(inp: &[Box<[Var]>], out: &[Var]) -> Result<MultiProjection, Error> {
    // Given an output variable, finds out which input and where in
    // that input the corresponding value may be found.
    let find_indices = |needle: &Var| {
        for (input_id, input) in inp.iter().enumerate() {
            if let Some(index) = input.iter().position(|haystack| haystack == needle) {
                return Ok((input_id, index));
            }
        }

        Err(unscoped(needle))
    };

    let mut indices = Vec::<(u8, u8)>::with_capacity(out.len());
    for needle in out.iter() {
        let (input_id, index) = find_indices(needle)?;
        assert!(input_id <= u8::MAX as usize);
        assert!(index <= u8::MAX as usize);
        indices.push((input_id as u8, index as u8));
    }

    let expected_input_len = inp.len();
    let output_len = indices.len();
    let projector = move |tuples: &[&Tuple]| {
        let mut result = Vec::<Element>::with_capacity(output_len);

        assert_eq!(tuples.len(), expected_input_len);
        for (input_id, index) in indices.iter().copied() {
            result.push(tuples[input_id as usize].elements()[index as usize]);
        }

        Tuple::from_vec(result)
    };

    Ok(MultiProjection {
        inputs: inp.into(),
        output: out.into(),
        fun: Box::new(projector),
    })
}

#[cfg(test)]
fn tuple(xs: &[u32]) -> Tuple {
    xs.iter().map(|x| Element::new(*x)).collect::<Vec<_>>().into()
}

#[test]
fn test_project_happy_path() {
    let x = Var::new("x");
    let y = Var::new("y");
    let z = Var::new("z");
    let input = vec![x, y.clone(), z.clone()];
    let output = vec![z, y];

    let projection = Projection::new(&input, &output).expect("ok");
    assert_eq!(projection.input(), &input[..]);
    assert_eq!(projection.output(), &output[..]);
    assert_eq!(projection.apply(&tuple(&[1, 2, 3])), tuple(&[3, 2]));

    // Apply the projection multiple times.
    assert_eq!(projection.apply(&tuple(&[2, 3, 4])), tuple(&[4, 3]));
}

#[test]
fn test_project_missing_variable() {
    let x = Var::new("x");
    let y = Var::new("y");
    let z = Var::new("z");

    assert_eq!(
        Projection::new(&[x, y.clone()], &[z, y]).err(),
        Some(Error::UnscopedVariable { var: "z".into() })
    );
}

#[test]
fn test_project_to_nothing() {
    let x = Var::new("x");
    let projection = Projection::new(&[x], &[]).expect("ok");

    assert_eq!(projection.apply(&tuple(&[5])), Tuple::default());
}

#[test]
fn test_multi_project_happy_path() {
    let x = Var::new("x");
    let y = Var::new("y");
    let z = Var::new("z");
    let inputs = vec![
        vec![x.clone(), y.clone()].into_boxed_slice(),
        vec![y.clone(), z.clone()].into_boxed_slice(),
    ];
    let output = vec![z, y, x];

    let projection = MultiProjection::new(&inputs, &output).expect("ok");
    assert_eq!(projection.inputs(), &inputs[..]);
    assert_eq!(projection.output(), &output[..]);

    assert_eq!(
        projection.apply(&[&tuple(&[1, 2]), &tuple(&[2, 3])]),
        tuple(&[3, 2, 1])
    );
    assert_eq!(
        projection.from_pair(&tuple(&[3, 2]), &tuple(&[2, 1])),
        tuple(&[1, 2, 3])
    );
}

#[test]
fn test_multi_project_missing_variable() {
    let x = Var::new("x");
    let y = Var::new("y");
    let z = Var::new("z");
    let inputs = vec![
        vec![x.clone(), y.clone()].into_boxed_slice(),
        vec![y.clone(), x.clone()].into_boxed_slice(),
    ];

    assert!(MultiProjection::new(&inputs, &[z, y, x]).is_err());
}
