//! Every failure in the algebra is a malformed compiler-internal
//! relation: it is detected when the relation is built, renamed or
//! bound, and surfaced to the enclosing pass as-is.  Nothing here is
//! retried, and equality/ordering never fail.
use crate::ground::ElementKind;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// A variable was paired with a set (or a replacement variable)
    /// of an incompatible element kind.
    #[error("{var} expects {expected:?} elements, found {found:?}")]
    TypeMismatch {
        var: String,
        expected: ElementKind,
        found: ElementKind,
    },

    /// A bound variable was asked to bind to a different set.
    #[error("{var} is already bound to {bound}, cannot rebind it to {requested}")]
    AlreadyBound {
        var: String,
        bound: String,
        requested: String,
    },

    #[error("endpoint index {index} is out of range for arity {arity}")]
    IndexOutOfRange { index: usize, arity: usize },

    /// A quantified variable does not connect enough sub-expressions.
    #[error("quantified variable {var} must appear in at least {required} sub-expression(s)")]
    DanglingQuantifier { var: String, required: usize },

    /// Endpoint lists disagree in arity or per-position element kind.
    #[error("expected endpoint shape {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<ElementKind>,
        found: Vec<ElementKind>,
    },

    /// The same variable would need two different concrete sets.
    #[error("{var} would be bound to both {first} and {second}")]
    InconsistentBinding {
        var: String,
        first: String,
        second: String,
    },

    #[error("variable {var} appears more than once in an endpoint or quantifier list")]
    DuplicateVariable { var: String },

    /// A sub-expression mentions a variable that is neither an
    /// endpoint nor quantified by its parent.
    #[error("variable {var} is neither an endpoint nor quantified")]
    UnscopedVariable { var: String },

    #[error("endpoint {var} does not appear in any sub-expression")]
    MissingEndpoint { var: String },

    #[error("composite path expressions need at least one sub-expression")]
    EmptyComposition,

    #[error("malformed edge set {set}: {reason}")]
    InvalidIncidence { set: String, reason: String },

    #[error("variable {var} is not bound to a set")]
    Unbound { var: String },

    /// A link's edge-side set does not have the vertex-side set among
    /// its endpoint sets.
    #[error("set {edges} has no endpoints in set {endpoints}")]
    NotIncident { edges: String, endpoints: String },
}

#[test]
fn test_messages() {
    let err = Error::IndexOutOfRange { index: 2, arity: 2 };
    assert_eq!(
        err.to_string(),
        "endpoint index 2 is out of range for arity 2"
    );

    let err = Error::DanglingQuantifier {
        var: "e".into(),
        required: 2,
    };
    assert!(err.to_string().contains("e must appear in at least 2"));
}
