//! A path expression is a closed tree of incidence `Link`s, combined
//! with conjunctions (`And`) and disjunctions (`Or`) that may
//! existentially quantify intermediate variables.
//!
//! Every node caches the canonical code of the relation it denotes.
//! Equality, ordering and hashing only look at that code, so they are
//! invariant under consistent renaming of variables, but sensitive to
//! the sets variables are bound to.
use super::canonical::{self, Code};
use super::normal;
use super::var::{QuantifiedVar, Var};
use crate::ground::{ElementKind, Set};
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The direction of an incidence link.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LinkKind {
    /// `ve(v, e)`: from an element to its neighbourhood.
    VertexToEdge,
    /// `ev(e, v)`: from a neighbourhood back to an element.
    EdgeToVertex,
}

impl LinkKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LinkKind::VertexToEdge => "ve",
            LinkKind::EdgeToVertex => "ev",
        }
    }

    /// Returns the index of the endpoint that stands for the edge.
    #[must_use]
    pub fn edge_position(self) -> usize {
        match self {
            LinkKind::VertexToEdge => 1,
            LinkKind::EdgeToVertex => 0,
        }
    }

    #[must_use]
    pub fn vertex_position(self) -> usize {
        1 - self.edge_position()
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The atomic path expression: two distinct variables related by the
/// incidence between an edge set and one of its endpoint sets.
#[derive(Clone, Debug)]
pub struct Link {
    endpoints: [Var; 2],
    kind: LinkKind,
}

impl Link {
    /// Returns the path expression `kind(a, b)`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DuplicateVariable)` if `a` and `b` are the same
    /// variable, and `Err(NotIncident)` if both are bound to sets that
    /// do not share an incidence relation.
    pub fn make(a: &Var, b: &Var, kind: LinkKind) -> Result<PathExpression, Error> {
        if a == b {
            return Err(Error::DuplicateVariable {
                var: a.name().into(),
            });
        }

        PathExpression::build(Node::Link(Link {
            endpoints: [a.clone(), b.clone()],
            kind,
        }))
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn endpoints(&self) -> &[Var; 2] {
        &self.endpoints
    }

    /// Returns the endpoint that ranges over edges.
    #[must_use]
    pub fn edge(&self) -> &Var {
        &self.endpoints[self.kind.edge_position()]
    }

    /// Returns the endpoint that ranges over the edges' endpoints.
    #[must_use]
    pub fn vertex(&self) -> &Var {
        &self.endpoints[self.kind.vertex_position()]
    }

    /// Returns the same link between `a` and `b`.  The caller must
    /// make sure `a` and `b` are distinct.
    pub(crate) fn with_endpoints(&self, a: Var, b: Var) -> Link {
        Link {
            endpoints: [a, b],
            kind: self.kind,
        }
    }

    /// Bound sets must agree with the incidence structure: when the
    /// edge side is bound to a set with endpoint sets, the vertex side
    /// (if bound) must be one of them.
    fn check_incidence(&self) -> Result<(), Error> {
        if let (Some(edges), Some(endpoints)) = (self.edge().set(), self.vertex().set()) {
            if !edges.endpoints().is_empty() && !edges.has_endpoints_in(endpoints) {
                return Err(Error::NotIncident {
                    edges: edges.name().into(),
                    endpoints: endpoints.name().into(),
                });
            }
        }

        Ok(())
    }
}

/// The payload shared by `And` and `Or` nodes.
#[derive(Clone, Debug)]
pub struct Connective {
    endpoints: Vec<Var>,
    quantified: Vec<QuantifiedVar>,
    operands: Vec<PathExpression>,
}

impl Connective {
    pub(crate) fn new(
        endpoints: &[Var],
        quantified: &[QuantifiedVar],
        operands: Vec<PathExpression>,
    ) -> Self {
        Self {
            endpoints: endpoints.to_vec(),
            quantified: quantified.to_vec(),
            operands,
        }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn endpoints(&self) -> &[Var] {
        &self.endpoints
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn quantified(&self) -> &[QuantifiedVar] {
        &self.quantified
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn operands(&self) -> &[PathExpression] {
        &self.operands
    }

    fn map_vars(&self, fun: &mut dyn FnMut(&Var) -> Var) -> Connective {
        let mut endpoints = Vec::with_capacity(self.endpoints.len());
        for var in self.endpoints.iter() {
            endpoints.push(fun(var));
        }

        let mut quantified = Vec::with_capacity(self.quantified.len());
        for qvar in self.quantified.iter() {
            quantified.push(QuantifiedVar::new(qvar.quantifier(), &fun(qvar.var())));
        }

        let mut operands = Vec::with_capacity(self.operands.len());
        for operand in self.operands.iter() {
            operands.push(PathExpression::seal(operand.node.map_vars(fun)));
        }

        Connective {
            endpoints,
            quantified,
            operands,
        }
    }

    fn fmt_with(&self, f: &mut std::fmt::Formatter<'_>, connector: &str) -> std::fmt::Result {
        write_list(f, &self.endpoints)?;
        f.write_str(" | ")?;

        if !self.quantified.is_empty() {
            for (index, qvar) in self.quantified.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", qvar)?;
            }
            f.write_str(" | ")?;
        }

        for (index, operand) in self.operands.iter().enumerate() {
            if index > 0 {
                write!(f, " {} ", connector)?;
            }

            match operand.node() {
                Node::Link(_) => write!(f, "{}", operand)?,
                _ => write!(f, "({})", operand)?,
            }
        }

        Ok(())
    }
}

fn write_list(f: &mut std::fmt::Formatter<'_>, vars: &[Var]) -> std::fmt::Result {
    f.write_str("(")?;
    for (index, var) in vars.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", var)?;
    }
    f.write_str(")")
}

#[derive(Clone, Debug)]
pub enum Node {
    Link(Link),
    /// All operands must hold, for some assignment of the quantified
    /// variables.
    And(Connective),
    /// At least one operand must hold.  Quantified variables are
    /// existential within each disjunct that mentions them.
    Or(Connective),
}

impl Node {
    #[must_use]
    pub fn endpoints(&self) -> &[Var] {
        match self {
            Node::Link(link) => &link.endpoints,
            Node::And(connective) | Node::Or(connective) => &connective.endpoints,
        }
    }

    #[must_use]
    pub fn quantified(&self) -> &[QuantifiedVar] {
        match self {
            Node::Link(_) => &[],
            Node::And(connective) | Node::Or(connective) => &connective.quantified,
        }
    }

    #[must_use]
    pub fn operands(&self) -> &[PathExpression] {
        match self {
            Node::Link(_) => &[],
            Node::And(connective) | Node::Or(connective) => &connective.operands,
        }
    }

    /// Calls `fun` on every variable occurrence in the tree, endpoints
    /// and quantifiers included.
    pub(crate) fn for_each_var(&self, fun: &mut dyn FnMut(&Var)) {
        for var in self.endpoints().iter() {
            fun(var);
        }

        for qvar in self.quantified().iter() {
            fun(qvar.var());
        }

        for operand in self.operands().iter() {
            operand.node.for_each_var(fun);
        }
    }

    pub(crate) fn for_each_link(&self, fun: &mut dyn FnMut(&Link)) {
        match self {
            Node::Link(link) => fun(link),
            Node::And(connective) | Node::Or(connective) => {
                for operand in connective.operands.iter() {
                    operand.node.for_each_link(fun);
                }
            }
        }
    }

    /// Returns a copy of the tree where every variable occurrence is
    /// replaced with `fun(var)`.
    pub(crate) fn map_vars(&self, fun: &mut dyn FnMut(&Var) -> Var) -> Node {
        match self {
            Node::Link(link) => {
                let a = fun(&link.endpoints[0]);
                let b = fun(&link.endpoints[1]);
                Node::Link(Link {
                    endpoints: [a, b],
                    kind: link.kind,
                })
            }
            Node::And(connective) => Node::And(connective.map_vars(fun)),
            Node::Or(connective) => Node::Or(connective.map_vars(fun)),
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Link(link) => write!(
                f,
                "{}({}, {})",
                link.kind, link.endpoints[0], link.endpoints[1]
            ),
            Node::And(connective) => connective.fmt_with(f, "and"),
            Node::Or(connective) => connective.fmt_with(f, "or"),
        }
    }
}

/// Returns the set each variable in `node` is bound to.
///
/// # Errors
///
/// Returns `Err(InconsistentBinding)` if two occurrences of the same
/// variable are bound to different sets.
pub(crate) fn collect_sets(node: &Node) -> Result<BTreeMap<Var, Set>, Error> {
    let mut sets: BTreeMap<Var, Set> = BTreeMap::new();
    let mut conflict = None;

    node.for_each_var(&mut |var| {
        let set = match (var.set(), &conflict) {
            (Some(set), None) => set,
            _ => return,
        };

        match sets.get(var) {
            Some(prev) if prev != set => {
                conflict = Some(Error::InconsistentBinding {
                    var: var.name().into(),
                    first: prev.name().into(),
                    second: set.name().into(),
                })
            }
            Some(_) => {}
            None => {
                sets.insert(var.clone(), set.clone());
            }
        }
    });

    match conflict {
        Some(error) => Err(error),
        None => Ok(sets),
    }
}

/// A path expression is an immutable value: renaming and binding
/// always return a fresh tree.
///
/// Equality is alpha-equivalence over variables *and* their bound
/// sets: a bound expression never equals its unbound variant, since a
/// looser rule could not be transitive and agree with `Ord`.
#[derive(Clone)]
pub struct PathExpression {
    node: Node,
    code: Arc<Code>,
}

impl PathExpression {
    /// Propagates bindings to every occurrence of each variable,
    /// checks incidence, and seals `node`.
    pub(crate) fn build(node: Node) -> Result<Self, Error> {
        let sets = collect_sets(&node)?;

        let mut partial = false;
        node.for_each_var(&mut |var| partial |= !var.is_bound() && sets.contains_key(var));

        let node = if partial {
            node.map_vars(&mut |var| match sets.get(var) {
                Some(set) if !var.is_bound() => var.with_set(set),
                _ => var.clone(),
            })
        } else {
            node
        };

        let mut incidence = Ok(());
        node.for_each_link(&mut |link| {
            if incidence.is_ok() {
                incidence = link.check_incidence();
            }
        });
        incidence?;

        Ok(Self::seal(node))
    }

    /// Wraps an already validated `node`.
    pub(crate) fn seal(node: Node) -> Self {
        let code = Arc::new(canonical::encode(&normal::normalize(&node)));
        Self { node, code }
    }

    #[cfg(not(tarpaulin_include))]
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.node
    }

    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.endpoints().len()
    }

    #[inline]
    #[must_use]
    pub fn endpoints(&self) -> &[Var] {
        self.node.endpoints()
    }

    /// Returns the `index`th endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Err(IndexOutOfRange)` when `index >= self.arity()`.
    pub fn endpoint(&self, index: usize) -> Result<&Var, Error> {
        self.endpoints()
            .get(index)
            .ok_or_else(|| Error::IndexOutOfRange {
                index,
                arity: self.arity(),
            })
    }

    #[must_use]
    pub fn endpoint_kinds(&self) -> Vec<ElementKind> {
        self.endpoints().iter().map(Var::kind).collect()
    }

    /// Returns the variables quantified at the root (empty for links).
    #[inline]
    #[must_use]
    pub fn quantified_vars(&self) -> &[QuantifiedVar] {
        self.node.quantified()
    }

    #[inline]
    #[must_use]
    pub fn sub_expressions(&self) -> &[PathExpression] {
        self.node.operands()
    }

    /// Returns every variable that occurs in the tree, at any depth, in
    /// token order.
    #[must_use]
    pub fn variables(&self) -> Vec<Var> {
        let mut vars: BTreeSet<Var> = BTreeSet::new();
        self.node.for_each_var(&mut |var| {
            if !vars.contains(var) {
                vars.insert(var.clone());
            }
        });
        vars.into_iter().collect()
    }

    /// Returns whether every variable in the tree is bound to a set.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        let mut bound = true;
        self.node.for_each_var(&mut |var| bound &= var.is_bound());
        bound
    }
}

impl PartialEq for PathExpression {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.code, &other.code) || self.code == other.code
    }
}

impl Eq for PathExpression {}

impl std::hash::Hash for PathExpression {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl PartialOrd for PathExpression {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathExpression {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code.cmp(&other.code)
    }
}

impl std::fmt::Debug for PathExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.node, f)
    }
}

impl std::fmt::Display for PathExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.node, f)
    }
}

#[test]
fn test_link_endpoints() {
    let v = Var::vertex("v");
    let e = Var::edge("e");
    let link = Link::make(&v, &e, LinkKind::VertexToEdge).expect("ok");

    assert_eq!(link.arity(), 2);
    assert_eq!(link.endpoint(0), Ok(&v));
    assert_eq!(link.endpoint(1), Ok(&e));
    assert_eq!(
        link.endpoint(2),
        Err(Error::IndexOutOfRange { index: 2, arity: 2 })
    );
    assert!(link.quantified_vars().is_empty());
    assert!(link.sub_expressions().is_empty());
    assert!(!link.is_bound());
    assert_eq!(
        link.endpoint_kinds(),
        vec![ElementKind::Vertex, ElementKind::Edge]
    );

    match link.node() {
        Node::Link(inner) => {
            assert_eq!(inner.edge(), &e);
            assert_eq!(inner.vertex(), &v);
        }
        _ => panic!("expected a link"),
    }
}

#[test]
fn test_link_duplicate() {
    let v = Var::new("v");

    assert!(matches!(
        Link::make(&v, &v, LinkKind::EdgeToVertex),
        Err(Error::DuplicateVariable { .. })
    ));
}

#[test]
fn test_link_keeps_bindings() {
    let vertices = Set::vertices("V", 2);
    let edges =
        Set::edges("E", &[vertices.clone(), vertices.clone()], vec![vec![0, 1]]).expect("ok");
    let v = Var::vertex("v").bind(&vertices).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");

    let link = Link::make(&e, &v, LinkKind::EdgeToVertex).expect("ok");
    assert!(link.is_bound());
    assert_eq!(link.endpoint(0).expect("ok").set(), Some(&edges));
}

#[test]
fn test_link_not_incident() {
    let vertices = Set::vertices("V", 2);
    let others = Set::vertices("U", 2);
    let edges = Set::edges("E", &[vertices.clone(), vertices], vec![vec![0, 1]]).expect("ok");
    let u = Var::vertex("u").bind(&others).expect("ok");
    let e = Var::edge("e").bind(&edges).expect("ok");

    assert!(matches!(
        Link::make(&u, &e, LinkKind::VertexToEdge),
        Err(Error::NotIncident { .. })
    ));
}

#[test]
fn test_link_equality() {
    let ve = |a: &Var, b: &Var| Link::make(a, b, LinkKind::VertexToEdge).expect("ok");
    let ev = |a: &Var, b: &Var| Link::make(a, b, LinkKind::EdgeToVertex).expect("ok");

    let (v, e) = (Var::new("v"), Var::new("e"));
    let (u, f) = (Var::new("u"), Var::new("f"));

    assert_eq!(ve(&v, &e), ve(&u, &f));
    assert_eq!(ve(&v, &e), ve(&e, &v));
    assert_ne!(ve(&v, &e), ev(&v, &e));

    let (tv, te) = (Var::vertex("v"), Var::edge("e"));
    assert_ne!(ve(&tv, &te), ve(&te, &tv));
    assert_eq!(ve(&tv, &te), ve(&Var::vertex("x"), &Var::edge("y")));
}

#[test]
fn test_display() {
    let v = Var::vertex("v");
    let e = Var::edge("e");

    assert_eq!(
        Link::make(&v, &e, LinkKind::VertexToEdge)
            .expect("ok")
            .to_string(),
        "ve(v, e)"
    );
    assert_eq!(
        Link::make(&e, &v, LinkKind::EdgeToVertex)
            .expect("ok")
            .to_string(),
        "ev(e, v)"
    );
}
