//! Before comparing path expressions, we rewrite them into a normal
//! form that forgets how the tree was parenthesised.
//!
//! The normal form is a conjunctive block: a list of local
//! (existential) variables, and a list of terms that must all hold.
//! A term is either an incidence link, or a union of nested blocks.
//! Nested `And`s are flattened into their parent block, nested `Or`s
//! into their parent union, and unions with a single alternative are
//! inlined.  Quantifiers of an `Or` are pushed into the disjuncts that
//! mention them.
//!
//! Variables are replaced with slots, one per binding occurrence, so
//! the same `Var` quantified at two different levels never clashes
//! with itself.
use super::canonical;
use super::expression::{LinkKind, Node};
use super::var::{Signature, Var};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) type Slot = usize;

#[derive(Clone, Debug)]
pub(crate) struct Normal {
    /// The signature of every slot, indexed by slot.
    pub signatures: Vec<Signature>,
    pub endpoints: Vec<Slot>,
    pub body: Block,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Block {
    pub locals: Vec<Slot>,
    pub terms: Vec<Term>,
}

#[derive(Clone, Debug)]
pub(crate) enum Term {
    Link {
        kind: LinkKind,
        args: [Slot; 2],
    },
    /// `free` is the sorted list of slots the union mentions without
    /// binding them.
    Union { blocks: Vec<Block>, free: Vec<Slot> },
}

impl Block {
    /// Returns the slots mentioned in this block, but bound outside.
    pub fn free_slots(&self) -> BTreeSet<Slot> {
        let mut ret = BTreeSet::new();

        for term in self.terms.iter() {
            match term {
                Term::Link { args, .. } => ret.extend(args.iter().copied()),
                Term::Union { free, .. } => ret.extend(free.iter().copied()),
            }
        }

        for local in self.locals.iter() {
            ret.remove(local);
        }

        ret
    }
}

/// Returns the normal form of `node`; endpoints are assigned slots
/// `0..arity`.
pub(crate) fn normalize(node: &Node) -> Normal {
    let mut normalizer = Normalizer {
        signatures: Vec::new(),
    };

    let mut env = BTreeMap::new();
    let mut endpoints = Vec::with_capacity(node.endpoints().len());
    for var in node.endpoints().iter() {
        let slot = normalizer.fresh(var);
        env.insert(var.clone(), slot);
        endpoints.push(slot);
    }

    let mut body = Block::default();
    normalizer.lower(node, &env, &mut body);
    normalizer.finish(&mut body);

    Normal {
        signatures: normalizer.signatures,
        endpoints,
        body,
    }
}

struct Normalizer {
    signatures: Vec<Signature>,
}

impl Normalizer {
    fn fresh(&mut self, var: &Var) -> Slot {
        self.signatures.push(var.signature());
        self.signatures.len() - 1
    }

    /// Appends the terms for `node` to `block`.  `env` maps every
    /// variable in scope to its slot.
    fn lower(&mut self, node: &Node, env: &BTreeMap<Var, Slot>, block: &mut Block) {
        let slot = |var: &Var| -> Slot {
            *env
                .get(var)
                .expect("variables are scoped on construction")
        };

        match node {
            Node::Link(link) => {
                let [a, b] = link.endpoints();
                block.terms.push(Term::Link {
                    kind: link.kind(),
                    args: [slot(a), slot(b)],
                });
            }
            Node::And(and) => {
                let mut env = env.clone();
                for qvar in and.quantified().iter() {
                    let local = self.fresh(qvar.var());
                    env.insert(qvar.var().clone(), local);
                    block.locals.push(local);
                }

                for operand in and.operands().iter() {
                    self.lower(operand.node(), &env, block);
                }
            }
            Node::Or(or) => {
                let mut blocks = Vec::new();

                for disjunct in or.operands().iter() {
                    let mut env = env.clone();
                    let mut inner = Block::default();

                    for qvar in or.quantified().iter() {
                        if disjunct.endpoints().contains(qvar.var()) {
                            let local = self.fresh(qvar.var());
                            env.insert(qvar.var().clone(), local);
                            inner.locals.push(local);
                        }
                    }

                    self.lower(disjunct.node(), &env, &mut inner);
                    self.finish(&mut inner);
                    splice(inner, &mut blocks);
                }

                let mut blocks = self.dedup_blocks(blocks);
                if blocks.len() == 1 {
                    let only = blocks.remove(0);
                    block.locals.extend(only.locals);
                    block.terms.extend(only.terms);
                } else {
                    let free = union_free(&blocks);
                    block.terms.push(Term::Union { blocks, free });
                }
            }
        }
    }

    /// Removes duplicate terms from `block`.  Links are compared
    /// syntactically, unions up to renaming of their own locals.
    fn finish(&self, block: &mut Block) {
        let mut links = BTreeSet::new();
        let mut unions = BTreeSet::new();
        let mut terms = Vec::with_capacity(block.terms.len());

        for term in block.terms.drain(..) {
            let fresh = match &term {
                Term::Link { kind, args } => links.insert((*kind, *args)),
                Term::Union { .. } => {
                    let wrapper = Block {
                        locals: Vec::new(),
                        terms: vec![term.clone()],
                    };
                    unions.insert(self.local_code(&wrapper))
                }
            };

            if fresh {
                terms.push(term);
            }
        }

        block.terms = terms;
    }

    /// Drops alternatives that are identical up to renaming of their
    /// locals.
    fn dedup_blocks(&self, blocks: Vec<Block>) -> Vec<Block> {
        let mut seen = BTreeSet::new();
        blocks
            .into_iter()
            .filter(|block| seen.insert(self.local_code(block)))
            .collect()
    }

    /// Encodes `block` with free slots labelled by their own index,
    /// which is enough to compare siblings.
    fn local_code(&self, block: &Block) -> canonical::BlockCode {
        let outer = block
            .free_slots()
            .into_iter()
            .map(|slot| (slot, slot as u32))
            .collect();
        canonical::encode_block(&self.signatures, block, &outer)
    }
}

/// Pushes `block` to `into`, or, if `block` is only a union, pushes
/// its alternatives after moving the block's locals into the
/// alternatives that use them.
fn splice(block: Block, into: &mut Vec<Block>) {
    let only_union = block.terms.len() == 1 && matches!(block.terms[0], Term::Union { .. });
    if !only_union {
        into.push(block);
        return;
    }

    let Block { locals, mut terms } = block;
    if let Some(Term::Union { blocks, .. }) = terms.pop() {
        for mut inner in blocks {
            let free = inner.free_slots();
            inner
                .locals
                .extend(locals.iter().copied().filter(|slot| free.contains(slot)));
            into.push(inner);
        }
    }
}

fn union_free(blocks: &[Block]) -> Vec<Slot> {
    let mut free = BTreeSet::new();
    for block in blocks.iter() {
        free.extend(block.free_slots());
    }

    free.into_iter().collect()
}

#[cfg(test)]
fn chain(hops: usize) -> (Vec<Var>, Vec<super::PathExpression>) {
    use super::{Link, LinkKind};

    let vars: Vec<Var> = (0..=hops).map(|i| Var::new(&format!("x{}", i))).collect();
    let links = vars
        .windows(2)
        .map(|pair| Link::make(&pair[0], &pair[1], LinkKind::VertexToEdge).expect("ok"))
        .collect();
    (vars, links)
}

#[test]
fn test_and_flattens() {
    use super::{And, QuantifiedVar};

    let (vars, links) = chain(3);
    let (x0, x1, x2, x3) = (&vars[0], &vars[1], &vars[2], &vars[3]);

    let inner = And::make(
        &[x0.clone(), x2.clone()],
        &[QuantifiedVar::exist(x1)],
        links[..2].to_vec(),
    )
    .expect("ok");
    let outer = And::make(
        &[x0.clone(), x3.clone()],
        &[QuantifiedVar::exist(x2)],
        vec![inner, links[2].clone()],
    )
    .expect("ok");

    let normal = normalize(outer.node());
    assert_eq!(normal.endpoints, vec![0, 1]);
    assert_eq!(normal.body.locals.len(), 2);
    assert_eq!(normal.body.terms.len(), 3);
    assert!(normal
        .body
        .terms
        .iter()
        .all(|term| matches!(term, Term::Link { .. })));
}

#[test]
fn test_single_disjunct_inlined() {
    use super::{Link, LinkKind, Or};

    let a = Var::new("a");
    let b = Var::new("b");
    let link = Link::make(&a, &b, LinkKind::VertexToEdge).expect("ok");
    let or = Or::make(&[a.clone(), b.clone()], &[], vec![link.clone(), link]).expect("ok");

    let normal = normalize(or.node());
    assert!(normal.body.locals.is_empty());
    assert_eq!(normal.body.terms.len(), 1);
    assert!(matches!(normal.body.terms[0], Term::Link { .. }));
}

#[test]
fn test_nested_or_spliced() {
    use super::{Link, LinkKind, Or};

    let a = Var::new("a");
    let b = Var::new("b");
    let ve = Link::make(&a, &b, LinkKind::VertexToEdge).expect("ok");
    let ev = Link::make(&a, &b, LinkKind::EdgeToVertex).expect("ok");
    let flipped = Link::make(&b, &a, LinkKind::VertexToEdge).expect("ok");

    let inner = Or::make(&[a.clone(), b.clone()], &[], vec![ve, ev]).expect("ok");
    let outer = Or::make(&[a.clone(), b.clone()], &[], vec![inner, flipped]).expect("ok");

    let normal = normalize(outer.node());
    assert_eq!(normal.body.terms.len(), 1);
    match &normal.body.terms[0] {
        Term::Union { blocks, free } => {
            assert_eq!(blocks.len(), 3);
            assert_eq!(free, &vec![0, 1]);
        }
        _ => panic!("expected a union"),
    }
}

#[test]
fn test_quantifier_pushed_into_disjunct() {
    use super::{Link, LinkKind, Or, QuantifiedVar};

    let a = Var::new("a");
    let b = Var::new("b");
    let q = Var::new("q");

    // `b` is absent from the second disjunct, and `q` only occurs there.
    let direct = Link::make(&a, &b, LinkKind::VertexToEdge).expect("ok");
    let side = Link::make(&a, &q, LinkKind::VertexToEdge).expect("ok");
    let or = Or::make(
        &[a.clone(), b.clone()],
        &[QuantifiedVar::exist(&q)],
        vec![direct, side],
    )
    .expect("ok");

    let normal = normalize(or.node());
    assert!(normal.body.locals.is_empty());
    match &normal.body.terms[0] {
        Term::Union { blocks, .. } => {
            let locals: Vec<usize> = blocks.iter().map(|block| block.locals.len()).collect();
            assert_eq!(locals, vec![0, 1]);
        }
        _ => panic!("expected a union"),
    }
}
