//! Canonical codes for normalised path expressions.
//!
//! Two normal forms denote the same relation up to renaming iff there
//! is a bijection between their local slots that maps one list of
//! terms onto the other.  Rather than search for that bijection
//! pairwise, we compute a canonical labeling of each block's locals,
//! and compare the resulting encodings.
//!
//! Labels are found by colour refinement: locals start coloured by
//! their signature, and are repeatedly split according to how they
//! occur in terms (link kind, position, colour of the other argument).
//! When refinement stalls with tied colours, we individualise each
//! member of the first tied class in turn, refine again, and keep the
//! smallest encoding.  Nested unions are encoded recursively, relative
//! to the labels of the enclosing blocks.
use super::expression::LinkKind;
use super::normal::{Block, Normal, Slot, Term};
use super::var::Signature;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct Code {
    endpoints: Vec<Signature>,
    body: BlockCode,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct BlockCode {
    /// Signatures of the locals, in label order.
    locals: Vec<Signature>,
    /// Sorted and deduplicated.
    terms: Vec<TermCode>,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) enum TermCode {
    Link { kind: LinkKind, args: [u32; 2] },
    Union(Vec<BlockCode>),
}

/// Returns the canonical code of `normal`.  Endpoints keep their
/// position as label.
pub(crate) fn encode(normal: &Normal) -> Code {
    let labels: BTreeMap<Slot, u32> = normal
        .endpoints
        .iter()
        .enumerate()
        .map(|(index, slot)| (*slot, index as u32))
        .collect();

    Code {
        endpoints: normal
            .endpoints
            .iter()
            .map(|slot| normal.signatures[*slot])
            .collect(),
        body: encode_block(&normal.signatures, &normal.body, &labels),
    }
}

/// Returns the smallest encoding of `block` over all canonical
/// labelings of its locals.  Every free slot must have a label in
/// `outer`; locals are labelled after the largest outer label.
pub(crate) fn encode_block(
    signatures: &[Signature],
    block: &Block,
    outer: &BTreeMap<Slot, u32>,
) -> BlockCode {
    let search = Search::new(signatures, block, outer);
    let initial = rank(
        &block
            .locals
            .iter()
            .map(|slot| signatures[*slot])
            .collect::<Vec<_>>(),
    );

    search.best(search.refine(initial))
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Mark {
    Outer(u32),
    Local(u32),
}

/// How a local occurs in one term, from the local's point of view.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Sketch {
    Link {
        kind: LinkKind,
        position: usize,
        other: Mark,
    },
    Union {
        alternatives: usize,
        others: Vec<Mark>,
    },
}

struct Search<'a> {
    signatures: &'a [Signature],
    block: &'a Block,
    outer: &'a BTreeMap<Slot, u32>,
    /// First label available for locals.
    base: u32,
    locals: BTreeMap<Slot, usize>,
    /// Indices of the terms each local occurs in.
    occurrences: Vec<Vec<usize>>,
}

impl<'a> Search<'a> {
    fn new(signatures: &'a [Signature], block: &'a Block, outer: &'a BTreeMap<Slot, u32>) -> Self {
        let locals: BTreeMap<Slot, usize> = block
            .locals
            .iter()
            .enumerate()
            .map(|(index, slot)| (*slot, index))
            .collect();

        let mut occurrences = vec![Vec::new(); block.locals.len()];
        for (index, term) in block.terms.iter().enumerate() {
            let slots: &[Slot] = match term {
                Term::Link { args, .. } => args,
                Term::Union { free, .. } => free,
            };

            for slot in slots.iter() {
                if let Some(local) = locals.get(slot) {
                    occurrences[*local].push(index);
                }
            }
        }

        Search {
            signatures,
            block,
            outer,
            base: outer.values().max().map_or(0, |label| label + 1),
            locals,
            occurrences,
        }
    }

    fn mark(&self, slot: Slot, colours: &[u32]) -> Mark {
        match self.locals.get(&slot) {
            Some(local) => Mark::Local(colours[*local]),
            None => Mark::Outer(
                *self
                    .outer
                    .get(&slot)
                    .expect("free slots are labelled by the enclosing block"),
            ),
        }
    }

    fn sketches(&self, local: usize, colours: &[u32]) -> Vec<Sketch> {
        let slot = self.block.locals[local];
        let mut ret: Vec<Sketch> = self.occurrences[local]
            .iter()
            .map(|index| match &self.block.terms[*index] {
                Term::Link { kind, args } => {
                    let position = if args[0] == slot { 0 } else { 1 };
                    Sketch::Link {
                        kind: *kind,
                        position,
                        other: self.mark(args[1 - position], colours),
                    }
                }
                Term::Union { blocks, free } => {
                    let mut others: Vec<Mark> = free
                        .iter()
                        .filter(|other| **other != slot)
                        .map(|other| self.mark(*other, colours))
                        .collect();
                    others.sort();
                    Sketch::Union {
                        alternatives: blocks.len(),
                        others,
                    }
                }
            })
            .collect();

        ret.sort();
        ret
    }

    /// Splits colour classes until the partition is stable.  The
    /// result is dense: colours are `0..#classes`.
    fn refine(&self, mut colours: Vec<u32>) -> Vec<u32> {
        loop {
            let classes = count_classes(&colours);
            let keys: Vec<(u32, Vec<Sketch>)> = (0..colours.len())
                .map(|local| (colours[local], self.sketches(local, &colours)))
                .collect();
            let next = rank(&keys);

            if count_classes(&next) == classes {
                return next;
            }

            colours = next;
        }
    }

    fn best(&self, colours: Vec<u32>) -> BlockCode {
        let tied = first_tied_class(&colours);
        let tied = match tied {
            None => return self.emit(&colours),
            Some(colour) => colour,
        };

        tracing::trace!(
            locals = colours.len(),
            colour = tied,
            "individualizing tied locals"
        );

        let mut best: Option<BlockCode> = None;
        for member in (0..colours.len()).filter(|local| colours[*local] == tied) {
            let individualized = colours
                .iter()
                .enumerate()
                .map(|(local, colour)| {
                    if local == member {
                        2 * colour
                    } else {
                        2 * colour + 1
                    }
                })
                .collect();
            let candidate = self.best(self.refine(individualized));

            best = match best {
                Some(current) if current <= candidate => Some(current),
                _ => Some(candidate),
            };
        }

        best.unwrap_or_else(|| self.emit(&colours))
    }

    /// Encodes the block under a discrete colouring.
    fn emit(&self, colours: &[u32]) -> BlockCode {
        let mut labels = self.outer.clone();
        for (local, slot) in self.block.locals.iter().enumerate() {
            labels.insert(*slot, self.base + colours[local]);
        }

        let mut order: Vec<usize> = (0..self.block.locals.len()).collect();
        order.sort_by_key(|local| colours[*local]);
        let locals = order
            .into_iter()
            .map(|local| self.signatures[self.block.locals[local]])
            .collect();

        let label = |slot: &Slot| labels[slot];
        let mut terms: Vec<TermCode> = self
            .block
            .terms
            .iter()
            .map(|term| match term {
                Term::Link { kind, args } => TermCode::Link {
                    kind: *kind,
                    args: [label(&args[0]), label(&args[1])],
                },
                Term::Union { blocks, .. } => {
                    let mut alternatives: Vec<BlockCode> = blocks
                        .iter()
                        .map(|inner| encode_block(self.signatures, inner, &labels))
                        .collect();
                    alternatives.sort();
                    alternatives.dedup();
                    TermCode::Union(alternatives)
                }
            })
            .collect();
        terms.sort();
        terms.dedup();

        BlockCode { locals, terms }
    }
}

/// Replaces each key with its rank among the distinct keys.
fn rank<T: Ord>(keys: &[T]) -> Vec<u32> {
    let mut sorted: Vec<&T> = keys.iter().collect();
    sorted.sort();
    sorted.dedup();

    keys.iter()
        .map(|key| {
            sorted
                .binary_search(&key)
                .expect("every key is in the sorted list") as u32
        })
        .collect()
}

fn count_classes(colours: &[u32]) -> usize {
    let mut sorted = colours.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Returns the smallest colour shared by at least two locals.
fn first_tied_class(colours: &[u32]) -> Option<u32> {
    let mut sorted = colours.to_vec();
    sorted.sort_unstable();
    sorted
        .windows(2)
        .find(|pair| pair[0] == pair[1])
        .map(|pair| pair[0])
}

#[test]
fn test_rank() {
    assert_eq!(rank(&["b", "a", "c", "a"]), vec![1, 0, 2, 0]);
    assert_eq!(rank::<u32>(&[]), Vec::<u32>::new());
    assert_eq!(count_classes(&[3, 1, 3]), 2);
    assert_eq!(first_tied_class(&[2, 0, 2, 1, 1]), Some(1));
    assert_eq!(first_tied_class(&[2, 0, 1]), None);
}

#[cfg(test)]
fn link(kind: LinkKind, a: Slot, b: Slot) -> Term {
    Term::Link { kind, args: [a, b] }
}

#[cfg(test)]
fn generic() -> Signature {
    super::Var::new("x").signature()
}

#[test]
fn test_locals_order_does_not_matter() {
    use LinkKind::*;

    // (0, 1) | exist 2, 3 | ve(0, 2) and ev(2, 3) and ve(3, 1)
    let left = Normal {
        signatures: vec![generic(); 4],
        endpoints: vec![0, 1],
        body: Block {
            locals: vec![2, 3],
            terms: vec![
                link(VertexToEdge, 0, 2),
                link(EdgeToVertex, 2, 3),
                link(VertexToEdge, 3, 1),
            ],
        },
    };

    // Same relation, locals listed and numbered the other way.
    let right = Normal {
        signatures: vec![generic(); 4],
        endpoints: vec![0, 1],
        body: Block {
            locals: vec![2, 3],
            terms: vec![
                link(VertexToEdge, 2, 1),
                link(EdgeToVertex, 3, 2),
                link(VertexToEdge, 0, 3),
            ],
        },
    };

    assert_eq!(encode(&left), encode(&right));
}

#[test]
fn test_symmetric_locals() {
    use LinkKind::*;

    // Two interchangeable paths between the endpoints: refinement
    // alone cannot tell the locals apart.
    let make = |order: [Slot; 4]| Normal {
        signatures: vec![generic(); 6],
        endpoints: vec![0, 1],
        body: Block {
            locals: vec![2, 3, 4, 5],
            terms: vec![
                link(VertexToEdge, 0, order[0]),
                link(EdgeToVertex, order[0], order[1]),
                link(VertexToEdge, order[1], 1),
                link(VertexToEdge, 0, order[2]),
                link(EdgeToVertex, order[2], order[3]),
                link(VertexToEdge, order[3], 1),
            ],
        },
    };

    assert_eq!(encode(&make([2, 3, 4, 5])), encode(&make([5, 4, 3, 2])));
    assert_eq!(encode(&make([2, 3, 4, 5])), encode(&make([4, 2, 3, 5])));
}

#[test]
fn test_endpoint_positions_matter() {
    use LinkKind::*;

    let make = |a: Slot, b: Slot| Normal {
        signatures: vec![generic(); 3],
        endpoints: vec![0, 1],
        body: Block {
            locals: vec![2],
            terms: vec![link(VertexToEdge, a, 2), link(EdgeToVertex, 2, b)],
        },
    };

    assert_eq!(encode(&make(0, 1)), encode(&make(0, 1)));
    assert_ne!(encode(&make(0, 1)), encode(&make(1, 0)));
}
