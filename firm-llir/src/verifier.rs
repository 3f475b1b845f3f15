//! Verifies an `LlirGraph` against the core's structural invariants after lowering.
//!
//! Mirrors the teacher's own verifier: a single pass that accumulates every violation it finds
//! rather than returning on the first one, so a caller sees the whole picture in one run.

use crate::llir::{BasicBlockId, LlirGraph, LlirNodeId, LlirNodeKind, VirtualRegister};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// A same-block φ-pair member the swap-problem prepass flagged as needing a temporary copy of
/// its accumulator before use, and the block lowering actually placed that copy in.
///
/// Produced by `lowering::run` (via `Lowering::collect_phi_accumulators`) and fed back into
/// [`verify`] so the swap-safety invariant can be checked without the verifier needing its own
/// copy of the source-level φ bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhiAccumulator {
    /// The block the temporary copy must live in.
    pub block: BasicBlockId,
    /// The φ's accumulator register; the expected copy reads this register as its source.
    pub accumulator: VirtualRegister,
}

/// Where a verifier error was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    /// A whole basic block.
    Block(BasicBlockId),
    /// A single node within a block.
    Node(LlirNodeId, BasicBlockId),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Location::Block(b) => write!(f, "{}", b),
            Location::Node(n, b) => write!(f, "{} (in {})", n, b),
        }
    }
}

/// A single verifier violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierError {
    /// Where the violation was found.
    pub location: Location,
    /// A human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// An accumulator of `VerifierError`s. Empty means the graph is well-formed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl VerifierErrors {
    /// An empty (passing) accumulator.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Whether no violations were recorded.
    pub fn is_ok(&self) -> bool {
        self.0.is_empty()
    }

    fn report(&mut self, location: Location, message: impl Into<String>) {
        self.0.push(VerifierError {
            location,
            message: message.into(),
        });
    }
}

impl fmt::Display for VerifierErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for VerifierErrors {}

/// Verify every universal invariant from the lowering contract against `graph`. `phi_accumulators`
/// is the swap-problem bookkeeping `lowering::run` produced alongside `graph` (pass `&[]` if the
/// graph was not built via a swap-bearing method, e.g. in low-level tests). Returns `Ok(())` if
/// the graph is well-formed, or every violation found otherwise.
pub fn verify(graph: &LlirGraph, phi_accumulators: &[PhiAccumulator]) -> Result<(), VerifierErrors> {
    let mut errors = VerifierErrors::new();
    let incoming = count_incoming_edges(graph);

    for block_id in graph.block_ids() {
        let block = graph.block(block_id);

        if block.terminator().is_none() {
            errors.report(Location::Block(block_id), "block has no terminator");
        }

        if block_id != graph.start_block() && *incoming.get(&block_id).unwrap_or(&0) == 0 {
            errors.report(
                Location::Block(block_id),
                "non-start block is reachable but has no predecessor",
            );
        }

        verify_operands_resolve_locally(graph, block_id, &mut errors);
        verify_memory_chain_is_linear(graph, block_id, &mut errors);
    }

    verify_inputs_have_matching_outputs(graph, &mut errors);
    verify_critical_edges_are_split(graph, &incoming, &mut errors);
    verify_swap_safety(graph, phi_accumulators, &mut errors);

    if errors.is_ok() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// How many terminators (`Jump`/`Branch`) directly target each block.
fn count_incoming_edges(graph: &LlirGraph) -> HashMap<BasicBlockId, u32> {
    let mut incoming = HashMap::new();
    for block_id in graph.block_ids() {
        let block = graph.block(block_id);
        let terminator = match block.terminator() {
            Some(t) => t,
            None => continue,
        };
        for target in successor_blocks(&graph.node(terminator).kind) {
            *incoming.entry(target).or_insert(0) += 1;
        }
    }
    incoming
}

/// The distinct blocks a terminator transfers control to (a `Branch` to the same block twice
/// counts once).
fn successor_blocks(kind: &LlirNodeKind) -> SmallVec<[BasicBlockId; 2]> {
    let mut out = SmallVec::new();
    match kind {
        LlirNodeKind::Jump { target } => out.push(*target),
        LlirNodeKind::Branch { true_block, false_block, .. } => {
            out.push(*true_block);
            if false_block != true_block {
                out.push(*false_block);
            }
        }
        _ => {}
    }
    out
}

/// Every edge whose tail has more than one successor and whose head has more than one
/// predecessor must be split: the tail's terminator must not target the head directly, since no
/// block can safely host that head's φ-copies on this edge alone. `lowering::run` is expected to
/// have already spliced an inserted block onto every such edge before this check ever runs.
fn verify_critical_edges_are_split(
    graph: &LlirGraph,
    incoming: &HashMap<BasicBlockId, u32>,
    errors: &mut VerifierErrors,
) {
    for block_id in graph.block_ids() {
        let block = graph.block(block_id);
        let terminator = match block.terminator() {
            Some(t) => t,
            None => continue,
        };
        let targets = successor_blocks(&graph.node(terminator).kind);
        if targets.len() <= 1 {
            continue;
        }
        for target in targets {
            if *incoming.get(&target).unwrap_or(&0) > 1 {
                errors.report(
                    Location::Node(terminator, block_id),
                    format!(
                        "critical edge into {} was not split: {} has multiple successors and {} has multiple predecessors",
                        target, block_id, target
                    ),
                );
            }
        }
    }
}

/// Within one block, a memory-chain producer must feed exactly one consumer: no side-effecting
/// node's `mem_in` may be read by more than one other node in the same block, which would mean
/// the chain branched instead of staying a single line.
fn verify_memory_chain_is_linear(graph: &LlirGraph, block_id: BasicBlockId, errors: &mut VerifierErrors) {
    let block = graph.block(block_id);
    let mut consumers: HashMap<LlirNodeId, Vec<LlirNodeId>> = HashMap::new();
    for &node_id in block.nodes() {
        if let Some(mem_in) = graph.node(node_id).kind.mem_in() {
            consumers.entry(mem_in).or_default().push(node_id);
        }
    }
    for (producer, readers) in consumers {
        if readers.len() > 1 {
            errors.report(
                Location::Node(producer, block_id),
                format!(
                    "memory chain branches in this block: {} is consumed by {} different nodes",
                    producer,
                    readers.len()
                ),
            );
        }
    }
}

/// Every accumulator a same-block φ-pair flagged as temporaried must have a `MovRegister` copy of
/// itself materialized in the expected block before any sibling φ-copy can clobber it.
fn verify_swap_safety(graph: &LlirGraph, phi_accumulators: &[PhiAccumulator], errors: &mut VerifierErrors) {
    for acc in phi_accumulators {
        let block = graph.block(acc.block);
        let has_copy = block.nodes().iter().any(|&n| {
            matches!(graph.node(n).kind, LlirNodeKind::MovRegister { src } if src == acc.accumulator)
        });
        if !has_copy {
            errors.report(
                Location::Block(acc.block),
                format!(
                    "phi accumulator {} takes part in a same-block swap but no MovRegister temporary copy of it was found in {}",
                    acc.accumulator, acc.block
                ),
            );
        }
    }
}

fn verify_operands_resolve_locally(
    graph: &LlirGraph,
    block_id: BasicBlockId,
    errors: &mut VerifierErrors,
) {
    let block = graph.block(block_id);
    for &node_id in block.nodes() {
        let node = graph.node(node_id);
        for operand in node.kind.register_operands() {
            let defined_locally = block.local_define(operand).is_some();
            if !defined_locally {
                errors.report(
                    Location::Node(node_id, block_id),
                    format!(
                        "operand {} is neither defined in this block nor bound by an InputNode",
                        operand
                    ),
                );
            }
        }
        if let Some(mem_in) = node.kind.mem_in() {
            let mem_owner = graph.owner(mem_in);
            if mem_owner != Some(block_id) {
                errors.report(
                    Location::Node(node_id, block_id),
                    "memory predecessor does not belong to this block; MemoryInput was not materialized",
                );
            }
        }
        if let LlirNodeKind::Branch { cmp, .. } = &node.kind {
            if graph.owner(*cmp) != Some(block_id) {
                errors.report(
                    Location::Node(node_id, block_id),
                    "branch predicate does not live in the same block as the branch",
                );
            }
        }
    }
}

fn verify_inputs_have_matching_outputs(graph: &LlirGraph, errors: &mut VerifierErrors) {
    for block_id in graph.block_ids() {
        let block = graph.block(block_id);
        for &node_id in block.nodes() {
            if !graph.node(node_id).kind.is_input() {
                continue;
            }
            let reg = match graph.node(node_id).dst {
                Some(r) => r,
                None => continue,
            };
            let has_matching_output = graph.block_ids().any(|other| {
                if other == block_id {
                    return false;
                }
                let other_block = graph.block(other);
                other_block.outputs().iter().any(|out_node| {
                    graph.node(out_node).dst == Some(reg)
                })
            });
            if !has_matching_output {
                errors.report(
                    Location::Node(node_id, block_id),
                    format!(
                        "InputNode for register {} has no matching predecessor output",
                        reg
                    ),
                );
            }
        }
    }
}
