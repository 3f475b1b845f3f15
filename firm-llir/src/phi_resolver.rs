//! The φ-resolution pass: turns every non-memory φ into an accumulator register plus one copy
//! per incoming edge, placed in that edge's tail block (or a freshly spliced block, if the edge
//! is critical).
//!
//! Split out as a free function taking `&mut Lowering`, the same way the teacher keeps each
//! register-allocation stage (`coloring::run`, `spilling::run`, ...) as its own module operating on
//! a shared `Context` rather than spreading more `impl` blocks across files.

use crate::lowering::Lowering;
use crate::result::{LoweringError, LoweringResult};
use crate::source::NodeId;

/// Resolve every value φ in `l.source`, in ascending node-id order (`SourceGraph::phis` already
/// iterates the arena in that order, which is what makes the emitted copies deterministic).
/// Memory φs need nothing here: they're aliased to their block's `MemoryInput` directly, with no
/// per-predecessor copy, during ordinary lowering.
pub(crate) fn resolve(l: &mut Lowering) -> LoweringResult<()> {
    let phis: Vec<NodeId> = l.source.phis().filter(|&id| !l.source.is_memory_phi(id)).collect();

    for phi in phis {
        let (_, target_reg) = l.ensure_phi_accum(phi);
        let phi_block = l.source.node(phi).block;
        let operands = l.source.node(phi).preds.clone();
        let edges = l.source.block(phi_block).preds.clone();

        if operands.len() != edges.len() {
            return Err(LoweringError::InvariantViolation { node: phi, block: phi_block });
        }

        for (operand, edge) in operands.into_iter().zip(edges.into_iter()) {
            let placement = l.placement_block(edge, phi_block)?;
            l.emit_phi_copy(placement, operand, target_reg)?;
        }
    }

    Ok(())
}
