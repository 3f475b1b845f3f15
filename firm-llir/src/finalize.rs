//! The last lowering pass: wire schedule dependencies for φ-copies that clobber a register some
//! other node in the same block still reads, then close every block off from further mutation.
//!
//! Output marking itself happens eagerly, at the point `Lowering` discovers a cross-block use (see
//! `lowering::Lowering::resolve_register`/`resolve_memory`) rather than being replayed here from a
//! separately sorted list: the DFS is already fully deterministic (no hashmap ever drives its
//! order) and `EntitySet::insert` is idempotent, so there is nothing left for this pass to
//! re-derive. What's left is purely the φ-copy-vs-terminator/consumer ordering the resolver can't
//! express by itself, since a φ-copy and the nodes it must precede are unrelated by data edges.

use crate::llir::{BlockState, LlirGraph};
use crate::lowering::PhiMove;

/// Finalize `graph`: for every φ-copy recorded in `phi_reg_moves`, force it to schedule ahead of
/// any other node in its block that still reads the register it overwrites, then transition every
/// `Finished` block to `Finalized`. Idempotent: blocks already `Finalized` (from a prior call) are
/// left untouched.
pub(crate) fn finalize(graph: &mut LlirGraph, phi_reg_moves: &[PhiMove]) {
    for mov in phi_reg_moves {
        if graph.block(mov.block).state() != BlockState::Finished {
            continue;
        }
        let consumers: Vec<_> = graph
            .block(mov.block)
            .nodes()
            .iter()
            .copied()
            .filter(|&n| n != mov.mov)
            .filter(|&n| graph.node(n).kind.register_operands().contains(&mov.target_reg))
            .collect();
        for consumer in consumers {
            graph.add_schedule_dep(mov.block, consumer, mov.mov);
        }
    }

    graph.finalize();
}
