//! Computes the *temporaried* set: value φs that must read their accumulator register into a
//! fresh temporary before use, because another same-block φ lists them as an operand (the swap
//! problem).

use crate::source::{NodeId, NodeKind, SourceGraph};
use llir_entity::EntitySet;

/// The set of value φs requiring a temporary copy at their use sites.
pub struct TemporariedSet {
    temporaried: EntitySet<NodeId>,
}

impl TemporariedSet {
    /// Walk every node in `graph` and mark, conservatively, every value φ referenced as an
    /// operand by another value φ in the same block.
    pub fn compute(graph: &SourceGraph) -> Self {
        let mut temporaried = EntitySet::new();
        for id in graph.nodes() {
            let node = graph.node(id);
            if !node.is_phi() || graph.is_memory_phi(id) {
                continue;
            }
            for &operand in &node.preds {
                if is_same_block_value_phi(graph, operand, node.block) {
                    temporaried.insert(operand);
                }
            }
        }
        Self { temporaried }
    }

    /// Whether `phi` must be read through a fresh temporary at its use sites.
    pub fn is_temporaried(&self, phi: NodeId) -> bool {
        self.temporaried.contains(phi)
    }
}

fn is_same_block_value_phi(
    graph: &SourceGraph,
    candidate: NodeId,
    block: crate::source::BlockId,
) -> bool {
    let node = graph.node(candidate);
    matches!(node.kind, NodeKind::Phi) && node.block == block && !graph.is_memory_phi(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::builder::GraphBuilder;
    use crate::width::Width;

    #[test]
    fn swap_phis_mark_each_other_temporaried() {
        let mut b = GraphBuilder::new();
        let entry = b.start_block();
        let header = b.create_block();

        let x0 = b.param(0, Width::Bit32);
        let x1 = b.param(1, Width::Bit32);
        let jmp = b.jmp(entry, header);
        b.connect(jmp, entry, header);

        // φ_x lists φ_y as an operand and vice versa, both in `header`: the genuine mutual
        // swap-problem shape, not just a one-directional chain.
        let phi_x = b.reserve_phi(header, Width::Bit32);
        let phi_y = b.reserve_phi(header, Width::Bit32);
        b.patch_phi_operands(phi_x, &[x0, phi_y]);
        b.patch_phi_operands(phi_y, &[x1, phi_x]);

        let graph = b.finish();
        let set = TemporariedSet::compute(&graph);

        assert!(set.is_temporaried(phi_x));
        assert!(set.is_temporaried(phi_y));
    }

    #[test]
    fn unrelated_phis_are_not_temporaried() {
        let mut b = GraphBuilder::new();
        let entry = b.start_block();
        let then_blk = b.create_block();
        let join = b.create_block();

        let a = b.param(0, Width::Bit32);
        let c = b.const_(then_blk, 1, Width::Bit32);
        let jmp1 = b.jmp(entry, then_blk);
        b.connect(jmp1, entry, then_blk);
        let jmp2 = b.jmp(then_blk, join);
        b.connect(jmp2, then_blk, join);

        let phi = b.phi(join, &[a, c], Width::Bit32);
        let graph = b.finish();
        let set = TemporariedSet::compute(&graph);
        assert!(!set.is_temporaried(phi));
    }
}
