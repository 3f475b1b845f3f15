//! Predecessor/successor counting over the source graph, computed once up front. Mirrors the
//! teacher's own `ControlFlowGraph`: a read-only summary built in one pass and consulted
//! throughout lowering rather than recomputed from the live graph each time.

use crate::source::{BlockId, NodeId, NodeKind, ProjKind, SourceGraph};
use llir_entity::SecondaryMap;

/// Per-block predecessor/successor counts, and the derived critical-edge predicate.
pub struct FlowGraph {
    incoming: SecondaryMap<BlockId, u32>,
    outgoing: SecondaryMap<BlockId, u32>,
    /// Reverse of `BlockData::preds`: the head block a given terminator node (a `Jmp`, or a
    /// `Proj{Control}` off a `Cond`) leads into. Built once so `Cond` lowering can look up both of
    /// its successors without a search.
    edge_head: SecondaryMap<NodeId, Option<BlockId>>,
    /// For a `Cond` node, its two `Proj{Control(0|1)}` children, indexed by projection number.
    cond_proj: SecondaryMap<NodeId, [Option<NodeId>; 2]>,
}

impl FlowGraph {
    /// Compute predecessor/successor counts, and the edge/projection reverse maps, for `graph`.
    pub fn compute(graph: &SourceGraph) -> Self {
        let mut incoming: SecondaryMap<BlockId, u32> = SecondaryMap::new();
        let mut outgoing: SecondaryMap<BlockId, u32> = SecondaryMap::new();
        let mut edge_head: SecondaryMap<NodeId, Option<BlockId>> = SecondaryMap::new();
        for block in graph.blocks() {
            let preds = &graph.block(block).preds;
            incoming[block] = preds.len() as u32;
            for edge in preds {
                outgoing[edge.tail] += 1;
                edge_head[edge.terminator] = Some(block);
            }
        }

        let mut cond_proj: SecondaryMap<NodeId, [Option<NodeId>; 2]> = SecondaryMap::new();
        for id in graph.nodes() {
            if let NodeKind::Proj {
                kind: ProjKind::Control(num),
            } = graph.node(id).kind
            {
                if num == 0 || num == 1 {
                    let cond = graph.node(id).preds[0];
                    cond_proj[cond][num as usize] = Some(id);
                }
            }
        }

        Self {
            incoming,
            outgoing,
            edge_head,
            cond_proj,
        }
    }

    /// How many control edges lead into `block`.
    pub fn incoming(&self, block: BlockId) -> u32 {
        *self.incoming.get(block)
    }

    /// How many control edges leave `block`.
    pub fn outgoing(&self, block: BlockId) -> u32 {
        *self.outgoing.get(block)
    }

    /// Whether the edge from `tail` into `head` is critical: `tail` has more than one successor
    /// and `head` has more than one predecessor. Such an edge cannot host φ-copies directly and
    /// needs an inserted block.
    pub fn is_critical(&self, tail: BlockId, head: BlockId) -> bool {
        self.outgoing(tail) > 1 && self.incoming(head) > 1
    }

    /// The block a terminator node (`Jmp`, or a well-formed `Proj{Control}`) leads into.
    pub fn edge_head(&self, terminator: NodeId) -> Option<BlockId> {
        *self.edge_head.get(terminator)
    }

    /// `cond`'s `Proj{Control(num)}` child, if one was wired.
    pub fn cond_projection(&self, cond: NodeId, num: u32) -> Option<NodeId> {
        if num > 1 {
            return None;
        }
        self.cond_proj.get(cond)[num as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::builder::GraphBuilder;
    use crate::width::Width;

    #[test]
    fn straight_line_has_no_critical_edges() {
        let mut b = GraphBuilder::new();
        let entry = b.start_block();
        let seven = b.const_(entry, 7, Width::Bit32);
        let mem = b.mem_from_start();
        b.ret(entry, mem, Some(seven));
        let graph = b.finish();

        let cfg = FlowGraph::compute(&graph);
        assert_eq!(cfg.incoming(entry), 0);
        assert_eq!(cfg.outgoing(entry), 0);
    }

    #[test]
    fn diamond_true_edge_is_critical_when_join_has_a_phi() {
        let mut b = GraphBuilder::new();
        let entry = b.start_block();
        let then_blk = b.create_block();
        let else_blk = b.create_block();
        let join = b.create_block();

        let a = b.param(0, Width::Bit32);
        let zero = b.const_(entry, 0, Width::Bit32);
        let cmp = b.cmp(entry, a, zero, crate::relation::Relation::Less);
        let (f, t) = b.cond(entry, cmp);
        b.connect(f, entry, else_blk);
        b.connect(t, entry, then_blk);

        let jt = b.jmp(then_blk, join);
        let je = b.jmp(else_blk, join);
        b.connect(jt, then_blk, join);
        b.connect(je, else_blk, join);

        let graph = b.finish();
        let cfg = FlowGraph::compute(&graph);

        assert_eq!(cfg.outgoing(entry), 2);
        assert_eq!(cfg.incoming(join), 2);
        assert!(cfg.is_critical(entry, then_blk));
        assert!(cfg.is_critical(entry, else_blk));
        assert!(!cfg.is_critical(then_blk, join));
        assert!(!cfg.is_critical(else_blk, join));

        assert_eq!(cfg.edge_head(jt), Some(join));
        assert_eq!(cfg.edge_head(je), Some(join));
        assert_eq!(cfg.edge_head(f), Some(else_blk));
        assert_eq!(cfg.edge_head(t), Some(then_blk));

        let cond_id = graph.node(f).preds[0];
        assert_eq!(cfg.cond_projection(cond_id, 0), Some(f));
        assert_eq!(cfg.cond_projection(cond_id, 1), Some(t));
    }
}
