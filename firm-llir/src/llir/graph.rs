//! The LLIR graph: the lowering target. A global node arena plus a per-block ordering/owner
//! split, the same shape the teacher uses for `Function { dfg, layout }`.

use crate::llir::block::BasicBlock;
use crate::llir::entities::{BasicBlockId, LlirNodeId, VirtualRegister};
use crate::llir::node::{LlirNode, LlirNodeKind};
use crate::llir::regs::VirtualRegisterGenerator;
use crate::width::Width;
use llir_entity::{PrimaryMap, SecondaryMap};

/// One method's lowered LLIR: every node, every block, and the register generator that minted
/// them.
pub struct LlirGraph {
    nodes: PrimaryMap<LlirNodeId, LlirNode>,
    owner: SecondaryMap<LlirNodeId, Option<BasicBlockId>>,
    blocks: PrimaryMap<BasicBlockId, BasicBlock>,
    start_block: BasicBlockId,
    regs: VirtualRegisterGenerator,
}

impl LlirGraph {
    /// Create an empty graph with a single (empty) start block.
    pub fn new() -> Self {
        let mut blocks: PrimaryMap<BasicBlockId, BasicBlock> = PrimaryMap::new();
        let start_block = blocks.next_key();
        blocks.push(BasicBlock::new(start_block));
        Self {
            nodes: PrimaryMap::new(),
            owner: SecondaryMap::new(),
            blocks,
            start_block,
            regs: VirtualRegisterGenerator::new(),
        }
    }

    /// The graph's unique entry block.
    pub fn start_block(&self) -> BasicBlockId {
        self.start_block
    }

    /// Allocate a fresh, unattached basic block.
    pub fn make_block(&mut self) -> BasicBlockId {
        let id = self.blocks.next_key();
        self.blocks.push(BasicBlock::new(id));
        id
    }

    /// Borrow a block.
    pub fn block(&self, id: BasicBlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    /// Mutably borrow a block.
    pub fn block_mut(&mut self, id: BasicBlockId) -> &mut BasicBlock {
        &mut self.blocks[id]
    }

    /// Iterate over every block id, in allocation order.
    pub fn block_ids(&self) -> impl Iterator<Item = BasicBlockId> + '_ {
        self.blocks.keys()
    }

    /// How many blocks exist.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Borrow a node.
    pub fn node(&self, id: LlirNodeId) -> &LlirNode {
        &self.nodes[id]
    }

    /// Iterate over every node id, in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = LlirNodeId> + '_ {
        self.nodes.keys()
    }

    /// Which block a node was appended to, if any (φ-resolution temporaries created before their
    /// placement block is known start with no owner).
    pub fn owner(&self, id: LlirNodeId) -> Option<BasicBlockId> {
        *self.owner.get(id)
    }

    /// Allocate a fresh virtual register.
    pub fn make_register(&mut self, width: Width) -> VirtualRegister {
        self.regs.make(width)
    }

    /// How many registers have been allocated.
    pub fn register_count(&self) -> u32 {
        self.regs.count()
    }

    /// Create a value-producing node, minting a fresh register of `width` for its destination,
    /// and append it to `block` at the tail. Returns the node and the register it defines.
    pub fn append_value(
        &mut self,
        block: BasicBlockId,
        kind: LlirNodeKind,
        width: Width,
    ) -> (LlirNodeId, VirtualRegister) {
        debug_assert!(kind.produces_value());
        let reg = self.regs.make(width);
        let id = self.append_with_dst(block, kind, Some(reg));
        (id, reg)
    }

    /// Create a side-effect-only (or control, pre-terminator) node with no destination register,
    /// and append it to `block` at the tail.
    pub fn append_effect(&mut self, block: BasicBlockId, kind: LlirNodeKind) -> LlirNodeId {
        debug_assert!(!kind.produces_value());
        self.append_with_dst(block, kind, None)
    }

    /// Like `append`, but with a caller-chosen (or absent) destination register — used when the
    /// node's width is narrower than the default, or the node is an `Input`/`MemoryInput` that
    /// aliases an existing register rather than minting one.
    pub fn append_with_dst(
        &mut self,
        block: BasicBlockId,
        kind: LlirNodeKind,
        dst: Option<VirtualRegister>,
    ) -> LlirNodeId {
        debug_assert!(!kind.is_terminator());
        debug_assert_eq!(kind.produces_value(), dst.is_some());
        let id = self.nodes.push(LlirNode::new(kind, dst));
        self.owner[id] = Some(block);
        self.blocks[block].push(id, dst);
        id
    }

    /// Insert a φ-copy node immediately before `block`'s terminator.
    pub fn insert_before_terminator(
        &mut self,
        block: BasicBlockId,
        kind: LlirNodeKind,
        dst: Option<VirtualRegister>,
    ) -> LlirNodeId {
        debug_assert!(!kind.is_terminator());
        debug_assert_eq!(kind.produces_value(), dst.is_some());
        let id = self.nodes.push(LlirNode::new(kind, dst));
        self.owner[id] = Some(block);
        self.blocks[block].insert_before_terminator(id, dst);
        id
    }

    /// Create an `Input` node at the head of `block`, aliasing `reg`.
    pub fn make_input(&mut self, block: BasicBlockId, reg: VirtualRegister) -> LlirNodeId {
        let id = self
            .nodes
            .push(LlirNode::new(LlirNodeKind::Input { reg }, Some(reg)));
        self.owner[id] = Some(block);
        self.blocks[block].push(id, Some(reg));
        self.blocks[block].record_input(reg, id);
        id
    }

    /// Create the `MemoryInput` node for `block`.
    pub fn make_memory_input(&mut self, block: BasicBlockId) -> LlirNodeId {
        let id = self.nodes.push(LlirNode::new(LlirNodeKind::MemoryInput, None));
        self.owner[id] = Some(block);
        self.blocks[block].push(id, None);
        self.blocks[block].set_memory_input(id);
        id
    }

    /// Set `block`'s terminator.
    pub fn set_terminator(&mut self, block: BasicBlockId, kind: LlirNodeKind) -> LlirNodeId {
        debug_assert!(kind.is_terminator());
        let id = self.nodes.push(LlirNode::new(kind, None));
        self.owner[id] = Some(block);
        self.blocks[block].set_terminator(id);
        id
    }

    /// Overwrite an existing terminator's payload in place (used by critical-edge rewriting,
    /// which must keep the terminator's node id stable while redirecting one successor).
    pub fn rewrite_terminator(&mut self, id: LlirNodeId, kind: LlirNodeKind) {
        debug_assert!(kind.is_terminator());
        debug_assert!(self.nodes[id].kind.is_terminator());
        self.nodes[id].kind = kind;
    }

    /// Mark `reg` (defined by `node`) as live out of `block`.
    pub fn mark_output(&mut self, block: BasicBlockId, node: LlirNodeId) {
        self.blocks[block].add_output(node);
    }

    /// Record that `after` must be scheduled before `before` within `block`.
    pub fn add_schedule_dep(&mut self, block: BasicBlockId, after: LlirNodeId, before: LlirNodeId) {
        self.blocks[block].add_schedule_dep(after, before);
    }

    /// Close every `Finished` block off from further mutation. Blocks that are already
    /// `Finalized` (a second call, or one that never got a terminator) are left untouched, which
    /// is what makes calling this more than once a no-op.
    pub fn finalize(&mut self) {
        for block in self.blocks.values_mut() {
            if block.state() == crate::llir::BlockState::Finished {
                block.finalize();
            }
        }
    }
}

impl Default for LlirGraph {
    fn default() -> Self {
        Self::new()
    }
}
