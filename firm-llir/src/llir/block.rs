//! Basic blocks: ordered node sequences plus the bookkeeping the lowering and finalization
//! passes need (liveness-free in/out registers, schedule ordering constraints, lifecycle state).

use crate::llir::entities::{BasicBlockId, LlirNodeId, VirtualRegister};
use llir_entity::EntitySet;
use std::collections::HashMap;

/// A block's position in its lifecycle. Mirrors the four stages the graph walks a block through:
/// nodes may be appended while `Building` or `Finished` (the latter only for non-terminator
/// φ-copies inserted by the resolver pass); `Finalized` is reached only by the global
/// finalization step and forbids any further mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// No nodes appended yet.
    Empty,
    /// Non-terminator nodes may still be appended; no terminator set yet.
    Building,
    /// Terminator is set. Non-terminator nodes (φ-copies) may still be appended before the
    /// terminator in program order.
    Finished,
    /// Closed by the graph's `finalize()`. `outputs`/`schedule_deps` are frozen.
    Finalized,
}

/// A constraint that `after` must be scheduled before `before` within this block, independent of
/// any data dependency between them. Used to pin φ-copies ahead of the terminator that reads
/// their destination registers, and to order calls/stores that the memory chain alone would not
/// otherwise force apart within a single block walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleDependency {
    /// The node that must come first.
    pub after: LlirNodeId,
    /// The node that must come second.
    pub before: LlirNodeId,
}

/// A basic block: an ordered node list, its boundary registers, and its lifecycle state.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    id: BasicBlockId,
    nodes: Vec<LlirNodeId>,
    /// `Input` nodes at the head of the block, keyed by the register they alias, in first-seen
    /// order. Kept as a map alongside `nodes` so lowering can ask "do we already have an `Input`
    /// for this register in this block?" without a linear scan.
    input_regs: HashMap<VirtualRegister, LlirNodeId>,
    memory_input: Option<LlirNodeId>,
    /// Registers live out of this block that some successor's φ resolution or cross-block use
    /// will need materialized as an `Input` there.
    outputs: EntitySet<LlirNodeId>,
    terminator: Option<LlirNodeId>,
    state: BlockState,
    /// The most recent node in this block to define a given register, for fast same-block
    /// value lookups during lowering.
    defines: HashMap<VirtualRegister, LlirNodeId>,
    schedule_deps: Vec<ScheduleDependency>,
}

impl BasicBlock {
    pub(crate) fn new(id: BasicBlockId) -> Self {
        Self {
            id,
            nodes: Vec::new(),
            input_regs: HashMap::new(),
            memory_input: None,
            outputs: EntitySet::new(),
            terminator: None,
            state: BlockState::Empty,
            defines: HashMap::new(),
            schedule_deps: Vec::new(),
        }
    }

    /// This block's id.
    pub fn id(&self) -> BasicBlockId {
        self.id
    }

    /// This block's lifecycle state.
    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Nodes in program order, including the terminator (last, if set).
    pub fn nodes(&self) -> &[LlirNodeId] {
        &self.nodes
    }

    /// This block's terminator node, if set.
    pub fn terminator(&self) -> Option<LlirNodeId> {
        self.terminator
    }

    /// This block's `MemoryInput` node, if materialized.
    pub fn memory_input(&self) -> Option<LlirNodeId> {
        self.memory_input
    }

    /// Registers this block exposes to successors.
    pub fn outputs(&self) -> &EntitySet<LlirNodeId> {
        &self.outputs
    }

    /// Ordering constraints recorded within this block.
    pub fn schedule_deps(&self) -> &[ScheduleDependency] {
        &self.schedule_deps
    }

    /// The existing `Input` node aliasing `reg` in this block, if one was already materialized.
    pub fn input_for(&self, reg: VirtualRegister) -> Option<LlirNodeId> {
        self.input_regs.get(&reg).copied()
    }

    /// The node most recently defining `reg` within this block, if any.
    pub fn local_define(&self, reg: VirtualRegister) -> Option<LlirNodeId> {
        self.defines.get(&reg).copied()
    }

    /// Append a non-terminator node. Valid while `Empty`, `Building`, or `Finished` (the last
    /// only for φ-copies the resolver inserts ahead of an already-set terminator).
    pub(crate) fn push(&mut self, node: LlirNodeId, dst: Option<VirtualRegister>) {
        debug_assert_ne!(self.state, BlockState::Finalized);
        self.nodes.push(node);
        if self.state == BlockState::Empty {
            self.state = BlockState::Building;
        }
        if let Some(dst) = dst {
            self.defines.insert(dst, node);
        }
    }

    /// Insert a non-terminator node immediately before the terminator. Used by the φ resolver,
    /// which only ever runs after a block's terminator has been set.
    pub(crate) fn insert_before_terminator(&mut self, node: LlirNodeId, dst: Option<VirtualRegister>) {
        debug_assert_eq!(self.state, BlockState::Finished);
        let at = self.nodes.len() - 1;
        self.nodes.insert(at, node);
        if let Some(dst) = dst {
            self.defines.insert(dst, node);
        }
    }

    /// Record an `Input` materialized for `reg` at the head of this block.
    pub(crate) fn record_input(&mut self, reg: VirtualRegister, node: LlirNodeId) {
        self.input_regs.insert(reg, node);
        self.defines.insert(reg, node);
    }

    /// Record this block's `MemoryInput` node.
    pub(crate) fn set_memory_input(&mut self, node: LlirNodeId) {
        self.memory_input = Some(node);
    }

    /// Set this block's terminator, moving it from `Building`/`Empty` to `Finished`.
    pub(crate) fn set_terminator(&mut self, node: LlirNodeId) {
        debug_assert!(self.terminator.is_none());
        self.nodes.push(node);
        self.terminator = Some(node);
        self.state = BlockState::Finished;
    }

    /// Mark a register as live out of this block.
    pub(crate) fn add_output(&mut self, node: LlirNodeId) {
        self.outputs.insert(node);
    }

    /// Record that `after` must be scheduled before `before` in this block.
    pub(crate) fn add_schedule_dep(&mut self, after: LlirNodeId, before: LlirNodeId) {
        self.schedule_deps.push(ScheduleDependency { after, before });
    }

    /// Close this block off from further mutation.
    pub(crate) fn finalize(&mut self) {
        debug_assert_eq!(self.state, BlockState::Finished);
        self.state = BlockState::Finalized;
    }
}
