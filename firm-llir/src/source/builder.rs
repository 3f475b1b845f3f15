//! A minimal in-memory builder for `SourceGraph`s.
//!
//! This stands in for the upstream SSA optimizer (out of scope per the core's charter) well
//! enough to hand-construct the scenarios this crate's own tests exercise. It is not a general
//! SSA-construction facility: callers are responsible for wiring predecessors, control edges and
//! `Phi` operand order consistently, exactly as a real optimizer's output would already be.

use crate::relation::Relation;
use crate::source::entities::{BlockId, MethodRef, NodeId};
use crate::source::graph::{MethodDescriptor, SourceGraph};
use crate::source::node::{BlockData, ControlEdge, Node, NodeKind, ProjKind};
use crate::width::Width;
use llir_entity::PrimaryMap;
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;

/// Incrementally builds a `SourceGraph`.
pub struct GraphBuilder {
    nodes: PrimaryMap<NodeId, Node>,
    blocks: PrimaryMap<BlockId, BlockData>,
    start_block: BlockId,
    end_block: BlockId,
    start_node: NodeId,
    end_node: NodeId,
    method_references: HashMap<NodeId, MethodRef>,
    method_descriptors: PrimaryMap<MethodRef, MethodDescriptor>,
}

impl GraphBuilder {
    /// Create a builder already seeded with a `Start` node/block and an `End` node/block.
    pub fn new() -> Self {
        let mut blocks = PrimaryMap::new();
        let start_block = blocks.push(BlockData::default());
        let end_block = blocks.push(BlockData::default());

        let mut nodes = PrimaryMap::new();
        let start_node = nodes.push(Node {
            block: start_block,
            kind: NodeKind::Start,
            preds: SmallVec::new(),
            mode: Width::Bit64,
            method: None,
        });
        let end_node = nodes.push(Node {
            block: end_block,
            kind: NodeKind::End {
                keep_alive: SmallVec::new(),
            },
            preds: SmallVec::new(),
            mode: Width::Bit64,
            method: None,
        });

        Self {
            nodes,
            blocks,
            start_block,
            end_block,
            start_node,
            end_node,
            method_references: HashMap::new(),
            method_descriptors: PrimaryMap::new(),
        }
    }

    /// The implicit start block.
    pub fn start_block(&self) -> BlockId {
        self.start_block
    }

    /// The implicit end block.
    pub fn end_block(&self) -> BlockId {
        self.end_block
    }

    /// The unique `Start` node.
    pub fn start_node(&self) -> NodeId {
        self.start_node
    }

    /// Allocate a fresh, empty block.
    pub fn create_block(&mut self) -> BlockId {
        self.blocks.push(BlockData::default())
    }

    fn push_node(
        &mut self,
        block: BlockId,
        kind: NodeKind,
        preds: &[NodeId],
        mode: Width,
    ) -> NodeId {
        self.nodes.push(Node {
            block,
            kind,
            preds: preds.iter().copied().collect(),
            mode,
            method: None,
        })
    }

    /// Record a control edge: `terminator` (a `Jmp` or a `Proj` off a `Cond`), which lives in
    /// `tail`, transfers control into `head`. `Phi`s in `head` index their operands by the order
    /// edges are connected in, so callers must connect edges in the order they intend operand 0,
    /// operand 1, ... to correspond to.
    pub fn connect(&mut self, terminator: NodeId, tail: BlockId, head: BlockId) {
        self.blocks[head].preds.push(ControlEdge { tail, terminator });
    }

    /// Project the `index`th formal parameter off `Start`.
    pub fn param(&mut self, index: u32, width: Width) -> NodeId {
        let start_block = self.start_block;
        let start_node = self.start_node;
        self.push_node(
            start_block,
            NodeKind::Proj {
                kind: ProjKind::Param(index),
            },
            &[start_node],
            width,
        )
    }

    /// Project the incoming memory state off `Start`.
    pub fn mem_from_start(&mut self) -> NodeId {
        let start_block = self.start_block;
        let start_node = self.start_node;
        self.push_node(
            start_block,
            NodeKind::Proj {
                kind: ProjKind::MemoryFromStart,
            },
            &[start_node],
            Width::Bit64,
        )
    }

    /// An integer constant, pinned to `block` (irrelevant to where it's materialized).
    pub fn const_(&mut self, block: BlockId, value: i64, width: Width) -> NodeId {
        self.push_node(block, NodeKind::Const { value }, &[], width)
    }

    /// `Unknown` node, lowers to a zero immediate.
    pub fn unknown(&mut self, block: BlockId, width: Width) -> NodeId {
        self.push_node(block, NodeKind::Unknown, &[], width)
    }

    fn binary(
        &mut self,
        block: BlockId,
        kind: NodeKind,
        lhs: NodeId,
        rhs: NodeId,
        width: Width,
    ) -> NodeId {
        self.push_node(block, kind, &[lhs, rhs], width)
    }

    /// `lhs + rhs`.
    pub fn add(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::Add, lhs, rhs, width)
    }

    /// `lhs - rhs`.
    pub fn sub(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::Sub, lhs, rhs, width)
    }

    /// `lhs * rhs`.
    pub fn mul(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::Mul, lhs, rhs, width)
    }

    /// `lhs & rhs`.
    pub fn and(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::And, lhs, rhs, width)
    }

    /// `lhs ^ rhs`.
    pub fn xor(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::Xor, lhs, rhs, width)
    }

    /// `lhs << rhs`.
    pub fn shl(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::Shl, lhs, rhs, width)
    }

    /// `lhs >> rhs`, logical.
    pub fn shr(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::Shr, lhs, rhs, width)
    }

    /// `lhs >> rhs`, arithmetic.
    pub fn shrs(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.binary(block, NodeKind::Shrs, lhs, rhs, width)
    }

    /// `-x`.
    pub fn minus(&mut self, block: BlockId, x: NodeId, width: Width) -> NodeId {
        self.push_node(block, NodeKind::Minus, &[x], width)
    }

    /// `!x`.
    pub fn not(&mut self, block: BlockId, x: NodeId, width: Width) -> NodeId {
        self.push_node(block, NodeKind::Not, &[x], width)
    }

    /// `(long) x`, the only supported conversion.
    pub fn conv_widen(&mut self, block: BlockId, x: NodeId) -> NodeId {
        self.push_node(
            block,
            NodeKind::Conv {
                from: Width::Bit32,
                to: Width::Bit64,
            },
            &[x],
            Width::Bit64,
        )
    }

    /// An unsupported conversion, for exercising `UnsupportedConversion`.
    pub fn conv_unsupported(&mut self, block: BlockId, x: NodeId, from: Width, to: Width) -> NodeId {
        self.push_node(block, NodeKind::Conv { from, to }, &[x], to)
    }

    /// `lhs <relation> rhs`.
    pub fn cmp(&mut self, block: BlockId, lhs: NodeId, rhs: NodeId, relation: Relation) -> NodeId {
        self.push_node(block, NodeKind::Cmp { relation }, &[lhs, rhs], Width::Bit8)
    }

    /// A `Cond` over `selector`, returning `(false_proj, true_proj)`.
    pub fn cond(&mut self, block: BlockId, selector: NodeId) -> (NodeId, NodeId) {
        let cond = self.push_node(block, NodeKind::Cond, &[selector], Width::Bit8);
        let f = self.push_node(
            block,
            NodeKind::Proj {
                kind: ProjKind::Control(0),
            },
            &[cond],
            Width::Bit8,
        );
        let t = self.push_node(
            block,
            NodeKind::Proj {
                kind: ProjKind::Control(1),
            },
            &[cond],
            Width::Bit8,
        );
        (f, t)
    }

    /// A malformed control projection (number outside `{0,1}`), for exercising
    /// `MalformedControlProjection`.
    pub fn cond_malformed_proj(&mut self, block: BlockId, selector: NodeId, num: u32) -> NodeId {
        let cond = self.push_node(block, NodeKind::Cond, &[selector], Width::Bit8);
        self.push_node(
            block,
            NodeKind::Proj {
                kind: ProjKind::Control(num),
            },
            &[cond],
            Width::Bit8,
        )
    }

    /// An unconditional jump to `target`, pinned to `block`.
    pub fn jmp(&mut self, block: BlockId, target: BlockId) -> NodeId {
        self.push_node(block, NodeKind::Jmp { target }, &[], Width::Bit8)
    }

    /// A `return`, with an optional value. Automatically wired as a predecessor of `End`, the
    /// same way every other terminator reaches its successor.
    pub fn ret(&mut self, block: BlockId, mem: NodeId, value: Option<NodeId>) -> NodeId {
        let mut preds: SmallVec<[NodeId; 4]> = smallvec![mem];
        if let Some(v) = value {
            preds.push(v);
        }
        let ret = self.nodes.push(Node {
            block,
            kind: NodeKind::Return,
            preds,
            mode: Width::Bit64,
            method: None,
        });
        let end_node = self.end_node;
        self.nodes[end_node].preds.push(ret);
        ret
    }

    /// `*ptr`, producing a `(value, memory)` tuple accessed through `proj_value`/`proj_memory`.
    pub fn load(&mut self, block: BlockId, ptr: NodeId, mem: NodeId, width: Width) -> NodeId {
        self.push_node(block, NodeKind::Load { width }, &[ptr, mem], width)
    }

    /// `*ptr = value`, producing only a memory result (referenced directly, no `Proj` needed).
    pub fn store(
        &mut self,
        block: BlockId,
        ptr: NodeId,
        value: NodeId,
        mem: NodeId,
        width: Width,
    ) -> NodeId {
        self.push_node(block, NodeKind::Store { width }, &[ptr, value, mem], width)
    }

    /// `lhs / rhs`, producing a `(value, memory)` tuple (division can trap).
    pub fn div(&mut self, block: BlockId, mem: NodeId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.push_node(block, NodeKind::Div, &[mem, lhs, rhs], width)
    }

    /// `lhs % rhs`, producing a `(value, memory)` tuple.
    pub fn modulo(&mut self, block: BlockId, mem: NodeId, lhs: NodeId, rhs: NodeId, width: Width) -> NodeId {
        self.push_node(block, NodeKind::Mod, &[mem, lhs, rhs], width)
    }

    /// The value component of a multi-result node (`Load`, `Div`, `Mod`, `Call`).
    pub fn proj_value(&mut self, block: BlockId, of: NodeId, width: Width) -> NodeId {
        self.push_node(
            block,
            NodeKind::Proj {
                kind: ProjKind::Value,
            },
            &[of],
            width,
        )
    }

    /// The memory component of a multi-result node (`Load`, `Div`, `Mod`, `Call`).
    pub fn proj_memory(&mut self, block: BlockId, of: NodeId) -> NodeId {
        self.push_node(
            block,
            NodeKind::Proj {
                kind: ProjKind::Memory,
            },
            &[of],
            Width::Bit64,
        )
    }

    /// Declare a resolvable method, for use with `call`.
    pub fn declare_method(
        &mut self,
        name: impl Into<String>,
        params: Vec<Width>,
        ret: Option<Width>,
    ) -> MethodRef {
        self.method_descriptors.push(MethodDescriptor {
            name: name.into(),
            params,
            ret,
        })
    }

    /// A call. `method = None` means this is an allocation (and `args` must have exactly one
    /// element: the allocation size).
    pub fn call(
        &mut self,
        block: BlockId,
        mem: NodeId,
        args: &[NodeId],
        method: Option<MethodRef>,
        width: Width,
    ) -> NodeId {
        let mut preds: SmallVec<[NodeId; 4]> = smallvec![mem];
        preds.extend_from_slice(args);
        let call = self.nodes.push(Node {
            block,
            kind: NodeKind::Call,
            preds,
            mode: width,
            method,
        });
        if let Some(m) = method {
            self.method_references.insert(call, m);
        }
        call
    }

    /// A `Phi`. `operands[i]` must correspond to `head`'s `i`th connected predecessor edge.
    pub fn phi(&mut self, head: BlockId, operands: &[NodeId], width: Width) -> NodeId {
        self.push_node(head, NodeKind::Phi, operands, width)
    }

    /// Reserve a `Phi` with no operands yet, for building a mutual cycle between two φs that each
    /// reference the other: call this once per φ, then [`patch_phi_operands`](Self::patch_phi_operands)
    /// on each once every id involved is known.
    pub fn reserve_phi(&mut self, head: BlockId, width: Width) -> NodeId {
        self.push_node(head, NodeKind::Phi, &[], width)
    }

    /// Fill in a `reserve_phi`'d node's operands, in the same `operands[i]` <-> `i`th predecessor
    /// edge correspondence `phi` documents. May reference any other node, including a φ reserved
    /// earlier in the same batch, closing a cycle.
    pub fn patch_phi_operands(&mut self, phi: NodeId, operands: &[NodeId]) {
        debug_assert!(matches!(self.nodes[phi].kind, NodeKind::Phi));
        self.nodes[phi].preds = operands.iter().copied().collect();
    }

    /// A memory `Phi`, aliased to the block's memory input during lowering.
    pub fn mem_phi(&mut self, head: BlockId, operands: &[NodeId]) -> NodeId {
        self.push_node(head, NodeKind::Phi, operands, Width::Bit64)
    }

    /// Keep `node` alive across the DFS from `End` even though no ordinary data/control chain
    /// reaches it (infinite loops).
    pub fn keep_alive(&mut self, node: NodeId) {
        if let NodeKind::End { keep_alive } = &mut self.nodes[self.end_node].kind {
            keep_alive.push(node);
        }
    }

    /// Finish building and produce the `SourceGraph`.
    pub fn finish(self) -> SourceGraph {
        SourceGraph::from_parts(
            self.nodes,
            self.blocks,
            self.start_block,
            self.end_block,
            self.start_node,
            self.end_node,
            self.method_references,
            self.method_descriptors,
        )
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
