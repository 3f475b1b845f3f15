//! Node and block data carried by the source graph.

use crate::relation::Relation;
use crate::source::entities::{BlockId, MethodRef, NodeId};
use crate::width::Width;
use smallvec::SmallVec;

/// What a `Proj` node projects out of its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjKind {
    /// The `n`th formal parameter, projected off `Start`.
    Param(u32),
    /// The incoming memory state, projected off `Start`.
    MemoryFromStart,
    /// The memory result of a side-effecting node (`Load`, `Store`, `Div`, `Mod`, `Call`).
    Memory,
    /// The value result of a multi-result node (`Div`, `Mod`, `Call`).
    Value,
    /// A control successor of `Cond`: `0` is the false edge, `1` is the true edge. Any other
    /// number is malformed and is rejected at lowering time.
    Control(u32),
}

/// The kind-specific shape of a source-graph node.
///
/// Operand order is fixed per kind and documented on each variant; `Node::preds` holds the
/// operands in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The unique entry node of the method.
    Start,
    /// The unique exit node of the method. `keep_alive` lists nodes kept alive across
    /// otherwise-unreachable control (e.g. infinite loops) purely so the DFS from `End` still
    /// visits them.
    End {
        /// Extra roots the lowering DFS must also traverse.
        keep_alive: SmallVec<[NodeId; 2]>,
    },
    /// An integer constant. Never lowered eagerly; materialized at each use site.
    Const {
        /// The constant's value, reinterpreted according to the node's `mode`.
        value: i64,
    },
    /// Projects a component out of a multi-result or multi-successor node. Operand 0 (`preds[0]`)
    /// is the projected-from node.
    Proj {
        /// Which component this projection extracts.
        kind: ProjKind,
    },
    /// `preds = [lhs, rhs]`.
    Add,
    /// `preds = [lhs, rhs]`.
    Sub,
    /// `preds = [lhs, rhs]`.
    Mul,
    /// `preds = [lhs, rhs]`.
    And,
    /// `preds = [lhs, rhs]`.
    Xor,
    /// `preds = [lhs, rhs]`.
    Shl,
    /// `preds = [lhs, rhs]`.
    Shr,
    /// `preds = [lhs, rhs]`, arithmetic (sign-preserving) right shift.
    Shrs,
    /// `preds = [x]`; unary negation.
    Minus,
    /// `preds = [x]`; boolean complement.
    Not,
    /// `preds = [x]`; only `Is -> Ls` (32 -> 64 sign extend) is supported.
    Conv {
        /// Operand mode.
        from: Width,
        /// Result mode.
        to: Width,
    },
    /// `preds = [lhs, rhs]`.
    Cmp {
        /// The tested relation.
        relation: Relation,
    },
    /// `preds = [selector]`; the selector chain is `Cmp` or `Not*Cmp`.
    Cond,
    /// Unconditional jump to `target`. `preds` is empty.
    Jmp {
        /// The unique successor block.
        target: BlockId,
    },
    /// `preds = [mem]` or `preds = [mem, value]`.
    Return,
    /// `preds = [ptr, mem]`.
    Load {
        /// Width of the loaded value.
        width: Width,
    },
    /// `preds = [ptr, value, mem]`.
    Store {
        /// Width of the stored value.
        width: Width,
    },
    /// `preds = [mem, lhs, rhs]`.
    Div,
    /// `preds = [mem, lhs, rhs]`.
    Mod,
    /// `preds = [mem, arg0, arg1, ...]`. Resolved against
    /// `SourceGraph::method_references`; absent entries with `preds.len() == 2` (one memory
    /// operand plus one size argument) are allocation calls.
    Call,
    /// `preds`, one per predecessor block of the owning block, in the same order as
    /// `BlockData::preds`.
    Phi,
    /// A node of unreachable/unknown provenance. Lowers to a zero immediate.
    Unknown,
}

/// A node in the source graph.
#[derive(Clone, Debug)]
pub struct Node {
    /// The block this node is pinned to. Meaningless for `Const`, which is rematerialized at
    /// each use instead of being lowered from its pinned location.
    pub block: BlockId,
    /// The node's kind, including any kind-specific attributes.
    pub kind: NodeKind,
    /// Operands, in the kind-specific order documented on `NodeKind`.
    pub preds: SmallVec<[NodeId; 4]>,
    /// The value mode (bit width) this node produces, if any.
    pub mode: Width,
    /// Resolved callee for a `Call` node; absent means an allocation call. Ignored for every
    /// other kind.
    pub method: Option<MethodRef>,
}

impl Node {
    /// Is this node a (value- or memory-typed) `Phi`?
    pub fn is_phi(&self) -> bool {
        matches!(self.kind, NodeKind::Phi)
    }
}

/// A control edge into a block: the tail block plus the node that produced the edge (a `Jmp` or
/// a `Proj` off a `Cond`). Mirrors the teacher's own `(Ebb, Inst)` predecessor tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlEdge {
    /// The predecessor block.
    pub tail: BlockId,
    /// The node (within `tail`) that produced this edge.
    pub terminator: NodeId,
}

/// Per-block bookkeeping in the source graph.
#[derive(Clone, Debug, Default)]
pub struct BlockData {
    /// Predecessor edges, in the order that `Phi` operands in this block are indexed by.
    pub preds: Vec<ControlEdge>,
}
