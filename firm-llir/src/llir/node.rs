//! The LLIR node hierarchy.
//!
//! The source system models this as a deep class hierarchy (`LlirNode` -> `RegisterNode` ->
//! specific ops, with cross-cutting `SideEffect`/`ControlFlowTerminator` interfaces). Here it is
//! one tagged union (`LlirNodeKind`) plus capability predicates driven by the tag, the same
//! re-modeling the teacher itself uses for `InstructionData`/`Opcode`.

use crate::llir::entities::{BasicBlockId, LlirNodeId, VirtualRegister};
use crate::relation::Relation;
use crate::source::MethodRef;
use smallvec::SmallVec;
use std::fmt;

/// An abstract memory address. The source system allows richer addressing; this core only ever
/// needs the minimum form a `base` pointer register supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryLocation {
    /// `[base]`
    Base(VirtualRegister),
}

impl MemoryLocation {
    /// The register operands this address expression reads.
    pub fn registers(&self) -> SmallVec<[VirtualRegister; 1]> {
        match self {
            MemoryLocation::Base(r) => SmallVec::from_buf([*r]),
        }
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryLocation::Base(r) => write!(f, "[{}]", r),
        }
    }
}

/// What a `Call` node invokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallTarget {
    /// A statically resolved method.
    Method(MethodRef),
    /// A runtime allocation (no `methodReferences` entry, two-argument call form).
    Alloc,
}

/// The kind-specific shape and operands of an LLIR node.
///
/// Register operands are named fields; side-effecting kinds additionally carry a `mem_in`
/// pointing at the defining memory-chain node (another node in the same block, or the block's
/// `MemoryInput`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlirNodeKind {
    /// Loads an immediate into the node's register.
    MovImmediate {
        /// The immediate value, reinterpreted per the destination width.
        value: i64,
    },
    /// Copies another register's value.
    MovRegister {
        /// Source register.
        src: VirtualRegister,
    },
    /// Sign-extends a 32-bit register into a 64-bit one.
    MovSignExtend {
        /// Source (32-bit) register.
        src: VirtualRegister,
    },
    /// `dst = lhs + rhs`.
    Add(VirtualRegister, VirtualRegister),
    /// `dst = lhs - rhs`.
    Sub(VirtualRegister, VirtualRegister),
    /// `dst = lhs * rhs`.
    Mul(VirtualRegister, VirtualRegister),
    /// `dst = lhs & rhs`.
    And(VirtualRegister, VirtualRegister),
    /// `dst = lhs ^ rhs`.
    Xor(VirtualRegister, VirtualRegister),
    /// `dst = lhs << rhs`.
    ShiftLeft(VirtualRegister, VirtualRegister),
    /// `dst = lhs >> rhs`, logical.
    ShiftRight(VirtualRegister, VirtualRegister),
    /// `dst = lhs >> rhs`, arithmetic.
    ArithShiftRight(VirtualRegister, VirtualRegister),
    /// A load; both register-producing (the loaded value) and side-effecting (reads `mem_in`,
    /// produces an updated memory token that is this same node).
    MovLoad {
        /// The address loaded from.
        addr: MemoryLocation,
        /// The memory state this load observes.
        mem_in: LlirNodeId,
    },
    /// A store; side-effecting only, no destination register.
    MovStore {
        /// The address stored to.
        addr: MemoryLocation,
        /// The stored value.
        value: VirtualRegister,
        /// The memory state this store observes.
        mem_in: LlirNodeId,
    },
    /// Division; both register- and side-effect-producing (division can trap).
    Div {
        /// Dividend.
        lhs: VirtualRegister,
        /// Divisor.
        rhs: VirtualRegister,
        /// The memory state this division observes.
        mem_in: LlirNodeId,
    },
    /// Remainder; same shape as `Div`.
    Mod {
        /// Dividend.
        lhs: VirtualRegister,
        /// Divisor.
        rhs: VirtualRegister,
        /// The memory state this division observes.
        mem_in: LlirNodeId,
    },
    /// A call (method invocation or allocation); both register- and side-effect-producing.
    Call {
        /// The callee.
        target: CallTarget,
        /// The memory state this call observes.
        mem_in: LlirNodeId,
        /// Argument registers, memory/pointer predecessors already excluded.
        args: SmallVec<[VirtualRegister; 4]>,
    },
    /// A block-local alias for a virtual register produced in a different block.
    Input {
        /// The register this block receives from a predecessor.
        reg: VirtualRegister,
    },
    /// The distinguished per-block incoming memory state.
    MemoryInput,
    /// A comparison; never materialized stand-alone, only as the direct predicate of a `Branch`
    /// in the same block.
    Cmp {
        /// The tested relation.
        relation: Relation,
        /// Left operand.
        lhs: VirtualRegister,
        /// Right operand.
        rhs: VirtualRegister,
    },
    /// Unconditional control transfer.
    Jump {
        /// The unique successor block.
        target: BasicBlockId,
    },
    /// Conditional control transfer, driven by a same-block `Cmp`.
    Branch {
        /// The `Cmp` node (in this block) supplying the predicate.
        cmp: LlirNodeId,
        /// Successor when the comparison holds.
        true_block: BasicBlockId,
        /// Successor when the comparison does not hold.
        false_block: BasicBlockId,
    },
    /// Return from the method, with an optional value.
    Return {
        /// The returned value, if any.
        value: Option<VirtualRegister>,
    },
}

impl LlirNodeKind {
    /// Does this node produce a value in a register (`LlirNode::dst.is_some()`)?
    pub fn produces_value(&self) -> bool {
        use LlirNodeKind::*;
        matches!(
            self,
            MovImmediate { .. }
                | MovRegister { .. }
                | MovSignExtend { .. }
                | Add(..)
                | Sub(..)
                | Mul(..)
                | And(..)
                | Xor(..)
                | ShiftLeft(..)
                | ShiftRight(..)
                | ArithShiftRight(..)
                | MovLoad { .. }
                | Div { .. }
                | Mod { .. }
                | Call { .. }
                | Input { .. }
        )
    }

    /// Does this node carry a memory side-effect (consumes a `mem_in`, or is the `MemoryInput`
    /// itself)?
    pub fn is_side_effect(&self) -> bool {
        use LlirNodeKind::*;
        matches!(
            self,
            MovLoad { .. } | MovStore { .. } | Div { .. } | Mod { .. } | Call { .. } | MemoryInput
        )
    }

    /// Is this node a control-flow terminator?
    pub fn is_terminator(&self) -> bool {
        use LlirNodeKind::*;
        matches!(self, Jump { .. } | Branch { .. } | Return { .. })
    }

    /// Is this an `Input` node?
    pub fn is_input(&self) -> bool {
        matches!(self, LlirNodeKind::Input { .. })
    }

    /// This node's incoming memory-chain predecessor, if it has one.
    pub fn mem_in(&self) -> Option<LlirNodeId> {
        use LlirNodeKind::*;
        match self {
            MovLoad { mem_in, .. }
            | MovStore { mem_in, .. }
            | Div { mem_in, .. }
            | Mod { mem_in, .. }
            | Call { mem_in, .. } => Some(*mem_in),
            _ => None,
        }
    }

    /// Every register this node reads (not including `dst`).
    pub fn register_operands(&self) -> SmallVec<[VirtualRegister; 4]> {
        use LlirNodeKind::*;
        let mut out = SmallVec::new();
        match self {
            MovRegister { src } | MovSignExtend { src } => out.push(*src),
            Add(a, b) | Sub(a, b) | Mul(a, b) | And(a, b) | Xor(a, b) | ShiftLeft(a, b)
            | ShiftRight(a, b) | ArithShiftRight(a, b) => {
                out.push(*a);
                out.push(*b);
            }
            MovLoad { addr, .. } => out.extend(addr.registers()),
            MovStore { addr, value, .. } => {
                out.extend(addr.registers());
                out.push(*value);
            }
            Div { lhs, rhs, .. } | Mod { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            Call { args, .. } => out.extend(args.iter().copied()),
            Cmp { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            Return { value: Some(v) } => out.push(*v),
            MovImmediate { .. }
            | Input { .. }
            | MemoryInput
            | Jump { .. }
            | Branch { .. }
            | Return { value: None } => {}
        }
        out
    }
}

/// A single LLIR node: a kind plus, for register-producing kinds, the register it defines.
#[derive(Clone, Debug)]
pub struct LlirNode {
    /// The node's kind and operands.
    pub kind: LlirNodeKind,
    /// The register this node defines, if `kind.produces_value()`.
    pub dst: Option<VirtualRegister>,
}

impl LlirNode {
    pub(crate) fn new(kind: LlirNodeKind, dst: Option<VirtualRegister>) -> Self {
        debug_assert_eq!(kind.produces_value(), dst.is_some());
        Self { kind, dst }
    }
}
