//! SSA-to-LLIR lowering core.
//!
//! Translates a sea-of-nodes source graph (see [`source`]) into a block-structured low-level IR
//! (see [`llir`]): φ-nodes are resolved into accumulator registers and per-predecessor copies,
//! critical edges are split lazily, and the memory chain is threaded through explicit per-block
//! `MemoryInput`/output edges. [`context::FirmToLlir`] is the entry point; [`settings::Options`]
//! configures a run.

#![deny(missing_docs)]

mod context;
mod finalize;
mod flowgraph;
mod llir;
mod lowering;
mod phi_prepass;
mod phi_resolver;
mod print_errors;
mod relation;
mod result;
mod settings;
mod source;
mod verifier;
mod width;
mod write;

pub use context::{FirmToLlir, LoweredMethod};
pub use llir::{
    BasicBlock, BasicBlockId, BlockState, CallTarget, LlirGraph, LlirNode, LlirNodeId,
    LlirNodeKind, MemoryLocation, ScheduleDependency, VirtualRegister,
};
pub use print_errors::pretty_error;
pub use relation::Relation;
pub use result::{LoweringError, LoweringResult};
pub use settings::{Options, OptionsBuilder};
pub use source::{
    builder::GraphBuilder, BackEdges, BlockData, BlockId, ControlEdge, MethodDescriptor,
    MethodGraph, MethodRef, Node, NodeId, NodeKind, Program, ProjKind, SourceGraph,
};
pub use verifier::{verify as verify_llir_graph, Location, PhiAccumulator, VerifierError, VerifierErrors};
pub use width::Width;
pub use write::write_llir_graph;
