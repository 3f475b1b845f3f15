//! The source graph: the SSA sea-of-nodes input this core lowers from.

pub mod builder;
mod entities;
mod graph;
mod node;

pub use entities::{BlockId, MethodRef, NodeId};
pub use graph::{BackEdges, MethodDescriptor, MethodGraph, Program, SourceGraph};
pub use node::{BlockData, ControlEdge, Node, NodeKind, ProjKind};
