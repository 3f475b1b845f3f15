//! Entity references into the source graph.

use llir_entity::entity_impl;
#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// A reference to a node in the source (sea-of-nodes) graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct NodeId(u32);
entity_impl!(NodeId, "node");

/// A reference to a block in the source graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct BlockId(u32);
entity_impl!(BlockId, "block");

/// A reference to a resolved callee, looked up through `SourceGraph::method_references`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct MethodRef(u32);
entity_impl!(MethodRef, "method");
