//! The source (sea-of-nodes) graph: the input contract this core lowers from.

use crate::source::entities::{BlockId, MethodRef, NodeId};
use crate::source::node::{BlockData, Node, NodeKind, ProjKind};
use crate::width::Width;
use llir_entity::{EntitySet, PrimaryMap, SecondaryMap};
use std::collections::HashMap;

/// A resolved callee, as looked up through `SourceGraph::method_references`.
#[derive(Clone, Debug)]
pub struct MethodDescriptor {
    /// The callee's name, for diagnostics only.
    pub name: String,
    /// Parameter widths, in declaration order.
    pub params: Vec<Width>,
    /// Return width, if any.
    pub ret: Option<Width>,
}

/// Back-edge (use) information for a source graph.
///
/// Mirrors the upstream optimizer's `BackEdges` facility: the core enables it once per method
/// before lowering and disables it again at teardown, rather than keeping it live permanently
/// (the upstream graph may be edited by other passes between methods).
#[derive(Clone, Debug, Default)]
pub struct BackEdges {
    uses: SecondaryMap<NodeId, Vec<NodeId>>,
    enabled: bool,
}

impl BackEdges {
    fn compute(nodes: &PrimaryMap<NodeId, Node>) -> Self {
        let mut uses: SecondaryMap<NodeId, Vec<NodeId>> = SecondaryMap::new();
        uses.resize(nodes.len());
        for (id, node) in nodes.iter() {
            for &pred in &node.preds {
                uses[pred].push(id);
            }
        }
        Self {
            uses,
            enabled: true,
        }
    }

    /// The nodes that use `node` as an operand, in node-id order (insertion order of the
    /// underlying arena, which is itself monotonic).
    pub fn uses(&self, node: NodeId) -> &[NodeId] {
        debug_assert!(self.enabled, "BackEdges queried before being enabled");
        self.uses.get(node)
    }
}

/// A single method's SSA sea-of-nodes graph.
pub struct SourceGraph {
    nodes: PrimaryMap<NodeId, Node>,
    blocks: PrimaryMap<BlockId, BlockData>,
    start_block: BlockId,
    end_block: BlockId,
    start_node: NodeId,
    end_node: NodeId,
    method_references: HashMap<NodeId, MethodRef>,
    method_descriptors: PrimaryMap<MethodRef, MethodDescriptor>,
    back_edges: Option<BackEdges>,
}

impl SourceGraph {
    pub(crate) fn from_parts(
        nodes: PrimaryMap<NodeId, Node>,
        blocks: PrimaryMap<BlockId, BlockData>,
        start_block: BlockId,
        end_block: BlockId,
        start_node: NodeId,
        end_node: NodeId,
        method_references: HashMap<NodeId, MethodRef>,
        method_descriptors: PrimaryMap<MethodRef, MethodDescriptor>,
    ) -> Self {
        Self {
            nodes,
            blocks,
            start_block,
            end_block,
            start_node,
            end_node,
            method_references,
            method_descriptors,
            back_edges: None,
        }
    }

    /// The node table.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// The block table.
    pub fn block(&self, id: BlockId) -> &BlockData {
        &self.blocks[id]
    }

    /// Iterate over every block in the graph, including `start_block` and `end_block`.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys()
    }

    /// Iterate over every node in the graph, in creation (and therefore id) order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// The unique start block.
    pub fn start_block(&self) -> BlockId {
        self.start_block
    }

    /// The unique end block.
    pub fn end_block(&self) -> BlockId {
        self.end_block
    }

    /// The unique start node.
    pub fn start_node(&self) -> NodeId {
        self.start_node
    }

    /// The unique end node.
    pub fn end_node(&self) -> NodeId {
        self.end_node
    }

    /// Resolve a `Call` node's callee. `None` means the call is an allocation.
    pub fn method_reference(&self, call: NodeId) -> Option<MethodRef> {
        self.method_references.get(&call).copied()
    }

    /// Look up a resolved method's descriptor.
    pub fn method_descriptor(&self, method: MethodRef) -> &MethodDescriptor {
        &self.method_descriptors[method]
    }

    /// Enable the back-edges facility for the duration of one method's lowering.
    pub fn enable_back_edges(&mut self) {
        self.back_edges = Some(BackEdges::compute(&self.nodes));
    }

    /// Tear down the back-edges facility. Must be called before lowering the next method.
    pub fn disable_back_edges(&mut self) {
        self.back_edges = None;
    }

    /// Access the back-edges facility. Panics if it hasn't been enabled.
    pub fn back_edges(&self) -> &BackEdges {
        self.back_edges
            .as_ref()
            .expect("back edges not enabled for this graph")
    }

    /// Every node whose kind is `Phi`, in node-id order.
    pub fn phis(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().filter(move |&id| self.nodes[id].is_phi())
    }

    /// Whether `phi` is a memory φ: its operands ultimately resolve, through any chain of other
    /// φs, to a memory-producing source (`mem_from_start` or a `Memory` projection). The source
    /// contract carries no separate memory-φ kind, so this walks the operand chain the same way
    /// the upstream optimizer's type inference would.
    pub fn is_memory_phi(&self, phi: NodeId) -> bool {
        let mut visited: EntitySet<NodeId> = EntitySet::new();
        self.resolves_to_memory(phi, &mut visited)
    }

    fn resolves_to_memory(&self, id: NodeId, visited: &mut EntitySet<NodeId>) -> bool {
        if !visited.insert(id) {
            return false;
        }
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Proj {
                kind: ProjKind::Memory,
            }
            | NodeKind::Proj {
                kind: ProjKind::MemoryFromStart,
            } => true,
            NodeKind::Phi => node
                .preds
                .iter()
                .any(|&operand| self.resolves_to_memory(operand, visited)),
            _ => false,
        }
    }
}

/// One method's graph paired with its source-level name, as held by a `Program`'s
/// `methodGraphs` map.
pub struct MethodGraph {
    /// The method's name, used only for diagnostics and as the `LoweringResult` key.
    pub name: String,
    /// The method's graph.
    pub graph: SourceGraph,
}

/// A whole compilation unit: every method's graph, the upstream optimizer's `methodGraphs`.
///
/// Iteration order is insertion order, which is what callers get when building the program; this
/// keeps "lower every method" deterministic without requiring a name-sorted pass.
#[derive(Default)]
pub struct Program {
    methods: Vec<MethodGraph>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Add a method's graph to the program.
    pub fn add_method(&mut self, name: impl Into<String>, graph: SourceGraph) {
        self.methods.push(MethodGraph {
            name: name.into(),
            graph,
        });
    }

    /// Iterate over `(method name, graph)` pairs in insertion order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodGraph> {
        self.methods.iter()
    }

    /// Iterate mutably over `(method name, graph)` pairs in insertion order.
    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut MethodGraph> {
        self.methods.iter_mut()
    }
}
