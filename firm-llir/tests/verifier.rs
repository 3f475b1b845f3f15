//! The verifier is exercised directly against hand-built `LlirGraph`s (rather than only through
//! `FirmToLlir`, which never hands back a malformed graph) so these tests can pin down exactly
//! which invariant fired.

use firm_llir::{verify_llir_graph, LlirGraph, LlirNodeKind, PhiAccumulator, Relation, Width};

#[test]
fn rejects_a_register_used_without_a_local_definition_or_input() {
    let mut graph = LlirGraph::new();
    let block = graph.start_block();
    let stray = graph.make_register(Width::Bit32);
    graph.append_value(block, LlirNodeKind::MovRegister { src: stray }, Width::Bit32);
    graph.set_terminator(block, LlirNodeKind::Return { value: None });

    let result = verify_llir_graph(&graph, &[]);
    assert!(result.is_err());
}

#[test]
fn rejects_a_block_with_no_terminator() {
    let mut graph = LlirGraph::new();
    let block = graph.start_block();
    graph.append_value(block, LlirNodeKind::MovImmediate { value: 1 }, Width::Bit32);

    let result = verify_llir_graph(&graph, &[]);
    assert!(result.is_err());
}

#[test]
fn accepts_a_well_formed_single_block_graph() {
    let mut graph = LlirGraph::new();
    let block = graph.start_block();
    let (_, reg) = graph.append_value(block, LlirNodeKind::MovImmediate { value: 1 }, Width::Bit32);
    graph.set_terminator(block, LlirNodeKind::Return { value: Some(reg) });

    assert!(verify_llir_graph(&graph, &[]).is_ok());
}

#[test]
fn rejects_a_non_start_block_with_no_predecessor() {
    let mut graph = LlirGraph::new();
    let start = graph.start_block();
    graph.set_terminator(start, LlirNodeKind::Return { value: None });

    // `orphan` is never targeted by any terminator anywhere in the graph.
    let orphan = graph.make_block();
    graph.set_terminator(orphan, LlirNodeKind::Return { value: None });

    let result = verify_llir_graph(&graph, &[]);
    assert!(result.is_err());
}

#[test]
fn rejects_a_critical_edge_that_was_not_split() {
    let mut graph = LlirGraph::new();
    let entry = graph.start_block();
    let other = graph.make_block();
    let join = graph.make_block();

    // `join` has two predecessors (entry, other), so it needs a phi and counts as having >1
    // incoming edge; `entry` has two successors. The direct entry->join edge is critical and must
    // be split, but here it is wired straight through.
    let (_, zero) = graph.append_value(entry, LlirNodeKind::MovImmediate { value: 0 }, Width::Bit32);
    let cmp = graph.append_effect(entry, LlirNodeKind::Cmp { relation: Relation::Equal, lhs: zero, rhs: zero });
    graph.set_terminator(entry, LlirNodeKind::Branch { cmp, true_block: join, false_block: other });
    graph.set_terminator(other, LlirNodeKind::Jump { target: join });
    graph.set_terminator(join, LlirNodeKind::Return { value: None });

    let result = verify_llir_graph(&graph, &[]);
    assert!(result.is_err());
}

#[test]
fn accepts_a_critical_edge_routed_through_an_inserted_block() {
    let mut graph = LlirGraph::new();
    let entry = graph.start_block();
    let other = graph.make_block();
    let join = graph.make_block();
    let inserted = graph.make_block();

    let (_, zero) = graph.append_value(entry, LlirNodeKind::MovImmediate { value: 0 }, Width::Bit32);
    let cmp = graph.append_effect(entry, LlirNodeKind::Cmp { relation: Relation::Equal, lhs: zero, rhs: zero });
    graph.set_terminator(entry, LlirNodeKind::Branch { cmp, true_block: inserted, false_block: other });
    graph.set_terminator(inserted, LlirNodeKind::Jump { target: join });
    graph.set_terminator(other, LlirNodeKind::Jump { target: join });
    graph.set_terminator(join, LlirNodeKind::Return { value: None });

    assert!(verify_llir_graph(&graph, &[]).is_ok());
}

#[test]
fn rejects_a_memory_chain_that_branches_within_a_block() {
    let mut graph = LlirGraph::new();
    let block = graph.start_block();
    let (_, ptr) = graph.append_value(block, LlirNodeKind::MovImmediate { value: 0 }, Width::Bit64);
    let mem0 = graph.make_memory_input(block);

    // Two loads both observe `mem0` directly within the same block: the memory chain forks
    // instead of staying a single line.
    graph.append_value(
        block,
        LlirNodeKind::MovLoad { addr: firm_llir::MemoryLocation::Base(ptr), mem_in: mem0 },
        Width::Bit32,
    );
    graph.append_value(
        block,
        LlirNodeKind::MovLoad { addr: firm_llir::MemoryLocation::Base(ptr), mem_in: mem0 },
        Width::Bit32,
    );
    graph.set_terminator(block, LlirNodeKind::Return { value: None });

    let result = verify_llir_graph(&graph, &[]);
    assert!(result.is_err());
}

#[test]
fn rejects_a_temporaried_phi_accumulator_missing_its_guard_copy() {
    let mut graph = LlirGraph::new();
    let block = graph.start_block();
    let (_, accum) = graph.append_value(block, LlirNodeKind::MovImmediate { value: 0 }, Width::Bit32);
    graph.set_terminator(block, LlirNodeKind::Return { value: None });

    let phi_accumulators = vec![PhiAccumulator { block, accumulator: accum }];
    let result = verify_llir_graph(&graph, &phi_accumulators);
    assert!(result.is_err());
}

#[test]
fn accepts_a_temporaried_phi_accumulator_with_its_guard_copy_present() {
    let mut graph = LlirGraph::new();
    let block = graph.start_block();
    let (_, accum) = graph.append_value(block, LlirNodeKind::MovImmediate { value: 0 }, Width::Bit32);
    graph.append_value(block, LlirNodeKind::MovRegister { src: accum }, Width::Bit32);
    graph.set_terminator(block, LlirNodeKind::Return { value: None });

    let phi_accumulators = vec![PhiAccumulator { block, accumulator: accum }];
    assert!(verify_llir_graph(&graph, &phi_accumulators).is_ok());
}
