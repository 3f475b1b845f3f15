//! A textual dump of an `LlirGraph`, in the same spirit as the teacher's `Function::display()`:
//! one block label, one line per node, good enough to diff in a test or paste into a bug report.
//! Not a parser target — there is no reader for this format, only a writer.

use crate::llir::{LlirGraph, LlirNodeId, LlirNodeKind};
use std::fmt::Write as _;

/// Render `graph` as text: one `bbN:` label per block, its memory input and register inputs, one
/// line per node in program order, and the block's live-out registers.
pub fn write_llir_graph(graph: &LlirGraph) -> String {
    let mut out = String::new();
    for block_id in graph.block_ids() {
        let block = graph.block(block_id);
        let _ = writeln!(out, "{}:", block_id);

        if let Some(mem) = block.memory_input() {
            let _ = writeln!(out, "    {} = memory_input", mem);
        }

        for &node_id in block.nodes() {
            let node = graph.node(node_id);
            if node.kind.is_terminator() {
                let _ = writeln!(out, "    {}", format_terminator(&node.kind));
                continue;
            }
            let lhs = match node.dst {
                Some(dst) => dst.to_string(),
                None => node_id.to_string(),
            };
            let _ = writeln!(out, "    {} = {}", lhs, format_op(&node.kind));
        }

        let regs: Vec<String> = block
            .outputs()
            .iter()
            .map(|n| match graph.node(n).dst {
                Some(dst) => dst.to_string(),
                None => n.to_string(),
            })
            .collect();
        if !regs.is_empty() {
            let _ = writeln!(out, "    ; out: {}", regs.join(", "));
        }
    }
    out
}

fn format_mem(mem_in: LlirNodeId) -> String {
    mem_in.to_string()
}

fn format_op(kind: &LlirNodeKind) -> String {
    use LlirNodeKind::*;
    match kind {
        MovImmediate { value } => format!("mov_imm {}", value),
        MovRegister { src } => format!("mov {}", src),
        MovSignExtend { src } => format!("sign_extend {}", src),
        Add(a, b) => format!("add {}, {}", a, b),
        Sub(a, b) => format!("sub {}, {}", a, b),
        Mul(a, b) => format!("mul {}, {}", a, b),
        And(a, b) => format!("and {}, {}", a, b),
        Xor(a, b) => format!("xor {}, {}", a, b),
        ShiftLeft(a, b) => format!("shl {}, {}", a, b),
        ShiftRight(a, b) => format!("shr {}, {}", a, b),
        ArithShiftRight(a, b) => format!("sar {}, {}", a, b),
        MovLoad { addr, mem_in } => format!("load {} [{}]", addr, format_mem(*mem_in)),
        MovStore { addr, value, mem_in } => {
            format!("store {} {} [{}]", addr, value, format_mem(*mem_in))
        }
        Div { lhs, rhs, mem_in } => format!("div {}, {} [{}]", lhs, rhs, format_mem(*mem_in)),
        Mod { lhs, rhs, mem_in } => format!("mod {}, {} [{}]", lhs, rhs, format_mem(*mem_in)),
        Call { target, mem_in, args } => {
            let args: Vec<String> = args.iter().map(|r| r.to_string()).collect();
            format!("call {} ({}) [{}]", format_call_target(target), args.join(", "), format_mem(*mem_in))
        }
        Input { reg } => format!("input {}", reg),
        MemoryInput => "memory_input".to_string(),
        Cmp { relation, lhs, rhs } => format!("cmp {} {}, {}", relation, lhs, rhs),
        Jump { .. } | Branch { .. } | Return { .. } => {
            unreachable!("terminators are formatted by format_terminator")
        }
    }
}

fn format_call_target(target: &crate::llir::CallTarget) -> String {
    match target {
        crate::llir::CallTarget::Method(m) => format!("{}", m),
        crate::llir::CallTarget::Alloc => "alloc".to_string(),
    }
}

fn format_terminator(kind: &LlirNodeKind) -> String {
    use LlirNodeKind::*;
    match kind {
        Jump { target } => format!("jump {}", target),
        Branch { cmp, true_block, false_block } => {
            format!("branch {} ? {} : {}", cmp, true_block, false_block)
        }
        Return { value: Some(v) } => format!("return {}", v),
        Return { value: None } => "return".to_string(),
        _ => unreachable!("format_terminator called with a non-terminator"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowgraph::FlowGraph;
    use crate::phi_prepass::TemporariedSet;
    use crate::source::builder::GraphBuilder;
    use crate::width::Width;

    #[test]
    fn prints_a_block_label_per_block_and_a_line_per_node() {
        let mut b = GraphBuilder::new();
        let start = b.start_block();
        let mem = b.mem_from_start();
        let p0 = b.param(0, Width::Bit32);
        let p1 = b.param(1, Width::Bit32);
        let sum = b.add(start, p0, p1, Width::Bit32);
        b.ret(start, mem, Some(sum));
        let source = b.finish();

        let flow = FlowGraph::compute(&source);
        let temporaried = TemporariedSet::compute(&source);
        let (graph, _, _) = crate::lowering::run(&source, &flow, &temporaried).unwrap();

        let text = write_llir_graph(&graph);
        assert!(text.contains("bb0:"));
        assert!(text.contains("add"));
        assert!(text.contains("return"));
    }
}
