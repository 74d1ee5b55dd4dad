//! Human-readable IR listing for debugging

use super::builder::IrBuilder;
use super::node::{Node, SectionId};
use super::op::{decoration, Op};
use std::fmt::Write;

/// Render every section of `ir` as text
pub fn dump(ir: &IrBuilder) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "                    IR DUMP");
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    for section in SectionId::ALL {
        let nodes = ir.section(section);
        if nodes.is_empty() {
            continue;
        }
        let _ = writeln!(out, "; {:?} ({} nodes)", section, nodes.len());
        for node in nodes {
            let _ = writeln!(out, "{}", format_node(node));
        }
    }
    out
}

/// Format a single node
pub fn format_node(node: &Node) -> String {
    let mut line = String::new();
    if node.result.is_some() {
        let _ = write!(line, "{:>6} = ", node.result.to_string());
    } else {
        line.push_str("         ");
    }
    line.push_str(&node.op.to_string());
    if node.result_type.is_some() {
        let _ = write!(line, " {}", node.result_type);
    }

    let string_start = string_operand(node);
    let words = string_start.unwrap_or(node.operands.len());
    for word in &node.operands[..words.min(node.operands.len())] {
        let _ = write!(line, " {}", word);
    }
    if let Some(start) = string_start {
        let _ = write!(line, " \"{}\"", node.string_at(start));
    }
    line
}

/// Index of the first string word, for nodes that carry one
fn string_operand(node: &Node) -> Option<usize> {
    match node.op {
        Op::String | Op::ExtInstImport => Some(0),
        Op::Name => Some(1),
        Op::MemberName | Op::EntryPoint => Some(2),
        Op::Decorate if node.operands.get(1) == Some(&decoration::HLSL_SEMANTIC) => Some(2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Location;
    use crate::types::TypeInfo;

    #[test]
    fn test_dump_lists_sections() {
        let mut ir = IrBuilder::new();
        let ty = ir.convert_type(&TypeInfo::float(2, 1)).unwrap();
        ir.add_node_without_result(SectionId::Strings, &Location::default(), Op::Name)
            .add_id(ty)
            .add_string("float2");

        let text = dump(&ir);
        assert!(text.contains("; Variables (2 nodes)"));
        assert!(text.contains("OpTypeVector"));
        assert!(text.contains("OpName 101 \"float2\""));
    }
}
