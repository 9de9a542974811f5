use crate::view::paint_kind;
use symdex_api::LinkageId;
use symdex_core::node::NodeType;
use symdex_core::storage::Database;
use symdex_core::{IndexVisitor, Result, SymbolIndex, TypedNode, Visit};

/// Collects one indented line per binding down to `max_depth`.
struct TreePrinter {
    max_depth: Option<usize>,
    lines: Vec<String>,
}

impl IndexVisitor for TreePrinter {
    fn visit(&mut self, db: &Database, node: TypedNode, depth: usize) -> Result<Visit> {
        let Some(binding) = node.binding() else {
            return Ok(Visit::Continue);
        };
        let tag = binding.tag(db)?;
        // Parameters are listed with their owner, not as scope members.
        if matches!(
            tag,
            NodeType::Parameter | NodeType::TemplateTypeParameter | NodeType::TemplateValueParameter
        ) {
            return Ok(Visit::SkipChildren);
        }
        let indent = "  ".repeat(depth.saturating_sub(1));
        self.lines
            .push(format!("{}{} {}", indent, paint_kind(tag), binding.name(db)?));
        match self.max_depth {
            Some(max) if depth >= max => Ok(Visit::SkipChildren),
            _ => Ok(Visit::Continue),
        }
    }
}

pub fn run(
    index: &SymbolIndex,
    linkage: &LinkageId,
    depth: Option<usize>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = index.global_scope(linkage)?;
    let mut printer = TreePrinter {
        max_depth: depth,
        lines: Vec::new(),
    };
    index.visit(root, &mut printer)?;
    if printer.lines.is_empty() {
        println!("{} has no bindings", linkage);
    }
    for line in printer.lines {
        println!("{}", line);
    }
    Ok(())
}
