//! Minimal syntax model standing in for the host formatter
//!
//! The dispatch pipeline operates on syntax nodes owned by the host
//! formatter; plugins only ever read a node's kind, text, and children.
//! This module provides the line-oriented stand-in used by the binary and
//! the tests: a module parser that classifies top-level statements and a
//! passthrough renderer.

use crate::pipeline::{DispatchContext, NodeRenderer};

/// Classification of a syntax node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Whole source file
    Module,
    /// `import x` statement
    Import,
    /// `from x import y` statement
    ImportFrom,
    /// Statement that is a bare string literal
    Str,
    /// Any other statement
    Statement,
    /// Blank line
    Blank,
}

/// A node in the host formatter's syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Source text of the statement (empty for modules and blank lines)
    pub text: String,
    /// Child nodes; top-level statements for a module, empty otherwise
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn module(children: Vec<SyntaxNode>) -> Self {
        Self {
            kind: NodeKind::Module,
            text: String::new(),
            children,
        }
    }

    /// Returns true for both import statement forms
    pub fn is_import(&self) -> bool {
        matches!(self.kind, NodeKind::Import | NodeKind::ImportFrom)
    }
}

/// Parses source text into a module node with one child per line.
///
/// Classification is strictly line-based: only unindented lines count as
/// import statements, so imports nested inside function bodies stay where
/// they are. Trailing whitespace is dropped from every line.
pub fn parse_module(source: &str) -> SyntaxNode {
    let children = source.lines().map(parse_line).collect();
    SyntaxNode::module(children)
}

fn parse_line(line: &str) -> SyntaxNode {
    let text = line.trim_end();
    if text.trim().is_empty() {
        return SyntaxNode::new(NodeKind::Blank, "");
    }
    if text.starts_with("import ") {
        return SyntaxNode::new(NodeKind::Import, text);
    }
    if text.starts_with("from ") && text.contains(" import") {
        return SyntaxNode::new(NodeKind::ImportFrom, text);
    }
    if text.starts_with('"') || text.starts_with('\'') {
        return SyntaxNode::new(NodeKind::Str, text);
    }
    SyntaxNode::new(NodeKind::Statement, text)
}

/// Passthrough renderer: emits every statement exactly as parsed.
#[derive(Debug, Default)]
pub struct LineRenderer;

impl NodeRenderer for LineRenderer {
    fn render(&self, node: &SyntaxNode, ctx: &mut DispatchContext) -> Vec<String> {
        match node.kind {
            NodeKind::Module => node
                .children
                .iter()
                .flat_map(|child| self.render(child, ctx))
                .collect(),
            NodeKind::Blank => vec![String::new()],
            _ => vec![node.text.clone()],
        }
    }
}

/// Joins rendered lines back into source text with a trailing newline.
pub fn render_source(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statements() {
        let module = parse_module("import os\nfrom x import y\n'doc'\nx = 1\n\n");

        let kinds: Vec<NodeKind> = module.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Import,
                NodeKind::ImportFrom,
                NodeKind::Str,
                NodeKind::Statement,
                NodeKind::Blank,
            ]
        );
    }

    #[test]
    fn indented_imports_are_plain_statements() {
        let module = parse_module("def f():\n    import os\n");
        assert_eq!(module.children[1].kind, NodeKind::Statement);
    }

    #[test]
    fn from_without_import_is_a_statement() {
        let module = parse_module("from_account = 1\n");
        assert_eq!(module.children[0].kind, NodeKind::Statement);
    }

    #[test]
    fn renderer_is_a_passthrough() {
        let source = "import b\n\nimport a\nx = 1\n";
        let module = parse_module(source);
        let mut ctx = DispatchContext::new();
        let lines = LineRenderer.render(&module, &mut ctx);

        assert_eq!(render_source(&lines), source);
    }

    #[test]
    fn trailing_whitespace_is_dropped() {
        let module = parse_module("x = 1   \n");
        assert_eq!(module.children[0].text, "x = 1");
    }

    #[test]
    fn render_source_of_nothing_is_empty() {
        assert_eq!(render_source(&[]), "");
    }
}
