//! C# front end - turns source text into syntax nodes via tree-sitter

use crate::error::{Error, Result};
use crate::host::{Callee, SourceLocation, SyntaxKind, SyntaxNode};
use tree_sitter::{Node, Parser};

/// Scan one C# source unit for invocation and object-creation expressions
///
/// Locations are 1-based. For member-access calls the location is that of
/// the invoked name (`x.Foo()` anchors at `Foo`), which is where call-site
/// anchors point.
pub fn scan_csharp(unit: &str, source: &str) -> Result<Vec<SyntaxNode>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| Error::Syntax(format!("Failed to set language: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::Syntax(format!("Failed to parse {}", unit)))?;

    let mut nodes = Vec::new();
    collect(tree.root_node(), unit, source, &mut nodes);
    Ok(nodes)
}

fn collect(node: Node, unit: &str, source: &str, out: &mut Vec<SyntaxNode>) {
    match node.kind() {
        "invocation_expression" => {
            let function = node.child_by_field_name("function");
            let (callee, anchor) = match function {
                Some(f) => callee_of(f, source),
                None => (Callee::Other, node),
            };
            out.push(SyntaxNode {
                kind: SyntaxKind::Invocation,
                callee,
                location: location_of(anchor, unit, source),
            });
        }
        "object_creation_expression" => {
            let name = node
                .child_by_field_name("type")
                .map(|t| text(t, source))
                .unwrap_or_default();
            out.push(SyntaxNode {
                kind: SyntaxKind::ObjectCreation,
                callee: Callee::Identifier(name),
                location: location_of(node, unit, source),
            });
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, unit, source, out);
    }
}

/// Callee shape plus the node the call site is anchored at
fn callee_of<'t>(function: Node<'t>, source: &str) -> (Callee, Node<'t>) {
    match function.kind() {
        "identifier" => (Callee::Identifier(text(function, source)), function),
        "generic_name" => match simple_name(function) {
            Some(id) => (Callee::Identifier(text(id, source)), id),
            None => (Callee::Other, function),
        },
        "member_access_expression" | "member_binding_expression" => {
            let name = function
                .child_by_field_name("name")
                .and_then(|n| if n.kind() == "generic_name" { simple_name(n) } else { Some(n) });
            match name {
                Some(n) => (Callee::MemberAccess(text(n, source)), n),
                None => (Callee::Other, function),
            }
        }
        _ => (Callee::Other, function),
    }
}

fn simple_name(generic: Node) -> Option<Node> {
    let mut cursor = generic.walk();
    let found = generic
        .children(&mut cursor)
        .find(|c| c.kind() == "identifier");
    found
}

fn text(node: Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

fn location_of(node: Node, unit: &str, source: &str) -> SourceLocation {
    let point = node.start_position();
    let start = node.start_byte();
    // tree-sitter columns are byte offsets; anchors count characters
    let line_start = start - point.column;
    let column = source
        .get(line_start..start)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(point.column);
    SourceLocation::new(unit, point.row as u32 + 1, column as u32 + 1)
}
