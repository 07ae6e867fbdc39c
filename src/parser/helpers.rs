//
//  helpers.rs
//  RouteLens
//

use tree_sitter::Node;

/// Get the full text of a node.
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-based first line of a node.
pub fn start_line(node: &Node) -> usize {
    node.start_position().row + 1
}

/// 1-based last line of a node.
pub fn end_line(node: &Node) -> usize {
    node.end_position().row + 1
}

/// Named children, minus comments (tree-sitter treats them as extras).
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// Pre-order walk over every node below (and including) `root`.
pub fn walk_tree<'t, F>(root: Node<'t>, mut visit: F)
where
    F: FnMut(Node<'t>),
{
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
            // Climbed back to the starting node: done.
            if cursor.node() == root {
                return;
            }
        }
    }
}

/// Line of the first ERROR / MISSING node, if the tree has any.
pub fn first_error_line(root: Node) -> Option<usize> {
    if !root.has_error() {
        return None;
    }
    let mut found = None;
    walk_tree(root, |node| {
        if found.is_none() && (node.is_error() || node.is_missing()) {
            found = Some(start_line(&node));
        }
    });
    Some(found.unwrap_or_else(|| start_line(&root)))
}

/// Literal value of a string node, or a template string without
/// substitutions. Anything computed returns `None`.
pub fn string_literal_value<'a>(node: &Node, source: &'a str) -> Option<&'a str> {
    match node.kind() {
        "string" => {
            let text = node_text(node, source);
            strip_quotes(text, &['\'', '"'])
        }
        "template_string" => {
            let mut cursor = node.walk();
            let dynamic = node
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution");
            if dynamic {
                return None;
            }
            strip_quotes(node_text(node, source), &['`'])
        }
        _ => None,
    }
}

fn strip_quotes<'a>(text: &'a str, quotes: &[char]) -> Option<&'a str> {
    let first = text.chars().next()?;
    if text.len() < 2 || !quotes.contains(&first) || !text.ends_with(first) {
        return None;
    }
    Some(&text[1..text.len() - 1])
}
