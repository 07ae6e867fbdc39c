//
//  fields.rs
//  RouteLens
//
//  Request-body field hints: `req.body.x`, `req.body['x']` and
//  `const { x } = req.body`, collected over the whole file.
//

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::parser::helpers::{named_children, node_text, string_literal_value, walk_tree};
use crate::parser::syntax::identifier;
use crate::parser::{SourceFile, Syntax};

const REQUEST_NAMES: &[&str] = &["req", "request"];

/// Field names read from the request body anywhere in `file`.
pub fn request_body_fields(file: &SourceFile) -> BTreeSet<String> {
    let source = file.source();
    let mut fields = BTreeSet::new();

    walk_tree(file.root(), |node| match Syntax::of(node, source) {
        Syntax::Member(member) => {
            if is_request_body(member.object, source) {
                if let Some(field) = identifier(member.property, source) {
                    fields.insert(field.to_string());
                }
            }
        }
        Syntax::VariableDeclarator {
            name,
            value: Some(value),
        } => {
            if name.kind() == "object_pattern" && is_request_body(value, source) {
                fields.extend(pattern_keys(name, source));
            }
        }
        Syntax::Other if node.kind() == "subscript_expression" => {
            let object = node.child_by_field_name("object");
            let index = node.child_by_field_name("index");
            if let (Some(object), Some(index)) = (object, index) {
                if is_request_body(object, source) {
                    if let Some(field) = string_literal_value(&index, source) {
                        fields.insert(field.to_string());
                    }
                }
            }
        }
        Syntax::Call(_)
        | Syntax::Identifier(_)
        | Syntax::StringLiteral(_)
        | Syntax::FunctionDecl { .. }
        | Syntax::FunctionExpr
        | Syntax::VariableDeclarator { value: None, .. }
        | Syntax::Assignment { .. }
        | Syntax::Method { .. }
        | Syntax::Import { .. }
        | Syntax::Other => {}
    });

    fields
}

/// `req.body` / `request.body`.
fn is_request_body(node: Node, source: &str) -> bool {
    let Syntax::Member(member) = Syntax::of(node, source) else {
        return false;
    };
    identifier(member.property, source) == Some("body")
        && identifier(member.object, source).is_some_and(|o| REQUEST_NAMES.contains(&o))
}

/// Keys of `{ a, b: c, d = 1, ...rest }`; the rest element is dropped.
fn pattern_keys(pattern: Node, source: &str) -> Vec<String> {
    named_children(&pattern)
        .into_iter()
        .filter_map(|prop| match prop.kind() {
            "shorthand_property_identifier_pattern" => Some(node_text(&prop, source).to_string()),
            "pair_pattern" => prop.child_by_field_name("key").map(|k| {
                string_literal_value(&k, source)
                    .unwrap_or_else(|| node_text(&k, source))
                    .to_string()
            }),
            "object_assignment_pattern" => prop
                .child_by_field_name("left")
                .map(|l| node_text(&l, source).to_string()),
            _ => None,
        })
        .collect()
}
