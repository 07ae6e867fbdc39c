//
//  syntax.rs
//  RouteLens
//
//  Typed view over the handful of tree-sitter node kinds the route and
//  controller passes consume. Everything else is `Syntax::Other`.
//

use tree_sitter::Node;

use super::helpers::{named_children, node_text, string_literal_value};

/// `callee(args...)`.
#[derive(Debug, Clone)]
pub struct CallExpr<'a> {
    pub node: Node<'a>,
    pub callee: Node<'a>,
    pub arguments: Vec<Node<'a>>,
}

/// `object.property`.
#[derive(Debug, Clone, Copy)]
pub struct MemberExpr<'a> {
    pub node: Node<'a>,
    pub object: Node<'a>,
    pub property: Node<'a>,
}

#[derive(Debug, Clone)]
pub enum Syntax<'a> {
    Call(CallExpr<'a>),
    Member(MemberExpr<'a>),
    Identifier(&'a str),
    StringLiteral(&'a str),
    /// `function name() {}` (and generator declarations).
    FunctionDecl { name: &'a str },
    /// Arrow functions and function expressions.
    FunctionExpr,
    /// `name = value` inside `const`/`let`/`var`.
    VariableDeclarator {
        name: Node<'a>,
        value: Option<Node<'a>>,
    },
    /// `left = right` as an expression.
    Assignment { left: Node<'a>, right: Node<'a> },
    /// `name() {}` in an object literal or class body, or `name: function() {}`.
    Method { name: &'a str, body: Node<'a> },
    /// `import ... from '...'`.
    Import { source: &'a str },
    Other,
}

impl<'a> Syntax<'a> {
    /// Classify a node.
    pub fn of(node: Node<'a>, source: &'a str) -> Syntax<'a> {
        match node.kind() {
            "call_expression" => {
                let Some(callee) = node.child_by_field_name("function") else {
                    return Syntax::Other;
                };
                let arguments = node
                    .child_by_field_name("arguments")
                    .filter(|a| a.kind() == "arguments")
                    .map(|a| named_children(&a))
                    .unwrap_or_default();
                Syntax::Call(CallExpr {
                    node,
                    callee,
                    arguments,
                })
            }
            "member_expression" => {
                match (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("property"),
                ) {
                    (Some(object), Some(property)) => Syntax::Member(MemberExpr {
                        node,
                        object,
                        property,
                    }),
                    _ => Syntax::Other,
                }
            }
            "identifier" | "property_identifier" | "shorthand_property_identifier" => {
                Syntax::Identifier(node_text(&node, source))
            }
            "string" | "template_string" => match string_literal_value(&node, source) {
                Some(value) => Syntax::StringLiteral(value),
                None => Syntax::Other,
            },
            "function_declaration" | "generator_function_declaration" => node
                .child_by_field_name("name")
                .map(|n| Syntax::FunctionDecl {
                    name: node_text(&n, source),
                })
                .unwrap_or(Syntax::Other),
            "arrow_function" | "function_expression" | "function" | "generator_function" => {
                Syntax::FunctionExpr
            }
            "variable_declarator" => match node.child_by_field_name("name") {
                Some(name) => Syntax::VariableDeclarator {
                    name,
                    value: node.child_by_field_name("value"),
                },
                None => Syntax::Other,
            },
            "assignment_expression" => {
                match (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) {
                    (Some(left), Some(right)) => Syntax::Assignment { left, right },
                    _ => Syntax::Other,
                }
            }
            "method_definition" => node
                .child_by_field_name("name")
                .map(|n| Syntax::Method {
                    name: node_text(&n, source),
                    body: node,
                })
                .unwrap_or(Syntax::Other),
            "pair" => {
                let key = node.child_by_field_name("key");
                let value = node.child_by_field_name("value");
                match (key, value) {
                    (Some(key), Some(value)) if is_function(&value) => Syntax::Method {
                        name: property_key(&key, source),
                        body: value,
                    },
                    _ => Syntax::Other,
                }
            }
            "import_statement" => node
                .child_by_field_name("source")
                .or_else(|| {
                    // TypeScript `import x = require('./x')` keeps the source inside the clause.
                    named_children(&node)
                        .into_iter()
                        .find(|c| c.kind() == "import_require_clause")
                        .and_then(|c| c.child_by_field_name("source"))
                })
                .and_then(|s| string_literal_value(&s, source))
                .map(|source| Syntax::Import { source })
                .unwrap_or(Syntax::Other),
            _ => Syntax::Other,
        }
    }
}

/// Whether a node is an arrow function or function expression.
pub fn is_function(node: &Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Identifier text if the node is a plain identifier.
pub fn identifier<'a>(node: Node<'a>, source: &'a str) -> Option<&'a str> {
    match Syntax::of(node, source) {
        Syntax::Identifier(name) => Some(name),
        _ => None,
    }
}

/// `receiver.method` when both sides are plain identifiers.
pub fn simple_member<'a>(node: Node<'a>, source: &'a str) -> Option<(&'a str, &'a str)> {
    match Syntax::of(node, source) {
        Syntax::Member(m) => Some((identifier(m.object, source)?, identifier(m.property, source)?)),
        _ => None,
    }
}

/// Object keys may be identifiers or quoted strings.
fn property_key<'a>(key: &Node, source: &'a str) -> &'a str {
    string_literal_value(key, source).unwrap_or_else(|| node_text(key, source))
}
