//
//  locate.rs
//  RouteLens
//
//  Find a named handler function in a parsed file.
//

use tree_sitter::Node;

use crate::parser::helpers::{end_line, start_line, walk_tree};
use crate::parser::syntax::{identifier, is_function};
use crate::parser::{SourceFile, Syntax};

/// Where a handler function lives inside its file (1-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionLocation {
    pub start_line: usize,
    pub end_line: usize,
}

/// First function named `name`, in traversal order, under any of:
///
/// - `function name() {}`
/// - `const name = (req, res) => {}` (also through one wrapper call)
/// - `exports.name = ...`, `module.name = ...`, `module.exports.name = ...`
/// - `name() {}` / `name: function () {}` in an object or class body
pub fn find_function(file: &SourceFile, name: &str) -> Option<FunctionLocation> {
    let source = file.source();
    let mut found: Option<FunctionLocation> = None;

    walk_tree(file.root(), |node| {
        if found.is_some() {
            return;
        }
        let span = match Syntax::of(node, source) {
            Syntax::FunctionDecl { name: declared } if declared == name => Some(statement_of(node)),
            Syntax::VariableDeclarator {
                name: declared,
                value: Some(value),
            } if identifier(declared, source) == Some(name) && defines_function(value, source) => {
                Some(node.parent().map(statement_of).unwrap_or(node))
            }
            Syntax::Assignment { left, right }
                if is_export_target(left, source, name) && defines_function(right, source) =>
            {
                Some(statement_of(node))
            }
            Syntax::Method { name: declared, .. } if declared == name => Some(node),
            Syntax::FunctionDecl { .. }
            | Syntax::VariableDeclarator { .. }
            | Syntax::Assignment { .. }
            | Syntax::Method { .. }
            | Syntax::Call(_)
            | Syntax::Member(_)
            | Syntax::Identifier(_)
            | Syntax::StringLiteral(_)
            | Syntax::FunctionExpr
            | Syntax::Import { .. }
            | Syntax::Other => None,
        };
        found = span.map(|n| FunctionLocation {
            start_line: start_line(&n),
            end_line: end_line(&n),
        });
    });

    found
}

/// A function value, or `wrapper(async (req, res) => {})`.
fn defines_function(value: Node, source: &str) -> bool {
    if is_function(&value) {
        return true;
    }
    match Syntax::of(value, source) {
        Syntax::Call(call) => call.arguments.iter().any(is_function),
        _ => false,
    }
}

/// `exports.name`, `module.name` or `module.exports.name`.
fn is_export_target(left: Node, source: &str, name: &str) -> bool {
    let Syntax::Member(member) = Syntax::of(left, source) else {
        return false;
    };
    if identifier(member.property, source) != Some(name) {
        return false;
    }
    match Syntax::of(member.object, source) {
        Syntax::Identifier(object) => object == "exports" || object == "module",
        Syntax::Member(inner) => {
            identifier(inner.object, source) == Some("module")
                && identifier(inner.property, source) == Some("exports")
        }
        _ => false,
    }
}

/// Widen a declaration to its enclosing statement so the slice includes
/// `const`/`export`/the trailing `;`.
fn statement_of(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "lexical_declaration" | "variable_declaration" | "expression_statement"
            | "export_statement" => current = parent,
            _ => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_source, SupportedLanguage};
    use std::path::Path;

    const CONTROLLER: &str = r#"const User = require('../models/user');

function listUsers(req, res) {
  res.json([]);
}

const getUser = async (req, res) => {
  res.json({ id: req.params.id });
};

exports.createUser = async function (req, res) {
  const { email } = req.body;
  res.status(201).json({ email });
};

module.exports.updateUser = asyncHandler(async (req, res) => {
  res.json(req.body);
});

module.exports = {
  removeUser(req, res) {
    res.status(204).end();
  },
  archiveUser: (req, res) => res.end(),
};
"#;

    fn file() -> SourceFile {
        parse_source(
            Path::new("/virtual/controllers/users.js"),
            CONTROLLER.to_string(),
            SupportedLanguage::JavaScript,
        )
        .unwrap()
    }

    fn span(name: &str) -> Option<(usize, usize)> {
        find_function(&file(), name).map(|l| (l.start_line, l.end_line))
    }

    #[test]
    fn test_function_declaration() {
        assert_eq!(span("listUsers"), Some((3, 5)));
    }

    #[test]
    fn test_variable_declarator() {
        assert_eq!(span("getUser"), Some((7, 9)));
    }

    #[test]
    fn test_exports_assignment() {
        assert_eq!(span("createUser"), Some((11, 14)));
        assert_eq!(span("updateUser"), Some((16, 18)));
    }

    #[test]
    fn test_object_methods() {
        assert_eq!(span("removeUser"), Some((21, 23)));
        assert_eq!(span("archiveUser"), Some((24, 24)));
    }

    #[test]
    fn test_missing_and_non_function_bindings() {
        assert_eq!(span("deleteEverything"), None);
        assert_eq!(span("User"), None);
    }

    #[test]
    fn test_typescript_export() {
        let file = parse_source(
            Path::new("/virtual/users.ts"),
            "export const create = async (req: Request, res: Response): Promise<void> => {\n  res.end();\n};\n"
                .to_string(),
            SupportedLanguage::TypeScript,
        )
        .unwrap();
        let loc = find_function(&file, "create").unwrap();
        assert_eq!((loc.start_line, loc.end_line), (1, 3));
    }
}
