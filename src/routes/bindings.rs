//
//  bindings.rs
//  RouteLens
//
//  Passes 1 and 2 of route detection: which local names come from which
//  project files, and which routers are mounted under which prefixes.
//

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tree_sitter::Node;

use super::resolve::resolve_import;
use super::types::join_route_path;
use crate::parser::helpers::{named_children, node_text, string_literal_value, walk_tree};
use crate::parser::syntax::{identifier, CallExpr};
use crate::parser::{SourceFile, Syntax};

/// A name imported from one export of a project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedImport {
    pub file: PathBuf,
    /// Name the exporting module uses (differs from the local name for
    /// `{ a as b }` / `{ a: b }`).
    pub exported: String,
}

/// Result of the import/require pass.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    /// Default, namespace and whole-module `require` bindings.
    pub modules: BTreeMap<String, PathBuf>,
    /// Named imports and destructured requires.
    pub functions: BTreeMap<String, NamedImport>,
}

impl ImportTable {
    /// File a local name was imported from, whichever way it came in.
    pub fn file_of(&self, name: &str) -> Option<&PathBuf> {
        self.modules
            .get(name)
            .or_else(|| self.functions.get(name).map(|f| &f.file))
    }
}

/// What a `.use(prefix, target)` call mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountTarget {
    /// A local router variable (possibly imported).
    Identifier(String),
    /// `app.use('/x', require('./routes/x'))`.
    File(PathBuf),
}

/// One `<receiver>.use('<prefix>', <target>)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterUse {
    pub receiver: Option<String>,
    pub prefix: String,
    pub target: MountTarget,
}

/// Result of the router-prefix pass.
#[derive(Debug, Clone, Default)]
pub struct PrefixTable {
    pub uses: Vec<RouterUse>,
    /// identifier → prefix, first registration wins.
    pub prefixes: BTreeMap<String, String>,
}

impl PrefixTable {
    /// Full prefix for a router identifier, composing nested local mounts
    /// (`app.use('/api', api); api.use('/v1', v1)` gives `v1 → /api/v1`).
    pub fn resolve(&self, ident: &str) -> Option<String> {
        let mut seen = BTreeSet::new();
        self.resolve_inner(ident, &mut seen)
    }

    fn resolve_inner(&self, ident: &str, seen: &mut BTreeSet<String>) -> Option<String> {
        if !seen.insert(ident.to_string()) {
            return None;
        }
        let own = self.prefixes.get(ident)?;
        let parent = self
            .uses
            .iter()
            .find(|u| u.target == MountTarget::Identifier(ident.to_string()))
            .and_then(|u| u.receiver.as_deref())
            .and_then(|receiver| self.resolve_inner(receiver, seen));
        Some(match parent {
            Some(parent) => join_route_path(&parent, own),
            None => own.clone(),
        })
    }
}

/// Pass 1: collect relative `import` and `require()` bindings.
pub fn collect_imports(file: &SourceFile) -> ImportTable {
    let source = file.source();
    let mut table = ImportTable::default();

    walk_tree(file.root(), |node| match Syntax::of(node, source) {
        Syntax::Import { source: spec } => {
            if let Some(target) = resolve_import(file.path(), spec) {
                record_es_import(node, source, target, &mut table);
            }
        }
        Syntax::VariableDeclarator {
            name,
            value: Some(value),
        } => {
            if let Some((target, member)) = require_target(value, file) {
                record_require(name, member, source, target, &mut table);
            }
        }
        Syntax::Call(_)
        | Syntax::Member(_)
        | Syntax::Identifier(_)
        | Syntax::StringLiteral(_)
        | Syntax::FunctionDecl { .. }
        | Syntax::FunctionExpr
        | Syntax::VariableDeclarator { value: None, .. }
        | Syntax::Assignment { .. }
        | Syntax::Method { .. }
        | Syntax::Other => {}
    });

    table
}

fn record_es_import(node: Node, source: &str, target: PathBuf, table: &mut ImportTable) {
    for child in named_children(&node) {
        match child.kind() {
            "import_clause" => {
                for part in named_children(&child) {
                    match part.kind() {
                        "identifier" => {
                            table
                                .modules
                                .insert(node_text(&part, source).to_string(), target.clone());
                        }
                        "namespace_import" => {
                            if let Some(id) = named_children(&part)
                                .into_iter()
                                .find(|n| n.kind() == "identifier")
                            {
                                table
                                    .modules
                                    .insert(node_text(&id, source).to_string(), target.clone());
                            }
                        }
                        "named_imports" => {
                            for spec in named_children(&part) {
                                if spec.kind() != "import_specifier" {
                                    continue;
                                }
                                let Some(name) = spec.child_by_field_name("name") else {
                                    continue;
                                };
                                let exported = import_name_text(&name, source);
                                let local = spec
                                    .child_by_field_name("alias")
                                    .map(|a| node_text(&a, source).to_string())
                                    .unwrap_or_else(|| exported.clone());
                                table.functions.insert(
                                    local,
                                    NamedImport {
                                        file: target.clone(),
                                        exported,
                                    },
                                );
                            }
                        }
                        _ => {}
                    }
                }
            }
            // TypeScript: import users = require('./users')
            "import_require_clause" => {
                if let Some(id) = named_children(&child)
                    .into_iter()
                    .find(|n| n.kind() == "identifier")
                {
                    table
                        .modules
                        .insert(node_text(&id, source).to_string(), target.clone());
                }
            }
            _ => {}
        }
    }
}

/// `import { "quoted" as x }` is legal; strip the quotes.
fn import_name_text(node: &Node, source: &str) -> String {
    string_literal_value(node, source)
        .unwrap_or_else(|| node_text(node, source))
        .to_string()
}

/// `require('./x')` or `require('./x').member`.
fn require_target<'a>(value: Node<'a>, file: &'a SourceFile) -> Option<(PathBuf, Option<String>)> {
    let source = file.source();
    match Syntax::of(value, source) {
        Syntax::Call(call) => require_call_path(&call, file).map(|p| (p, None)),
        Syntax::Member(member) => {
            let Syntax::Call(call) = Syntax::of(member.object, source) else {
                return None;
            };
            let path = require_call_path(&call, file)?;
            let property = identifier(member.property, source)?;
            Some((path, Some(property.to_string())))
        }
        _ => None,
    }
}

/// Resolved project file for a `require('<relative>')` call.
pub(crate) fn require_call_path(call: &CallExpr, file: &SourceFile) -> Option<PathBuf> {
    let source = file.source();
    if identifier(call.callee, source)? != "require" {
        return None;
    }
    let first = call.arguments.first()?;
    let spec = string_literal_value(first, source)?;
    resolve_import(file.path(), spec)
}

fn record_require(
    name: Node,
    member: Option<String>,
    source: &str,
    target: PathBuf,
    table: &mut ImportTable,
) {
    match name.kind() {
        "identifier" => {
            let local = node_text(&name, source).to_string();
            match member {
                Some(exported) => {
                    table.functions.insert(
                        local,
                        NamedImport {
                            file: target,
                            exported,
                        },
                    );
                }
                None => {
                    table.modules.insert(local, target);
                }
            }
        }
        // const { create, update: edit } = require('./controller')
        "object_pattern" => {
            for prop in named_children(&name) {
                let (exported, local) = match prop.kind() {
                    "shorthand_property_identifier_pattern" => {
                        let n = node_text(&prop, source).to_string();
                        (n.clone(), n)
                    }
                    "pair_pattern" => {
                        let key = prop.child_by_field_name("key");
                        let value = prop.child_by_field_name("value");
                        match (key, value) {
                            (Some(k), Some(v)) if v.kind() == "identifier" => (
                                import_name_text(&k, source),
                                node_text(&v, source).to_string(),
                            ),
                            _ => continue,
                        }
                    }
                    _ => continue,
                };
                table.functions.insert(
                    local,
                    NamedImport {
                        file: target.clone(),
                        exported,
                    },
                );
            }
        }
        _ => {}
    }
}

/// Pass 2: collect `<receiver>.use('<prefix>', ..., <router>)` mounts.
pub fn collect_prefixes(file: &SourceFile) -> PrefixTable {
    let source = file.source();
    let mut table = PrefixTable::default();

    walk_tree(file.root(), |node| {
        let Syntax::Call(call) = Syntax::of(node, source) else {
            return;
        };
        let Syntax::Member(callee) = Syntax::of(call.callee, source) else {
            return;
        };
        if identifier(callee.property, source) != Some("use") || call.arguments.len() < 2 {
            return;
        }
        let Some(prefix) = string_literal_value(&call.arguments[0], source) else {
            return;
        };
        let Some(last) = call.arguments.last() else {
            return;
        };
        let target = match Syntax::of(*last, source) {
            Syntax::Identifier(name) => MountTarget::Identifier(name.to_string()),
            Syntax::Call(inner) => match require_call_path(&inner, file) {
                Some(path) => MountTarget::File(path),
                None => return,
            },
            _ => return,
        };

        if let MountTarget::Identifier(name) = &target {
            table
                .prefixes
                .entry(name.clone())
                .or_insert_with(|| prefix.to_string());
        }
        table.uses.push(RouterUse {
            receiver: identifier(callee.object, source).map(str::to_string),
            prefix: prefix.to_string(),
            target,
        });
    });

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_file;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_es_and_commonjs_imports() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("controllers")).unwrap();
        fs::write(root.join("controllers/users.js"), "").unwrap();
        fs::write(root.join("controllers/orders.ts"), "").unwrap();
        fs::write(root.join("controllers/auth.js"), "").unwrap();
        fs::write(root.join("controllers/misc.js"), "").unwrap();
        fs::write(
            root.join("app.js"),
            r#"
import usersController, { create, update as edit } from './controllers/users';
import * as orders from './controllers/orders';
import express from 'express';
const auth = require('./controllers/auth');
const { login, logout: signOut } = require('./controllers/auth');
const ping = require('./controllers/misc').ping;
const lodash = require('lodash');
"#,
        )
        .unwrap();

        let file = parse_file(&root.join("app.js")).unwrap();
        let table = collect_imports(&file);

        assert_eq!(
            table.modules.get("usersController"),
            Some(&root.join("controllers/users.js"))
        );
        assert_eq!(
            table.modules.get("orders"),
            Some(&root.join("controllers/orders.ts"))
        );
        assert_eq!(table.modules.get("auth"), Some(&root.join("controllers/auth.js")));
        assert!(!table.modules.contains_key("express"));
        assert!(!table.modules.contains_key("lodash"));

        assert_eq!(table.functions["create"].exported, "create");
        assert_eq!(table.functions["edit"].exported, "update");
        assert_eq!(table.functions["login"].file, root.join("controllers/auth.js"));
        assert_eq!(table.functions["signOut"].exported, "logout");
        assert_eq!(table.functions["ping"].exported, "ping");
        assert_eq!(table.file_of("ping"), Some(&root.join("controllers/misc.js")));
    }

    #[test]
    fn test_prefixes_and_nested_mounts() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("routes")).unwrap();
        fs::write(root.join("routes/health.js"), "").unwrap();
        fs::write(
            root.join("app.js"),
            r#"
const api = express.Router();
const v1 = express.Router();
app.use(express.json());
app.use('/api', api);
api.use('/v1', auth, v1);
app.use('/health', require('./routes/health'));
app.use('/api', somethingElse);
"#,
        )
        .unwrap();

        let file = parse_file(&root.join("app.js")).unwrap();
        let table = collect_prefixes(&file);

        assert_eq!(table.prefixes.get("api").map(String::as_str), Some("/api"));
        assert_eq!(table.resolve("v1").as_deref(), Some("/api/v1"));
        assert_eq!(table.resolve("missing"), None);
        assert!(table.uses.iter().any(|u| u.target
            == MountTarget::File(root.join("routes/health.js"))
            && u.prefix == "/health"));
        assert_eq!(table.uses.len(), 4);
    }
}
