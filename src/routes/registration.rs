//
//  registration.rs
//  RouteLens
//
//  Pass 3 of route detection: `<expr>.<verb>('<path>', ...handlers)`.
//

use std::path::PathBuf;

use tree_sitter::Node;

use super::bindings::{ImportTable, PrefixTable};
use super::types::{
    join_route_path, normalize_route_path, DetectedRoute, HttpMethod, LineSpan, ANONYMOUS_HANDLER,
};
use crate::parser::helpers::{end_line, node_text, start_line, string_literal_value, walk_tree};
use crate::parser::syntax::{identifier, simple_member, CallExpr};
use crate::parser::{SourceFile, Syntax};

/// A route as seen inside its own file, before cross-file mounts apply.
#[derive(Debug, Clone)]
pub struct RegisteredRoute {
    pub route: DetectedRoute,
    /// True when the receiver had a prefix registered in this same file.
    pub locally_prefixed: bool,
}

/// How the last registration argument was interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct HandlerInfo {
    handler: String,
    controller_file: Option<PathBuf>,
    controller_function: Option<String>,
    inline_span: Option<LineSpan>,
}

/// Collect every route registration in a file.
pub fn collect_routes(
    file: &SourceFile,
    imports: &ImportTable,
    prefixes: &PrefixTable,
) -> Vec<RegisteredRoute> {
    let source = file.source();
    let mut routes = Vec::new();

    walk_tree(file.root(), |node| {
        let Syntax::Call(call) = Syntax::of(node, source) else {
            return;
        };
        if let Some(route) = registration(&call, file, imports, prefixes) {
            routes.push(route);
        }
    });

    routes
}

fn registration(
    call: &CallExpr,
    file: &SourceFile,
    imports: &ImportTable,
    prefixes: &PrefixTable,
) -> Option<RegisteredRoute> {
    let source = file.source();
    let Syntax::Member(callee) = Syntax::of(call.callee, source) else {
        return None;
    };
    let method = HttpMethod::from_name(identifier(callee.property, source)?)?;

    // Either `router.get('/path', ...)` or `router.route('/path').get(...)`.
    let (literal, receiver, handler_args) = match call.arguments.first() {
        Some(first) if string_literal_value(first, source).is_some() => (
            string_literal_value(first, source)?,
            identifier(callee.object, source),
            &call.arguments[1..],
        ),
        _ => {
            let (literal, receiver) = route_chain(callee.object, source)?;
            (literal, receiver, &call.arguments[..])
        }
    };

    if !looks_like_route_path(literal) || handler_args.is_empty() {
        return None;
    }

    let prefix = receiver.and_then(|r| prefixes.resolve(r));
    let path = match &prefix {
        Some(prefix) => join_route_path(prefix, literal),
        None => normalize_route_path(literal),
    };

    let (last, middleware_args) = handler_args.split_last()?;
    let middlewares = middleware_args
        .iter()
        .filter_map(|arg| identifier(*arg, source))
        .map(str::to_string)
        .collect();
    let info = describe_handler(*last, source, imports, 0);

    Some(RegisteredRoute {
        locally_prefixed: prefix.is_some(),
        route: DetectedRoute {
            method,
            path,
            file_path: file.path().to_path_buf(),
            line: start_line(&call.node),
            middlewares,
            handler: info.handler,
            router_prefix: prefix,
            controller_file_path: info.controller_file,
            controller_function: info.controller_function,
            inline_span: info.inline_span,
        },
    })
}

/// Walk `x.route('/p').get(a).post(b)` back to the `route('/p')` call.
fn route_chain<'a>(mut receiver: Node<'a>, source: &'a str) -> Option<(&'a str, Option<&'a str>)> {
    loop {
        let Syntax::Call(call) = Syntax::of(receiver, source) else {
            return None;
        };
        let Syntax::Member(member) = Syntax::of(call.callee, source) else {
            return None;
        };
        let name = identifier(member.property, source)?;
        if name == "route" {
            let literal = string_literal_value(call.arguments.first()?, source)?;
            return Some((literal, identifier(member.object, source)));
        }
        HttpMethod::from_name(name)?;
        receiver = member.object;
    }
}

/// Express paths start with `/` (or are a bare wildcard); this keeps
/// `cache.get('key', fallback)` and `app.get('env')` out.
fn looks_like_route_path(literal: &str) -> bool {
    literal.starts_with('/') || literal.starts_with('*')
}

fn describe_handler(node: Node, source: &str, imports: &ImportTable, depth: usize) -> HandlerInfo {
    match Syntax::of(node, source) {
        Syntax::Identifier(name) => {
            let imported = imports.functions.get(name);
            HandlerInfo {
                handler: name.to_string(),
                controller_file: imported.map(|i| i.file.clone()),
                controller_function: imported.map(|i| i.exported.clone()),
                inline_span: None,
            }
        }
        Syntax::Member(_) => match simple_member(node, source) {
            Some((object, method)) => {
                let file = imports.file_of(object).cloned();
                HandlerInfo {
                    handler: format!("{object}.{method}"),
                    controller_function: file.as_ref().map(|_| method.to_string()),
                    controller_file: file,
                    inline_span: None,
                }
            }
            None => HandlerInfo {
                handler: node_text(&node, source).to_string(),
                ..Default::default()
            },
        },
        Syntax::FunctionExpr => HandlerInfo {
            handler: ANONYMOUS_HANDLER.to_string(),
            inline_span: Some(LineSpan {
                start: start_line(&node),
                end: end_line(&node),
            }),
            ..Default::default()
        },
        // asyncHandler(createUser), catchErrors(ctrl.create)
        Syntax::Call(call) if depth == 0 => call
            .arguments
            .iter()
            .find(|arg| {
                matches!(
                    Syntax::of(**arg, source),
                    Syntax::Identifier(_) | Syntax::Member(_) | Syntax::FunctionExpr
                )
            })
            .map(|arg| describe_handler(*arg, source, imports, depth + 1))
            .unwrap_or_else(anonymous),
        Syntax::Call(_)
        | Syntax::StringLiteral(_)
        | Syntax::FunctionDecl { .. }
        | Syntax::VariableDeclarator { .. }
        | Syntax::Assignment { .. }
        | Syntax::Method { .. }
        | Syntax::Import { .. }
        | Syntax::Other => anonymous(),
    }
}

fn anonymous() -> HandlerInfo {
    HandlerInfo {
        handler: ANONYMOUS_HANDLER.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_source, SupportedLanguage};
    use crate::routes::bindings::{collect_imports, collect_prefixes};
    use std::path::Path;

    fn routes_of(src: &str) -> Vec<DetectedRoute> {
        let file = parse_source(
            Path::new("/virtual/routes.js"),
            src.to_string(),
            SupportedLanguage::JavaScript,
        )
        .unwrap();
        let imports = collect_imports(&file);
        let prefixes = collect_prefixes(&file);
        collect_routes(&file, &imports, &prefixes)
            .into_iter()
            .map(|r| r.route)
            .collect()
    }

    #[test]
    fn test_basic_registrations() {
        let routes = routes_of(
            r#"
const router = express.Router();
router.get('/users', listUsers);
router.POST('/users', auth, validate, createUser);
router.delete('/users/:id', auth, removeUser);
"#,
        );
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].method, HttpMethod::Get);
        assert_eq!(routes[0].path, "/users");
        assert_eq!(routes[0].line, 3);
        assert_eq!(routes[0].handler, "listUsers");
        assert_eq!(routes[1].method, HttpMethod::Post);
        assert_eq!(routes[1].middlewares, vec!["auth", "validate"]);
        assert_eq!(routes[2].path, "/users/:id");
        assert_eq!(routes[2].handler, "removeUser");
    }

    #[test]
    fn test_local_prefix_applies() {
        let routes = routes_of(
            r#"
const router = express.Router();
app.use('/api/', router);
router.get('/users/:id', getUser);
app.get('/health', ping);
"#,
        );
        assert_eq!(routes[0].path, "/api/users/:id");
        assert_eq!(routes[0].router_prefix.as_deref(), Some("/api/"));
        assert_eq!(routes[1].path, "/health");
        assert_eq!(routes[1].router_prefix, None);
    }

    #[test]
    fn test_handler_shapes() {
        let routes = routes_of(
            r#"
router.get('/a', userController.list);
router.post('/b', async (req, res) => {
  res.json(req.body);
});
router.put('/c', asyncHandler(updateThing));
router.patch('/d', this.ctrl.patch);
router.head('/e', [a, b]);
"#,
        );
        assert_eq!(routes[0].handler, "userController.list");
        assert_eq!(routes[0].controller_file_path, None);
        assert_eq!(routes[1].handler, ANONYMOUS_HANDLER);
        assert_eq!(routes[1].inline_span, Some(LineSpan { start: 3, end: 5 }));
        assert_eq!(routes[2].handler, "updateThing");
        assert_eq!(routes[3].handler, "this.ctrl.patch");
        assert_eq!(routes[4].handler, ANONYMOUS_HANDLER);
    }

    #[test]
    fn test_non_routes_are_ignored() {
        let routes = routes_of(
            r#"
app.get('env');
cache.get('user:1', fallback);
const x = map.get(key);
app.all('/any', handler);
app.use('/static', express.static('public'));
"#,
        );
        assert!(routes.is_empty());
    }

    #[test]
    fn test_route_chain() {
        let routes = routes_of(
            r#"
app.use('/api', router);
router.route('/items/:id').get(getItem).put(auth, updateItem);
"#,
        );
        assert_eq!(routes.len(), 2);
        let methods: Vec<_> = routes.iter().map(|r| r.method).collect();
        assert!(methods.contains(&HttpMethod::Get));
        assert!(methods.contains(&HttpMethod::Put));
        assert!(routes.iter().all(|r| r.path == "/api/items/:id"));
        let put = routes.iter().find(|r| r.method == HttpMethod::Put).unwrap();
        assert_eq!(put.middlewares, vec!["auth"]);
        assert_eq!(put.handler, "updateItem");
    }
}
