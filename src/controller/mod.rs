//
//  mod.rs
//  RouteLens
//
//  Resolve a detected route to the source of its handler.
//

pub mod fields;
pub mod locate;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use locate::FunctionLocation;

use crate::parser::{parse_file, SourceFile};
use crate::routes::{DetectedRoute, ANONYMOUS_HANDLER};

/// Handler source and body-field hints for one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerContext {
    pub route: DetectedRoute,
    /// Sorted, deduplicated.
    pub req_body_fields: Vec<String>,
    /// Verbatim source lines `start_line..=end_line`.
    pub controller_code: String,
    pub function_name: String,
    /// File the handler was found in.
    pub file_path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

/// Locates handler implementations.
///
/// Stateless: every call re-reads the files involved, so edits made between
/// calls are always visible.
#[derive(Debug, Clone, Default)]
pub struct ControllerResolver;

impl ControllerResolver {
    pub fn new() -> Self {
        Self
    }

    /// Same file first, then the imported controller file.
    ///
    /// `None` means the handler could not be located; callers should offer a
    /// way back to `route.file_path:route.line` instead.
    pub fn extract_controller_context(&self, route: &DetectedRoute) -> Option<ControllerContext> {
        if let Some(span) = route.inline_span {
            let file = load(&route.file_path)?;
            let location = FunctionLocation {
                start_line: span.start,
                end_line: span.end,
            };
            return Some(build_context(route, &file, ANONYMOUS_HANDLER, location));
        }

        if let Some(name) = same_file_target(route) {
            if let Some(file) = load(&route.file_path) {
                if let Some(location) = locate::find_function(&file, name) {
                    return Some(build_context(route, &file, name, location));
                }
            }
        }

        if let (Some(path), Some(function)) =
            (&route.controller_file_path, &route.controller_function)
        {
            if let Some(file) = load(path) {
                if let Some(location) = locate::find_function(&file, function) {
                    return Some(build_context(route, &file, function, location));
                }
            }
        }

        debug!(route = %route.display_short(), handler = %route.handler, "handler not found");
        None
    }
}

/// Name to look for in the route's own file.
///
/// `ctrl.method` handlers are only searched locally when `ctrl` did not come
/// from another project file.
fn same_file_target(route: &DetectedRoute) -> Option<&str> {
    if route.handler == ANONYMOUS_HANDLER {
        return None;
    }
    match route.handler.rsplit_once('.') {
        None => Some(route.handler.as_str()),
        Some((_, method)) if route.controller_file_path.is_none() => Some(method),
        Some(_) => None,
    }
}

fn load(path: &Path) -> Option<SourceFile> {
    match parse_file(path) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "cannot read controller file");
            None
        }
    }
}

fn build_context(
    route: &DetectedRoute,
    file: &SourceFile,
    function_name: &str,
    location: FunctionLocation,
) -> ControllerContext {
    ControllerContext {
        route: route.clone(),
        req_body_fields: fields::request_body_fields(file).into_iter().collect(),
        controller_code: file.line_range(location.start_line, location.end_line),
        function_name: function_name.to_string(),
        file_path: file.path().to_path_buf(),
        start_line: location.start_line,
        end_line: location.end_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteDetector;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("routes")).unwrap();
        fs::create_dir_all(root.join("controllers")).unwrap();
        fs::write(
            root.join("routes/products.js"),
            r#"const router = require('express').Router();
const { createProduct } = require('../controllers/products');
const products = require('../controllers/products');

function listProducts(req, res) {
  res.json([]);
}

router.get('/products', listProducts);
router.post('/products', createProduct);
router.put('/products/:id', products.updateProduct);
router.delete('/products/:id', (req, res) => {
  res.status(204).end();
});
router.patch('/products/:id', missingHandler);
module.exports = router;
"#,
        )
        .unwrap();
        fs::write(
            root.join("controllers/products.js"),
            r#"exports.createProduct = async (req, res) => {
  const { name, price } = req.body;
  res.status(201).json({ name, price, sku: req.body.sku });
};

exports.updateProduct = async (req, res) => {
  res.json(req.body);
};
"#,
        )
        .unwrap();
        dir
    }

    fn route(routes: &[DetectedRoute], method: &str) -> DetectedRoute {
        routes
            .iter()
            .find(|r| r.method.as_str() == method)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_same_file_handler() {
        let dir = project();
        let routes = RouteDetector::new(dir.path()).detect_routes();
        let ctx = ControllerResolver::new()
            .extract_controller_context(&route(&routes, "GET"))
            .unwrap();
        assert_eq!(ctx.function_name, "listProducts");
        assert_eq!((ctx.start_line, ctx.end_line), (5, 7));
        assert_eq!(
            ctx.controller_code,
            "function listProducts(req, res) {\n  res.json([]);\n}"
        );
    }

    #[test]
    fn test_cross_file_named_import() {
        let dir = project();
        let routes = RouteDetector::new(dir.path()).detect_routes();
        let ctx = ControllerResolver::new()
            .extract_controller_context(&route(&routes, "POST"))
            .unwrap();
        assert_eq!(ctx.function_name, "createProduct");
        assert!(ctx.file_path.ends_with("controllers/products.js"));
        assert_eq!(ctx.req_body_fields, vec!["name", "price", "sku"]);
        assert!(ctx.controller_code.starts_with("exports.createProduct"));
    }

    #[test]
    fn test_cross_file_member_handler() {
        let dir = project();
        let routes = RouteDetector::new(dir.path()).detect_routes();
        let ctx = ControllerResolver::new()
            .extract_controller_context(&route(&routes, "PUT"))
            .unwrap();
        assert_eq!(ctx.function_name, "updateProduct");
        assert_eq!((ctx.start_line, ctx.end_line), (6, 8));
    }

    #[test]
    fn test_inline_handler() {
        let dir = project();
        let routes = RouteDetector::new(dir.path()).detect_routes();
        let ctx = ControllerResolver::new()
            .extract_controller_context(&route(&routes, "DELETE"))
            .unwrap();
        assert_eq!(ctx.function_name, ANONYMOUS_HANDLER);
        assert_eq!((ctx.start_line, ctx.end_line), (12, 14));
        assert!(ctx.controller_code.contains("status(204)"));
    }

    #[test]
    fn test_unresolvable_handler_is_none() {
        let dir = project();
        let routes = RouteDetector::new(dir.path()).detect_routes();
        assert!(ControllerResolver::new()
            .extract_controller_context(&route(&routes, "PATCH"))
            .is_none());
    }

    #[test]
    fn test_edits_are_picked_up() {
        let dir = project();
        let routes = RouteDetector::new(dir.path()).detect_routes();
        let get = route(&routes, "GET");
        let resolver = ControllerResolver::new();
        assert!(resolver.extract_controller_context(&get).is_some());

        fs::write(
            dir.path().join("routes/products.js"),
            "router.get('/products', listProducts);\n",
        )
        .unwrap();
        assert!(resolver.extract_controller_context(&get).is_none());
    }
}
