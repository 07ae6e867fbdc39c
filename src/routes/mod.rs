//! Static route discovery for Express-style JS/TS backends.
//!
//! Each candidate file goes through three passes over its syntax tree, in
//! order:
//!
//! 1. imports / `require()` bindings ([`bindings::collect_imports`])
//! 2. router prefixes from `.use('/prefix', router)` ([`bindings::collect_prefixes`])
//! 3. route registrations ([`registration::collect_routes`])
//!
//! Every pass returns a plain value that the next one reads, so nothing is
//! shared between files except the mount table computed after all files are
//! analysed. That table carries `app.use('/api', usersRouter)` across file
//! boundaries when `usersRouter` is imported from another project file.

pub mod bindings;
pub mod registration;
pub mod resolve;
pub mod types;
pub mod walker;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

pub use types::{DetectedRoute, HttpMethod, LineSpan, ANONYMOUS_HANDLER};
pub use walker::RouteFileConventions;

use bindings::{ImportTable, MountTarget, PrefixTable};
use registration::RegisteredRoute;
use resolve::normalize_path;
use types::join_route_path;

use crate::parser::parse_file;

/// Everything the three passes learned about one file.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub imports: ImportTable,
    pub prefixes: PrefixTable,
    pub routes: Vec<RegisteredRoute>,
}

/// Finds HTTP routes under a workspace root.
#[derive(Debug, Clone)]
pub struct RouteDetector {
    root: PathBuf,
    conventions: RouteFileConventions,
}

impl RouteDetector {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::with_conventions(root, RouteFileConventions::default())
    }

    pub fn with_conventions<P: Into<PathBuf>>(root: P, conventions: RouteFileConventions) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or_else(|_| normalize_path(&root));
        Self { root, conventions }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate route files, sorted.
    pub fn candidate_files(&self) -> Vec<PathBuf> {
        walker::find_route_files(&self.root, &self.conventions)
    }

    /// Scan the whole workspace.
    ///
    /// Files are analysed in parallel; the output order depends only on the
    /// sorted file list, so two scans of an unchanged tree are identical.
    pub fn detect_routes(&self) -> Vec<DetectedRoute> {
        let files = self.candidate_files();
        debug!(root = %self.root.display(), files = files.len(), "scanning route files");

        let analyses: Vec<FileAnalysis> = files
            .par_iter()
            .filter_map(|path| analyze_file(path))
            .collect();

        let mounts = mount_prefixes(&analyses);
        let routes: Vec<DetectedRoute> = analyses
            .into_iter()
            .flat_map(|analysis| {
                let mount = mounts.get(&analysis.path).cloned();
                analysis
                    .routes
                    .into_iter()
                    .map(move |registered| apply_mount(registered, mount.as_deref()))
            })
            .collect();

        info!(routes = routes.len(), "route detection finished");
        routes
    }

    /// Scan a single file using only what that file itself declares.
    ///
    /// Purely functional: nothing from this call is visible to a later
    /// [`detect_routes`](Self::detect_routes).
    pub fn detect_routes_in_file(&self, path: &Path) -> Vec<DetectedRoute> {
        let path = if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.root.join(path))
        };
        analyze_file(&path)
            .map(|analysis| analysis.routes.into_iter().map(|r| r.route).collect())
            .unwrap_or_default()
    }
}

/// Run the three passes over one file. Parse and read failures are logged
/// and the file is skipped.
pub fn analyze_file(path: &Path) -> Option<FileAnalysis> {
    let file = match parse_file(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping unparseable route file");
            return None;
        }
    };

    let imports = bindings::collect_imports(&file);
    let prefixes = bindings::collect_prefixes(&file);
    let routes = registration::collect_routes(&file, &imports, &prefixes);
    debug!(file = %path.display(), routes = routes.len(), "analysed route file");

    Some(FileAnalysis {
        path: path.to_path_buf(),
        imports,
        prefixes,
        routes,
    })
}

/// A mount edge: `target` file is mounted from `parent` under `prefix`.
struct MountEdge {
    parent: PathBuf,
    prefix: String,
}

/// Prefix each mounted router file receives from the files that mount it.
///
/// The first mount seen (in sorted file order) wins; chains compose and
/// cycles are cut.
fn mount_prefixes(analyses: &[FileAnalysis]) -> BTreeMap<PathBuf, String> {
    let mut edges: BTreeMap<PathBuf, MountEdge> = BTreeMap::new();

    for analysis in analyses {
        for router_use in &analysis.prefixes.uses {
            let target = match &router_use.target {
                MountTarget::Identifier(name) => analysis.imports.file_of(name).cloned(),
                MountTarget::File(path) => Some(path.clone()),
            };
            let Some(target) = target else {
                continue;
            };
            if target == analysis.path {
                continue;
            }
            let local = router_use
                .receiver
                .as_deref()
                .and_then(|r| analysis.prefixes.resolve(r));
            let prefix = match local {
                Some(local) => join_route_path(&local, &router_use.prefix),
                None => router_use.prefix.clone(),
            };
            edges.entry(target).or_insert(MountEdge {
                parent: analysis.path.clone(),
                prefix,
            });
        }
    }

    edges
        .keys()
        .filter_map(|file| {
            let mut seen = BTreeSet::new();
            resolve_mount(file, &edges, &mut seen).map(|prefix| (file.clone(), prefix))
        })
        .collect()
}

fn resolve_mount(
    file: &Path,
    edges: &BTreeMap<PathBuf, MountEdge>,
    seen: &mut BTreeSet<PathBuf>,
) -> Option<String> {
    if !seen.insert(file.to_path_buf()) {
        return None;
    }
    let edge = edges.get(file)?;
    Some(match resolve_mount(&edge.parent, edges, seen) {
        Some(parent) => join_route_path(&parent, &edge.prefix),
        None => edge.prefix.clone(),
    })
}

fn apply_mount(registered: RegisteredRoute, mount: Option<&str>) -> DetectedRoute {
    let mut route = registered.route;
    if registered.locally_prefixed {
        return route;
    }
    if let Some(mount) = mount {
        route.path = join_route_path(mount, &route.path);
        route.router_prefix = Some(mount.to_string());
    }
    route
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn sample_project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "app.js",
            r#"
const express = require('express');
const usersRouter = require('./routes/users');
const app = express();
app.use(express.json());
app.use('/api', usersRouter);
app.use('/health', require('./routes/health'));
app.get('/', (req, res) => res.send('ok'));
module.exports = app;
"#,
        );
        write(
            root,
            "routes/users.js",
            r#"
const router = require('express').Router();
const { getUser, createUser } = require('../controllers/users');
const orders = require('./orders');
router.use('/users/:userId/orders', orders);
router.get('/users/:id', getUser);
router.post('/users', auth, createUser);
module.exports = router;
"#,
        );
        write(
            root,
            "routes/orders.js",
            r#"
const router = require('express').Router({ mergeParams: true });
router.get('/', (req, res) => res.json([]));
module.exports = router;
"#,
        );
        write(
            root,
            "routes/health.js",
            "const r = require('express').Router();\nr.get('/live', live);\nmodule.exports = r;\n",
        );
        write(
            root,
            "routes/broken.js",
            "router.get('/oops', (req, res => {\n",
        );
        write(
            root,
            "controllers/users.js",
            "exports.getUser = async (req, res) => {};\nexports.createUser = async (req, res) => {};\n",
        );
        dir
    }

    #[test]
    fn test_detect_routes_with_cross_file_mounts() {
        let dir = sample_project();
        let root = dir.path().canonicalize().unwrap();
        let detector = RouteDetector::new(&root);

        let routes = detector.detect_routes();
        let listed: Vec<String> = routes.iter().map(|r| r.display_short()).collect();

        assert!(listed.contains(&"GET /".to_string()));
        assert!(listed.contains(&"GET /api/users/:id".to_string()));
        assert!(listed.contains(&"POST /api/users".to_string()));
        assert!(listed.contains(&"GET /api/users/:userId/orders".to_string()));
        assert!(listed.contains(&"GET /health/live".to_string()));
        assert!(!listed.iter().any(|r| r.contains("oops")));

        let get_user = routes
            .iter()
            .find(|r| r.path == "/api/users/:id")
            .unwrap();
        assert_eq!(get_user.handler, "getUser");
        assert_eq!(
            get_user.controller_file_path,
            Some(root.join("controllers/users.js"))
        );
        assert_eq!(get_user.controller_function.as_deref(), Some("getUser"));
        assert_eq!(get_user.router_prefix.as_deref(), Some("/api"));

        for route in &routes {
            assert!(route.path.starts_with('/'));
            assert!(!route.path.starts_with("//"));
            assert_eq!(route.method.as_str(), route.method.as_str().to_uppercase());
        }
    }

    #[test]
    fn test_detect_routes_is_idempotent() {
        let dir = sample_project();
        let detector = RouteDetector::new(dir.path());
        assert_eq!(detector.detect_routes(), detector.detect_routes());
    }

    #[test]
    fn test_single_file_detection_is_local_and_side_effect_free() {
        let dir = sample_project();
        let detector = RouteDetector::new(dir.path());
        let before = detector.detect_routes();

        let single = detector.detect_routes_in_file(Path::new("routes/users.js"));
        assert_eq!(single.len(), 2);
        assert!(single.iter().any(|r| r.path == "/users/:id"));

        assert_eq!(detector.detect_routes(), before);
    }

    #[test]
    fn test_single_file_detection_of_broken_file_is_empty() {
        let dir = sample_project();
        let detector = RouteDetector::new(dir.path());
        assert!(detector
            .detect_routes_in_file(Path::new("routes/broken.js"))
            .is_empty());
        assert!(detector
            .detect_routes_in_file(Path::new("routes/missing.js"))
            .is_empty());
    }

    #[test]
    fn test_mount_cycle_terminates() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "routes/a.js",
            "const b = require('./b');\nrouter.use('/b', b);\nrouter.get('/x', x);\n",
        );
        write(
            root,
            "routes/b.js",
            "const a = require('./a');\nrouter.use('/a', a);\nrouter.get('/y', y);\n",
        );
        let routes = RouteDetector::new(root).detect_routes();
        assert_eq!(routes.len(), 2);
    }
}
