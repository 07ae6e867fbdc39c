//
//  mod.rs
//  RouteLens
//
//  Guess which collection a route reads or writes.
//

pub mod inflect;

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::routes::{DetectedRoute, HttpMethod};
use inflect::{is_plural, pluralize, singularize};

pub const MAX_ALTERNATIVES: usize = 5;

/// Path segments that never name a resource.
const IGNORED_SEGMENTS: &[&str] = &[
    "api",
    "v1",
    "v2",
    "v3",
    "admin",
    "public",
    "private",
    "endpoints",
];

/// File stems and directories that say nothing about the resource.
const GENERIC_FILE_NAMES: &[&str] = &["index", "routes", "router", "app", "server", "api"];

const GENERIC_DIRS: &[&str] = &["src", "lib", "app", "controllers", "controller", "handlers"];

const FILE_NAME_SUFFIXES: &[&str] = &["routes", "route", "router", "controller", "ctrl", "handler"];

const COMMON_RESOURCES: &[&str] = &[
    "users",
    "products",
    "orders",
    "posts",
    "comments",
    "categories",
    "items",
    "customers",
    "accounts",
    "articles",
    "reviews",
    "carts",
    "payments",
    "invoices",
    "messages",
    "notifications",
    "tasks",
    "projects",
    "events",
    "files",
    "images",
    "tags",
    "teams",
    "companies",
    "employees",
    "books",
    "courses",
    "students",
    "transactions",
];

/// Auth-flavoured segments that map straight to a collection.
const SPECIAL_SEGMENTS: &[(&str, &str)] = &[
    ("login", "users"),
    ("signup", "users"),
    ("register", "users"),
    ("auth", "users"),
    ("me", "users"),
    ("account", "users"),
    ("password", "users"),
    ("verify", "users"),
    ("logout", "sessions"),
    ("session", "sessions"),
    ("sessions", "sessions"),
    ("token", "sessions"),
    ("refresh", "sessions"),
    ("profile", "profiles"),
];

const AUTH_KEYWORDS: &[&str] = &["auth", "login", "signup", "signin", "register", "logout"];

/// A scored collection-name guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInference {
    pub collection_name: String,
    pub confidence: f64,
    pub reasoning: String,
    pub alternative_names: Vec<String>,
}

impl CollectionInference {
    fn new(name: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            collection_name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            alternative_names: Vec::new(),
        }
    }

    fn with_alternatives(mut self, names: impl IntoIterator<Item = String>) -> Self {
        for name in names {
            if name != self.collection_name && !self.alternative_names.contains(&name) {
                self.alternative_names.push(name);
            }
        }
        self
    }

    /// Primary name followed by the alternatives.
    pub fn candidate_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.collection_name.as_str())
            .chain(self.alternative_names.iter().map(String::as_str))
    }
}

/// Runs the four naming strategies over a route.
#[derive(Debug, Clone, Default)]
pub struct CollectionInferencer;

impl CollectionInferencer {
    pub fn new() -> Self {
        Self
    }

    /// Best guess; every other distinct name becomes an alternative.
    pub fn infer_collection_name(&self, route: &DetectedRoute) -> CollectionInference {
        let suggestions = self.get_collection_suggestions(route);
        let Some(primary) = suggestions.first().cloned() else {
            return CollectionInference::new("unknown", 0.0, "no naming strategy matched");
        };

        let mut others: Vec<String> = primary.alternative_names.clone();
        for candidate in suggestions.iter().skip(1) {
            others.extend(candidate.candidate_names().map(str::to_string));
        }

        let mut primary = CollectionInference {
            alternative_names: Vec::new(),
            ..primary
        }
        .with_alternatives(others);
        primary.alternative_names.truncate(MAX_ALTERNATIVES);
        primary
    }

    /// One guess per strategy that produced something, highest confidence
    /// first, duplicate names dropped.
    pub fn get_collection_suggestions(&self, route: &DetectedRoute) -> Vec<CollectionInference> {
        let mut candidates: Vec<CollectionInference> = [
            from_path(route),
            from_special_case(route),
            from_method_pattern(route),
            from_file_name(&route.file_path),
        ]
        .into_iter()
        .flatten()
        .collect();

        // Stable: ties keep strategy order.
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut seen = Vec::new();
        candidates.retain(|c| {
            if seen.contains(&c.collection_name) {
                false
            } else {
                seen.push(c.collection_name.clone());
                true
            }
        });
        candidates
    }
}

fn resource_segment(path: &str) -> Option<&str> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .filter(|s| !is_param(s))
        .find(|s| !IGNORED_SEGMENTS.contains(&s.to_ascii_lowercase().as_str()))
}

fn is_param(segment: &str) -> bool {
    segment.starts_with(':') || segment.starts_with('*') || segment.starts_with('{')
}

fn has_id_param(path: &str) -> bool {
    path.split('/')
        .filter(|s| is_param(s))
        .any(|s| s.to_ascii_lowercase().contains("id"))
}

fn from_path(route: &DetectedRoute) -> Option<CollectionInference> {
    let segment = resource_segment(&route.path)?;
    let lower = segment.to_ascii_lowercase();
    let name = singularize(segment);

    let mut confidence = 0.5;
    let mut reasons = vec![format!("path segment '{segment}'")];
    if COMMON_RESOURCES.contains(&lower.as_str())
        || COMMON_RESOURCES.contains(&pluralize(&lower).as_str())
    {
        confidence += 0.3;
        reasons.push("common resource name".to_string());
    }
    if is_plural(segment) {
        confidence += 0.2;
        reasons.push("plural segment".to_string());
    }
    if route.method.is_standard() {
        confidence += 0.1;
    }

    Some(
        CollectionInference::new(name.clone(), confidence, reasons.join(", "))
            .with_alternatives([segment.to_string(), pluralize(&name)]),
    )
}

fn from_special_case(route: &DetectedRoute) -> Option<CollectionInference> {
    let lower = route.path.to_ascii_lowercase();
    for segment in lower.split('/').filter(|s| !s.is_empty()) {
        if let Some((_, collection)) = SPECIAL_SEGMENTS.iter().find(|(key, _)| *key == segment) {
            return Some(CollectionInference::new(
                *collection,
                0.8,
                format!("'{segment}' routes belong to {collection}"),
            ));
        }
    }

    let auth_like = AUTH_KEYWORDS.iter().any(|k| lower.contains(k));
    let password_change = route.method == HttpMethod::Post && lower.contains("password");
    if auth_like || password_change {
        return Some(CollectionInference::new(
            "users",
            0.7,
            "authentication-related path",
        ));
    }
    None
}

fn from_method_pattern(route: &DetectedRoute) -> Option<CollectionInference> {
    let segment = resource_segment(&route.path)?;
    let name = pluralize(&singularize(segment));
    let id = has_id_param(&route.path);

    let mut confidence = 0.3;
    let mut reasoning = format!("{} on '{segment}'", route.method);
    match route.method {
        HttpMethod::Get | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete if id => {
            confidence += 0.2;
            reasoning.push_str(", single-document access by id");
        }
        HttpMethod::Post if !id => {
            confidence += 0.2;
            reasoning.push_str(", creates into a collection");
        }
        _ => {}
    }
    Some(CollectionInference::new(name, confidence, reasoning))
}

/// The file stem is tried before any directory; `orders/invoiceRoutes.js`
/// yields `invoice`. Directories only count when the stem is generic.
fn from_file_name(file: &Path) -> Option<CollectionInference> {
    let stem = file
        .file_name()?
        .to_str()?
        .split('.')
        .next()
        .unwrap_or_default();
    let stripped = strip_name_suffix(stem);

    if !stripped.is_empty() && !GENERIC_FILE_NAMES.contains(&stripped.to_ascii_lowercase().as_str())
    {
        return Some(CollectionInference::new(
            stripped,
            0.4,
            format!("declared in '{}'", file.display()),
        ));
    }

    // users/index.js, users/routes.js
    let dir = file
        .parent()?
        .components()
        .rev()
        .take(3)
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .find(|d| {
            let lower = d.to_ascii_lowercase();
            !GENERIC_FILE_NAMES.contains(&lower.as_str())
                && !GENERIC_DIRS.contains(&lower.as_str())
                && !IGNORED_SEGMENTS.contains(&lower.as_str())
        })?;
    Some(CollectionInference::new(
        dir,
        0.4,
        format!("declared under directory '{dir}'"),
    ))
}

/// `userRoutes -> user`, `orders-controller -> orders`.
fn strip_name_suffix(stem: &str) -> &str {
    let lower = stem.to_ascii_lowercase();
    for suffix in FILE_NAME_SUFFIXES {
        if lower.len() > suffix.len() && lower.ends_with(suffix) {
            return stem[..stem.len() - suffix.len()].trim_end_matches(['-', '_']);
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn route(method: HttpMethod, path: &str, file: &str) -> DetectedRoute {
        DetectedRoute {
            method,
            path: path.to_string(),
            file_path: PathBuf::from(file),
            line: 1,
            middlewares: Vec::new(),
            handler: "h".to_string(),
            router_prefix: None,
            controller_file_path: None,
            controller_function: None,
            inline_span: None,
        }
    }

    #[test]
    fn test_products_by_id() {
        let inference = CollectionInferencer::new().infer_collection_name(&route(
            HttpMethod::Get,
            "/api/v1/products/:id",
            "/app/routes/index.js",
        ));
        assert_eq!(inference.collection_name, "product");
        // 0.5 + 0.3 + 0.2 + 0.1, capped.
        assert_eq!(inference.confidence, 1.0);
        assert!(inference.alternative_names.contains(&"products".to_string()));
        assert!(inference.alternative_names.len() <= MAX_ALTERNATIVES);
    }

    #[test]
    fn test_uncommon_singular_segment() {
        let inference = CollectionInferencer::new().infer_collection_name(&route(
            HttpMethod::Options,
            "/widget",
            "/app/routes/index.js",
        ));
        assert_eq!(inference.collection_name, "widget");
        assert_eq!(inference.confidence, 0.5);
    }

    #[test]
    fn test_special_cases() {
        let inferencer = CollectionInferencer::new();
        let login = inferencer.get_collection_suggestions(&route(
            HttpMethod::Post,
            "/api/auth/login",
            "/app/routes/index.js",
        ));
        let special = login.iter().find(|c| c.collection_name == "users").unwrap();
        assert_eq!(special.confidence, 0.8);

        let reset = inferencer.get_collection_suggestions(&route(
            HttpMethod::Post,
            "/reset-password",
            "/app/routes/index.js",
        ));
        let users = reset.iter().find(|c| c.collection_name == "users").unwrap();
        assert_eq!(users.confidence, 0.7);
    }

    #[test]
    fn test_method_pattern() {
        let create = from_method_pattern(&route(HttpMethod::Post, "/orders", "/x.js")).unwrap();
        assert_eq!(create.collection_name, "orders");
        assert!((create.confidence - 0.5).abs() < 1e-9);

        let by_id = from_method_pattern(&route(HttpMethod::Delete, "/order/:orderId", "/x.js"))
            .unwrap();
        assert_eq!(by_id.collection_name, "orders");
        assert!((by_id.confidence - 0.5).abs() < 1e-9);

        let list = from_method_pattern(&route(HttpMethod::Get, "/orders", "/x.js")).unwrap();
        assert!((list.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_file_name_strategy() {
        let named = from_file_name(Path::new("/app/src/routes/invoiceRoutes.js")).unwrap();
        assert_eq!(named.collection_name, "invoice");
        assert_eq!(named.confidence, 0.4);

        let dotted = from_file_name(Path::new("/app/src/payments.routes.ts")).unwrap();
        assert_eq!(dotted.collection_name, "payments");

        let nested = from_file_name(Path::new("/app/src/modules/orders/index.js")).unwrap();
        assert_eq!(nested.collection_name, "orders");

        assert!(from_file_name(Path::new("/src/routes/index.js")).is_none());

        let both = from_file_name(Path::new("/app/src/orders/invoiceRoutes.js")).unwrap();
        assert_eq!(both.collection_name, "invoice");
    }

    #[test]
    fn test_suggestions_sorted_and_distinct() {
        let suggestions = CollectionInferencer::new().get_collection_suggestions(&route(
            HttpMethod::Get,
            "/users/:id",
            "/app/routes/users.js",
        ));
        let confidences: Vec<f64> = suggestions.iter().map(|s| s.confidence).collect();
        let mut sorted = confidences.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(confidences, sorted);

        let mut names: Vec<&str> = suggestions.iter().map(|s| s.collection_name.as_str()).collect();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn test_nothing_to_go_on() {
        let inference = CollectionInferencer::new().infer_collection_name(&route(
            HttpMethod::Get,
            "/",
            "/src/routes/index.js",
        ));
        assert_eq!(inference.collection_name, "unknown");
        assert_eq!(inference.confidence, 0.0);
    }
}
