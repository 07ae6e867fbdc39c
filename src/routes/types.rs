//
//  types.rs
//  RouteLens
//

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RouteLensError;

/// The seven verbs a route registration can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Case-insensitive lookup of a registration method name (`get`, `POST`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// GET/POST/PUT/DELETE/PATCH.
    pub fn is_standard(&self) -> bool {
        !matches!(self, HttpMethod::Head | HttpMethod::Options)
    }

    /// Requests that create a resource; the server assigns ids and timestamps.
    pub fn is_create(&self) -> bool {
        matches!(self, HttpMethod::Post)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RouteLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::from_name(s)
            .ok_or_else(|| RouteLensError::InvalidRoute(format!("unknown HTTP method '{s}'")))
    }
}

/// Inclusive 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

/// One HTTP endpoint found in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedRoute {
    pub method: HttpMethod,
    /// Always starts with a single `/`, prefix already applied.
    pub path: String,
    pub file_path: PathBuf,
    /// 1-based line of the registration call.
    pub line: usize,
    pub middlewares: Vec<String>,
    /// Identifier, `object.method`, or `anonymous` for inline functions.
    pub handler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_function: Option<String>,
    /// Location of an inline handler function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_span: Option<LineSpan>,
}

pub const ANONYMOUS_HANDLER: &str = "anonymous";

impl DetectedRoute {
    /// Stable identity across scans: hash of method, path and declaring file.
    pub fn route_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(self.path.as_bytes());
        hasher.update(b" ");
        hasher.update(self.file_path.to_string_lossy().as_bytes());
        hex::encode(&hasher.finalize()[..8])
    }

    /// `GET /api/users/:id`
    pub fn display_short(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Join a router prefix and a route path with exactly one separator.
pub fn join_route_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    };
    normalize_route_path(&joined)
}

/// Force a single leading `/`.
pub fn normalize_route_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_name() {
        assert_eq!(HttpMethod::from_name("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_name("DELETE"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::from_name("Options"), Some(HttpMethod::Options));
        assert_eq!(HttpMethod::from_name("use"), None);
        assert_eq!(HttpMethod::from_name("all"), None);
        assert!("patch".parse::<HttpMethod>().is_ok());
        assert!("fetch".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_join_route_path() {
        assert_eq!(join_route_path("/api", "/users/:id"), "/api/users/:id");
        assert_eq!(join_route_path("/api/", "/users"), "/api/users");
        assert_eq!(join_route_path("/api/", "users"), "/api/users");
        assert_eq!(join_route_path("api", "users"), "/api/users");
        assert_eq!(join_route_path("/api", "/"), "/api");
        assert_eq!(join_route_path("", "/users"), "/users");
        assert_eq!(join_route_path("", ""), "/");
        assert_eq!(join_route_path("/", "//users"), "/users");
    }

    #[test]
    fn test_route_id_is_stable_and_distinct() {
        let route = DetectedRoute {
            method: HttpMethod::Get,
            path: "/users".into(),
            file_path: PathBuf::from("/p/routes/users.js"),
            line: 3,
            middlewares: vec![],
            handler: "list".into(),
            router_prefix: None,
            controller_file_path: None,
            controller_function: None,
            inline_span: None,
        };
        let mut moved = route.clone();
        moved.line = 40;
        assert_eq!(route.route_id(), moved.route_id());
        assert_eq!(route.route_id().len(), 16);

        let mut other = route.clone();
        other.method = HttpMethod::Post;
        assert_ne!(route.route_id(), other.route_id());
    }

    #[test]
    fn test_serializes_upper_case_method() {
        let json = serde_json::to_value(HttpMethod::Patch).unwrap();
        assert_eq!(json, serde_json::json!("PATCH"));
    }
}
