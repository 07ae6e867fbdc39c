//! Source commands: routes, context, infer, predict.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::json;

use super::{print_json, Workspace};
use crate::controller::ControllerResolver;
use crate::hybrid::{HybridOptions, HybridPayloadGenerator};
use crate::inference::CollectionInferencer;
use crate::predict::{HttpCompletionClient, LlmPredictor};
use crate::routes::types::normalize_route_path;
use crate::routes::{DetectedRoute, HttpMethod, RouteDetector, RouteFileConventions};
use crate::snapshot::RouteSnapshot;

fn detector(workspace: &Workspace) -> RouteDetector {
    RouteDetector::with_conventions(
        &workspace.root,
        RouteFileConventions::new(&workspace.config.workspace.extra_ignore),
    )
}

/// Detected route matching `method` and `path`.
fn find_route(workspace: &Workspace, method: &str, path: &str) -> Result<Option<DetectedRoute>> {
    let method: HttpMethod = method.parse()?;
    let path = normalize_route_path(path);
    Ok(detector(workspace)
        .detect_routes()
        .into_iter()
        .find(|r| r.method == method && r.path == path))
}

fn require_route(workspace: &Workspace, method: &str, path: &str) -> Result<DetectedRoute> {
    find_route(workspace, method, path)?
        .ok_or_else(|| anyhow!("no route {} {} under {}", method.to_uppercase(), path, workspace.root.display()))
}

pub fn routes(workspace: &Workspace, file: Option<&Path>) -> Result<()> {
    let detector = detector(workspace);
    let routes = match file {
        Some(file) => detector.detect_routes_in_file(file),
        None => detector.detect_routes(),
    };
    print_json(&routes)
}

pub fn context(workspace: &Workspace, method: &str, path: &str) -> Result<()> {
    let route = require_route(workspace, method, path)?;
    match ControllerResolver::new().extract_controller_context(&route) {
        Some(context) => print_json(&context),
        None => Err(anyhow!(
            "handler '{}' not found; it is declared at {}:{}",
            route.handler,
            route.file_path.display(),
            route.line
        )),
    }
}

pub fn infer(workspace: &Workspace, method: &str, path: &str, all: bool) -> Result<()> {
    // Works for routes that are not in the project too.
    let route = match find_route(workspace, method, path)? {
        Some(route) => route,
        None => DetectedRoute {
            method: method.parse()?,
            path: normalize_route_path(path),
            file_path: workspace.root.clone(),
            line: 0,
            middlewares: Vec::new(),
            handler: crate::routes::ANONYMOUS_HANDLER.to_string(),
            router_prefix: None,
            controller_file_path: None,
            controller_function: None,
            inline_span: None,
        },
    };

    let inferencer = CollectionInferencer::new();
    if all {
        print_json(&inferencer.get_collection_suggestions(&route))
    } else {
        print_json(&inferencer.infer_collection_name(&route))
    }
}

pub async fn predict(
    workspace: &Workspace,
    method: &str,
    path: &str,
    options: &HybridOptions,
    snapshot: bool,
) -> Result<()> {
    let route = require_route(workspace, method, path)?;
    let connection = workspace.connect().await;
    let client = Arc::new(HttpCompletionClient::new(workspace.config.llm.clone())?);
    let generator = HybridPayloadGenerator::new(Arc::new(LlmPredictor::new(client)), connection.clone());

    let prediction = generator.generate_hybrid_prediction(&route, options).await?;
    connection.disconnect();

    if snapshot {
        let context = ControllerResolver::new().extract_controller_context(&route);
        let record = RouteSnapshot::new(&route, context.as_ref(), Some(&prediction));
        print_json(&json!({ "snapshot": record, "payload": prediction.payload }))
    } else {
        print_json(&prediction)
    }
}
