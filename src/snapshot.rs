//
//  snapshot.rs
//  RouteLens
//
//  Storage-shaped record of a route's code and predicted payload.
//  Persistence and dedup happen elsewhere; this only builds the value.
//

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::controller::ControllerContext;
use crate::hybrid::HybridPayloadPrediction;
use crate::routes::DetectedRoute;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub method: String,
    pub path: String,
    pub file_path: String,
    pub line: usize,
    pub function_name: Option<String>,
    pub recommended_approach: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSnapshot {
    pub route_id: String,
    pub code: String,
    /// sha256 of `code`, hex encoded.
    pub code_hash: String,
    pub predicted_payload: Map<String, Value>,
    pub metadata: SnapshotMetadata,
}

/// Hex sha256 of source text.
pub fn code_hash(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

impl RouteSnapshot {
    pub fn new(
        route: &DetectedRoute,
        context: Option<&ControllerContext>,
        prediction: Option<&HybridPayloadPrediction>,
    ) -> Self {
        let code = context.map(|c| c.controller_code.clone()).unwrap_or_default();
        Self {
            route_id: route.route_id(),
            code_hash: code_hash(&code),
            code,
            predicted_payload: prediction.map(|p| p.payload.clone()).unwrap_or_default(),
            metadata: SnapshotMetadata {
                method: route.method.to_string(),
                path: route.path.clone(),
                file_path: route.file_path.display().to_string(),
                line: route.line,
                function_name: context.map(|c| c.function_name.clone()),
                recommended_approach: prediction.and_then(|p| {
                    serde_json::to_value(p.recommended_approach)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                }),
                captured_at: Utc::now(),
            },
        }
    }

    /// Same code as `other`, so the store can skip it.
    pub fn same_code(&self, other: &RouteSnapshot) -> bool {
        self.route_id == other.route_id && self.code_hash == other.code_hash
    }
}
