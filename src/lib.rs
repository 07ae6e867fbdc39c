//! # RouteLens
//!
//! Route discovery and request-payload prediction for JavaScript/TypeScript
//! Express backends.
//!
//! RouteLens reads a backend's source tree, finds every HTTP route it
//! registers, and proposes a realistic request body for each one by
//! combining a language model's reading of the handler with documents
//! sampled from the backend's own MongoDB database.
//!
//! ## Key Features
//!
//! - **Static route discovery**: tree-sitter based, tolerant of broken files
//! - **Handler extraction**: same-file, imported-controller and inline handlers
//! - **Collection inference**: confidence-scored guesses, never a yes/no
//! - **Live sampling**: schema statistics and real foreign-key values
//! - **Hybrid payloads**: model and data merged into one ranked field list
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use routelens::{Connection, HybridOptions, HybridPayloadGenerator, RouteDetector};
//! use routelens::config::LlmConfig;
//! use routelens::predict::{HttpCompletionClient, LlmPredictor};
//!
//! # async fn run() -> routelens::Result<()> {
//! let routes = RouteDetector::new("./backend").detect_routes();
//!
//! let connection = Arc::new(Connection::new(Default::default()));
//! connection.connect().await;
//!
//! let client = Arc::new(HttpCompletionClient::new(LlmConfig::default())?);
//! let generator = HybridPayloadGenerator::new(Arc::new(LlmPredictor::new(client)), connection);
//!
//! let prediction = generator
//!     .generate_hybrid_prediction(&routes[0], &HybridOptions::default())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&prediction.payload)?);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod hybrid;
pub mod inference;
pub mod parser;
pub mod predict;
pub mod routes;
pub mod snapshot;

// Re-exports for convenience
pub use config::RouteLensConfig;
pub use controller::{ControllerContext, ControllerResolver};
pub use data::{Connection, DataSampler, ObjectIdResolver, SchemaViewer};
pub use error::{Result, RouteLensError};
pub use hybrid::{HybridOptions, HybridPayloadGenerator, HybridPayloadPrediction};
pub use inference::{CollectionInference, CollectionInferencer};
pub use routes::{DetectedRoute, HttpMethod, RouteDetector};
pub use snapshot::RouteSnapshot;
