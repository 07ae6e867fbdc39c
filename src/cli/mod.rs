//! CLI module for RouteLens.
//!
//! Commands:
//! - Source: routes, context, infer
//! - Data store: collections, schema, sample, resolve-id
//! - Prediction: predict
//!
//! Every command prints JSON on stdout; logs go to stderr.

pub mod data;
pub mod source;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use crate::config::{RouteLensConfig, CONFIG_FILE_NAME};
use crate::data::Connection;

const DEFAULT_ROOT: &str = ".";

#[derive(Parser)]
#[command(name = "routelens")]
#[command(about = "RouteLens - Express route discovery and payload prediction", long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Config file (default: <root>/routelens.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// MongoDB connection string, overrides the config file
    #[arg(long)]
    pub mongodb_uri: Option<String>,

    /// Database name, overrides the config file
    #[arg(long)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    // ─── Source ───────────────────────────────────────────────────
    /// List detected routes
    Routes {
        /// Scan a single file instead of the whole project
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show the handler source for a route
    Context {
        /// HTTP method
        method: String,
        /// Full route path, e.g. /api/users/:id
        path: String,
    },

    /// Guess the collection behind a route
    Infer {
        method: String,
        path: String,

        /// Show every strategy's guess
        #[arg(short, long)]
        all: bool,
    },

    // ─── Data store ───────────────────────────────────────────────
    /// List collections with counts
    Collections,

    /// Field statistics for a collection
    Schema {
        collection: String,

        /// Documents to sample
        #[arg(short, long, default_value = "20")]
        sample_size: usize,
    },

    /// Sample documents from a collection
    Sample {
        collection: String,

        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Suggest real ids for a reference field
    ResolveId {
        /// Field name, e.g. userId
        field: String,

        /// Collection whose documents hold the field
        #[arg(short, long)]
        source: Option<String>,

        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    // ─── Prediction ───────────────────────────────────────────────
    /// Predict a request payload from code and live data
    Predict {
        method: String,
        path: String,

        /// Prefer sampled values over model examples
        #[arg(long)]
        prefer_real: Option<bool>,

        /// Keep at most this many fields
        #[arg(long)]
        limit_fields: Option<usize>,

        /// Never include these fields
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Always include these fields
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Print the snapshot record instead of the full prediction
        #[arg(long)]
        snapshot: bool,
    },
}

/// Loaded config plus the resolved workspace root.
pub struct Workspace {
    pub config: RouteLensConfig,
    pub root: PathBuf,
}

impl Workspace {
    /// An explicit `--root` wins over the config file's location.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| cli.root.join(CONFIG_FILE_NAME));
        let mut config = RouteLensConfig::load(&config_path);
        config.apply_overrides(cli.mongodb_uri.clone(), cli.database.clone());
        config.validate().context("invalid configuration")?;

        let from_config = config.resolve_root(&config_path);
        let root = if cli.config.is_some() && cli.root != Path::new(DEFAULT_ROOT) {
            if from_config != cli.root {
                warn!(
                    root = %cli.root.display(),
                    config_root = %from_config.display(),
                    "--root differs from the config file's workspace root, using --root"
                );
            }
            cli.root.clone()
        } else {
            from_config
        };
        Ok(Self { config, root })
    }

    /// Connect to the configured store. Failure is logged, not fatal.
    pub async fn connect(&self) -> Arc<Connection> {
        let connection = Arc::new(Connection::new(self.config.database.clone()));
        if !connection.connect().await {
            warn!(uri = %self.config.database.uri, "data store unavailable, continuing without it");
        }
        connection
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let workspace = Workspace::load(&cli)?;

    match cli.command {
        Commands::Routes { file } => source::routes(&workspace, file.as_deref()),
        Commands::Context { method, path } => source::context(&workspace, &method, &path),
        Commands::Infer { method, path, all } => source::infer(&workspace, &method, &path, all),
        Commands::Collections => data::collections(&workspace).await,
        Commands::Schema {
            collection,
            sample_size,
        } => data::schema(&workspace, &collection, sample_size).await,
        Commands::Sample { collection, limit } => data::sample(&workspace, &collection, limit).await,
        Commands::ResolveId {
            field,
            source: source_collection,
            limit,
        } => data::resolve_id(&workspace, &field, source_collection.as_deref(), limit).await,
        Commands::Predict {
            method,
            path,
            prefer_real,
            limit_fields,
            exclude,
            include,
            snapshot,
        } => {
            let mut options = crate::hybrid::HybridOptions::from(&workspace.config.prediction);
            if prefer_real.is_some() {
                options.prefer_real_data = prefer_real;
            }
            if limit_fields.is_some() {
                options.limit_fields = limit_fields;
            }
            options.exclude_fields.extend(exclude);
            options.include_fields.extend(include);
            source::predict(&workspace, &method, &path, &options, snapshot).await
        }
    }
}
