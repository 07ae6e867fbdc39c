//! Data store commands: collections, schema, sample, resolve-id.

use anyhow::Result;

use super::{print_json, Workspace};
use crate::data::{DataSampler, ObjectIdResolver, SchemaViewer};

async fn sampler(workspace: &Workspace) -> DataSampler {
    DataSampler::new(workspace.connect().await)
}

pub async fn collections(workspace: &Workspace) -> Result<()> {
    let sampler = sampler(workspace).await;
    let info = sampler.get_collections_info().await;
    sampler.connection().disconnect();
    print_json(&info)
}

pub async fn schema(workspace: &Workspace, collection: &str, sample_size: usize) -> Result<()> {
    let sampler = sampler(workspace).await;
    let fields = SchemaViewer::new(sampler.clone())
        .get_detailed_schema(collection, sample_size)
        .await;
    sampler.connection().disconnect();
    print_json(&fields)
}

pub async fn sample(workspace: &Workspace, collection: &str, limit: usize) -> Result<()> {
    let sampler = sampler(workspace).await;
    let docs = sampler.get_sample_documents(collection, limit).await;
    sampler.connection().disconnect();
    print_json(&docs)
}

pub async fn resolve_id(
    workspace: &Workspace,
    field: &str,
    source: Option<&str>,
    limit: usize,
) -> Result<()> {
    let sampler = sampler(workspace).await;
    let resolution = ObjectIdResolver::new(sampler.clone())
        .resolve_object_id_field(field, source, limit)
        .await;
    sampler.connection().disconnect();
    print_json(&resolution)
}
