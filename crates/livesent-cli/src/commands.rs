//! Command handlers that need the configured pipeline.

use livesent_core::{load_app_config, LocationQuery};
use livesent_pipeline::{build_query_service, shared_classifier, store_from_config};

/// Run a full location query and print the response as pretty JSON.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, startup fails, or the
/// query itself fails.
pub(crate) async fn run_query(query: LocationQuery) -> anyhow::Result<()> {
    let config = load_app_config()?;
    let service = build_query_service(&config).await?;

    let response = service.run(&query).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Ensure the configured store has its collection and indexes.
///
/// # Errors
///
/// Returns an error if the store is unreachable or has an incompatible
/// vector dimension.
pub(crate) async fn run_setup() -> anyhow::Result<()> {
    let config = load_app_config()?;
    let store = store_from_config(&config)?;
    store.ensure_schema().await?;
    tracing::info!(
        store = %config.store_backend,
        collection = %config.qdrant_collection,
        dimension = config.embedding_dim,
        "store schema ready"
    );
    println!(
        "{} store ready (collection '{}', dimension {})",
        config.store_backend, config.qdrant_collection, config.embedding_dim
    );
    Ok(())
}

/// # Errors
///
/// Returns an error if the classifier cannot be reached or rejects the text.
pub(crate) async fn run_classify(text: &str) -> anyhow::Result<()> {
    let config = load_app_config()?;
    let classifier = shared_classifier(&config).await?;
    let score = classifier.classify(text).await?;
    println!("{}", serde_json::to_string_pretty(&score)?);
    Ok(())
}
