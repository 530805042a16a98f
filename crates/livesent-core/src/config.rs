use crate::app_config::{AppConfig, Environment, InferenceBackend, StoreBackend};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        match raw.parse::<usize>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            }),
            Ok(n) => Ok(n),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let env = parse_environment(&or_default("LIVESENT_ENV", "development"))?;
    let bind_addr = parse_addr("LIVESENT_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("LIVESENT_LOG_LEVEL", "info");

    let inference_backend =
        parse_inference_backend(&or_default("LIVESENT_INFERENCE_BACKEND", "local"))?;
    let gemini_api_key = optional("GEMINI_API_KEY");
    if inference_backend == InferenceBackend::Cloud && gemini_api_key.is_none() {
        return Err(ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()));
    }
    let gemini_base_url = or_default(
        "LIVESENT_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let gemini_summary_model = or_default("LIVESENT_GEMINI_SUMMARY_MODEL", "gemini-2.0-flash");
    let gemini_embed_model = or_default("LIVESENT_GEMINI_EMBED_MODEL", "gemini-embedding-001");

    let summarizer_url = or_default("LIVESENT_SUMMARIZER_URL", "http://localhost:8081");
    let tei_embed_url = or_default("LIVESENT_TEI_EMBED_URL", "http://localhost:8080");
    let tei_classifier_url = or_default("LIVESENT_TEI_CLASSIFIER_URL", "http://localhost:8082");
    let embedding_dim = parse_positive("LIVESENT_EMBEDDING_DIM", "384")?;

    let store_backend = parse_store_backend(&or_default("LIVESENT_STORE", "qdrant"))?;
    let qdrant_url = or_default("LIVESENT_QDRANT_URL", "http://localhost:6333");
    let qdrant_collection = or_default("LIVESENT_QDRANT_COLLECTION", "news_events");

    let serper_api_key = optional("SERPER_API_KEY");
    let news_results = parse_positive("LIVESENT_NEWS_RESULTS", "5")?;

    let inference_timeout_secs = parse_u64("LIVESENT_INFERENCE_TIMEOUT_SECS", "30")?;
    let store_timeout_secs = parse_u64("LIVESENT_STORE_TIMEOUT_SECS", "10")?;
    let enrich_concurrency = parse_positive("LIVESENT_ENRICH_CONCURRENCY", "4")?;
    let similar_k = parse_positive("LIVESENT_SIMILAR_K", "5")?;
    let rate_limit_per_minute = parse_positive("LIVESENT_RATE_LIMIT_PER_MINUTE", "60")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        inference_backend,
        gemini_api_key,
        gemini_base_url,
        gemini_summary_model,
        gemini_embed_model,
        summarizer_url,
        tei_embed_url,
        tei_classifier_url,
        embedding_dim,
        store_backend,
        qdrant_url,
        qdrant_collection,
        serper_api_key,
        news_results,
        inference_timeout_secs,
        store_timeout_secs,
        enrich_concurrency,
        similar_k,
        rate_limit_per_minute,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LIVESENT_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

fn parse_inference_backend(s: &str) -> Result<InferenceBackend, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(InferenceBackend::Local),
        "cloud" => Ok(InferenceBackend::Cloud),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LIVESENT_INFERENCE_BACKEND".to_string(),
            reason: format!("expected local or cloud, got '{other}'"),
        }),
    }
}

fn parse_store_backend(s: &str) -> Result<StoreBackend, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "qdrant" => Ok(StoreBackend::Qdrant),
        "memory" => Ok(StoreBackend::Memory),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LIVESENT_STORE".to_string(),
            reason: format!("expected qdrant or memory, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
