pub mod api; // HTTP surface
pub mod config;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServiceConfig};
use crate::pipeline::model::{AssertionModel, InferenceClient, ModelError};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model client error: {0}")]
    Model(#[from] ModelError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

pub fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let service_config = ServiceConfig::from_env()?;

    // The blocking HTTP client is built and warmed outside the async runtime
    let client = InferenceClient::new(
        &service_config.model_endpoint,
        &service_config.model_name,
        service_config.model_timeout_secs,
    )?;
    if let Err(e) = client.warm_up() {
        tracing::warn!(
            endpoint = %service_config.model_endpoint,
            error = %e,
            "Model warm-up failed, serving with readiness probes"
        );
    }
    let model: Arc<dyn AssertionModel> = Arc::new(client);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(api::serve(service_config, model.clone()));

    // Last reference to the blocking client must drop outside the runtime
    drop(runtime);
    drop(model);

    result.map_err(StartupError::Server)
}
