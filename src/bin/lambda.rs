//! AWS Lambda entry point for the screening backend
//!
//! Deploy with `cargo lambda build --release --features lambda`
//! behind an API Gateway REST proxy integration.

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use screening::{
    config::load_lambda_config,
    lambda::{ProxyRequest, handler},
    services::AppState,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Arc::new(load_lambda_config()?);
    info!(
        backend = ?config.storage.backend,
        bucket = %config.storage.bucket,
        "Screening Lambda starting..."
    );

    // Built once per cold start and shared by every invocation.
    let state = AppState::from_config(config).await?;

    lambda_runtime::run(service_fn(|event: LambdaEvent<ProxyRequest>| {
        let state = state.clone();
        async move { handler(&state, event).await }
    }))
    .await
}
