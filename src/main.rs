//! Pipeline worker binary.
//!
//! Wires the configured providers to the three stage consumers and runs a
//! worker pool per stage until SIGINT.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use newsportal_pipeline::adapters::ai::{
    AnthropicRewriter, AnthropicRewriterConfig, OpenAiIllustrator, OpenAiIllustratorConfig,
    OpenAiRewriter, OpenAiRewriterConfig, StabilityIllustrator, StabilityIllustratorConfig,
};
use newsportal_pipeline::adapters::audit::InMemoryAuditLog;
use newsportal_pipeline::adapters::blob::HttpBlobStore;
use newsportal_pipeline::adapters::broker::{InMemoryBroker, StageJobPublisher};
use newsportal_pipeline::adapters::content_store::InMemoryContentStore;
use newsportal_pipeline::application::{
    spawn_workers, CardHandler, IllustrateHandler, RewriteHandler, StageConsumer, StageHandler,
};
use newsportal_pipeline::config::{
    AppConfig, ConfigError, IllustratorProvider, RewriterProvider,
};
use newsportal_pipeline::domain::job::Stage;
use newsportal_pipeline::ports::{Illustrator, Rewriter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load()?;
    config.validate().map_err(ConfigError::ValidationFailed)?;

    let rewriter = build_rewriter(&config)?;
    let illustrator = build_illustrator(&config)?;
    info!(
        rewriter = %rewriter.info().model,
        illustrator = %illustrator.info().model,
        "providers selected"
    );

    let broker = Arc::new(InMemoryBroker::new());
    let publisher = Arc::new(StageJobPublisher::new(broker.clone()));
    let content_store = Arc::new(InMemoryContentStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let blob_store = Arc::new(HttpBlobStore::new(config.storage.blob_store_config()));

    let retry = config.pipeline.retry_policy();
    let worker_config = config.pipeline.worker_config();

    let handlers: Vec<Arc<dyn StageHandler>> = vec![
        Arc::new(RewriteHandler::new(rewriter.clone())),
        Arc::new(IllustrateHandler::new(
            rewriter,
            illustrator.clone(),
            blob_store.clone(),
            audit.clone(),
        )),
        Arc::new(CardHandler::new(illustrator, blob_store)),
    ];

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();
    for handler in handlers {
        let consumer = Arc::new(StageConsumer::new(
            handler,
            content_store.clone(),
            audit.clone(),
            broker.clone(),
            publisher.clone(),
            retry,
        ));
        handles.extend(spawn_workers(
            consumer,
            worker_config.clone(),
            shutdown_rx.clone(),
        ));
    }
    info!(
        stages = Stage::ALL.len(),
        workers_per_stage = worker_config.concurrency,
        "pipeline workers running"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining workers");
    shutdown_tx.send(true)?;
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            error!(error = %e, "worker task panicked");
        }
    }
    info!("pipeline stopped");

    Ok(())
}

fn build_rewriter(config: &AppConfig) -> Result<Arc<dyn Rewriter>, ConfigError> {
    use newsportal_pipeline::config::ValidationError;

    match config.ai.rewriter {
        RewriterProvider::OpenAI => {
            let key = config
                .ai
                .openai_api_key
                .clone()
                .ok_or(ValidationError::MissingRequired("OPENAI_API_KEY"))?;
            let mut provider_config =
                OpenAiRewriterConfig::new(key).with_timeout(config.ai.chat_timeout());
            if let Some(model) = &config.ai.rewrite_model {
                provider_config = provider_config.with_model(model.clone());
            }
            Ok(Arc::new(OpenAiRewriter::new(provider_config)))
        }
        RewriterProvider::Anthropic => {
            let key = config
                .ai
                .anthropic_api_key
                .clone()
                .ok_or(ValidationError::MissingRequired("ANTHROPIC_API_KEY"))?;
            let mut provider_config =
                AnthropicRewriterConfig::new(key).with_timeout(config.ai.chat_timeout());
            if let Some(model) = &config.ai.rewrite_model {
                provider_config = provider_config.with_model(model.clone());
            }
            Ok(Arc::new(AnthropicRewriter::new(provider_config)))
        }
    }
}

fn build_illustrator(config: &AppConfig) -> Result<Arc<dyn Illustrator>, ConfigError> {
    use newsportal_pipeline::config::ValidationError;

    match config.ai.illustrator {
        IllustratorProvider::OpenAI => {
            let key = config
                .ai
                .openai_api_key
                .clone()
                .ok_or(ValidationError::MissingRequired("OPENAI_API_KEY"))?;
            let provider_config =
                OpenAiIllustratorConfig::new(key).with_timeout(config.ai.image_timeout());
            Ok(Arc::new(OpenAiIllustrator::new(provider_config)))
        }
        IllustratorProvider::Stability => {
            let key = config
                .ai
                .stability_api_key
                .clone()
                .ok_or(ValidationError::MissingRequired("STABILITY_API_KEY"))?;
            let provider_config =
                StabilityIllustratorConfig::new(key).with_timeout(config.ai.image_timeout());
            Ok(Arc::new(StabilityIllustrator::new(provider_config)))
        }
    }
}
