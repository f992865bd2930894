//! Dependency wiring for the turn service.

use std::sync::Arc;

use aiga_agent::{AzureOpenAiClient, LlmClient, TurnConfig, TurnController, ValidationPolicy};
use aiga_storage::Storage;
use aiga_tools::{DirectoryStore, InMemoryDirectory, QueryRouter};
use anyhow::{Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::service::TurnService;

/// Composition root: configuration, stores and the completion clients.
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<Storage>,
    pub store: Arc<dyn DirectoryStore>,
    llm: Arc<dyn LlmClient>,
    summary_llm: Arc<dyn LlmClient>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl AppContext {
    /// Wire the application from config, building live Azure clients.
    pub fn new(config: AppConfig, db_path: &str, store: Arc<dyn DirectoryStore>) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        if !config.azure.is_configured() {
            return Err(anyhow::anyhow!(
                "Azure OpenAI endpoint, api_key and model must be configured"
            ));
        }

        let llm = azure_client(&config, config.azure.model.as_str());
        let summary_llm = azure_client(&config, config.azure.summary_deployment());
        Self::with_clients(config, db_path, store, llm, summary_llm)
    }

    /// Wire the application with caller-supplied completion clients.
    pub fn with_clients(
        config: AppConfig,
        db_path: &str,
        store: Arc<dyn DirectoryStore>,
        llm: Arc<dyn LlmClient>,
        summary_llm: Arc<dyn LlmClient>,
    ) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let storage = Arc::new(Storage::new(db_path).context("Failed to open storage")?);
        info!(db_path, "Initializing AIGA");

        Ok(Self {
            config,
            storage,
            store,
            llm,
            summary_llm,
        })
    }

    /// Build the turn service over this context.
    pub fn turn_service(&self) -> TurnService {
        let router = QueryRouter::with_default_catalog(self.store.clone(), self.storage.clone());

        let turn_config = TurnConfig::default()
            .with_service_name(self.config.service_name.clone())
            .with_default_locale(self.config.default_locale.clone())
            .with_validation(ValidationPolicy {
                enabled: self.config.validation_enable,
                retry_limit: self.config.validation_retry_limit,
            })
            .with_summary_char_threshold(self.config.char_threshold)
            .with_summary_keep_tail(self.config.messages_to_keep)
            .with_externalization(self.config.summary_externalize_enable)
            .with_restoration_limit(self.config.proactive_restoration_limit)
            .with_memo_ttl(self.config.memo_ttl_secs);

        let controller = TurnController::new(
            self.llm.clone(),
            self.summary_llm.clone(),
            Arc::new(router),
            self.storage.clone(),
            turn_config,
        );

        TurnService::new(controller)
    }
}

fn azure_client(config: &AppConfig, deployment: &str) -> Arc<dyn LlmClient> {
    let mut client = AzureOpenAiClient::new(
        config.azure.endpoint.clone(),
        deployment,
        config.azure.api_key.clone(),
    )
    .with_timeout_secs(config.azure.request_timeout_secs);
    if !config.azure.api_version.is_empty() {
        client = client.with_api_version(config.azure.api_version.clone());
    }
    Arc::new(client)
}

/// Load the directory dataset from a JSON export, honoring the configured
/// proximity radius.
pub fn directory_from_file(config: &AppConfig, path: &str) -> Result<Arc<dyn DirectoryStore>> {
    let directory =
        InMemoryDirectory::from_json_file(path)?.with_nearby_distance(config.nearby_distance_km);
    info!(path, doctors = directory.doctor_count(), "Directory loaded");
    Ok(Arc::new(directory))
}
