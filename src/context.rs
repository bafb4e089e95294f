// src/context.rs

//! Application context.
//!
//! Every handler receives an explicitly constructed [`AppContext`] bundling
//! the store, object store, model client, and limiter; there is no
//! process-wide state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::generate::ImageResolver;
use crate::limiter::RateLimiter;
use crate::model_client::{LanguageModel, OpenAiClient};
use crate::store::{DocumentStore, LocalObjects, LocalStore, ObjectStore};

/// Handle bundle passed into every handler invocation.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub model: Arc<dyn LanguageModel>,
    pub limiter: RateLimiter,
    pub http: reqwest::Client,
}

impl AppContext {
    /// Assemble a context from its collaborators.
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(&config.model.user_agent)
            .build()?;
        let limiter = RateLimiter::new(store.clone());

        Ok(Self {
            config,
            store,
            objects,
            model,
            limiter,
            http,
        })
    }

    /// Context over local filesystem backends and the live model client,
    /// for the CLI and local development.
    pub fn local(config: Config, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let store = Arc::new(LocalStore::new(root.join("documents")));
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjects::new(root.join("objects")));
        let model = Arc::new(OpenAiClient::from_config(&config.model, objects.clone())?);
        Self::new(config, store, objects, model)
    }

    /// Image resolver borrowing this context's client and model.
    pub fn image_resolver(&self) -> ImageResolver<'_> {
        ImageResolver::new(
            &self.http,
            self.model.as_ref(),
            &self.config.content,
            Duration::from_secs(self.config.model.lookup_timeout_secs),
        )
    }
}
