use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;

use crate::auth::{CredentialCache, CredentialStore};
use crate::config::Config;
use crate::http::mapped::MapGauge;
use crate::http::resolver::Resolver;

/// State shared by every connection of one running server.
///
/// Built once at startup and handed to each connection through an `Arc`.
pub struct ServerContext {
    config: Config,
    resolver: Resolver,
    credentials: Arc<CredentialCache>,
    mappings: MapGauge,
    active: AtomicUsize,
}

impl ServerContext {
    /// Builds the context and loads the credential cache from `store`.
    pub fn new(config: Config, store: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        let credentials = Arc::new(CredentialCache::new(store));
        credentials
            .warm()
            .context("Failed to load credentials from the store")?;

        let mappings = MapGauge::default();
        let resolver = Resolver::new(
            config.server.doc_root.clone(),
            config.routes.clone(),
            credentials.clone(),
            mappings.clone(),
        );

        Ok(Self {
            config,
            resolver,
            credentials,
            mappings,
            active: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Number of file mappings currently held by connections.
    pub fn live_mappings(&self) -> usize {
        self.mappings.live()
    }

    pub(crate) fn connection_opened(&self) -> usize {
        self.active.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn connection_closed(&self) -> usize {
        self.active.fetch_sub(1, Ordering::AcqRel) - 1
    }
}
