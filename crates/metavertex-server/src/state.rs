// Shared state handed to every handler.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use metavertex_core::auth::TokenService;
use metavertex_core::config::Config;
use metavertex_core::db::Database;
use metavertex_core::events::EventBus;
use metavertex_core::market::UploadLimits;
use metavertex_core::Marketplace;
use tracing::info;

pub struct AppState {
    pub market: Marketplace,
    /// Request body limit for document uploads.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(market: Marketplace, max_upload_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            market,
            max_upload_bytes,
        })
    }

    /// Open the database, wire up the marketplace and seed the superadmin.
    pub fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        if let Some(parent) = Path::new(&config.db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let db = Database::open(&config.db_path)?;
        info!("database opened at {}", config.db_path);

        let market = Marketplace::new(
            Arc::new(db),
            TokenService::new(&config.credentials.jwt_secret, config.auth.token_ttl_hours),
            EventBus::default(),
            UploadLimits::from(&config.uploads),
        );
        if let Some(seed) = config.credentials.superadmin_seed() {
            market
                .bootstrap_superadmin(&seed)
                .context("failed to create the configured superadmin")?;
        }

        let max_upload_bytes = usize::try_from(config.uploads.max_file_size_bytes())
            .context("uploads.max_file_size_mb is too large for this platform")?;
        Ok(Self::new(market, max_upload_bytes))
    }
}
