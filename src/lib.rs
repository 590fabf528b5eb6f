pub mod api;
pub mod config;
pub mod gcp;
pub mod identity;
pub mod models;
pub mod risk;
pub mod seed;
pub mod store;

use std::sync::Arc;

use anyhow::Result;
use config::{Backend, Config};
use gcp::{ServiceAccount, TokenProvider};
use identity::{FirebaseIdentity, IdentityService, MemoryIdentity};
use store::{DocumentStore, FirestoreStore, MemoryStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityService>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        Self {
            config,
            store,
            identity,
        }
    }
}

/// Construct the document-store and identity-service handles once, at boot.
/// Both are shared process-wide; the wire clients are thread-safe by
/// contract.
pub fn init_backends(
    config: &Config,
) -> Result<(Arc<dyn DocumentStore>, Arc<dyn IdentityService>)> {
    match config.store.backend {
        Backend::Memory => {
            tracing::warn!("Using in-memory backends; nothing will be persisted");
            Ok((
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryIdentity::new()),
            ))
        }
        Backend::Firestore => {
            let account = ServiceAccount::from_file(&config.gcp.credentials_file)?;
            let project_id = if config.gcp.project_id.is_empty() {
                account
                    .project_id
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("No project id in config or key file"))?
            } else {
                config.gcp.project_id.clone()
            };
            let tokens = Arc::new(TokenProvider::new(account));
            Ok((
                Arc::new(FirestoreStore::new(&project_id, tokens.clone())),
                Arc::new(FirebaseIdentity::new(tokens)),
            ))
        }
    }
}
