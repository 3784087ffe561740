//! Startup wiring: config, store, profile and completion client assembled
//! into one chat session.

use std::sync::Arc;

use crate::assistant::ChatSession;
use crate::config::{AuraConfig, PROFILE_KEY};
use crate::error::Result;
use crate::llm::create_client;
use crate::profile::ProfileRepository;
use crate::store::{KeyValueStore, LibSqlStore};

/// Read configuration from the process environment.
pub fn load_config() -> Result<AuraConfig> {
    Ok(AuraConfig::from_env()?)
}

/// Open the configured store, load the profile and build the session.
pub async fn open_session(config: &AuraConfig) -> Result<Arc<ChatSession>> {
    let store: Arc<dyn KeyValueStore> = Arc::new(LibSqlStore::new_local(&config.db_path).await?);
    let profiles = Arc::new(ProfileRepository::open(store, PROFILE_KEY).await);
    let llm = create_client(config)?;

    Ok(Arc::new(
        ChatSession::new(profiles, llm).with_history_window(config.history_window),
    ))
}
