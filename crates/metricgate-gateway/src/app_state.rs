//! Shared application state.

use std::sync::Arc;

use crate::auth::Credentials;
use crate::config::Settings;
use crate::engine_manager::EngineManager;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    credentials: Credentials,
    engines: Arc<EngineManager>,
    max_manifest_bytes: usize,
}

impl AppState {
    pub fn new(settings: &Settings, engines: Arc<EngineManager>) -> Self {
        Self::with_credentials(
            Credentials::new(settings.api_key.clone(), settings.admin_key.clone()),
            engines,
            settings.max_manifest_bytes,
        )
    }

    pub fn with_credentials(credentials: Credentials, engines: Arc<EngineManager>, max_manifest_bytes: usize) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                credentials,
                engines,
                max_manifest_bytes,
            }),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    pub fn engines(&self) -> Arc<EngineManager> {
        Arc::clone(&self.inner.engines)
    }

    pub fn max_manifest_bytes(&self) -> usize {
        self.inner.max_manifest_bytes
    }
}
