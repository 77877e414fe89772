//! Engine lifecycle.
//!
//! States: uninitialised -> adapter bound (after [`EngineManager::bootstrap`])
//! -> serving (after the first successful [`EngineManager::reload`]). A
//! serving manager never goes back; failed reloads leave the previous
//! snapshot in place.
//!
//! Readers take a cloned `Arc` of the current snapshot and release the lock
//! before doing any work, so a reload never waits on an in-flight query and
//! an in-flight query always finishes on the snapshot it started with.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use metricgate_core::engine::{AdapterFactory, EngineBuilder, ProfileLocation, SemanticEngine, WarehouseClient};
use metricgate_core::error::{AdapterError, BuildError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    AdapterReady,
    Serving,
}

type Slot = Option<Arc<dyn SemanticEngine>>;

pub struct EngineManager {
    builder: Arc<dyn EngineBuilder>,
    adapter: OnceLock<Arc<dyn WarehouseClient>>,
    active: Mutex<Slot>,
}

impl EngineManager {
    pub fn new(builder: Arc<dyn EngineBuilder>) -> Self {
        Self {
            builder,
            adapter: OnceLock::new(),
            active: Mutex::new(None),
        }
    }

    /// Bind the warehouse adapter described by the profile. Runs once at startup;
    /// every error here is fatal for the process.
    pub fn bootstrap(&self, factory: &dyn AdapterFactory, location: &ProfileLocation) -> Result<(), AdapterError> {
        if self.adapter.get().is_some() {
            return Err(AdapterError::AlreadyBound);
        }

        let binding = factory.connect(location)?;
        for warning in &binding.warnings {
            tracing::warn!(%warning, "profile check reported a non-critical issue, continuing");
        }

        let adapter_type = binding.client.adapter_type().to_string();
        self.adapter
            .set(binding.client)
            .map_err(|_| AdapterError::AlreadyBound)?;

        tracing::info!(
            adapter = %adapter_type,
            profile = %location.profile_name,
            profiles_dir = %location.profiles_dir.display(),
            "adapter initialised"
        );
        Ok(())
    }

    /// Compile `manifest_json` into a new engine and publish it.
    ///
    /// Construction happens outside the lock; only the final pointer swap is
    /// serialised. Concurrent reloads are last-writer-wins.
    pub fn reload(&self, manifest_json: &str) -> Result<(), BuildError> {
        let client = self
            .adapter
            .get()
            .cloned()
            .ok_or_else(|| BuildError::Internal("adapter not initialised, call bootstrap first".into()))?;

        let started = Instant::now();
        let engine = self.builder.build(manifest_json, client)?;
        let metrics = engine.list_metrics().len();

        let previous = self.slot().replace(engine);
        // dropped outside the lock; in-flight requests may still hold it
        drop(previous);

        tracing::info!(metrics, elapsed_ms = started.elapsed().as_millis() as u64, "engine reloaded");
        Ok(())
    }

    /// Snapshot of the active engine, or `None` before the first reload.
    pub fn current(&self) -> Option<Arc<dyn SemanticEngine>> {
        self.slot().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.slot().is_some()
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_ready() {
            LifecycleState::Serving
        } else if self.adapter.get().is_some() {
            LifecycleState::AdapterReady
        } else {
            LifecycleState::Uninitialized
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        // the guarded value is a plain pointer; a panicked holder cannot leave it torn
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
