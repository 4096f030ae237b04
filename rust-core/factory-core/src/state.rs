//! # Application State
//!
//! Shared, explicitly owned resources of the running service: the registry,
//! the metadata store, the live catalog and the dispatcher.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only handles state storage and catalog swapping
//! - **D**: Handlers depend on this struct, never on globals

use crate::catalog::{self, Catalog};
use crate::database::DatabasePool;
use crate::error::Result;
use crate::handler::Handler;
use crate::registry::Registry;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

/// Thread-safe application state
pub struct AppState {
    registry: Arc<Registry>,
    store: DatabasePool,
    catalog: RwLock<Arc<Catalog>>,
    rebuild_lock: Mutex<()>,
    handler: Handler,
}

impl AppState {
    /// Build the initial catalog and wrap everything up
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the stored endpoints cannot be routed.
    pub fn new(registry: Arc<Registry>, store: DatabasePool, handler: Handler) -> Result<Self> {
        let initial = catalog::build(&registry.read())?;
        info!(routes = initial.len(), "Catalog ready");

        Ok(Self {
            registry,
            store,
            catalog: RwLock::new(Arc::new(initial)),
            rebuild_lock: Mutex::new(()),
            handler,
        })
    }

    /// The metadata registry
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The metadata store
    #[must_use]
    pub const fn store(&self) -> &DatabasePool {
        &self.store
    }

    /// Dispatcher for guarded requests
    #[must_use]
    pub fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }

    /// Snapshot of the live catalog
    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        let current = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }

    /// Rebuild the catalog from the registry and swap it in
    ///
    /// Rebuilds are serialized so an older snapshot never replaces a newer one.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the registry no longer routes; the
    /// previous catalog stays live in that case.
    pub fn rebuild_catalog(&self) -> Result<()> {
        let _rebuild = self.rebuild_lock.lock().unwrap_or_else(|e| e.into_inner());
        let rebuilt = catalog::build(&self.registry.read())?;
        let routes = rebuilt.len();

        *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(rebuilt);
        info!(routes, "Catalog rebuilt");
        Ok(())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("store", &self.store)
            .field("routes", &self.catalog().len())
            .finish_non_exhaustive()
    }
}
