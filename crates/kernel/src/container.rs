//! Lazy service container.
//!
//! Condition builders and hydrators are configured by identifier and only
//! constructed when a lookup first needs them. Constructed services are shared:
//! every later `get` for the same identifier returns the same `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::ServiceError;

/// Resolves services of type `T` by identifier.
pub trait Container<T: ?Sized>: Send + Sync {
    /// Get the service registered under `identifier`, constructing it if needed.
    fn get(&self, identifier: &str) -> Result<Arc<T>, ServiceError>;

    /// Whether `identifier` is known to this container.
    fn has(&self, identifier: &str) -> bool;
}

type Constructor<T> = Box<dyn Fn() -> Arc<T> + Send + Sync>;

/// Identifier → constructor map with a shared-instance cache.
pub struct ServiceMap<T: ?Sized> {
    constructors: HashMap<String, Constructor<T>>,
    /// Uses `parking_lot::RwLock` so lookups of already-built services only
    /// take a read lock.
    instances: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: ?Sized> Default for ServiceMap<T> {
    fn default() -> Self {
        Self {
            constructors: HashMap::new(),
            instances: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: ?Sized> ServiceMap<T> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, invoked on first lookup.
    pub fn register<F>(&mut self, identifier: &str, constructor: F)
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.instances.get_mut().remove(identifier);
        self.constructors
            .insert(identifier.to_string(), Box::new(constructor));
    }

    /// Register an already-built instance.
    pub fn register_instance(&mut self, identifier: &str, instance: Arc<T>) {
        self.constructors.remove(identifier);
        self.instances
            .get_mut()
            .insert(identifier.to_string(), instance);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, identifier: &str, constructor: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.register(identifier, constructor);
        self
    }

    /// Number of services already constructed.
    pub fn constructed(&self) -> usize {
        self.instances.read().len()
    }
}

impl<T: ?Sized + Send + Sync> Container<T> for ServiceMap<T> {
    fn get(&self, identifier: &str) -> Result<Arc<T>, ServiceError> {
        if let Some(instance) = self.instances.read().get(identifier) {
            return Ok(Arc::clone(instance));
        }

        let constructor =
            self.constructors
                .get(identifier)
                .ok_or_else(|| ServiceError::NotFound {
                    identifier: identifier.to_string(),
                })?;

        // Construct outside the lock; a racing caller may build a duplicate,
        // but only the first insert is ever handed out.
        let built = constructor();
        debug!(service = %identifier, "constructed service");

        let mut instances = self.instances.write();
        let instance = instances
            .entry(identifier.to_string())
            .or_insert(built);
        Ok(Arc::clone(instance))
    }

    fn has(&self, identifier: &str) -> bool {
        self.constructors.contains_key(identifier) || self.instances.read().contains_key(identifier)
    }
}
