//! Class-dispatching hydrator.
//!
//! The registration list is fixed at construction. Service identifiers are
//! resolved through the container on first use and the resulting hydrator is
//! cached under the class name it was requested for, so repeated lookups
//! return the same instance.
//!
//! Each class name owns its own resolution slot. The map is only locked
//! long enough to fetch the slot, so a service constructor may resolve other
//! classes through the same registry.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use super::{ClassHierarchy, Entity, Hydrator, HydratorContainer, RowData, row_data};
use crate::container::ServiceMap;
use crate::error::{HydrationError, HydrationResult};

/// A registered hydrator: a ready instance, or a container identifier.
#[derive(Clone)]
pub enum HydratorEntry {
    Instance(Arc<dyn Hydrator>),
    Service(String),
}

/// Data accepted by [`ConfigurableHydrator::create`].
pub enum HydrationInput {
    /// An already-built entity; returned unchanged.
    Entity(Box<dyn Entity>),
    /// Raw data, coerced with [`row_data`].
    Raw(Value),
}

impl From<Box<dyn Entity>> for HydrationInput {
    fn from(entity: Box<dyn Entity>) -> Self {
        Self::Entity(entity)
    }
}

impl From<Value> for HydrationInput {
    fn from(raw: Value) -> Self {
        Self::Raw(raw)
    }
}

/// What [`ConfigurableHydrator::hydrate`] populates.
pub enum HydrationTarget {
    /// Populate this entity in place.
    Entity(Box<dyn Entity>),
    /// Create an empty instance of the class and populate it.
    Class(String),
}

impl From<Box<dyn Entity>> for HydrationTarget {
    fn from(entity: Box<dyn Entity>) -> Self {
        Self::Entity(entity)
    }
}

impl From<&str> for HydrationTarget {
    fn from(class: &str) -> Self {
        Self::Class(class.to_string())
    }
}

/// A node of a collection passed to [`ConfigurableHydrator::extract_all`].
pub enum Extractable<'a> {
    Entity(&'a dyn Entity),
    Collection(Vec<Extractable<'a>>),
}

impl<'a> From<&'a dyn Entity> for Extractable<'a> {
    fn from(entity: &'a dyn Entity) -> Self {
        Self::Entity(entity)
    }
}

/// Per-class resolution slot; `None` until the class is first resolved.
type Slot = Arc<Mutex<Option<Arc<dyn Hydrator>>>>;

/// Dispatches hydration to the hydrator registered for an entity's class.
pub struct ConfigurableHydrator {
    /// Class name → hydrator, in registration order.
    entries: Vec<(String, HydratorEntry)>,
    hierarchy: ClassHierarchy,
    container: Arc<HydratorContainer>,
    /// Requested class name → resolved hydrator.
    resolved: DashMap<String, Slot>,
}

impl Default for ConfigurableHydrator {
    fn default() -> Self {
        Self::new(Arc::new(ServiceMap::<dyn Hydrator>::new()))
    }
}

impl ConfigurableHydrator {
    /// Create an empty registry resolving service identifiers from `container`.
    pub fn new(container: Arc<HydratorContainer>) -> Self {
        Self {
            entries: Vec::new(),
            hierarchy: ClassHierarchy::new(),
            container,
            resolved: DashMap::new(),
        }
    }

    pub fn with_hierarchy(mut self, hierarchy: ClassHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Register a ready hydrator for `class`.
    pub fn with_hydrator(mut self, class: &str, hydrator: Arc<dyn Hydrator>) -> Self {
        self.entries
            .push((class.to_string(), HydratorEntry::Instance(hydrator)));
        self
    }

    /// Register a container identifier for `class`, resolved on first use.
    pub fn with_service(mut self, class: &str, identifier: &str) -> Self {
        self.entries.push((
            class.to_string(),
            HydratorEntry::Service(identifier.to_string()),
        ));
        self
    }

    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    /// The entry registered for `class`: an exact registration, or else the
    /// first registration, in order, that `class` is a subtype of.
    pub fn find_hydrator(&self, class: &str) -> Option<&HydratorEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == class)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(key, _)| self.hierarchy.is_subtype(class, key))
            })
            .map(|(_, entry)| entry)
    }

    /// Resolved hydrator for `class`. Resolution happens once per class name.
    ///
    /// A service constructor may resolve other classes, but resolving its own
    /// class from inside the constructor deadlocks.
    pub fn get_hydrator(&self, class: &str) -> HydrationResult<Arc<dyn Hydrator>> {
        let slot = match self.resolved.get(class) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(self.resolved.entry(class.to_string()).or_default().value()),
        };

        let mut cached = slot.lock();
        if let Some(ref hydrator) = *cached {
            return Ok(Arc::clone(hydrator));
        }

        let hydrator = match self.find_hydrator(class) {
            Some(HydratorEntry::Instance(hydrator)) => Arc::clone(hydrator),
            Some(HydratorEntry::Service(identifier)) => {
                debug!(class = %class, service = %identifier, "resolving hydrator service");
                self.container.get(identifier)?
            }
            None => {
                return Err(HydrationError::NotConfigured {
                    class: class.to_string(),
                });
            }
        };
        *cached = Some(Arc::clone(&hydrator));
        Ok(hydrator)
    }

    /// Build an entity of `class` from `data`. Entities pass through as-is.
    pub fn create(&self, data: impl Into<HydrationInput>, class: &str) -> HydrationResult<Box<dyn Entity>> {
        match data.into() {
            HydrationInput::Entity(entity) => Ok(entity),
            HydrationInput::Raw(raw) => self.hydrate(&row_data(raw), class),
        }
    }

    /// Populate an entity, or a fresh instance of a class, from `data`.
    pub fn hydrate(&self, data: &RowData, target: impl Into<HydrationTarget>) -> HydrationResult<Box<dyn Entity>> {
        match target.into() {
            HydrationTarget::Entity(mut entity) => {
                self.hydrate_into(data, entity.as_mut())?;
                Ok(entity)
            }
            HydrationTarget::Class(class) => {
                let hydrator = self.get_hydrator(&class)?;
                let mut entity = hydrator.create_empty(&class)?;
                hydrator.hydrate(data, entity.as_mut())?;
                Ok(entity)
            }
        }
    }

    /// Populate `entity` in place via its class's hydrator.
    pub fn hydrate_into(&self, data: &RowData, entity: &mut dyn Entity) -> HydrationResult<()> {
        let class = entity.class_name().to_string();
        self.get_hydrator(&class)?.hydrate(data, entity)
    }

    /// Flatten `entity` via its class's hydrator.
    pub fn extract(&self, entity: &dyn Entity) -> HydrationResult<RowData> {
        self.get_hydrator(entity.class_name())?.extract(entity)
    }

    /// Extract every entity of `collection`.
    ///
    /// Entities become rows. Nested collections are extracted recursively
    /// while `depth` allows, each level consuming one unit; a nested
    /// collection past that depth fails with
    /// [`DepthExceeded`](HydrationError::DepthExceeded).
    pub fn extract_all(&self, collection: &[Extractable<'_>], depth: usize) -> HydrationResult<Vec<Value>> {
        collection
            .iter()
            .map(|item| match item {
                Extractable::Entity(entity) => self.extract(*entity).map(Value::Object),
                Extractable::Collection(items) => {
                    let Some(remaining) = depth.checked_sub(1) else {
                        return Err(HydrationError::DepthExceeded);
                    };
                    self.extract_all(items, remaining).map(Value::Array)
                }
            })
            .collect()
    }
}
