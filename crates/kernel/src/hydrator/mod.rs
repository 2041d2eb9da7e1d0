//! Entity hydration.
//!
//! A [`Hydrator`] moves data between raw rows and one family of entity
//! classes. [`ConfigurableHydrator`] dispatches to the hydrator registered
//! for an entity's class, or for its nearest declared ancestor.

mod configurable;
mod entity;
mod hierarchy;
mod serde_hydrator;

use serde_json::{Map, Value};

use crate::container::Container;
use crate::error::HydrationResult;

pub use configurable::{ConfigurableHydrator, Extractable, HydrationInput, HydrationTarget, HydratorEntry};
pub use entity::Entity;
pub use hierarchy::ClassHierarchy;
pub use serde_hydrator::SerdeHydrator;

/// One raw row: column or property name → value.
pub type RowData = Map<String, Value>;

/// Container resolving hydrators by service identifier.
pub type HydratorContainer = dyn Container<dyn Hydrator>;

/// Moves data between rows and entities of the classes it is registered for.
pub trait Hydrator: Send + Sync {
    /// Populate `entity` from `data`.
    fn hydrate(&self, data: &RowData, entity: &mut dyn Entity) -> HydrationResult<()>;

    /// Flatten `entity` into a row.
    fn extract(&self, entity: &dyn Entity) -> HydrationResult<RowData>;

    /// A fresh, unpopulated instance of `class`.
    fn create_empty(&self, class: &str) -> HydrationResult<Box<dyn Entity>>;
}

/// Coerce arbitrary raw data into a row.
///
/// Objects are used as-is, arrays are keyed by position, `null` is an empty
/// row, and any other scalar becomes a single-element row.
pub fn row_data(raw: Value) -> RowData {
    match raw {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Value::Null => Map::new(),
        scalar => {
            let mut row = Map::new();
            row.insert("0".to_string(), scalar);
            row
        }
    }
}
