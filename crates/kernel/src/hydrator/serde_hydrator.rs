//! Hydrator for serde-capable entities.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Entity, Hydrator, RowData};
use crate::error::{HydrationError, HydrationResult};

/// Hydrates `T` by overlaying row data onto its serialized form.
///
/// Keys missing from the row keep their current values; unknown keys are
/// handed to `T`'s `Deserialize` impl, which decides whether to ignore them.
pub struct SerdeHydrator<T> {
    class: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> SerdeHydrator<T>
where
    T: Entity + Serialize + DeserializeOwned + Default,
{
    pub fn new() -> Self {
        let class = T::default().class_name().to_string();
        Self {
            class,
            _entity: PhantomData,
        }
    }

    fn mismatch(&self, entity: &dyn Entity) -> HydrationError {
        HydrationError::EntityMismatch {
            expected: self.class.clone(),
            actual: entity.class_name().to_string(),
        }
    }
}

impl<T> Default for SerdeHydrator<T>
where
    T: Entity + Serialize + DeserializeOwned + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Hydrator for SerdeHydrator<T>
where
    T: Entity + Serialize + DeserializeOwned + Default,
{
    fn hydrate(&self, data: &RowData, entity: &mut dyn Entity) -> HydrationResult<()> {
        let Some(target) = entity.downcast_mut::<T>() else {
            return Err(self.mismatch(entity));
        };

        let mut merged = match serde_json::to_value(&*target)? {
            Value::Object(map) => map,
            _ => RowData::new(),
        };
        for (key, value) in data {
            merged.insert(key.clone(), value.clone());
        }
        *target = serde_json::from_value(Value::Object(merged))?;
        Ok(())
    }

    fn extract(&self, entity: &dyn Entity) -> HydrationResult<RowData> {
        let source = entity
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch(entity))?;
        match serde_json::to_value(source)? {
            Value::Object(map) => Ok(map),
            other => Ok(super::row_data(other)),
        }
    }

    /// Only `T`'s own class can be created; a subclass routed here through
    /// an ancestor registration is a mismatch.
    fn create_empty(&self, class: &str) -> HydrationResult<Box<dyn Entity>> {
        if class != self.class {
            return Err(HydrationError::EntityMismatch {
                expected: self.class.clone(),
                actual: class.to_string(),
            });
        }
        Ok(Box::new(T::default()))
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::hydrator::row_data;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Account {
        id: i64,
        email: String,
        #[serde(default)]
        active: bool,
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Other;

    crate::entity!(Account, "account");
    crate::entity!(Other, "other");

    fn row(value: Value) -> RowData {
        row_data(value)
    }

    #[test]
    fn hydrate_overlays_present_keys() {
        let hydrator = SerdeHydrator::<Account>::new();
        let mut account = Account {
            id: 7,
            email: "old@example.com".to_string(),
            active: true,
        };

        hydrator
            .hydrate(&row(json!({"email": "new@example.com"})), &mut account)
            .unwrap();

        assert_eq!(account.id, 7);
        assert_eq!(account.email, "new@example.com");
        assert!(account.active);
    }

    #[test]
    fn extract_serializes_fields() {
        let hydrator = SerdeHydrator::<Account>::new();
        let account = Account {
            id: 1,
            email: "a@example.com".to_string(),
            active: false,
        };
        let row = hydrator.extract(&account).unwrap();
        assert_eq!(
            Value::Object(row),
            json!({"id": 1, "email": "a@example.com", "active": false})
        );
    }

    #[test]
    fn wrong_entity_type_is_a_mismatch() {
        let hydrator = SerdeHydrator::<Account>::new();
        let err = hydrator.extract(&Other).unwrap_err();
        assert!(matches!(
            err,
            HydrationError::EntityMismatch { ref expected, ref actual }
                if expected == "account" && actual == "other"
        ));
    }

    #[test]
    fn type_errors_surface_as_serialization_errors() {
        let hydrator = SerdeHydrator::<Account>::new();
        let mut account = Account::default();
        let err = hydrator
            .hydrate(&row(json!({"id": "not a number"})), &mut account)
            .unwrap_err();
        assert!(matches!(err, HydrationError::Serialization(_)));
    }

    #[test]
    fn create_empty_is_default() {
        let hydrator = SerdeHydrator::<Account>::new();
        let entity = hydrator.create_empty("account").unwrap();
        assert_eq!(entity.downcast_ref::<Account>().unwrap().id, 0);
    }

    #[test]
    fn create_empty_rejects_other_classes() {
        let hydrator = SerdeHydrator::<Account>::new();
        let err = hydrator.create_empty("account.premium").err().unwrap();
        assert!(matches!(
            err,
            HydrationError::EntityMismatch { ref expected, ref actual }
                if expected == "account" && actual == "account.premium"
        ));
    }
}
