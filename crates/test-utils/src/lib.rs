//! Sift test utilities.
//!
//! Helpers for integration testing: sample entities and hydrators, a
//! recording validator factory, a fixture field set, and assertion helpers
//! for rendered SQL.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use sift_kernel::attribute::{
    AttributeKind, AttributeValidator, RuleDefinition, TypedValidatorFactory, ValidatorFactory,
};
use sift_kernel::condition::FilterValue;
use sift_kernel::field::{AttributeField, Field, JsonbField, SqlField};
use sift_kernel::hydrator::{ClassHierarchy, Entity, SerdeHydrator};

pub const USER_CLASS: &str = "app.user";
pub const ADMIN_CLASS: &str = "app.admin";
pub const IDENTITY_INTERFACE: &str = "app.identity";
pub const AUDITABLE_INTERFACE: &str = "app.auditable";

/// Create a test user with default values.
pub fn test_user(name: &str) -> TestUser {
    TestUser {
        id: Uuid::now_v7(),
        name: name.to_string(),
        email: format!("{name}@example.com"),
        roles: Vec::new(),
    }
}

/// A sample entity for hydration tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

sift_kernel::entity!(TestUser, USER_CLASS);

impl TestUser {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Add a role.
    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }
}

/// Create a test admin.
pub fn test_admin(name: &str, level: u8) -> TestAdmin {
    TestAdmin {
        id: Uuid::now_v7(),
        name: name.to_string(),
        level,
    }
}

/// A subclass-like entity: declared as a subtype of [`TestUser`]'s class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestAdmin {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub level: u8,
}

sift_kernel::entity!(TestAdmin, ADMIN_CLASS);

/// `admin` extends `user` and implements `auditable`; `user` implements
/// `identity`.
pub fn test_hierarchy() -> ClassHierarchy {
    ClassHierarchy::new()
        .with(ADMIN_CLASS, [USER_CLASS, AUDITABLE_INTERFACE])
        .with(USER_CLASS, [IDENTITY_INTERFACE])
}

pub fn user_hydrator() -> Arc<SerdeHydrator<TestUser>> {
    Arc::new(SerdeHydrator::new())
}

pub fn admin_hydrator() -> Arc<SerdeHydrator<TestAdmin>> {
    Arc::new(SerdeHydrator::new())
}

/// Validator factory that records every rule it is asked for and accepts any
/// value except the ones it was told to reject.
#[derive(Default)]
pub struct RecordingValidatorFactory {
    requested: Mutex<Vec<RuleDefinition>>,
    rejected: Arc<Vec<FilterValue>>,
}

impl RecordingValidatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `values` in every validator this factory creates.
    pub fn rejecting(values: Vec<FilterValue>) -> Self {
        Self {
            requested: Mutex::new(Vec::new()),
            rejected: Arc::new(values),
        }
    }

    /// Rule definitions requested so far, in order.
    pub fn requested(&self) -> Vec<RuleDefinition> {
        self.requested.lock().clone()
    }
}

impl ValidatorFactory for RecordingValidatorFactory {
    fn create_by_definition(
        &self,
        definition: &RuleDefinition,
    ) -> anyhow::Result<Box<dyn AttributeValidator>> {
        self.requested.lock().push(definition.clone());
        Ok(Box::new(RecordingValidator {
            rejected: Arc::clone(&self.rejected),
        }))
    }
}

struct RecordingValidator {
    rejected: Arc<Vec<FilterValue>>,
}

impl AttributeValidator for RecordingValidator {
    fn normalize(&self, value: FilterValue) -> FilterValue {
        value
    }

    fn ensure_is_valid(&self, value: &FilterValue) -> anyhow::Result<()> {
        if self.rejected.contains(value) {
            anyhow::bail!("{value} is rejected");
        }
        Ok(())
    }
}

/// Field set used across integration tests:
///
/// | name      | backing                 | attribute |
/// |-----------|-------------------------|-----------|
/// | `id`      | `item.id`               | integer   |
/// | `owner`   | `item.owner`            | text      |
/// | `created` | `item.created` (hidden) | none      |
/// | `tags`    | `item.fields->'tags'`   | text      |
pub fn fixture_fields(factory: Arc<dyn ValidatorFactory>) -> Vec<Arc<dyn Field>> {
    let mut fields: Vec<Arc<dyn Field>> = vec![
        Arc::new(AttributeField::new(
            "id",
            "item.id",
            Arc::new(AttributeKind::Integer.attribute("id", Arc::clone(&factory))),
        )),
        Arc::new(AttributeField::new(
            "owner",
            "item.owner",
            Arc::new(AttributeKind::Text.attribute("owner", Arc::clone(&factory))),
        )),
        Arc::new(SqlField::new("created", "item.created").hidden()),
    ];
    if let Ok(tags) = JsonbField::new("tags", "item.fields", "tags") {
        fields.push(Arc::new(tags.with_attribute(Arc::new(
            AttributeKind::Text.attribute("tags", factory),
        ))));
    }
    fields
}

/// [`fixture_fields`] with the stock typed validators.
pub fn typed_fixture_fields() -> Vec<Arc<dyn Field>> {
    fixture_fields(Arc::new(TypedValidatorFactory))
}

/// A schema file equivalent to [`fixture_fields`], plus a custom-kind field.
pub const TEST_SCHEMA: &str = r#"
base_table: item
builders:
  geo: geo_radius
fields:
  - name: id
    expression: item.id
    attribute: { kind: integer }
  - name: owner
    expression: item.owner
    attribute: { kind: text }
  - name: created
    expression: item.created
    hidden: true
  - name: tags
    jsonb: { column: item.fields, path: tags }
    attribute: { kind: text }
  - name: location
    expression: item.location
    kind: geo
"#;

/// Assertion helpers for rendered SQL and extracted rows.
pub mod assert {
    use serde_json::Value;

    /// Assert that rendered SQL contains a fragment.
    pub fn sql_contains(sql: &str, fragment: &str) {
        assert!(
            sql.contains(fragment),
            "Expected SQL to contain '{fragment}'\nActual: {sql}"
        );
    }

    /// Assert that rendered SQL does not contain a fragment.
    pub fn sql_not_contains(sql: &str, fragment: &str) {
        assert!(
            !sql.contains(fragment),
            "Expected SQL to NOT contain '{fragment}'\nActual: {sql}"
        );
    }

    /// Assert that an extracted row has `key` set to `expected`.
    pub fn row_has(row: &Value, key: &str, expected: &Value) {
        assert_eq!(
            row.get(key),
            Some(expected),
            "Expected row key '{key}' to be {expected}, got: {row}"
        );
    }
}

/// Raw row for a user, as a data source would return it.
pub fn user_row(name: &str) -> Value {
    serde_json::json!({
        "id": Uuid::nil(),
        "name": name,
        "email": format!("{name}@example.com"),
    })
}

/// Whether `entity` is a [`TestUser`] named `name`.
pub fn is_user_named(entity: &dyn Entity, name: &str) -> bool {
    entity
        .downcast_ref::<TestUser>()
        .is_some_and(|user| user.name == name)
}
