//! Query schema files.
//!
//! A schema declares a query's field set and builder map. Schemas are read
//! from YAML (or JSON when the file extension is `.json`):
//!
//! ```yaml
//! base_table: item
//! builders:
//!   geo: geo_radius
//! fields:
//!   - name: id
//!     expression: item.id
//!     attribute: { kind: integer }
//!   - name: tags
//!     jsonb: { column: item.fields, path: tags }
//!     attribute:
//!       rules: { eq: { type: string }, contains: { type: string } }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::{AttributeField, Field, JsonbField, SqlField};
use crate::attribute::{
    Attribute, AttributeDefinition, AttributeKind, OperatorRules, ValidatorFactory,
};
use crate::condition::{BuilderFactory, FilterSet, Operator, QueryConditionBuilder};

/// Complete query schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySchema {
    /// Table used in generated SELECT statements.
    #[serde(default = "default_base_table")]
    pub base_table: String,

    /// Field kind → condition builder identifier.
    #[serde(default)]
    pub builders: HashMap<String, String>,

    /// Declared fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

fn default_base_table() -> String {
    "item".to_string()
}

impl Default for QuerySchema {
    fn default() -> Self {
        Self {
            base_table: default_base_table(),
            builders: HashMap::new(),
            fields: Vec::new(),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    /// SQL expression for SQL-backed fields.
    #[serde(default)]
    pub expression: Option<String>,

    /// JSONB location for JSONB-backed fields.
    #[serde(default)]
    pub jsonb: Option<JsonbSpec>,

    /// Kind override, routing the field to a registered builder.
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub attribute: Option<AttributeSpec>,

    /// Exclude from SELECT lists.
    #[serde(default)]
    pub hidden: bool,
}

/// JSONB column and path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonbSpec {
    pub column: String,
    pub path: String,
}

/// Attribute declaration: a stock kind, explicit rules, or both (explicit
/// rules override the kind's entries).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Attribute name; defaults to the field name.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: Option<AttributeKind>,

    #[serde(default)]
    pub rules: Option<OperatorRules>,

    /// Explicit supported-operator list; defaults to the rule keys.
    #[serde(default)]
    pub supported: Option<Vec<Operator>>,
}

impl AttributeSpec {
    fn build(
        &self,
        field_name: &str,
        factory: &Arc<dyn ValidatorFactory>,
    ) -> Result<AttributeDefinition> {
        let mut rules = self.kind.map(AttributeKind::rules).unwrap_or_default();
        if let Some(ref explicit) = self.rules {
            for op in explicit.operators() {
                if let Some(rule) = explicit.get(&op) {
                    rules = rules.with(op, rule.clone());
                }
            }
        }
        if rules.is_empty() {
            bail!("attribute for field '{field_name}' declares neither a kind nor rules");
        }

        let name = self.name.as_deref().unwrap_or(field_name);
        let mut attribute = AttributeDefinition::new(name, rules, Arc::clone(factory));
        if let Some(ref supported) = self.supported {
            attribute = attribute.with_supported_operators(supported.clone());
        }
        Ok(attribute)
    }
}

impl FieldDefinition {
    /// Build the field this definition describes.
    pub fn build(&self, factory: &Arc<dyn ValidatorFactory>) -> Result<Arc<dyn Field>> {
        let attribute: Option<Arc<dyn Attribute>> = match self.attribute {
            Some(ref spec) => Some(Arc::new(spec.build(&self.name, factory)?)),
            None => None,
        };

        let field: Arc<dyn Field> = match (&self.expression, &self.jsonb) {
            (Some(_), Some(_)) => {
                bail!("field '{}' declares both an expression and a jsonb location", self.name)
            }
            (None, None) => {
                bail!("field '{}' declares neither an expression nor a jsonb location", self.name)
            }
            (None, Some(jsonb)) => {
                if self.kind.is_some() {
                    bail!("field '{}': jsonb fields cannot override their kind", self.name);
                }
                let mut field = JsonbField::new(&self.name, &jsonb.column, &jsonb.path)
                    .with_context(|| format!("field '{}'", self.name))?;
                if let Some(attribute) = attribute {
                    field = field.with_attribute(attribute);
                }
                Arc::new(field)
            }
            (Some(expression), None) => match attribute {
                Some(attribute) => {
                    let mut field = AttributeField::new(&self.name, expression, attribute);
                    if let Some(ref kind) = self.kind {
                        field = field.with_kind(kind);
                    }
                    if self.hidden {
                        field = field.hidden();
                    }
                    Arc::new(field)
                }
                None => {
                    let mut field = SqlField::new(&self.name, expression);
                    if let Some(ref kind) = self.kind {
                        field = field.with_kind(kind);
                    }
                    if self.hidden {
                        field = field.hidden();
                    }
                    Arc::new(field)
                }
            },
        };
        Ok(field)
    }
}

impl QuerySchema {
    /// Load a schema file; `.json` files are read as JSON, everything else
    /// as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yml::from_str(raw).context("invalid YAML schema")
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid JSON schema")
    }

    /// Build the declared field set. Field names must be unique.
    pub fn build_fields(&self, factory: Arc<dyn ValidatorFactory>) -> Result<Vec<Arc<dyn Field>>> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for definition in &self.fields {
            if !seen.insert(definition.name.as_str()) {
                bail!("duplicate field name '{}'", definition.name);
            }
            fields.push(definition.build(&factory)?);
        }
        Ok(fields)
    }

    /// Build the field set and wire the schema's builder map to `builders`.
    ///
    /// Fails if the builder map names an identifier `builders` cannot
    /// resolve.
    pub fn filter_set(
        &self,
        validators: Arc<dyn ValidatorFactory>,
        builders: Arc<BuilderFactory>,
    ) -> Result<FilterSet> {
        let fields = self
            .build_fields(validators)
            .context("failed to build schema fields")?;
        let builder = QueryConditionBuilder::new(builders).with_builders(self.builders.clone());
        builder.ensure_builders_resolvable()?;
        Ok(FilterSet::new(fields, builder))
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::attribute::TypedValidatorFactory;

    const SCHEMA: &str = r#"
builders:
  geo: geo_radius
fields:
  - name: id
    expression: item.id
    attribute: { kind: integer }
  - name: owner
    expression: item.owner
    attribute:
      kind: text
      rules:
        like: { type: string, max_length: 8 }
  - name: created
    expression: item.created
    hidden: true
  - name: location
    expression: item.location
    kind: geo
  - name: tags
    jsonb: { column: item.fields, path: tags }
    attribute:
      rules: { eq: { type: string }, contains: { type: string } }
"#;

    fn factory() -> Arc<dyn ValidatorFactory> {
        Arc::new(TypedValidatorFactory)
    }

    #[test]
    fn yaml_schema_parses() {
        let schema = QuerySchema::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(schema.base_table, "item");
        assert_eq!(schema.builders.get("geo").map(String::as_str), Some("geo_radius"));
        assert_eq!(schema.fields.len(), 5);
    }

    #[test]
    fn fields_build_with_expected_kinds() {
        let schema = QuerySchema::from_yaml_str(SCHEMA).unwrap();
        let fields = schema.build_fields(factory()).unwrap();
        let kinds: Vec<&str> = fields.iter().map(|f| f.kind()).collect();
        assert_eq!(kinds, vec!["attribute", "attribute", "sql", "geo", "jsonb"]);
        assert!(!fields[2].is_selectable());
    }

    #[test]
    fn explicit_rules_override_kind_rules() {
        let schema = QuerySchema::from_yaml_str(SCHEMA).unwrap();
        let fields = schema.build_fields(factory()).unwrap();
        let owner = fields[1].attribute().unwrap();
        assert_eq!(
            owner.rule_for_operator(&Operator::Like).unwrap()["max_length"],
            serde_json::json!(8)
        );
        assert!(owner.rule_for_operator(&Operator::In).is_ok());
    }

    #[test]
    fn filter_set_requires_registered_builders() {
        use crate::condition::ConditionBuilder;
        use crate::container::ServiceMap;
        use crate::error::QueryError;

        let schema = QuerySchema::from_yaml_str(SCHEMA).unwrap();
        let err = schema
            .filter_set(factory(), Arc::new(ServiceMap::<dyn ConditionBuilder>::new()))
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<QueryError>(),
            Some(QueryError::UnknownBuilder { kind, identifier }) if kind == "geo" && identifier == "geo_radius"
        ));

        let plain = QuerySchema::from_yaml_str("fields: [ { name: id, expression: item.id } ]").unwrap();
        let set = plain
            .filter_set(factory(), Arc::new(ServiceMap::<dyn ConditionBuilder>::new()))
            .unwrap();
        assert_eq!(set.fields().len(), 1);
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let schema = QuerySchema::from_json_str(
            r#"{"fields": [
                {"name": "id", "expression": "item.id"},
                {"name": "id", "expression": "item.other_id"}
            ]}"#,
        )
        .unwrap();
        let err = schema.build_fields(factory()).err().unwrap();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn field_needs_exactly_one_source() {
        let neither = FieldDefinition {
            name: "x".to_string(),
            expression: None,
            jsonb: None,
            kind: None,
            attribute: None,
            hidden: false,
        };
        assert!(neither.build(&factory()).is_err());

        let both = FieldDefinition {
            expression: Some("item.x".to_string()),
            jsonb: Some(JsonbSpec {
                column: "item.fields".to_string(),
                path: "x".to_string(),
            }),
            ..neither
        };
        assert!(both.build(&factory()).is_err());
    }

    #[test]
    fn empty_attribute_is_rejected() {
        let schema = QuerySchema::from_json_str(
            r#"{"fields": [{"name": "id", "expression": "item.id", "attribute": {}}]}"#,
        )
        .unwrap();
        assert!(schema.build_fields(factory()).is_err());
    }
}
