//! Declared query fields.
//!
//! A field is a named slot in a query's filter/result surface. What a field
//! can do is expressed through capability accessors on [`Field`]:
//! - `sql_expression`: the field is SQL-backed
//! - `attribute`: the field carries validation/operator metadata
//! - `condition_field`: the field assembles its own conditions

mod schema;

use std::sync::Arc;

use anyhow::{Result, bail};
use sea_query::Expr;

use crate::attribute::Attribute;
use crate::condition::{Condition, FilterValue, Operator};
use crate::error::QueryResult;

pub use schema::{AttributeSpec, FieldDefinition, JsonbSpec, QuerySchema};

/// A named, typed slot in a query's field set.
pub trait Field: Send + Sync {
    /// Unique name within the query's field set.
    fn name(&self) -> &str;

    /// Concrete kind, used for builder-map dispatch.
    fn kind(&self) -> &str;

    /// SQL expression, for SQL-backed fields.
    fn sql_expression(&self) -> Option<&str> {
        None
    }

    /// Bound attribute, for attribute-backed fields.
    fn attribute(&self) -> Option<&dyn Attribute> {
        None
    }

    /// Custom condition assembly, for fields that build their own conditions.
    fn condition_field(&self) -> Option<&dyn ConditionField> {
        None
    }

    /// Whether the field may appear in a SELECT list.
    fn is_selectable(&self) -> bool {
        self.sql_expression().is_some()
    }
}

/// Fields that assemble their own condition fragments.
pub trait ConditionField: Send + Sync {
    fn build_condition(
        &self,
        operator: &Operator,
        attribute_name: &str,
        value: FilterValue,
    ) -> QueryResult<Condition>;
}

/// Validate a SQL identifier name (table/column names).
/// Allows only `[a-zA-Z_][a-zA-Z0-9_]*` with max 63 chars (PostgreSQL limit).
pub(crate) fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

/// Validate a dotted path (e.g. `item.owner` or `meta.source`).
pub(crate) fn is_safe_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(is_safe_identifier)
}

// ---------------------------------------------------------------------------
// SqlField
// ---------------------------------------------------------------------------

/// Plain SQL-backed field.
#[derive(Debug, Clone)]
pub struct SqlField {
    name: String,
    kind: String,
    expression: String,
    selectable: bool,
}

impl SqlField {
    pub const KIND: &'static str = "sql";

    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Self::KIND.to_string(),
            expression: expression.into(),
            selectable: true,
        }
    }

    /// Exclude the field from SELECT lists.
    pub fn hidden(mut self) -> Self {
        self.selectable = false;
        self
    }

    /// Report a custom kind, routing the field to a registered builder.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

impl Field for SqlField {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn sql_expression(&self) -> Option<&str> {
        Some(&self.expression)
    }

    fn is_selectable(&self) -> bool {
        self.selectable
    }
}

// ---------------------------------------------------------------------------
// AttributeField
// ---------------------------------------------------------------------------

/// SQL-backed field bound to an attribute; accepts operator suffixes.
#[derive(Clone)]
pub struct AttributeField {
    name: String,
    kind: String,
    expression: String,
    attribute: Arc<dyn Attribute>,
    selectable: bool,
}

impl AttributeField {
    pub const KIND: &'static str = "attribute";

    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        attribute: Arc<dyn Attribute>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: Self::KIND.to_string(),
            expression: expression.into(),
            attribute,
            selectable: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.selectable = false;
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

impl Field for AttributeField {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn sql_expression(&self) -> Option<&str> {
        Some(&self.expression)
    }

    fn attribute(&self) -> Option<&dyn Attribute> {
        Some(self.attribute.as_ref())
    }

    fn is_selectable(&self) -> bool {
        self.selectable
    }
}

// ---------------------------------------------------------------------------
// JsonbField
// ---------------------------------------------------------------------------

/// Field stored under a path of a JSONB column.
///
/// Comparisons run against the text extraction (`col->>'path'`); the
/// `contains` operator generates a JSONB `@>` containment check instead.
#[derive(Clone)]
pub struct JsonbField {
    name: String,
    column: String,
    path: Vec<String>,
    text_expression: String,
    attribute: Option<Arc<dyn Attribute>>,
}

impl JsonbField {
    pub const KIND: &'static str = "jsonb";

    /// Operator token for containment checks.
    pub const CONTAINS: &'static str = "contains";

    /// Create a field for `column` (e.g. `item.fields`) at `path`
    /// (e.g. `meta.source`).
    pub fn new(name: impl Into<String>, column: &str, path: &str) -> Result<Self> {
        if !is_safe_path(column) {
            bail!("unsafe JSONB column: '{column}'");
        }
        if !is_safe_path(path) {
            bail!("unsafe JSONB field path: '{path}'");
        }
        let path: Vec<String> = path.split('.').map(str::to_string).collect();
        let text_expression = jsonb_extract(column, &path, true);
        Ok(Self {
            name: name.into(),
            column: column.to_string(),
            path,
            text_expression,
            attribute: None,
        })
    }

    /// Bind an attribute for suffix parsing and validation.
    pub fn with_attribute(mut self, attribute: Arc<dyn Attribute>) -> Self {
        self.attribute = Some(attribute);
        self
    }

    fn containment(&self, value: &FilterValue) -> QueryResult<Condition> {
        let items: Vec<serde_json::Value> = match value {
            FilterValue::List(items) => items.iter().map(to_json).collect(),
            scalar => vec![to_json(scalar)],
        };
        let json_array = serde_json::Value::Array(items).to_string();
        let expr = format!("{} @> $1::jsonb", jsonb_extract(&self.column, &self.path, false));
        Ok(Condition::Custom(Expr::cust_with_values(expr, [json_array])))
    }
}

impl Field for JsonbField {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        Self::KIND
    }

    fn sql_expression(&self) -> Option<&str> {
        Some(&self.text_expression)
    }

    fn attribute(&self) -> Option<&dyn Attribute> {
        self.attribute.as_deref()
    }

    fn condition_field(&self) -> Option<&dyn ConditionField> {
        Some(self)
    }
}

impl ConditionField for JsonbField {
    fn build_condition(
        &self,
        operator: &Operator,
        _attribute_name: &str,
        value: FilterValue,
    ) -> QueryResult<Condition> {
        if operator.as_str() == Self::CONTAINS {
            return self.containment(&value);
        }
        if value.is_list() {
            return Ok(Condition::membership(self.text_expression.clone(), value));
        }
        Ok(Condition::comparison(
            operator,
            self.text_expression.clone(),
            value,
        ))
    }
}

/// Build `col->'a'->>'b'` (text) or `col->'a'->'b'` (jsonb).
fn jsonb_extract(column: &str, path: &[String], as_text: bool) -> String {
    let mut expr = column.to_string();
    for (i, part) in path.iter().enumerate() {
        let arrow = if as_text && i == path.len() - 1 {
            "->>"
        } else {
            "->"
        };
        expr = format!("{expr}{arrow}'{part}'");
    }
    expr
}

fn to_json(value: &FilterValue) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
