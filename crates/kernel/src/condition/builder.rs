//! Condition builder.
//!
//! Turns one `(field, key, value)` triple into a [`Condition`]:
//! 1. Fields whose kind is registered in the builder map are handed to that
//!    builder entirely.
//! 2. The key is parsed into an operator and attribute name.
//! 3. The value is normalized and validated against the field's attribute.
//! 4. The fragment is assembled by the field itself, or from its SQL
//!    expression.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::key::{ParsedKey, parse_field_filter_key};
use super::{Condition, FilterValue, Operator};
use crate::container::{Container, ServiceMap};
use crate::error::{QueryError, QueryResult};
use crate::field::Field;

/// Builder for field kinds that need custom condition assembly.
pub trait ConditionBuilder: Send + Sync {
    /// Build the condition for `key` = `value` on `field`.
    fn build(&self, field: &dyn Field, key: &str, value: FilterValue) -> QueryResult<Condition>;

    /// Whether this builder handles `key` for `field`.
    ///
    /// `None` defers to the default rule: the key, after suffix stripping,
    /// must name the field.
    fn can_apply(&self, field: &dyn Field, key: &str, value: &FilterValue) -> Option<bool> {
        let _ = (field, key, value);
        None
    }
}

/// Container resolving condition builders by identifier.
pub type BuilderFactory = dyn Container<dyn ConditionBuilder>;

/// Orchestrates key parsing, builder dispatch, and validation.
pub struct QueryConditionBuilder {
    /// Field kind → builder identifier.
    builders: HashMap<String, String>,
    factory: Arc<BuilderFactory>,
}

impl Default for QueryConditionBuilder {
    fn default() -> Self {
        Self::new(Arc::new(ServiceMap::<dyn ConditionBuilder>::new()))
    }
}

impl QueryConditionBuilder {
    /// Create a builder resolving custom builders from `factory`.
    pub fn new(factory: Arc<BuilderFactory>) -> Self {
        Self {
            builders: HashMap::new(),
            factory,
        }
    }

    /// Route fields of `kind` to the builder registered as `identifier`.
    pub fn with_builder(mut self, kind: &str, identifier: &str) -> Self {
        self.builders
            .insert(kind.to_string(), identifier.to_string());
        self
    }

    /// Route several field kinds at once.
    pub fn with_builders(mut self, builders: HashMap<String, String>) -> Self {
        self.builders.extend(builders);
        self
    }

    /// Check that every builder identifier in the kind map is known to the
    /// factory, so a misconfigured kind fails here rather than on the first
    /// key that reaches one of its fields.
    pub fn ensure_builders_resolvable(&self) -> QueryResult<()> {
        let mut routes: Vec<(&String, &String)> = self.builders.iter().collect();
        routes.sort();
        for (kind, identifier) in routes {
            if !self.factory.has(identifier) {
                return Err(QueryError::UnknownBuilder {
                    kind: kind.clone(),
                    identifier: identifier.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build the condition for one filter key.
    pub fn build(&self, field: &dyn Field, key: &str, value: FilterValue) -> QueryResult<Condition> {
        if let Some(builder) = self.custom_builder(field)? {
            debug!(field = %field.name(), kind = %field.kind(), "delegating to custom builder");
            return builder.build(field, key, value);
        }

        let ParsedKey {
            operator,
            attribute_name,
        } = self.parse_field_filter_key(field, key);
        debug!(field = %field.name(), key = %key, operator = %operator, "parsed filter key");

        let value = self.ensure_condition_value_is_valid(field, &operator, value)?;

        if let Some(custom) = field.condition_field() {
            return custom.build_condition(&operator, &attribute_name, value);
        }

        match field.sql_expression() {
            Some(expression) if value.is_list() => Ok(Condition::membership(expression, value)),
            Some(expression) => Ok(Condition::comparison(&operator, expression, value)),
            None => Err(QueryError::UnbuildableField {
                field: field.name().to_string(),
            }),
        }
    }

    /// Whether `key` targets `field`.
    pub fn can_apply(&self, field: &dyn Field, key: &str, value: &FilterValue) -> QueryResult<bool> {
        if let Some(builder) = self.custom_builder(field)?
            && let Some(answer) = builder.can_apply(field, key, value)
        {
            return Ok(answer);
        }
        Ok(self.parse_field_filter_key(field, key).attribute_name == field.name())
    }

    /// Infer the operator and attribute name for `key`.
    pub fn parse_field_filter_key(&self, field: &dyn Field, key: &str) -> ParsedKey {
        parse_field_filter_key(field, key)
    }

    /// Normalize `value` and check it against the field attribute's rule for
    /// `operator`. Fields without an attribute pass the value through as is.
    pub fn ensure_condition_value_is_valid(
        &self,
        field: &dyn Field,
        operator: &Operator,
        value: FilterValue,
    ) -> QueryResult<FilterValue> {
        let Some(attribute) = field.attribute() else {
            return Ok(value);
        };

        let validator = attribute.validator_for(operator)?;
        let value = validator.normalize(value);
        validator
            .ensure_is_valid(&value)
            .map_err(|e| QueryError::ValidationFailed {
                field: field.name().to_string(),
                operator: operator.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            })?;
        Ok(value)
    }

    fn custom_builder(&self, field: &dyn Field) -> QueryResult<Option<Arc<dyn ConditionBuilder>>> {
        match self.builders.get(field.kind()) {
            Some(identifier) => Ok(Some(self.factory.get(identifier)?)),
            None => Ok(None),
        }
    }
}
