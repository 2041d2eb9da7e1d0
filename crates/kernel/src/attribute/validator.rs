//! Validators built from rule definitions.

use anyhow::{Result, bail};
use regex::Regex;
use serde::Deserialize;

use super::RuleDefinition;
use crate::condition::FilterValue;

/// Normalizes and checks values for one attribute operator.
pub trait AttributeValidator: Send + Sync {
    /// Coerce a raw value into the attribute's canonical form.
    fn normalize(&self, value: FilterValue) -> FilterValue;

    /// Fail if a (normalized) value is not acceptable.
    fn ensure_is_valid(&self, value: &FilterValue) -> Result<()>;
}

/// Produces validators from opaque rule definitions.
pub trait ValidatorFactory: Send + Sync {
    fn create_by_definition(&self, rule: &RuleDefinition) -> Result<Box<dyn AttributeValidator>>;
}

/// Scalar type a typed rule expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Uuid,
}

/// Rule shape understood by [`TypedValidatorFactory`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypedRule {
    #[serde(rename = "type")]
    value_type: ValueType,
    /// `true`: list required (scalars get wrapped), `false`: scalar only,
    /// absent: either.
    #[serde(default)]
    multiple: Option<bool>,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    pattern: Option<String>,
}

/// Factory for rules of the form
/// `{"type": "integer", "multiple": true, "max_length": 64, "pattern": "^[a-z]+$"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedValidatorFactory;

impl ValidatorFactory for TypedValidatorFactory {
    fn create_by_definition(&self, rule: &RuleDefinition) -> Result<Box<dyn AttributeValidator>> {
        let rule: TypedRule = serde_json::from_value(rule.clone())?;
        let pattern = match rule.pattern {
            Some(ref p) => Some(Regex::new(p)?),
            None => None,
        };
        Ok(Box::new(TypedValidator {
            value_type: rule.value_type,
            multiple: rule.multiple,
            nullable: rule.nullable,
            max_length: rule.max_length,
            pattern,
        }))
    }
}

/// Validator coercing values to one scalar type.
#[derive(Debug, Clone)]
pub struct TypedValidator {
    value_type: ValueType,
    multiple: Option<bool>,
    nullable: bool,
    max_length: Option<usize>,
    pattern: Option<Regex>,
}

impl TypedValidator {
    fn normalize_scalar(&self, value: FilterValue) -> FilterValue {
        let converted = match self.value_type {
            ValueType::String => value.as_string().map(FilterValue::String),
            ValueType::Integer => value.as_i64().map(FilterValue::Integer),
            ValueType::Number => value.as_f64().map(FilterValue::Float),
            ValueType::Boolean => value.as_bool().map(FilterValue::Boolean),
            ValueType::Uuid => value.as_uuid().map(FilterValue::Uuid),
        };
        // Leave unconvertible values alone so ensure_is_valid reports them.
        converted.unwrap_or(value)
    }

    fn check_scalar(&self, value: &FilterValue) -> Result<()> {
        let matches_type = match (self.value_type, value) {
            (_, FilterValue::Null) => {
                if self.nullable {
                    return Ok(());
                }
                bail!("null is not allowed");
            }
            (ValueType::String, FilterValue::String(_))
            | (ValueType::Integer, FilterValue::Integer(_))
            | (ValueType::Number, FilterValue::Float(_))
            | (ValueType::Boolean, FilterValue::Boolean(_))
            | (ValueType::Uuid, FilterValue::Uuid(_)) => true,
            _ => false,
        };
        if !matches_type {
            bail!("expected a value of type {:?}", self.value_type);
        }

        if let FilterValue::String(s) = value {
            if let Some(max) = self.max_length
                && s.chars().count() > max
            {
                bail!("longer than {max} characters");
            }
            if let Some(ref pattern) = self.pattern
                && !pattern.is_match(s)
            {
                bail!("does not match pattern {}", pattern.as_str());
            }
        }
        Ok(())
    }
}

impl AttributeValidator for TypedValidator {
    fn normalize(&self, value: FilterValue) -> FilterValue {
        match value {
            FilterValue::List(items) => FilterValue::List(
                items
                    .into_iter()
                    .map(|item| self.normalize_scalar(item))
                    .collect(),
            ),
            scalar if self.multiple == Some(true) => {
                FilterValue::List(vec![self.normalize_scalar(scalar)])
            }
            scalar => self.normalize_scalar(scalar),
        }
    }

    fn ensure_is_valid(&self, value: &FilterValue) -> Result<()> {
        match value {
            FilterValue::List(items) => {
                if self.multiple == Some(false) {
                    bail!("expected a single value, got a list");
                }
                if items.is_empty() {
                    bail!("list must not be empty");
                }
                items.iter().try_for_each(|item| match item {
                    FilterValue::List(_) => bail!("nested lists are not allowed"),
                    scalar => self.check_scalar(scalar),
                })
            }
            scalar => {
                if self.multiple == Some(true) {
                    bail!("expected a list of values");
                }
                self.check_scalar(scalar)
            }
        }
    }
}
