//! Stock attribute kinds with fixed operator tables.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AttributeDefinition, OperatorRules, ValidatorFactory};
use crate::condition::Operator;

/// Maximum length accepted for `like` patterns on text attributes.
const MAX_PATTERN_LENGTH: usize = 255;

/// Built-in attribute kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Free text: `eq`, `ne`, `like`, `in`.
    Text,
    /// Whole numbers: equality, ordering, `in`.
    Integer,
    /// Floating point numbers: equality, ordering, `in`.
    Number,
    /// Flags: `eq` only.
    Boolean,
    /// Identifiers: `eq`, `ne`, `in`.
    Uuid,
}

impl AttributeKind {
    /// The kind's operator → rule table.
    pub fn rules(self) -> OperatorRules {
        match self {
            AttributeKind::Text => OperatorRules::new()
                .with(Operator::Eq, json!({"type": "string"}))
                .with(Operator::Ne, json!({"type": "string"}))
                .with(
                    Operator::Like,
                    json!({"type": "string", "multiple": false, "max_length": MAX_PATTERN_LENGTH}),
                )
                .with(Operator::In, json!({"type": "string", "multiple": true})),
            AttributeKind::Integer => ordered_rules("integer"),
            AttributeKind::Number => ordered_rules("number"),
            AttributeKind::Boolean => {
                OperatorRules::new().with(Operator::Eq, json!({"type": "boolean", "multiple": false}))
            }
            AttributeKind::Uuid => OperatorRules::new()
                .with(Operator::Eq, json!({"type": "uuid"}))
                .with(Operator::Ne, json!({"type": "uuid"}))
                .with(Operator::In, json!({"type": "uuid", "multiple": true})),
        }
    }

    /// Build an attribute of this kind.
    pub fn attribute(
        self,
        name: impl Into<String>,
        factory: Arc<dyn ValidatorFactory>,
    ) -> AttributeDefinition {
        AttributeDefinition::new(name, self.rules(), factory)
    }
}

fn ordered_rules(value_type: &str) -> OperatorRules {
    let scalar = json!({"type": value_type, "multiple": false});
    OperatorRules::new()
        .with(Operator::Eq, json!({"type": value_type}))
        .with(Operator::Ne, json!({"type": value_type}))
        .with(Operator::Gt, scalar.clone())
        .with(Operator::Gte, scalar.clone())
        .with(Operator::Lt, scalar.clone())
        .with(Operator::Lte, scalar)
        .with(Operator::In, json!({"type": value_type, "multiple": true}))
}
