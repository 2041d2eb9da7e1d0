//! Attributes: per-operator rule tables bound to fields.
//!
//! An attribute declares which operators a field accepts and, for each, an
//! opaque rule definition. Rules are only interpreted by a
//! [`ValidatorFactory`], which turns them into validators on demand.

mod kinds;
mod validator;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::condition::Operator;
use crate::error::{QueryError, QueryResult};

pub use kinds::AttributeKind;
pub use validator::{AttributeValidator, TypedValidator, TypedValidatorFactory, ValidatorFactory};

/// Opaque per-operator rule configuration.
pub type RuleDefinition = serde_json::Value;

/// Operator → rule mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorRules(BTreeMap<Operator, RuleDefinition>);

impl OperatorRules {
    /// Create an empty rule table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for an operator, replacing any previous one.
    pub fn with(mut self, operator: Operator, rule: RuleDefinition) -> Self {
        self.0.insert(operator, rule);
        self
    }

    /// Look up the rule for an operator.
    pub fn get(&self, operator: &Operator) -> Option<&RuleDefinition> {
        self.0.get(operator)
    }

    /// Operators that have a rule, in token order.
    pub fn operators(&self) -> Vec<Operator> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Operator, RuleDefinition)> for OperatorRules {
    fn from_iter<I: IntoIterator<Item = (Operator, RuleDefinition)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validation and operator metadata bound to a field.
pub trait Attribute: Send + Sync {
    /// Semantic attribute name.
    fn name(&self) -> &str;

    /// The fixed operator → rule table.
    fn rules(&self) -> &OperatorRules;

    /// Factory used to turn rules into validators.
    fn validator_factory(&self) -> &dyn ValidatorFactory;

    /// Operators recognised as filter-key suffixes.
    ///
    /// Must agree with [`rules`](Self::rules); a supported operator without a
    /// rule fails at lookup with [`QueryError::UnsupportedOperator`].
    fn supported_operators(&self) -> Vec<Operator> {
        self.rules().operators()
    }

    /// Resolve the rule for `operator`.
    fn rule_for_operator(&self, operator: &Operator) -> QueryResult<&RuleDefinition> {
        self.rules()
            .get(operator)
            .ok_or_else(|| QueryError::UnsupportedOperator {
                attribute: self.name().to_string(),
                operator: operator.to_string(),
            })
    }

    /// Build a validator for `operator` from its rule.
    fn validator_for(&self, operator: &Operator) -> QueryResult<Box<dyn AttributeValidator>> {
        let rule = self.rule_for_operator(operator)?;
        self.validator_factory()
            .create_by_definition(rule)
            .map_err(|e| QueryError::InvalidRule {
                attribute: self.name().to_string(),
                operator: operator.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Attribute assembled from configuration.
pub struct AttributeDefinition {
    name: String,
    rules: OperatorRules,
    supported: Option<Vec<Operator>>,
    factory: Arc<dyn ValidatorFactory>,
}

impl AttributeDefinition {
    /// Create an attribute whose supported operators are its rule keys.
    pub fn new(
        name: impl Into<String>,
        rules: OperatorRules,
        factory: Arc<dyn ValidatorFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            rules,
            supported: None,
            factory,
        }
    }

    /// Declare the supported operator list explicitly.
    pub fn with_supported_operators(mut self, operators: Vec<Operator>) -> Self {
        self.supported = Some(operators);
        self
    }
}

impl Attribute for AttributeDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn rules(&self) -> &OperatorRules {
        &self.rules
    }

    fn validator_factory(&self) -> &dyn ValidatorFactory {
        self.factory.as_ref()
    }

    fn supported_operators(&self) -> Vec<Operator> {
        match &self.supported {
            Some(operators) => operators.clone(),
            None => self.rules.operators(),
        }
    }
}
