//! Condition pipeline types.
//!
//! Provides type definitions shared by the key parser and condition builder:
//! - Operator: comparison tokens inferred from filter-key suffixes
//! - FilterValue: raw and normalized filter values
//! - Condition: the fragment handed to the query builder

use std::fmt;

use sea_query::{Expr, ExprTrait, SimpleExpr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};

/// Comparison operator token.
///
/// Known tokens get their own variant; anything else is carried verbatim
/// in [`Operator::Other`] so attributes can declare their own operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    /// Exact match (`eq`).
    Eq,
    /// Not equal (`ne`).
    Ne,
    /// Pattern match (`like`).
    Like,
    /// Greater than (`gt`).
    Gt,
    /// Greater than or equal (`gte`).
    Gte,
    /// Less than (`lt`).
    Lt,
    /// Less than or equal (`lte`).
    Lte,
    /// Set membership (`in`).
    In,
    /// Attribute-specific operator token.
    Other(String),
}

impl Operator {
    /// Parse an operator token. Unknown tokens become [`Operator::Other`].
    pub fn parse(token: &str) -> Self {
        match token {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "like" => Operator::Like,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            other => Operator::Other(other.to_string()),
        }
    }

    /// The token as written in filter keys.
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Like => "like",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Other(token) => token,
        }
    }

    /// Symbol used in comparison fragments: `eq` → `=`, `ne` → `!=`,
    /// every other token unchanged.
    pub fn symbol(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            other => other.as_str(),
        }
    }
}

impl From<String> for Operator {
    fn from(token: String) -> Self {
        Operator::parse(&token)
    }
}

impl From<&str> for Operator {
    fn from(token: &str) -> Self {
        Operator::parse(token)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// String value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// UUID value.
    Uuid(Uuid),
    /// List of values (always rendered as set membership).
    List(Vec<FilterValue>),
    /// Explicit NULL.
    Null,
}

impl FilterValue {
    /// Convert to string representation.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FilterValue::String(s) => Some(s.clone()),
            FilterValue::Integer(i) => Some(i.to_string()),
            FilterValue::Float(f) => Some(f.to_string()),
            FilterValue::Boolean(b) => Some(b.to_string()),
            FilterValue::Uuid(u) => Some(u.to_string()),
            _ => None,
        }
    }

    /// Convert to integer if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FilterValue::Integer(i) => Some(*i),
            FilterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to float if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Float(f) => Some(*f),
            FilterValue::Integer(i) => Some(*i as f64),
            FilterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to boolean if possible (`1`/`0`, `true`/`false`, `yes`/`no`).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FilterValue::Boolean(b) => Some(*b),
            FilterValue::Integer(0) => Some(false),
            FilterValue::Integer(1) => Some(true),
            FilterValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert to UUID if possible.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FilterValue::Uuid(u) => Some(*u),
            FilterValue::String(s) => Uuid::parse_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Whether this is a list value.
    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::List(_))
    }

    /// Scalar value for SeaQuery. Lists have no scalar form.
    pub fn to_sea_value(&self) -> Option<sea_query::Value> {
        match self {
            FilterValue::String(s) => Some(s.clone().into()),
            FilterValue::Integer(i) => Some((*i).into()),
            FilterValue::Float(f) => Some((*f).into()),
            FilterValue::Boolean(b) => Some((*b).into()),
            FilterValue::Uuid(u) => Some((*u).into()),
            FilterValue::Null => Some(sea_query::Value::String(None)),
            FilterValue::List(_) => None,
        }
    }

    /// Scalar values for a membership test. A scalar becomes a one-element
    /// set; nested lists have no SQL form and are rejected.
    fn to_sea_values(&self) -> QueryResult<Vec<sea_query::Value>> {
        let items = match self {
            FilterValue::List(items) => items.as_slice(),
            scalar => std::slice::from_ref(scalar),
        };
        items
            .iter()
            .map(|item| {
                item.to_sea_value().ok_or_else(|| {
                    QueryError::InvalidParams(format!("nested list {item} in membership value {self}"))
                })
            })
            .collect()
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => write!(f, "'{s}'"),
            FilterValue::Integer(i) => write!(f, "{i}"),
            FilterValue::Float(x) => write!(f, "{x}"),
            FilterValue::Boolean(b) => write!(f, "{b}"),
            FilterValue::Uuid(u) => write!(f, "{u}"),
            FilterValue::Null => f.write_str("null"),
            FilterValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        FilterValue::Integer(i)
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        FilterValue::Float(f)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Boolean(b)
    }
}

impl From<Uuid> for FilterValue {
    fn from(u: Uuid) -> Self {
        FilterValue::Uuid(u)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Condition fragment produced for one filter key.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `expression IN (value...)`.
    Membership {
        expression: String,
        value: FilterValue,
    },
    /// `expression <symbol> value`.
    Comparison {
        symbol: String,
        expression: String,
        value: FilterValue,
    },
    /// Expression produced by a custom builder or field.
    Custom(SimpleExpr),
}

impl Condition {
    /// Membership fragment.
    pub fn membership(expression: impl Into<String>, value: FilterValue) -> Self {
        Condition::Membership {
            expression: expression.into(),
            value,
        }
    }

    /// Comparison fragment using the operator's symbol.
    pub fn comparison(operator: &Operator, expression: impl Into<String>, value: FilterValue) -> Self {
        Condition::Comparison {
            symbol: operator.symbol().to_string(),
            expression: expression.into(),
            value,
        }
    }

    /// Render the fragment as a SeaQuery expression.
    pub fn into_expr(self) -> QueryResult<SimpleExpr> {
        match self {
            Condition::Membership { expression, value } => {
                Ok(Expr::cust(expression).is_in(value.to_sea_values()?))
            }
            Condition::Comparison {
                symbol,
                expression,
                value,
            } => comparison_expr(&symbol, Expr::cust(expression), &value),
            Condition::Custom(expr) => Ok(expr),
        }
    }
}

fn comparison_expr(symbol: &str, column: SimpleExpr, value: &FilterValue) -> QueryResult<SimpleExpr> {
    if symbol == "in" {
        return Ok(column.is_in(value.to_sea_values()?));
    }
    if *value == FilterValue::Null {
        return match symbol {
            "=" => Ok(column.is_null()),
            "!=" => Ok(column.is_not_null()),
            _ => Err(QueryError::UnsupportedSymbol {
                symbol: symbol.to_string(),
            }),
        };
    }

    let scalar = value.to_sea_value().ok_or_else(|| QueryError::UnsupportedSymbol {
        symbol: symbol.to_string(),
    })?;

    let expr = match symbol {
        "=" => column.eq(scalar),
        "!=" => column.ne(scalar),
        "gt" => column.gt(scalar),
        "gte" => column.gte(scalar),
        "lt" => column.lt(scalar),
        "lte" => column.lte(scalar),
        "like" => {
            let pattern = value.as_string().unwrap_or_default();
            column.like(pattern)
        }
        other => {
            return Err(QueryError::UnsupportedSymbol {
                symbol: other.to_string(),
            });
        }
    };
    Ok(expr)
}
