//! Filter-key parsing.
//!
//! Keys may carry one operator suffix: `owner_like` filters `owner` with
//! `like`. Only the segment after the last underscore is considered, and only
//! when the field's attribute declares it as a supported operator.

use super::Operator;
use crate::field::Field;

/// Operator and attribute name inferred from a filter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub operator: Operator,
    pub attribute_name: String,
}

impl ParsedKey {
    fn exact(key: &str) -> Self {
        Self {
            operator: Operator::Eq,
            attribute_name: key.to_string(),
        }
    }
}

/// Infer `(operator, attribute name)` for `key` against `field`.
///
/// - Fields without an attribute, and keys equal to the field name, are
///   exact-match filters on the literal key.
/// - Otherwise a trailing `_<suffix>` is stripped when `<suffix>` is one of
///   the attribute's supported operators.
/// - Anything else is an exact-match filter on the literal key.
pub fn parse_field_filter_key(field: &dyn Field, key: &str) -> ParsedKey {
    let Some(attribute) = field.attribute() else {
        return ParsedKey::exact(key);
    };
    if key == field.name() {
        return ParsedKey::exact(key);
    }

    let Some((prefix, suffix)) = split_suffix(key) else {
        return ParsedKey::exact(key);
    };
    let candidate = Operator::parse(suffix);
    if attribute.supported_operators().contains(&candidate) {
        ParsedKey {
            operator: candidate,
            attribute_name: prefix.to_string(),
        }
    } else {
        ParsedKey::exact(key)
    }
}

/// Split `key` at its last underscore. Both sides must be non-empty.
fn split_suffix(key: &str) -> Option<(&str, &str)> {
    let idx = key.rfind('_')?;
    let (prefix, suffix) = (&key[..idx], &key[idx + 1..]);
    if prefix.is_empty() || suffix.is_empty() {
        return None;
    }
    Some((prefix, suffix))
}
