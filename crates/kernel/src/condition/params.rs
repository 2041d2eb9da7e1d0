//! Query-string parameters.

use crate::error::{QueryError, QueryResult};

use super::FilterValue;

/// Parse a query string into filter parameters, in first-seen key order.
///
/// Keys and values are percent-decoded (`+` is a space). A key written as
/// `key[]`, or repeated, collects its values into a [`FilterValue::List`].
/// All other values stay strings; attribute validators normalize them.
pub fn parse_query_string(query: &str) -> QueryResult<Vec<(String, FilterValue)>> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params: Vec<(String, FilterValue)> = Vec::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(raw_key)?;
        let value = FilterValue::String(decode(raw_value)?);

        let as_list = key.ends_with("[]");
        let key = if as_list {
            key[..key.len() - 2].to_string()
        } else {
            key
        };
        if key.is_empty() {
            return Err(QueryError::InvalidParams(format!(
                "empty parameter name in '{pair}'"
            )));
        }

        match params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, FilterValue::List(items))) => items.push(value),
            Some((_, existing)) => {
                let first = std::mem::replace(existing, FilterValue::Null);
                *existing = FilterValue::List(vec![first, value]);
            }
            None if as_list => params.push((key, FilterValue::List(vec![value]))),
            None => params.push((key, value)),
        }
    }

    Ok(params)
}

fn decode(raw: &str) -> QueryResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| QueryError::InvalidParams(format!("'{raw}' is not valid UTF-8: {e}")))
}
