//! Filter sets: a declared field list plus the builder that targets it.
//!
//! Applies a whole parameter list at once and composes the resulting
//! conditions into a SeaQuery SELECT.

use std::sync::Arc;

use sea_query::{Alias, Asterisk, Cond, Expr, Query, SelectStatement};
use tracing::{debug, warn};

use super::{Condition, FilterValue, QueryConditionBuilder};
use crate::error::QueryResult;
use crate::field::Field;

/// Declared fields and the condition builder applied to them.
pub struct FilterSet {
    fields: Vec<Arc<dyn Field>>,
    builder: QueryConditionBuilder,
}

impl FilterSet {
    pub fn new(fields: Vec<Arc<dyn Field>>, builder: QueryConditionBuilder) -> Self {
        Self { fields, builder }
    }

    pub fn fields(&self) -> &[Arc<dyn Field>] {
        &self.fields
    }

    pub fn builder(&self) -> &QueryConditionBuilder {
        &self.builder
    }

    /// First declared field that accepts `key`.
    pub fn find_field(&self, key: &str, value: &FilterValue) -> QueryResult<Option<&dyn Field>> {
        for field in &self.fields {
            if self.builder.can_apply(field.as_ref(), key, value)? {
                return Ok(Some(field.as_ref()));
            }
        }
        Ok(None)
    }

    /// Build one condition per parameter some field accepts.
    ///
    /// Parameters no field accepts (paging, sorting, typos) are skipped.
    pub fn conditions(&self, params: &[(String, FilterValue)]) -> QueryResult<Vec<Condition>> {
        let mut conditions = Vec::with_capacity(params.len());
        for (key, value) in params {
            let Some(field) = self.find_field(key, value)? else {
                warn!(key = %key, "no declared field accepts filter key; skipping");
                continue;
            };
            debug!(key = %key, field = %field.name(), "building condition");
            conditions.push(self.builder.build(field, key, value.clone())?);
        }
        Ok(conditions)
    }

    /// AND-combine the conditions for `params`.
    pub fn to_cond(&self, params: &[(String, FilterValue)]) -> QueryResult<Cond> {
        let mut cond = Cond::all();
        for condition in self.conditions(params)? {
            cond = cond.add(condition.into_expr()?);
        }
        Ok(cond)
    }

    /// SELECT the selectable fields of `base_table`, filtered by `params`.
    pub fn select(&self, base_table: &str, params: &[(String, FilterValue)]) -> QueryResult<SelectStatement> {
        let mut query = Query::select();

        let mut selected = 0;
        for field in self.fields.iter().filter(|f| f.is_selectable()) {
            if let Some(expression) = field.sql_expression() {
                query.expr_as(Expr::cust(expression), Alias::new(field.name()));
                selected += 1;
            }
        }
        if selected == 0 {
            query.column((Alias::new(base_table), Asterisk));
        }

        query.from(Alias::new(base_table));
        query.cond_where(self.to_cond(params)?);
        Ok(query)
    }
}
