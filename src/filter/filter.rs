use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::types::{FilterOrderInfo, FilterWhereInfo, SortDirection};

/// Conjunction of equality conditions over top-level document fields, with an
/// optional sort on one field. Understood by every `DocumentStore`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    where_data: Vec<FilterWhereInfo>,
    order_data: Option<FilterOrderInfo>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_data.push(FilterWhereInfo {
            field: field.into(),
            data: value.into(),
        });
        self
    }

    pub fn order(mut self, field: impl Into<String>, sort: SortDirection) -> Self {
        self.order_data = Some(FilterOrderInfo {
            field: field.into(),
            sort,
        });
        self
    }

    pub fn order_info(&self) -> Option<&FilterOrderInfo> {
        self.order_data.as_ref()
    }

    /// Field names end up inside SQL expressions, so only plain identifiers pass.
    pub fn validate(&self) -> Result<(), FilterError> {
        let fields = self
            .where_data
            .iter()
            .map(|w| &w.field)
            .chain(self.order_data.iter().map(|o| &o.field));

        for field in fields {
            let valid = !field.is_empty()
                && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(FilterError::InvalidField(field.clone()));
            }
        }
        Ok(())
    }

    /// The conditions as one JSON object, suitable for a containment test.
    pub fn to_containment(&self) -> Value {
        let map: Map<String, Value> = self
            .where_data
            .iter()
            .map(|w| (w.field.clone(), w.data.clone()))
            .collect();
        Value::Object(map)
    }

    pub fn matches(&self, body: &Value) -> bool {
        self.where_data
            .iter()
            .all(|w| body.get(&w.field) == Some(&w.data))
    }

    /// Ordering of two document bodies under this filter's sort, if any.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let Some(order) = &self.order_data else {
            return Ordering::Equal;
        };

        let ordering = compare_values(a.get(&order.field), b.get(&order.field));
        match order.sort {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, None) | (Some(Value::Null), Some(Value::Null)) => Ordering::Equal,
        (None, _) | (Some(Value::Null), _) => Ordering::Less,
        (_, None) | (_, Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
