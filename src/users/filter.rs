use serde_json::{Map, Value};

use super::fields::{FieldValue, UserField};
use crate::error::AccountError;

/// Ordered, validated search terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Vec<(UserField, FieldValue)>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(field: UserField, value: FieldValue) -> Self {
        Self(vec![(field, value)])
    }

    pub fn push(&mut self, field: UserField, value: FieldValue) {
        self.0.push((field, value));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_terms(self) -> Vec<(UserField, FieldValue)> {
        self.0
    }

    /// Builds a filter from a JSON object, keeping key order.
    pub fn from_json(params: &Map<String, Value>) -> Result<Self, AccountError> {
        let mut filter = Self::new();
        for (key, value) in params {
            let field = UserField::from_column(key)
                .ok_or_else(|| AccountError::Validation(format!("unknown field {key:?}")))?;
            if !field.spec().searchable {
                return Err(AccountError::Validation(format!("field {field} is not searchable")));
            }
            let value = match (field, value) {
                (UserField::Id, Value::Number(n)) => n.as_i64().map(FieldValue::Int),
                (UserField::Id, Value::String(s)) => s.parse::<i64>().ok().map(FieldValue::Int),
                (UserField::Id, _) => None,
                (_, Value::String(s)) => Some(FieldValue::Text(s.clone())),
                _ => None,
            }
            .ok_or_else(|| AccountError::Validation(format!("invalid value for field {field}")))?;
            filter.push(field, value);
        }
        Ok(filter)
    }
}
