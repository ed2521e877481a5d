use std::fmt;

use time::OffsetDateTime;

use crate::error::AccountError;

/// Every column of the user table, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
    FirstName,
    LastName,
    Email,
    Password,
    TimeCreated,
}

/// Static description of one column.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: UserField,
    pub column: &'static str,
    pub required: bool,
    pub unique: bool,
    /// Assigned by the store, never accepted from a caller.
    pub system_managed: bool,
    pub searchable: bool,
}

pub const USER_FIELDS: [FieldSpec; 6] = [
    FieldSpec {
        field: UserField::Id,
        column: "id",
        required: false,
        unique: true,
        system_managed: true,
        searchable: true,
    },
    FieldSpec {
        field: UserField::FirstName,
        column: "first_name",
        required: true,
        unique: false,
        system_managed: false,
        searchable: true,
    },
    FieldSpec {
        field: UserField::LastName,
        column: "last_name",
        required: true,
        unique: false,
        system_managed: false,
        searchable: true,
    },
    FieldSpec {
        field: UserField::Email,
        column: "email",
        required: true,
        unique: true,
        system_managed: false,
        searchable: true,
    },
    FieldSpec {
        field: UserField::Password,
        column: "password",
        required: true,
        unique: false,
        system_managed: false,
        searchable: false,
    },
    FieldSpec {
        field: UserField::TimeCreated,
        column: "time_created",
        required: false,
        unique: false,
        system_managed: true,
        searchable: false,
    },
];

impl UserField {
    pub fn spec(self) -> &'static FieldSpec {
        // USER_FIELDS is declared in enum order
        &USER_FIELDS[self as usize]
    }

    pub fn column(self) -> &'static str {
        self.spec().column
    }

    pub fn from_column(name: &str) -> Option<Self> {
        USER_FIELDS.iter().find(|s| s.column == name).map(|s| s.field)
    }

    /// Fields that are unique but still caller-supplied (the id is guarded by the store).
    pub fn caller_unique() -> impl Iterator<Item = UserField> {
        USER_FIELDS
            .iter()
            .filter(|s| s.unique && !s.system_managed)
            .map(|s| s.field)
    }

    pub fn required_count() -> usize {
        USER_FIELDS.iter().filter(|s| s.required).count()
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(OffsetDateTime),
}

impl FieldValue {
    /// Zero values mean "not supplied".
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Int(v) => *v == 0,
            FieldValue::Text(v) => v.is_empty(),
            FieldValue::Bytes(v) => v.is_empty(),
            FieldValue::Timestamp(v) => *v == OffsetDateTime::UNIX_EPOCH,
        }
    }
}

/// A typed record whose columns can be read through the descriptor table.
pub trait Record {
    /// `None` when the record does not carry this column.
    fn field_value(&self, field: UserField) -> Option<FieldValue>;
}

/// Record Mapper: ordered `(field, value)` pairs for every caller-supplied column.
pub fn map_fields<R: Record>(record: &R) -> Result<Vec<(UserField, FieldValue)>, AccountError> {
    USER_FIELDS
        .iter()
        .filter(|s| !s.system_managed)
        .map(|s| {
            record
                .field_value(s.field)
                .map(|v| (s.field, v))
                .ok_or(AccountError::Mapping(s.field))
        })
        .collect()
}

/// Same as [`map_fields`] but drops zero values; used by update.
pub fn map_present_fields<R: Record>(
    record: &R,
) -> Result<Vec<(UserField, FieldValue)>, AccountError> {
    Ok(map_fields(record)?
        .into_iter()
        .filter(|(_, v)| !v.is_zero())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Partial {
        first_name: String,
    }

    impl Record for Partial {
        fn field_value(&self, field: UserField) -> Option<FieldValue> {
            match field {
                UserField::FirstName => Some(FieldValue::Text(self.first_name.clone())),
                UserField::LastName | UserField::Email => Some(FieldValue::Text(String::new())),
                _ => None,
            }
        }
    }

    #[test]
    fn table_is_in_enum_order() {
        for (i, spec) in USER_FIELDS.iter().enumerate() {
            assert_eq!(spec.field as usize, i);
            assert_eq!(UserField::from_column(spec.column), Some(spec.field));
        }
    }

    #[test]
    fn only_email_is_caller_unique() {
        assert_eq!(UserField::caller_unique().collect::<Vec<_>>(), vec![UserField::Email]);
        assert_eq!(UserField::required_count(), 4);
    }

    #[test]
    fn unreadable_field_is_a_mapping_error() {
        let rec = Partial { first_name: "Ada".into() };
        let err = map_fields(&rec).unwrap_err();
        assert!(matches!(err, AccountError::Mapping(UserField::Password)));
    }

    #[test]
    fn zero_values_are_detected() {
        assert!(FieldValue::Text(String::new()).is_zero());
        assert!(FieldValue::Bytes(vec![]).is_zero());
        assert!(FieldValue::Int(0).is_zero());
        assert!(!FieldValue::Text("x".into()).is_zero());
    }
}
