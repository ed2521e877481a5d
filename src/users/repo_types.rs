use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::fields::{FieldValue, Record, UserField};

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: Vec<u8>, // Argon2 PHC string, never exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub time_created: OffsetDateTime,
}

impl User {
    pub fn password_hash(&self) -> Option<&str> {
        std::str::from_utf8(&self.password).ok()
    }
}

impl Record for User {
    fn field_value(&self, field: UserField) -> Option<FieldValue> {
        Some(match field {
            UserField::Id => FieldValue::Int(self.id),
            UserField::FirstName => FieldValue::Text(self.first_name.clone()),
            UserField::LastName => FieldValue::Text(self.last_name.clone()),
            UserField::Email => FieldValue::Text(self.email.clone()),
            UserField::Password => FieldValue::Bytes(self.password.clone()),
            UserField::TimeCreated => FieldValue::Timestamp(self.time_created),
        })
    }
}

/// Caller-supplied user fields; empty strings mean "not supplied".
/// `id` and `time_created` are not accepted and are ignored if sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String, // plaintext, hashed by the repository
}

impl UserInput {
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = self.email.trim().to_string();
        self
    }
}

impl Record for UserInput {
    fn field_value(&self, field: UserField) -> Option<FieldValue> {
        match field {
            UserField::FirstName => Some(FieldValue::Text(self.first_name.clone())),
            UserField::LastName => Some(FieldValue::Text(self.last_name.clone())),
            UserField::Email => Some(FieldValue::Text(self.email.clone())),
            UserField::Password => Some(FieldValue::Bytes(self.password.as_bytes().to_vec())),
            UserField::Id | UserField::TimeCreated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::fields::map_fields;

    #[test]
    fn password_is_never_serialized() {
        let user = User {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: b"$argon2id$v=19$secret".to_vec(),
            time_created: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn input_ignores_system_fields() {
        let input: UserInput = serde_json::from_str(
            r#"{"id": 42, "time_created": "2020-01-01T00:00:00Z", "first_name": " Ada "}"#,
        )
        .unwrap();
        let input = input.normalized();
        let fields = map_fields(&input).unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], (UserField::FirstName, FieldValue::Text("Ada".into())));
        assert!(fields.iter().all(|(f, _)| *f != UserField::Id));
    }
}
