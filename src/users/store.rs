use async_trait::async_trait;

use super::{query::Statement, repo_types::User};
use crate::error::StoreError;

/// Executes rendered statements; implemented over Postgres in `db.rs`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn fetch_users(&self, stmt: &Statement) -> Result<Vec<User>, StoreError>;
    async fn insert_returning_id(&self, stmt: &Statement) -> Result<i64, StoreError>;
    /// Returns the number of affected rows.
    async fn execute(&self, stmt: &Statement) -> Result<u64, StoreError>;
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::UserStore;
    use crate::error::StoreError;
    use crate::users::{
        fields::{FieldValue, Record, UserField},
        query::{Combinator, Statement, StatementKind},
        repo_types::User,
    };

    #[derive(Default)]
    struct Inner {
        rows: Vec<User>,
        next_id: i64,
        log: Vec<StatementKind>,
    }

    /// In-memory table interpreting `Statement`s; enforces a unique email.
    #[derive(Default)]
    pub struct MemoryStore {
        inner: Mutex<Inner>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.inner.lock().unwrap().rows.len()
        }

        pub fn executed(&self) -> Vec<StatementKind> {
            self.inner.lock().unwrap().log.clone()
        }

        pub fn row(&self, id: i64) -> Option<User> {
            self.inner
                .lock()
                .unwrap()
                .rows
                .iter()
                .find(|u| u.id == id)
                .cloned()
        }
    }

    fn set(user: &mut User, field: UserField, value: &FieldValue) -> Result<(), StoreError> {
        match (field, value) {
            (UserField::FirstName, FieldValue::Text(v)) => user.first_name = v.clone(),
            (UserField::LastName, FieldValue::Text(v)) => user.last_name = v.clone(),
            (UserField::Email, FieldValue::Text(v)) => user.email = v.clone(),
            (UserField::Password, FieldValue::Bytes(v)) => user.password = v.clone(),
            (f, v) => return Err(StoreError::Malformed(format!("cannot assign {v:?} to {f}"))),
        }
        Ok(())
    }

    fn email_taken(rows: &[User], email: &str, except: Option<i64>) -> bool {
        rows.iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn fetch_users(&self, stmt: &Statement) -> Result<Vec<User>, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(stmt.kind);
            let StatementKind::Select { combinator, exclude_id } = stmt.kind else {
                return Err(StoreError::Malformed("not a select".into()));
            };
            let excluded = if exclude_id { stmt.trailing_id() } else { None };
            let is_match = |u: &User| {
                let mut terms = stmt
                    .column_values()
                    .map(|(f, v)| u.field_value(f).as_ref() == Some(v));
                let hit = match combinator {
                    _ if stmt.columns.is_empty() => true,
                    Combinator::And => terms.all(|t| t),
                    Combinator::Or => terms.any(|t| t),
                };
                hit && Some(u.id) != excluded
            };
            Ok(inner.rows.iter().filter(|u| is_match(*u)).cloned().collect())
        }

        async fn insert_returning_id(&self, stmt: &Statement) -> Result<i64, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(stmt.kind);
            let mut user = User {
                id: inner.next_id + 1,
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password: Vec::new(),
                time_created: OffsetDateTime::now_utc(),
            };
            for (field, value) in stmt.column_values() {
                set(&mut user, field, value)?;
            }
            if email_taken(&inner.rows, &user.email, None) {
                return Err(StoreError::UniqueViolation);
            }
            inner.next_id = user.id;
            inner.rows.push(user);
            Ok(inner.next_id)
        }

        async fn execute(&self, stmt: &Statement) -> Result<u64, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(stmt.kind);
            let id = stmt
                .trailing_id()
                .ok_or_else(|| StoreError::Malformed("missing id argument".into()))?;
            match stmt.kind {
                StatementKind::Update => {
                    let Some(pos) = inner.rows.iter().position(|u| u.id == id) else {
                        return Ok(0);
                    };
                    let mut updated = inner.rows[pos].clone();
                    for (field, value) in stmt.column_values() {
                        set(&mut updated, field, value)?;
                    }
                    if email_taken(&inner.rows, &updated.email, Some(id)) {
                        return Err(StoreError::UniqueViolation);
                    }
                    inner.rows[pos] = updated;
                    Ok(1)
                }
                StatementKind::Delete => {
                    let before = inner.rows.len();
                    inner.rows.retain(|u| u.id != id);
                    Ok((before - inner.rows.len()) as u64)
                }
                _ => Err(StoreError::Malformed("not an update or delete".into())),
            }
        }
    }
}
