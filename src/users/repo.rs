use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use super::{
    fields::{map_fields, map_present_fields, FieldValue, Record, UserField},
    filter::Filter,
    query::{Combinator, QueryBuilder},
    repo_types::{User, UserInput},
    store::UserStore,
};
use crate::{auth::password::hash_password, error::AccountError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_email(fields: &[(UserField, FieldValue)]) -> Result<(), AccountError> {
    for (field, value) in fields {
        if let (UserField::Email, FieldValue::Text(email)) = (field, value) {
            if !is_valid_email(email) {
                return Err(AccountError::Validation(format!("{email:?} is not a valid email")));
            }
        }
    }
    Ok(())
}

/// Replaces the plaintext password value, if any, with its hash.
fn hash_in_place(fields: &mut [(UserField, FieldValue)]) -> Result<(), AccountError> {
    for (field, value) in fields.iter_mut() {
        if *field != UserField::Password {
            continue;
        }
        if let FieldValue::Bytes(plain) = value {
            let hash = hash_password(plain)?;
            *value = FieldValue::Bytes(hash.into_bytes());
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    queries: QueryBuilder,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, queries: QueryBuilder) -> Self {
        Self { store, queries }
    }

    /// Validate, check uniqueness, insert, and return the stored row.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: UserInput) -> Result<User, AccountError> {
        let mut fields = map_fields(&input)?;

        let populated = fields.iter().filter(|(_, v)| !v.is_zero()).count();
        if populated < UserField::required_count() {
            let missing: Vec<String> = fields
                .iter()
                .filter(|(f, v)| f.spec().required && v.is_zero())
                .map(|(f, _)| f.to_string())
                .collect();
            warn!(?missing, "missing required fields");
            return Err(AccountError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        check_email(&fields)?;

        hash_in_place(&mut fields)?;

        let unique = self.unique_filter(&input, None)?;
        let existing = self
            .search(unique, Combinator::And)
            .await
            .map_err(as_uniqueness_failure)?;
        if !existing.is_empty() {
            warn!("user is not unique");
            return Err(AccountError::NotUnique);
        }

        let stmt = self.queries.insert(fields);
        debug!(sql = %stmt.sql, args = stmt.args.len(), "insert user");
        let id = self.store.insert_returning_id(&stmt).await?;

        let user = self.get(id).await.map_err(|e| {
            warn!(error = %e, id, "re-fetch after create failed");
            AccountError::Refetch("created")
        })?;
        info!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Exactly one row, otherwise `NotFound`.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<User, AccountError> {
        self.search(Filter::by(UserField::Id, FieldValue::Int(id)), Combinator::And)
            .await?
            .into_iter()
            .next()
            .ok_or(AccountError::NotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let filter = Filter::by(UserField::Email, FieldValue::Text(email.to_string()));
        Ok(self.search(filter, Combinator::And).await?.into_iter().next())
    }

    pub async fn list(&self) -> Result<Vec<User>, AccountError> {
        self.search(Filter::new(), Combinator::And).await
    }

    pub async fn search(&self, filter: Filter, op: Combinator) -> Result<Vec<User>, AccountError> {
        let stmt = self.queries.select(filter.into_terms(), op);
        debug!(sql = %stmt.sql, args = stmt.args.len(), "select users");
        Ok(self.store.fetch_users(&stmt).await?)
    }

    /// Applies the non-zero fields of `input`; uniqueness ignores the row itself.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: UserInput) -> Result<User, AccountError> {
        let mut fields = map_present_fields(&input)?;
        if fields.is_empty() {
            return Err(AccountError::Validation("no fields to update".into()));
        }
        check_email(&fields)?;

        let unique = self.unique_filter(&input, Some(fields.as_slice()))?;
        if !unique.is_empty() {
            let stmt = self
                .queries
                .select_excluding(unique.into_terms(), Combinator::Or, id);
            debug!(sql = %stmt.sql, args = stmt.args.len(), "uniqueness check");
            let clashes = self
                .store
                .fetch_users(&stmt)
                .await
                .map_err(|e| as_uniqueness_failure(e.into()))?;
            if !clashes.is_empty() {
                warn!(user_id = id, "update would break uniqueness");
                return Err(AccountError::NotUnique);
            }
        }

        hash_in_place(&mut fields)?;

        let stmt = self.queries.update(id, fields);
        debug!(sql = %stmt.sql, args = stmt.args.len(), "update user");
        if self.store.execute(&stmt).await? == 0 {
            return Err(AccountError::NotFound);
        }

        let user = self.get(id).await.map_err(|e| {
            warn!(error = %e, id, "re-fetch after update failed");
            AccountError::Refetch("updated")
        })?;
        info!(user_id = id, "user updated");
        Ok(user)
    }

    /// Hard delete; `NotFound` when no row had this id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), AccountError> {
        let stmt = self.queries.delete(id);
        debug!(sql = %stmt.sql, "delete user");
        match self.store.execute(&stmt).await? {
            0 => Err(AccountError::NotFound),
            _ => {
                info!(user_id = id, "user deleted");
                Ok(())
            }
        }
    }

    /// Unique-field terms of `record`. With `present`, only fields supplied there are used.
    fn unique_filter<R: Record>(
        &self,
        record: &R,
        present: Option<&[(UserField, FieldValue)]>,
    ) -> Result<Filter, AccountError> {
        let mut filter = Filter::new();
        for field in UserField::caller_unique() {
            if let Some(present) = present {
                if !present.iter().any(|(f, _)| *f == field) {
                    continue;
                }
            }
            let value = record.field_value(field).ok_or(AccountError::Mapping(field))?;
            filter.push(field, value);
        }
        Ok(filter)
    }
}

fn as_uniqueness_failure(e: AccountError) -> AccountError {
    match e {
        AccountError::Storage(inner) => AccountError::UniquenessCheck(inner),
        other => other,
    }
}
