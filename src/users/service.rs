use tracing::{info, instrument, warn};

use super::{
    filter::Filter,
    query::Combinator,
    repo::UserRepository,
    repo_types::{User, UserInput},
};
use crate::{
    auth::{jwt::JwtKeys, password::verify_password},
    error::AccountError,
};

/// Account operations consumed by the HTTP layer.
#[derive(Clone)]
pub struct AccountService {
    repo: UserRepository,
    keys: JwtKeys,
}

impl AccountService {
    pub fn new(repo: UserRepository, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn signup(&self, input: UserInput) -> Result<User, AccountError> {
        self.repo.create(input.normalized()).await
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AccountError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AccountError::Validation("Email cannot be blank".into()));
        }
        if password.is_empty() {
            return Err(AccountError::Validation("Password cannot be blank".into()));
        }

        let Some(user) = self.repo.find_by_email(email).await? else {
            warn!("login unknown email");
            return Err(AccountError::InvalidCredentials);
        };
        let hash = user
            .password_hash()
            .ok_or_else(|| AccountError::Credential("stored hash is not valid UTF-8".into()))?;
        if !verify_password(password.as_bytes(), hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    /// The user named by a token's subject.
    pub async fn profile(&self, subject: i64) -> Result<User, AccountError> {
        self.repo.get(subject).await
    }

    pub async fn list(&self) -> Result<Vec<User>, AccountError> {
        self.repo.list().await
    }

    pub async fn search(&self, filter: Filter, op: Combinator) -> Result<Vec<User>, AccountError> {
        self.repo.search(filter, op).await
    }

    pub async fn show(&self, id: i64) -> Result<User, AccountError> {
        self.repo.get(id).await
    }

    pub async fn update(
        &self,
        subject: i64,
        id: i64,
        input: UserInput,
    ) -> Result<User, AccountError> {
        ensure_owner(subject, id, "update")?;
        self.repo.update(id, input.normalized()).await
    }

    pub async fn delete(&self, subject: i64, id: i64) -> Result<(), AccountError> {
        ensure_owner(subject, id, "delete")?;
        self.repo.delete(id).await
    }
}

fn ensure_owner(subject: i64, id: i64, action: &'static str) -> Result<(), AccountError> {
    if subject != id {
        warn!(subject, id, action, "permission denied");
        return Err(AccountError::PermissionDenied(action));
    }
    Ok(())
}
