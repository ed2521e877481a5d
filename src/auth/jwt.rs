use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::{config::JwtConfig, error::AccountError};

/// HS256 signing and verification keys, built once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_hours.max(1) as u64) * 3600),
        }
    }

    pub fn sign(&self, user_id: i64) -> Result<String, AccountError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AccountError::Token(e.to_string()))?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AccountError> {
        if token.is_empty() {
            return Err(AccountError::Token("empty token".into()));
        }
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| AccountError::Token(e.to_string()))?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    /// Claims of a valid token; `None` for empty, malformed, expired or forged input.
    pub fn validate(&self, token: &str) -> Option<Claims> {
        self.verify(token).ok()
    }
}

/// Subject of a valid bearer token.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AccountError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AccountError::Token("missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AccountError::Token("invalid Authorization header".into()))?;

        match keys.validate(token.trim()) {
            Some(claims) => Ok(AuthUser(claims.sub)),
            None => {
                warn!("invalid or expired token");
                Err(AccountError::Token("invalid or expired token".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_hours: 24,
        })
    }

    #[test]
    fn sign_and_validate_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(42).expect("sign");
        let claims = keys.validate(&token).expect("valid token");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn empty_or_garbage_yields_no_claims() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(keys.validate("").is_none());
        assert!(keys.validate("not.a.jwt").is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = make_keys("secret-a", "iss", "aud").sign(1).unwrap();
        assert!(make_keys("secret-b", "iss", "aud").validate(&token).is_none());
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let token = make_keys("same-secret", "good-iss", "good-aud").sign(1).unwrap();
        let err = make_keys("same-secret", "bad-iss", "bad-aud")
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AccountError::Token(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let claims = Claims {
            sub: 1,
            iat: (past - TimeDuration::hours(24)).unix_timestamp() as usize,
            exp: past.unix_timestamp() as usize,
            iss: "iss".into(),
            aud: "aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.validate(&token).is_none());
    }
}
