use std::sync::Arc;

use crate::errors::RequestError;
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, Request};
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Serialize, Deserialize)]
struct AuthClaim {
    id: i64,
    exp: i64,
}

/// Signing material shared by every request through an `Extension`.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: time::Duration,
}

impl AuthKeys {
    pub fn new(secret: &str, expiry_days: i64) -> Self {
        AuthKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: time::Duration::days(expiry_days),
        }
    }

    pub fn issue_token(&self, id: i64) -> Result<String> {
        let expiry_date = OffsetDateTime::now_utc() + self.expiry;
        let claim = AuthClaim {
            id,
            exp: expiry_date.unix_timestamp(),
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claim, &self.encoding)
            .context("Failed to generate jwt token")
    }

    pub fn verify_token(&self, token: &str) -> Result<i64, RequestError> {
        let token_data = jsonwebtoken::decode::<AuthClaim>(
            token,
            &self.decoding,
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected token");
            RequestError::Unauthenticated("Invalid token")
        })?;
        let claim = token_data.claims;
        if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
            return Err(RequestError::Unauthenticated("Token expired"));
        }
        Ok(claim.id)
    }
}

pub struct AuthUser {
    pub id: i64,
    pub token: String,
}

/// The caller behind `Authorization: Token <jwt>`, if any. A missing header
/// is an anonymous request; a malformed or expired token is rejected.
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|a| a.id)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = match parts.headers.get("Authorization") {
            Some(header) => header,
            None => return Ok(MaybeUser(None)),
        };
        let header = header
            .to_str()
            .map_err(|_| RequestError::Unauthenticated("Invalid token"))?;

        let token = header
            .strip_prefix("Token ")
            .or_else(|| header.strip_prefix("Bearer "))
            .ok_or(RequestError::Unauthenticated("Invalid token"))?;

        let keys = parts
            .extensions
            .get::<Arc<AuthKeys>>()
            .cloned()
            .ok_or(RequestError::ServerError)?;
        let id = keys.verify_token(token)?;

        Ok(MaybeUser(Some(AuthUser {
            id,
            token: token.to_string(),
        })))
    }
}

/// Rejects a request carrying a bad token before it reaches any handler,
/// including handlers that never look at the caller.
pub async fn reject_invalid_tokens<B>(
    _user: MaybeUser,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    next.run(request).await
}

pub async fn verify_password_argon2(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to parse password hash"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_to_the_same_id() {
        let keys = AuthKeys::new("test-secret", 1);
        let token = keys.issue_token(42).unwrap();
        assert_eq!(keys.verify_token(&token).unwrap(), 42);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = AuthKeys::new("one", 1).issue_token(7).unwrap();
        let result = AuthKeys::new("two", 1).verify_token(&token);
        assert!(matches!(result, Err(RequestError::Unauthenticated(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = AuthKeys::new("secret", -2).issue_token(7).unwrap();
        let result = AuthKeys::new("secret", 1).verify_token(&token);
        assert!(matches!(result, Err(RequestError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password_argon2("hunter22".into()).await.unwrap();
        assert!(verify_password_argon2("hunter22".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_argon2("hunter23".into(), hash).await.unwrap());
    }
}
