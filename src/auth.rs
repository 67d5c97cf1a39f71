//! Admin accounts and bearer tokens.
//!
//! Passwords are stored as `salt$hash` where the hash is SHA-256 over the
//! salt concatenated with the password. Tokens are HS256 JWTs carrying the
//! username, an expiry, and a unique id.

use crate::storage::{AdminAccount, ContactStore, StorageError};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

const TOKEN_TTL_HOURS: i64 = 12;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Admin account already exists: {0}")]
    AccountExists(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
    /// Issued-at as a unix timestamp.
    pub iat: i64,
    /// Unique token id.
    pub jti: String,
}

/// Hash a password under a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

/// Check a password against a stored `salt$hash` string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, hash)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == hash
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issues and validates HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| AuthError::InvalidToken)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }
}

/// Create an admin account, rejecting duplicates.
pub fn register_admin(
    store: &dyn ContactStore,
    username: &str,
    password: &str,
    email: Option<&str>,
) -> Result<(), AuthError> {
    if store.get_admin(username)?.is_some() {
        return Err(AuthError::AccountExists(username.to_string()));
    }
    let account = AdminAccount {
        username: username.to_string(),
        password_hash: hash_password(password),
        email: email.map(str::to_string),
    };
    store.insert_admin(&account)?;
    tracing::info!(username, "admin account created");
    Ok(())
}

/// Check credentials and issue a token.
pub fn login(
    store: &dyn ContactStore,
    signer: &TokenSigner,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let account = store
        .get_admin(username)?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(password, &account.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }
    signer.issue(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{OpenStore, SqliteStore};

    #[test]
    fn test_password_hash_verifies_and_salts_differ() {
        let a = hash_password("hunter2");
        let b = hash_password("hunter2");
        assert_ne!(a, b);
        assert!(verify_password("hunter2", &a));
        assert!(verify_password("hunter2", &b));
        assert!(!verify_password("hunter3", &a));
        assert!(!verify_password("hunter2", "malformed"));
    }

    #[test]
    fn test_issued_token_round_trips() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.issue("ops").unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "ops");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_fails_under_other_secret() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.issue("ops").unwrap();
        let other = TokenSigner::new("different-secret");
        assert!(matches!(
            other.verify(&token).unwrap_err(),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            signer.verify("not-a-token").unwrap_err(),
            AuthError::InvalidToken
        ));
    }

    #[test]
    fn test_register_then_login() {
        let store = SqliteStore::open_in_memory().unwrap();
        let signer = TokenSigner::new("test-secret");

        register_admin(&store, "ops", "hunter2", Some("ops@example.com")).unwrap();
        let token = login(&store, &signer, "ops", "hunter2").unwrap();
        assert_eq!(signer.verify(&token).unwrap().sub, "ops");

        assert!(matches!(
            register_admin(&store, "ops", "again", None).unwrap_err(),
            AuthError::AccountExists(_)
        ));
        assert!(matches!(
            login(&store, &signer, "ops", "wrong").unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            login(&store, &signer, "ghost", "hunter2").unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }
}
