//! Customer accounts: registration, login and profiles.
//!
//! Passwords are stored as Argon2id PHC strings. Login hands back an HS256
//! JWT carrying the user id and email.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::aggregates::{Credentials, ProfileUpdate, Registration, User};
use crate::store::customers::NewUser;
use crate::store::UserStore;
use crate::{Result, StorefrontError};

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Tokens only grant access to their own user's records.
    pub fn require_user(&self, user_id: i64) -> Result<()> {
        if self.user_id != user_id {
            return Err(StorefrontError::Forbidden("Not allowed to access this profile".to_string()));
        }
        Ok(())
    }
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user_id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: UserStore,
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StorefrontError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Argon2 is CPU-bound; run it on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StorefrontError::Internal(format!("password task failed: {e}")))
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AccountService {
    pub fn new(users: UserStore, jwt_secret: &str, token_ttl_hours: i64) -> Self {
        Self {
            users,
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl: Duration::hours(token_ttl_hours),
        }
    }

    pub async fn register(&self, mut registration: Registration) -> Result<AuthSession> {
        registration.email = registration.email.map(|e| e.trim().to_string());
        let (Some(email), Some(password)) = (required(&registration.email), registration.password.as_deref()) else {
            return Err(StorefrontError::validation("Email and password are required"));
        };
        if password.is_empty() {
            return Err(StorefrontError::validation("Email and password are required"));
        }
        registration.validate()?;

        let owned = password.to_string();
        let password_hash = blocking(move || hash_password(&owned)).await??;
        let user_id = self
            .users
            .create(&NewUser {
                email,
                password_hash: &password_hash,
                first_name: required(&registration.first_name),
                last_name: required(&registration.last_name),
                phone: required(&registration.phone),
            })
            .await?;
        tracing::info!(user_id, "User registered");

        Ok(AuthSession {
            user_id,
            email: email.to_string(),
            first_name: required(&registration.first_name).map(String::from),
            last_name: required(&registration.last_name).map(String::from),
            token: self.issue_token(user_id, email)?,
        })
    }

    pub async fn login(&self, credentials: Credentials) -> Result<AuthSession> {
        let (Some(email), Some(password)) = (required(&credentials.email), credentials.password.as_deref()) else {
            return Err(StorefrontError::validation("Email and password are required"));
        };

        let Some((user, stored_hash)) = self.users.find_by_email(email).await? else {
            return Err(StorefrontError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        let attempt = password.to_string();
        if !blocking(move || verify_password(&attempt, &stored_hash)).await? {
            tracing::debug!(user_id = user.id, "Rejected login");
            return Err(StorefrontError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let token = self.issue_token(user.id, &user.email)?;
        Ok(AuthSession {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            token,
        })
    }

    pub async fn profile(&self, user_id: i64) -> Result<User> {
        self.users
            .find(user_id)
            .await?
            .ok_or_else(|| StorefrontError::not_found("User not found"))
    }

    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> Result<User> {
        update.validate()?;
        if !self.users.update_profile(user_id, &update).await? {
            return Err(StorefrontError::not_found("User not found"));
        }
        self.profile(user_id).await
    }

    fn issue_token(&self, user_id: i64, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| StorefrontError::Internal(format!("token encoding failed: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| StorefrontError::Unauthorized("Invalid or expired token".to_string()))
    }
}
