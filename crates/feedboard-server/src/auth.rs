//! Accounts and cookie sessions
//!
//! Users live in memory with Argon2 PHC password hashes. A successful login
//! mints a random 32-byte token that is handed to the browser as an HttpOnly
//! cookie and mapped server-side to the user name.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::COOKIE, request::Parts},
};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use feedboard_feed::AuthGate;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::AppError;
use crate::state::AppState;

/// Account and session failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Fill all fields")]
    MissingFields,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Hash `password` into a PHC string with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Registered users
#[derive(Debug, Default)]
pub struct UserStore {
    users: DashMap<String, String>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `username` is taken
    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Store a new user; the first registration of a name wins
    pub fn register(&self, username: &str, password_hash: String) -> Result<(), AuthError> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(AuthError::UsernameTaken),
            Entry::Vacant(slot) => {
                slot.insert(password_hash);
                info!(username, "User registered");
                Ok(())
            }
        }
    }

    /// Stored PHC hash of `username`
    pub fn password_hash(&self, username: &str) -> Option<String> {
        self.users.get(username).map(|hash| hash.clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// A logged-in browser
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Live sessions keyed by cookie token
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `username` and return its token
    pub fn create(&self, username: impl Into<String>) -> String {
        let token = hex::encode(rand::rng().random::<[u8; 32]>());
        let username = username.into();
        debug!(username = %username, "Session created");
        self.sessions.insert(
            token.clone(),
            Session {
                username,
                created_at: Utc::now(),
            },
        );
        token
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|session| session.clone())
    }

    /// End a session; unknown tokens are ignored
    pub fn remove(&self, token: &str) -> Option<Session> {
        self.sessions.remove(token).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl AuthGate<Caller> for SessionStore {
    fn is_authorized(&self, caller: &Caller) -> bool {
        caller
            .token()
            .is_some_and(|token| self.sessions.contains_key(token))
    }
}

/// Whatever session token the request carried, valid or not
#[derive(Debug, Clone, Default)]
pub struct Caller {
    token: Option<String>,
}

impl Caller {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, &state.config.auth.cookie_name);
        Ok(Self::new(token))
    }
}

/// The logged-in user; rejects with a redirect to the login page
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: String,
    pub session: Session,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        let token = caller.token.ok_or(AppError::Unauthorized)?;
        let session = state.sessions.get(&token).ok_or(AppError::Unauthorized)?;
        Ok(Self { token, session })
    }
}

impl From<&CurrentUser> for Caller {
    fn from(user: &CurrentUser) -> Self {
        Self::new(Some(user.token.clone()))
    }
}

/// Value of cookie `name` across every `Cookie` header
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(name: &str, token: &str, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, token);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session cookie
pub fn expired_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}
