//! Login, registration and logout on top of the session store.
//!
//! Credentials are checked locally against the same rules the backend
//! enforces so an obviously bad form never costs a round trip.

use crate::api::{AccountApi, LoginRequest, RegisterRequest};
use crate::error::Sheet2DeckError;
use crate::session::{AuthChange, SessionStore, UserSnapshot};
use std::sync::Arc;
use tracing::{info, warn};

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Account flows that end in a stored session (or its removal).
#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn AccountApi>,
    session: SessionStore,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("session", &self.session)
            .finish()
    }
}

impl AuthService {
    pub fn new(api: Arc<dyn AccountApi>, session: SessionStore) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Log in and persist the returned credential and user.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSnapshot, Sheet2DeckError> {
        let request = LoginRequest {
            email: validate_email(email)?,
            password: validate_password(password)?,
        };
        let response = self.api.login(&request).await?;
        self.session.save_login(&response.access_token, &response.user)?;
        info!("Logged in as {}", request.email);
        Ok(response.user)
    }

    /// Create an account. When the backend only acknowledges, log in with
    /// the same credentials.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<UserSnapshot, Sheet2DeckError> {
        let request = RegisterRequest {
            email: validate_email(email)?,
            password: validate_password(password)?,
            name: name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        };
        let response = self.api.register(&request).await?;

        match (response.access_token, response.user) {
            (Some(token), Some(user)) => {
                self.session.save_login(&token, &user)?;
                info!("Registered and logged in as {}", request.email);
                Ok(user)
            }
            (Some(token), None) => {
                let user = self.api.current_user(&token).await?;
                self.session.save_login(&token, &user)?;
                info!("Registered and logged in as {}", request.email);
                Ok(user)
            }
            (None, _) => {
                info!("Registered {}; logging in", request.email);
                self.login(&request.email, &request.password).await
            }
        }
    }

    /// Forget the credential and cached user.
    pub fn logout(&self) -> Result<(), Sheet2DeckError> {
        self.session.clear(AuthChange::LoggedOut)?;
        info!("Logged out");
        Ok(())
    }

    /// Re-fetch the current user. A 401 ends the session.
    pub async fn refresh_user(&self) -> Result<UserSnapshot, Sheet2DeckError> {
        let token = self.session.token().ok_or(Sheet2DeckError::NotAuthenticated)?;
        match self.api.current_user(&token).await {
            Ok(user) => {
                self.session.set_user(&user)?;
                Ok(user)
            }
            Err(e) if e.status() == Some(401) => {
                warn!("Session rejected by backend; clearing it");
                if let Err(clear) = self.session.clear(AuthChange::Expired) {
                    warn!("Could not clear expired session: {}", clear);
                }
                Err(Sheet2DeckError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }
}

/// Trimmed email with a non-empty local part and domain.
pub fn validate_email(email: &str) -> Result<String, Sheet2DeckError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email.to_string())
        }
        _ => Err(Sheet2DeckError::InvalidInput(format!(
            "'{email}' is not a valid email address"
        ))),
    }
}

pub fn validate_password(password: &str) -> Result<String, Sheet2DeckError> {
    let len = password.chars().count();
    if (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        Ok(password.to_string())
    } else {
        Err(Sheet2DeckError::InvalidInput(format!(
            "password must be {PASSWORD_MIN_LEN} to {PASSWORD_MAX_LEN} characters long"
        )))
    }
}
