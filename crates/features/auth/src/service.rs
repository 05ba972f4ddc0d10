use crate::error::AuthError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

const MIN_SECRET_LEN: usize = 8;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub token: String,
}

/// Holds at most one signed-in session.
#[derive(Debug, Default)]
pub struct AuthService {
    session: RwLock<Option<Session>>,
    issued: AtomicU64,
}

impl AuthService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `username`, replacing any current one.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] for a blank username or a secret shorter than eight
    /// characters.
    pub fn sign_in(&self, username: &str, secret: &str) -> Result<Session, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidCredentials {
                message: "username is empty".into(),
                context: None,
            });
        }
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(AuthError::InvalidCredentials {
                message: format!("secret must have at least {MIN_SECRET_LEN} characters").into(),
                context: None,
            });
        }

        let serial = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Session { username: username.to_owned(), token: format!("{username}.{serial}") };
        *self.session.write() = Some(session.clone());
        info!(user = %session.username, "Signed in");
        Ok(session)
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// # Errors
    /// [`AuthError::NotSignedIn`] when there is no session.
    pub fn require(&self) -> Result<Session, AuthError> {
        self.current().ok_or(AuthError::NotSignedIn { context: None })
    }

    /// Ends the current session and returns it.
    pub fn sign_out(&self) -> Option<Session> {
        let ended = self.session.write().take();
        if let Some(session) = &ended {
            info!(user = %session.username, "Signed out");
        }
        ended
    }
}
