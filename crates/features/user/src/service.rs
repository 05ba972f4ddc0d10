use crate::error::{UserError, UserErrorExt};
use fxhash::FxHashMap;
use modhub_auth::AuthService;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

const MAX_DISPLAY_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub display_name: String,
}

impl Profile {
    fn fresh(username: &str) -> Self {
        Self { username: username.to_owned(), display_name: username.to_owned() }
    }
}

/// Profiles keyed by username. A profile is created on first access.
#[derive(Debug)]
pub struct UserService {
    auth: Arc<AuthService>,
    profiles: RwLock<FxHashMap<String, Profile>>,
}

impl UserService {
    #[must_use]
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth, profiles: RwLock::new(FxHashMap::default()) }
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    /// [`UserError::Auth`] when nobody is signed in.
    pub fn current(&self) -> Result<Profile, UserError> {
        let session = self.auth.require().context("reading current profile")?;
        if let Some(profile) = self.profiles.read().get(&session.username) {
            return Ok(profile.clone());
        }

        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry(session.username.clone())
            .or_insert_with(|| Profile::fresh(&session.username));
        debug!(user = %session.username, "Profile created");
        Ok(profile.clone())
    }

    /// # Errors
    /// [`UserError::InvalidName`] for blank or overlong names, [`UserError::Auth`] when nobody
    /// is signed in.
    pub fn rename(&self, display_name: &str) -> Result<Profile, UserError> {
        let display_name = display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(UserError::InvalidName {
                message: format!("expected 1..={MAX_DISPLAY_NAME_LEN} characters").into(),
                context: None,
            });
        }

        let username = self.current()?.username;
        let mut profiles = self.profiles.write();
        let profile = profiles.entry(username.clone()).or_insert_with(|| Profile::fresh(&username));
        display_name.clone_into(&mut profile.display_name);
        Ok(profile.clone())
    }

    #[must_use]
    pub fn known_users(&self) -> usize {
        self.profiles.read().len()
    }
}
