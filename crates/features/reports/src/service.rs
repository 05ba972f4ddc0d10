use crate::error::{ReportError, ReportErrorExt};
use modhub_user::UserService;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Monotonic per service instance, starting at 1.
    pub serial: u64,
    pub owner: String,
    pub title: String,
}

#[derive(Debug)]
pub struct ReportService {
    users: Arc<UserService>,
    generated: AtomicU64,
}

impl ReportService {
    #[must_use]
    pub const fn new(users: Arc<UserService>) -> Self {
        Self { users, generated: AtomicU64::new(0) }
    }

    /// # Errors
    /// [`ReportError::User`] when nobody is signed in.
    pub fn activity(&self) -> Result<Report, ReportError> {
        let profile = self.users.current().context("building activity report")?;
        let serial = self.generated.fetch_add(1, Ordering::Relaxed) + 1;
        info!(owner = %profile.username, serial, "Report generated");
        Ok(Report {
            serial,
            title: format!("Activity of {}", profile.display_name),
            owner: profile.username,
        })
    }

    #[must_use]
    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }
}
