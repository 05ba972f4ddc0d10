//! Facade crate for ModHub.
//! Re-exports domain/kernel primitives and wires the compiled-in feature slices into a manager.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Pick slices with Cargo features (`auth`, `user`, `reports`; `full` is the default).
//! - Call [`bootstrap`] for a manager with every slice registered, or [`start`] to also run the
//!   configured preloads.

pub use modhub_domain as domain;
pub use modhub_kernel as kernel;

use futures::future;
use modhub_domain::config::FeaturesConfig;
use modhub_kernel::{Container, FeatureError, FeatureManager, FeatureRegistry};
use tracing::info;

/// Feature slices compiled into this build.
pub mod features {
    #[cfg(feature = "auth")]
    pub use modhub_auth as auth;
    #[cfg(feature = "reports")]
    pub use modhub_reports as reports;
    #[cfg(feature = "user")]
    pub use modhub_user as user;

    /// Names of the compiled-in slices, dependencies first.
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "auth")]
        modhub_auth::FEATURE,
        #[cfg(feature = "user")]
        modhub_user::FEATURE,
        #[cfg(feature = "reports")]
        modhub_reports::FEATURE,
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Registers every compiled-in slice and returns how many were newly added.
pub fn register_features(registry: &FeatureRegistry) -> usize {
    let registrations: &[fn(&FeatureRegistry) -> bool] = &[
        #[cfg(feature = "auth")]
        features::auth::register,
        #[cfg(feature = "user")]
        features::user::register,
        #[cfg(feature = "reports")]
        features::reports::register,
    ];

    registrations.iter().filter(|register| register(registry)).count()
}

/// A manager over a fresh registry and container with every compiled-in slice registered.
#[must_use]
pub fn bootstrap() -> FeatureManager {
    let registry = FeatureRegistry::new();
    let registered = register_features(&registry);
    info!(registered, "Feature slices registered");
    FeatureManager::new(registry, Container::new())
}

/// [`bootstrap`] followed by the preloads named in `config`.
///
/// # Errors
/// The first preload failure, or [`FeatureError::Timeout`] if a preload outlives
/// `config.load_timeout_ms`.
pub async fn start(config: &FeaturesConfig) -> Result<FeatureManager, FeatureError> {
    let manager = bootstrap();
    warm(&manager, config).await?;
    Ok(manager)
}

/// Runs the preloads of `config` against an existing manager.
///
/// # Errors
/// See [`start`].
pub async fn warm(manager: &FeatureManager, config: &FeaturesConfig) -> Result<(), FeatureError> {
    if config.preload.is_empty() {
        return Ok(());
    }

    info!(features = ?config.preload, "Preloading features");
    match config.load_timeout() {
        None => manager.preload(&config.preload).await,
        Some(limit) => {
            let loads = config.preload.iter().map(|name| manager.ensure_loaded_within(name, limit));
            future::try_join_all(loads).await.map(|_| ())
        },
    }
}
