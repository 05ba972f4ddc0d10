//! Authentication feature slice.
//!
//! Binds [`AuthService`] under [`AUTH_SERVICE`]. Other features that need the signed-in user
//! declare a dependency on [`FEATURE`] and resolve the service from the container.

mod error;
mod service;

pub use crate::error::{AuthError, AuthErrorExt};
pub use crate::service::{AuthService, Session};

use modhub_kernel::prelude::*;

pub const FEATURE: &str = "auth";

pub const AUTH_SERVICE: ServiceKey<AuthService> = ServiceKey::new("auth.service");

/// Registry entry of the auth feature.
#[must_use]
pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::builder(FEATURE)
        .description("Sign-in sessions")
        .version(env!("CARGO_PKG_VERSION"))
        .tag("core")
        .loader(load)
}

/// Adds the auth feature to `registry`; `false` if it was already there.
pub fn register(registry: &FeatureRegistry) -> bool {
    registry.register(descriptor())
}

async fn load() -> Result<FeatureModule, BoxError> {
    tracing::debug!(feature = FEATURE, "Auth module loaded");
    Ok(FeatureModule::named(FEATURE).on_register(|container| {
        container.bind_singleton(AUTH_SERVICE, |_| Ok(AuthService::new()));
        Ok(())
    }))
}
