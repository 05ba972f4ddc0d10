//! User feature slice: profile of whoever is signed in through the auth feature.

mod error;
mod service;

pub use crate::error::{UserError, UserErrorExt};
pub use crate::service::{Profile, UserService};

use modhub_auth::AUTH_SERVICE;
use modhub_kernel::prelude::*;

pub const FEATURE: &str = "user";

pub const USER_SERVICE: ServiceKey<UserService> = ServiceKey::new("user.service");

#[must_use]
pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::builder(FEATURE)
        .description("Profiles of signed-in users")
        .version(env!("CARGO_PKG_VERSION"))
        .tag("core")
        .depends_on(modhub_auth::FEATURE)
        .loader(load)
}

pub fn register(registry: &FeatureRegistry) -> bool {
    registry.register(descriptor())
}

async fn load() -> Result<FeatureModule, BoxError> {
    Ok(FeatureModule::named(FEATURE).on_register(|container| {
        // Auth is a declared dependency and must already be bound.
        if !container.is_bound(AUTH_SERVICE.name()) {
            return Err(UserError::Internal {
                message: "auth service is not bound".into(),
                context: Some("registering user feature".into()),
            }
            .into());
        }
        container.bind_singleton(USER_SERVICE, |c| Ok(UserService::new(c.resolve(&AUTH_SERVICE)?)));
        Ok(())
    }))
}
