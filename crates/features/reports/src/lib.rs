//! Reports feature slice.
//!
//! Tagged `lazy`: it is not preloaded by default and comes up the first time a report is asked
//! for, pulling in user and auth on the way.

mod error;
mod service;

pub use crate::error::{ReportError, ReportErrorExt};
pub use crate::service::{Report, ReportService};

use modhub_kernel::prelude::*;
use modhub_user::USER_SERVICE;

pub const FEATURE: &str = "reports";

pub const REPORT_SERVICE: ServiceKey<ReportService> = ServiceKey::new("reports.service");

#[must_use]
pub fn descriptor() -> FeatureDescriptor {
    FeatureDescriptor::builder(FEATURE)
        .description("Activity reports for the signed-in user")
        .version(env!("CARGO_PKG_VERSION"))
        .tag("lazy")
        .depends_on(modhub_user::FEATURE)
        .loader(load)
}

pub fn register(registry: &FeatureRegistry) -> bool {
    registry.register(descriptor())
}

async fn load() -> Result<FeatureModule, BoxError> {
    Ok(FeatureModule::named(FEATURE).on_register(|container| {
        container.bind_singleton(REPORT_SERVICE, |c| Ok(ReportService::new(c.resolve(&USER_SERVICE)?)));
        Ok(())
    }))
}
