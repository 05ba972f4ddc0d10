//! Feature registry, single-flight loader and service container.
//!
//! Features are registered as metadata plus a lazy loader. The [`FeatureManager`] loads them on
//! demand, dependencies first, and runs each feature's registration hook against a shared
//! [`Container`] exactly once per successful load.
//!
//! ```rust
//! use modhub_kernel::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), FeatureError> {
//! let registry = FeatureRegistry::new();
//! registry.register(
//!     FeatureDescriptor::builder("audit")
//!         .loader(|| async { Ok(FeatureModule::named("audit").on_register(|_| Ok(()))) }),
//! );
//! registry.register(
//!     FeatureDescriptor::builder("billing")
//!         .depends_on("audit")
//!         .loader(|| async { Ok(FeatureModule::named("billing").on_register(|_| Ok(()))) }),
//! );
//!
//! let manager = FeatureManager::new(registry, Container::new());
//! manager.ensure_loaded("billing").await?;
//! assert_eq!(manager.loaded(), ["audit", "billing"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Config loading
//! ```rust,no_run
//! use modhub_kernel::config::load_config;
//! use modhub_kernel::domain::config::AppConfig;
//!
//! let cfg: AppConfig = load_config(Some("config/modhub.toml")).unwrap();
//! ```
pub mod config;
pub mod container;
pub mod error;
pub mod feature;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod service;

pub use container::{Container, ContainerError, Scope, ServiceKey};
pub use error::{BoxError, FeatureError, FeatureErrorExt, SharedError};
pub use feature::{FeatureDescriptor, FeatureDescriptorBuilder, FeatureLoader, FeatureModule};
pub use manager::{FeatureEvent, FeatureManager};
pub use registry::FeatureRegistry;
pub use service::{ServiceHandle, ServiceState};

pub use modhub_domain as domain;
