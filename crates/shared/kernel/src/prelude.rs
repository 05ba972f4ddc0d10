pub use crate::container::{Container, ContainerError, ServiceKey};
pub use crate::error::{BoxError, FeatureError, FeatureErrorExt};
pub use crate::feature::{FeatureDescriptor, FeatureModule};
pub use crate::manager::{FeatureEvent, FeatureManager};
pub use crate::registry::FeatureRegistry;
pub use crate::service::{ServiceHandle, ServiceState};
pub use modhub_domain::metadata::{FeatureMetadata, FeatureStats, FeatureStatus};
