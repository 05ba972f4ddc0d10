//! Feature descriptors: metadata plus a lazy loader resolving to a [`FeatureModule`].

use crate::container::Container;
use crate::error::BoxError;
use futures::future::{BoxFuture, FutureExt};
use modhub_domain::metadata::FeatureMetadata;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a [`FeatureLoader`].
pub type LoadFuture = BoxFuture<'static, Result<FeatureModule, BoxError>>;

type RegisterFn = Arc<dyn Fn(&Container) -> Result<(), BoxError> + Send + Sync>;

/// What a loader resolves to: a name for diagnostics and the hook binding the feature's services.
#[derive(Clone)]
pub struct FeatureModule {
    name: Cow<'static, str>,
    register: Option<RegisterFn>,
}

impl FeatureModule {
    /// Starts a module without a registration hook; attach one with [`FeatureModule::on_register`].
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into(), register: None }
    }

    /// Sets the synchronous hook that binds the feature's services into the container.
    #[must_use]
    pub fn on_register<F>(mut self, register: F) -> Self
    where
        F: Fn(&Container) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.register = Some(Arc::new(register));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn has_register(&self) -> bool {
        self.register.is_some()
    }

    pub(crate) fn register_hook(&self) -> Option<&RegisterFn> {
        self.register.as_ref()
    }
}

impl fmt::Debug for FeatureModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureModule")
            .field("name", &self.name)
            .field("has_register", &self.has_register())
            .finish()
    }
}

/// Zero-argument async factory producing a [`FeatureModule`].
///
/// Clones share the same underlying closure; [`FeatureLoader::ptr_eq`] tells them apart from
/// independently created loaders.
#[derive(Clone)]
pub struct FeatureLoader(Arc<dyn Fn() -> LoadFuture + Send + Sync>);

impl FeatureLoader {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FeatureModule, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move || loader().boxed()))
    }

    #[must_use]
    pub fn load(&self) -> LoadFuture {
        (self.0)()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FeatureLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FeatureLoader(..)")
    }
}

/// Registry entry for a feature.
#[derive(Debug, Clone)]
pub struct FeatureDescriptor {
    metadata: FeatureMetadata,
    loader: FeatureLoader,
}

impl FeatureDescriptor {
    /// Starts a descriptor for `name`; the builder is finished by supplying the loader.
    ///
    /// ```rust
    /// use modhub_kernel::feature::{FeatureDescriptor, FeatureModule};
    ///
    /// let descriptor = FeatureDescriptor::builder("user")
    ///     .description("Profiles of signed-in users")
    ///     .tags(["core"])
    ///     .depends_on("auth")
    ///     .loader(|| async { Ok(FeatureModule::named("user").on_register(|_| Ok(()))) });
    ///
    /// assert_eq!(descriptor.dependencies(), ["auth"]);
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> FeatureDescriptorBuilder {
        FeatureDescriptorBuilder { metadata: FeatureMetadata::new(name) }
    }

    #[must_use]
    pub fn from_parts(metadata: FeatureMetadata, loader: FeatureLoader) -> Self {
        Self { metadata, loader }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub const fn metadata(&self) -> &FeatureMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.metadata.dependencies
    }

    #[must_use]
    pub const fn loader(&self) -> &FeatureLoader {
        &self.loader
    }
}

#[must_use = "a descriptor is only produced once a loader is supplied"]
#[derive(Debug)]
pub struct FeatureDescriptorBuilder {
    metadata: FeatureMetadata,
}

impl FeatureDescriptorBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = Some(version.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Appends a dependency. Duplicates are dropped; order of first mention is kept.
    pub fn depends_on(mut self, feature: impl Into<String>) -> Self {
        let feature = feature.into();
        if !self.metadata.depends_on(&feature) {
            self.metadata.dependencies.push(feature);
        }
        self
    }

    pub fn dependencies<I, S>(self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        features.into_iter().fold(self, |builder, feature| builder.depends_on(feature))
    }

    pub fn loader<F, Fut>(self, loader: F) -> FeatureDescriptor
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FeatureModule, BoxError>> + Send + 'static,
    {
        self.with_loader(FeatureLoader::new(loader))
    }

    pub fn with_loader(self, loader: FeatureLoader) -> FeatureDescriptor {
        FeatureDescriptor { metadata: self.metadata, loader }
    }
}
