use crate::container::ContainerError;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Error type accepted from loaders, registration hooks and service factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reference-counted error, so one failure can be handed to every waiter unchanged.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Load-time failures of a feature.
///
/// Cloning is cheap and preserves identity of the wrapped sources: every caller waiting on the
/// same in-flight load receives a clone of one value.
#[modhub_derive::modhub_error]
#[derive(Clone)]
pub enum FeatureError {
    /// The name was never registered.
    #[error(
        "Unknown feature '{name}'{}: registered features are [{}]",
        format_context(.context),
        .registered.join(", ")
    )]
    UnknownFeature { name: String, registered: Vec<String>, context: Option<Cow<'static, str>> },

    /// The loader resolved to a module without a registration hook.
    #[error("Malformed feature module '{name}'{}: {message}", format_context(.context))]
    MalformedModule {
        name: String,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    /// A declared dependency failed; the dependent registered nothing.
    #[error(
        "Feature '{feature}' could not load dependency '{dependency}'{}: {cause}",
        format_context(.context)
    )]
    DependencyFailed {
        feature: String,
        dependency: String,
        #[source]
        cause: Arc<FeatureError>,
        context: Option<Cow<'static, str>>,
    },

    /// The loader future itself returned an error.
    #[error("Loader of feature '{name}' failed{}: {source}", format_context(.context))]
    LoaderFailed { name: String, source: SharedError, context: Option<Cow<'static, str>> },

    /// The registration hook returned an error. `source` is the hook's error object.
    #[error("Feature '{name}' failed to register its services{}: {source}", format_context(.context))]
    RegistrationFailed { name: String, source: SharedError, context: Option<Cow<'static, str>> },

    #[error("Circular dependency{}: {}", format_context(.context), .path.join(" -> "))]
    CircularDependency { path: Vec<String>, context: Option<Cow<'static, str>> },

    /// A caller gave up waiting. The load keeps running.
    #[error("Timed out after {after:?} waiting for feature '{name}'{}", format_context(.context))]
    Timeout { name: String, after: Duration, context: Option<Cow<'static, str>> },

    #[error("Container error{}: {source}", format_context(.context))]
    Container { source: ContainerError, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues, such as a panicking loader.
    #[error("Internal feature error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl FeatureError {
    /// Follows `DependencyFailed` links down to the failure that started the chain.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::DependencyFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Whether calling `ensure_loaded` again can reasonably succeed.
    ///
    /// Unknown names, malformed modules and dependency cycles are build errors and stay broken
    /// until the registry changes.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self.root_cause(),
            Self::UnknownFeature { .. } | Self::MalformedModule { .. } | Self::CircularDependency { .. }
        )
    }

    /// The feature the error is about, when there is one.
    #[must_use]
    pub fn feature(&self) -> Option<&str> {
        match self {
            Self::UnknownFeature { name, .. }
            | Self::MalformedModule { name, .. }
            | Self::LoaderFailed { name, .. }
            | Self::RegistrationFailed { name, .. }
            | Self::Timeout { name, .. } => Some(name),
            Self::DependencyFailed { feature, .. } => Some(feature),
            Self::CircularDependency { path, .. } => path.first().map(String::as_str),
            Self::Container { .. } | Self::Internal { .. } => None,
        }
    }
}
