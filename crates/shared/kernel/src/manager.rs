//! Single-flight feature loading.
//!
//! [`FeatureManager`] is the only component that moves a feature from registered to loaded. Each
//! load attempt (an *episode*) runs as its own tokio task and is shared with every caller through
//! a [`Shared`] future stored in the `loading` map. The entry is inserted under the state lock
//! before anyone awaits it, and is retired by the episode task, or by the first waiter to see the
//! task cancelled, so:
//!
//! * concurrent callers for one feature run its loader and hook at most once per episode and all
//!   observe the same outcome;
//! * a feature enters `loaded` only after every dependency is in `loaded`;
//! * a failed episode leaves no trace, and the next call starts a fresh one.

use crate::container::{Container, ServiceKey};
use crate::error::FeatureError;
use crate::registry::FeatureRegistry;
use crate::service::ServiceHandle;
use futures::future::{self, BoxFuture, FutureExt, Shared, TryFutureExt};
use fxhash::{FxHashMap, FxHashSet};
use modhub_domain::metadata::{FeatureMetadata, FeatureStats, FeatureStatus};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace};

const DEFAULT_EVENT_CAPACITY: usize = 64;

type LoadResult = Result<(), FeatureError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Lifecycle notifications published by the manager.
#[derive(Debug, Clone)]
pub enum FeatureEvent {
    Loading { name: String },
    Loaded { name: String, elapsed: Duration },
    Failed { name: String, error: FeatureError },
}

impl FeatureEvent {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Loading { name } | Self::Loaded { name, .. } | Self::Failed { name, .. } => name,
        }
    }
}

struct InFlight {
    episode: u64,
    load: SharedLoad,
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight").field("episode", &self.episode).finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct LoadState {
    /// Completion order.
    loaded: Vec<String>,
    loaded_set: FxHashSet<String>,
    loading: FxHashMap<String, InFlight>,
}

impl LoadState {
    fn is_loaded(&self, name: &str) -> bool {
        self.loaded_set.contains(name)
    }

    fn mark_loaded(&mut self, name: &str) {
        if self.loaded_set.insert(name.to_owned()) {
            self.loaded.push(name.to_owned());
        }
    }
}

#[derive(Debug)]
struct ManagerInner {
    registry: FeatureRegistry,
    container: Container,
    state: Mutex<LoadState>,
    episodes: AtomicU64,
    events: broadcast::Sender<FeatureEvent>,
}

/// Cloneable handle that loads registered features into a shared [`Container`].
///
/// Loading spawns tasks, so the async methods must run inside a tokio runtime.
///
/// ```rust
/// use modhub_kernel::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), FeatureError> {
/// const GREETING: ServiceKey<String> = ServiceKey::new("hello.greeting");
///
/// let registry = FeatureRegistry::new();
/// registry.register(FeatureDescriptor::builder("hello").loader(|| async {
///     Ok(FeatureModule::named("hello").on_register(|container| {
///         container.bind_instance(GREETING, "hi".to_owned());
///         Ok(())
///     }))
/// }));
///
/// let manager = FeatureManager::new(registry, Container::new());
/// let greeting = manager.resolve("hello", GREETING).await?;
/// assert_eq!(greeting.as_str(), "hi");
/// assert!(manager.is_loaded("hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FeatureManager {
    inner: Arc<ManagerInner>,
}

impl FeatureManager {
    #[must_use]
    pub fn new(registry: FeatureRegistry, container: Container) -> Self {
        Self::with_event_capacity(registry, container, DEFAULT_EVENT_CAPACITY)
    }

    /// Like [`FeatureManager::new`] with a custom buffer for lifecycle events.
    #[must_use]
    pub fn with_event_capacity(
        registry: FeatureRegistry,
        container: Container,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(ManagerInner {
                registry,
                container,
                state: Mutex::new(LoadState::default()),
                episodes: AtomicU64::new(0),
                events,
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &FeatureRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// Makes sure `name` and its dependencies are loaded.
    ///
    /// Returns immediately for loaded features and joins the in-flight episode if one exists.
    ///
    /// # Errors
    /// Any [`FeatureError`] produced by the episode; concurrent callers receive clones of the
    /// same error.
    pub async fn ensure_loaded(&self, name: &str) -> Result<(), FeatureError> {
        self.acquire(name).await
    }

    /// [`FeatureManager::ensure_loaded`] with an upper bound on the wait.
    ///
    /// # Errors
    /// [`FeatureError::Timeout`] when `limit` elapses first. The episode is not cancelled and
    /// may still complete.
    pub async fn ensure_loaded_within(&self, name: &str, limit: Duration) -> Result<(), FeatureError> {
        tokio::time::timeout(limit, self.acquire(name)).await.unwrap_or_else(|_| {
            Err(FeatureError::Timeout { name: name.to_owned(), after: limit, context: None })
        })
    }

    /// Loads several features concurrently.
    ///
    /// All loads are started before the first one is awaited; the call fails as soon as any of
    /// them fails, while the others keep running to completion in the background.
    ///
    /// # Errors
    /// The first [`FeatureError`] observed.
    pub async fn preload<I, S>(&self, names: I) -> Result<(), FeatureError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let loads: Vec<_> = names.into_iter().map(|name| self.acquire(name.as_ref())).collect();
        future::try_join_all(loads).await.map(|_| ())
    }

    /// Loads `feature`, then looks up `key` in the container.
    ///
    /// # Errors
    /// The load error, or [`FeatureError::Container`] if the feature did not bind `key`.
    pub async fn resolve<T>(&self, feature: &str, key: ServiceKey<T>) -> Result<Arc<T>, FeatureError>
    where
        T: Send + Sync + 'static,
    {
        self.ensure_loaded(feature).await?;
        Ok(self.inner.container.resolve(&key)?)
    }

    /// Starts watching the service `key` of `feature`; see [`ServiceHandle`].
    #[must_use]
    pub fn watch_service<T>(&self, feature: impl Into<String>, key: ServiceKey<T>) -> ServiceHandle<T>
    where
        T: Send + Sync + 'static,
    {
        ServiceHandle::spawn(self.clone(), feature.into(), key)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FeatureEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.inner.state.lock().is_loaded(name)
    }

    #[must_use]
    pub fn status(&self, name: &str) -> FeatureStatus {
        {
            let state = self.inner.state.lock();
            if state.is_loaded(name) {
                return FeatureStatus::Loaded;
            }
            if state.loading.contains_key(name) {
                return FeatureStatus::Loading;
            }
        }
        if self.inner.registry.has(name) { FeatureStatus::Registered } else { FeatureStatus::Unknown }
    }

    /// Loaded features in completion order.
    #[must_use]
    pub fn loaded(&self) -> Vec<String> {
        self.inner.state.lock().loaded.clone()
    }

    #[must_use]
    pub fn registered(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<FeatureMetadata> {
        self.inner.registry.get(name).map(|descriptor| descriptor.metadata().clone())
    }

    #[must_use]
    pub fn stats(&self) -> FeatureStats {
        let registered = self.inner.registry.names();
        let state = self.inner.state.lock();
        let mut loading: Vec<String> = state.loading.keys().cloned().collect();
        loading.sort_unstable();
        FeatureStats { registered, loaded: state.loaded.clone(), loading }
    }

    /// Forgets loaded and in-flight features. Intended for test isolation; bindings already
    /// made in the container stay.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.loaded.clear();
        state.loaded_set.clear();
        state.loading.clear();
    }

    /// Returns a future for the current outcome of `name`, starting an episode if needed.
    fn acquire(&self, name: &str) -> BoxFuture<'static, LoadResult> {
        let mut state = self.inner.state.lock();

        if state.is_loaded(name) {
            trace!(feature = name, "Feature already loaded");
            return future::ready(Ok(())).boxed();
        }

        if let Some(in_flight) = state.loading.get(name) {
            debug!(feature = name, episode = in_flight.episode, "Joining in-flight load");
            return in_flight.load.clone().boxed();
        }

        let episode = self.inner.episodes.fetch_add(1, Ordering::Relaxed);
        // Spawned while the lock is held: the task cannot settle before its entry exists.
        let task = tokio::spawn(self.clone().run_episode(name.to_owned(), episode));
        let feature = name.to_owned();
        let owner = Arc::downgrade(&self.inner);
        let load = task
            .unwrap_or_else(move |join_error| {
                // The task never reached `settle`, e.g. its runtime shut down.
                if let Some(inner) = owner.upgrade() {
                    Self { inner }.settle(&feature, episode, false);
                }
                error!(feature = %feature, episode, error = %join_error, "Load task was cancelled");
                Err(FeatureError::Internal {
                    message: format!("load task of '{feature}' was cancelled: {join_error}").into(),
                    context: None,
                })
            })
            .boxed()
            .shared();

        state.loading.insert(name.to_owned(), InFlight { episode, load: load.clone() });
        drop(state);

        load.boxed()
    }

    fn run_episode(self, name: String, episode: u64) -> BoxFuture<'static, LoadResult> {
        async move {
            let _ = self.inner.events.send(FeatureEvent::Loading { name: name.clone() });
            debug!(feature = %name, episode, "Loading feature");
            let started = Instant::now();

            let outcome = AssertUnwindSafe(self.load_feature(&name))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(FeatureError::Internal {
                        message: format!("load of '{name}' panicked: {}", panic_message(&*panic))
                            .into(),
                        context: None,
                    })
                });

            self.settle(&name, episode, outcome.is_ok());

            let event = match &outcome {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    info!(feature = %name, elapsed_ms = elapsed.as_millis(), "Feature loaded");
                    FeatureEvent::Loaded { name, elapsed }
                },
                Err(err) => {
                    error!(feature = %name, error = %err, "Feature failed to load");
                    FeatureEvent::Failed { name, error: err.clone() }
                },
            };
            let _ = self.inner.events.send(event);

            outcome
        }
        .boxed()
    }

    async fn load_feature(&self, name: &str) -> LoadResult {
        let registry = &self.inner.registry;
        let descriptor = registry.get(name).ok_or_else(|| FeatureError::UnknownFeature {
            name: name.to_owned(),
            registered: registry.names(),
            context: None,
        })?;

        if let Some(path) = registry.find_cycle(name) {
            return Err(FeatureError::CircularDependency { path, context: None });
        }

        let dependencies = descriptor.dependencies();
        if !dependencies.is_empty() {
            trace!(feature = name, ?dependencies, "Resolving dependencies");
            let loads = dependencies.iter().map(|dependency| {
                let dependency = dependency.clone();
                self.acquire(&dependency).map_err(move |cause| FeatureError::DependencyFailed {
                    feature: name.to_owned(),
                    dependency,
                    cause: Arc::new(cause),
                    context: None,
                })
            });
            future::try_join_all(loads).await?;
        }

        let module = descriptor.loader().load().await.map_err(|source| {
            FeatureError::LoaderFailed { name: name.to_owned(), source: source.into(), context: None }
        })?;

        let register = module.register_hook().ok_or_else(|| FeatureError::MalformedModule {
            name: name.to_owned(),
            message: format!("module '{}' has no registration hook", module.name()).into(),
            context: None,
        })?;

        register(&self.inner.container).map_err(|source| FeatureError::RegistrationFailed {
            name: name.to_owned(),
            source: source.into(),
            context: None,
        })
    }

    /// Retires the episode's `loading` entry, marking the feature loaded on success. Outcomes of
    /// episodes discarded by [`FeatureManager::reset`] are dropped.
    fn settle(&self, name: &str, episode: u64, succeeded: bool) {
        let mut state = self.inner.state.lock();
        if state.loading.get(name).is_none_or(|in_flight| in_flight.episode != episode) {
            debug!(feature = name, episode, "Discarding outcome of a reset episode");
            return;
        }
        state.loading.remove(name);
        if succeeded {
            state.mark_loaded(name);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
