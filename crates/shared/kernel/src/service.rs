//! Consumer-side view of a lazily loaded service.
//!
//! A [`ServiceHandle`] asks the manager to load a feature, resolves one of its services and
//! publishes the outcome through a `watch` channel. Pointing the handle at another feature or key
//! supersedes the pending resolution: a late result of a previous target is never published.

use crate::container::ServiceKey;
use crate::error::FeatureError;
use crate::manager::FeatureManager;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Current outcome observed by a [`ServiceHandle`].
pub enum ServiceState<T> {
    Loading,
    Ready(Arc<T>),
    Failed(FeatureError),
}

impl<T> ServiceState<T> {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    #[must_use]
    pub const fn service(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready(service) => Some(service),
            _ => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&FeatureError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> Clone for ServiceState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loading => Self::Loading,
            Self::Ready(service) => Self::Ready(Arc::clone(service)),
            Self::Failed(err) => Self::Failed(err.clone()),
        }
    }
}

impl<T> fmt::Debug for ServiceState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading"),
            Self::Ready(_) => f.write_str("Ready(..)"),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Watches one service of one feature.
///
/// Created by [`FeatureManager::watch_service`]; requires a tokio runtime. Dropping the handle
/// stops publishing but never cancels the feature load itself.
pub struct ServiceHandle<T: Send + Sync + 'static> {
    manager: FeatureManager,
    feature: String,
    key: ServiceKey<T>,
    sender: Arc<watch::Sender<ServiceState<T>>>,
    receiver: watch::Receiver<ServiceState<T>>,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> ServiceHandle<T> {
    pub(crate) fn spawn(manager: FeatureManager, feature: String, key: ServiceKey<T>) -> Self {
        let (sender, receiver) = watch::channel(ServiceState::Loading);
        let mut handle = Self {
            manager,
            feature,
            key,
            sender: Arc::new(sender),
            receiver,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        };
        handle.start();
        handle
    }

    fn start(&mut self) {
        let generation = self.generation.load(Ordering::Acquire);
        let current = Arc::clone(&self.generation);
        let sender = Arc::clone(&self.sender);
        let manager = self.manager.clone();
        let feature = self.feature.clone();
        let key = self.key;

        self.task = Some(tokio::spawn(async move {
            let next = match manager.resolve(&feature, key).await {
                Ok(service) => ServiceState::Ready(service),
                Err(err) => ServiceState::Failed(err),
            };
            sender.send_if_modified(|slot| {
                if current.load(Ordering::Acquire) != generation {
                    trace!(feature = %feature, service = key.name(), "Dropping superseded result");
                    return false;
                }
                *slot = next;
                true
            });
        }));
    }

    fn supersede(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Points the handle at another feature or service and starts over from `Loading`.
    ///
    /// Returns `false` without doing anything if the target is unchanged.
    pub fn retarget(&mut self, feature: impl Into<String>, key: ServiceKey<T>) -> bool {
        let feature = feature.into();
        if feature == self.feature && key == self.key {
            return false;
        }

        self.supersede();
        self.sender.send_replace(ServiceState::Loading);
        self.feature = feature;
        self.key = key;
        self.start();
        true
    }

    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    #[must_use]
    pub const fn key(&self) -> ServiceKey<T> {
        self.key
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> ServiceState<T> {
        self.receiver.borrow().clone()
    }

    /// A receiver for observers that outlive a borrow of the handle.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ServiceState<T>> {
        self.sender.subscribe()
    }

    /// Waits for the next published state and returns it.
    pub async fn changed(&mut self) -> ServiceState<T> {
        // The handle owns the sender, so the channel cannot close while `self` is borrowed.
        let _ = self.receiver.changed().await;
        self.receiver.borrow_and_update().clone()
    }

    /// Waits until the current target settles.
    ///
    /// # Errors
    /// The [`FeatureError`] the target failed with.
    pub async fn ready(&mut self) -> Result<Arc<T>, FeatureError> {
        let settled = self
            .receiver
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| (*state).clone())
            .map_err(|_| FeatureError::from("service state channel closed"))?;

        match settled {
            ServiceState::Ready(service) => Ok(service),
            ServiceState::Failed(err) => Err(err),
            ServiceState::Loading => Err("service state settled as loading".into()),
        }
    }
}

impl<T: Send + Sync + 'static> Drop for ServiceHandle<T> {
    fn drop(&mut self) {
        self.supersede();
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ServiceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("feature", &self.feature)
            .field("key", &self.key)
            .field("state", &*self.receiver.borrow())
            .finish_non_exhaustive()
    }
}
