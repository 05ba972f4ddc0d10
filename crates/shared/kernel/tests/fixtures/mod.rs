#![allow(dead_code)]

use modhub_kernel::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Counts loader and hook invocations and records the order hooks ran in.
#[derive(Debug, Default)]
pub struct Tracker {
    loads: AtomicUsize,
    registrations: AtomicUsize,
    journal: Mutex<Vec<String>>,
}

impl Tracker {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Features in the order their hooks ran.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
    }

    fn record_registration(&self, name: &str) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push(name.to_owned());
    }
}

/// What the loader waits on before resolving.
#[derive(Debug, Clone, Default)]
pub enum Pace {
    #[default]
    Instant,
    Delay(Duration),
    Gate(Arc<Notify>),
}

/// Feature whose loader and hook report to `tracker`.
pub fn tracked(name: &'static str, deps: &[&'static str], tracker: &Arc<Tracker>, pace: Pace) -> FeatureDescriptor {
    let tracker = Arc::clone(tracker);
    FeatureDescriptor::builder(name).dependencies(deps.iter().copied()).loader(move || {
        let tracker = Arc::clone(&tracker);
        let pace = pace.clone();
        async move {
            tracker.record_load();
            match pace {
                Pace::Instant => {},
                Pace::Delay(delay) => tokio::time::sleep(delay).await,
                Pace::Gate(gate) => gate.notified().await,
            }
            Ok::<_, BoxError>(FeatureModule::named(name).on_register(move |_| {
                tracker.record_registration(name);
                Ok(())
            }))
        }
    })
}

pub fn counted(name: &'static str, deps: &[&'static str], tracker: &Arc<Tracker>) -> FeatureDescriptor {
    tracked(name, deps, tracker, Pace::Instant)
}

/// Feature whose loader fails the first `failures` times it runs.
pub fn flaky(name: &'static str, failures: usize, tracker: &Arc<Tracker>) -> FeatureDescriptor {
    let tracker = Arc::clone(tracker);
    FeatureDescriptor::builder(name).loader(move || {
        let tracker = Arc::clone(&tracker);
        async move {
            tracker.record_load();
            tokio::time::sleep(Duration::from_millis(5)).await;
            if tracker.loads() <= failures {
                return Err::<FeatureModule, BoxError>(format!("{name} backend unavailable").into());
            }
            Ok(FeatureModule::named(name).on_register(move |_| {
                tracker.record_registration(name);
                Ok(())
            }))
        }
    })
}

/// Error returned by [`rejecting`] hooks.
#[derive(Debug, thiserror::Error)]
#[error("{0} refused to register")]
pub struct HookError(pub &'static str);

/// Feature whose registration hook fails.
pub fn rejecting(name: &'static str, delay: Duration) -> FeatureDescriptor {
    FeatureDescriptor::builder(name).loader(move || async move {
        tokio::time::sleep(delay).await;
        Ok::<_, BoxError>(
            FeatureModule::named(name).on_register(move |_| Err(HookError(name).into())),
        )
    })
}

/// Feature binding `greeting` under `key`.
pub fn greeter(name: &'static str, key: ServiceKey<String>, greeting: &'static str, pace: Pace) -> FeatureDescriptor {
    FeatureDescriptor::builder(name).loader(move || {
        let pace = pace.clone();
        async move {
            match pace {
                Pace::Instant => {},
                Pace::Delay(delay) => tokio::time::sleep(delay).await,
                Pace::Gate(gate) => gate.notified().await,
            }
            Ok::<_, BoxError>(FeatureModule::named(name).on_register(move |container| {
                container.bind_instance(key, greeting.to_owned());
                Ok(())
            }))
        }
    })
}

pub fn manager_with(descriptors: impl IntoIterator<Item = FeatureDescriptor>) -> FeatureManager {
    let registry = FeatureRegistry::new();
    for descriptor in descriptors {
        registry.register(descriptor);
    }
    FeatureManager::new(registry, Container::new())
}

/// Yields until `name` reaches `status`.
pub async fn wait_for_status(manager: &FeatureManager, name: &str, status: FeatureStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.status(name) != status {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("status not reached in time");
}
