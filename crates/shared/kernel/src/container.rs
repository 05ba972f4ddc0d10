//! Shared service container that features bind their services into.
//!
//! Bindings are keyed by name and never overwritten: binding an already-bound key is a no-op.
//! Singletons are created lazily on first resolve; factories receive the container so they can
//! resolve the services they depend on.

use crate::error::{BoxError, SharedError};
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

#[modhub_derive::modhub_error]
#[derive(Clone)]
pub enum ContainerError {
    #[error("Service '{key}' is not bound{}", format_context(.context))]
    NotBound { key: String, context: Option<Cow<'static, str>> },

    #[error("Service '{key}' holds `{found}`, requested `{expected}`{}", format_context(.context))]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
        context: Option<Cow<'static, str>>,
    },

    #[error("Factory of service '{key}' failed{}: {source}", format_context(.context))]
    Factory { key: String, source: SharedError, context: Option<Cow<'static, str>> },
}

/// Typed name of a service binding.
///
/// ```rust
/// use modhub_kernel::container::{Container, ServiceKey};
///
/// const GREETING: ServiceKey<String> = ServiceKey::new("demo.greeting");
///
/// let container = Container::new();
/// container.bind_instance(GREETING, "hello".to_owned());
/// assert_eq!(container.resolve(&GREETING).unwrap().as_str(), "hello");
/// ```
pub struct ServiceKey<T: ?Sized> {
    name: &'static str,
    _service: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> ServiceKey<T> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name, _service: PhantomData }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: ?Sized> Clone for ServiceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for ServiceKey<T> {}

impl<T: ?Sized> PartialEq for ServiceKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T: ?Sized> Eq for ServiceKey<T> {}

impl<T: ?Sized> fmt::Debug for ServiceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.name).finish()
    }
}

/// Lifetime of instances produced by a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One instance, created on first resolve and shared afterwards.
    Singleton,
    /// A fresh instance per resolve.
    Transient,
}

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Container) -> Result<Instance, BoxError> + Send + Sync>;

struct Binding {
    scope: Scope,
    type_name: &'static str,
    factory: Factory,
    instance: Mutex<Option<Instance>>,
}

impl Binding {
    fn create(&self, key: &str, container: &Container) -> Result<Instance, ContainerError> {
        (self.factory)(container).map_err(|source| ContainerError::Factory {
            key: key.to_owned(),
            source: source.into(),
            context: None,
        })
    }

    fn instance(&self, key: &str, container: &Container) -> Result<Instance, ContainerError> {
        if self.scope == Scope::Transient {
            return self.create(key, container);
        }

        let cached = self.instance.lock().clone();
        if let Some(instance) = cached {
            return Ok(instance);
        }

        // The factory runs unlocked so it may resolve other keys. Racing creators keep the
        // first stored instance.
        let created = self.create(key, container)?;
        trace!(service = key, "Singleton created");
        Ok(Arc::clone(self.instance.lock().get_or_insert(created)))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("scope", &self.scope)
            .field("type_name", &self.type_name)
            .field("created", &self.instance.lock().is_some())
            .finish_non_exhaustive()
    }
}

/// Cloneable handle to a shared set of service bindings.
#[derive(Debug, Clone, Default)]
pub struct Container {
    bindings: Arc<RwLock<FxHashMap<String, Arc<Binding>>>>,
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a lazily created singleton. Returns `false` and keeps the existing binding if the
    /// key is already bound.
    pub fn bind_singleton<T, F>(&self, key: ServiceKey<T>, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&Self) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.bind(key, Scope::Singleton, factory)
    }

    /// Binds a factory invoked on every resolve. Same idempotency rules as
    /// [`Container::bind_singleton`].
    pub fn bind_transient<T, F>(&self, key: ServiceKey<T>, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&Self) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.bind(key, Scope::Transient, factory)
    }

    /// Binds an already constructed singleton.
    pub fn bind_instance<T>(&self, key: ServiceKey<T>, value: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        let instance: Instance = Arc::new(value);
        let binding = Binding {
            scope: Scope::Singleton,
            type_name: type_name::<T>(),
            factory: Arc::new(|_: &Self| -> Result<Instance, BoxError> {
                Err("instance bindings have no factory".into())
            }),
            instance: Mutex::new(Some(instance)),
        };
        self.insert(key.name(), binding)
    }

    fn bind<T, F>(&self, key: ServiceKey<T>, scope: Scope, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&Self) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |container: &Self| {
            factory(container).map(|service| Arc::new(service) as Instance)
        });
        let binding =
            Binding { scope, type_name: type_name::<T>(), factory, instance: Mutex::new(None) };
        self.insert(key.name(), binding)
    }

    fn insert(&self, key: &str, binding: Binding) -> bool {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(key) {
            debug!(service = key, "Service already bound, keeping the existing binding");
            return false;
        }
        trace!(service = key, scope = ?binding.scope, ty = binding.type_name, "Service bound");
        bindings.insert(key.to_owned(), Arc::new(binding));
        true
    }

    #[must_use]
    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.read().contains_key(key)
    }

    /// Returns the service bound under `key`, creating it if needed.
    ///
    /// # Errors
    /// [`ContainerError::NotBound`] for unknown keys, [`ContainerError::TypeMismatch`] if the
    /// binding holds another type, [`ContainerError::Factory`] if creation failed.
    pub fn resolve<T>(&self, key: &ServiceKey<T>) -> Result<Arc<T>, ContainerError>
    where
        T: Send + Sync + 'static,
    {
        let name = key.name();
        let binding = self.bindings.read().get(name).cloned().ok_or_else(|| {
            ContainerError::NotBound { key: name.to_owned(), context: None }
        })?;

        binding.instance(name, self)?.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            key: name.to_owned(),
            expected: type_name::<T>(),
            found: binding.type_name,
            context: None,
        })
    }

    /// Bound keys in lexical order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.bindings.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }
}
