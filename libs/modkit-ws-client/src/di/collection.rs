use super::options::{OptionsAction, OptionsStore};
use super::provider::{ServiceError, ServiceProvider};
use super::TypeKey;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type Boxed = Box<dyn Any + Send + Sync>;

/// Type-erased service factory; the returned box always holds an `Arc<T>`.
pub(crate) type ErasedFactory =
    Arc<dyn Fn(&ServiceProvider) -> Result<Boxed, ServiceError> + Send + Sync>;

/// How long a resolved service instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// One instance per root provider, created on first resolution.
    Singleton,
    /// One instance per scope.
    Scoped,
    /// A new instance for every resolution.
    Transient,
}

#[derive(Clone)]
pub(crate) struct ServiceDescriptor {
    pub(crate) lifetime: ServiceLifetime,
    pub(crate) factory: ErasedFactory,
    /// Pre-built instance (`Arc<T>` behind `Any`) for `add_instance` registrations.
    instance: Option<Arc<dyn Any + Send + Sync>>,
}

/// Setup-time registry of services and named options.
///
/// Registrations are keyed by the service type `T`, which may be a trait object.
/// `add_*` replaces an existing registration for the same type; `try_add_*` keeps it.
#[derive(Default)]
pub struct ServiceCollection {
    descriptors: HashMap<TypeKey, ServiceDescriptor>,
    options: OptionsStore,
}

impl ServiceCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lazily-created singleton under the service type `T`.
    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceLifetime::Singleton, erase(factory), None);
        self
    }

    /// Register a service created once per scope.
    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceLifetime::Scoped, erase(factory), None);
        self
    }

    /// Register a service created on every resolution.
    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        self.insert::<T>(ServiceLifetime::Transient, erase(factory), None);
        self
    }

    /// Register a pre-built singleton instance.
    pub fn add_instance<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let shared = instance.clone();
        let factory = erase::<T, _>(move |_: &ServiceProvider| Ok(shared.clone()));
        self.insert::<T>(ServiceLifetime::Singleton, factory, Some(Arc::new(instance)));
        self
    }

    /// Like [`Self::add_singleton`], but only when `T` is not registered yet.
    /// Returns `true` when the registration was added.
    pub fn try_add_singleton<T, F>(&mut self, factory: F) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        if self.contains::<T>() {
            return false;
        }
        self.add_singleton::<T, F>(factory);
        true
    }

    /// Like [`Self::add_transient`], but only when `T` is not registered yet.
    pub fn try_add_transient<T, F>(&mut self, factory: F) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
    {
        if self.contains::<T>() {
            return false;
        }
        self.add_transient::<T, F>(factory);
        true
    }

    /// Like [`Self::add_instance`], but only when `T` is not registered yet.
    pub fn try_add_instance<T>(&mut self, instance: Arc<T>) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.contains::<T>() {
            return false;
        }
        self.add_instance::<T>(instance);
        true
    }

    /// The pre-built instance registered for `T` through `add_instance`, if any.
    #[must_use]
    pub fn instance<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.descriptors
            .get(&TypeKey::of::<T>())
            .and_then(|d| d.instance.as_ref())
            .and_then(|any| any.downcast_ref::<Arc<T>>())
            .cloned()
    }

    #[must_use]
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.descriptors.contains_key(&TypeKey::of::<T>())
    }

    #[must_use]
    pub fn lifetime_of<T>(&self) -> Option<ServiceLifetime>
    where
        T: ?Sized + 'static,
    {
        self.descriptors
            .get(&TypeKey::of::<T>())
            .map(|d| d.lifetime)
    }

    /// Append an action to the named options `O` registered under `name`.
    pub fn configure_named<O, F>(&mut self, name: impl Into<Arc<str>>, action: F) -> &mut Self
    where
        O: Send + Sync + 'static,
        F: Fn(&mut O) + Send + Sync + 'static,
    {
        let action: OptionsAction<O> = Arc::new(action);
        self.options.append::<O>(name.into(), action);
        self
    }

    /// Number of option actions registered for `(O, name)`.
    #[must_use]
    pub fn named_options_count<O>(&self, name: &str) -> usize
    where
        O: Send + Sync + 'static,
    {
        self.options.count::<O>(name)
    }

    /// Number of registered service types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Freeze the collection into a root provider.
    #[must_use]
    pub fn build(self) -> ServiceProvider {
        tracing::debug!(services = self.descriptors.len(), "Building service provider");
        ServiceProvider::from_parts(self.descriptors, self.options)
    }

    fn insert<T>(
        &mut self,
        lifetime: ServiceLifetime,
        factory: ErasedFactory,
        instance: Option<Arc<dyn Any + Send + Sync>>,
    ) where
        T: ?Sized + 'static,
    {
        self.descriptors.insert(
            TypeKey::of::<T>(),
            ServiceDescriptor {
                lifetime,
                factory,
                instance,
            },
        );
    }
}

fn erase<T, F>(factory: F) -> ErasedFactory
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&ServiceProvider) -> Result<Arc<T>, ServiceError> + Send + Sync + 'static,
{
    Arc::new(move |sp: &ServiceProvider| factory(sp).map(|svc| Box::new(svc) as Boxed))
}
