use super::collection::{Boxed, ServiceDescriptor, ServiceLifetime};
use super::options::OptionsStore;
use super::TypeKey;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Resolution scope: the root provider or one of its children.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct ScopeKey(Option<u64>);

impl ScopeKey {
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        ScopeKey(None)
    }

    #[inline]
    fn child(id: u64) -> Self {
        ScopeKey(Some(id))
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("root"),
            Some(id) => write!(f, "scope-{id}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service not found: type={type_key:?}, scope={scope:?}")]
    NotFound { type_key: TypeKey, scope: ScopeKey },

    #[error("type mismatch in provider for type={type_key:?}")]
    TypeMismatch { type_key: TypeKey },

    #[error("failed to activate service type={type_key:?}: {source}")]
    Activation {
        type_key: TypeKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ServiceError {
    /// Activation failure of the service registered for `T`.
    pub fn activation<T>(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self
    where
        T: ?Sized + 'static,
    {
        Self::Activation {
            type_key: TypeKey::of::<T>(),
            source: source.into(),
        }
    }
}

type InstanceMap = Mutex<HashMap<TypeKey, Boxed>>;

struct RootState {
    descriptors: HashMap<TypeKey, ServiceDescriptor>,
    options: OptionsStore,
    // Value is an `Arc<O>` for the key's options type.
    options_cache: DashMap<(TypeKey, Arc<str>), Boxed>,
    singletons: InstanceMap,
    root_scope: Arc<ScopeState>,
    next_scope: AtomicU64,
}

struct ScopeState {
    key: ScopeKey,
    instances: InstanceMap,
}

/// Resolves services registered in a [`super::ServiceCollection`].
///
/// Cloning is cheap; clones share the same scope. Child scopes share singletons
/// with the root and own their scoped instances.
#[derive(Clone)]
pub struct ServiceProvider {
    root: Arc<RootState>,
    scope: Arc<ScopeState>,
}

impl ServiceProvider {
    pub(crate) fn from_parts(
        descriptors: HashMap<TypeKey, ServiceDescriptor>,
        options: OptionsStore,
    ) -> Self {
        let root_scope = Arc::new(ScopeState {
            key: ScopeKey::root(),
            instances: Mutex::new(HashMap::new()),
        });
        Self {
            root: Arc::new(RootState {
                descriptors,
                options,
                options_cache: DashMap::new(),
                singletons: Mutex::new(HashMap::new()),
                root_scope: root_scope.clone(),
                next_scope: AtomicU64::new(1),
            }),
            scope: root_scope,
        }
    }

    /// Resolve the service registered for `T`.
    ///
    /// # Errors
    /// `NotFound` when `T` was never registered, `Activation` when its factory
    /// failed, `TypeMismatch` if a factory produced a value of the wrong type.
    pub fn get<T>(&self) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_key = TypeKey::of::<T>();
        let descriptor =
            self.root
                .descriptors
                .get(&type_key)
                .ok_or(ServiceError::NotFound {
                    type_key,
                    scope: self.scope.key,
                })?;

        match descriptor.lifetime {
            ServiceLifetime::Transient => {
                let created = (descriptor.factory)(self)?;
                downcast::<T>(&created, type_key)
            }
            ServiceLifetime::Singleton => {
                self.get_cached::<T>(&self.root.singletons, descriptor, type_key)
            }
            ServiceLifetime::Scoped => {
                self.get_cached::<T>(&self.scope.instances, descriptor, type_key)
            }
        }
    }

    #[must_use]
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.root.descriptors.contains_key(&TypeKey::of::<T>())
    }

    /// Create a child scope with its own scoped instances.
    #[must_use]
    pub fn create_scope(&self) -> ServiceProvider {
        let id = self.root.next_scope.fetch_add(1, Ordering::Relaxed);
        ServiceProvider {
            root: self.root.clone(),
            scope: Arc::new(ScopeState {
                key: ScopeKey::child(id),
                instances: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn scope_key(&self) -> ScopeKey {
        self.scope.key
    }

    /// Provider for the root scope this provider was created from.
    #[must_use]
    pub fn root_provider(&self) -> ServiceProvider {
        ServiceProvider {
            root: self.root.clone(),
            scope: self.root.root_scope.clone(),
        }
    }

    /// Named options `O` for `name`: `O::default()` with every registered action
    /// applied in order.
    ///
    /// Computed once per `(O, name)` that has registered actions. Names without
    /// actions get a fresh default each call and are not retained.
    #[must_use]
    pub fn named_options<O>(&self, name: &str) -> Arc<O>
    where
        O: Default + Send + Sync + 'static,
    {
        if self.root.options.count::<O>(name) == 0 {
            return Arc::new(O::default());
        }

        let key = (TypeKey::of::<O>(), Arc::<str>::from(name));
        if let Some(hit) = self.root.options_cache.get(&key) {
            if let Some(options) = hit.downcast_ref::<Arc<O>>() {
                return options.clone();
            }
        }

        let built = Arc::new(self.root.options.resolve::<O>(name));
        let stored = self
            .root
            .options_cache
            .entry(key)
            .or_insert_with(|| Box::new(built.clone()) as Boxed);
        stored.downcast_ref::<Arc<O>>().cloned().unwrap_or(built)
    }

    /// Returns the cached instance for `type_key`, creating it outside the lock.
    /// Racing creators agree on the first stored instance.
    fn get_cached<T>(
        &self,
        cache: &InstanceMap,
        descriptor: &ServiceDescriptor,
        type_key: TypeKey,
    ) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        {
            let guard = cache.lock();
            if let Some(existing) = guard.get(&type_key) {
                return downcast::<T>(existing, type_key);
            }
        }

        let created = (descriptor.factory)(self)?;
        let mut guard = cache.lock();
        let stored = guard.entry(type_key).or_insert(created);
        downcast::<T>(stored, type_key)
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("scope", &self.scope.key)
            .field("services", &self.root.descriptors.len())
            .finish_non_exhaustive()
    }
}

fn downcast<T>(boxed: &Boxed, type_key: TypeKey) -> Result<Arc<T>, ServiceError>
where
    T: ?Sized + Send + Sync + 'static,
{
    boxed
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(ServiceError::TypeMismatch { type_key })
}
