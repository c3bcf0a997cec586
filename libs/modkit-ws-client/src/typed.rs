//! Typed client construction.
//!
//! A wrapper type `T` is built from a raw [`ClientWebSocket`] by a constructor registered
//! explicitly at setup time ([`ClientConstructor<T>`]). [`TypedClientCache<T>`] turns that
//! registration into a [`ConstructionRecipe<T>`] on first use and keeps it for the lifetime
//! of the root provider; every later build reuses it.
//!
//! There is one cache per wrapper type, shared by every client name that produces `T`.

use crate::client::ClientWebSocket;
use crate::di::{ServiceError, ServiceProvider};
use crate::error::ConstructionError;
use std::fmt;
use std::sync::{Arc, OnceLock};

type ConstructorFn<T> =
    dyn Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync;

/// Setup-time registration of the function that builds `T` from a raw client.
///
/// The constructor is resolved from the root scope when the recipe is computed, so a
/// scoped registration behaves like a singleton here.
pub struct ClientConstructor<T> {
    build: Arc<ConstructorFn<T>>,
}

impl<T> ClientConstructor<T>
where
    T: Send + Sync + 'static,
{
    #[must_use]
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(build),
        }
    }
}

/// Memoized constructor for `T`.
pub struct ConstructionRecipe<T> {
    build: Arc<ConstructorFn<T>>,
}

impl<T> ConstructionRecipe<T>
where
    T: Send + Sync + 'static,
{
    /// Build a new `T` wrapping `client`.
    ///
    /// # Errors
    /// `UnresolvedDependency` if the constructor failed to resolve a service,
    /// `Failed` for any other constructor error.
    pub fn build(
        &self,
        services: &ServiceProvider,
        client: ClientWebSocket,
    ) -> Result<T, ConstructionError> {
        (self.build)(client, services).map_err(construction_error::<T>)
    }
}

impl<T> fmt::Debug for ConstructionRecipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionRecipe")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// Lazily computed, never invalidated recipe for `T`.
pub struct TypedClientCache<T> {
    recipe: OnceLock<Arc<ConstructionRecipe<T>>>,
}

impl<T> TypedClientCache<T>
where
    T: Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            recipe: OnceLock::new(),
        }
    }

    /// Return the recipe, computing it on first use.
    ///
    /// Racing first callers may each compute a recipe, but only the first one stored is
    /// retained and every caller receives that same `Arc`. A failed computation stores
    /// nothing.
    ///
    /// # Errors
    /// `NoConstructor` when no [`ClientConstructor<T>`] is registered.
    pub fn get_or_create_recipe(
        &self,
        services: &ServiceProvider,
    ) -> Result<Arc<ConstructionRecipe<T>>, ConstructionError> {
        if let Some(recipe) = self.recipe.get() {
            return Ok(recipe.clone());
        }

        let computed = Arc::new(Self::compute(services)?);
        Ok(self.recipe.get_or_init(|| computed).clone())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.recipe.get().is_some()
    }

    fn compute(services: &ServiceProvider) -> Result<ConstructionRecipe<T>, ConstructionError> {
        let type_name = std::any::type_name::<T>();
        // The recipe outlives any builder scope.
        let constructor = services
            .root_provider()
            .get::<ClientConstructor<T>>()
            .map_err(|err| match err {
                ServiceError::NotFound { .. } => ConstructionError::NoConstructor { type_name },
                other => ConstructionError::unresolved::<T>(other),
            })?;

        tracing::debug!(r#type = type_name, "Computed typed client construction recipe");
        Ok(ConstructionRecipe {
            build: constructor.build.clone(),
        })
    }
}

impl<T> Default for TypedClientCache<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `T` instances from raw clients using the shared cache.
pub struct TypedClientFactory<T> {
    cache: Arc<TypedClientCache<T>>,
    services: ServiceProvider,
}

impl<T> TypedClientFactory<T>
where
    T: Send + Sync + 'static,
{
    #[must_use]
    pub fn new(cache: Arc<TypedClientCache<T>>, services: ServiceProvider) -> Self {
        Self { cache, services }
    }

    /// Factory using the cache registered for `T` in `services`.
    ///
    /// # Errors
    /// `ServiceError::NotFound` when no typed client for `T` was registered.
    pub fn from_services(services: &ServiceProvider) -> Result<Self, ServiceError> {
        let cache = services.get::<TypedClientCache<T>>()?;
        Ok(Self::new(cache, services.clone()))
    }

    /// # Errors
    /// See [`TypedClientCache::get_or_create_recipe`] and [`ConstructionRecipe::build`].
    pub fn create_client(&self, client: ClientWebSocket) -> Result<T, ConstructionError> {
        let recipe = self.cache.get_or_create_recipe(&self.services)?;
        recipe.build(&self.services, client)
    }
}

/// Classify a constructor or factory failure for `T`.
pub(crate) fn construction_error<T: ?Sized + 'static>(err: anyhow::Error) -> ConstructionError {
    match err.downcast::<ServiceError>() {
        Ok(service) => ConstructionError::unresolved::<T>(service),
        Err(other) => ConstructionError::failed::<T>(other),
    }
}
