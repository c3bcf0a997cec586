//! Fluent configuration surface for one named client.

use crate::client::ClientWebSocket;
use crate::di::{ServiceCollection, ServiceError, ServiceProvider, TypeKey};
use crate::error::ClientFactoryError;
use crate::factory::{ClientWebSocketFactory, ClientWebSocketFactoryOptions, ConfigureAction};
use crate::registry::ClientMappingRegistry;
use crate::typed::{construction_error, TypedClientCache, TypedClientFactory};
use std::sync::Arc;

/// Builder returned by the registration entry points.
///
/// Every method registers state in the borrowed [`ServiceCollection`] under this
/// builder's name immediately; dropping the builder undoes nothing. Configuration
/// actions are appended, never replaced, so repeated registrations for one name
/// accumulate.
pub struct ClientWebSocketBuilder<'a> {
    services: &'a mut ServiceCollection,
    name: Arc<str>,
}

impl<'a> ClientWebSocketBuilder<'a> {
    pub(crate) fn new(services: &'a mut ServiceCollection, name: Arc<str>) -> Self {
        Self { services, name }
    }

    /// Client name this builder configures.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying collection, for registering collaborators alongside the client.
    pub fn services(&mut self) -> &mut ServiceCollection {
        self.services
    }

    /// Append an infallible configuration action.
    pub fn configure<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&mut ClientWebSocket) + Send + Sync + 'static,
    {
        self.push_action(ConfigureAction::plain(move |ws| {
            configure(ws);
            Ok(())
        }))
    }

    /// Append a configuration action whose failure aborts client creation.
    pub fn try_configure<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&mut ClientWebSocket) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push_action(ConfigureAction::plain(configure))
    }

    /// Append a configuration action that also receives the resolving provider.
    pub fn configure_with_services<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&ServiceProvider, &mut ClientWebSocket) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push_action(ConfigureAction::with_services(configure))
    }

    /// Build typed clients directly in the resolving provider instead of a child scope.
    pub fn suppress_builder_scope(&mut self, suppress: bool) -> &mut Self {
        self.services
            .configure_named::<ClientWebSocketFactoryOptions, _>(self.name.clone(), move |o| {
                o.suppress_builder_scope = suppress;
            });
        self
    }

    /// Register `T` as a transient typed client built through its registered constructor.
    ///
    /// Does not check the name against other typed registrations.
    ///
    /// # Errors
    /// Never fails today; the signature matches the validating registrations.
    pub fn add_typed_client<T>(&mut self) -> Result<&mut Self, ClientFactoryError>
    where
        T: Send + Sync + 'static,
    {
        self.add_typed_client_core::<T>(false)
    }

    /// Register `T` as a typed client, optionally claiming the name for `T`.
    ///
    /// # Errors
    /// `NameConflict` when `validate` is set and another type already claimed the name.
    pub fn add_typed_client_core<T>(
        &mut self,
        validate: bool,
    ) -> Result<&mut Self, ClientFactoryError>
    where
        T: Send + Sync + 'static,
    {
        self.reserve::<T>(validate)?;
        self.register_cache::<T>();
        tracing::debug!(
            client = %self.name,
            r#type = std::any::type_name::<T>(),
            validate,
            "Registered typed client"
        );

        let name = self.name.clone();
        self.services.add_transient::<T, _>(move |sp| {
            create_typed::<T>(sp, &name)
                .map(Arc::new)
                .map_err(|e| ServiceError::activation::<T>(e))
        });
        Ok(self)
    }

    /// Register the service type `T` (usually a trait object) built from the concrete `I`.
    ///
    /// `upcast` is typically `|client| client`.
    ///
    /// # Errors
    /// Never fails today; the signature matches the validating registrations.
    pub fn add_typed_client_as<T, I>(
        &mut self,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<&mut Self, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        self.add_typed_client_as_core::<T, I>(upcast, false)
    }

    /// # Errors
    /// `NameConflict` when `validate` is set and another type already claimed the name.
    pub fn add_typed_client_as_core<T, I>(
        &mut self,
        upcast: fn(Arc<I>) -> Arc<T>,
        validate: bool,
    ) -> Result<&mut Self, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        self.reserve::<T>(validate)?;
        self.register_cache::<I>();
        tracing::debug!(
            client = %self.name,
            r#type = std::any::type_name::<T>(),
            implementation = std::any::type_name::<I>(),
            validate,
            "Registered typed client"
        );

        let name = self.name.clone();
        self.services.add_transient::<T, _>(move |sp| {
            create_typed::<I>(sp, &name)
                .map(|client| upcast(Arc::new(client)))
                .map_err(|e| ServiceError::activation::<T>(e))
        });
        Ok(self)
    }

    /// Register `T` as a typed client built by `factory` from the raw client.
    ///
    /// The factory path bypasses the construction cache and never validates the name.
    ///
    /// # Errors
    /// Never fails today; the signature matches the validating registrations.
    pub fn add_typed_client_with<T, F>(
        &mut self,
        factory: F,
    ) -> Result<&mut Self, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> T + Send + Sync + 'static,
    {
        self.add_typed_client_with_services::<T, _>(move |client, _| Ok(factory(client)))
    }

    /// Like [`Self::add_typed_client_with`], with access to the ambient provider.
    ///
    /// # Errors
    /// Never fails today; the signature matches the validating registrations.
    pub fn add_typed_client_with_services<T, F>(
        &mut self,
        factory: F,
    ) -> Result<&mut Self, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.add_typed_client_with_services_as::<T, T, _>(factory, |client| client)
    }

    /// Register the service type `T` built by `factory` as the concrete `I`.
    ///
    /// # Errors
    /// Never fails today; the signature matches the validating registrations.
    pub fn add_typed_client_with_as<T, I, F>(
        &mut self,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<&mut Self, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> I + Send + Sync + 'static,
    {
        self.add_typed_client_with_services_as::<T, I, _>(
            move |client, _| Ok(factory(client)),
            upcast,
        )
    }

    /// Register the service type `T` built by a service-aware `factory` as the concrete `I`.
    ///
    /// The factory runs in the builder scope and never validates the name.
    ///
    /// # Errors
    /// Never fails today; the signature matches the validating registrations.
    pub fn add_typed_client_with_services_as<T, I, F>(
        &mut self,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<&mut Self, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<I> + Send + Sync + 'static,
    {
        self.reserve::<T>(false)?;
        tracing::debug!(
            client = %self.name,
            r#type = std::any::type_name::<T>(),
            implementation = std::any::type_name::<I>(),
            "Registered typed client factory"
        );

        let name = self.name.clone();
        self.services.add_transient::<T, _>(move |sp| {
            let build = || -> Result<I, ClientFactoryError> {
                let client = sp.get::<dyn ClientWebSocketFactory>()?.create_client(&name)?;
                let scope = builder_scope(sp, &name);
                factory(client, &scope)
                    .map_err(|e| ClientFactoryError::from(construction_error::<I>(e)))
            };
            build()
                .map(|client| upcast(Arc::new(client)))
                .map_err(|e| ServiceError::activation::<T>(e))
        });
        Ok(self)
    }

    fn push_action(&mut self, action: ConfigureAction) -> &mut Self {
        self.services
            .configure_named::<ClientWebSocketFactoryOptions, _>(self.name.clone(), move |o| {
                o.actions.push(action.clone());
            });
        self
    }

    fn reserve<T>(&mut self, validate: bool) -> Result<(), ClientFactoryError>
    where
        T: ?Sized + 'static,
    {
        mapping_registry(self.services).reserve(&self.name, TypeKey::of::<T>(), validate)
    }

    fn register_cache<T>(&mut self)
    where
        T: Send + Sync + 'static,
    {
        self.services
            .try_add_singleton::<TypedClientCache<T>, _>(|_| Ok(Arc::new(TypedClientCache::new())));
    }
}

impl std::fmt::Debug for ClientWebSocketBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientWebSocketBuilder")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry shared by every builder on this collection, installed on first use.
pub(crate) fn mapping_registry(services: &mut ServiceCollection) -> Arc<ClientMappingRegistry> {
    if let Some(registry) = services.instance::<ClientMappingRegistry>() {
        return registry;
    }
    let registry = Arc::new(ClientMappingRegistry::new());
    services.add_instance(registry.clone());
    registry
}

/// Provider in which typed clients for `name` are constructed.
fn builder_scope(sp: &ServiceProvider, name: &str) -> ServiceProvider {
    if sp
        .named_options::<ClientWebSocketFactoryOptions>(name)
        .suppress_builder_scope
    {
        return sp.clone();
    }
    let scope = sp.create_scope();
    tracing::debug!(
        client = name,
        scope = ?scope.scope_key(),
        "Created builder scope for typed client"
    );
    scope
}

fn create_typed<T>(sp: &ServiceProvider, name: &str) -> Result<T, ClientFactoryError>
where
    T: Send + Sync + 'static,
{
    let client = sp.get::<dyn ClientWebSocketFactory>()?.create_client(name)?;
    let scope = builder_scope(sp, name);
    let factory = TypedClientFactory::<T>::from_services(&scope)?;
    Ok(factory.create_client(client)?)
}
