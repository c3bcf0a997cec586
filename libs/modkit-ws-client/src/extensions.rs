//! Registration entry points on [`ServiceCollection`].

use crate::builder::{mapping_registry, ClientWebSocketBuilder};
use crate::client::ClientWebSocket;
use crate::config::ClientWebSocketsConfig;
use crate::di::{ServiceCollection, ServiceProvider, TypeKey};
use crate::error::ClientFactoryError;
use crate::factory::{ClientWebSocketFactory, DefaultClientWebSocketFactory};
use crate::typed::ClientConstructor;
use std::sync::Arc;

/// Name used by the unnamed raw client registration.
pub const DEFAULT_CLIENT_NAME: &str = "";

/// WebSocket client registration for [`ServiceCollection`].
///
/// Unnamed typed registrations derive the client name from the short type name
/// (`my_app::SearchClient` becomes `"SearchClient"`) and claim that name for the type;
/// a second type with the same short name is rejected at setup time. Explicitly named
/// registrations skip that check.
pub trait ClientWebSocketServiceCollectionExt {
    /// Install the factory infrastructure. Safe to call any number of times.
    fn add_client_websocket(&mut self) -> &mut Self;

    /// Start configuring the raw client `name`.
    fn add_named_client_websocket(
        &mut self,
        name: impl Into<Arc<str>>,
    ) -> ClientWebSocketBuilder<'_>;

    /// [`Self::add_named_client_websocket`] with an initial configuration action.
    fn add_named_client_websocket_with<F>(
        &mut self,
        name: impl Into<Arc<str>>,
        configure: F,
    ) -> ClientWebSocketBuilder<'_>
    where
        F: Fn(&mut ClientWebSocket) + Send + Sync + 'static;

    /// Typed client `T` under its short type name.
    ///
    /// # Errors
    /// `NameConflict` when another type already claimed the derived name.
    fn add_typed_client_websocket<T>(
        &mut self,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static;

    /// Typed client `T` under an explicit name.
    ///
    /// # Errors
    /// Does not fail today; kept fallible like the derived-name registration.
    fn add_typed_client_websocket_named<T>(
        &mut self,
        name: impl Into<Arc<str>>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static;

    /// Service type `T` implemented by the typed client `I`, named after `T`.
    ///
    /// # Errors
    /// `NameConflict` when another type already claimed the derived name.
    fn add_typed_client_websocket_as<T, I>(
        &mut self,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static;

    /// # Errors
    /// Does not fail today; kept fallible like the derived-name registration.
    fn add_typed_client_websocket_as_named<T, I>(
        &mut self,
        name: impl Into<Arc<str>>,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static;

    /// Typed client `T` built by `factory`, named after `T`.
    ///
    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with<T, F>(
        &mut self,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> T + Send + Sync + 'static;

    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with_named<T, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> T + Send + Sync + 'static;

    /// Typed client `T` built by a `factory` that also receives the builder-scope provider.
    ///
    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with_services<T, F>(
        &mut self,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static;

    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with_services_named<T, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static;

    /// Service type `T` built by `factory` as the concrete `I`, named after `T`.
    ///
    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with_as<T, I, F>(
        &mut self,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> I + Send + Sync + 'static;

    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with_as_named<T, I, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> I + Send + Sync + 'static;

    /// Service type `T` built by a service-aware `factory` as the concrete `I`, named
    /// after `T`.
    ///
    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with_services_as<T, I, F>(
        &mut self,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<I> + Send + Sync + 'static;

    /// # Errors
    /// Does not fail today; factory registrations never claim their name.
    fn add_typed_client_websocket_with_services_as_named<T, I, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<I> + Send + Sync + 'static;

    /// Register how `T` is built from a raw client. Replaces an earlier constructor for `T`.
    fn add_client_constructor<T, F>(&mut self, constructor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static;

    /// Register one named raw client per configured entry.
    ///
    /// Every entry is validated before anything is registered.
    ///
    /// # Errors
    /// `InvalidArgument` for the first malformed entry; the collection is left untouched.
    fn add_client_websockets_from_config(
        &mut self,
        config: &ClientWebSocketsConfig,
    ) -> Result<&mut Self, ClientFactoryError>;
}

impl ClientWebSocketServiceCollectionExt for ServiceCollection {
    fn add_client_websocket(&mut self) -> &mut Self {
        mapping_registry(self);
        self.try_add_transient::<dyn ClientWebSocketFactory, _>(|sp| {
            let factory: Arc<dyn ClientWebSocketFactory> =
                Arc::new(DefaultClientWebSocketFactory::new(sp.clone()));
            Ok(factory)
        });
        self.try_add_transient::<ClientWebSocket, _>(|sp| {
            let factory = sp.get::<dyn ClientWebSocketFactory>()?;
            factory
                .create_client(DEFAULT_CLIENT_NAME)
                .map(Arc::new)
                .map_err(|e| crate::di::ServiceError::activation::<ClientWebSocket>(e))
        });
        self
    }

    fn add_named_client_websocket(
        &mut self,
        name: impl Into<Arc<str>>,
    ) -> ClientWebSocketBuilder<'_> {
        self.add_client_websocket();
        ClientWebSocketBuilder::new(self, name.into())
    }

    fn add_named_client_websocket_with<F>(
        &mut self,
        name: impl Into<Arc<str>>,
        configure: F,
    ) -> ClientWebSocketBuilder<'_>
    where
        F: Fn(&mut ClientWebSocket) + Send + Sync + 'static,
    {
        let mut builder = self.add_named_client_websocket(name);
        builder.configure(configure);
        builder
    }

    fn add_typed_client_websocket<T>(
        &mut self,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
    {
        let name = TypeKey::of::<T>().short_name();
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_core::<T>(true)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_named<T>(
        &mut self,
        name: impl Into<Arc<str>>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
    {
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_core::<T>(false)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_as<T, I>(
        &mut self,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        let name = TypeKey::of::<T>().short_name();
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_as_core::<T, I>(upcast, true)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_as_named<T, I>(
        &mut self,
        name: impl Into<Arc<str>>,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_as_core::<T, I>(upcast, false)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_with<T, F>(
        &mut self,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> T + Send + Sync + 'static,
    {
        let name = TypeKey::of::<T>().short_name();
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_with::<T, F>(factory)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_with_named<T, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> T + Send + Sync + 'static,
    {
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_with::<T, F>(factory)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_with_services<T, F>(
        &mut self,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let name = TypeKey::of::<T>().short_name();
        self.add_typed_client_websocket_with_services_named::<T, F>(name, factory)
    }

    fn add_typed_client_websocket_with_services_named<T, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_with_services::<T, F>(factory)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_with_as<T, I, F>(
        &mut self,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> I + Send + Sync + 'static,
    {
        let name = TypeKey::of::<T>().short_name();
        self.add_typed_client_websocket_with_as_named::<T, I, F>(name, factory, upcast)
    }

    fn add_typed_client_websocket_with_as_named<T, I, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket) -> I + Send + Sync + 'static,
    {
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_with_as::<T, I, F>(factory, upcast)?;
        Ok(builder)
    }

    fn add_typed_client_websocket_with_services_as<T, I, F>(
        &mut self,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<I> + Send + Sync + 'static,
    {
        let name = TypeKey::of::<T>().short_name();
        self.add_typed_client_websocket_with_services_as_named::<T, I, F>(name, factory, upcast)
    }

    fn add_typed_client_websocket_with_services_as_named<T, I, F>(
        &mut self,
        name: impl Into<Arc<str>>,
        factory: F,
        upcast: fn(Arc<I>) -> Arc<T>,
    ) -> Result<ClientWebSocketBuilder<'_>, ClientFactoryError>
    where
        T: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<I> + Send + Sync + 'static,
    {
        let mut builder = self.add_named_client_websocket(name);
        builder.add_typed_client_with_services_as::<T, I, F>(factory, upcast)?;
        Ok(builder)
    }

    fn add_client_constructor<T, F>(&mut self, constructor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(ClientWebSocket, &ServiceProvider) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.add_instance(Arc::new(ClientConstructor::<T>::new(constructor)))
    }

    fn add_client_websockets_from_config(
        &mut self,
        config: &ClientWebSocketsConfig,
    ) -> Result<&mut Self, ClientFactoryError> {
        for entry in config.clients.values() {
            entry.validate()?;
        }

        for (name, entry) in &config.clients {
            let entry = entry.clone();
            let suppress = entry.suppress_builder_scope;
            let mut builder = self.add_named_client_websocket(name.as_str());
            builder.try_configure(move |ws| Ok(entry.apply(ws)?));
            if suppress {
                builder.suppress_builder_scope(true);
            }
            tracing::debug!(client = %name, "Registered client from configuration");
        }
        Ok(self)
    }
}
