use crate::client::ClientWebSocket;
use crate::di::ServiceProvider;
use crate::error::ClientFactoryError;
use std::fmt;
use std::sync::Arc;

type PlainAction = dyn Fn(&mut ClientWebSocket) -> anyhow::Result<()> + Send + Sync;
type ServiceAction =
    dyn Fn(&ServiceProvider, &mut ClientWebSocket) -> anyhow::Result<()> + Send + Sync;

/// One step of a named configuration chain.
#[derive(Clone)]
pub enum ConfigureAction {
    /// Mutates the raw client only.
    Plain(Arc<PlainAction>),
    /// Also receives the provider that is building the client.
    WithServices(Arc<ServiceAction>),
}

impl ConfigureAction {
    #[must_use]
    pub fn plain<F>(action: F) -> Self
    where
        F: Fn(&mut ClientWebSocket) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(action))
    }

    #[must_use]
    pub fn with_services<F>(action: F) -> Self
    where
        F: Fn(&ServiceProvider, &mut ClientWebSocket) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::WithServices(Arc::new(action))
    }

    /// # Errors
    /// Whatever error the action itself returns.
    pub fn apply(
        &self,
        services: &ServiceProvider,
        client: &mut ClientWebSocket,
    ) -> anyhow::Result<()> {
        match self {
            Self::Plain(action) => action(client),
            Self::WithServices(action) => action(services, client),
        }
    }
}

impl fmt::Debug for ConfigureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("ConfigureAction::Plain"),
            Self::WithServices(_) => f.write_str("ConfigureAction::WithServices"),
        }
    }
}

/// Per-name options read by [`DefaultClientWebSocketFactory`].
///
/// Held in the provider's named options storage, so actions registered by unrelated
/// setup calls for the same name end up in one chain.
#[derive(Debug, Clone, Default)]
pub struct ClientWebSocketFactoryOptions {
    /// Applied to every new client, in registration order.
    pub actions: Vec<ConfigureAction>,

    /// When `false` (default), typed clients are constructed inside a fresh child scope
    /// of the resolving provider; when `true` the resolving provider is used directly.
    pub suppress_builder_scope: bool,
}

/// Creates configured raw clients by name.
pub trait ClientWebSocketFactory: Send + Sync {
    /// Build a new client and apply every configuration action registered for `name`.
    /// Unknown names yield an unconfigured client.
    ///
    /// # Errors
    /// `ClientFactoryError::Configure` carrying the first failing action's error.
    fn create_client(&self, name: &str) -> Result<ClientWebSocket, ClientFactoryError>;
}

/// Factory backed by the provider's named [`ClientWebSocketFactoryOptions`].
#[derive(Debug, Clone)]
pub struct DefaultClientWebSocketFactory {
    services: ServiceProvider,
}

impl DefaultClientWebSocketFactory {
    #[must_use]
    pub fn new(services: ServiceProvider) -> Self {
        Self { services }
    }
}

impl ClientWebSocketFactory for DefaultClientWebSocketFactory {
    fn create_client(&self, name: &str) -> Result<ClientWebSocket, ClientFactoryError> {
        let options = self
            .services
            .named_options::<ClientWebSocketFactoryOptions>(name);
        let mut client = ClientWebSocket::new();

        for (index, action) in options.actions.iter().enumerate() {
            tracing::trace!(client = name, index, "Applying client configuration action");
            if let Err(err) = action.apply(&self.services, &mut client) {
                tracing::warn!(
                    client = name,
                    index,
                    error = %err,
                    "Client configuration action failed"
                );
                return Err(ClientFactoryError::Configure(err));
            }
        }

        tracing::debug!(
            client = name,
            id = %client.id(),
            actions = options.actions.len(),
            "Created client"
        );
        Ok(client)
    }
}
