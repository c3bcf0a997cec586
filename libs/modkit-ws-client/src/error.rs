use crate::di::ServiceError;
use thiserror::Error;

/// Errors raised while registering, configuring or constructing WebSocket clients.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientFactoryError {
    /// An argument was rejected before any state was touched.
    #[error("invalid argument '{argument}': {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    /// Two typed registrations claim the same client name.
    #[error(
        "The ClientWebSocket factory already has a registered client with the name '{name}', \
         bound to the type '{existing_type}'. Client names are computed based on the type name \
         without considering the module path ('{existing_short}'). Use an overload that accepts \
         a name and provide a unique name to resolve the conflict \
         (requested type: '{requested_type}')."
    )]
    NameConflict {
        name: String,
        existing_type: &'static str,
        existing_short: String,
        requested_type: &'static str,
    },

    /// A typed client could not be built from the raw client.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// The ambient service provider failed to resolve a collaborator.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A configuration action failed; the action's own error is passed through as-is.
    #[error(transparent)]
    Configure(anyhow::Error),
}

impl ClientFactoryError {
    pub(crate) fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}

/// Failures of the typed construction path.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConstructionError {
    /// No constructor was registered for the wrapper type.
    #[error(
        "no client constructor registered for type '{type_name}'; \
         register one with ServiceCollection::add_client_constructor"
    )]
    NoConstructor { type_name: &'static str },

    /// A constructor asked for a service the provider could not supply.
    #[error("failed to resolve a dependency of '{type_name}': {source}")]
    UnresolvedDependency {
        type_name: &'static str,
        #[source]
        source: ServiceError,
    },

    /// The constructor itself failed.
    #[error("constructor for '{type_name}' failed: {source}")]
    Failed {
        type_name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ConstructionError {
    /// Wraps a resolution failure raised inside the constructor of `T`.
    #[must_use]
    pub fn unresolved<T: ?Sized + 'static>(source: ServiceError) -> Self {
        Self::UnresolvedDependency {
            type_name: std::any::type_name::<T>(),
            source,
        }
    }

    /// Wraps an arbitrary failure raised inside the constructor of `T`.
    #[must_use]
    pub fn failed<T: ?Sized + 'static>(source: impl Into<anyhow::Error>) -> Self {
        Self::Failed {
            type_name: std::any::type_name::<T>(),
            source: source.into(),
        }
    }
}
