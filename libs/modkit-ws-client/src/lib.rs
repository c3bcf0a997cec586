#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Named and typed WebSocket client factory for `ModKit`
//!
//! This crate wires WebSocket client creation into a small service container:
//! - Named clients whose configuration actions accumulate across setup calls
//! - Typed clients that wrap a configured raw client, built through an explicitly
//!   registered constructor and memoized per wrapper type
//! - Setup-time detection of two typed clients claiming the same derived name
//! - Declarative client configuration loaded through `figment`
//!
//! Clients are constructed, never connected: the raw [`ClientWebSocket`] is an options
//! bag handed to whatever transport the application uses.
//!
//! # Example
//!
//! ```ignore
//! use modkit_ws_client::{ClientWebSocket, ClientWebSocketServiceCollectionExt, ServiceCollection};
//!
//! struct SearchClient {
//!     socket: ClientWebSocket,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_client_constructor::<SearchClient, _>(|socket, _| Ok(SearchClient { socket }));
//! services
//!     .add_typed_client_websocket::<SearchClient>()?
//!     .configure(|ws| {
//!         ws.options_mut().set_request_header("x-api-version", "v1").ok();
//!     });
//!
//! let provider = services.build();
//! let search = provider.get::<SearchClient>()?;
//! ```

mod builder;
mod client;
mod config;
pub mod di;
mod error;
mod extensions;
mod factory;
mod registry;
mod typed;

pub use builder::ClientWebSocketBuilder;
pub use client::{
    ClientWebSocket, ClientWebSocketOptions, DEFAULT_BUFFER_SIZE, DEFAULT_KEEP_ALIVE_INTERVAL,
};
pub use config::{CONFIG_SECTION, ClientWebSocketsConfig, ConfigError, NamedClientConfig};
pub use di::{ServiceCollection, ServiceError, ServiceLifetime, ServiceProvider};
pub use error::{ClientFactoryError, ConstructionError};
pub use extensions::{ClientWebSocketServiceCollectionExt, DEFAULT_CLIENT_NAME};
pub use factory::{
    ClientWebSocketFactory, ClientWebSocketFactoryOptions, ConfigureAction,
    DefaultClientWebSocketFactory,
};
pub use registry::ClientMappingRegistry;
pub use typed::{ClientConstructor, ConstructionRecipe, TypedClientCache, TypedClientFactory};
