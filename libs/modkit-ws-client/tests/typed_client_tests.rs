#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end registration and resolution of named and typed clients.

use std::sync::Arc;

use modkit_ws_client::{
    ClientFactoryError, ClientMappingRegistry, ClientWebSocket, ClientWebSocketFactory,
    ClientWebSocketServiceCollectionExt, ConstructionError, ServiceCollection, ServiceError,
    TypedClientCache,
};

trait Search: Send + Sync {
    fn api_version(&self) -> Option<String>;
    fn socket_id(&self) -> uuid::Uuid;
}

struct SearchImpl {
    socket: ClientWebSocket,
}

impl Search for SearchImpl {
    fn api_version(&self) -> Option<String> {
        self.socket
            .options()
            .request_header("x-api-version")
            .map(str::to_owned)
    }

    fn socket_id(&self) -> uuid::Uuid {
        self.socket.id()
    }
}

mod billing {
    pub struct Client {
        pub socket: modkit_ws_client::ClientWebSocket,
    }
}

mod orders {
    pub struct Client;
}

struct Tenant(&'static str);

struct TenantClient {
    tenant: &'static str,
    socket: ClientWebSocket,
}

trait Quotes: Send + Sync {
    fn route(&self) -> Option<String>;
}

trait Trades: Send + Sync {
    fn route(&self) -> Option<String>;
}

struct MarketClient {
    socket: ClientWebSocket,
}

impl MarketClient {
    fn route_header(&self) -> Option<String> {
        self.socket
            .options()
            .request_header("x-route")
            .map(str::to_owned)
    }
}

impl Quotes for MarketClient {
    fn route(&self) -> Option<String> {
        self.route_header()
    }
}

impl Trades for MarketClient {
    fn route(&self) -> Option<String> {
        self.route_header()
    }
}

fn v1_header(ws: &mut ClientWebSocket) {
    ws.options_mut()
        .set_request_header("x-api-version", "v1")
        .unwrap();
}

#[test]
fn named_raw_client_is_configured_from_its_chain() {
    let mut services = ServiceCollection::new();
    services.add_named_client_websocket_with("search", v1_header);

    let sp = services.build();
    let factory = sp.get::<dyn ClientWebSocketFactory>().unwrap();

    let a = factory.create_client("search").unwrap();
    let b = factory.create_client("search").unwrap();
    assert_eq!(a.options().request_header("x-api-version"), Some("v1"));
    assert_ne!(a.id(), b.id());

    let other = factory.create_client("other").unwrap();
    assert!(other.options().request_header("x-api-version").is_none());
}

#[test]
fn configuration_from_separate_setup_calls_accumulates() {
    let mut services = ServiceCollection::new();
    services.add_named_client_websocket_with("search", v1_header);
    services
        .add_named_client_websocket("search")
        .configure(|ws| {
            ws.options_mut().add_sub_protocol("json.v1").unwrap();
        });

    let sp = services.build();
    let ws = sp
        .get::<dyn ClientWebSocketFactory>()
        .unwrap()
        .create_client("search")
        .unwrap();
    assert_eq!(ws.options().request_header("x-api-version"), Some("v1"));
    assert_eq!(ws.options().sub_protocols(), ["json.v1"]);
}

#[test]
fn trait_typed_client_is_built_from_the_named_configuration() {
    let mut services = ServiceCollection::new();
    services.add_client_constructor::<SearchImpl, _>(|socket, _| Ok(SearchImpl { socket }));
    services
        .add_typed_client_websocket_as_named::<dyn Search, SearchImpl>("search", |c| c)
        .unwrap()
        .configure(v1_header);

    let sp = services.build();
    let a = sp.get::<dyn Search>().unwrap();
    let b = sp.get::<dyn Search>().unwrap();

    assert_eq!(a.api_version().as_deref(), Some("v1"));
    assert_ne!(a.socket_id(), b.socket_id());
}

#[test]
fn names_building_the_same_wrapper_share_one_cache() {
    let mut services = ServiceCollection::new();
    services.add_client_constructor::<MarketClient, _>(|socket, _| Ok(MarketClient { socket }));
    services
        .add_typed_client_websocket_as_named::<dyn Quotes, MarketClient>("quotes", |c| c)
        .unwrap()
        .configure(|ws| {
            ws.options_mut().set_request_header("x-route", "quotes").unwrap();
        });
    services
        .add_typed_client_websocket_as_named::<dyn Trades, MarketClient>("trades", |c| c)
        .unwrap()
        .configure(|ws| {
            ws.options_mut().set_request_header("x-route", "trades").unwrap();
        });

    let sp = services.build();
    let cache = sp.get::<TypedClientCache<MarketClient>>().unwrap();
    assert!(!cache.is_initialized());

    let quotes = sp.get::<dyn Quotes>().unwrap();
    let trades = sp.get::<dyn Trades>().unwrap();

    assert_eq!(quotes.route().as_deref(), Some("quotes"));
    assert_eq!(trades.route().as_deref(), Some("trades"));
    assert!(Arc::ptr_eq(
        &cache,
        &sp.get::<TypedClientCache<MarketClient>>().unwrap()
    ));
    assert!(cache.is_initialized());
}

#[test]
fn factory_registration_can_bind_a_trait_object() {
    let mut services = ServiceCollection::new();
    services
        .add_typed_client_websocket_with_as::<dyn Search, SearchImpl, _>(
            |socket| SearchImpl { socket },
            |c| c,
        )
        .unwrap()
        .configure(v1_header);

    let sp = services.build();
    assert_eq!(
        sp.get::<dyn Search>().unwrap().api_version().as_deref(),
        Some("v1")
    );
}

#[test]
fn service_aware_factories_are_available_on_the_collection() {
    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(Tenant("acme")));
    services
        .add_typed_client_websocket_with_services_named::<TenantClient, _>("tenant", |socket, sp| {
            Ok(TenantClient {
                tenant: sp.get::<Tenant>()?.0,
                socket,
            })
        })
        .unwrap();
    services
        .add_typed_client_websocket_with_services_as_named::<dyn Search, SearchImpl, _>(
            "search",
            |socket, _| Ok(SearchImpl { socket }),
            |c| c,
        )
        .unwrap()
        .configure(v1_header);

    let sp = services.build();
    assert_eq!(sp.get::<TenantClient>().unwrap().tenant, "acme");
    assert_eq!(
        sp.get::<dyn Search>().unwrap().api_version().as_deref(),
        Some("v1")
    );
}

#[test]
fn derived_name_uses_the_short_type_name() {
    let mut services = ServiceCollection::new();
    services.add_client_constructor::<billing::Client, _>(|socket, _| {
        Ok(billing::Client { socket })
    });
    let builder = services
        .add_typed_client_websocket::<billing::Client>()
        .unwrap();
    assert_eq!(builder.name(), "Client");

    services
        .add_named_client_websocket("Client")
        .configure(v1_header);

    let sp = services.build();
    let client = sp.get::<billing::Client>().unwrap();
    assert_eq!(
        client.socket.options().request_header("x-api-version"),
        Some("v1")
    );
}

#[test]
fn conflicting_derived_names_are_rejected_at_setup() {
    let mut services = ServiceCollection::new();
    services
        .add_typed_client_websocket::<billing::Client>()
        .unwrap();

    let err = services
        .add_typed_client_websocket::<orders::Client>()
        .err()
        .expect("second type must conflict");
    let message = err.to_string();
    assert!(matches!(err, ClientFactoryError::NameConflict { .. }));
    assert!(message.contains("'Client'"));
    assert!(message.contains("billing::Client"));
    assert!(message.contains("provide a unique name"));

    let registry = services.instance::<ClientMappingRegistry>().unwrap();
    let owner = registry.owner_of("Client").unwrap();
    assert!(owner.name().ends_with("billing::Client"));
}

#[test]
fn same_type_may_register_its_derived_name_twice() {
    let mut services = ServiceCollection::new();
    services
        .add_typed_client_websocket::<billing::Client>()
        .unwrap();
    services
        .add_typed_client_websocket::<billing::Client>()
        .unwrap();
}

#[test]
fn explicit_names_and_factories_skip_the_conflict_check() {
    let mut services = ServiceCollection::new();
    services
        .add_typed_client_websocket::<billing::Client>()
        .unwrap();

    services
        .add_typed_client_websocket_named::<orders::Client>("Client")
        .unwrap();
    services
        .add_typed_client_websocket_with::<orders::Client, _>(|_| orders::Client)
        .unwrap();
    services
        .add_typed_client_websocket_with_services::<orders::Client, _>(|_, _| Ok(orders::Client))
        .unwrap();
}

#[test]
fn factory_registration_receives_ambient_services() {
    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(Tenant("acme")));
    services
        .add_named_client_websocket("tenant")
        .configure(v1_header)
        .add_typed_client_with_services::<TenantClient, _>(|socket, sp| {
            Ok(TenantClient {
                tenant: sp.get::<Tenant>()?.0,
                socket,
            })
        })
        .unwrap();

    let sp = services.build();
    let client = sp.get::<TenantClient>().unwrap();
    assert_eq!(client.tenant, "acme");
    assert_eq!(
        client.socket.options().request_header("x-api-version"),
        Some("v1")
    );
}

#[test]
fn missing_constructor_surfaces_on_first_resolution() {
    let mut services = ServiceCollection::new();
    services
        .add_typed_client_websocket::<billing::Client>()
        .unwrap();

    let sp = services.build();
    let Err(ServiceError::Activation { source, .. }) = sp.get::<billing::Client>() else {
        panic!("expected activation failure");
    };
    let err = source.downcast_ref::<ClientFactoryError>().unwrap();
    assert!(matches!(
        err,
        ClientFactoryError::Construction(ConstructionError::NoConstructor { .. })
    ));
}

#[test]
fn failing_configuration_action_propagates_unchanged() {
    #[derive(Debug, thiserror::Error)]
    #[error("policy rejected the client")]
    struct PolicyRejected;

    let mut services = ServiceCollection::new();
    services
        .add_named_client_websocket("guarded")
        .try_configure(|_| Err(PolicyRejected.into()));

    let sp = services.build();
    let err = sp
        .get::<dyn ClientWebSocketFactory>()
        .unwrap()
        .create_client("guarded")
        .unwrap_err();
    let ClientFactoryError::Configure(inner) = err else {
        panic!("expected Configure");
    };
    assert!(inner.is::<PolicyRejected>());
}
