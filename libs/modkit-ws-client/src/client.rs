//! Raw WebSocket client handle and its options bag.
//!
//! The factory only constructs and mutates this type; it never interprets it.

use crate::error::ClientFactoryError;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Default interval between keep-alive pings.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Default receive and send buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Characters that may not appear in a sub-protocol token (RFC 7230 `tchar` complement).
const SEPARATORS: &[char] = &[
    '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}',
];

/// An unconnected WebSocket client.
///
/// Every instance carries a fresh id, so two constructions are always distinguishable.
#[derive(Debug, Clone)]
pub struct ClientWebSocket {
    id: Uuid,
    options: ClientWebSocketOptions,
}

impl ClientWebSocket {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            options: ClientWebSocketOptions::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn options(&self) -> &ClientWebSocketOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ClientWebSocketOptions {
        &mut self.options
    }
}

impl Default for ClientWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

/// Handshake and transport options applied before connecting.
#[derive(Debug, Clone)]
pub struct ClientWebSocketOptions {
    request_headers: HeaderMap,
    sub_protocols: Vec<String>,
    keep_alive_interval: Duration,
    receive_buffer_size: usize,
    send_buffer_size: usize,
    proxy: Option<Url>,
    use_default_credentials: bool,
}

impl Default for ClientWebSocketOptions {
    fn default() -> Self {
        Self {
            request_headers: HeaderMap::new(),
            sub_protocols: Vec::new(),
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            receive_buffer_size: DEFAULT_BUFFER_SIZE,
            send_buffer_size: DEFAULT_BUFFER_SIZE,
            proxy: None,
            use_default_credentials: false,
        }
    }
}

impl ClientWebSocketOptions {
    /// Set (or replace) a header sent with the opening handshake.
    ///
    /// # Errors
    /// `InvalidArgument` if the name or value is not a valid HTTP header token.
    pub fn set_request_header(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<&mut Self, ClientFactoryError> {
        let (name, value) = parse_header(name, value)?;
        self.request_headers.insert(name, value);
        Ok(self)
    }

    #[must_use]
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn request_headers(&self) -> &HeaderMap {
        &self.request_headers
    }

    /// Request a sub-protocol during the handshake; order is preserved.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty or malformed token, or a duplicate
    /// (compared case-insensitively).
    pub fn add_sub_protocol(
        &mut self,
        protocol: impl Into<String>,
    ) -> Result<&mut Self, ClientFactoryError> {
        let protocol = protocol.into();
        validate_sub_protocol(&protocol)?;
        if self
            .sub_protocols
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&protocol))
        {
            return Err(ClientFactoryError::invalid_argument(
                "sub_protocol",
                format!("duplicate sub-protocol '{protocol}'"),
            ));
        }
        self.sub_protocols.push(protocol);
        Ok(self)
    }

    #[must_use]
    pub fn sub_protocols(&self) -> &[String] {
        &self.sub_protocols
    }

    pub fn set_keep_alive_interval(&mut self, interval: Duration) -> &mut Self {
        self.keep_alive_interval = interval;
        self
    }

    #[must_use]
    pub fn keep_alive_interval(&self) -> Duration {
        self.keep_alive_interval
    }

    /// # Errors
    /// `InvalidArgument` if either size is zero.
    pub fn set_buffer_sizes(
        &mut self,
        receive: usize,
        send: usize,
    ) -> Result<&mut Self, ClientFactoryError> {
        if receive == 0 {
            return Err(ClientFactoryError::invalid_argument(
                "receive_buffer_size",
                "must be greater than zero",
            ));
        }
        if send == 0 {
            return Err(ClientFactoryError::invalid_argument(
                "send_buffer_size",
                "must be greater than zero",
            ));
        }
        self.receive_buffer_size = receive;
        self.send_buffer_size = send;
        Ok(self)
    }

    #[must_use]
    pub fn receive_buffer_size(&self) -> usize {
        self.receive_buffer_size
    }

    #[must_use]
    pub fn send_buffer_size(&self) -> usize {
        self.send_buffer_size
    }

    /// # Errors
    /// `InvalidArgument` if `proxy` is not an absolute URL.
    pub fn set_proxy(&mut self, proxy: &str) -> Result<&mut Self, ClientFactoryError> {
        self.proxy = Some(parse_proxy(proxy)?);
        Ok(self)
    }

    pub fn clear_proxy(&mut self) -> &mut Self {
        self.proxy = None;
        self
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    pub fn set_use_default_credentials(&mut self, enabled: bool) -> &mut Self {
        self.use_default_credentials = enabled;
        self
    }

    #[must_use]
    pub fn use_default_credentials(&self) -> bool {
        self.use_default_credentials
    }
}

pub(crate) fn parse_header(
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), ClientFactoryError> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
        ClientFactoryError::invalid_argument("request_header", format!("name '{name}': {e}"))
    })?;
    let value = HeaderValue::from_str(value).map_err(|e| {
        ClientFactoryError::invalid_argument("request_header", format!("value for '{name}': {e}"))
    })?;
    Ok((name, value))
}

pub(crate) fn validate_sub_protocol(protocol: &str) -> Result<(), ClientFactoryError> {
    if protocol.is_empty() {
        return Err(ClientFactoryError::invalid_argument(
            "sub_protocol",
            "must not be empty",
        ));
    }
    if let Some(bad) = protocol
        .chars()
        .find(|c| !c.is_ascii_graphic() || SEPARATORS.contains(c))
    {
        return Err(ClientFactoryError::invalid_argument(
            "sub_protocol",
            format!("'{protocol}' contains invalid character {bad:?}"),
        ));
    }
    Ok(())
}

pub(crate) fn parse_proxy(proxy: &str) -> Result<Url, ClientFactoryError> {
    Url::parse(proxy)
        .map_err(|e| ClientFactoryError::invalid_argument("proxy", format!("'{proxy}': {e}")))
}
