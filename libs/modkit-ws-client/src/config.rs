//! Declarative client configuration.
//!
//! ```yaml
//! client_websockets:
//!   clients:
//!     search:
//!       request_headers:
//!         x-api-version: v1
//!       sub_protocols: [json.v1]
//!       keep_alive_interval: 15s
//!       receive_buffer_size: 8192
//!       proxy: http://proxy.local:3128
//! ```

use crate::client::{parse_header, parse_proxy, validate_sub_protocol, ClientWebSocket};
use crate::error::ClientFactoryError;
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Figment key the configuration is read from.
pub const CONFIG_SECTION: &str = "client_websockets";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid client_websockets configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
}

/// All configured clients, keyed by client name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientWebSocketsConfig {
    #[serde(default)]
    pub clients: HashMap<String, NamedClientConfig>,
}

impl ClientWebSocketsConfig {
    /// Read the [`CONFIG_SECTION`] section; a missing section is an empty configuration.
    ///
    /// # Errors
    /// `ConfigError::Extract` when the section exists but does not deserialize.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CONFIG_SECTION) {
            tracing::debug!("No {CONFIG_SECTION} section, no clients configured");
            return Ok(Self::default());
        }
        figment
            .extract_inner::<Self>(CONFIG_SECTION)
            .map_err(|e| ConfigError::Extract(Box::new(e)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Options for one named client. Unset fields keep the client defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamedClientConfig {
    pub request_headers: BTreeMap<String, String>,
    pub sub_protocols: Vec<String>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub keep_alive_interval: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_buffer_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_buffer_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub use_default_credentials: bool,
    pub suppress_builder_scope: bool,
}

impl NamedClientConfig {
    /// Check every value without touching a client.
    ///
    /// # Errors
    /// `InvalidArgument` for the first malformed header, sub-protocol, buffer size or proxy.
    pub fn validate(&self) -> Result<(), ClientFactoryError> {
        for (name, value) in &self.request_headers {
            parse_header(name, value)?;
        }
        for protocol in &self.sub_protocols {
            validate_sub_protocol(protocol)?;
        }
        if self.receive_buffer_size == Some(0) {
            return Err(ClientFactoryError::invalid_argument(
                "receive_buffer_size",
                "must be greater than zero",
            ));
        }
        if self.send_buffer_size == Some(0) {
            return Err(ClientFactoryError::invalid_argument(
                "send_buffer_size",
                "must be greater than zero",
            ));
        }
        if let Some(proxy) = &self.proxy {
            parse_proxy(proxy)?;
        }
        Ok(())
    }

    /// Apply the configured values to `client`.
    ///
    /// # Errors
    /// Same as [`Self::validate`], plus duplicate sub-protocols already present on the client.
    pub fn apply(&self, client: &mut ClientWebSocket) -> Result<(), ClientFactoryError> {
        let options = client.options_mut();
        for (name, value) in &self.request_headers {
            options.set_request_header(name, value)?;
        }
        for protocol in &self.sub_protocols {
            options.add_sub_protocol(protocol.as_str())?;
        }
        if let Some(interval) = self.keep_alive_interval {
            options.set_keep_alive_interval(interval);
        }
        if self.receive_buffer_size.is_some() || self.send_buffer_size.is_some() {
            let receive = self
                .receive_buffer_size
                .unwrap_or(options.receive_buffer_size());
            let send = self.send_buffer_size.unwrap_or(options.send_buffer_size());
            options.set_buffer_sizes(receive, send)?;
        }
        if let Some(proxy) = &self.proxy {
            options.set_proxy(proxy)?;
        }
        if self.use_default_credentials {
            options.set_use_default_credentials(true);
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use figment::providers::{Format, Yaml};

    const YAML: &str = r"
client_websockets:
  clients:
    search:
      request_headers:
        x-api-version: v1
      sub_protocols: [json.v1]
      keep_alive_interval: 15s
      receive_buffer_size: 8192
      proxy: http://proxy.local:3128
    plain: {}
";

    #[test]
    fn reads_named_clients_with_humantime_durations() {
        let figment = Figment::new().merge(Yaml::string(YAML));
        let config = ClientWebSocketsConfig::from_figment(&figment).unwrap();

        let search = &config.clients["search"];
        assert_eq!(search.keep_alive_interval, Some(Duration::from_secs(15)));
        assert_eq!(search.receive_buffer_size, Some(8192));
        assert_eq!(search.send_buffer_size, None);
        assert_eq!(config.clients["plain"], NamedClientConfig::default());
    }

    #[test]
    fn missing_section_is_empty() {
        let figment = Figment::new().merge(Yaml::string("other: 1"));
        assert!(ClientWebSocketsConfig::from_figment(&figment)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let figment = Figment::new().merge(Yaml::string(
            "client_websockets:\n  clients:\n    a:\n      keepalive: 1s\n",
        ));
        assert!(matches!(
            ClientWebSocketsConfig::from_figment(&figment),
            Err(ConfigError::Extract(_))
        ));
    }

    #[test]
    fn apply_sets_only_configured_values() {
        let figment = Figment::new().merge(Yaml::string(YAML));
        let config = ClientWebSocketsConfig::from_figment(&figment).unwrap();
        let mut ws = ClientWebSocket::new();

        config.clients["search"].apply(&mut ws).unwrap();

        let options = ws.options();
        assert_eq!(options.request_header("x-api-version"), Some("v1"));
        assert_eq!(options.sub_protocols(), ["json.v1"]);
        assert_eq!(options.keep_alive_interval(), Duration::from_secs(15));
        assert_eq!(options.receive_buffer_size(), 8192);
        assert_eq!(options.send_buffer_size(), crate::client::DEFAULT_BUFFER_SIZE);
        assert!(options.proxy().is_some());
        assert!(!options.use_default_credentials());
    }

    #[test]
    fn validate_reports_the_offending_argument() {
        let bad = NamedClientConfig {
            send_buffer_size: Some(0),
            ..NamedClientConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ClientFactoryError::InvalidArgument {
                argument: "send_buffer_size",
                ..
            })
        ));

        let bad = NamedClientConfig {
            proxy: Some("::".to_owned()),
            ..NamedClientConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ClientFactoryError::InvalidArgument {
                argument: "proxy",
                ..
            })
        ));
    }

    #[test]
    fn durations_serialize_back_in_humantime_form() {
        let config = NamedClientConfig {
            keep_alive_interval: Some(Duration::from_secs(90)),
            ..NamedClientConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["keep_alive_interval"], "1m 30s");
    }
}
