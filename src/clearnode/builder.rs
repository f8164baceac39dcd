use super::client::ClearNodeClient;
use super::connection::connect;
use crate::core::config::ClearNodeConfig;
use crate::core::errors::ClearNodeError;
use crate::core::kernel::ws::{TungsteniteWs, WsConfig, WsConnector};
use crate::core::types::{noop_status_callback, ConnectionStatus, StatusCallback};
use std::sync::Arc;
use std::time::Duration;

/// Builder for authenticated ClearNode clients
pub struct ClearNodeBuilder<C = TungsteniteWs> {
    config: ClearNodeConfig,
    connector: C,
    ws_config: WsConfig,
    on_status: StatusCallback,
    request_timeout: Option<Duration>,
}

impl ClearNodeBuilder<TungsteniteWs> {
    /// Create a new builder with the provided config
    pub fn new(config: ClearNodeConfig) -> Self {
        let ws_config = WsConfig {
            connect_timeout_ms: config.connect_timeout_ms,
            ..WsConfig::default()
        };
        Self {
            connector: TungsteniteWs::new(ws_config.clone()),
            config,
            ws_config,
            on_status: noop_status_callback(),
            request_timeout: None,
        }
    }

    /// Replace the transport settings, including the connect timeout
    pub fn with_ws_config(mut self, ws_config: WsConfig) -> Self {
        self.connector = TungsteniteWs::new(ws_config.clone());
        self.ws_config = ws_config;
        self
    }
}

impl<C: WsConnector> ClearNodeBuilder<C> {
    /// Carry the session over a different transport
    pub fn with_connector<D: WsConnector>(self, connector: D) -> ClearNodeBuilder<D> {
        ClearNodeBuilder {
            config: self.config,
            connector,
            ws_config: self.ws_config,
            on_status: self.on_status,
            request_timeout: self.request_timeout,
        }
    }

    /// Queue and broadcast capacities; the connector keeps its own dial settings
    pub fn with_buffers(mut self, outbound_buffer_size: usize, event_buffer_size: usize) -> Self {
        self.ws_config.outbound_buffer_size = outbound_buffer_size;
        self.ws_config.event_buffer_size = event_buffer_size;
        self
    }

    /// Observe every status transition
    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(ConnectionStatus, Option<&str>) + Send + Sync + 'static,
    {
        self.on_status = Arc::new(callback);
        self
    }

    /// Override the configured request timeout on the built client
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &ClearNodeConfig {
        &self.config
    }

    /// Open the transport, authenticate and return a ready client
    pub async fn connect(self) -> Result<ClearNodeClient, ClearNodeError> {
        self.config.validate()?;

        let connection = connect(
            &self.connector,
            &self.config,
            &self.ws_config,
            self.on_status,
        )
        .await?;

        let application_address = if self.config.application_address.is_empty() {
            connection.address().to_string()
        } else {
            self.config.application_address.clone()
        };

        let mut client = ClearNodeClient::new(connection, application_address);
        client.set_request_timeout(self.request_timeout);
        Ok(client)
    }
}

/// Convenience function to connect to a ClearNode over tungstenite
pub async fn connect_to_clearnode<F>(
    config: ClearNodeConfig,
    on_status: F,
) -> Result<ClearNodeClient, ClearNodeError>
where
    F: Fn(ConnectionStatus, Option<&str>) + Send + Sync + 'static,
{
    ClearNodeBuilder::new(config).on_status(on_status).connect().await
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_builder_creation() {
        let config = ClearNodeConfig::new(KEY.to_string()).connect_timeout_ms(2_500);
        let builder = ClearNodeBuilder::new(config);

        assert_eq!(builder.ws_config.connect_timeout_ms, 2_500);
        assert_eq!(builder.connector.config().connect_timeout_ms, 2_500);
        assert!(builder.request_timeout.is_none());
    }

    #[test]
    fn test_builder_with_buffers_and_timeout() {
        let builder = ClearNodeBuilder::new(ClearNodeConfig::new(KEY.to_string()))
            .with_buffers(8, 16)
            .with_request_timeout(Duration::from_millis(250));

        assert_eq!(builder.ws_config.outbound_buffer_size, 8);
        assert_eq!(builder.ws_config.event_buffer_size, 16);
        assert_eq!(builder.request_timeout, Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config_before_dialing() {
        let config = ClearNodeConfig::new(String::new());
        let result = ClearNodeBuilder::new(config).connect().await;

        assert!(matches!(result, Err(ClearNodeError::ConfigError(_))));
    }
}
