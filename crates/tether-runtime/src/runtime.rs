//! Runtime orchestration: configuration in, running client out.

use std::future::Future;

use tether_core::{BoxedConnector, BoxedHttpTransport, QueuedClient};
use tokio::signal;
use tracing::info;

use crate::config::{ConfigLoader, TetherConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns a validated configuration and turns it into a started client.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = TetherRuntime::load()?;
/// runtime.init_logging();
///
/// let client = runtime.start().await?;
/// runtime.run(&client).await?;
/// ```
pub struct TetherRuntime {
    config: TetherConfig,
}

impl TetherRuntime {
    /// Creates a runtime from an explicit configuration.
    pub fn new(config: TetherConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    /// Loads configuration from the default locations and the environment.
    pub fn load() -> RuntimeResult<Self> {
        Self::from_loader(ConfigLoader::new())
    }

    /// Loads configuration through a customised loader.
    pub fn from_loader(loader: ConfigLoader) -> RuntimeResult<Self> {
        Self::new(loader.load()?)
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    /// Installs the global tracing subscriber described by the logging
    /// section. Returns `false` if one was already installed.
    pub fn init_logging(&self) -> bool {
        logging::init_from_config(&self.config.logging)
    }

    /// Builds and starts a client on the given transports.
    pub async fn start_with(
        &self,
        transport: BoxedHttpTransport,
        connector: BoxedConnector,
    ) -> RuntimeResult<QueuedClient> {
        let config = self.config.client.to_core_config();
        info!(host = %config.host, port = config.port, "Starting Tether client");

        let client = QueuedClient::new(config, transport, connector);
        client.start().await?;
        Ok(client)
    }

    /// Builds and starts a client on the reqwest and tokio-tungstenite
    /// transports.
    #[cfg(all(feature = "http-client", feature = "ws-client"))]
    pub async fn start(&self) -> RuntimeResult<QueuedClient> {
        use std::sync::Arc;
        use tether_transport::{ReqwestTransport, TungsteniteConnector};

        let endpoint = self.config.client.to_core_config().endpoint();
        let transport = ReqwestTransport::new(endpoint)?;
        self.start_with(Arc::new(transport), Arc::new(TungsteniteConnector::new()))
            .await
    }

    /// Runs until a shutdown signal is received, then stops `client`.
    pub async fn run(&self, client: &QueuedClient) -> RuntimeResult<()> {
        info!("Tether client is running. Press Ctrl+C to stop.");
        let signalled = wait_for_shutdown().await;
        client.stop().await;
        signalled
    }

    /// Runs until `shutdown` completes, then stops `client`.
    pub async fn run_until<F>(&self, client: &QueuedClient, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        client.stop().await;
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use async_trait::async_trait;
    use futures::FutureExt;
    use std::sync::Arc;
    use tether_core::{
        ConnectionState, Endpoint, HttpReply, HttpRequest, HttpTransport, ReplyFuture,
        SessionHandlers, SocketConnector, TransportError, TransportResult,
    };

    struct Accepting;

    #[async_trait]
    impl HttpTransport for Accepting {
        async fn connect(&self, _endpoint: &Endpoint) -> TransportResult<()> {
            Ok(())
        }

        fn send(&self, _request: Arc<HttpRequest>) -> ReplyFuture {
            async { Ok(HttpReply::new(204)) }.boxed()
        }

        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    struct NoSockets;

    #[async_trait]
    impl SocketConnector for NoSockets {
        async fn open(
            &self,
            endpoint: &Endpoint,
            _uri: &str,
            _handlers: SessionHandlers,
        ) -> TransportResult<tether_core::BoxedSession> {
            Err(TransportError::ConnectionRefused {
                addr: endpoint.addr(),
            })
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = TetherConfig::default();
        config.client.port = 0;
        assert!(matches!(
            TetherRuntime::new(config),
            Err(RuntimeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn start_with_builds_client_from_settings() {
        let mut config = TetherConfig::default();
        config.client.host = "api.example.com".to_string();
        config.client.auto_flush = false;
        let runtime = TetherRuntime::new(config).unwrap();

        let client = runtime
            .start_with(Arc::new(Accepting), Arc::new(NoSockets))
            .await
            .unwrap();
        assert_eq!(client.config().host, "api.example.com");
        assert!(!client.config().auto_flush);
        assert_eq!(client.state(), ConnectionState::Open);

        runtime.run_until(&client, async {}).await;
        assert!(client.is_stopped());
    }
}
