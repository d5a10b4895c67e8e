//! Test server harness
//!
//! Spawns the real gateway router on a random port so tests talk to it over
//! HTTP, exactly as a deployed client would.

use auth_service::config::{Config, KeystoreSource, DEFAULT_BIND_ADDRESS};
use auth_service::keystore::{Keystore, KeystoreProvider, Purpose, StaticKeystoreProvider};
use auth_service::routes::{self, AppState};
use common::jwt::{DEFAULT_CLOCK_SKEW, DEFAULT_MAX_TOKEN_AGE};
use common::secret::SecretString;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Running gateway instance.
pub struct TestGatewayServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a `local` gateway serving a fixed keystore.
    pub async fn spawn(keystore: Keystore, require_auth: bool) -> Result<Self, anyhow::Error> {
        let provider: Arc<dyn KeystoreProvider> = Arc::new(StaticKeystoreProvider::new(keystore));
        Self::spawn_with_provider(provider, test_config(Purpose::Local, require_auth)).await
    }

    /// Spawn a gateway with an arbitrary provider and configuration.
    pub async fn spawn_with_provider(
        keystore_provider: Arc<dyn KeystoreProvider>,
        config: Config,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState {
            config,
            keystore_provider,
        });

        // Standalone recorder; installing a global one would clash across tests
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Base URL of the server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Configuration with defaults and no external keystore.
pub fn test_config(purpose: Purpose, require_auth: bool) -> Config {
    Config {
        bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        purpose,
        require_auth,
        max_token_age: DEFAULT_MAX_TOKEN_AGE,
        clock_skew: DEFAULT_CLOCK_SKEW,
        token_query_param: "token".to_string(),
        keystore_source: KeystoreSource::Static(SecretString::from("unused".to_string())),
    }
}
