//! Test server wrapper that starts tollgate on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use tollgate_billing::Ledger;
use tollgate_config::Config;
use tollgate_proxy::{ModelRegistry, ProxyState};
use tollgate_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
    proxy: ProxyState,
}

impl TestServer {
    /// Start a test server with collaborators built from the config
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let proxy = ProxyState::from_config(&config)?;
        Self::start_with_state(&config, proxy).await
    }

    /// Start a test server that charges against the given ledger
    pub async fn start_with_ledger(config: Config, ledger: Arc<dyn Ledger>) -> anyhow::Result<Self> {
        let registry = ModelRegistry::from_config(&config.models)?;
        let keys = tollgate_auth::key_store_from_config(&config.auth)?;
        let proxy = ProxyState::new(registry, keys, ledger)?;
        Self::start_with_state(&config, proxy).await
    }

    async fn start_with_state(config: &Config, proxy: ProxyState) -> anyhow::Result<Self> {
        let server = Server::with_state(config, proxy.clone());
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
            proxy,
        })
    }

    /// URL of a path on the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Ledger the server charges against
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        self.proxy.ledger()
    }

    /// Send a JSON body to a proxied path, optionally with a bearer token
    pub async fn post(&self, path: &str, body: &serde_json::Value, bearer: Option<&str>) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
