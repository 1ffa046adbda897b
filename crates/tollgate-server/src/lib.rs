mod health;

use std::net::SocketAddr;

use axum::Router;
use tollgate_config::Config;
use tollgate_proxy::ProxyState;
use tower_http::trace::TraceLayer;

/// Assembled server with all mounts and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    proxy: ProxyState,
}

impl Server {
    /// Build the server and its collaborators from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the model registry, key store or ledger cannot
    /// be built
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let proxy = ProxyState::from_config(config)?;
        Ok(Self::with_state(config, proxy))
    }

    /// Build the server around an already wired proxy state
    pub fn with_state(config: &Config, proxy: ProxyState) -> Self {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // One router per mount, each with its own credit policy
        for mount in &config.server.mounts {
            tracing::debug!(
                prefix = %mount.prefix,
                enforce_credits = mount.enforce_credits,
                free_workspaces = mount.free_workspaces.len(),
                "mounting proxy"
            );
            app = app.merge(tollgate_proxy::proxy_router(proxy.clone(), mount));
        }

        app = app.fallback(health::not_found_handler);

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        Self {
            router: app,
            listen_address,
            proxy,
        }
    }

    /// Override the configured listen address
    #[must_use]
    pub fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Shared proxy state (registry and collaborators)
    #[must_use]
    pub const fn proxy(&self) -> &ProxyState {
        &self.proxy
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered, open connections
    /// have finished and every pending usage settlement has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, models = self.proxy.registry().len(), "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        // Charges for streams cut off by disconnecting callers
        let settlements = self.proxy.settlements();
        settlements.close();
        if !settlements.is_empty() {
            tracing::info!(pending = settlements.len(), "waiting for usage settlements");
        }
        settlements.wait().await;

        Ok(())
    }
}
