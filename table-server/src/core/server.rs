//! Server Implementation
//!
//! HTTP + WebSocket 服务启动和优雅关闭

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::api::build_app;
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn new(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Bind `0.0.0.0:HTTP_PORT` and serve until Ctrl-C or the shutdown token fires
    pub async fn run(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    ///
    /// Shutdown cancels the state's token: the Hub stops and every live
    /// connection's read loop ends, so graceful shutdown does not wait on
    /// idle sockets. Draining is bounded by `SHUTDOWN_TIMEOUT_MS`.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        let app = build_app().with_state(self.state.clone());
        tracing::info!(%addr, environment = %self.config.environment, "Table server listening");

        let token = self.state.shutdown.clone();
        let signal = {
            let token = token.clone();
            async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl-C received, shutting down..."),
                    _ = token.cancelled() => tracing::info!("Shutdown requested"),
                }
                token.cancel();
            }
        };

        let serve = axum::serve(listener, app).with_graceful_shutdown(signal);
        let mut server = tokio::spawn(async move { serve.await });

        tokio::select! {
            result = &mut server => {
                token.cancel();
                result??;
                return Ok(());
            }
            _ = token.cancelled() => {}
        }

        match tokio::time::timeout(self.config.shutdown_timeout(), server).await {
            Ok(result) => result??,
            Err(_) => tracing::warn!(
                timeout_ms = self.config.shutdown_timeout_ms,
                "Graceful shutdown timed out"
            ),
        }

        tracing::info!("Table server stopped");
        Ok(())
    }
}
