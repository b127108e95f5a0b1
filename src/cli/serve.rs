//! HTTP server command handler.

use std::net::SocketAddr;

use color_eyre::Result;

use crate::api;
use crate::context::Context;
use crate::metrics;

use super::App;

impl App {
    /// Run the brands HTTP service.
    pub async fn run_serve(&self) -> Result<()> {
        let config = self.load_config()?;
        tracing::info!(
            env = %config.server.env,
            port = config.server.port,
            batch_size = config.neo4j.batch_size,
            "Starting brands-rw-neo4j"
        );

        let ctx = Context::connect(config).await?;

        // Startup continues without the constraints; writes still work.
        if let Err(e) = ctx.brands.initialise().await {
            tracing::error!(error = %e, "Failed to initialise indexes and constraints");
        }

        let _reporters = metrics::spawn_reporters(ctx.metrics.clone(), &ctx.config.metrics);

        let addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.server.port));
        let app = api::router(ctx);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Failed to bind to {}: {}", addr, e))?;

        tracing::info!("Listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "HTTP server error");
                color_eyre::eyre::eyre!("HTTP server error: {}", e)
            })?;

        tracing::info!("HTTP server shutting down");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
