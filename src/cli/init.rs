//! Init command handler.

use color_eyre::Result;

use crate::context::Context;

use super::App;

impl App {
    /// Create the Neo4j indexes and constraints for the configured schema.
    pub async fn run_init(&self) -> Result<()> {
        let config = self.load_config()?;
        let ctx = Context::connect(config).await?;

        tracing::info!(
            revision = %ctx.brands.schema().revision(),
            "Initialising indexes and constraints"
        );
        ctx.brands.initialise().await.map_err(|e| {
            tracing::error!(error = %e, "Schema initialisation failed");
            color_eyre::eyre::eyre!("Schema initialisation failed: {}", e)
        })?;

        tracing::info!("Schema initialised");
        Ok(())
    }
}
