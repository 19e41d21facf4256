//! Generation command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use lacquer_core::{generate, load_config};

/// Run the generate command.
pub async fn run(config_path: Option<PathBuf>, skip_build: bool) -> Result<()> {
    let config = load_config(config_path.as_deref())?;

    if let Some(command) = config.build_command.as_deref().filter(|_| !skip_build) {
        tracing::info!("Running build command: {}", command);

        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .await
            .context("Failed to spawn build command")?;

        if !status.success() {
            anyhow::bail!("Build command exited with {}", status);
        }
    }

    let stats = generate(config).await?;

    tracing::info!(
        "Rendered {} of {} routes in {}ms",
        stats.success,
        stats.total,
        stats.duration.as_millis()
    );

    for result in stats.results.iter().filter(|r| !r.success) {
        match &result.error {
            Some(error) => tracing::error!("{}: {}", result.route, error),
            None => tracing::error!("{}: failed", result.route),
        }
    }

    if stats.failed > 0 {
        anyhow::bail!("{} of {} routes failed to render", stats.failed, stats.total);
    }

    Ok(())
}
