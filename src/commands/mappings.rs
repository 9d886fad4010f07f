use anyhow::{Context, Result};
use dumpsplit::{
    config::Config,
    extract::{Pipeline, RunProgress},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub async fn build_mappings(config: Config, output: Option<PathBuf>) -> Result<()> {
    let progress = Arc::new(RunProgress::new(config.pipeline.quiet));
    super::run::cancel_on_ctrl_c(progress.clone());

    let pipeline = Pipeline::new(config.sources, config.pipeline.max_concurrent, progress.clone())?;
    let map = pipeline.build_map().await?;
    progress.finish();

    println!("Found {} mappings", map.len());

    if let Some(path) = output {
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &map)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote mappings to {}", path.display());
    }

    Ok(())
}
