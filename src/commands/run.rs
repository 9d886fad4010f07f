use anyhow::{Context, Result};
use dumpsplit::{
    config::Config,
    extract::{Pipeline, RunProgress},
    output::outputs_from_config,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Cancel `progress` on the first Ctrl-C
pub fn cancel_on_ctrl_c(progress: Arc<RunProgress>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after in-flight writes");
            progress.cancel();
        }
    });
}

pub async fn run_pipeline(config: Config, summary_path: Option<PathBuf>) -> Result<()> {
    let progress = Arc::new(RunProgress::new(config.pipeline.quiet));
    cancel_on_ctrl_c(progress.clone());

    let outputs = outputs_from_config(&config.outputs).await?;
    let pipeline = Pipeline::new(config.sources, config.pipeline.max_concurrent, progress)?;
    let summary = pipeline.run(outputs).await?;

    println!("\nRun complete:");
    println!("  Mappings:             {}", summary.mappings);
    println!("  Pages scanned:        {}", summary.pages.pages);
    println!("  Artifacts dispatched: {}", summary.progress.artifacts_dispatched);
    for handler in &summary.outputs {
        println!(
            "  {}: {} written, {} failed",
            handler.handler, handler.successful, handler.failed
        );
    }
    println!("  Skipped writes:       {}", summary.skipped_writes);
    println!("  Elapsed:              {:.1}s", summary.progress.elapsed_seconds);

    if summary.skipped_writes > 0 {
        warn!("{} writes were skipped; see the log for artifact names", summary.skipped_writes);
    }

    if let Some(path) = summary_path {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote run summary to {}", path.display());
    }

    Ok(())
}
