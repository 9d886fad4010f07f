use anyhow::{Context, Result};
use dumpsplit::config::Config;
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "dumpsplit.toml";

pub async fn init_config(path: PathBuf) -> Result<()> {
    let config_path = path.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let content = format!(
        "# dumpsplit configuration\n\
         #\n\
         # Environment overrides: MAX_CONCURRENT, DUMPSPLIT_OUTPUT_DIR\n\n{}",
        Config::default_toml()?
    );
    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created configuration file: {}", config_path.display());

    Ok(())
}
