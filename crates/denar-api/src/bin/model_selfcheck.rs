//! Verify that the three detector models exist and load.

use anyhow::bail;
use tracing::info;

use denar_api::init_tracing;
use denar_models::ModelKey;
use denar_vision::{DetectorConfig, ModelRegistry};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = DetectorConfig::from_env();
    for &key in ModelKey::ALL {
        println!("{:<9} {}", key, config.model_paths.get(key).display());
    }

    let missing = config.model_paths.missing();
    if !missing.is_empty() {
        for key in &missing {
            eprintln!(
                "missing {} model: {}",
                key,
                config.model_paths.get(*key).display()
            );
        }
        bail!("{} model file(s) missing", missing.len());
    }

    let registry = ModelRegistry::load(&config.model_paths, config.device, config.input_size)?;
    info!(registry = ?registry, "Models loaded");
    println!("All models loaded on {}", config.device);
    Ok(())
}
