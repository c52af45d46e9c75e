//! Run the detector on a single image file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use image::ImageReader;

use denar_api::init_tracing;
use denar_speech::{compose_announcement, SpeechConfig};
use denar_vision::{
    extract_detections, save_extracted, CurrencyDetector, DetectOptions, DetectorConfig,
};

#[derive(Parser)]
#[command(name = "detect-image")]
#[command(about = "Detect a Macedonian banknote or coin in an image")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Skip contrast stretching and denoising
    #[arg(long)]
    no_preprocess: bool,

    /// Use the denomination model alone, without binary-stage voting
    #[arg(long)]
    no_ensemble: bool,

    /// Save cropped detections to this directory
    #[arg(long, value_name = "DIR")]
    extract_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let args = Cli::parse();

    let image = ImageReader::open(&args.image_path)
        .with_context(|| format!("Failed to open {}", args.image_path.display()))?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;

    let config = DetectorConfig::from_env();
    let detector = CurrencyDetector::from_config(&config).context("Failed to load models")?;

    let options = DetectOptions {
        use_preprocessing: config.use_preprocessing && !args.no_preprocess,
        use_ensemble: config.use_ensemble && !args.no_ensemble,
    };
    let result = detector.detect(&image, options);

    println!("{}", serde_json::to_string_pretty(&result)?);
    println!(
        "{}",
        compose_announcement(&result, SpeechConfig::from_env().language)
    );

    if let Some(dir) = &args.extract_dir {
        let prefix = args
            .image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let extracted = extract_detections(&image, &result);
        for path in save_extracted(dir, prefix, &extracted)? {
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}
