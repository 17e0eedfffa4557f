//! detect_claim - score one rooftop-solar claim and emit the JSON report

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use solar_qc::config::EngineConfig;
use solar_qc::detect::{self, DetectionEngine, SimulatedBackend, SimulationProfile};
use solar_qc::DetectionRequest;

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Claim sample identifier, echoed into the report.
    #[arg(long)]
    sample_id: String,
    /// Latitude of the claimed installation.
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude of the claimed installation.
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// Optional imagery file attached to the claim.
    #[arg(long)]
    image: Option<PathBuf>,
    /// Seed for a reproducible simulated run.
    #[arg(long, env = "SOLAR_QC_SEED")]
    seed: Option<u64>,
    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_flag(Some(&args.ui));

    let config = EngineConfig::load()?;

    let engine = match args.seed {
        Some(seed) => DetectionEngine::new(
            SimulatedBackend::seeded(SimulationProfile::default(), seed),
            config,
        ),
        None => {
            let registry = detect::standard_registry();
            let backend = registry
                .get(&config.backend)
                .ok_or_else(|| anyhow!("backend '{}' not registered", config.backend))?;
            DetectionEngine::with_shared_backend(backend, config)
        }
    };

    let mut request = DetectionRequest::new(args.sample_id, args.lat, args.lon);
    if let Some(path) = &args.image {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        request = request.with_image(bytes);
    }

    let report = {
        let _stage = ui.stage("Score claim");
        engine.detect(&request)?
    };

    let json = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write report {}", path.display()))?;
            println!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
