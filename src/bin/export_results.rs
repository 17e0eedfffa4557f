//! export_results - flatten stored detection reports into an audit artifact

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use solar_qc::detect::DetectionReport;
use solar_qc::export::{export_reports, ExportFormat};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Line-delimited JSON file of detection reports.
    #[arg(long)]
    input: PathBuf,
    /// Artifact format (csv|json).
    #[arg(long, default_value = "csv")]
    format: ExportFormat,
    /// Output file path for the artifact payload.
    #[arg(long)]
    output: PathBuf,
    /// Output file path for the manifest; defaults to `<output>.manifest.json`.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_flag(Some(&args.ui));

    let reports = {
        let _stage = ui.stage("Read reports");
        read_reports(&args.input)?
    };
    if reports.is_empty() {
        return Err(anyhow!("no reports found in {}", args.input.display()));
    }

    let artifact = {
        let _stage = ui.stage("Flatten reports");
        export_reports(&reports, args.format)?
    };

    let manifest_path = args
        .manifest
        .clone()
        .unwrap_or_else(|| manifest_path_for(&args.output));
    {
        let _stage = ui.stage("Write artifact");
        std::fs::write(&args.output, &artifact.payload)
            .with_context(|| format!("failed to write artifact {}", args.output.display()))?;
        let manifest_json = serde_json::to_string_pretty(&artifact.manifest)?;
        std::fs::write(&manifest_path, manifest_json)
            .with_context(|| format!("failed to write manifest {}", manifest_path.display()))?;
    }

    println!(
        "{} reports exported to {} (manifest {})",
        artifact.manifest.report_count,
        args.output.display(),
        manifest_path.display()
    );
    Ok(())
}

fn read_reports(path: &PathBuf) -> Result<Vec<DetectionReport>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read reports file {}: {}", path.display(), e))?;
    let mut reports = Vec::new();
    for (number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let report: DetectionReport = serde_json::from_str(line)
            .map_err(|e| anyhow!("{}:{}: invalid report: {}", path.display(), number + 1, e))?;
        reports.push(report);
    }
    Ok(reports)
}

fn manifest_path_for(output: &PathBuf) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".manifest.json");
    PathBuf::from(name)
}
