use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_BACKEND: &str = "simulated";
const DEFAULT_AVG_PANEL_AREA_SQM: f64 = 1.7;
const DEFAULT_WATT_PER_SQM: f64 = 180.0;

#[derive(Debug, Deserialize, Default)]
struct EngineConfigFile {
    backend: Option<String>,
    calibration: Option<CalibrationFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CalibrationFile {
    avg_panel_area_sqm: Option<f64>,
    watt_per_sqm: Option<f64>,
}

/// Physical assumptions behind the derived estimates.
///
/// These are domain assumptions, not measurements: module footprints and array
/// power density drift as hardware generations change, so deployments
/// recalibrate them per service region rather than patching code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Assumed footprint of one panel module, in square metres.
    pub avg_panel_area_sqm: f64,
    /// Assumed array power density, in watts per square metre.
    pub watt_per_sqm: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            avg_panel_area_sqm: DEFAULT_AVG_PANEL_AREA_SQM,
            watt_per_sqm: DEFAULT_WATT_PER_SQM,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name of the registered backend the engine should score with.
    pub backend: String,
    pub calibration: Calibration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            calibration: Calibration::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the optional TOML file named by
    /// `SOLAR_QC_CONFIG`, apply `SOLAR_QC_*` environment overrides, validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SOLAR_QC_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: EngineConfigFile) -> Self {
        let backend = file.backend.unwrap_or_else(|| DEFAULT_BACKEND.to_string());
        let calibration = Calibration {
            avg_panel_area_sqm: file
                .calibration
                .as_ref()
                .and_then(|calibration| calibration.avg_panel_area_sqm)
                .unwrap_or(DEFAULT_AVG_PANEL_AREA_SQM),
            watt_per_sqm: file
                .calibration
                .as_ref()
                .and_then(|calibration| calibration.watt_per_sqm)
                .unwrap_or(DEFAULT_WATT_PER_SQM),
        };
        Self {
            backend,
            calibration,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("SOLAR_QC_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend;
            }
        }
        if let Ok(area) = std::env::var("SOLAR_QC_PANEL_AREA_SQM") {
            self.calibration.avg_panel_area_sqm = area
                .parse()
                .map_err(|_| anyhow!("SOLAR_QC_PANEL_AREA_SQM must be a number"))?;
        }
        if let Ok(density) = std::env::var("SOLAR_QC_WATT_PER_SQM") {
            self.calibration.watt_per_sqm = density
                .parse()
                .map_err(|_| anyhow!("SOLAR_QC_WATT_PER_SQM must be a number"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.backend.trim().is_empty() {
            return Err(anyhow!("backend name must not be blank"));
        }
        if self.calibration.avg_panel_area_sqm <= 0.0 {
            return Err(anyhow!("avg_panel_area_sqm must be greater than zero"));
        }
        if self.calibration.watt_per_sqm <= 0.0 {
            return Err(anyhow!("watt_per_sqm must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<EngineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
