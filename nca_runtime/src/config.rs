//! Run configuration — everything a run needs, supplied once up front.
//!
//! JSON on disk, `deny_unknown_fields`; missing fields fall back to the
//! reference "moho" scenario. No process-wide state: every run is built
//! from an explicit `RunConfig`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nca_engine::activation::{Activation, ActivationSpec};
use nca_engine::engine::SimulationEngine;
use nca_engine::error::EngineError;
use nca_engine::grid::Grid;
use nca_engine::history::Parity;
use nca_engine::kernel::Kernel;

use crate::exporter::ExportSettings;

/// Configuration failures. All are raised before the first step runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Complete description of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    pub width: usize,
    pub height: usize,
    pub steps: usize,
    pub kernel: Kernel,
    pub activation: ActivationSpec,
    pub persistent: bool,
    /// `(row, col)` cells set to 1; all others start at 0.
    pub initial_cells: Vec<(usize, usize)>,
    /// Video file (`.y4m`, `.gif`, `.mp4`) or a directory for PNG frames.
    pub output: PathBuf,
    pub fps: u32,
    pub skip_frames: bool,
    /// Frames kept when `skip_frames` is set.
    pub keep_parity: Parity,
    /// Optional binary frame log for re-rendering without re-simulating.
    pub frame_log: Option<PathBuf>,
    /// Hand frames straight to the exporter instead of buffering the run.
    pub stream: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let (h, w) = (360, 640);
        Self {
            width: w,
            height: h,
            steps: 2000,
            kernel: Kernel::moho(),
            activation: ActivationSpec::SinAbsHalf,
            persistent: false,
            initial_cells: vec![
                (3 * h / 4, w / 3),
                (h / 4, 2 * w / 3),
                (5 * h / 6, 5 * w / 6),
                (5 * h / 6 + 1, 5 * w / 6),
                (5 * h / 6, 5 * w / 6 + 1),
            ],
            output: PathBuf::from("moho.y4m"),
            fps: 60,
            skip_frames: true,
            keep_parity: Parity::Even,
            frame_log: None,
            stream: false,
        }
    }
}

impl RunConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that cannot describe a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.height, self.width
            )));
        }
        if self.steps == 0 {
            return Err(ConfigError::Invalid("steps must be positive".to_string()));
        }
        if self.fps == 0 {
            return Err(ConfigError::Invalid("fps must be positive".to_string()));
        }
        if let Some(&(r, c)) = self
            .initial_cells
            .iter()
            .find(|&&(r, c)| r >= self.height || c >= self.width)
        {
            return Err(ConfigError::Invalid(format!(
                "initial cell ({}, {}) outside {}x{} grid",
                r, c, self.height, self.width
            )));
        }
        Ok(())
    }

    /// The starting grid.
    pub fn initial_grid(&self) -> Result<Grid, ConfigError> {
        Ok(Grid::from_active_cells(
            self.height,
            self.width,
            &self.initial_cells,
        )?)
    }

    /// Build an engine ready to run.
    pub fn build_engine(&self) -> Result<SimulationEngine<Box<dyn Activation>>, ConfigError> {
        self.validate()?;
        Ok(SimulationEngine::new(
            self.initial_grid()?,
            self.kernel.clone(),
            self.activation.build(),
            self.steps,
            self.persistent,
        )?)
    }

    /// Exporter settings derived from this config.
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            fps: self.fps,
            keep: self.skip_frames.then_some(self.keep_parity),
        }
    }
}
