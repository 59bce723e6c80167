//! Runtime error hierarchy. Every variant is terminal for the run.

use thiserror::Error;

use nca_engine::error::EngineError;

use crate::config::ConfigError;
use crate::exporter::ExportError;
use crate::frame_log::FrameLogError;
use crate::manifest::ManifestError;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    FrameLog(#[from] FrameLogError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("determinism failure: run 1 hash {first}, run 2 hash {second}")]
    Determinism { first: String, second: String },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
