//! Run session — one run from config to artifact.
//!
//! Order of operations:
//!   1. validate config, build engine      (fails before any step)
//!   2. run engine: buffered or streamed into the exporter
//!   3. optional frame log alongside the frames
//!   4. manifest with history hash + artifact hash
//!
//! Streaming never holds more than the working grid and one snapshot.

use std::path::{Path, PathBuf};

use log::{debug, info};

use nca_engine::grid::Grid;
use nca_engine::hashing::{history_hash, HistoryHasher};
use nca_engine::history::{FrameHistory, FrameSink};

use crate::config::RunConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::exporter::{export_history, ExportSettings, ExportSummary, FrameWriter};
use crate::frame_log::FrameLog;
use crate::manifest::{file_sha256, manifest_path_for, save_manifest, ManifestError, RunManifest};

/// Log progress every this many steps.
const PROGRESS_INTERVAL: usize = 100;

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub frames: usize,
    pub export: ExportSummary,
    pub history_hash: String,
    pub manifest_path: PathBuf,
}

/// An isolated run built from an explicit config.
pub struct RunSession {
    config: RunConfig,
}

impl RunSession {
    /// Validate `config` up front.
    pub fn new(config: RunConfig) -> RuntimeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run to completion, export, and write the manifest.
    pub fn execute(&self) -> RuntimeResult<RunOutcome> {
        let c = &self.config;
        info!(
            "run start: {}x{} grid, {} steps, persistent={}, activation={:?}, output={}",
            c.height,
            c.width,
            c.steps,
            c.persistent,
            c.activation,
            c.output.display()
        );
        debug!(
            "kernel {}x{}, weight sum {}",
            c.kernel.rows(),
            c.kernel.cols(),
            c.kernel.weight_sum()
        );

        let (frames, export, hash) = if c.stream {
            self.execute_streaming()?
        } else {
            self.execute_buffered()?
        };

        let mut manifest = RunManifest::new(c, frames, export.frames_written, hash.clone());
        if export.format.is_file() && export.frames_written > 0 {
            let digest = file_sha256(&export.path).map_err(ManifestError::from)?;
            manifest.output_sha256 = Some(digest);
        }
        let manifest_path = manifest_path_for(&c.output);
        save_manifest(&manifest_path, &manifest)?;

        info!(
            "run complete: {} frames, {} exported, history {}",
            frames, export.frames_written, hash
        );

        Ok(RunOutcome {
            frames,
            export,
            history_hash: hash,
            manifest_path,
        })
    }

    fn execute_buffered(&self) -> RuntimeResult<(usize, ExportSummary, String)> {
        let c = &self.config;
        let frames: Vec<Grid> = c
            .build_engine()?
            .enumerate()
            .map(|(index, frame)| {
                log_progress(index, c.steps, &frame);
                frame
            })
            .collect();
        let history = FrameHistory::from_frames(frames)?;
        debug!("buffered run recorded {} frames", history.len());

        if let Some(log_path) = &c.frame_log {
            let n = FrameLog::write_history(log_path, &history)?;
            info!("frame log: {} frames to {}", n, log_path.display());
        }

        let export = export_history(&history, &c.output, c.export_settings())?;
        Ok((history.len(), export, history_hash(&history)))
    }

    fn execute_streaming(&self) -> RuntimeResult<(usize, ExportSummary, String)> {
        let c = &self.config;
        let engine = c.build_engine()?;
        let (height, width) = engine.shape();

        let mut sink = StreamSink {
            writer: FrameWriter::open(&c.output, height, width, c.export_settings())?,
            log: c.frame_log.as_deref().map(FrameLog::create).transpose()?,
            hasher: HistoryHasher::new(),
            total: c.steps,
        };
        let frames = engine.run_into(&mut sink)?;

        let StreamSink { writer, log, hasher, .. } = sink;
        if let Some(log) = log {
            let path = log.path().to_path_buf();
            let n = log.finish()?;
            info!("frame log: {} frames to {}", n, path.display());
        }
        let export = writer.finish()?;
        Ok((frames, export, hasher.finish(frames)))
    }
}

/// Fan-out sink used by streamed runs.
struct StreamSink {
    writer: FrameWriter,
    log: Option<FrameLog>,
    hasher: HistoryHasher,
    total: usize,
}

impl FrameSink for StreamSink {
    type Error = RuntimeError;

    fn accept(&mut self, index: usize, frame: &Grid) -> RuntimeResult<()> {
        self.hasher.update(frame);
        if let Some(log) = &mut self.log {
            log.append(index, frame)?;
        }
        self.writer.accept(index, frame)?;
        log_progress(index, self.total, frame);
        Ok(())
    }
}

fn log_progress(index: usize, total: usize, frame: &Grid) {
    if (index + 1) % PROGRESS_INTERVAL == 0 {
        debug!("step {}/{} (mass {:.3})", index + 1, total, frame.total());
    }
}

/// Re-encode a stored frame log without re-simulating.
pub fn render_frame_log(
    log_path: &Path,
    output: &Path,
    settings: ExportSettings,
) -> RuntimeResult<ExportSummary> {
    let history: FrameHistory = FrameLog::load_history(log_path)?;
    info!(
        "rendering {} frames from {}",
        history.len(),
        log_path.display()
    );
    Ok(export_history(&history, output, settings)?)
}
