//! `nca` — run a convolution automaton and render it to video.
//!
//! **Usage:**
//! ```text
//! nca run [--config <file>] [--output <path>] [--steps <n>] [--stream] [--frame-log <path>]
//! nca render --frames <log> --output <path> [--fps <n>] [--skip even|odd]
//! nca verify --manifest <file>
//! nca default-config
//! ```
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for per-step
//! progress.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use nca_engine::history::Parity;
use nca_runtime::config::RunConfig;
use nca_runtime::exporter::ExportSettings;
use nca_runtime::manifest::load_manifest;
use nca_runtime::replay::verify_manifest;
use nca_runtime::session::{render_frame_log, RunSession};

/// Evolve a grid with a toroidal convolution kernel and export the frames.
#[derive(Parser)]
#[command(name = "nca", version, about = "Convolution automaton simulator")]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Simulate and export a run.
    Run {
        /// JSON run config; the built-in moho scenario when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the output path.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Override the step count.
        #[arg(long)]
        steps: Option<usize>,
        /// Stream frames to the exporter instead of buffering the run.
        #[arg(long)]
        stream: bool,
        /// Also write a binary frame log here.
        #[arg(long)]
        frame_log: Option<PathBuf>,
    },
    /// Re-encode a frame log without re-simulating.
    Render {
        #[arg(long)]
        frames: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 25)]
        fps: u32,
        /// Keep only frames of this index parity.
        #[arg(long, value_enum)]
        skip: Option<ParityArg>,
    },
    /// Re-run a manifest's config and compare history hashes.
    Verify {
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Print the built-in config as JSON.
    DefaultConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum ParityArg {
    Even,
    Odd,
}

impl From<ParityArg> for Parity {
    fn from(p: ParityArg) -> Self {
        match p {
            ParityArg::Even => Parity::Even,
            ParityArg::Odd => Parity::Odd,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Cmd::Run {
            config,
            output,
            steps,
            stream,
            frame_log,
        } => {
            let mut cfg = match &config {
                Some(path) => RunConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => RunConfig::default(),
            };
            if let Some(output) = output {
                cfg.output = output;
            }
            if let Some(steps) = steps {
                cfg.steps = steps;
            }
            if frame_log.is_some() {
                cfg.frame_log = frame_log;
            }
            cfg.stream |= stream;

            let session = RunSession::new(cfg).context("Invalid run configuration")?;
            let outcome = session.execute().context("Run failed")?;
            println!(
                "{} frames simulated, {} written to {}",
                outcome.frames,
                outcome.export.frames_written,
                outcome.export.path.display()
            );
            println!("history hash: {}", outcome.history_hash);
            println!("manifest:     {}", outcome.manifest_path.display());
        }
        Cmd::Render {
            frames,
            output,
            fps,
            skip,
        } => {
            if fps == 0 {
                bail!("--fps must be positive");
            }
            let settings = ExportSettings {
                fps,
                keep: skip.map(Parity::from),
            };
            let summary = render_frame_log(&frames, &output, settings)
                .with_context(|| format!("Failed to render {}", frames.display()))?;
            println!(
                "{} of {} frames written to {}",
                summary.frames_written,
                summary.frames_seen,
                summary.path.display()
            );
        }
        Cmd::Verify { manifest } => {
            let m = load_manifest(&manifest)
                .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
            info!("re-running {} steps from {}", m.config.steps, manifest.display());
            let report = verify_manifest(&m).context("Replay failed")?;
            if !report.matches() {
                bail!(
                    "history hash mismatch: manifest {} replay {}",
                    report.expected_hash,
                    report.actual_hash
                );
            }
            println!("[OK] history hash {}", report.actual_hash);
        }
        Cmd::DefaultConfig => {
            let json = RunConfig::default()
                .to_json_pretty()
                .context("Failed to serialize default config")?;
            println!("{}", json);
        }
    }

    Ok(())
}
