//! Integration tests for nca_runtime.
//!
//! All tests use temporary directories for isolation.

use std::fs;
use std::path::{Path, PathBuf};

use nca_engine::history::{FrameHistory, Parity};

use nca_runtime::config::RunConfig;
use nca_runtime::drift::compare_histories;
use nca_runtime::exporter::{export_history, ExportSettings, VideoFormat};
use nca_runtime::frame_log::FrameLog;
use nca_runtime::manifest::{load_manifest, manifest_path_for};
use nca_runtime::replay::{self, verify_manifest};
use nca_runtime::session::{render_frame_log, RunSession};

/// Create a temp directory for a test.
fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("nca_runtime_tests")
        .join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir).ok();
    }
    fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

/// Small moho run: fast, but large enough to grow a pattern.
fn small_config(dir: &Path, output: &str) -> RunConfig {
    RunConfig {
        width: 24,
        height: 18,
        steps: 9,
        initial_cells: vec![(13, 8), (4, 16), (15, 20), (16, 20), (15, 21)],
        output: dir.join(output),
        ..RunConfig::default()
    }
}

fn y4m_header(w: usize, h: usize, fps: u32) -> Vec<u8> {
    format!("YUV4MPEG2 W{} H{} F{}:1 Ip A1:1 Cmono\n", w, h, fps).into_bytes()
}

// ─────────────────────────────────────────────────────────────
// Test 1: buffered run writes video + manifest
// ─────────────────────────────────────────────────────────────

#[test]
fn buffered_run_writes_y4m_and_manifest() {
    let dir = temp_dir("buffered");
    let config = small_config(&dir, "moho.y4m");
    let outcome = RunSession::new(config.clone()).unwrap().execute().unwrap();

    assert_eq!(outcome.frames, 9);
    // skip_frames keeps even indices: 0, 2, 4, 6, 8
    assert_eq!(outcome.export.frames_written, 5);
    assert_eq!(outcome.export.format, VideoFormat::Y4m);

    let bytes = fs::read(&config.output).unwrap();
    let header = y4m_header(24, 18, 60);
    assert!(bytes.starts_with(&header));
    assert_eq!(bytes.len(), header.len() + 5 * (6 + 24 * 18));

    let manifest = load_manifest(&manifest_path_for(&config.output)).unwrap();
    assert_eq!(manifest.frames, 9);
    assert_eq!(manifest.exported_frames, 5);
    assert_eq!(manifest.history_hash, outcome.history_hash);
    assert!(manifest.output_sha256.is_some());
}

// ─────────────────────────────────────────────────────────────
// Test 2: streaming and buffered produce identical artifacts
// ─────────────────────────────────────────────────────────────

#[test]
fn streaming_matches_buffered() {
    let dir = temp_dir("streaming");
    let buffered = small_config(&dir, "buffered.y4m");
    let streamed = RunConfig {
        stream: true,
        ..small_config(&dir, "streamed.y4m")
    };

    let a = RunSession::new(buffered.clone()).unwrap().execute().unwrap();
    let b = RunSession::new(streamed.clone()).unwrap().execute().unwrap();

    assert_eq!(a.history_hash, b.history_hash);
    assert_eq!(a.export.frames_written, b.export.frames_written);
    assert_eq!(
        fs::read(&buffered.output).unwrap(),
        fs::read(&streamed.output).unwrap()
    );
}

// ─────────────────────────────────────────────────────────────
// Test 3: frame log round trip equals replay
// ─────────────────────────────────────────────────────────────

#[test]
fn frame_log_round_trip_matches_replay() {
    let dir = temp_dir("frame_log");
    for stream in [false, true] {
        let log_path = dir.join(format!("frames_{}.log", stream));
        let config = RunConfig {
            frame_log: Some(log_path.clone()),
            stream,
            ..small_config(&dir, &format!("out_{}.y4m", stream))
        };
        RunSession::new(config.clone()).unwrap().execute().unwrap();

        let loaded = FrameLog::load_history(&log_path).unwrap();
        let replayed = replay::rebuild_history(&config).unwrap();
        let drift = compare_histories(&loaded, &replayed);
        assert!(drift.is_identical(), "stream={}: {:?}", stream, drift);
    }
}

// ─────────────────────────────────────────────────────────────
// Test 4: rendering a log reproduces the direct export
// ─────────────────────────────────────────────────────────────

#[test]
fn render_from_log_matches_direct_export() {
    let dir = temp_dir("render");
    let log_path = dir.join("frames.log");
    let config = RunConfig {
        frame_log: Some(log_path.clone()),
        ..small_config(&dir, "direct.y4m")
    };
    RunSession::new(config.clone()).unwrap().execute().unwrap();

    let rendered = dir.join("rendered.y4m");
    let summary = render_frame_log(&log_path, &rendered, config.export_settings()).unwrap();
    assert_eq!(summary.frames_seen, 9);
    assert_eq!(
        fs::read(&config.output).unwrap(),
        fs::read(&rendered).unwrap()
    );
}

// ─────────────────────────────────────────────────────────────
// Test 5: parity filters
// ─────────────────────────────────────────────────────────────

#[test]
fn parity_selects_expected_frames() {
    let dir = temp_dir("parity");
    let history = replay::rebuild_history(&small_config(&dir, "unused.y4m")).unwrap();
    let frame_bytes = 6 + 24 * 18;
    let header_len = y4m_header(24, 18, 10).len();

    let cases = [(Some(Parity::Even), 5), (Some(Parity::Odd), 4), (None, 9)];
    for (i, (keep, expected)) in cases.into_iter().enumerate() {
        let path = dir.join(format!("parity_{}.y4m", i));
        let summary = export_history(&history, &path, ExportSettings { fps: 10, keep }).unwrap();
        assert_eq!(summary.frames_written, expected);
        assert_eq!(
            fs::read(&path).unwrap().len(),
            header_len + expected * frame_bytes
        );
    }

    // Odd export's first frame is snapshot 1, not snapshot 0.
    let odd = fs::read(dir.join("parity_1.y4m")).unwrap();
    let first = &odd[header_len + 6..header_len + frame_bytes];
    let expected: Vec<u8> = nca_runtime::exporter::frame_to_luma(&history[1]);
    assert_eq!(first, expected.as_slice());
}

// ─────────────────────────────────────────────────────────────
// Test 6: other containers
// ─────────────────────────────────────────────────────────────

#[test]
fn gif_and_png_outputs() {
    let dir = temp_dir("containers");
    let history = replay::rebuild_history(&small_config(&dir, "unused.y4m")).unwrap();
    let settings = ExportSettings { fps: 20, keep: Some(Parity::Even) };

    let gif = dir.join("moho.gif");
    let summary = export_history(&history, &gif, settings).unwrap();
    assert_eq!((summary.frames_seen, summary.frames_written), (9, 5));
    let bytes = fs::read(&gif).unwrap();
    assert!(bytes.starts_with(b"GIF89a"));
    assert_eq!(bytes.last(), Some(&b';'));

    let png_dir = dir.join("png_frames");
    let summary = export_history(&history, &png_dir, settings).unwrap();
    assert_eq!(summary.format, VideoFormat::PngSequence);
    let count = fs::read_dir(&png_dir).unwrap().count();
    assert_eq!(count, 5);
    assert!(png_dir.join("frame_000004.png").exists());
}

#[test]
fn empty_history_writes_nothing() {
    let dir = temp_dir("empty");
    let path = dir.join("nothing.y4m");
    let summary = export_history(&FrameHistory::new(), &path, ExportSettings::default()).unwrap();
    assert_eq!(summary.frames_written, 0);
    assert!(!path.exists());
}

// ─────────────────────────────────────────────────────────────
// Test 7: manifest verification
// ─────────────────────────────────────────────────────────────

#[test]
fn manifest_verifies_against_replay() {
    let dir = temp_dir("verify");
    let config = RunConfig {
        persistent: true,
        ..small_config(&dir, "persist.y4m")
    };
    RunSession::new(config.clone()).unwrap().execute().unwrap();
    let manifest = load_manifest(&manifest_path_for(&config.output)).unwrap();
    assert!(verify_manifest(&manifest).unwrap().matches());
}

// ─────────────────────────────────────────────────────────────
// Test 8: first frame of a run is the configured initial grid
// ─────────────────────────────────────────────────────────────

#[test]
fn first_frame_is_initial_grid() {
    let dir = temp_dir("initial");
    let config = small_config(&dir, "unused.y4m");
    let history = replay::rebuild_history(&config).unwrap();
    assert_eq!(history[0], config.initial_grid().unwrap());
    assert_eq!(history[0].total(), 5.0);
}

#[test]
fn invalid_config_fails_before_running() {
    let dir = temp_dir("invalid");
    let config = RunConfig {
        initial_cells: vec![(99, 0)],
        ..small_config(&dir, "never.y4m")
    };
    assert!(RunSession::new(config.clone()).is_err());
    assert!(!config.output.exists());
}

// ─────────────────────────────────────────────────────────────
// Test 9: long buffered run
// ─────────────────────────────────────────────────────────────

#[test]
fn long_buffered_run_keeps_every_frame() {
    let dir = temp_dir("long");
    let config = RunConfig {
        width: 10,
        height: 8,
        steps: 250,
        initial_cells: vec![(2, 3), (5, 7)],
        output: dir.join("long.y4m"),
        ..RunConfig::default()
    };
    let outcome = RunSession::new(config.clone()).unwrap().execute().unwrap();
    assert_eq!(outcome.frames, 250);
    assert_eq!(outcome.export.frames_written, 125);
    assert_eq!(outcome.history_hash, replay::rebuild_hash(&config).unwrap());
}
