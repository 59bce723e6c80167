//! Video exporter — snapshot-to-media encoder.
//!
//! Maps each cell to an 8-bit intensity with `round(v * 255)`, optionally
//! keeps only even- or odd-indexed frames, and writes a single-channel
//! stream at the configured frame rate. No accumulation, no clipping
//! beyond saturating the byte conversion.
//!
//! Formats by output path:
//!   - `.y4m`      YUV4MPEG2 mono stream (pure Rust)
//!   - `.gif`      animated GIF via the `image` crate
//!   - `.mp4`      H.264 via an external `ffmpeg` fed a y4m pipe
//!   - no extension: directory of `frame_NNNNNN.png`

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, GrayImage, ImageFormat, Rgba, RgbaImage};
use log::{debug, info, warn};
use thiserror::Error;

use nca_engine::grid::Grid;
use nca_engine::history::{FrameHistory, FrameSink, Parity};

use crate::y4m::Y4mWriter;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export io error: {0}")]
    Io(#[from] io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("frame {index} is {got_h}x{got_w}, stream is {h}x{w}")]
    Shape {
        index: usize,
        got_h: usize,
        got_w: usize,
        h: usize,
        w: usize,
    },

    #[error("external encoder failed: {0}")]
    Encoder(String),
}

/// Container chosen from the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    Y4m,
    Gif,
    Mp4,
    PngSequence,
}

impl VideoFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            None => Ok(VideoFormat::PngSequence),
            Some("y4m") => Ok(VideoFormat::Y4m),
            Some("gif") => Ok(VideoFormat::Gif),
            Some("mp4") => Ok(VideoFormat::Mp4),
            Some(other) => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Whether the artifact is a single file (as opposed to a directory).
    pub fn is_file(self) -> bool {
        !matches!(self, VideoFormat::PngSequence)
    }
}

/// Frame rate and optional parity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    pub fps: u32,
    /// `Some(p)` keeps only frames whose index has parity `p`.
    pub keep: Option<Parity>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { fps: 25, keep: None }
    }
}

impl ExportSettings {
    pub fn keeps(&self, index: usize) -> bool {
        self.keep.map_or(true, |p| p.keeps(index))
    }
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub format: VideoFormat,
    /// Frames offered to the exporter.
    pub frames_seen: usize,
    /// Frames actually encoded after parity filtering.
    pub frames_written: usize,
}

/// `round(v * 255)` as a byte. Out-of-range input saturates, NaN maps to 0.
pub fn to_intensity(value: f64) -> u8 {
    (value * 255.0).round() as u8
}

/// One grid as row-major luma bytes.
pub fn frame_to_luma(grid: &Grid) -> Vec<u8> {
    grid.cells().iter().map(|&v| to_intensity(v)).collect()
}

enum Encoder {
    Y4m(Y4mWriter<BufWriter<File>>),
    Gif {
        encoder: GifEncoder<LatchedWriter<BufWriter<File>>>,
        output: LatchedWriter<BufWriter<File>>,
        delay: Delay,
    },
    Mp4 {
        stream: Y4mWriter<BufWriter<ChildStdin>>,
        ffmpeg: Ffmpeg,
    },
    Png {
        dir: PathBuf,
    },
}

/// Writer shared between the GIF encoder and `FrameWriter`.
///
/// The encoder writes the GIF trailer when dropped and discards any
/// error there. The first io error is latched here instead and comes
/// back from `close`.
struct LatchedWriter<W> {
    shared: Arc<Mutex<Latched<W>>>,
}

struct Latched<W> {
    inner: W,
    error: Option<io::Error>,
}

impl<W> Clone for LatchedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<W: Write> LatchedWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Latched { inner, error: None })),
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Latched<W>>> {
        self.shared
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output lock poisoned"))
    }

    /// Hand back the inner writer, or the first error any write hit.
    /// Every other handle must already be dropped.
    fn close(self) -> io::Result<W> {
        let latched = Arc::try_unwrap(self.shared)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output still in use"))?
            .into_inner()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output lock poisoned"))?;
        match latched.error {
            Some(e) => Err(e),
            None => Ok(latched.inner),
        }
    }
}

impl<W: Write> Latched<W> {
    fn check<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if let Err(e) = &result {
            if self.error.is_none() {
                self.error = Some(io::Error::new(e.kind(), e.to_string()));
            }
        }
        result
    }
}

impl<W: Write> Write for LatchedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut latched = self.lock()?;
        if latched.error.is_some() {
            return Err(io::Error::new(io::ErrorKind::Other, "earlier write failed"));
        }
        let result = latched.inner.write(buf);
        latched.check(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut latched = self.lock()?;
        let result = latched.inner.flush();
        latched.check(result)
    }
}

/// A running `ffmpeg`. Reaped on every path, including drop.
struct Ffmpeg {
    child: Option<Child>,
}

impl Ffmpeg {
    /// Wait for a clean exit after stdin has been closed.
    fn wait(mut self) -> Result<(), ExportError> {
        let Some(child) = self.child.take() else {
            return Ok(());
        };
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ExportError::Encoder(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    /// Stop the process after `cause` broke the stream, keeping its stderr.
    fn abort(&mut self, cause: io::Error) -> ExportError {
        let Some(mut child) = self.child.take() else {
            return ExportError::Io(cause);
        };
        // Already exited if the pipe broke; kill is then a no-op.
        let _ = child.kill();
        let status = match child.wait() {
            Ok(status) => status.to_string(),
            Err(e) => format!("unknown status ({})", e),
        };
        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        ExportError::Encoder(format!(
            "ffmpeg stream failed ({}), exited with {}: {}",
            cause,
            status,
            stderr.trim()
        ))
    }
}

impl Drop for Ffmpeg {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!("abandoning ffmpeg process {}", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Streaming exporter. Accepts frames one at a time in step order.
pub struct FrameWriter {
    path: PathBuf,
    format: VideoFormat,
    settings: ExportSettings,
    height: usize,
    width: usize,
    encoder: Encoder,
    seen: usize,
    written: usize,
}

impl FrameWriter {
    /// Open an output for `height`×`width` frames.
    pub fn open(
        path: &Path,
        height: usize,
        width: usize,
        settings: ExportSettings,
    ) -> Result<Self, ExportError> {
        let format = VideoFormat::from_path(path)?;
        if format.is_file() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let encoder = match format {
            VideoFormat::Y4m => {
                let file = BufWriter::new(File::create(path)?);
                Encoder::Y4m(Y4mWriter::new(file, width, height, settings.fps)?)
            }
            VideoFormat::Gif => {
                let output = LatchedWriter::new(BufWriter::new(File::create(path)?));
                let mut encoder = GifEncoder::new(output.clone());
                encoder.set_repeat(Repeat::Infinite)?;
                Encoder::Gif {
                    encoder,
                    output,
                    delay: Delay::from_numer_denom_ms(1000, settings.fps),
                }
            }
            VideoFormat::Mp4 => spawn_ffmpeg(path, width, height, settings.fps)?,
            VideoFormat::PngSequence => {
                fs::create_dir_all(path)?;
                Encoder::Png {
                    dir: path.to_path_buf(),
                }
            }
        };

        debug!(
            "opened {:?} writer at {} ({}x{}, {} fps)",
            format,
            path.display(),
            height,
            width,
            settings.fps
        );

        Ok(Self {
            path: path.to_path_buf(),
            format,
            settings,
            height,
            width,
            encoder,
            seen: 0,
            written: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }

    fn check_shape(&self, index: usize, frame: &Grid) -> Result<(), ExportError> {
        if frame.shape() != (self.height, self.width) {
            return Err(ExportError::Shape {
                index,
                got_h: frame.height(),
                got_w: frame.width(),
                h: self.height,
                w: self.width,
            });
        }
        Ok(())
    }

    fn encode(&mut self, grid: &Grid) -> Result<(), ExportError> {
        let luma = frame_to_luma(grid);
        let (w, h) = (self.width as u32, self.height as u32);
        match &mut self.encoder {
            Encoder::Y4m(writer) => writer.write_frame(&luma)?,
            Encoder::Mp4 { stream, ffmpeg } => {
                if let Err(e) = stream.write_frame(&luma) {
                    return Err(ffmpeg.abort(e));
                }
            }
            Encoder::Gif { encoder, delay, .. } => {
                let rgba = RgbaImage::from_fn(w, h, |x, y| {
                    let v = luma[(y * w + x) as usize];
                    Rgba([v, v, v, 255])
                });
                encoder.encode_frame(Frame::from_parts(rgba, 0, 0, *delay))?;
            }
            Encoder::Png { dir } => {
                let path = dir.join(format!("frame_{:06}.png", self.written));
                let img = GrayImage::from_raw(w, h, luma).ok_or_else(|| {
                    ExportError::Encoder("luma buffer does not match frame size".to_string())
                })?;
                img.save_with_format(&path, ImageFormat::Png)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Close the output and report what was written.
    pub fn finish(self) -> Result<ExportSummary, ExportError> {
        match self.encoder {
            Encoder::Y4m(writer) => {
                writer.into_inner()?.into_inner().map_err(|e| e.into_error())?;
            }
            Encoder::Gif { encoder, output, .. } => {
                // Dropping the encoder writes the trailer into `output`.
                drop(encoder);
                output.close()?.into_inner().map_err(|e| e.into_error())?;
            }
            Encoder::Mp4 { stream, mut ffmpeg } => {
                // Closing stdin ends the stream; ffmpeg then finalises the file.
                let stdin = stream
                    .into_inner()
                    .and_then(|w| w.into_inner().map_err(|e| e.into_error()));
                match stdin {
                    Ok(stdin) => drop(stdin),
                    Err(e) => return Err(ffmpeg.abort(e)),
                }
                ffmpeg.wait()?;
            }
            Encoder::Png { .. } => {}
        }

        info!(
            "exported {} of {} frames to {} ({:?}, {} fps)",
            self.written,
            self.seen,
            self.path.display(),
            self.format,
            self.settings.fps
        );

        Ok(ExportSummary {
            path: self.path,
            format: self.format,
            frames_seen: self.seen,
            frames_written: self.written,
        })
    }
}

impl FrameSink for FrameWriter {
    type Error = ExportError;

    fn accept(&mut self, index: usize, frame: &Grid) -> Result<(), ExportError> {
        self.check_shape(index, frame)?;
        self.seen += 1;
        if self.settings.keeps(index) {
            self.encode(frame)?;
        }
        Ok(())
    }
}

fn spawn_ffmpeg(path: &Path, width: usize, height: usize, fps: u32) -> Result<Encoder, ExportError> {
    let mut child = Command::new("ffmpeg")
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-f")
        .arg("yuv4mpegpipe")
        .arg("-i")
        .arg("-")
        .arg("-vf")
        .arg("pad=ceil(iw/2)*2:ceil(ih/2)*2")
        .arg("-c:v")
        .arg("libx264")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ExportError::Encoder(format!("failed to run ffmpeg: {}. Is ffmpeg installed?", e)))?;

    let stdin = child.stdin.take();
    let mut ffmpeg = Ffmpeg { child: Some(child) };
    let Some(stdin) = stdin else {
        return Err(ffmpeg.abort(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "ffmpeg stdin unavailable",
        )));
    };
    match Y4mWriter::new(BufWriter::new(stdin), width, height, fps) {
        Ok(stream) => Ok(Encoder::Mp4 { stream, ffmpeg }),
        Err(e) => Err(ffmpeg.abort(e)),
    }
}

/// Buffered export of a completed history.
///
/// An empty history writes nothing and reports zero frames.
pub fn export_history(
    history: &FrameHistory,
    path: &Path,
    settings: ExportSettings,
) -> Result<ExportSummary, ExportError> {
    let Some((height, width)) = history.shape() else {
        return Ok(ExportSummary {
            path: path.to_path_buf(),
            format: VideoFormat::from_path(path)?,
            frames_seen: 0,
            frames_written: 0,
        });
    };

    let mut writer = FrameWriter::open(path, height, width, settings)?;
    match settings.keep {
        Some(parity) => {
            for (i, frame) in history.select_parity(parity) {
                writer.check_shape(i, frame)?;
                writer.encode(frame)?;
            }
            writer.seen = history.len();
        }
        None => {
            for (i, frame) in history.iter().enumerate() {
                writer.accept(i, frame)?;
            }
        }
    }
    writer.finish()
}
