//! Append-only frame log — binary protobuf.
//!
//! Storage format: length-prefixed protobuf frames.
//!   [4-byte LE length][ProtoFrame bytes][4-byte LE length][ProtoFrame bytes]...
//!
//! Rules:
//!   - Strict append only, frame indices 0, 1, 2, ... with no gaps
//!   - fsync on finish
//!   - frames larger than the reader accepts are refused at append
//!   - Loaded frames must satisfy the engine's frame invariants

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use prost::Message;
use thiserror::Error;

use nca_engine::error::EngineError;
use nca_engine::grid::Grid;
use nca_engine::history::{FrameHistory, FrameSink};

use crate::proto_bridge::{frame_to_proto, proto_to_frame};
use crate::proto_types::ProtoFrame;

/// Upper bound on a single encoded frame (4096×4096 cells plus framing).
const MAX_FRAME_BYTES: usize = 160 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FrameLogError {
    #[error("frame log io error: {0}")]
    Io(#[from] io::Error),

    #[error("index violation in frame log: expected {expected}, got {got}")]
    Sequence { expected: usize, got: usize },

    #[error("corrupt frame log: {0}")]
    Corrupt(String),

    #[error("frame {index} encodes to {len} bytes, limit is {max}")]
    TooLarge { index: usize, len: usize, max: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Writer half of the frame log.
pub struct FrameLog {
    path: PathBuf,
    writer: BufWriter<File>,
    next_index: usize,
}

impl FrameLog {
    /// Create (or truncate) a log at `path`.
    pub fn create(path: &Path) -> Result<Self, FrameLogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_index: 0,
        })
    }

    /// Append frame `index`. Indices must arrive as 0, 1, 2, ...
    pub fn append(&mut self, index: usize, grid: &Grid) -> Result<(), FrameLogError> {
        if index != self.next_index {
            return Err(FrameLogError::Sequence {
                expected: self.next_index,
                got: index,
            });
        }

        let proto = frame_to_proto(index, grid);
        let len = proto.encoded_len();
        if len > MAX_FRAME_BYTES {
            return Err(FrameLogError::TooLarge {
                index,
                len,
                max: MAX_FRAME_BYTES,
            });
        }

        // Bounded above, so the prefix always fits in a u32.
        self.writer.write_all(&(len as u32).to_le_bytes())?;
        self.writer.write_all(&proto.encode_to_vec())?;

        self.next_index += 1;
        Ok(())
    }

    /// Number of frames appended so far.
    pub fn len(&self) -> usize {
        self.next_index
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and fsync. Returns the number of frames written.
    pub fn finish(mut self) -> Result<usize, FrameLogError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.next_index)
    }

    /// Write a whole history to `path`.
    pub fn write_history(path: &Path, history: &FrameHistory) -> Result<usize, FrameLogError> {
        let mut log = Self::create(path)?;
        for (i, frame) in history.iter().enumerate() {
            log.append(i, frame)?;
        }
        log.finish()
    }

    /// Read every raw frame, validating framing and index order.
    pub fn load_all(path: &Path) -> Result<Vec<ProtoFrame>, FrameLogError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut frames = Vec::new();
        let mut len_buf = [0u8; 4];

        loop {
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len == 0 || len > MAX_FRAME_BYTES {
                return Err(FrameLogError::Corrupt(format!(
                    "invalid frame length {} at frame {}",
                    len,
                    frames.len()
                )));
            }

            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).map_err(|e| {
                FrameLogError::Corrupt(format!("truncated frame {}: {}", frames.len(), e))
            })?;

            let frame = ProtoFrame::decode(buf.as_slice()).map_err(|e| {
                FrameLogError::Corrupt(format!("protobuf decode error: {}", e))
            })?;

            if frame.index as usize != frames.len() {
                return Err(FrameLogError::Sequence {
                    expected: frames.len(),
                    got: frame.index as usize,
                });
            }
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Load a log back into a validated `FrameHistory`.
    pub fn load_history(path: &Path) -> Result<FrameHistory, FrameLogError> {
        let grids = Self::load_all(path)?
            .iter()
            .map(|p| proto_to_frame(p).map(|(_, g)| g))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FrameHistory::from_frames(grids)?)
    }
}

impl FrameSink for FrameLog {
    type Error = FrameLogError;

    fn accept(&mut self, index: usize, frame: &Grid) -> Result<(), FrameLogError> {
        self.append(index, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto_types::ProtoGrid;
    use nca_engine::ENGINE_VERSION;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("nca_frame_log_tests");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn out_of_order_append_rejected() {
        let mut log = FrameLog::create(&temp_path("order.log")).unwrap();
        log.append(0, &Grid::zeros(2, 2)).unwrap();
        let err = log.append(2, &Grid::zeros(2, 2)).unwrap_err();
        assert!(matches!(err, FrameLogError::Sequence { expected: 1, got: 2 }));
    }

    #[test]
    fn empty_log_loads_empty_history() {
        let path = temp_path("empty.log");
        let log = FrameLog::create(&path).unwrap();
        assert_eq!(log.finish().unwrap(), 0);
        assert!(FrameLog::load_history(&path).unwrap().is_empty());
    }

    #[test]
    fn truncated_tail_is_corrupt() {
        let path = temp_path("truncated.log");
        let mut log = FrameLog::create(&path).unwrap();
        log.append(0, &Grid::zeros(3, 3)).unwrap();
        log.finish().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 5);
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            FrameLog::load_all(&path).unwrap_err(),
            FrameLogError::Corrupt(_)
        ));
    }

    #[test]
    fn zero_length_frame_is_corrupt() {
        let path = temp_path("zero_len.log");
        fs::write(&path, 0u32.to_le_bytes()).unwrap();
        assert!(matches!(
            FrameLog::load_all(&path).unwrap_err(),
            FrameLogError::Corrupt(_)
        ));
    }

    #[test]
    fn out_of_range_frame_fails_invariants() {
        let path = temp_path("range.log");
        let mut g = Grid::zeros(1, 2);
        g.set(0, 1, 3.0);
        let mut log = FrameLog::create(&path).unwrap();
        log.append(0, &g).unwrap();
        log.finish().unwrap();
        assert!(matches!(
            FrameLog::load_history(&path).unwrap_err(),
            FrameLogError::Engine(EngineError::Invariant(_))
        ));
    }

    #[test]
    fn oversized_frame_rejected_before_write() {
        let path = temp_path("oversized.log");
        let mut log = FrameLog::create(&path).unwrap();
        let err = log.append(0, &Grid::zeros(4600, 4600)).unwrap_err();
        assert!(matches!(
            err,
            FrameLogError::TooLarge { index: 0, max: MAX_FRAME_BYTES, .. }
        ));

        // Nothing was written and the log still accepts frame 0.
        log.append(0, &Grid::zeros(2, 2)).unwrap();
        assert_eq!(log.finish().unwrap(), 1);
        assert_eq!(FrameLog::load_history(&path).unwrap().len(), 1);
    }

    #[test]
    fn overflowing_stored_shape_is_an_error() {
        let path = temp_path("huge_shape.log");
        let frame = ProtoFrame {
            index: 0,
            engine_version: ENGINE_VERSION,
            grid: Some(ProtoGrid {
                height: 1 << 33,
                width: 1 << 33,
                cells: vec![],
            }),
        };
        let buf = frame.encode_to_vec();
        let mut bytes = (buf.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&buf);
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            FrameLog::load_history(&path).unwrap_err(),
            FrameLogError::Engine(EngineError::Shape(_))
        ));
    }
}
