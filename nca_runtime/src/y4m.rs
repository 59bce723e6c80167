//! YUV4MPEG2 writer for single-channel frames.
//!
//! Header: `YUV4MPEG2 W<w> H<h> F<fps>:1 Ip A1:1 Cmono\n`
//! Each frame: `FRAME\n` followed by `w * h` luma bytes, row-major.

use std::io::{self, Write};

pub struct Y4mWriter<W: Write> {
    out: W,
    frame_len: usize,
    frames: usize,
}

impl<W: Write> Y4mWriter<W> {
    /// Write the stream header.
    pub fn new(mut out: W, width: usize, height: usize, fps: u32) -> io::Result<Self> {
        writeln!(out, "YUV4MPEG2 W{} H{} F{}:1 Ip A1:1 Cmono", width, height, fps)?;
        Ok(Self {
            out,
            frame_len: width * height,
            frames: 0,
        })
    }

    pub fn write_frame(&mut self, luma: &[u8]) -> io::Result<()> {
        if luma.len() != self.frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("y4m frame needs {} bytes, got {}", self.frame_len, luma.len()),
            ));
        }
        self.out.write_all(b"FRAME\n")?;
        self.out.write_all(luma)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
