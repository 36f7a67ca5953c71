use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ParseErrorKind, Result, RtspError};

/// Number of ASCII digits in each frame-length prefix.
const LENGTH_PREFIX: usize = 5;

/// Reader over a framed MJPEG file.
///
/// The file is a concatenation of records, each a five-digit ASCII
/// decimal length `L` followed by exactly `L` bytes of JPEG data. There
/// is no trailer; end of file ends the stream.
///
/// A session owns its reader exclusively: it is created during SETUP,
/// consumed from the paced streamer thread, and dropped on TEARDOWN.
#[derive(Debug)]
pub struct MjpegReader {
    file: File,
    frame_number: u32,
}

impl MjpegReader {
    /// Open a framed MJPEG file.
    ///
    /// Fails with [`RtspError::FrameSourceUnavailable`], which the
    /// session answers with 404.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|_| RtspError::FrameSourceUnavailable(path))?;
        Ok(Self {
            file,
            frame_number: 0,
        })
    }

    /// Read the next frame.
    ///
    /// Returns an empty vector once the stream is exhausted; the frame
    /// counter only advances for frames actually read. A final record
    /// shorter than its declared length yields the bytes that were
    /// present.
    pub fn next_frame(&mut self) -> Result<Vec<u8>> {
        let mut prefix = [0u8; LENGTH_PREFIX];
        let got = read_up_to(&mut self.file, &mut prefix)?;
        if got == 0 {
            return Ok(Vec::new());
        }

        let length: usize = std::str::from_utf8(&prefix[..got])
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .ok_or(RtspError::Parse {
                kind: ParseErrorKind::InvalidFrameLength,
            })?;

        let mut frame = vec![0u8; length];
        let got = read_up_to(&mut self.file, &mut frame)?;
        frame.truncate(got);
        self.frame_number += 1;
        Ok(frame)
    }

    /// Count of frames yielded so far.
    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }
}

/// Read until `buf` is full or the file ends; returns the bytes filled.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
