//! Everything needed to turn a media file into [DecodedFrame]s on a dedicated
//! thread.
//!
//! The actual demuxing and decoding is hidden behind three small traits
//! ([MediaBackend], [MediaSource] and [FrameDecoder]) so that [decode_loop]
//! doesn't care whether it's talking to FFmpeg ([ffmpeg::FFmpegBackend]) or to
//! something synthetic.

pub mod ffmpeg;

mod decode_loop;
#[cfg(test)]
pub(crate) mod synthetic;

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::frame::{DecodedFrame, Dimensions, FrameStatus};

pub use decode_loop::*;

/// Opens [MediaSource]s. This is the only part of a backend that has to be
/// [Send], the source and decoder are created on (and never leave) the decode
/// thread.
pub trait MediaBackend {
    type Source: MediaSource;

    /// Open the file at `path` (only its metadata has to be read yet).
    fn open(&self, path: &Path) -> Result<Self::Source, MediaError>;
}

/// An opened container that compressed units can be read out of.
pub trait MediaSource {
    /// One compressed unit (e.g. a packet).
    type Unit;
    type Decoder: FrameDecoder<Unit = Self::Unit>;

    /// The video stream the backend thinks is best, or [None] if there are no
    /// video streams.
    fn best_video_stream(&self) -> Option<StreamInfo>;

    /// Open a decoder for one of this source's streams.
    fn open_decoder(&self, stream: &StreamInfo) -> Result<Self::Decoder, MediaError>;

    /// Read the next compressed unit, along with the index of the stream it
    /// belongs to. `Ok(None)` means the source has been read to the end.
    fn read_unit(&mut self) -> Result<Option<(usize, Self::Unit)>, MediaError>;
}

/// Turns compressed units into frames.
///
/// Decoders may buffer: one unit can produce zero or more frames, so after
/// [Self::send_unit] the caller keeps calling [Self::receive_frame] until it
/// reports [Receive::NeedMoreInput].
pub trait FrameDecoder {
    type Unit;

    /// The size of the frames this decoder produces, if already known.
    fn dimensions(&self) -> Option<Dimensions>;

    /// Submit one compressed unit.
    fn send_unit(&mut self, unit: &Self::Unit) -> Result<(), MediaError>;

    /// Tell the decoder no more units are coming so it releases whatever it is
    /// still holding on to.
    fn send_end_of_stream(&mut self) -> Result<(), MediaError>;

    /// Write the next decoded frame into `frame` (replacing its content in
    /// place). `frame` is only touched when [Receive::Frame] is returned.
    fn receive_frame(&mut self, frame: &mut DecodedFrame) -> Receive;
}

/// The outcome of [FrameDecoder::receive_frame].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receive {
    /// A frame was written.
    Frame,
    /// Submit another unit first. This is flow control, not an error.
    NeedMoreInput,
    /// The decoder has been fully drained after [FrameDecoder::send_end_of_stream].
    EndOfStream,
    /// The decoder failed to produce a frame.
    Failed(FrameStatus),
}

/// What a backend knows about a stream before a decoder is opened for it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// The stream's index in its container.
    pub index: usize,
    pub codec: String,
    /// Nominal frames per second.
    pub frame_rate: Option<f64>,
    pub duration: Option<Duration>,
    /// The number of frames the container claims the stream has.
    pub frame_count: Option<u64>,
}

impl Display for StreamInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "stream #{} ({})", self.index, self.codec)?;
        if let Some(frame_rate) = self.frame_rate {
            write!(f, ", {frame_rate:.3} fps")?;
        }
        if let Some(duration) = self.duration {
            write!(f, ", {:.3}s", duration.as_secs_f64())?;
        }
        if let Some(frame_count) = self.frame_count {
            write!(f, ", {frame_count} frames")?;
        }
        Ok(())
    }
}

/// An error reported by a media backend: the backend's error code (`0` if it
/// has none) and a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct MediaError {
    pub code: i32,
    pub message: String,
}

impl MediaError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&MediaError> for FrameStatus {
    fn from(err: &MediaError) -> Self {
        FrameStatus::failed(err.code, err.message.clone())
    }
}

/// Why [decode_loop] couldn't run to one of its normal ends ([DecodeEnd]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Failed to open `{}`: {source}", path.display())]
    Open { path: PathBuf, source: MediaError },
    #[error("`{}` has no video stream.", .0.display())]
    NoVideoStream(PathBuf),
    #[error("Failed to open a decoder for stream #{stream}: {source}")]
    OpenDecoder { stream: usize, source: MediaError },
    #[error("Failed to read from the source {failures} times in a row, last: {last}")]
    Read { failures: usize, last: MediaError },
}
