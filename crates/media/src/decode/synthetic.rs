//! A [MediaBackend] that makes frames up, for testing the decode loop and the
//! whole pipeline without media files.

use std::collections::VecDeque;
use std::path::Path;
use std::thread;
use std::time::Duration;

use super::{FrameDecoder, MediaBackend, MediaError, MediaSource, Receive, StreamInfo};
use crate::frame::{DecodedFrame, Dimensions, FrameBuffer, FrameStatus, PixelFormat, Plane};

/// The index of the video stream. Interleaved "audio" units use
/// `VIDEO_STREAM + 1`.
pub(crate) const VIDEO_STREAM: usize = 0;

/// Produces `frames` frames numbered `0..frames` (their [pts](FrameBuffer::pts)
/// is their number).
#[derive(Debug, Clone)]
pub(crate) struct SyntheticBackend {
    pub frames: u64,
    pub dimensions: Dimensions,
    pub format: PixelFormat,
    /// Put a unit from another stream after every video unit.
    pub interleaved_audio: bool,
    /// How many units the decoder holds on to before it emits a frame.
    pub decoder_delay: usize,
    /// Read attempts (counting from 1) that fail.
    pub failing_reads: Vec<u64>,
    /// Every read fails.
    pub broken_reads: bool,
    /// Frame numbers the decoder fails to produce.
    pub failing_frames: Vec<u64>,
    /// Refuse new units while a frame is ready to be received (`EAGAIN`), the
    /// way FFmpeg decoders do.
    pub refuse_input_when_ready: bool,
    /// How long every read takes.
    pub read_delay: Duration,
    pub open_error: Option<MediaError>,
    pub has_video: bool,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self {
            frames: 10,
            dimensions: (4, 2).into(),
            format: PixelFormat::Yuv420p,
            interleaved_audio: false,
            decoder_delay: 0,
            failing_reads: Vec::new(),
            broken_reads: false,
            failing_frames: Vec::new(),
            refuse_input_when_ready: false,
            read_delay: Duration::ZERO,
            open_error: None,
            has_video: true,
        }
    }
}

impl MediaBackend for SyntheticBackend {
    type Source = SyntheticSource;

    fn open(&self, _path: &Path) -> Result<Self::Source, MediaError> {
        if let Some(e) = &self.open_error {
            return Err(e.clone());
        }

        Ok(SyntheticSource {
            config: self.clone(),
            next_frame: 0,
            audio_due: false,
            read_attempts: 0,
        })
    }
}

pub(crate) struct SyntheticSource {
    config: SyntheticBackend,
    next_frame: u64,
    audio_due: bool,
    read_attempts: u64,
}

impl MediaSource for SyntheticSource {
    type Unit = u64;
    type Decoder = SyntheticDecoder;

    fn best_video_stream(&self) -> Option<StreamInfo> {
        self.config.has_video.then(|| StreamInfo {
            index: VIDEO_STREAM,
            codec: "synthetic".to_owned(),
            frame_rate: Some(25.0),
            duration: Some(Duration::from_millis(self.config.frames.saturating_mul(40))),
            frame_count: Some(self.config.frames),
        })
    }

    fn open_decoder(&self, stream: &StreamInfo) -> Result<Self::Decoder, MediaError> {
        assert_eq!(stream.index, VIDEO_STREAM);

        Ok(SyntheticDecoder {
            config: self.config.clone(),
            pending: VecDeque::new(),
            end_of_stream: false,
        })
    }

    fn read_unit(&mut self) -> Result<Option<(usize, u64)>, MediaError> {
        thread::sleep(self.config.read_delay);

        self.read_attempts += 1;
        if self.config.broken_reads || self.config.failing_reads.contains(&self.read_attempts) {
            return Err(MediaError::new(-5, "synthetic read failure"));
        }

        if self.audio_due {
            self.audio_due = false;
            return Ok(Some((VIDEO_STREAM + 1, u64::MAX)));
        }

        if self.next_frame >= self.config.frames {
            return Ok(None);
        }

        let frame = self.next_frame;
        self.next_frame += 1;
        self.audio_due = self.config.interleaved_audio;

        Ok(Some((VIDEO_STREAM, frame)))
    }
}

pub(crate) struct SyntheticDecoder {
    config: SyntheticBackend,
    pending: VecDeque<u64>,
    end_of_stream: bool,
}

impl FrameDecoder for SyntheticDecoder {
    type Unit = u64;

    fn dimensions(&self) -> Option<Dimensions> {
        Some(self.config.dimensions)
    }

    fn send_unit(&mut self, unit: &u64) -> Result<(), MediaError> {
        assert!(!self.end_of_stream, "unit sent after the end of the stream");
        if self.config.refuse_input_when_ready && self.pending.len() > self.config.decoder_delay {
            return Err(MediaError::new(-11, "Resource temporarily unavailable"));
        }
        self.pending.push_back(*unit);
        Ok(())
    }

    fn send_end_of_stream(&mut self) -> Result<(), MediaError> {
        self.end_of_stream = true;
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut DecodedFrame) -> Receive {
        let ready = self.pending.len() > self.config.decoder_delay
            || (self.end_of_stream && !self.pending.is_empty());

        if !ready {
            return if self.end_of_stream {
                Receive::EndOfStream
            } else {
                Receive::NeedMoreInput
            };
        }

        let Some(number) = self.pending.pop_front() else {
            return Receive::NeedMoreInput;
        };

        if self.config.failing_frames.contains(&number) {
            return Receive::Failed(FrameStatus::failed(-22, format!("frame {number} is corrupt")));
        }

        frame.replace_buffer(synthetic_buffer(
            self.config.dimensions,
            self.config.format,
            number,
        ));
        Receive::Frame
    }
}

/// A buffer whose pts and first byte are `number`.
pub(crate) fn synthetic_buffer(
    dimensions: Dimensions,
    format: PixelFormat,
    number: u64,
) -> FrameBuffer {
    let mut buffer = FrameBuffer::alloc(dimensions, format).unwrap_or_else(|_| {
        let plane = Plane::zeroed(dimensions.width() as usize, dimensions.height() as usize);
        FrameBuffer::from_planes(dimensions, format, vec![plane])
            .expect("unknown formats take any planes")
    });

    buffer.planes_mut()[0].data_mut()[0] = number as u8;
    buffer.with_pts(Some(number as i64))
}
