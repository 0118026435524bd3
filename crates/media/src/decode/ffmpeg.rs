//! The FFmpeg [MediaBackend], able to decode almost any video file format.

use std::path::Path;
#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ctor::ctor;

use ffmpeg::codec::Context as FFmpegCodecContext;
use ffmpeg::codec::decoder::Video as FFmpegVideoDecoder;
use ffmpeg::format::Pixel as FFmpegPixelFormat;
use ffmpeg::format::context::Input as FFmpegInputFormatContext;
use ffmpeg::frame::Video as FFmpegVideoFrame;
use ffmpeg::media::Type as FFmpegMediaType;
use ffmpeg::software::scaling::Context as FFmpegScalingContext;
use ffmpeg::software::scaling::flag::Flags as FFmpegScalingFlags;
use ffmpeg::{Packet as FFmpegPacket, error::EAGAIN};
use ffmpeg_next as ffmpeg;

use super::{FrameDecoder, MediaBackend, MediaError, MediaSource, Receive, StreamInfo};
use crate::frame::{DecodedFrame, Dimensions, FrameBuffer, FrameStatus, PixelFormat, Plane};

/// Opens files with FFmpeg. FFmpeg itself is initialized when this crate is
/// loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FFmpegBackend;

impl MediaBackend for FFmpegBackend {
    type Source = FFmpegSource;

    fn open(&self, path: &Path) -> Result<Self::Source, MediaError> {
        // Only the container's metadata has been read after this, none of the
        // actual video data.
        let input = ffmpeg::format::input(path)?;
        Ok(FFmpegSource { input })
    }
}

/// An opened container (e.g. MP4, MKV).
pub struct FFmpegSource {
    input: FFmpegInputFormatContext,
}

impl MediaSource for FFmpegSource {
    type Unit = FFmpegPacket;
    type Decoder = FFmpegDecoder;

    fn best_video_stream(&self) -> Option<StreamInfo> {
        let stream = self.input.streams().best(FFmpegMediaType::Video)?;

        let fps = stream.avg_frame_rate();
        let frame_rate = (fps.numerator() > 0 && fps.denominator() > 0).then(|| f64::from(fps));

        let duration = (stream.duration() > 0)
            .then(|| stream.duration() as f64 * f64::from(stream.time_base()))
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        let frame_count = u64::try_from(stream.frames()).ok().filter(|&n| n > 0);

        Some(StreamInfo {
            index: stream.index(),
            codec: stream.parameters().id().name().to_owned(),
            frame_rate,
            duration,
            frame_count,
        })
    }

    fn open_decoder(&self, stream: &StreamInfo) -> Result<Self::Decoder, MediaError> {
        let stream = self.input.stream(stream.index).ok_or_else(|| {
            MediaError::new(0, format!("The source has no stream #{}.", stream.index))
        })?;

        let decoder = FFmpegCodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        Ok(FFmpegDecoder {
            decoder,
            decoded: FFmpegVideoFrame::empty(),
            converter: None,
        })
    }

    fn read_unit(&mut self) -> Result<Option<(usize, Self::Unit)>, MediaError> {
        let mut packet = FFmpegPacket::empty();

        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some((packet.stream(), packet))),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Decodes one video stream. Frames in a pixel format renderers can't draw are
/// converted to RGBA.
pub struct FFmpegDecoder {
    decoder: FFmpegVideoDecoder,
    decoded: FFmpegVideoFrame,
    converter: Option<RgbaConverter>,
}

impl FFmpegDecoder {
    /// Copy the last decoded frame out of FFmpeg's buffers.
    fn copy_decoded(&mut self) -> Result<FrameBuffer, FrameStatus> {
        let pts = self.decoded.timestamp().or(self.decoded.pts());

        let mut format = pixel_format(self.decoded.format());
        let mut frame = &self.decoded;

        if !format.is_renderable() {
            let converter = match self.converter.take() {
                Some(c) if c.accepts(frame) => c,
                _ => RgbaConverter::new(frame)?,
            };
            frame = self.converter.insert(converter).convert(frame)?;
            format = PixelFormat::Rgba;
        }

        let dimensions = Dimensions::new(frame.width(), frame.height()).ok_or_else(|| {
            FrameStatus::failed(0, format!("Decoded a {}x{} frame.", frame.width(), frame.height()))
        })?;

        let planes = (0..frame.planes())
            .map(|i| {
                Plane::copy_from(frame.data(i), frame.stride(i), frame.plane_height(i) as usize)
                    .ok_or_else(|| FrameStatus::failed(0, format!("Plane {i} is truncated.")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        FrameBuffer::from_planes(dimensions, format, planes)
            .map(|buffer| buffer.with_pts(pts))
            .map_err(|e| FrameStatus::failed(0, e.to_string()))
    }
}

impl FrameDecoder for FFmpegDecoder {
    type Unit = FFmpegPacket;

    fn dimensions(&self) -> Option<Dimensions> {
        Dimensions::new(self.decoder.width(), self.decoder.height())
    }

    fn send_unit(&mut self, unit: &Self::Unit) -> Result<(), MediaError> {
        Ok(self.decoder.send_packet(unit)?)
    }

    fn send_end_of_stream(&mut self) -> Result<(), MediaError> {
        Ok(self.decoder.send_eof()?)
    }

    fn receive_frame(&mut self, frame: &mut DecodedFrame) -> Receive {
        match self.decoder.receive_frame(&mut self.decoded) {
            Ok(()) => {}
            Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => {
                return Receive::NeedMoreInput;
            }
            Err(ffmpeg::Error::Eof) => return Receive::EndOfStream,
            Err(e) => return Receive::Failed(FrameStatus::from(&MediaError::from(e))),
        }

        match self.copy_decoded() {
            Ok(buffer) => {
                frame.replace_buffer(buffer);
                Receive::Frame
            }
            Err(status) => Receive::Failed(status),
        }
    }
}

/// Converts frames of one (unrenderable) pixel format and size to RGBA.
struct RgbaConverter {
    scaler: FFmpegScalingContext,
    converted: FFmpegVideoFrame,
    input: (FFmpegPixelFormat, u32, u32),
}

impl RgbaConverter {
    fn new(frame: &FFmpegVideoFrame) -> Result<Self, FrameStatus> {
        let (format, width, height) = (frame.format(), frame.width(), frame.height());

        let scaler = FFmpegScalingContext::get(
            // Src. format:
            format,
            width,
            height,
            // Dest. format (same size):
            FFmpegPixelFormat::RGBA,
            width,
            height,
            FFmpegScalingFlags::BILINEAR,
        )
        .map_err(|e| FrameStatus::from(&MediaError::from(e)))?;

        Ok(Self {
            scaler,
            converted: FFmpegVideoFrame::empty(),
            input: (format, width, height),
        })
    }

    /// Whether `frame` has the format and size this converter was made for.
    fn accepts(&self, frame: &FFmpegVideoFrame) -> bool {
        self.input == (frame.format(), frame.width(), frame.height())
    }

    fn convert(&mut self, frame: &FFmpegVideoFrame) -> Result<&FFmpegVideoFrame, FrameStatus> {
        self.scaler
            .run(frame, &mut self.converted)
            .map_err(|e| FrameStatus::from(&MediaError::from(e)))?;
        Ok(&self.converted)
    }
}

impl From<ffmpeg::Error> for MediaError {
    fn from(err: ffmpeg::Error) -> Self {
        let message = err.to_string();
        Self::new(err.into(), message)
    }
}

fn pixel_format(format: FFmpegPixelFormat) -> PixelFormat {
    match format {
        FFmpegPixelFormat::YUV420P | FFmpegPixelFormat::YUVJ420P => PixelFormat::Yuv420p,
        FFmpegPixelFormat::YUV422P | FFmpegPixelFormat::YUVJ422P => PixelFormat::Yuv422p,
        FFmpegPixelFormat::NV12 => PixelFormat::Nv12,
        FFmpegPixelFormat::RGB24 => PixelFormat::Rgb24,
        FFmpegPixelFormat::RGBA => PixelFormat::Rgba,
        _ => PixelFormat::Unknown,
    }
}

/// Initializes FFmpeg. This happens when the [crate] is loaded.
///
/// You should never actually call this function.
#[ctor]
fn ffmpeg_init() {
    #[cfg(debug_assertions)]
    {
        static ALREADY_INIT: AtomicBool = AtomicBool::new(false);
        assert!(
            !ALREADY_INIT.swap(true, Ordering::SeqCst),
            "Tried to initialize FFmpeg twice."
        );
    }

    ffmpeg::init().expect("FFmpeg shouldn't fail to initialize.");
}
