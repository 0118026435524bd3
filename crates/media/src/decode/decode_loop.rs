//! The producer side of the frame queue. See [decode_loop].

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use util::channels::PushError;
use util::{debug_log_error, debug_log_info, debug_log_warning};

use super::{DecodeError, FrameDecoder, MediaBackend, MediaSource, Receive, StreamInfo};
use crate::FrameQueue;
use crate::frame::DecodedFrame;

/// After this many failed reads in a row the source is considered broken.
pub const MAX_CONSECUTIVE_READ_FAILURES: usize = 32;

/// After this many failed frames in a row, without a frame or a request for
/// input in between, the current unit (or the end-of-stream flush) is given up
/// on.
const MAX_CONSECUTIVE_FRAME_FAILURES: usize = 32;

/// How often a push that is stuck on a full queue checks whether the queue
/// still has an owner besides the decode thread.
const ORPHAN_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Why [decode_loop] stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEnd {
    /// Every frame of the source was pushed.
    EndOfStream,
    /// The queue was closed (playback was stopped).
    QueueClosed,
    /// Every owner of the queue went away.
    QueueDropped,
}

/// What [decode_loop] did.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport {
    pub stream: StreamInfo,
    pub end: DecodeEnd,
    pub frames_pushed: u64,
    /// Units that belonged to the chosen video stream.
    pub units_decoded: u64,
    /// Units that belonged to other streams.
    pub units_skipped: u64,
    pub read_failures: u64,
    pub submit_failures: u64,
    pub frame_failures: u64,
}

/// Decode the best video stream of the file at `path` and push every frame onto
/// `queue`, in decode order, until one of these happens:
///
/// - The source has been read to the end and the decoder has been drained
///   ([DecodeEnd::EndOfStream]).
/// - The queue gets closed ([DecodeEnd::QueueClosed]).
/// - Nothing but this function holds the queue anymore
///   ([DecodeEnd::QueueDropped]).
/// - The source, its video stream, or a decoder for it can't be opened, or
///   reading fails [MAX_CONSECUTIVE_READ_FAILURES] times in a row (an [Err]).
///
/// Units that fail to read or submit, and frames the decoder fails to produce,
/// are logged, counted in the [DecodeReport], and skipped.
///
/// The only place this blocks (other than inside the backend) is pushing onto a
/// full queue. Whichever way this returns, the queue is closed (if it still
/// exists) so the consumer knows no more frames are coming.
pub fn decode_loop<B: MediaBackend>(
    backend: &B,
    path: &Path,
    queue: Weak<FrameQueue>,
) -> Result<DecodeReport, DecodeError> {
    let queue = CloseOnDrop(queue);

    let result = decode(backend, path, &queue.0);

    match &result {
        Ok(report) => debug_log_info!(
            "Decoding `{}` stopped ({:?}) after {} frames.",
            path.display(),
            report.end,
            report.frames_pushed
        ),
        Err(e) => debug_log_error!("Decoding `{}` failed: {e}", path.display()),
    }

    result
}

fn decode<B: MediaBackend>(
    backend: &B,
    path: &Path,
    queue: &Weak<FrameQueue>,
) -> Result<DecodeReport, DecodeError> {
    let mut source = backend.open(path).map_err(|source| DecodeError::Open {
        path: path.to_owned(),
        source,
    })?;

    let stream = source
        .best_video_stream()
        .ok_or_else(|| DecodeError::NoVideoStream(path.to_owned()))?;

    let mut decoder = source
        .open_decoder(&stream)
        .map_err(|source| DecodeError::OpenDecoder {
            stream: stream.index,
            source,
        })?;

    match decoder.dimensions() {
        Some(dimensions) => debug_log_info!("Decoding {stream}, {dimensions}."),
        None => debug_log_info!("Decoding {stream}."),
    }

    let mut report = DecodeReport {
        stream,
        end: DecodeEnd::EndOfStream,
        frames_pushed: 0,
        units_decoded: 0,
        units_skipped: 0,
        read_failures: 0,
        submit_failures: 0,
        frame_failures: 0,
    };

    // Decoders write into this in place, then it gets moved onto the queue.
    let mut frame = DecodedFrame::empty();
    let mut consecutive_read_failures = 0;

    loop {
        let unit = match source.read_unit() {
            Ok(Some(unit)) => unit,
            Ok(None) => break,
            Err(e) => {
                report.read_failures += 1;
                consecutive_read_failures += 1;
                debug_log_warning!("Failed to read a unit: {e}");

                if consecutive_read_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                    return Err(DecodeError::Read {
                        failures: consecutive_read_failures,
                        last: e,
                    });
                }
                continue;
            }
        };
        consecutive_read_failures = 0;

        let (stream_index, unit) = unit;
        if stream_index != report.stream.index {
            report.units_skipped += 1;
            continue;
        }
        report.units_decoded += 1;

        if let Err(e) = decoder.send_unit(&unit) {
            report.submit_failures += 1;
            debug_log_warning!("Failed to submit a unit to the decoder: {e}");
            continue;
        }

        if let ControlFlow::Break(end) = drain(&mut decoder, queue, &mut frame, &mut report) {
            report.end = end;
            return Ok(report);
        }
    }

    // Out of input, flush whatever the decoder is still holding.
    if let Err(e) = decoder.send_end_of_stream() {
        debug_log_warning!("Failed to signal the end of the stream to the decoder: {e}");
    }

    report.end = match drain(&mut decoder, queue, &mut frame, &mut report) {
        ControlFlow::Break(end) => end,
        ControlFlow::Continue(()) => DecodeEnd::EndOfStream,
    };

    Ok(report)
}

/// Receive and push frames until the decoder wants more input
/// ([ControlFlow::Continue]) or decoding has to stop ([ControlFlow::Break]).
fn drain<D: FrameDecoder>(
    decoder: &mut D,
    queue: &Weak<FrameQueue>,
    frame: &mut DecodedFrame,
    report: &mut DecodeReport,
) -> ControlFlow<DecodeEnd> {
    let mut consecutive_failures = 0;

    loop {
        match decoder.receive_frame(frame) {
            Receive::Frame => {
                consecutive_failures = 0;
                push(queue, frame.take())?;
                report.frames_pushed += 1;
            }
            Receive::NeedMoreInput => return ControlFlow::Continue(()),
            Receive::EndOfStream => return ControlFlow::Break(DecodeEnd::EndOfStream),
            Receive::Failed(status) => {
                report.frame_failures += 1;
                consecutive_failures += 1;
                debug_log_warning!("The decoder failed to produce a frame: {status}");

                // Frames buffered behind the failed one are still worth asking
                // for, unless the decoder is stuck failing.
                if consecutive_failures >= MAX_CONSECUTIVE_FRAME_FAILURES {
                    debug_log_error!("The decoder keeps failing, skipping what it still holds.");
                    return ControlFlow::Continue(());
                }
            }
        }
    }
}

/// Push `frame`, waiting for space as long as somebody besides the decode
/// thread still owns the queue.
fn push(queue: &Weak<FrameQueue>, mut frame: DecodedFrame) -> ControlFlow<DecodeEnd> {
    let Some(queue) = queue.upgrade() else {
        return ControlFlow::Break(DecodeEnd::QueueDropped);
    };

    loop {
        match queue.push_timeout(frame, ORPHAN_CHECK_INTERVAL) {
            Ok(()) => return ControlFlow::Continue(()),
            Err(PushError::Closed(_)) => return ControlFlow::Break(DecodeEnd::QueueClosed),
            Err(e) => {
                // The upgraded reference above is the only one left.
                if Arc::strong_count(&queue) == 1 {
                    return ControlFlow::Break(DecodeEnd::QueueDropped);
                }
                frame = e.into_inner();
            }
        }
    }
}

/// Closes the queue (if it's still around) when dropped.
struct CloseOnDrop(Weak<FrameQueue>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if let Some(queue) = self.0.upgrade() {
            queue.close();
        }
    }
}
