//! Starting and stopping playback. See [PlaybackSession].

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use util::debug_log_info;
use util::drop_join_thread::{self, DropJoinHandle};

use crate::FrameQueue;
use crate::decode::{self, DecodeError, DecodeReport, MediaBackend};
use crate::present::{PresentStats, Presenter, Renderer, TickOutcome};

/// How playback is paced and buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often a frame is presented.
    pub tick_period: Duration,
    /// How many decoded frames can wait to be presented before decoding
    /// pauses.
    pub queue_capacity: usize,
}

impl SessionConfig {
    pub const DEFAULT_FPS: f64 = 25.0;
    pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

    /// The tick period for a frame rate. Returns [None] for rates that aren't
    /// positive and finite.
    pub fn period_for_fps(fps: f64) -> Option<Duration> {
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }

        let nanos = (1e9 / fps).round();
        (nanos >= 1.0 && nanos < u64::MAX as f64).then(|| Duration::from_nanos(nanos as u64))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(40),
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

type DecodeResult = Result<DecodeReport, DecodeError>;

/// One file being played: the decode thread, the queue, and the [Presenter].
///
/// Stopping happens in one order, whether it's asked for ([Self::shutdown]),
/// triggered by the renderer ([TickOutcome::ExitRequested]), or caused by
/// dropping the session: the presentation timer is stopped first (so nothing is
/// popped or drawn anymore), then the queue is closed (so a decode thread
/// waiting for space wakes up and stops). The decode thread is never forcibly
/// cancelled, it's joined once it notices.
#[derive(Debug)]
pub struct PlaybackSession {
    presenter: Presenter,

    // Dropped (joined) after `Drop::drop` has shut down the session.
    decode_thread: Option<DropJoinHandle<DecodeResult>>,
}

impl PlaybackSession {
    /// Start decoding `path` on a new thread and get ready to present it.
    pub fn start<B>(
        backend: B,
        path: impl Into<PathBuf>,
        config: SessionConfig,
    ) -> Result<Self, SessionError>
    where
        B: MediaBackend + Send + 'static,
    {
        let path = path.into();
        let queue = Arc::new(FrameQueue::new(config.queue_capacity));

        let decode_thread = {
            let queue = Arc::downgrade(&queue);
            drop_join_thread::spawn_named("decode", move || {
                decode::decode_loop(&backend, &path, queue)
            })?
        };

        debug_log_info!(
            "Playback started (a frame every {:?}, up to {} frames buffered).",
            config.tick_period,
            config.queue_capacity
        );

        Ok(Self {
            presenter: Presenter::new(queue, config.tick_period),
            decode_thread: Some(decode_thread),
        })
    }

    /// Stop the presentation timer, then close the queue. Calling this again
    /// does nothing.
    pub fn shutdown(&mut self) {
        if self.presenter.is_stopped() && self.queue().is_closed() {
            return;
        }

        self.presenter.stop();
        self.queue().close();

        debug_log_info!("Playback shut down.");
    }

    pub fn is_shut_down(&self) -> bool {
        self.presenter.is_stopped()
    }

    /// Tick the presenter (see [Presenter::tick]). Shuts the session down when
    /// the renderer asks to exit or when there's nothing left to present.
    pub fn tick<R: Renderer + ?Sized>(&mut self, renderer: Option<&mut R>) -> TickOutcome {
        let outcome = self.presenter.tick(renderer);
        self.after_tick(outcome);
        outcome
    }

    /// Like [Self::tick], but only if a tick is due at `now`.
    pub fn poll<R: Renderer + ?Sized>(
        &mut self,
        now: Instant,
        renderer: Option<&mut R>,
    ) -> Option<TickOutcome> {
        let outcome = self.presenter.poll(now, renderer)?;
        self.after_tick(outcome);
        Some(outcome)
    }

    fn after_tick(&mut self, outcome: TickOutcome) {
        if matches!(outcome, TickOutcome::ExitRequested | TickOutcome::Finished) {
            self.shutdown();
        }
    }

    /// How long until the next tick is due, or [None] once shut down.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.presenter.time_until_next_tick(now)
    }

    pub fn stats(&self) -> PresentStats {
        self.presenter.stats()
    }

    pub fn queue(&self) -> &Arc<FrameQueue> {
        self.presenter.queue()
    }

    /// Whether the decode thread has stopped (or has already been joined).
    pub fn is_decoder_finished(&self) -> bool {
        self.decode_thread
            .as_ref()
            .is_none_or(|thread| thread.is_finished())
    }

    /// Wait for the decode thread to stop and get its result. This doesn't shut
    /// the session down, so it waits until the whole file has been decoded
    /// (and presented, if the queue fills up) unless something else does.
    ///
    /// Returns [None] if the thread has already been joined.
    pub fn join_decoder(&mut self) -> Option<DecodeResult> {
        let thread = self.decode_thread.take()?;
        Some(thread.join().expect(DECODE_THREAD_PANIC_MSG))
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Something that went wrong starting a [PlaybackSession].
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to spawn the decode thread: {0}")]
    Spawn(#[from] io::Error),
}

const DECODE_THREAD_PANIC_MSG: &str = "The decode thread shouldn't panic.";

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::decode::DecodeEnd;
    use crate::decode::synthetic::SyntheticBackend;
    use crate::frame::{DecodedFrame, PixelFormat};
    use crate::present::{MockRenderer, RenderError};

    /// Remembers the pts of everything it draws.
    #[derive(Default)]
    struct RecordingRenderer {
        drawn: Vec<i64>,
    }

    impl Renderer for RecordingRenderer {
        fn set_target_size(&mut self, _width: u32, _height: u32) -> Result<(), RenderError> {
            Ok(())
        }

        fn exit_requested(&mut self) -> bool {
            false
        }

        fn draw(&mut self, frame: &DecodedFrame) -> Result<(), RenderError> {
            self.drawn.push(frame.pts().ok_or(RenderError::EmptyFrame)?);
            Ok(())
        }
    }

    fn config(queue_capacity: usize) -> SessionConfig {
        util::debug_log::disable();

        SessionConfig {
            tick_period: Duration::from_millis(1),
            queue_capacity,
        }
    }

    #[test]
    fn every_frame_is_drawn_once_in_order() {
        let backend = SyntheticBackend {
            frames: 125,
            decoder_delay: 2,
            interleaved_audio: true,
            read_delay: Duration::from_micros(300),
            ..Default::default()
        };
        let mut session = PlaybackSession::start(backend, "clip.mp4", config(8)).unwrap();
        let mut renderer = RecordingRenderer::default();

        loop {
            match session.tick(Some(&mut renderer)) {
                TickOutcome::Finished => break,
                TickOutcome::Idle => thread::sleep(Duration::from_micros(100)),
                TickOutcome::Drew => {}
                other => panic!("unexpected tick outcome {other:?}"),
            }
        }

        assert!(session.is_shut_down());
        assert_eq!(renderer.drawn, (0..125).collect::<Vec<_>>());

        let report = session.join_decoder().unwrap().unwrap();
        assert_eq!(report.end, DecodeEnd::EndOfStream);
        assert_eq!(report.frames_pushed, 125);
        assert_eq!(session.stats().drawn, 125);
        assert!(session.join_decoder().is_none());
    }

    #[test]
    fn exit_request_shuts_down_and_stops_the_decoder() {
        let backend = SyntheticBackend {
            frames: 10_000,
            ..Default::default()
        };
        let mut session = PlaybackSession::start(backend, "clip.mp4", config(2)).unwrap();

        let mut renderer = MockRenderer::new();
        renderer.expect_exit_requested().times(1).return_const(true);
        renderer.expect_draw().never();

        assert_eq!(session.tick(Some(&mut renderer)), TickOutcome::ExitRequested);
        assert!(session.is_shut_down());
        assert!(session.queue().is_closed());
        assert_eq!(session.tick(Some(&mut renderer)), TickOutcome::Stopped);

        let report = session.join_decoder().unwrap().unwrap();
        assert_eq!(report.end, DecodeEnd::QueueClosed);
        assert!(report.frames_pushed <= 2);
    }

    #[test]
    fn shutdown_races_with_pushes_without_hanging() {
        let start = Instant::now();

        for attempt in 0..50 {
            let backend = SyntheticBackend {
                frames: u64::MAX,
                ..Default::default()
            };
            let mut session = PlaybackSession::start(backend, "clip.mp4", config(4)).unwrap();

            thread::sleep(Duration::from_micros(attempt * 40));
            if attempt % 2 == 0 {
                session.shutdown();
                session.shutdown();
            }
            drop(session);
        }

        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn decode_errors_come_back_from_join() {
        let backend = SyntheticBackend {
            has_video: false,
            ..Default::default()
        };
        let mut session = PlaybackSession::start(backend, "audio.mp3", config(4)).unwrap();

        let result = session.join_decoder().unwrap();
        assert!(matches!(result, Err(DecodeError::NoVideoStream(_))));
        assert!(session.is_decoder_finished());

        let mut renderer = RecordingRenderer::default();
        assert_eq!(session.tick(Some(&mut renderer)), TickOutcome::Finished);
        assert!(session.is_shut_down());
    }

    #[test]
    fn unsupported_frames_are_reported_not_fatal() {
        let backend = SyntheticBackend {
            frames: 3,
            format: PixelFormat::Yuv422p,
            ..Default::default()
        };
        let mut session = PlaybackSession::start(backend, "clip.mp4", config(4)).unwrap();
        session.join_decoder().unwrap().unwrap();

        let mut renderer = MockRenderer::new();
        renderer.expect_exit_requested().return_const(false);
        renderer
            .expect_draw()
            .times(3)
            .returning(|frame| Err(RenderError::UnsupportedFormat(frame.format().unwrap())));

        for _ in 0..3 {
            assert_eq!(session.tick(Some(&mut renderer)), TickOutcome::DrawFailed);
        }
        assert_eq!(session.tick(Some(&mut renderer)), TickOutcome::Finished);
        assert_eq!(session.stats().draw_failures, 3);
    }

    #[test]
    fn fps_to_period() {
        assert_eq!(
            SessionConfig::period_for_fps(25.0),
            Some(Duration::from_millis(40))
        );
        assert_eq!(SessionConfig::period_for_fps(0.0), None);
        assert_eq!(SessionConfig::period_for_fps(-1.0), None);
        assert_eq!(SessionConfig::period_for_fps(f64::NAN), None);
        assert_eq!(
            SessionConfig::default().tick_period,
            SessionConfig::period_for_fps(SessionConfig::DEFAULT_FPS).unwrap()
        );
    }
}
