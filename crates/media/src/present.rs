//! The consumer side of the frame queue: a [Presenter] is ticked on the UI
//! thread and hands at most one frame per tick to a [Renderer].

mod ticker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use util::{debug_log_info, debug_log_warning};

use crate::FrameQueue;
use crate::frame::{DecodedFrame, PixelFormat};

pub use ticker::Ticker;

/// Something that can show frames, e.g. a window.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer {
    /// Set the size of the surface frames are drawn onto.
    fn set_target_size(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Whether the user asked to stop (e.g. closed the window). Checked at the
    /// start of every tick.
    fn exit_requested(&mut self) -> bool;

    /// Draw one frame. Frames in a format that isn't
    /// [renderable](PixelFormat::is_renderable) must be rejected with
    /// [RenderError::UnsupportedFormat].
    fn draw(&mut self, frame: &DecodedFrame) -> Result<(), RenderError>;
}

/// Why a [Renderer] couldn't do something. None of these stop playback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Tried to draw an empty frame.")]
    EmptyFrame,
    #[error("Frames in the {0} pixel format can't be drawn.")]
    UnsupportedFormat(PixelFormat),
    #[error("A {0}x{1} target can't be drawn onto.")]
    InvalidTargetSize(u32, u32),
    #[error("The frame's data doesn't match its {0} layout: {1}")]
    Malformed(PixelFormat, String),
    #[error("The renderer failed: {0}")]
    Backend(String),
}

/// What one [Presenter::tick] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer has been stopped, nothing happened.
    Stopped,
    /// There's no renderer (yet), nothing happened.
    NoRenderer,
    /// The renderer asked to stop. No frame was popped.
    ExitRequested,
    /// A frame was popped and drawn.
    Drew,
    /// A frame was popped but the renderer failed to draw it (it was logged).
    DrawFailed,
    /// No frame was ready yet.
    Idle,
    /// No frame was ready and none will ever be (the queue is closed and
    /// empty).
    Finished,
}

/// Counters for everything a [Presenter] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentStats {
    pub ticks: u64,
    pub drawn: u64,
    pub draw_failures: u64,
    pub idle_ticks: u64,
}

/// Pops frames off a [FrameQueue] on a fixed period and passes them to a
/// [Renderer]. Never blocks on the queue.
#[derive(Debug)]
pub struct Presenter {
    queue: Arc<FrameQueue>,
    ticker: Ticker,
    stats: PresentStats,
}

impl Presenter {
    /// A presenter whose timer starts now, ticking every `period`.
    pub fn new(queue: Arc<FrameQueue>, period: Duration) -> Self {
        Self {
            queue,
            ticker: Ticker::new(period, Instant::now()),
            stats: PresentStats::default(),
        }
    }

    /// Tick if the timer says one is due at `now`. Returns [None] if it isn't.
    pub fn poll<R: Renderer + ?Sized>(
        &mut self,
        now: Instant,
        renderer: Option<&mut R>,
    ) -> Option<TickOutcome> {
        self.ticker.poll(now).then(|| self.tick(renderer))
    }

    /// Do one tick's worth of work, whether or not the timer says one is due:
    ///
    /// 1. Nothing if the timer has been [stopped](Self::stop).
    /// 2. Nothing if there's no renderer.
    /// 3. Nothing else if the renderer asks to exit.
    /// 4. Pop at most one frame and draw it.
    pub fn tick<R: Renderer + ?Sized>(&mut self, renderer: Option<&mut R>) -> TickOutcome {
        if self.ticker.is_stopped() {
            return TickOutcome::Stopped;
        }

        self.stats.ticks += 1;

        let Some(renderer) = renderer else {
            return TickOutcome::NoRenderer;
        };

        if renderer.exit_requested() {
            debug_log_info!("The renderer asked to exit.");
            return TickOutcome::ExitRequested;
        }

        let Some(frame) = self.queue.try_pop() else {
            self.stats.idle_ticks += 1;
            return if self.queue.is_drained() {
                TickOutcome::Finished
            } else {
                TickOutcome::Idle
            };
        };

        match renderer.draw(&frame) {
            Ok(()) => {
                self.stats.drawn += 1;
                TickOutcome::Drew
            }
            Err(e) => {
                self.stats.draw_failures += 1;
                debug_log_warning!(
                    "Failed to draw a frame (pts {:?}, status: {}): {e}",
                    frame.pts(),
                    frame.status()
                );
                TickOutcome::DrawFailed
            }
        }
    }

    /// Stop the timer. Every tick after this is [TickOutcome::Stopped].
    pub fn stop(&mut self) {
        self.ticker.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.ticker.is_stopped()
    }

    /// How long until the next tick is due, or [None] once stopped.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.ticker.time_until_next_tick(now)
    }

    pub fn period(&self) -> Duration {
        self.ticker.period()
    }

    pub fn stats(&self) -> PresentStats {
        self.stats
    }

    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;
    use mockall::predicate::function;

    use super::*;
    use crate::decode::synthetic::synthetic_buffer;

    const PERIOD: Duration = Duration::from_millis(40);

    fn frame(number: u64, format: PixelFormat) -> DecodedFrame {
        DecodedFrame::from_buffer(synthetic_buffer((4, 2).into(), format, number))
    }

    fn presenter_with(frames: &[u64]) -> Presenter {
        util::debug_log::disable();

        let queue = Arc::new(FrameQueue::new(8));
        for &number in frames {
            queue.push(frame(number, PixelFormat::Rgba)).unwrap();
        }
        Presenter::new(queue, PERIOD)
    }

    #[test]
    fn pops_one_frame_per_tick() {
        let mut presenter = presenter_with(&[0, 1, 2]);
        let mut renderer = MockRenderer::new();
        let mut seq = Sequence::new();

        renderer.expect_exit_requested().return_const(false);
        for number in 0..3 {
            renderer
                .expect_draw()
                .with(function(move |f: &DecodedFrame| f.pts() == Some(number)))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }

        for remaining in (0..3).rev() {
            assert_eq!(presenter.tick(Some(&mut renderer)), TickOutcome::Drew);
            assert_eq!(presenter.queue().len(), remaining);
        }
        assert_eq!(presenter.tick(Some(&mut renderer)), TickOutcome::Idle);

        presenter.queue().close();
        assert_eq!(presenter.tick(Some(&mut renderer)), TickOutcome::Finished);
        assert_eq!(
            presenter.stats(),
            PresentStats {
                ticks: 5,
                drawn: 3,
                draw_failures: 0,
                idle_ticks: 2
            }
        );
    }

    #[test]
    fn missing_renderer_is_a_no_op() {
        let mut presenter = presenter_with(&[0]);

        assert_eq!(presenter.tick::<MockRenderer>(None), TickOutcome::NoRenderer);
        assert_eq!(presenter.queue().len(), 1);
    }

    #[test]
    fn exit_request_comes_before_pop() {
        let mut presenter = presenter_with(&[0, 1]);
        let mut renderer = MockRenderer::new();

        renderer.expect_exit_requested().times(1).return_const(true);
        renderer.expect_draw().never();

        assert_eq!(presenter.tick(Some(&mut renderer)), TickOutcome::ExitRequested);
        assert_eq!(presenter.queue().len(), 2);
    }

    #[test]
    fn draw_failures_dont_stop_playback() {
        let mut presenter = presenter_with(&[]);
        presenter.queue().push(frame(0, PixelFormat::Yuv422p)).unwrap();
        presenter.queue().push(frame(1, PixelFormat::Rgba)).unwrap();

        let mut renderer = MockRenderer::new();
        renderer.expect_exit_requested().return_const(false);
        renderer.expect_draw().times(2).returning(|frame| {
            let format = frame.format().ok_or(RenderError::EmptyFrame)?;
            if format.is_renderable() {
                Ok(())
            } else {
                Err(RenderError::UnsupportedFormat(format))
            }
        });

        assert_eq!(presenter.tick(Some(&mut renderer)), TickOutcome::DrawFailed);
        assert_eq!(presenter.tick(Some(&mut renderer)), TickOutcome::Drew);
        assert_eq!(presenter.stats().draw_failures, 1);
        assert_eq!(presenter.stats().drawn, 1);
    }

    #[test]
    fn stopped_presenter_does_nothing() {
        let mut presenter = presenter_with(&[0]);
        let mut renderer = MockRenderer::new();
        renderer.expect_exit_requested().never();
        renderer.expect_draw().never();

        presenter.stop();

        assert_eq!(presenter.tick(Some(&mut renderer)), TickOutcome::Stopped);
        assert_eq!(presenter.poll(Instant::now(), Some(&mut renderer)), None);
        assert_eq!(presenter.queue().len(), 1);
        assert_eq!(presenter.stats().ticks, 0);
    }

    #[test]
    fn poll_follows_the_timer() {
        let mut presenter = presenter_with(&[0, 1]);
        let mut renderer = MockRenderer::new();
        renderer.expect_exit_requested().return_const(false);
        renderer.expect_draw().returning(|_| Ok(()));

        let start = Instant::now();
        assert_eq!(presenter.poll(start, Some(&mut renderer)), Some(TickOutcome::Drew));
        assert_eq!(presenter.poll(start, Some(&mut renderer)), None);
        assert_eq!(presenter.queue().len(), 1);
        assert_eq!(
            presenter.poll(start + PERIOD * 2, Some(&mut renderer)),
            Some(TickOutcome::Drew)
        );
    }
}
