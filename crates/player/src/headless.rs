//! Playback without a window, see [run].

use std::process::ExitCode;
use std::thread;
use std::time::Instant;

use media::PlaybackSession;
use media::frame::DecodedFrame;
use media::present::{RenderError, Renderer, TickOutcome};
use util::stop_signals;

use crate::convert;

/// A [Renderer] that converts every frame like a window would, then throws the
/// pixels away. Exit is requested with a stop signal (e.g. `Ctrl+C`).
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    target_size: Option<(u32, u32)>,
    frames_drawn: u64,
}

impl HeadlessRenderer {
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.target_size
    }
}

impl Renderer for HeadlessRenderer {
    fn set_target_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize(width, height));
        }

        self.target_size = Some((width, height));
        Ok(())
    }

    fn exit_requested(&mut self) -> bool {
        stop_signals::polling::poll()
    }

    fn draw(&mut self, frame: &DecodedFrame) -> Result<(), RenderError> {
        let buffer = frame.buffer().ok_or(RenderError::EmptyFrame)?;
        if !buffer.format().is_renderable() {
            return Err(RenderError::UnsupportedFormat(buffer.format()));
        }

        convert::to_rgba(buffer)?;
        self.frames_drawn += 1;

        Ok(())
    }
}

/// Tick `session` on this thread, sleeping between ticks, until everything has
/// been presented or a stop signal arrives. Prints a summary at the end.
pub fn run(mut session: PlaybackSession) -> ExitCode {
    let mut renderer = HeadlessRenderer::default();

    while let Some(wait) = session.time_until_next_tick(Instant::now()) {
        thread::sleep(wait);

        match session.poll(Instant::now(), Some(&mut renderer)) {
            Some(TickOutcome::ExitRequested) => {
                println!("Stopped early.");
            }
            Some(TickOutcome::Finished) => {}
            _ => continue,
        }
    }

    let stats = session.stats();
    println!(
        "Presented {} frames ({} failed to draw, {} idle ticks).",
        stats.drawn, stats.draw_failures, stats.idle_ticks
    );

    match session.join_decoder() {
        Some(Err(e)) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        Some(Ok(report)) => {
            println!(
                "Decoded {} frames from {} ({:?}).",
                report.frames_pushed, report.stream, report.end
            );
            ExitCode::SUCCESS
        }
        None => ExitCode::SUCCESS,
    }
}
