//! Playback in a window, see [run].

use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use eframe::{App, Frame, NativeOptions};
use egui::{
    CentralPanel, Color32, ColorImage, Context, Key, Rect, TextureHandle, TextureOptions, Ui,
    Vec2, ViewportBuilder, ViewportCommand, pos2, vec2,
};

use media::PlaybackSession;
use media::frame::{DecodedFrame, Dimensions};
use media::present::{RenderError, Renderer, TickOutcome};
use util::stop_signals;

use crate::convert;

/// The size of the window when it opens.
pub const DEFAULT_WINDOW_SIZE: Vec2 = Vec2::new(960.0, 540.0);

/// The window can't shrink smaller than this.
pub const MIN_WINDOW_SIZE: Vec2 = Vec2::new(160.0, 90.0);

/// How often to check for stop signals once nothing is playing anymore.
const IDLE_REPAINT_INTERVAL: Duration = Duration::from_millis(250);

/// Open a window and play `session` in it until the window is closed.
///
/// This function can only be run from the main thread.
pub fn run(session: PlaybackSession, path: &Path) -> ExitCode {
    let mut decode_failed = false;
    let app = PlayerApp::new(session, &mut decode_failed);

    let window_title = match path.file_name() {
        Some(name) => format!("{} - {APP_NAME}", name.to_string_lossy()),
        None => APP_NAME.to_owned(),
    };

    let run_result = eframe::run_native(
        &window_title,
        NativeOptions {
            viewport: ViewportBuilder::default()
                .with_title(&window_title)
                .with_min_inner_size(MIN_WINDOW_SIZE)
                .with_inner_size(DEFAULT_WINDOW_SIZE),
            centered: true,
            ..Default::default()
        },
        Box::new(|cc| Ok(Box::new(app.with_renderer(EguiRenderer::new(cc.egui_ctx.clone()))))),
    );

    match run_result {
        Err(e) => {
            util::debug_log_error!("UI (run native) failed: {e}");
            ExitCode::FAILURE
        }
        Ok(()) if decode_failed => ExitCode::FAILURE,
        Ok(()) => ExitCode::SUCCESS,
    }
}

const APP_NAME: &str = "Player";

/// Draws frames into an egui texture, letterboxed to fit the window.
pub struct EguiRenderer {
    ctx: Context,
    texture: Option<TextureHandle>,
    frame_dimensions: Option<Dimensions>,
    target_size: Option<(u32, u32)>,
    exit_requested: bool,
}

impl EguiRenderer {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            texture: None,
            frame_dimensions: None,
            target_size: None,
            exit_requested: false,
        }
    }

    /// Make the next [Renderer::exit_requested] call return true.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Paint the last drawn frame (if any) centered in `ui`, keeping its aspect
    /// ratio.
    pub fn paint(&self, ui: &Ui) {
        let (Some(texture), Some(dimensions)) = (&self.texture, self.frame_dimensions) else {
            return;
        };

        ui.painter().image(
            texture.id(),
            destination_rect(ui.max_rect(), dimensions),
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );
    }
}

impl Renderer for EguiRenderer {
    fn set_target_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize(width, height));
        }

        self.target_size = Some((width, height));
        Ok(())
    }

    fn exit_requested(&mut self) -> bool {
        self.exit_requested || stop_signals::polling::poll()
    }

    fn draw(&mut self, frame: &DecodedFrame) -> Result<(), RenderError> {
        let buffer = frame.buffer().ok_or(RenderError::EmptyFrame)?;
        if !buffer.format().is_renderable() {
            return Err(RenderError::UnsupportedFormat(buffer.format()));
        }

        let rgba = convert::to_rgba(buffer)?;
        let size = [
            rgba.dimensions.width() as usize,
            rgba.dimensions.height() as usize,
        ];
        let image = ColorImage::from_rgba_unmultiplied(size, &rgba.pixels);

        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                self.texture = Some(self.ctx.load_texture("video-frame", image, TextureOptions::LINEAR));
            }
        }
        self.frame_dimensions = Some(rgba.dimensions);

        Ok(())
    }
}

/// The largest rectangle with the frame's aspect ratio centered in `area`.
fn destination_rect(area: Rect, frame: Dimensions) -> Rect {
    let (width, height) = frame.fit_within(area.width(), area.height());
    Rect::from_center_size(area.center(), vec2(width, height))
}

/// The eframe app: ticks the session on every repaint and shows the frames.
struct PlayerApp<'a> {
    session: PlaybackSession,
    renderer: Option<EguiRenderer>,
    decode_error: Option<String>,
    decode_failed: &'a mut bool,
}

impl<'a> PlayerApp<'a> {
    fn new(session: PlaybackSession, decode_failed: &'a mut bool) -> Self {
        Self {
            session,
            renderer: None,
            decode_error: None,
            decode_failed,
        }
    }

    /// The renderer can only be created once eframe hands out a [Context].
    fn with_renderer(mut self, renderer: EguiRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Pick up the decode thread's result once it has stopped.
    fn collect_decode_result(&mut self) {
        if !self.session.is_decoder_finished() {
            return;
        }

        match self.session.join_decoder() {
            Some(Err(e)) => {
                util::debug_log_error!("Playback failed: {e}");
                self.decode_error = Some(e.to_string());
                *self.decode_failed = true;
            }
            Some(Ok(report)) => util::debug_log_info!(
                "Decoded {} frames ({:?}).",
                report.frames_pushed,
                report.end
            ),
            None => {}
        }
    }
}

impl App for PlayerApp<'_> {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        let (close_requested, escape_pressed) = ctx.input(|i| {
            (
                i.viewport().close_requested(),
                i.key_pressed(Key::Escape),
            )
        });

        if close_requested {
            self.session.shutdown();
        } else if escape_pressed {
            if let Some(renderer) = &mut self.renderer {
                renderer.request_exit();
            }
        }

        match self.session.poll(Instant::now(), self.renderer.as_mut()) {
            Some(TickOutcome::ExitRequested) => ctx.send_viewport_cmd(ViewportCommand::Close),
            Some(TickOutcome::Finished) => util::debug_log_info!("Everything has been shown."),
            _ => {}
        }

        self.collect_decode_result();

        CentralPanel::default()
            .frame(egui::Frame::NONE.fill(Color32::BLACK))
            .show(ctx, |ui| {
                let area = ui.max_rect();

                if let Some(renderer) = &mut self.renderer {
                    // Nothing to paint onto while minimized.
                    if renderer
                        .set_target_size(area.width() as u32, area.height() as u32)
                        .is_ok()
                    {
                        renderer.paint(ui);
                    }
                }

                if let Some(err) = &self.decode_error {
                    ui.colored_label(Color32::LIGHT_RED, err);
                }
            });

        match self.session.time_until_next_tick(Instant::now()) {
            Some(wait) => ctx.request_repaint_after(wait),
            None => {
                if stop_signals::polling::poll() {
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
                ctx.request_repaint_after(IDLE_REPAINT_INTERVAL);
            }
        }
    }
}
