#![cfg_attr(feature = "no-console", windows_subsystem = "windows")]

mod args;
mod convert;
mod headless;
mod window;

use std::process::ExitCode;

use media::PlaybackSession;
use media::decode::ffmpeg::FFmpegBackend;
use util::stop_signals;

use args::Args;

const GENERIC_ERROR_MSG: &str = "Something went wrong.";

fn main() -> ExitCode {
    let args = Args::default();

    #[cfg(debug_assertions)]
    {
        use util::debug_log;
        if args.no_debug_logging {
            debug_log::disable();
        } else if !args.debug_error_log_panics {
            debug_log::panic_on_errors::disable();
        }
    }

    if let Err(e) = stop_signals::polling::enable() {
        util::debug_log_error!("Failed enable stop signal polling: {e}");
        eprintln!("{GENERIC_ERROR_MSG}");
        return ExitCode::FAILURE;
    }

    let session = match PlaybackSession::start(FFmpegBackend, &args.path, args.session_config()) {
        Ok(session) => session,
        Err(e) => {
            util::debug_log_error!("Failed to start playback: {e}");
            eprintln!("{GENERIC_ERROR_MSG}");
            return ExitCode::FAILURE;
        }
    };

    let exit_code = if args.headless {
        headless::run(session)
    } else {
        window::run(session, &args.path)
    };

    let signal_count = stop_signals::polling::consume_all();
    if signal_count > 0 {
        util::debug_log_info!("Playback was stopped by {signal_count} stop signal(s).");
    }
    stop_signals::polling::disable();

    exit_code
}
