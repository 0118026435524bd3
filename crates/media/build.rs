use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn main() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "windows" => {
            if let Err(e) = copy_ffmpeg_dlls() {
                panic!("Failed to copy the FFmpeg DLLs: {e}");
            }
        }
        // FFmpeg is linked against the system libraries (found with
        // `pkg-config`), nothing to copy.
        "linux" | "macos" | "freebsd" => {}
        _ => println!("cargo:warning=Untested target OS `{target_os}`."),
    }
}

/// Copy the FFmpeg DLLs from `$FFMPEG_DIR/bin` next to the executables so they
/// can be loaded at runtime.
fn copy_ffmpeg_dlls() -> io::Result<()> {
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");

    let ffmpeg_dir = env::var("FFMPEG_DIR").map_err(|_| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "The `FFMPEG_DIR` environment variable should point to an FFmpeg build.",
        )
    })?;
    let ffmpeg_bin_dir = Path::new(&ffmpeg_dir).join("bin");

    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(io::Error::other)?);
    let target_dir = out_dir
        .ancestors()
        .nth(3)
        .ok_or_else(|| io::Error::other("`OUT_DIR` isn't inside a target directory."))?;

    for entry in fs::read_dir(&ffmpeg_bin_dir)? {
        let entry_path = entry?.path();

        if entry_path.extension().and_then(|s| s.to_str()) != Some("dll") {
            continue;
        }
        let Some(dll_file_name) = entry_path.file_name() else {
            continue;
        };

        fs::copy(&entry_path, target_dir.join(dll_file_name))?;
        fs::copy(&entry_path, target_dir.join("deps").join(dll_file_name))?;
    }

    Ok(())
}
