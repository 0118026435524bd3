//! Converts decoded frames to tightly packed RGBA, the only thing egui textures
//! take.

use media::frame::{Dimensions, FrameBuffer, PixelFormat, Plane};
use media::present::RenderError;
use thiserror::Error;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPlanarImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuv420_to_rgba,
};

/// Frames at least this tall are assumed to be HD (BT.709 colors), anything
/// smaller SD (BT.601).
const HD_MIN_HEIGHT: u32 = 720;

/// A tightly packed (no row padding) RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub dimensions: Dimensions,
    pub pixels: Vec<u8>,
}

/// Why a frame couldn't be converted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Frames in the {0} pixel format can't be converted to RGBA.")]
    Unsupported(PixelFormat),
    #[error("The frame has {actual} planes, {expected} were expected.")]
    MissingPlanes { expected: usize, actual: usize },
    #[error("Failed to convert from YUV: {0}")]
    Yuv(String),
}

impl From<ConvertError> for RenderError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::Unsupported(format) => RenderError::UnsupportedFormat(format),
            err => RenderError::Backend(err.to_string()),
        }
    }
}

/// Convert any [renderable](PixelFormat::is_renderable) frame to RGBA.
pub fn to_rgba(buffer: &FrameBuffer) -> Result<RgbaImage, ConvertError> {
    let dimensions = buffer.dimensions();
    let (width, height) = (dimensions.width(), dimensions.height());
    let rgba_stride = width * 4;
    let mut pixels = vec![0; dimensions.area() * 4];

    let range = YuvRange::Limited;
    let matrix = if height >= HD_MIN_HEIGHT {
        YuvStandardMatrix::Bt709
    } else {
        YuvStandardMatrix::Bt601
    };

    match buffer.format() {
        PixelFormat::Yuv420p => {
            let [y, u, v] = planes::<3>(buffer)?;
            let image = YuvPlanarImage {
                y_plane: y.data(),
                y_stride: stride(y),
                u_plane: u.data(),
                u_stride: stride(u),
                v_plane: v.data(),
                v_stride: stride(v),
                width,
                height,
            };

            yuv420_to_rgba(&image, &mut pixels, rgba_stride, range, matrix)
                .map_err(|e| ConvertError::Yuv(format!("{e:?}")))?;
        }
        PixelFormat::Nv12 => {
            let [y, uv] = planes::<2>(buffer)?;
            let image = YuvBiPlanarImage {
                y_plane: y.data(),
                y_stride: stride(y),
                uv_plane: uv.data(),
                uv_stride: stride(uv),
                width,
                height,
            };

            yuv_nv12_to_rgba(
                &image,
                &mut pixels,
                rgba_stride,
                range,
                matrix,
                YuvConversionMode::Balanced,
            )
            .map_err(|e| ConvertError::Yuv(format!("{e:?}")))?;
        }
        PixelFormat::Rgb24 => {
            let [rgb] = planes::<1>(buffer)?;
            for (src, dst) in packed_rows(rgb, width as usize * 3, height as usize)
                .zip(pixels.chunks_exact_mut(rgba_stride as usize))
            {
                for (src, dst) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
                    dst[..3].copy_from_slice(src);
                    dst[3] = u8::MAX;
                }
            }
        }
        PixelFormat::Rgba => {
            let [rgba] = planes::<1>(buffer)?;
            for (src, dst) in packed_rows(rgba, rgba_stride as usize, height as usize)
                .zip(pixels.chunks_exact_mut(rgba_stride as usize))
            {
                dst.copy_from_slice(src);
            }
        }
        format @ (PixelFormat::Yuv422p | PixelFormat::Unknown) => {
            return Err(ConvertError::Unsupported(format));
        }
    }

    Ok(RgbaImage { dimensions, pixels })
}

/// Exactly `N` planes, or an error.
fn planes<const N: usize>(buffer: &FrameBuffer) -> Result<&[Plane; N], ConvertError> {
    buffer
        .planes()
        .try_into()
        .map_err(|_| ConvertError::MissingPlanes {
            expected: N,
            actual: buffer.planes().len(),
        })
}

fn stride(plane: &Plane) -> u32 {
    u32::try_from(plane.stride()).unwrap_or(u32::MAX)
}

/// The first `row_len` bytes of each of the first `rows` rows (the padding
/// is cut off).
fn packed_rows(plane: &Plane, row_len: usize, rows: usize) -> impl Iterator<Item = &[u8]> {
    (0..rows).filter_map(move |y| plane.row(y)?.get(..row_len))
}
