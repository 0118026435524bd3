//! The pixel formats a [super::FrameBuffer] can be laid out in.

use std::fmt::{self, Display, Formatter};

use super::Dimensions;

/// How the pixels of a decoded frame are laid out across its planes.
///
/// Only some formats can be drawn (see [Self::is_renderable]). The rest are
/// still carried through the pipeline so that a renderer can report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Planar Y, U, V with both chroma planes subsampled 2x2.
    Yuv420p,
    /// Planar Y, U, V with both chroma planes subsampled 2x1.
    Yuv422p,
    /// A Y plane followed by one interleaved UV plane subsampled 2x2.
    Nv12,
    /// Packed 8-bit R, G, B.
    Rgb24,
    /// Packed 8-bit R, G, B, A.
    Rgba,
    /// Anything else the decoder produced. The planes are kept as-is.
    #[default]
    Unknown,
}

impl PixelFormat {
    /// Whether renderers are expected to be able to draw this format.
    pub const fn is_renderable(self) -> bool {
        matches!(self, Self::Yuv420p | Self::Nv12 | Self::Rgb24 | Self::Rgba)
    }

    /// The number of planes a frame in this format has, or [None] if the
    /// layout isn't known.
    pub const fn plane_count(self) -> Option<usize> {
        match self {
            Self::Yuv420p | Self::Yuv422p => Some(3),
            Self::Nv12 => Some(2),
            Self::Rgb24 | Self::Rgba => Some(1),
            Self::Unknown => None,
        }
    }

    /// The minimum `(row length in bytes, row count)` of every plane of a frame
    /// with the given dimensions, or [None] if the layout isn't known.
    pub fn plane_shapes(self, dimensions: Dimensions) -> Option<Vec<(usize, usize)>> {
        let full = (dimensions.width() as usize, dimensions.height() as usize);

        let shapes = match self {
            Self::Yuv420p | Self::Yuv422p => {
                let chroma = dimensions.half_chroma(self == Self::Yuv420p);
                let chroma = (chroma.width() as usize, chroma.height() as usize);
                vec![full, chroma, chroma]
            }
            Self::Nv12 => {
                let chroma = dimensions.half_chroma(true);
                vec![
                    full,
                    (chroma.width() as usize * 2, chroma.height() as usize),
                ]
            }
            Self::Rgb24 => vec![(full.0 * 3, full.1)],
            Self::Rgba => vec![(full.0 * 4, full.1)],
            Self::Unknown => return None,
        };

        Some(shapes)
    }
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yuv420p => "YUV420P",
            Self::Yuv422p => "YUV422P",
            Self::Nv12 => "NV12",
            Self::Rgb24 => "RGB24",
            Self::Rgba => "RGBA",
            Self::Unknown => "unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderable_set_is_closed() {
        let renderable: Vec<_> = [
            PixelFormat::Yuv420p,
            PixelFormat::Yuv422p,
            PixelFormat::Nv12,
            PixelFormat::Rgb24,
            PixelFormat::Rgba,
            PixelFormat::Unknown,
        ]
        .into_iter()
        .filter(|f| f.is_renderable())
        .collect();

        assert_eq!(
            renderable,
            [
                PixelFormat::Yuv420p,
                PixelFormat::Nv12,
                PixelFormat::Rgb24,
                PixelFormat::Rgba
            ]
        );
    }

    #[test]
    fn plane_shapes_follow_subsampling() {
        let d = Dimensions::from((5, 3));

        assert_eq!(
            PixelFormat::Yuv420p.plane_shapes(d),
            Some(vec![(5, 3), (3, 2), (3, 2)])
        );
        assert_eq!(
            PixelFormat::Yuv422p.plane_shapes(d),
            Some(vec![(5, 3), (3, 3), (3, 3)])
        );
        assert_eq!(PixelFormat::Nv12.plane_shapes(d), Some(vec![(5, 3), (6, 2)]));
        assert_eq!(PixelFormat::Rgba.plane_shapes(d), Some(vec![(20, 3)]));
        assert_eq!(PixelFormat::Unknown.plane_shapes(d), None);
    }
}
