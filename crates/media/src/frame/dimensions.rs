//! Declares the [Dimensions] type, the size of a decoded frame.

use std::fmt::{self, Display, Formatter};
use std::num::NonZeroU32;

/// A width and a height in pixels, both guaranteed to be non-zero.
///
/// [From<(u32, u32)>] is implemented for [Dimensions]. If either side is `0`,
/// the thread will panic, so it should really only be used with literals
/// (e.g. `(1920, 1080).into()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    width: NonZeroU32,
    height: NonZeroU32,
}

impl Dimensions {
    /// Construct from a width and a height. Returns [None] if either is `0`.
    pub const fn new(width: u32, height: u32) -> Option<Self> {
        let Some(width) = NonZeroU32::new(width) else {
            return None;
        };
        let Some(height) = NonZeroU32::new(height) else {
            return None;
        };

        Some(Self { width, height })
    }

    /// The width. This will never be `0`.
    pub const fn width(&self) -> u32 {
        self.width.get()
    }

    /// The height. This will never be `0`.
    pub const fn height(&self) -> u32 {
        self.height.get()
    }

    /// `width * height`.
    pub const fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// The dimensions of a chroma plane that is subsampled by 2 horizontally
    /// (and vertically if `vertical` is true). Odd sides round up.
    pub const fn half_chroma(&self, vertical: bool) -> Self {
        let width = self.width().div_ceil(2);
        let height = if vertical {
            self.height().div_ceil(2)
        } else {
            self.height()
        };

        // Halving a non-zero side and rounding up can't reach `0`.
        match Self::new(width, height) {
            Some(d) => d,
            None => *self,
        }
    }

    /// The largest size with the same aspect ratio as `self` that fits inside
    /// `bounds`, as floating point numbers (for layout). Letterboxing or
    /// pillarboxing fills the rest.
    pub fn fit_within(&self, bounds_width: f32, bounds_height: f32) -> (f32, f32) {
        let scale = (bounds_width / self.width() as f32).min(bounds_height / self.height() as f32);
        (self.width() as f32 * scale, self.height() as f32 * scale)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height).expect("Neither side of the dimensions should be 0.")
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}
