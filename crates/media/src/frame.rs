//! This module exports everything that has to do with decoded frames: the
//! reference-counted [DecodedFrame] handle and the [FrameBuffer] it owns.

mod dimensions;
mod handle;
mod pixel_format;
mod status;

pub use dimensions::*;
pub use handle::*;
pub use pixel_format::*;
pub use status::*;
