//! This library contains the whole playback pipeline except for the window:
//! decoding frames on one thread ([decode]), presenting them on another
//! ([present]), and starting and stopping the two together ([lifecycle]).

pub mod decode;
pub mod frame;
pub mod lifecycle;
pub mod present;

pub use lifecycle::{PlaybackSession, SessionConfig};

/// The queue decoded frames travel through, from the decode thread to the
/// thread presenting them.
pub type FrameQueue = util::channels::bounded_queue::BoundedQueue<frame::DecodedFrame>;
