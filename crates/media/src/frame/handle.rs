//! The [DecodedFrame] handle and the [FrameBuffer] it points to.
//!
//! A [DecodedFrame] is a reference-counted pointer to a [FrameBuffer] plus the
//! [FrameStatus] of whatever last happened to it:
//!
//! - [Clone] shares the buffer (one more owner).
//! - Moving the handle, or [DecodedFrame::take], transfers ownership and leaves
//!   an empty handle behind.
//! - The buffer can only be mutated through a handle that owns it exclusively
//!   (see [DecodedFrame::buffer_mut] and [DecodedFrame::make_exclusive]), so a
//!   shared buffer never changes under another owner's feet.
//! - The buffer is freed when the last handle pointing at it is dropped or
//!   [unref'd](DecodedFrame::unref).

use std::mem;
use std::sync::{Arc, Weak};

use thiserror::Error;

use super::{Dimensions, FrameStatus, PixelFormat};

/// One plane of pixel data: `rows` rows, each `stride` bytes apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    stride: usize,
}

impl Plane {
    /// Create a plane from its raw bytes. `data.len()` must be a multiple of
    /// `stride` (rows can't be cut off) and `stride` can't be `0`.
    pub fn new(data: Vec<u8>, stride: usize) -> Result<Self, FrameError> {
        if stride == 0 || data.len() % stride != 0 {
            return Err(FrameError::RaggedPlane {
                len: data.len(),
                stride,
            });
        }

        Ok(Self { data, stride })
    }

    /// A zero-filled plane without any row padding.
    pub fn zeroed(row_len: usize, rows: usize) -> Self {
        Self {
            data: vec![0; row_len.max(1) * rows],
            stride: row_len.max(1),
        }
    }

    /// Copy `rows` rows of `stride` bytes out of `src`.
    ///
    /// Returns [None] if `src` is too short.
    pub fn copy_from(src: &[u8], stride: usize, rows: usize) -> Option<Self> {
        let len = stride.checked_mul(rows)?;
        let data = src.get(..len)?.to_vec();
        Self::new(data, stride).ok()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The distance between the starts of two rows in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.stride
    }

    /// The bytes of row `y`, including any padding at the end.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        self.data.chunks_exact(self.stride).nth(y)
    }
}

/// The pixels of one decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    dimensions: Dimensions,
    format: PixelFormat,
    planes: Vec<Plane>,
    pts: Option<i64>,
}

impl FrameBuffer {
    /// A zero-filled buffer with one unpadded plane per plane of `format`.
    ///
    /// Fails for [PixelFormat::Unknown] since its layout isn't known.
    pub fn alloc(dimensions: Dimensions, format: PixelFormat) -> Result<Self, FrameError> {
        let shapes = format
            .plane_shapes(dimensions)
            .ok_or(FrameError::UnknownLayout(format))?;

        Ok(Self {
            dimensions,
            format,
            planes: shapes
                .into_iter()
                .map(|(row_len, rows)| Plane::zeroed(row_len, rows))
                .collect(),
            pts: None,
        })
    }

    /// Assemble a buffer out of existing planes.
    ///
    /// For known formats the planes are checked against the format's layout:
    /// the count has to match and every plane needs enough rows of at least
    /// the required length. [PixelFormat::Unknown] planes are taken as-is.
    pub fn from_planes(
        dimensions: Dimensions,
        format: PixelFormat,
        planes: Vec<Plane>,
    ) -> Result<Self, FrameError> {
        if let Some(shapes) = format.plane_shapes(dimensions) {
            if shapes.len() != planes.len() {
                return Err(FrameError::PlaneCount {
                    format,
                    expected: shapes.len(),
                    actual: planes.len(),
                });
            }

            for (index, (plane, (row_len, rows))) in planes.iter().zip(shapes).enumerate() {
                if plane.stride() < row_len || plane.rows() < rows {
                    return Err(FrameError::PlaneTooSmall {
                        index,
                        stride: plane.stride(),
                        rows: plane.rows(),
                        needed_stride: row_len,
                        needed_rows: rows,
                    });
                }
            }
        }

        Ok(Self {
            dimensions,
            format,
            planes,
            pts: None,
        })
    }

    /// Set the presentation timestamp (in the source stream's time base).
    pub fn with_pts(mut self, pts: Option<i64>) -> Self {
        self.pts = pts;
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [Plane] {
        &mut self.planes
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }
}

/// A reference-counted handle to one decoded [FrameBuffer]. See the
/// [module](self) docs.
///
/// A handle may be empty. Every accessor returns an [Option] or [Result] so an
/// empty handle is never read through.
#[derive(Debug, Clone, Default)]
pub struct DecodedFrame {
    buffer: Option<Arc<FrameBuffer>>,
    status: FrameStatus,
}

impl DecodedFrame {
    /// A handle without a buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A handle that exclusively owns a freshly allocated, zero-filled buffer.
    pub fn alloc(dimensions: Dimensions, format: PixelFormat) -> Result<Self, FrameError> {
        FrameBuffer::alloc(dimensions, format).map(Self::from_buffer)
    }

    /// A handle that exclusively owns `buffer`.
    pub fn from_buffer(buffer: FrameBuffer) -> Self {
        Self {
            buffer: Some(Arc::new(buffer)),
            status: FrameStatus::Ok,
        }
    }

    /// Whether this handle points at no buffer.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_none()
    }

    /// The number of handles sharing this handle's buffer (including this
    /// one), or `0` if the handle is empty.
    pub fn use_count(&self) -> usize {
        self.buffer.as_ref().map_or(0, Arc::strong_count)
    }

    /// Whether this is the only handle pointing at its buffer. Always false for
    /// an empty handle.
    pub fn is_exclusive(&self) -> bool {
        self.use_count() == 1
    }

    /// Whether `self` and `other` point at the same buffer.
    pub fn shares_buffer_with(&self, other: &Self) -> bool {
        match (&self.buffer, &other.buffer) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The buffer, or [None] if the handle is empty.
    pub fn buffer(&self) -> Option<&FrameBuffer> {
        self.buffer.as_deref()
    }

    /// Mutable access to the buffer. Only granted when this handle is the
    /// buffer's only owner and nothing [watches](Self::downgrade) it, see
    /// [Self::make_exclusive] otherwise.
    pub fn buffer_mut(&mut self) -> Result<&mut FrameBuffer, FrameError> {
        let buffer = self.buffer.as_mut().ok_or(FrameError::Empty)?;
        let use_count = Arc::strong_count(buffer);
        Arc::get_mut(buffer).ok_or(FrameError::Shared(use_count))
    }

    /// Like [Self::buffer_mut], but a shared buffer is first copied so that
    /// this handle exclusively owns the copy. The other handles keep the
    /// original.
    pub fn make_exclusive(&mut self) -> Result<&mut FrameBuffer, FrameError> {
        self.buffer
            .as_mut()
            .map(Arc::make_mut)
            .ok_or(FrameError::Empty)
    }

    /// Swap in new content, releasing this handle's hold on the old buffer
    /// (other handles sharing it are unaffected) and marking the handle as
    /// successful. Decoders write frames through this.
    pub fn replace_buffer(&mut self, buffer: FrameBuffer) {
        self.buffer = Some(Arc::new(buffer));
        self.status = FrameStatus::Ok;
    }

    /// Drop this handle's hold on its buffer, leaving the handle empty. The
    /// status is kept.
    pub fn unref(&mut self) {
        self.buffer = None;
    }

    /// Move the buffer and status out into a new handle, leaving this one
    /// empty (and [FrameStatus::Ok]).
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// A weak reference to the buffer that doesn't keep it alive, or [None] if
    /// the handle is empty.
    pub fn downgrade(&self) -> Option<Weak<FrameBuffer>> {
        self.buffer.as_ref().map(Arc::downgrade)
    }

    pub fn status(&self) -> &FrameStatus {
        &self.status
    }

    /// Record the outcome of the last operation on this handle.
    pub fn set_status(&mut self, status: FrameStatus) {
        self.status = status;
    }

    /// Shorthand for [FrameBuffer::dimensions].
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.buffer().map(FrameBuffer::dimensions)
    }

    /// Shorthand for [FrameBuffer::format].
    pub fn format(&self) -> Option<PixelFormat> {
        self.buffer().map(FrameBuffer::format)
    }

    /// Shorthand for [FrameBuffer::pts].
    pub fn pts(&self) -> Option<i64> {
        self.buffer().and_then(FrameBuffer::pts)
    }
}

/// Something that went wrong creating or accessing a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("The frame handle is empty.")]
    Empty,
    #[error("The frame buffer is shared by {0} handles and can't be mutated.")]
    Shared(usize),
    #[error("Frames in the {0} pixel format have no known plane layout.")]
    UnknownLayout(PixelFormat),
    #[error("A plane of {len} bytes can't be split into rows of {stride} bytes.")]
    RaggedPlane { len: usize, stride: usize },
    #[error("The {format} pixel format needs {expected} planes (got {actual}).")]
    PlaneCount {
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },
    #[error(
        "Plane {index} is {stride} bytes x {rows} rows \
        but needs at least {needed_stride} bytes x {needed_rows} rows."
    )]
    PlaneTooSmall {
        index: usize,
        stride: usize,
        rows: usize,
        needed_stride: usize,
        needed_rows: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_frame() -> DecodedFrame {
        DecodedFrame::alloc((4, 2).into(), PixelFormat::Rgba).unwrap()
    }

    #[test]
    fn empty_handles_have_nothing_to_read() {
        let mut frame = DecodedFrame::empty();

        assert!(frame.is_empty());
        assert_eq!(frame.use_count(), 0);
        assert!(!frame.is_exclusive());
        assert!(frame.buffer().is_none());
        assert_eq!(frame.buffer_mut().unwrap_err(), FrameError::Empty);
        assert_eq!(frame.make_exclusive().unwrap_err(), FrameError::Empty);
        assert!(frame.downgrade().is_none());
    }

    #[test]
    fn clones_share_and_count() {
        let mut a = small_frame();
        assert!(a.is_exclusive());

        let b = a.clone();
        assert!(a.shares_buffer_with(&b));
        assert_eq!(a.use_count(), 2);
        assert_eq!(b.use_count(), 2);
        assert_eq!(a.buffer_mut().unwrap_err(), FrameError::Shared(2));

        drop(b);
        assert!(a.is_exclusive());
        a.buffer_mut().unwrap().planes_mut()[0].data_mut()[0] = 7;
        assert_eq!(a.buffer().unwrap().planes()[0].data()[0], 7);
    }

    #[test]
    fn take_moves_ownership() {
        let mut a = small_frame();
        a.set_status(FrameStatus::failed(-11, "try again"));

        let b = a.take();
        assert!(a.is_empty());
        assert!(a.status().is_ok());
        assert!(b.is_exclusive());
        assert_eq!(b.status().code(), -11);
    }

    #[test]
    fn make_exclusive_copies_shared_buffers() {
        let mut a = small_frame();
        let b = a.clone();

        a.make_exclusive().unwrap().planes_mut()[0].data_mut()[0] = 1;

        assert!(!a.shares_buffer_with(&b));
        assert!(a.is_exclusive() && b.is_exclusive());
        assert_eq!(b.buffer().unwrap().planes()[0].data()[0], 0);
    }

    #[test]
    fn replace_buffer_releases_only_this_hold() {
        let mut a = small_frame();
        let b = a.clone();
        a.set_status(FrameStatus::failed(1, "old"));

        let replacement = FrameBuffer::alloc((2, 2).into(), PixelFormat::Yuv420p)
            .unwrap()
            .with_pts(Some(9));
        a.replace_buffer(replacement);

        assert!(a.status().is_ok());
        assert_eq!(a.pts(), Some(9));
        assert_eq!(a.format(), Some(PixelFormat::Yuv420p));
        assert!(b.is_exclusive());
        assert_eq!(b.format(), Some(PixelFormat::Rgba));
    }

    #[test]
    fn last_handle_frees_the_buffer() {
        let mut a = small_frame();
        let b = a.clone();
        let watcher = a.downgrade().unwrap();

        a.unref();
        assert!(a.is_empty());
        assert!(watcher.upgrade().is_some());

        drop(b);
        assert!(watcher.upgrade().is_none());
    }

    #[test]
    fn many_handles_free_every_buffer_exactly_once() {
        let mut handles: Vec<_> = (0..1_000).map(|_| small_frame()).collect();
        let watchers: Vec<_> = handles.iter().filter_map(DecodedFrame::downgrade).collect();
        assert_eq!(watchers.len(), 1_000);

        // Shuffle ownership around: copies, moves and unrefs.
        let copies: Vec<_> = handles.iter().step_by(2).cloned().collect();
        let moved: Vec<_> = handles.iter_mut().skip(1).step_by(3).map(DecodedFrame::take).collect();
        handles.iter_mut().step_by(5).for_each(DecodedFrame::unref);

        drop(handles);
        assert!(watchers.iter().any(|w| w.upgrade().is_some()));

        drop(copies);
        drop(moved);
        assert!(watchers.iter().all(|w| w.upgrade().is_none()));
    }

    #[test]
    fn queued_handles_are_freed_whether_popped_or_left_behind() {
        let queue = crate::FrameQueue::new(1_000);
        let mut watchers = Vec::with_capacity(1_000);

        for pts in 0..1_000 {
            let mut frame = small_frame();
            frame.buffer_mut().unwrap().set_pts(Some(pts));
            watchers.push(frame.downgrade().unwrap());
            queue.push(frame.take()).unwrap();
            assert!(frame.is_empty());
        }

        for pts in 0..500 {
            let frame = queue.try_pop().unwrap();
            assert_eq!(frame.pts(), Some(pts));
            assert_eq!(frame.use_count(), 1);
        }
        assert!(watchers[..500].iter().all(|w| w.upgrade().is_none()));
        assert!(watchers[500..].iter().all(|w| w.upgrade().is_some()));

        queue.close();
        drop(queue);
        assert!(watchers.iter().all(|w| w.upgrade().is_none()));
    }

    #[test]
    fn planes_are_checked_against_the_format() {
        let d = Dimensions::from((4, 4));

        let too_few = FrameBuffer::from_planes(d, PixelFormat::Nv12, vec![Plane::zeroed(4, 4)]);
        assert!(matches!(too_few, Err(FrameError::PlaneCount { expected: 2, .. })));

        let padded = vec![Plane::zeroed(8, 4), Plane::zeroed(8, 2)];
        assert!(FrameBuffer::from_planes(d, PixelFormat::Nv12, padded).is_ok());

        let short = vec![Plane::zeroed(4, 4), Plane::zeroed(4, 1)];
        assert!(matches!(
            FrameBuffer::from_planes(d, PixelFormat::Nv12, short),
            Err(FrameError::PlaneTooSmall { index: 1, .. })
        ));

        let anything = vec![Plane::zeroed(3, 1)];
        assert!(FrameBuffer::from_planes(d, PixelFormat::Unknown, anything).is_ok());

        assert_eq!(
            Plane::new(vec![0; 5], 2).unwrap_err(),
            FrameError::RaggedPlane { len: 5, stride: 2 }
        );
        assert_eq!(Plane::copy_from(&[1, 2, 3], 2, 2), None);
        assert_eq!(
            Plane::copy_from(&[1, 2, 3, 4, 5], 2, 2).unwrap().row(1),
            Some(&[3, 4][..])
        );
    }
}
