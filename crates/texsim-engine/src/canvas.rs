//! Drawable surfaces.
//!
//! A [`Canvas`] stands in for a browser canvas element: it has a displayed
//! (client) size, a pixel size that can be changed independently, and a
//! drawing buffer that the render loop writes into and [`Canvas::read_pixels`]
//! reads from. Handles are cheap to clone and share the same surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use texsim_core::{Extent2D, PixelBuffer};

use crate::error::{EngineError, Result};

/// Shared handle to a drawable surface.
#[derive(Clone)]
pub struct Canvas {
    inner: Arc<CanvasInner>,
}

struct CanvasInner {
    id: String,
    client_size: Extent2D,
    pixel_ratio: f32,
    supports_3d: bool,
    bound: AtomicBool,
    state: Mutex<CanvasState>,
}

struct CanvasState {
    size: Extent2D,
    drawing_buffer: Vec<u8>,
    preserve_drawing_buffer: bool,
}

impl Canvas {
    /// Create a canvas displayed at `client_width` x `client_height`.
    ///
    /// The pixel size starts at the client size, like an element whose
    /// `width`/`height` attributes were never set.
    pub fn new(id: impl Into<String>, client_width: u32, client_height: u32) -> Self {
        Self::build(id.into(), client_width, client_height, 1.0, true)
    }

    /// Create a canvas that refuses to hand out a 3D context.
    pub fn without_3d_context(id: impl Into<String>, client_width: u32, client_height: u32) -> Self {
        Self::build(id.into(), client_width, client_height, 1.0, false)
    }

    /// Create a canvas with a device pixel ratio applied by
    /// [`resize_by_client_size`](Self::resize_by_client_size).
    pub fn with_pixel_ratio(
        id: impl Into<String>,
        client_width: u32,
        client_height: u32,
        pixel_ratio: f32,
    ) -> Self {
        Self::build(id.into(), client_width, client_height, pixel_ratio, true)
    }

    fn build(id: String, client_width: u32, client_height: u32, pixel_ratio: f32, supports_3d: bool) -> Self {
        let size = Extent2D::new(client_width, client_height);
        Self {
            inner: Arc::new(CanvasInner {
                id,
                client_size: size,
                pixel_ratio,
                supports_3d,
                bound: AtomicBool::new(false),
                state: Mutex::new(CanvasState {
                    size,
                    drawing_buffer: vec![0; size.rgba_len()],
                    preserve_drawing_buffer: false,
                }),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Displayed size of the canvas.
    pub fn client_size(&self) -> Extent2D {
        self.inner.client_size
    }

    /// Current pixel size of the drawing buffer.
    pub fn size(&self) -> Extent2D {
        self.inner.state.lock().size
    }

    pub fn width(&self) -> u32 {
        self.size().width
    }

    pub fn height(&self) -> u32 {
        self.size().height
    }

    /// Set the pixel size. The drawing buffer is reallocated and cleared.
    pub fn set_size(&self, width: u32, height: u32) {
        let mut state = self.inner.state.lock();
        let size = Extent2D::new(width, height);
        if state.size == size {
            return;
        }
        state.size = size;
        state.drawing_buffer = vec![0; size.rgba_len()];
    }

    /// Match the pixel size to the displayed size times the pixel ratio.
    pub fn resize_by_client_size(&self) {
        let ratio = self.inner.pixel_ratio;
        let client = self.inner.client_size;
        let width = (client.width as f32 * ratio).round() as u32;
        let height = (client.height as f32 * ratio).round() as u32;
        self.set_size(width, height);
    }

    /// Synchronously copy a region of the drawing buffer into a new buffer.
    ///
    /// Rows are returned top-down.
    pub fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Result<PixelBuffer> {
        let state = self.inner.state.lock();
        let size = state.size;
        let fits = x.checked_add(width).is_some_and(|right| right <= size.width)
            && y.checked_add(height).is_some_and(|bottom| bottom <= size.height);
        if !fits {
            return Err(EngineError::OutOfBounds(format!(
                "region {width}x{height} at ({x}, {y}) exceeds canvas '{}' of {size}",
                self.inner.id
            )));
        }

        let row_bytes = width as usize * 4;
        let stride = size.width as usize * 4;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y + height {
            let start = row as usize * stride + x as usize * 4;
            data.extend_from_slice(&state.drawing_buffer[start..start + row_bytes]);
        }
        Ok(PixelBuffer::from_raw(width, height, data)?)
    }

    /// Claim the canvas for an engine.
    pub(crate) fn bind(&self, preserve_drawing_buffer: bool) -> Result<CanvasBinding> {
        if !self.inner.supports_3d {
            return Err(EngineError::ContextUnavailable(self.inner.id.clone()));
        }
        if self
            .inner
            .bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::CanvasInUse(self.inner.id.clone()));
        }
        self.inner.state.lock().preserve_drawing_buffer = preserve_drawing_buffer;
        Ok(CanvasBinding {
            canvas: self.clone(),
        })
    }

    /// Render one frame into the drawing buffer and present it.
    ///
    /// `draw` returns whether anything was drawn. Without a preserved
    /// drawing buffer the contents are discarded once presented.
    pub(crate) fn present_frame<F>(&self, draw: F) -> bool
    where
        F: FnOnce(&mut [u8], Extent2D) -> bool,
    {
        let mut state = self.inner.state.lock();
        let size = state.size;
        let presented = draw(&mut state.drawing_buffer, size);
        if presented && !state.preserve_drawing_buffer {
            state.drawing_buffer.fill(0);
        }
        presented
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("id", &self.inner.id)
            .field("client_size", &self.inner.client_size)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// Exclusive claim on a canvas, released on drop.
pub(crate) struct CanvasBinding {
    canvas: Canvas,
}

impl Drop for CanvasBinding {
    fn drop(&mut self) {
        self.canvas.inner.bound.store(false, Ordering::Release);
    }
}
