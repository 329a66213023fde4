//! Canvas rendering.
//!
//! [`CanvasRenderer`] owns an RGBA backing buffer sized to a [`Surface`]
//! (logical size times device pixel ratio) and draws store frames into it
//! with a top-anchored "cover" fit: the frame fills the whole surface,
//! horizontal overflow is cropped evenly from both sides and vertical
//! overflow is cropped from the bottom only.

use std::sync::{Arc, Weak};

use image::{
    Rgba, RgbaImage,
    imageops::{self, FilterType},
};

use crate::{frame::DecodedFrame, mapper::frame_index, store::FrameStore};

/// Logical size of the output surface and the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    /// Width in logical (CSS) pixels.
    pub width: f64,
    /// Height in logical (CSS) pixels.
    pub height: f64,
    /// Physical pixels per logical pixel.
    pub device_pixel_ratio: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Backing-store size in physical pixels.
    ///
    /// Non-positive or non-finite inputs give a zero-sized backing store,
    /// onto which nothing is ever drawn.
    pub fn backing_size(&self) -> (u32, u32) {
        let ratio = if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        let scale = |logical: f64| {
            if logical.is_finite() && logical > 0.0 {
                (logical * ratio).round() as u32
            } else {
                0
            }
        };
        (scale(self.width), scale(self.height))
    }
}

/// Placement of a frame drawn with a top-anchored cover fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    /// Scale applied to the frame.
    pub scale: f64,
    pub draw_width: u32,
    pub draw_height: u32,
    /// Horizontal draw offset; negative when overflow is cropped.
    pub offset_x: i64,
    /// Vertical draw offset; always 0 (top-anchored).
    pub offset_y: i64,
}

/// Compute the cover fit of a frame onto a surface.
///
/// A frame wider than the surface gets the surface's height and overflows
/// horizontally, centred. A frame taller than the surface gets the surface's
/// width and overflows downwards. Returns `None` if either size is zero.
///
/// # Example
///
/// ```
/// use scrollframe::cover_fit;
///
/// // 16:9 frame onto a square surface: height fits, width is cropped.
/// let fit = cover_fit(1600, 900, 900, 900).unwrap();
/// assert_eq!((fit.draw_width, fit.draw_height), (1600, 900));
/// assert_eq!(fit.offset_x, -350);
/// ```
pub fn cover_fit(frame_width: u32, frame_height: u32, surface_width: u32, surface_height: u32) -> Option<CoverFit> {
    if frame_width == 0 || frame_height == 0 || surface_width == 0 || surface_height == 0 {
        return None;
    }

    let (fw, fh) = (frame_width as f64, frame_height as f64);
    let (sw, sh) = (surface_width as f64, surface_height as f64);

    // Cross-multiplied aspect comparison, exact for integer sizes.
    let frame_is_wider = fw * sh > sw * fh;

    let (scale, draw_width, draw_height) = if frame_is_wider {
        let scale = sh / fh;
        let width = ((fw * scale).round() as u32).max(surface_width);
        (scale, width, surface_height)
    } else {
        let scale = sw / fw;
        let height = ((fh * scale).round() as u32).max(surface_height);
        (scale, surface_width, height)
    };

    let offset_x = (surface_width as i64 - draw_width as i64) / 2;

    Some(CoverFit {
        scale,
        draw_width,
        draw_height,
        offset_x,
        offset_y: 0,
    })
}

/// The last frame raster scaled to its cover-fit size.
///
/// Holds the frame weakly so that the cache never keeps a released frame
/// alive.
#[derive(Debug, Clone)]
struct ScaledFrame {
    source: Weak<DecodedFrame>,
    image: RgbaImage,
}

impl ScaledFrame {
    fn is_for(&self, frame: &Arc<DecodedFrame>, width: u32, height: u32) -> bool {
        Weak::ptr_eq(&self.source, &Arc::downgrade(frame)) && self.image.dimensions() == (width, height)
    }
}

/// Draws store frames onto a DPR-scaled RGBA canvas.
///
/// The scaled raster of the last drawn frame is kept, so redrawing the same
/// frame at the same canvas size is a plain copy.
///
/// # Example
///
/// ```
/// use scrollframe::{CanvasRenderer, FrameStore, Surface};
///
/// let mut renderer = CanvasRenderer::mount(Surface::new(640.0, 360.0, 2.0));
/// assert_eq!(renderer.canvas().dimensions(), (1280, 720));
///
/// // Nothing to draw yet: a no-op.
/// let store = FrameStore::new(30);
/// assert_eq!(renderer.draw_progress(&store, 0.5), None);
/// ```
#[derive(Debug, Clone)]
pub struct CanvasRenderer {
    surface: Surface,
    canvas: RgbaImage,
    background: Rgba<u8>,
    filter: FilterType,
    last_index: Option<usize>,
    scaled: Option<ScaledFrame>,
}

impl CanvasRenderer {
    /// Allocate a backing store for `surface`.
    pub fn mount(surface: Surface) -> Self {
        let background = Rgba([0, 0, 0, 255]);
        let (width, height) = surface.backing_size();
        log::debug!("Mounting canvas {width}x{height} (dpr {})", surface.device_pixel_ratio);
        Self {
            surface,
            canvas: RgbaImage::from_pixel(width, height, background),
            background,
            filter: FilterType::Triangle,
            last_index: None,
            scaled: None,
        }
    }

    /// Colour shown where no frame has been drawn.
    #[must_use]
    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self.clear();
        self
    }

    /// Resampling filter used when scaling frames.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self.scaled = None;
        self
    }

    /// Reallocate for a new surface size or pixel ratio and redraw the
    /// last drawn frame. Returns whether a frame was redrawn.
    pub fn resize(&mut self, surface: Surface, store: &FrameStore) -> bool {
        self.surface = surface;
        let (width, height) = surface.backing_size();
        if self.canvas.dimensions() != (width, height) {
            log::debug!("Resizing canvas to {width}x{height}");
            self.canvas = RgbaImage::from_pixel(width, height, self.background);
        }
        self.redraw(store)
    }

    /// Draw the frame at `index`, clamped to the store's bounds.
    ///
    /// Drawing into an empty store or a zero-sized canvas is a no-op and
    /// returns `false`. Drawing the same index twice gives identical pixels.
    pub fn draw(&mut self, store: &FrameStore, index: usize) -> bool {
        if store.is_empty() {
            return false;
        }
        let index = index.min(store.len() - 1);
        let Some(frame) = store.get(index) else {
            return false;
        };

        let (width, height) = self.canvas.dimensions();
        let Some(fit) = cover_fit(frame.width(), frame.height(), width, height) else {
            return false;
        };

        let reusable = self
            .scaled
            .as_ref()
            .is_some_and(|scaled| scaled.is_for(&frame, fit.draw_width, fit.draw_height));
        if !reusable {
            self.scaled = Some(ScaledFrame {
                source: Arc::downgrade(&frame),
                image: imageops::resize(frame.image(), fit.draw_width, fit.draw_height, self.filter),
            });
        }

        self.clear();
        if let Some(scaled) = &self.scaled {
            imageops::replace(&mut self.canvas, &scaled.image, fit.offset_x, fit.offset_y);
        }
        self.last_index = Some(index);
        true
    }

    /// Map `progress` onto the store and draw the selected frame.
    pub fn draw_progress(&mut self, store: &FrameStore, progress: f64) -> Option<usize> {
        let index = frame_index(progress, store.len())?;
        self.draw(store, index).then_some(index)
    }

    /// Draw the last drawn index again, if there is one.
    pub fn redraw(&mut self, store: &FrameStore) -> bool {
        match self.last_index {
            Some(index) => self.draw(store, index),
            None => false,
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Index of the frame currently on the canvas.
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// Forget the drawn frame and blank the canvas, for a new source.
    pub(crate) fn reset(&mut self) {
        self.last_index = None;
        self.scaled = None;
        self.clear();
    }

    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = self.background;
        }
    }
}
