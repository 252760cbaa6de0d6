//! Software frame renderer.
//!
//! Only the background pass exists: a frame is cleared to the solid color
//! and, in texture mode, the background texture is drawn over it with
//! nearest sampling.

use glam::Vec4;
use texsim_core::Extent2D;

use crate::scene::{BackgroundMode, BackgroundTextureFillMode, Scene};
use crate::texture::Texture2D;

/// Destination rectangle of a background texture, in canvas pixels.
///
/// The origin may be negative when the fitted texture overflows the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestRect {
    pub x: i64,
    pub y: i64,
    pub width: u64,
    pub height: u64,
}

impl DestRect {
    /// Fit a `texture` sized image into `frame` with the given mode.
    pub fn fit(frame: Extent2D, texture: Extent2D, mode: BackgroundTextureFillMode) -> Self {
        let (fw, fh) = (u64::from(frame.width), u64::from(frame.height));
        let (tw, th) = (
            u64::from(texture.width.max(1)),
            u64::from(texture.height.max(1)),
        );
        let (width, height) = match mode {
            BackgroundTextureFillMode::Fill => (fw, fh),
            BackgroundTextureFillMode::AspectFitWidth => (fw, (fw * th + tw / 2) / tw),
            BackgroundTextureFillMode::AspectFitHeight => ((fh * tw + th / 2) / th, fh),
        };
        Self {
            x: (fw as i64 - width as i64) / 2,
            y: (fh as i64 - height as i64) / 2,
            width,
            height,
        }
    }
}

/// Render `scene` into an RGBA8 frame of `extent`.
///
/// Returns false, leaving the buffer untouched, when there is nothing to
/// present: an empty frame, or no enabled camera with a usable projection.
pub fn render(scene: &Scene, buffer: &mut [u8], extent: Extent2D) -> bool {
    if extent.is_empty() || scene.active_view_projection(extent).is_none() {
        return false;
    }
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(buffer);

    let background = &scene.background;
    pixels.fill(to_rgba8(background.solid_color));

    if background.mode == BackgroundMode::Texture {
        if let Some(texture) = &background.texture {
            blit(texture, pixels, extent, background.texture_fill_mode);
        }
    }
    true
}

fn blit(texture: &Texture2D, pixels: &mut [[u8; 4]], frame: Extent2D, mode: BackgroundTextureFillMode) {
    let rect = DestRect::fit(frame, Extent2D::new(texture.width(), texture.height()), mode);
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let (tw, th) = (u64::from(texture.width()), u64::from(texture.height()));

    let y0 = rect.y.max(0);
    let y1 = (rect.y + rect.height as i64).min(i64::from(frame.height));
    let x0 = rect.x.max(0);
    let x1 = (rect.x + rect.width as i64).min(i64::from(frame.width));

    for dy in y0..y1 {
        // Sample at the destination pixel centre.
        let ly = (dy - rect.y) as u64;
        let sy = ((2 * ly + 1) * th / (2 * rect.height)).min(th - 1) as u32;
        let row = dy as usize * frame.width as usize;
        for dx in x0..x1 {
            let lx = (dx - rect.x) as u64;
            let sx = ((2 * lx + 1) * tw / (2 * rect.width)).min(tw - 1) as u32;
            pixels[row + dx as usize] = texture.texel(sx, sy);
        }
    }
}

fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}
