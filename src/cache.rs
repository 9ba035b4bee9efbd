//! Cache for the bitmap shown behind the scene.
//!
//! The displayed bitmap is the source image resized to the current zoom with
//! the display opacity applied. It is rebuilt only when the scale factor or
//! the opacity changes, or after [`DisplayCache::invalidate`].

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

/// Upper bound on either side of the cached bitmap. Larger zooms reuse a
/// bitmap of this size and let the painter stretch it.
pub const MAX_SIDE: u32 = 8192;

#[derive(Clone, Copy, Debug, PartialEq)]
struct CacheKey {
    scale_bits: u32,
    opacity: u8,
}

#[derive(Default)]
pub struct DisplayCache {
    key: Option<CacheKey>,
    bitmap: Option<RgbaImage>,
    renders: usize,
}

impl DisplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cached bitmap, e.g. after a different image was opened.
    pub fn invalidate(&mut self) {
        tracing::debug!("display bitmap invalidated");
        self.key = None;
        self.bitmap = None;
    }

    /// Makes sure the cached bitmap matches `scale` and `opacity`.
    ///
    /// Returns `true` when the bitmap was rebuilt.
    pub fn refresh(&mut self, source: &DynamicImage, scale: f32, opacity: u8) -> bool {
        let key = CacheKey {
            scale_bits: scale.to_bits(),
            opacity,
        };
        if self.key == Some(key) && self.bitmap.is_some() {
            return false;
        }
        tracing::debug!(scale, opacity, "rebuilding display bitmap");
        self.bitmap = Some(build_bitmap(source, scale, opacity));
        self.key = Some(key);
        self.renders += 1;
        true
    }

    pub fn bitmap(&self) -> Option<&RgbaImage> {
        self.bitmap.as_ref()
    }

    /// Number of rebuilds so far.
    pub fn renders(&self) -> usize {
        self.renders
    }
}

fn scaled_dims(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let mut w = ((width as f32 * scale) as u32).max(1);
    let mut h = ((height as f32 * scale) as u32).max(1);
    let longest = w.max(h);
    if longest > MAX_SIDE {
        let shrink = |side: u32| ((side as u64 * MAX_SIDE as u64 / longest as u64) as u32).max(1);
        w = shrink(w);
        h = shrink(h);
    }
    (w, h)
}

fn build_bitmap(source: &DynamicImage, scale: f32, opacity: u8) -> RgbaImage {
    let (w, h) = scaled_dims(source.width(), source.height(), scale);
    let mut bitmap = if (w, h) == (source.width(), source.height()) {
        source.to_rgba8()
    } else {
        source.resize_exact(w, h, FilterType::Lanczos3).to_rgba8()
    };
    for pixel in bitmap.pixels_mut() {
        pixel.0[3] = opacity;
    }
    bitmap
}
