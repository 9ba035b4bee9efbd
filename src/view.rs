//! View transform between screen space and image space.
//!
//! Stored geometry is always in unscaled image space. The transform
//! `screen = image * scale_factor + offset` is applied only when drawing
//! and hit testing. Screen space here is relative to the canvas origin.

use egui::{vec2, Pos2, Vec2};

use crate::config::EditorSettings;
use crate::geometry::Rect;

#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub scale_factor: f32,
    /// Pan offset in screen pixels (`img_x`, `img_y`).
    pub offset: Vec2,
    pub keep_aspect_ratio: bool,
    pub opacity: u8,
    zoom_step: f32,
    min_scale: f32,
    max_scale: Option<f32>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(&EditorSettings::default())
    }
}

impl ViewState {
    pub fn new(settings: &EditorSettings) -> Self {
        Self {
            scale_factor: 1.0,
            offset: Vec2::ZERO,
            keep_aspect_ratio: true,
            opacity: settings.default_opacity,
            zoom_step: settings.zoom_step,
            min_scale: settings.min_scale,
            max_scale: settings.max_scale,
        }
    }

    pub fn to_image(&self, screen: Pos2) -> Pos2 {
        ((screen - self.offset).to_vec2() / self.scale_factor).to_pos2()
    }

    pub fn to_screen(&self, image: Pos2) -> Pos2 {
        (image.to_vec2() * self.scale_factor + self.offset).to_pos2()
    }

    pub fn rect_to_screen(&self, r: &Rect) -> egui::Rect {
        egui::Rect::from_two_pos(
            self.to_screen(egui::pos2(r.x1, r.y1)),
            self.to_screen(egui::pos2(r.x2, r.y2)),
        )
    }

    /// Converts a screen-pixel length to image-space units.
    pub fn to_image_len(&self, screen_len: f32) -> f32 {
        screen_len / self.scale_factor
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        let scale = scale.max(self.min_scale);
        match self.max_scale {
            Some(max) => scale.min(max),
            None => scale,
        }
    }

    /// One discrete zoom step. Positive `direction` zooms in, negative out.
    ///
    /// Zoom is anchored at the image origin, so content under the cursor shifts.
    pub fn zoom(&mut self, direction: f32) {
        if direction > 0.0 {
            self.scale_factor = self.clamp_scale(self.scale_factor + self.zoom_step);
        } else if direction < 0.0 {
            self.scale_factor = self.clamp_scale(self.scale_factor - self.zoom_step);
        }
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale_factor = self.clamp_scale(scale);
    }

    /// Unbounded: content may be moved fully off screen.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Fits the image to the canvas and resets the pan offset.
    ///
    /// With `keep_aspect_ratio` the image is scaled uniformly to fit;
    /// otherwise it is shown at its natural size.
    pub fn fit_to_canvas(&mut self, image_size: Vec2, canvas_size: Vec2) {
        self.offset = Vec2::ZERO;
        if !self.keep_aspect_ratio || image_size.x <= 0.0 || image_size.y <= 0.0 {
            self.set_scale(1.0);
            return;
        }
        let fit = (canvas_size.x / image_size.x).min(canvas_size.y / image_size.y);
        self.set_scale(fit);
    }

    /// On-screen size of an image of `image_size` pixels.
    pub fn scaled_size(&self, image_size: Vec2) -> Vec2 {
        vec2(
            (image_size.x * self.scale_factor).floor(),
            (image_size.y * self.scale_factor).floor(),
        )
    }
}
