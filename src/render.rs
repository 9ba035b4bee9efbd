//! Rasterizes a scene over its source image.
//!
//! Shared stroke geometry (arrowheads, dash patterns) lives here too so the
//! on-screen canvas and the exported image agree.

use egui::{pos2, Pos2};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::model::{ConnectionKind, Rgb};
use crate::scene::Scene;

pub const NODE_COLOR: Rgb = Rgb::new(255, 0, 0);
pub const NODE_THICKNESS: f32 = 3.0;
pub const CONNECTION_THICKNESS: f32 = 2.0;

/// `(dash, gap)` lengths in pixels, or `None` for a solid stroke.
pub fn dash_pattern(kind: ConnectionKind) -> Option<(f32, f32)> {
    match kind {
        ConnectionKind::Dashed => Some((12.0, 4.0)),
        ConnectionKind::Dotted => Some((4.0, 2.0)),
        ConnectionKind::Line | ConnectionKind::Unknown => None,
    }
}

/// Triangle `[tip, left, right]` for an arrow ending at `end`.
pub fn arrowhead(start: Pos2, end: Pos2, thickness: f32) -> Option<[Pos2; 3]> {
    let v = end - start;
    if v.length() <= f32::EPSILON {
        return None;
    }
    let dir = v.normalized();
    let head_len = (thickness * 4.0).max(10.0);
    let perp = egui::vec2(-dir.y, dir.x);
    let p1 = end - dir * head_len + perp * head_len * 0.4;
    let p2 = end - dir * head_len - perp * head_len * 0.4;
    Some([end, p1, p2])
}

fn draw_line_on_image(
    img: &mut RgbaImage,
    a: Pos2,
    b: Pos2,
    thickness: f32,
    color: [u8; 4],
    pattern: Option<(f32, f32)>,
) {
    let d = b - a;
    let len = d.length();
    let steps = (len * 2.0) as i32;
    let half_t = (thickness / 2.0).max(0.5) as i32;
    let (w, h) = (img.width() as i32, img.height() as i32);

    for i in 0..=steps {
        let t = i as f32 / steps.max(1) as f32;
        if let Some((dash, gap)) = pattern {
            if (len * t) % (dash + gap) >= dash {
                continue;
            }
        }
        let cx = (a.x + d.x * t) as i32;
        let cy = (a.y + d.y * t) as i32;
        for oy in -half_t..=half_t {
            for ox in -half_t..=half_t {
                let px = cx + ox;
                let py = cy + oy;
                if px >= 0 && px < w && py >= 0 && py < h {
                    img.put_pixel(px as u32, py as u32, Rgba(color));
                }
            }
        }
    }
}

fn rgba(c: Rgb) -> [u8; 4] {
    [c.r, c.g, c.b, 255]
}

/// Draws node outlines and connections over a copy of `source`.
///
/// Labels are not rasterized.
pub fn render_annotated(source: &DynamicImage, scene: &Scene) -> RgbaImage {
    let mut img = source.to_rgba8();

    for node in &scene.nodes {
        let r = node.coords;
        let c = rgba(NODE_COLOR);
        let corners = [
            pos2(r.x1, r.y1),
            pos2(r.x2, r.y1),
            pos2(r.x2, r.y2),
            pos2(r.x1, r.y2),
        ];
        for i in 0..4 {
            draw_line_on_image(&mut img, corners[i], corners[(i + 1) % 4], NODE_THICKNESS, c, None);
        }
    }

    for conn in &scene.connections {
        let Some((from, to)) = scene.endpoints(conn) else {
            continue;
        };
        let c = rgba(conn.color);
        draw_line_on_image(
            &mut img,
            from,
            to,
            CONNECTION_THICKNESS,
            c,
            dash_pattern(conn.kind),
        );
        if conn.direction {
            if let Some([tip, p1, p2]) = arrowhead(from, to, CONNECTION_THICKNESS) {
                draw_line_on_image(&mut img, tip, p1, CONNECTION_THICKNESS, c, None);
                draw_line_on_image(&mut img, tip, p2, CONNECTION_THICKNESS, c, None);
                draw_line_on_image(&mut img, p1, p2, CONNECTION_THICKNESS, c, None);
            }
        }
    }

    img
}
