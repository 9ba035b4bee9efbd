//! An open document: the scene plus the image it annotates.

use std::fs;
use std::path::{Path, PathBuf};

use egui::{vec2, Vec2};
use image::{DynamicImage, RgbImage};

use crate::config::EditorSettings;
use crate::error::{Error, Result};
use crate::render::render_annotated;
use crate::scene::Scene;
use crate::sidecar;

/// Outcome of loading a sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// The image found next to the sidecar, or `None` if there was none.
    pub image: Option<PathBuf>,
    pub nodes: usize,
    pub connections: usize,
}

pub struct Document {
    pub scene: Scene,
    pub image_path: Option<PathBuf>,
    pub image: Option<DynamicImage>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

/// Opens an image, compositing any alpha channel onto white.
pub fn load_flattened(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;
    if !img.color().has_alpha() {
        return Ok(DynamicImage::ImageRgb8(img.to_rgb8()));
    }
    let rgba = img.to_rgba8();
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| ((c as u16 * a as u16 + 255 * (255 - a as u16)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    });
    Ok(DynamicImage::ImageRgb8(flat))
}

impl Document {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            scene: Scene::new(settings),
            image_path: None,
            image: None,
        }
    }

    pub fn image_size(&self) -> Option<Vec2> {
        self.image
            .as_ref()
            .map(|img| vec2(img.width() as f32, img.height() as f32))
    }

    pub fn file_name(&self) -> Option<String> {
        self.image_path
            .as_ref()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Opens a new image and clears all nodes and connections.
    pub fn open_image(&mut self, path: &Path) -> Result<()> {
        let img = load_flattened(path)?;
        tracing::info!(path = %path.display(), width = img.width(), height = img.height(), "opened image");
        self.scene.clear();
        self.image = Some(img);
        self.image_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Loads a sidecar and its sibling image, if one exists.
    ///
    /// The current document is only replaced once the whole file has parsed.
    pub fn load_json(&mut self, json_path: &Path) -> Result<LoadReport> {
        let data = fs::read_to_string(json_path).map_err(|source| Error::Io {
            path: json_path.to_path_buf(),
            source,
        })?;
        let imported = sidecar::from_json(&data, &self.scene.settings().placement).map_err(
            |source| Error::Json {
                path: json_path.to_path_buf(),
                source,
            },
        )?;

        let image = sidecar::find_sibling_image(json_path).and_then(|p| {
            match load_flattened(&p) {
                Ok(img) => Some((p, img)),
                Err(e) => {
                    tracing::warn!(error = %e, "sibling image could not be opened");
                    None
                }
            }
        });
        if image.is_none() {
            tracing::warn!(path = %json_path.display(), "no image found next to annotation file");
        }

        let report = LoadReport {
            image: image.as_ref().map(|(p, _)| p.clone()),
            nodes: imported.nodes.len(),
            connections: imported.connections.len(),
        };
        self.scene.replace_contents(imported.nodes, imported.connections);
        match image {
            Some((p, img)) => {
                self.image_path = Some(p);
                self.image = Some(img);
            }
            None => {
                self.image_path = None;
                self.image = None;
            }
        }
        tracing::info!(
            path = %json_path.display(),
            nodes = report.nodes,
            connections = report.connections,
            "loaded annotations"
        );
        Ok(report)
    }

    /// Where [`Document::save_json`] writes, if an image is open.
    pub fn json_path(&self) -> Option<PathBuf> {
        self.image_path.as_deref().map(sidecar::sidecar_path)
    }

    /// Writes the sidecar next to the image, keeping any existing `summary`.
    pub fn save_json(&self) -> Result<PathBuf> {
        let path = self.json_path().ok_or(Error::NoImage)?;
        let file_name = self.file_name().unwrap_or_default();
        let summary = fs::read_to_string(&path)
            .ok()
            .and_then(|existing| sidecar::read_summary(&existing));
        let json = sidecar::to_json(
            &self.scene.nodes,
            &self.scene.connections,
            &file_name,
            summary.as_ref(),
        )
        .map_err(|source| Error::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "saved annotations");
        Ok(path)
    }

    /// Writes `<stem>_annotated.png` next to the image.
    pub fn export_annotated(&self) -> Result<PathBuf> {
        let (Some(src), Some(image_path)) = (&self.image, &self.image_path) else {
            return Err(Error::NoImage);
        };
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        let out_path = image_path.with_file_name(format!("{stem}_annotated.png"));
        render_annotated(src, &self.scene)
            .save(&out_path)
            .map_err(|source| Error::Image {
                path: out_path.clone(),
                source,
            })?;
        tracing::info!(path = %out_path.display(), "exported annotated image");
        Ok(out_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn alpha_is_flattened_onto_white() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.png");
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        img.save(&path).unwrap();

        let flat = load_flattened(&path).unwrap();
        assert!(!flat.color().has_alpha());
        let rgb = flat.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn save_without_image_is_refused() {
        let doc = Document::default();
        assert!(matches!(doc.save_json(), Err(Error::NoImage)));
        assert!(matches!(doc.export_annotated(), Err(Error::NoImage)));
    }

    #[test]
    fn failed_load_keeps_current_scene() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{\"components\": [").unwrap();

        let mut doc = Document::default();
        doc.scene
            .add_node(crate::geometry::Rect::new(0.0, 0.0, 10.0, 10.0), "keep")
            .unwrap();
        assert!(matches!(doc.load_json(&bad), Err(Error::Json { .. })));
        assert!(matches!(
            doc.load_json(&dir.path().join("missing.json")),
            Err(Error::Io { .. })
        ));
        assert_eq!(doc.scene.nodes.len(), 1);
        assert_eq!(doc.scene.nodes[0].text, "keep");
    }
}
