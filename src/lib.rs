//! Image annotation with labelled rectangles ("nodes") and typed, optionally
//! directed edges between them ("connections").
//!
//! The library holds everything that does not need a window: the scene model,
//! hit testing, containment-based hierarchy, the JSON sidecar format and the
//! raster export. The `annotate-graph` binary is an egui front end over it.

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod model;
pub mod render;
pub mod scene;
pub mod sidecar;
pub mod view;

pub use config::{EditorSettings, ParentRule, PlacementSettings};
pub use document::{Document, LoadReport};
pub use error::{Error, Result};
pub use geometry::Rect;
pub use model::{Connection, ConnectionKind, ConnectionStyle, Node, Rgb};
pub use scene::{ConnectPick, Scene, Selection};
pub use view::ViewState;
