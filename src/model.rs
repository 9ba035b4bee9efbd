use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Rect;

// ── Colors ──────────────────────────────────────────────────────────────────

/// An opaque RGB color, written to disk as `#rrggbb`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_egui(self) -> egui::Color32 {
        egui::Color32::from_rgb(self.r, self.g, self.b)
    }

    pub fn from_egui(c: egui::Color32) -> Self {
        Self::new(c.r(), c.g(), c.b())
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_array([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parses `#rrggbb`, `#rgb` or a handful of common color names.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let channel = |i: usize, w: usize| u8::from_str_radix(hex.get(i..i + w)?, 16).ok();
            return match hex.len() {
                6 => Some(Self::new(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
                3 => {
                    let (r, g, b) = (channel(0, 1)?, channel(1, 1)?, channel(2, 1)?);
                    Some(Self::new(r * 17, g * 17, b * 17))
                }
                _ => None,
            };
        }
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Self::new(0, 0, 0),
            "white" => Self::new(255, 255, 255),
            "red" => Self::new(255, 0, 0),
            "green" => Self::new(0, 128, 0),
            "blue" => Self::new(0, 0, 255),
            "yellow" => Self::new(255, 255, 0),
            "orange" => Self::new(255, 165, 0),
            "purple" => Self::new(128, 0, 128),
            "gray" | "grey" => Self::new(128, 128, 128),
            _ => return None,
        };
        Some(named)
    }
}

impl From<String> for Rgb {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or_else(|| {
            tracing::warn!(color = %s, "unrecognized color, using black");
            Self::BLACK
        })
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_hex()
    }
}

// ── Connections ─────────────────────────────────────────────────────────────

/// Line style of a connection. Only affects rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Line,
    Dashed,
    Dotted,
    #[serde(other)]
    Unknown,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 4] = [Self::Line, Self::Dashed, Self::Dotted, Self::Unknown];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool state copied onto every newly created connection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionStyle {
    pub kind: ConnectionKind,
    pub color: Rgb,
    pub direction: bool,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self {
            kind: ConnectionKind::Line,
            color: Rgb::BLACK,
            direction: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub from: String,
    pub to: String,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    pub direction: bool,
    pub color: Rgb,
}

impl Connection {
    pub fn touches(&self, node_id: &str) -> bool {
        self.from == node_id || self.to == node_id
    }

    pub fn list_label(&self) -> String {
        let arrow = if self.direction { "→" } else { "←" };
        format!(
            "Connection({}): {} {} {} ({}) [Type: {}]",
            self.id,
            self.from,
            arrow,
            self.to,
            self.text.as_deref().unwrap_or(""),
            self.kind
        )
    }
}

// ── Nodes ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub coords: Rect,
    pub text: String,
    /// Derived from geometry; see [`crate::scene::Scene::infer_hierarchy`].
    pub parent_id: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, coords: Rect, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            coords,
            text: text.into(),
            parent_id: None,
        }
    }

    pub fn list_label(&self) -> String {
        format!("Node({}): {}", self.id, self.text)
    }
}

// ── Ids ─────────────────────────────────────────────────────────────────────

const ID_LEN: usize = 3;
const ATTEMPTS_PER_LEN: usize = 64;

/// Short random token that `taken` does not reject.
///
/// Tokens start at three hex characters and grow by one whenever a length
/// keeps colliding, up to a full simple uuid.
pub fn fresh_id(taken: impl Fn(&str) -> bool) -> String {
    for len in ID_LEN..32 {
        for _ in 0..ATTEMPTS_PER_LEN {
            let mut id = uuid::Uuid::new_v4().simple().to_string();
            id.truncate(len);
            if !taken(&id) {
                return id;
            }
        }
        tracing::debug!(len, "id space crowded, widening");
    }
    uuid::Uuid::new_v4().simple().to_string()
}
