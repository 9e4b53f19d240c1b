//! Timeline configuration.
//!
//! Every presentation heuristic of the engine lives in [`TimelineConfig`].
//! The configuration is plain JSON with `#RRGGBB` / `#RRGGBBAA` colour
//! strings so it can be edited by hand.
//!
//! All sections carry `#[serde(default)]`, so a partial file is valid and
//! missing keys fall back to the built-in defaults.

use std::path::Path;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Status;

// ─── Hex-colour serde helper ────────────────────────────────────────────────

pub mod hex_color {
    use egui::Color32;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_hex(*color))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Color32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_color(&s).map_err(serde::de::Error::custom)
    }

    pub fn to_hex(color: Color32) -> String {
        let [r, g, b, a] = color.to_srgba_unmultiplied();
        if a == 255 {
            format!("#{:02X}{:02X}{:02X}", r, g, b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
        }
    }

    pub fn parse_hex_color(s: &str) -> Result<Color32, String> {
        let s = s.trim().trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            s.get(range)
                .ok_or_else(|| format!("Invalid hex color '{}'", s))
                .and_then(|part| u8::from_str_radix(part, 16).map_err(|e| e.to_string()))
        };
        match s.len() {
            6 => Ok(Color32::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Color32::from_rgba_unmultiplied(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(format!("Invalid hex color '{}': expected 6 or 8 hex digits", s)),
        }
    }
}

// ─── Top-level definition ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub arrows: ArrowConfig,
    pub hierarchy: HierarchyConfig,
    pub focus: FocusConfig,
    pub toolbar: ToolbarConfig,
    pub palette: StatusPalette,
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ─── Arrows ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowConfig {
    /// Horizontal control-point offset, as a multiple of the smaller
    /// endpoint height.
    pub pull_factor: f32,
    /// Where an off-screen target endpoint is pinned. `None` uses the
    /// collaborator's viewport width.
    pub far_edge: Option<f32>,
}

impl Default for ArrowConfig {
    fn default() -> Self {
        Self {
            pull_factor: 1.0,
            far_edge: None,
        }
    }
}

// ─── Hierarchy ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Space reserved above a nested container for its label.
    pub label_padding: f32,
    /// Padding around the bounding box of the visible sub-tasks.
    pub container_padding: f32,
    /// Horizontal offset of the label inside its container.
    pub label_indent: f32,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            label_padding: 20.0,
            container_padding: 5.0,
            label_indent: 10.0,
        }
    }
}

// ─── Focus ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Seconds shown before the start and after the finish of a focused task.
    pub margin_secs: i64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self { margin_secs: 5 }
    }
}

// ─── Toolbar ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarConfig {
    pub zoom_ratio: f64,
    pub motion_ratio: f64,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            zoom_ratio: 0.2,
            motion_ratio: 0.2,
        }
    }
}

// ─── Status palette ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPalette {
    #[serde(with = "hex_color")]
    pub failed: Color32,
    #[serde(with = "hex_color")]
    pub blocked: Color32,
    #[serde(with = "hex_color")]
    pub unknown: Color32,
    #[serde(with = "hex_color")]
    pub running: Color32,
    #[serde(with = "hex_color")]
    pub success: Color32,
}

impl StatusPalette {
    pub fn color(&self, status: Status) -> Color32 {
        match status {
            Status::Failed => self.failed,
            Status::Blocked => self.blocked,
            Status::Unknown => self.unknown,
            Status::Running => self.running,
            Status::Success => self.success,
        }
    }
}

impl Default for StatusPalette {
    fn default() -> Self {
        Self {
            failed: Color32::from_rgb(229, 57, 53),
            blocked: Color32::from_rgb(251, 140, 0),
            unknown: Color32::from_rgb(158, 158, 158),
            running: Color32::from_rgb(66, 133, 244),
            success: Color32::from_rgb(52, 168, 83),
        }
    }
}
