//! Tunables for the drawing page.
//!
//! Defaults match the shipped artwork (400px wide cat, five clover leaves).
//! Hosts can override any subset through `GazeConfig::from_json`.

use serde::{Deserialize, Serialize};

use crate::geometry::{EyeOffset, EyePair};
use crate::gaze::TargetSlot;

/// Interval between cyclic gaze targets on touch devices.
pub const DEFAULT_CYCLE_INTERVAL_MS: u32 = 1500;
/// Leaves the cat looks at on touch devices, visited round-robin.
pub const DEFAULT_ATTRACT_SLOTS: [TargetSlot; 3] = [TargetSlot(1), TargetSlot(3), TargetSlot(5)];
/// Number of clover leaves on the page (slots are 1-based).
pub const DEFAULT_LEAF_COUNT: u8 = 5;
/// Margin (px) inside the viewport edge where the custom cursor is hidden.
pub const DEFAULT_CURSOR_INSET_PX: f64 = 2.0;

/// Static pupil positions (px) the gaze offsets are added to when painting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseOffsets {
    pub left: EyeOffset,
    pub right: EyeOffset,
}

impl Default for BaseOffsets {
    fn default() -> Self {
        Self {
            left: EyeOffset { x: -67.0, y: 78.0 },
            right: EyeOffset { x: -89.0, y: 69.0 },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GazeConfig {
    pub eyes: EyePair,
    pub base: BaseOffsets,
    pub attract_slots: Vec<TargetSlot>,
    pub cyclic_interval_ms: u32,
    pub cursor_inset_px: f64,
    pub leaf_count: u8,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            eyes: EyePair::default(),
            base: BaseOffsets::default(),
            attract_slots: DEFAULT_ATTRACT_SLOTS.to_vec(),
            cyclic_interval_ms: DEFAULT_CYCLE_INTERVAL_MS,
            cursor_inset_px: DEFAULT_CURSOR_INSET_PX,
            leaf_count: DEFAULT_LEAF_COUNT,
        }
    }
}

impl GazeConfig {
    /// Parse overrides; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut cfg: GazeConfig = serde_json::from_str(json)?;
        // Slots outside the rendered leaves can never resolve.
        let count = cfg.leaf_count;
        cfg.attract_slots.retain(|slot| slot.0 >= 1 && slot.0 <= count);
        Ok(cfg)
    }
}
