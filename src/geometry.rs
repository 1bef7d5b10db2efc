//! Pupil geometry.
//!
//! Everything here is pure: a target point, the bounding box of the cat image
//! and an eye description go in, a pixel offset for the pupil comes out. The
//! offset is measured from the eye center and never leaves the eye socket.

use serde::{Deserialize, Serialize};

/// Absolute 2D coordinate (client / viewport pixels).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box sampled from the layout. Never cached across ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Point at the given fractions of width / height, relative to the top-left corner.
    pub fn at_ratio(&self, rx: f64, ry: f64) -> Point {
        Point::new(self.left + rx * self.width, self.top + ry * self.height)
    }

    /// Strict containment after shrinking every edge by `inset` pixels.
    pub fn contains_inset(&self, p: Point, inset: f64) -> bool {
        p.x > self.left + inset
            && p.y > self.top + inset
            && p.x < self.left + self.width - inset
            && p.y < self.top + self.height - inset
    }
}

/// One eye, normalized against the container: centers against width / height,
/// both radii against width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeConfig {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub pupil_radius: f64,
}

impl EyeConfig {
    /// How far (px) the pupil center may travel from the eye center.
    pub fn max_travel(&self, container_width: f64) -> f64 {
        let eye = self.radius * container_width;
        let pupil = self.pupil_radius * container_width;
        (eye - pupil).max(0.0)
    }
}

pub const LEFT_EYE: EyeConfig = EyeConfig {
    center_x: 0.4,
    center_y: 0.45,
    radius: 0.04,
    pupil_radius: 0.023,
};

// Right eye is a little larger than the left one.
pub const RIGHT_EYE: EyeConfig = EyeConfig {
    center_x: 0.6,
    center_y: 0.45,
    radius: 0.042,
    pupil_radius: 0.024,
};

/// Pixel offset of a pupil from its eye center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EyeOffset {
    pub x: f64,
    pub y: f64,
}

impl EyeOffset {
    pub const ZERO: EyeOffset = EyeOffset { x: 0.0, y: 0.0 };

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Render-ready output of the gaze engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GazeState {
    pub left: EyeOffset,
    pub right: EyeOffset,
}

/// Both eyes of the cat.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyePair {
    pub left: EyeConfig,
    pub right: EyeConfig,
}

impl Default for EyePair {
    fn default() -> Self {
        Self { left: LEFT_EYE, right: RIGHT_EYE }
    }
}

impl EyePair {
    /// Offsets for both eyes looking at `target`.
    pub fn offsets(&self, target: Point, container: Rect) -> GazeState {
        GazeState {
            left: clamp_pupil(target, container, &self.left),
            right: clamp_pupil(target, container, &self.right),
        }
    }
}

/// Offset of the pupil toward `target`, clipped to the eye's reachable disk.
pub fn clamp_pupil(target: Point, container: Rect, eye: &EyeConfig) -> EyeOffset {
    let center = container.at_ratio(eye.center_x, eye.center_y);
    let dx = target.x - center.x;
    let dy = target.y - center.y;
    let dist = dx.hypot(dy);
    if dist == 0.0 || !dist.is_finite() {
        return EyeOffset::ZERO;
    }
    let limited = dist.min(eye.max_travel(container.width));
    EyeOffset {
        x: dx / dist * limited,
        y: dy / dist * limited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAT: Rect = Rect::new(100.0, 50.0, 400.0, 300.0);

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_far_target_is_fully_clamped() {
        let max = LEFT_EYE.max_travel(CAT.width);
        assert!(approx(max, 0.04 * 400.0 - 0.023 * 400.0));
        for target in [
            Point::new(-1_000.0, 0.0),
            Point::new(2_000.0, 900.0),
            Point::new(260.0, -500.0),
        ] {
            let off = clamp_pupil(target, CAT, &LEFT_EYE);
            assert!(approx(off.magnitude(), max), "offset {:?} for {:?}", off, target);
        }
    }

    #[test]
    fn test_target_at_center_returns_zero() {
        let center = CAT.at_ratio(RIGHT_EYE.center_x, RIGHT_EYE.center_y);
        assert_eq!(clamp_pupil(center, CAT, &RIGHT_EYE), EyeOffset::ZERO);
    }

    #[test]
    fn test_near_target_passes_through_unchanged() {
        // left eye center = (260, 185); max travel = 6.8px
        let target = Point::new(263.0, 181.0);
        let off = clamp_pupil(target, CAT, &LEFT_EYE);
        assert!(approx(off.x, 3.0));
        assert!(approx(off.y, -4.0));
        assert_eq!(off, clamp_pupil(target, CAT, &LEFT_EYE));
    }

    #[test]
    fn test_pupil_larger_than_eye_never_moves() {
        let eye = EyeConfig { center_x: 0.5, center_y: 0.5, radius: 0.01, pupil_radius: 0.05 };
        assert_eq!(eye.max_travel(CAT.width), 0.0);
        let off = clamp_pupil(Point::new(0.0, 0.0), CAT, &eye);
        assert!(approx(off.magnitude(), 0.0));
    }

    #[test]
    fn test_pair_uses_each_eye_independently() {
        let state = EyePair::default().offsets(Point::new(10_000.0, 185.0), CAT);
        assert!(approx(state.left.magnitude(), LEFT_EYE.max_travel(400.0)));
        assert!(approx(state.right.magnitude(), RIGHT_EYE.max_travel(400.0)));
        assert!(state.left.magnitude() < state.right.magnitude());
    }

    #[test]
    fn test_contains_inset() {
        let vp = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(vp.contains_inset(Point::new(50.0, 50.0), 2.0));
        assert!(!vp.contains_inset(Point::new(2.0, 50.0), 2.0));
        assert!(!vp.contains_inset(Point::new(50.0, 98.0), 2.0));
    }
}
