//! Gaze engine: owns the pupil offsets and exactly one input driver.
//!
//! On desktop the pupils follow the mouse (`PointerTracker`); on touch devices
//! they glance between a few clover leaves on a timer (`CyclicTargetDriver`).
//! Once a leaf has been picked, or a draw is loading, the eyes freeze.
//!
//! Driver lifecycle:
//! - `mount` starts the driver for the initial inputs.
//! - `remount` with changed inputs disposes the running driver first, then
//!   starts the next one (or none, when frozen).
//! - Every start bumps an epoch; an update carrying an older epoch is dropped,
//!   so a late callback from a disposed driver can never overwrite state.

mod cyclic;
mod pointer;

use std::cell::Cell;
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::GazeConfig;
use crate::geometry::{EyeOffset, GazeState};
use crate::host::{Disposer, Host};

pub use cyclic::{AttractCycle, CyclicTargetDriver};
pub use pointer::{CursorSignal, CursorState, PointerTracker};

/// Callback a driver publishes through. Drivers never touch engine state directly.
pub type UpdateFn = Rc<dyn Fn(GazeState)>;

/// 1-based clover leaf index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSlot(pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceMode {
    /// A hovering pointer exists.
    Pointer,
    /// Touch only; gaze follows the scripted leaf cycle.
    Cyclic,
}

impl DeviceMode {
    pub fn detect(touch_capable: bool) -> Self {
        if touch_capable { DeviceMode::Cyclic } else { DeviceMode::Pointer }
    }
}

/// Everything the engine's driver choice depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GazeInputs {
    pub mode: DeviceMode,
    pub selection_locked: bool,
    pub loading: bool,
}

impl GazeInputs {
    pub fn new(mode: DeviceMode) -> Self {
        Self { mode, selection_locked: false, loading: false }
    }

    pub fn frozen(&self) -> bool {
        self.selection_locked || self.loading
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveDriver {
    Frozen,
    Pointer,
    Cyclic,
}

pub struct GazeEngine {
    host: Rc<dyn Host>,
    config: GazeConfig,
    inputs: GazeInputs,
    state: Rc<Cell<GazeState>>,
    epoch: Rc<Cell<u64>>,
    cursor: CursorSignal,
    active: ActiveDriver,
    driver: Disposer,
}

impl GazeEngine {
    pub fn mount(host: Rc<dyn Host>, config: GazeConfig, inputs: GazeInputs) -> Self {
        let mut engine = Self {
            host,
            config,
            inputs,
            state: Rc::new(Cell::new(GazeState::default())),
            epoch: Rc::new(Cell::new(0)),
            cursor: CursorSignal::default(),
            active: ActiveDriver::Frozen,
            driver: Disposer::noop(),
        };
        engine.start();
        engine
    }

    /// Re-evaluate the driver for new inputs. Unchanged inputs keep the running driver.
    pub fn remount(&mut self, inputs: GazeInputs) {
        if inputs == self.inputs {
            return;
        }
        self.inputs = inputs;
        self.stop();
        self.start();
    }

    /// Release the running driver. The last state stays readable.
    pub fn dispose(&mut self) {
        self.stop();
    }

    /// Latest pupil offsets (relative to each eye center).
    pub fn state(&self) -> GazeState {
        self.state.get()
    }

    /// Offsets plus the static base positions, ready to paint.
    pub fn pupil_positions(&self) -> GazeState {
        let g = self.state.get();
        let base = self.config.base;
        GazeState {
            left: EyeOffset { x: base.left.x + g.left.x, y: base.left.y + g.left.y },
            right: EyeOffset { x: base.right.x + g.right.x, y: base.right.y + g.right.y },
        }
    }

    pub fn active(&self) -> ActiveDriver {
        self.active
    }

    pub fn inputs(&self) -> GazeInputs {
        self.inputs
    }

    pub fn config(&self) -> &GazeConfig {
        &self.config
    }

    pub fn cursor(&self) -> CursorSignal {
        self.cursor.clone()
    }

    fn stop(&mut self) {
        self.driver.dispose();
        self.epoch.set(self.epoch.get() + 1);
        self.active = ActiveDriver::Frozen;
    }

    fn publisher(&self) -> UpdateFn {
        let state = self.state.clone();
        let epoch = self.epoch.clone();
        let mine = epoch.get();
        Rc::new(move |g: GazeState| {
            if epoch.get() == mine {
                state.set(g);
            }
        })
    }

    fn start(&mut self) {
        let host = self.host.clone();
        let inset = self.config.cursor_inset_px;
        let (active, driver) = match (self.inputs.mode, self.inputs.frozen()) {
            (DeviceMode::Pointer, true) => (
                ActiveDriver::Frozen,
                PointerTracker::cursor_only(host, inset, self.cursor.clone()),
            ),
            (DeviceMode::Cyclic, true) => {
                self.cursor.set_visible(false);
                (ActiveDriver::Frozen, Disposer::noop())
            }
            (DeviceMode::Pointer, false) => (
                ActiveDriver::Pointer,
                PointerTracker::start(host, self.config.eyes, inset, self.cursor.clone(), self.publisher()),
            ),
            (DeviceMode::Cyclic, false) => {
                self.cursor.set_visible(false);
                (
                    ActiveDriver::Cyclic,
                    CyclicTargetDriver::start(
                        host,
                        self.config.eyes,
                        &self.config.attract_slots,
                        self.config.cyclic_interval_ms,
                        self.publisher(),
                    ),
                )
            }
        };
        debug!("gaze driver {:?} for {:?}", active, self.inputs);
        self.active = active;
        self.driver = driver;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::host::{HeadlessHost, PointerEvent};

    fn host() -> HeadlessHost {
        let host = HeadlessHost::new(Rect::new(0.0, 0.0, 1000.0, 800.0));
        host.set_reference(Some(Rect::new(300.0, 100.0, 400.0, 300.0)));
        for n in 1..=5u8 {
            let x = 100.0 + f64::from(n) * 120.0;
            host.set_target(TargetSlot(n), Some(Rect::new(x, 600.0, 64.0, 64.0)));
        }
        host
    }

    fn mount(host: &HeadlessHost, inputs: GazeInputs) -> GazeEngine {
        GazeEngine::mount(Rc::new(host.clone()), GazeConfig::default(), inputs)
    }

    #[test]
    fn test_detect_mode() {
        assert_eq!(DeviceMode::detect(true), DeviceMode::Cyclic);
        assert_eq!(DeviceMode::detect(false), DeviceMode::Pointer);
    }

    #[test]
    fn test_pointer_mode_tracks_moves() {
        let host = host();
        let engine = mount(&host, GazeInputs::new(DeviceMode::Pointer));
        assert_eq!(engine.active(), ActiveDriver::Pointer);
        host.pointer(PointerEvent::Move(Point::new(0.0, 0.0)));
        assert!(engine.state().left.x < 0.0);
        assert!(!engine.cursor().is_visible());
    }

    #[test]
    fn test_cyclic_mode_publishes_immediately() {
        let host = host();
        let engine = mount(&host, GazeInputs::new(DeviceMode::Cyclic));
        assert_eq!(engine.active(), ActiveDriver::Cyclic);
        assert_ne!(engine.state(), GazeState::default());
    }

    #[test]
    fn test_locked_freezes_last_state() {
        let host = host();
        let mut engine = mount(&host, GazeInputs::new(DeviceMode::Pointer));
        host.pointer(PointerEvent::Move(Point::new(900.0, 700.0)));
        let before = engine.state();
        engine.remount(GazeInputs { selection_locked: true, ..engine.inputs() });
        assert_eq!(engine.active(), ActiveDriver::Frozen);
        host.pointer(PointerEvent::Move(Point::new(0.0, 0.0)));
        assert_eq!(engine.state(), before);
        // cursor overlay keeps following the mouse
        assert_eq!(engine.cursor().get().position, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_loading_freezes_cyclic() {
        let host = host();
        let mut engine = mount(&host, GazeInputs::new(DeviceMode::Cyclic));
        let first = engine.state();
        engine.remount(GazeInputs { loading: true, ..engine.inputs() });
        assert_eq!(host.active_timers(), 0);
        host.advance(6_000);
        assert_eq!(engine.state(), first);
        engine.remount(GazeInputs { loading: false, ..engine.inputs() });
        assert_eq!(engine.active(), ActiveDriver::Cyclic);
        assert_eq!(host.active_timers(), 1);
    }

    #[test]
    fn test_switch_cyclic_to_pointer_disposes_timers_first() {
        let host = host();
        let mut engine = mount(&host, GazeInputs::new(DeviceMode::Cyclic));
        host.advance(1_500);
        engine.remount(GazeInputs::new(DeviceMode::Pointer));
        assert_eq!(host.active_timers(), 0);
        assert_eq!(host.pointer_subscribers(), 1);
        host.pointer(PointerEvent::Move(Point::new(460.0, 235.0)));
        let at_left_eye = engine.state();
        assert_eq!(at_left_eye.left, EyeOffset::ZERO);
        host.advance(10_000);
        assert_eq!(engine.state(), at_left_eye);
    }

    #[test]
    fn test_same_inputs_keep_driver() {
        let host = host();
        let mut engine = mount(&host, GazeInputs::new(DeviceMode::Cyclic));
        host.advance(1_500);
        let state = engine.state();
        engine.remount(GazeInputs::new(DeviceMode::Cyclic));
        // no restart: the cycle did not jump back to the first leaf
        assert_eq!(engine.state(), state);
        assert_eq!(host.active_timers(), 1);
    }

    #[test]
    fn test_dispose_is_idempotent_and_releases() {
        let host = host();
        let mut engine = mount(&host, GazeInputs::new(DeviceMode::Pointer));
        engine.dispose();
        engine.dispose();
        assert_eq!(host.pointer_subscribers(), 0);
        assert_eq!(engine.active(), ActiveDriver::Frozen);
    }

    #[test]
    fn test_drop_releases_subscriptions() {
        let host = host();
        {
            let _engine = mount(&host, GazeInputs::new(DeviceMode::Cyclic));
            assert_eq!(host.active_timers(), 1);
        }
        assert_eq!(host.active_timers(), 0);
    }

    #[test]
    fn test_pupil_positions_add_base() {
        let host = host();
        let engine = mount(&host, GazeInputs { selection_locked: true, ..GazeInputs::new(DeviceMode::Pointer) });
        let p = engine.pupil_positions();
        assert_eq!(p.left, EyeOffset { x: -67.0, y: 78.0 });
        assert_eq!(p.right, EyeOffset { x: -89.0, y: 69.0 });
    }
}
