//! Continuous gaze: the pupils follow the mouse.

use std::cell::Cell;
use std::rc::Rc;

use log::trace;

use super::UpdateFn;
use crate::geometry::{EyePair, Point};
use crate::host::{Disposer, Host, PointerEvent};

/// Where the custom cursor overlay should be drawn, and whether at all.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorState {
    pub visible: bool,
    pub position: Point,
}

/// Side output of the pointer tracker, read by the cursor overlay. Not gaze state.
#[derive(Clone, Debug, Default)]
pub struct CursorSignal(Rc<Cell<CursorState>>);

impl CursorSignal {
    pub fn get(&self) -> CursorState {
        self.0.get()
    }

    pub fn is_visible(&self) -> bool {
        self.0.get().visible
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        let mut s = self.0.get();
        s.visible = visible;
        self.0.set(s);
    }

    fn set(&self, state: CursorState) {
        self.0.set(state);
    }
}

pub struct PointerTracker;

impl PointerTracker {
    /// Subscribe to pointer input and publish a gaze update for every move.
    pub fn start(
        host: Rc<dyn Host>,
        eyes: EyePair,
        cursor_inset: f64,
        cursor: CursorSignal,
        on_update: UpdateFn,
    ) -> Disposer {
        track(host, cursor_inset, cursor, Some((eyes, on_update)))
    }

    /// Keep the cursor overlay alive while the eyes are frozen.
    pub fn cursor_only(host: Rc<dyn Host>, cursor_inset: f64, cursor: CursorSignal) -> Disposer {
        track(host, cursor_inset, cursor, None)
    }
}

fn track(
    host: Rc<dyn Host>,
    cursor_inset: f64,
    cursor: CursorSignal,
    gaze: Option<(EyePair, UpdateFn)>,
) -> Disposer {
    let geometry = host.clone();
    host.subscribe_pointer(Box::new(move |event: PointerEvent| match event {
        PointerEvent::Move(point) => {
            let inside = geometry.viewport().contains_inset(point, cursor_inset);
            cursor.set(CursorState { visible: inside, position: point });
            let Some((eyes, on_update)) = &gaze else {
                return;
            };
            // Layout may have moved since the last event; always re-measure.
            let Some(cat) = geometry.reference_rect() else {
                trace!("pointer move before cat image is laid out");
                return;
            };
            on_update(eyes.offsets(point, cat));
        }
        PointerEvent::Out { has_related_target } => {
            if !has_related_target {
                cursor.set_visible(false);
            }
        }
        PointerEvent::Blur => cursor.set_visible(false),
        PointerEvent::Enter | PointerEvent::Focus => cursor.set_visible(true),
    }))
}
