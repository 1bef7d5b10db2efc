//! Scripted gaze for touch devices.
//!
//! Without a hovering pointer the cat glances between a curated subset of the
//! clover leaves, one every interval.

use std::rc::Rc;

use log::debug;

use super::{TargetSlot, UpdateFn};
use crate::geometry::EyePair;
use crate::host::{Disposer, Host};

/// Round-robin cursor over the attract-subsequence.
#[derive(Clone, Debug, PartialEq)]
pub struct AttractCycle {
    slots: Vec<TargetSlot>,
    index: usize,
}

impl AttractCycle {
    pub fn new(slots: &[TargetSlot]) -> Self {
        Self { slots: slots.to_vec(), index: 0 }
    }

    pub fn current(&self) -> Option<TargetSlot> {
        self.slots.get(self.index).copied()
    }

    pub fn advance(&mut self) -> Option<TargetSlot> {
        if self.slots.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.slots.len();
        self.current()
    }
}

pub struct CyclicTargetDriver;

impl CyclicTargetDriver {
    /// Look at the first slot now, then move on to the next one every `interval_ms`.
    pub fn start(
        host: Rc<dyn Host>,
        eyes: EyePair,
        attract: &[TargetSlot],
        interval_ms: u32,
        on_update: UpdateFn,
    ) -> Disposer {
        let mut cycle = AttractCycle::new(attract);
        if cycle.current().is_none() {
            debug!("cyclic gaze started without attract slots; eyes stay put");
            return Disposer::noop();
        }

        let geometry = host.clone();
        let look = move |slot: TargetSlot| {
            let (Some(cat), Some(leaf)) = (geometry.reference_rect(), geometry.target_rect(slot)) else {
                debug!("gaze target {:?} not measured yet; skipping tick", slot);
                return;
            };
            on_update(eyes.offsets(leaf.center(), cat));
        };

        if let Some(slot) = cycle.current() {
            look(slot);
        }
        host.every(
            interval_ms,
            Box::new(move || {
                if let Some(slot) = cycle.advance() {
                    look(slot);
                }
            }),
        )
    }
}
