//! Seam between the gaze core and whatever paints the page.
//!
//! A `Host` answers geometry questions (where is the cat, where is leaf N, how
//! big is the viewport) and hands out subscriptions. Every subscription comes
//! back as a `Disposer`; dropping or disposing it releases the listener or
//! timer. The browser implementation lives in `web.rs`, `HeadlessHost` below
//! drives everything by hand for tests and non-browser embedding.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::gaze::TargetSlot;
use crate::geometry::{Point, Rect};

/// Pointer-side inputs, already decoded from DOM events.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Pointer moved; client coordinates.
    Move(Point),
    /// `mouseout`; without a related target the pointer left the document.
    Out { has_related_target: bool },
    Enter,
    Blur,
    Focus,
}

/// Releases a subscription exactly once. Safe to call repeatedly; also runs on drop.
#[must_use = "dropping a Disposer releases its subscription immediately"]
pub struct Disposer {
    release: Option<Box<dyn FnOnce()>>,
}

impl Disposer {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self { release: Some(Box::new(release)) }
    }

    /// Keep `resource` alive until disposal (gloo listeners / intervals release on drop).
    pub fn holding<T: 'static>(resource: T) -> Self {
        Self::new(move || drop(resource))
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer").field("disposed", &self.is_disposed()).finish()
    }
}

pub trait Host {
    /// Current bounding box of the cat image, if it is laid out.
    fn reference_rect(&self) -> Option<Rect>;
    /// Current bounding box of a clover leaf, if it is mounted.
    fn target_rect(&self, slot: TargetSlot) -> Option<Rect>;
    /// Visible viewport in client coordinates.
    fn viewport(&self) -> Rect;
    fn subscribe_pointer(&self, handler: Box<dyn FnMut(PointerEvent)>) -> Disposer;
    /// Call `tick` every `interval_ms` until disposed. No immediate call.
    fn every(&self, interval_ms: u32, tick: Box<dyn FnMut()>) -> Disposer;
}

// --- Headless host ------------------------------------------------------------

type PointerHandler = Rc<RefCell<Box<dyn FnMut(PointerEvent)>>>;
type TickHandler = Rc<RefCell<Box<dyn FnMut()>>>;

struct Timer {
    period_ms: u64,
    due_ms: u64,
    tick: TickHandler,
}

struct HeadlessInner {
    reference: Option<Rect>,
    targets: BTreeMap<TargetSlot, Rect>,
    viewport: Rect,
    pointer: BTreeMap<u64, PointerHandler>,
    timers: BTreeMap<u64, Timer>,
    now_ms: u64,
    next_id: u64,
}

impl HeadlessInner {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Host with hand-fed geometry, pointer events and a manual clock.
#[derive(Clone)]
pub struct HeadlessHost {
    inner: Rc<RefCell<HeadlessInner>>,
}

impl HeadlessHost {
    pub fn new(viewport: Rect) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HeadlessInner {
                reference: None,
                targets: BTreeMap::new(),
                viewport,
                pointer: BTreeMap::new(),
                timers: BTreeMap::new(),
                now_ms: 0,
                next_id: 0,
            })),
        }
    }

    pub fn set_reference(&self, rect: Option<Rect>) {
        self.inner.borrow_mut().reference = rect;
    }

    pub fn set_target(&self, slot: TargetSlot, rect: Option<Rect>) {
        let mut inner = self.inner.borrow_mut();
        match rect {
            Some(r) => inner.targets.insert(slot, r),
            None => inner.targets.remove(&slot),
        };
    }

    pub fn set_viewport(&self, rect: Rect) {
        self.inner.borrow_mut().viewport = rect;
    }

    /// Deliver a pointer event to every live subscriber.
    pub fn pointer(&self, event: PointerEvent) {
        // Handlers read geometry back from the host; never hold the borrow across a call.
        let handlers: Vec<PointerHandler> = self.inner.borrow().pointer.values().cloned().collect();
        for handler in handlers {
            (handler.borrow_mut())(event);
        }
    }

    /// Move the clock forward, firing due timers in order.
    pub fn advance(&self, ms: u64) {
        let until = self.inner.borrow().now_ms + ms;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due = inner
                    .timers
                    .iter()
                    .filter(|(_, t)| t.due_ms <= until)
                    .min_by_key(|(id, t)| (t.due_ms, **id))
                    .map(|(id, _)| *id);
                due.and_then(|id| {
                    let timer = inner.timers.get_mut(&id)?;
                    let at = timer.due_ms;
                    timer.due_ms += timer.period_ms;
                    let tick = timer.tick.clone();
                    inner.now_ms = at;
                    Some(tick)
                })
            };
            match next {
                Some(tick) => (tick.borrow_mut())(),
                None => break,
            }
        }
        self.inner.borrow_mut().now_ms = until;
    }

    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    pub fn pointer_subscribers(&self) -> usize {
        self.inner.borrow().pointer.len()
    }

    pub fn active_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }
}

impl Host for HeadlessHost {
    fn reference_rect(&self) -> Option<Rect> {
        self.inner.borrow().reference
    }

    fn target_rect(&self, slot: TargetSlot) -> Option<Rect> {
        self.inner.borrow().targets.get(&slot).copied()
    }

    fn viewport(&self) -> Rect {
        self.inner.borrow().viewport
    }

    fn subscribe_pointer(&self, handler: Box<dyn FnMut(PointerEvent)>) -> Disposer {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.alloc_id();
            inner.pointer.insert(id, Rc::new(RefCell::new(handler)));
            id
        };
        let weak: Weak<RefCell<HeadlessInner>> = Rc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().pointer.remove(&id);
            }
        })
    }

    fn every(&self, interval_ms: u32, tick: Box<dyn FnMut()>) -> Disposer {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.alloc_id();
            let period_ms = u64::from(interval_ms.max(1));
            let due_ms = inner.now_ms + period_ms;
            inner.timers.insert(id, Timer { period_ms, due_ms, tick: Rc::new(RefCell::new(tick)) });
            id
        };
        let weak = Rc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().timers.remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_disposer_runs_once() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let mut d = Disposer::new(move || h.set(h.get() + 1));
        d.dispose();
        d.dispose();
        drop(d);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_disposer_runs_on_drop() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        {
            let _d = Disposer::new(move || h.set(h.get() + 1));
        }
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_timer_fires_per_period() {
        let host = HeadlessHost::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let mut d = host.every(100, Box::new(move || h.set(h.get() + 1)));
        host.advance(99);
        assert_eq!(hits.get(), 0);
        host.advance(1);
        assert_eq!(hits.get(), 1);
        host.advance(350);
        assert_eq!(hits.get(), 4);
        d.dispose();
        assert_eq!(host.active_timers(), 0);
        host.advance(1_000);
        assert_eq!(hits.get(), 4);
    }

    #[test]
    fn test_pointer_unsubscribe() {
        let host = HeadlessHost::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        let d = host.subscribe_pointer(Box::new(move |_| s.set(s.get() + 1)));
        host.pointer(PointerEvent::Enter);
        drop(d);
        host.pointer(PointerEvent::Enter);
        assert_eq!(seen.get(), 1);
        assert_eq!(host.pointer_subscribers(), 0);
    }
}
