//! Browser side of the `Host`, store and calendar seams, plus the paint loop.

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::timers::callback::Interval;
use log::{debug, warn};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, HtmlElement, MouseEvent, Storage, Window};

use crate::error::{js_message, FortuneError};
use crate::gaze::TargetSlot;
use crate::geometry::{Point, Rect};
use crate::host::{Disposer, Host, PointerEvent};
use crate::session::DrawingSession;
use crate::store::{Calendar, DayStamp, KeyValueStore};

/// Element ids the widget markup provides.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DomIds {
    pub cat: String,
    /// Leaf `n` is `{leaf_prefix}{n}`.
    pub leaf_prefix: String,
    pub left_pupil: String,
    pub right_pupil: String,
    pub cursor: String,
}

impl Default for DomIds {
    fn default() -> Self {
        Self {
            cat: "cat-fortune-cat".into(),
            leaf_prefix: "cat-fortune-leaf-".into(),
            left_pupil: "cat-fortune-pupil-left".into(),
            right_pupil: "cat-fortune-pupil-right".into(),
            cursor: "cat-fortune-cursor".into(),
        }
    }
}

pub struct DomHost {
    window: Window,
    document: Document,
    ids: DomIds,
}

impl DomHost {
    pub fn new(ids: DomIds) -> Result<Self, FortuneError> {
        let window = window().ok_or(FortuneError::Dom("window"))?;
        let document = window.document().ok_or(FortuneError::Dom("document"))?;
        Ok(Self { window, document, ids })
    }

    pub fn ids(&self) -> &DomIds {
        &self.ids
    }

    fn rect_of(&self, id: &str) -> Option<Rect> {
        let r = self.document.get_element_by_id(id)?.get_bounding_client_rect();
        Some(Rect::new(r.left(), r.top(), r.width(), r.height()))
    }
}

type SharedPointerHandler = Rc<RefCell<Box<dyn FnMut(PointerEvent)>>>;

fn forward(handler: &SharedPointerHandler, event: PointerEvent) {
    // Re-entrant dispatch is dropped.
    if let Ok(mut h) = handler.try_borrow_mut() {
        h(event);
    }
}

impl Host for DomHost {
    fn reference_rect(&self) -> Option<Rect> {
        self.rect_of(&self.ids.cat)
    }

    fn target_rect(&self, slot: TargetSlot) -> Option<Rect> {
        self.rect_of(&format!("{}{}", self.ids.leaf_prefix, slot.0))
    }

    fn viewport(&self) -> Rect {
        let w = self.window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let h = self.window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        Rect::new(0.0, 0.0, w, h)
    }

    fn subscribe_pointer(&self, handler: Box<dyn FnMut(PointerEvent)>) -> Disposer {
        let handler: SharedPointerHandler = Rc::new(RefCell::new(handler));
        let mut listeners = Vec::with_capacity(5);

        let h = handler.clone();
        listeners.push(EventListener::new(&self.window, "mousemove", move |event| {
            if let Some(e) = event.dyn_ref::<MouseEvent>() {
                forward(&h, PointerEvent::Move(Point::new(e.client_x() as f64, e.client_y() as f64)));
            }
        }));
        let h = handler.clone();
        listeners.push(EventListener::new(&self.document, "mouseout", move |event| {
            let has_related_target = event
                .dyn_ref::<MouseEvent>()
                .and_then(|e| e.related_target())
                .is_some();
            forward(&h, PointerEvent::Out { has_related_target });
        }));
        let h = handler.clone();
        listeners.push(EventListener::new(&self.document, "mouseenter", move |_| {
            forward(&h, PointerEvent::Enter);
        }));
        let h = handler.clone();
        listeners.push(EventListener::new(&self.window, "blur", move |_| {
            forward(&h, PointerEvent::Blur);
        }));
        let h = handler;
        listeners.push(EventListener::new(&self.window, "focus", move |_| {
            forward(&h, PointerEvent::Focus);
        }));

        Disposer::holding(listeners)
    }

    fn every(&self, interval_ms: u32, mut tick: Box<dyn FnMut()>) -> Disposer {
        Disposer::holding(Interval::new(interval_ms, move || tick()))
    }
}

/// `window.localStorage`.
pub struct LocalStorage(Storage);

impl LocalStorage {
    /// `None` when storage is disabled (private mode, sandboxed iframe).
    pub fn open() -> Option<Self> {
        let storage = window()?.local_storage().ok()??;
        Some(Self(storage))
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FortuneError> {
        self.0
            .set_item(key, value)
            .map_err(|e| FortuneError::Storage(js_message(&e)))
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.0.remove_item(key) {
            warn!("could not remove {}: {}", key, js_message(&e));
        }
    }
}

/// Local calendar day in `Date.prototype.toDateString` form.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserCalendar;

impl Calendar for BrowserCalendar {
    fn today(&self) -> DayStamp {
        DayStamp(String::from(js_sys::Date::new_0().to_date_string()))
    }
}

/// Touch-capable devices get the cyclic gaze instead of pointer tracking.
pub fn is_touch_device() -> bool {
    let Some(w) = window() else { return false };
    let has_ontouchstart = js_sys::Reflect::has(&w, &JsValue::from_str("ontouchstart")).unwrap_or(false);
    has_ontouchstart || w.navigator().max_touch_points() > 0
}

// --- Paint loop ---------------------------------------------------------------

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn html_element(document: &Document, id: &str) -> Option<HtmlElement> {
    document.get_element_by_id(id)?.dyn_into::<HtmlElement>().ok()
}

fn paint(session: &DrawingSession, document: &Document, ids: &DomIds) {
    let pupils = session.pupil_positions();
    for (id, at) in [(&ids.left_pupil, pupils.left), (&ids.right_pupil, pupils.right)] {
        if let Some(el) = html_element(document, id) {
            let _ = el.style().set_property("transform", &format!("translate({:.2}px, {:.2}px)", at.x, at.y));
        }
    }
    if let Some(el) = html_element(document, &ids.cursor) {
        let cursor = session.cursor();
        let style = el.style();
        if cursor.visible {
            let _ = style.set_property("display", "block");
            let _ = style.set_property("left", &format!("{}px", cursor.position.x));
            let _ = style.set_property("top", &format!("{}px", cursor.position.y));
        } else {
            let _ = style.set_property("display", "none");
        }
    }
}

/// Repaint pupils and cursor every animation frame until the session is torn down.
pub fn start_paint_loop(session: Rc<DrawingSession>, ids: DomIds) -> Result<(), FortuneError> {
    let w = window().ok_or(FortuneError::Dom("window"))?;
    let document = w.document().ok_or(FortuneError::Dom("document"))?;

    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
        if !session.is_alive() {
            debug!("session closed; paint loop stops");
            // Breaks the closure <-> FrameCallback cycle so the session can be freed.
            let _ = f.borrow_mut().take();
            return;
        }
        paint(&session, &document, &ids);
        if let (Some(w), Some(cb)) = (window(), f.borrow().as_ref()) {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(cb) = g.borrow().as_ref() {
        w.request_animation_frame(cb.as_ref().unchecked_ref())
            .map_err(|_| FortuneError::Dom("requestAnimationFrame"))?;
    }
    Ok(())
}
