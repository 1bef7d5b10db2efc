//! Cat Fortune core crate.
//!
//! A daily fortune widget: the visitor picks one clover leaf, gets a cat
//! picture and a star-rated fortune, and the result is kept until the calendar
//! day changes. While the page waits for a pick, the cat's pupils follow the
//! mouse (or glance between leaves on touch devices).
//!
//! Everything except `web` and the exported `CatFortune` handle runs natively,
//! against `HeadlessHost`, `MemoryStore` and `FixedCalendar`.

use std::rc::Rc;

use log::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub mod api;
pub mod config;
pub mod error;
pub mod fortune;
pub mod gaze;
pub mod geometry;
pub mod host;
pub mod logger;
pub mod selection;
pub mod session;
pub mod store;
pub mod web;

pub use api::{CatApi, ImageSource};
pub use config::GazeConfig;
pub use error::FortuneError;
pub use fortune::{draw_fortune, star_rating, CatImage, Fortune, FortuneResult, FORTUNES, MAX_STARS};
pub use gaze::{ActiveDriver, DeviceMode, GazeEngine, GazeInputs, TargetSlot};
pub use geometry::{clamp_pupil, EyeConfig, EyeOffset, GazeState, Point, Rect};
pub use host::{Disposer, HeadlessHost, Host, PointerEvent};
pub use selection::{GateState, SelectOutcome, SelectionGate};
pub use session::{DrawingSession, DynFortuneStore};
pub use store::{Calendar, FixedCalendar, FortuneStore, KeyValueStore, MemoryStore};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logger::init(logger::default_level());
}

// -----------------------------------------------------------------------------
// JS entrypoint
// -----------------------------------------------------------------------------

/// Handle the page script holds for one mounted widget.
#[wasm_bindgen]
pub struct CatFortune {
    session: Rc<DrawingSession>,
}

#[wasm_bindgen]
impl CatFortune {
    /// Mount against the widget markup. `config_json` overrides `GazeConfig`
    /// fields, `ids_json` overrides element ids; both may be omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, ids_json: Option<String>) -> Result<CatFortune, JsValue> {
        let config = match config_json {
            Some(json) => GazeConfig::from_json(&json).map_err(FortuneError::from)?,
            None => GazeConfig::default(),
        };
        let ids: web::DomIds = match ids_json {
            Some(json) => serde_json::from_str(&json).map_err(FortuneError::from)?,
            None => web::DomIds::default(),
        };

        let backing: Box<dyn KeyValueStore> = match web::LocalStorage::open() {
            Some(storage) => Box::new(storage),
            None => {
                warn!("localStorage unavailable; today's fortune will not survive a reload");
                Box::new(MemoryStore::new())
            }
        };
        let store: DynFortuneStore = FortuneStore::new(backing, Box::new(web::BrowserCalendar) as Box<dyn Calendar>);

        let mode = DeviceMode::detect(web::is_touch_device());
        let host = web::DomHost::new(ids.clone())?;
        let session = DrawingSession::open(Rc::new(host), config, mode, Box::new(CatApi::default()), store);
        info!("cat fortune mounted ({:?}, drawn today: {})", mode, session.has_drawn_today());
        web::start_paint_loop(session.clone(), ids)?;
        Ok(Self { session })
    }

    /// Pick a leaf. Resolves to the result JSON, to `null` when the pick was
    /// ignored, and rejects with the error message when the draw failed.
    #[wasm_bindgen(js_name = selectLeaf)]
    pub fn select_leaf(&self) -> js_sys::Promise {
        let pending = self.session.select_leaf();
        future_to_promise(async move {
            match pending.await {
                SelectOutcome::Ignored => Ok(JsValue::NULL),
                SelectOutcome::Drawn(result) => {
                    let json = serde_json::to_string(&result).map_err(FortuneError::from)?;
                    Ok(JsValue::from_str(&json))
                }
                SelectOutcome::Failed(err) => Err(err.into()),
            }
        })
    }

    /// Today's result as JSON, if drawn.
    #[wasm_bindgen(js_name = resultJson)]
    pub fn result_json(&self) -> Option<String> {
        self.session.result().and_then(|r| serde_json::to_string(&r).ok())
    }

    #[wasm_bindgen(js_name = starsText)]
    pub fn stars_text(&self) -> Option<String> {
        self.session.result().map(|r| star_rating(r.fortune.stars, MAX_STARS))
    }

    #[wasm_bindgen(js_name = hasDrawnToday)]
    pub fn has_drawn_today(&self) -> bool {
        self.session.has_drawn_today()
    }

    #[wasm_bindgen(js_name = isLoading)]
    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    #[wasm_bindgen(js_name = isLocked)]
    pub fn is_locked(&self) -> bool {
        self.session.is_locked()
    }

    #[wasm_bindgen(js_name = modalOpen)]
    pub fn modal_open(&self) -> bool {
        self.session.modal_open()
    }

    #[wasm_bindgen(js_name = showFortune)]
    pub fn show_fortune(&self) {
        self.session.show_fortune();
    }

    #[wasm_bindgen(js_name = closeModal)]
    pub fn close_modal(&self) {
        self.session.close_modal();
    }

    /// Message of the last failed draw, cleared when read.
    #[wasm_bindgen(js_name = takeError)]
    pub fn take_error(&self) -> Option<String> {
        self.session.take_error().map(|e| e.to_string())
    }

    /// `[left_x, left_y, right_x, right_y]` pupil positions in px.
    pub fn pupils(&self) -> Vec<f64> {
        let p = self.session.pupil_positions();
        vec![p.left.x, p.left.y, p.right.x, p.right.y]
    }

    #[wasm_bindgen(js_name = setTouchMode)]
    pub fn set_touch_mode(&self, touch: bool) {
        self.session.set_device_mode(DeviceMode::detect(touch));
    }

    /// Release listeners and timers. Pending draws still settle but are not applied.
    pub fn destroy(&self) {
        self.session.teardown();
    }
}

#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) {
    logger::init(logger::parse_level(level));
}

#[wasm_bindgen(js_name = starRating)]
pub fn star_rating_text(stars: u8) -> String {
    star_rating(stars, MAX_STARS)
}
