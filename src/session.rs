//! One drawing page: gate, gaze engine, draw collaborator and page flags.
//!
//! The page lives until `teardown`. A draw that resolves afterwards is
//! returned to the caller but never applied to the page.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use log::debug;

use crate::api::ImageSource;
use crate::config::GazeConfig;
use crate::error::FortuneError;
use crate::fortune::{draw_fortune, FortuneResult};
use crate::gaze::{ActiveDriver, CursorState, DeviceMode, GazeEngine, GazeInputs};
use crate::geometry::GazeState;
use crate::host::Host;
use crate::selection::{SelectOutcome, SelectionGate};
use crate::store::{Calendar, FortuneStore, KeyValueStore};

pub type DynFortuneStore = FortuneStore<Box<dyn KeyValueStore>, Box<dyn Calendar>>;

pub struct DrawingSession {
    store: DynFortuneStore,
    source: Box<dyn ImageSource>,
    gate: SelectionGate,
    engine: RefCell<GazeEngine>,
    mode: Cell<DeviceMode>,
    loading: Cell<bool>,
    alive: Cell<bool>,
    modal_open: Cell<bool>,
    result: RefCell<Option<FortuneResult>>,
    last_error: RefCell<Option<FortuneError>>,
}

impl DrawingSession {
    /// Open the page. A result already drawn today locks the gate and freezes the eyes.
    pub fn open(
        host: Rc<dyn Host>,
        config: GazeConfig,
        mode: DeviceMode,
        source: Box<dyn ImageSource>,
        store: DynFortuneStore,
    ) -> Rc<Self> {
        let stored = store.load();
        let gate = if stored.is_some() { SelectionGate::locked() } else { SelectionGate::new() };
        let inputs = GazeInputs { mode, selection_locked: gate.is_locked(), loading: false };
        Rc::new(Self {
            store,
            source,
            engine: RefCell::new(GazeEngine::mount(host, config, inputs)),
            gate,
            mode: Cell::new(mode),
            loading: Cell::new(false),
            alive: Cell::new(true),
            modal_open: Cell::new(false),
            result: RefCell::new(stored),
            last_error: RefCell::new(None),
        })
    }

    /// A leaf was clicked. Resolves once the draw (if any) has settled.
    /// Dropping the returned future before it settles reopens the leaf.
    pub fn select_leaf(self: &Rc<Self>) -> impl Future<Output = SelectOutcome> + use<> {
        let invoked = Rc::new(Cell::new(false));
        let page = Rc::clone(self);
        let started = invoked.clone();
        let pending = self.gate.attempt_select(self.loading.get(), move || {
            started.set(true);
            page.set_loading(true);
            async move { draw_fortune(page.source.as_ref(), &page.store).await }
        });
        let mut unwind = invoked.get().then(|| UnwindDraw { page: Rc::clone(self), armed: true });

        let page = Rc::clone(self);
        async move {
            let outcome = pending.await;
            if let Some(unwind) = unwind.as_mut() {
                unwind.armed = false;
            }
            if matches!(outcome, SelectOutcome::Ignored) {
                return outcome;
            }
            if !page.alive.get() {
                debug!("draw settled after the page was torn down; dropping it");
                return outcome;
            }
            match &outcome {
                SelectOutcome::Drawn(result) => {
                    *page.result.borrow_mut() = Some(result.clone());
                    *page.last_error.borrow_mut() = None;
                    page.modal_open.set(true);
                }
                SelectOutcome::Failed(err) => {
                    *page.last_error.borrow_mut() = Some(err.clone());
                }
                SelectOutcome::Ignored => {}
            }
            page.set_loading(false);
            outcome
        }
    }

    /// Switch between mouse and touch behaviour.
    pub fn set_device_mode(&self, mode: DeviceMode) {
        self.mode.set(mode);
        self.refresh_gaze();
    }

    pub fn teardown(&self) {
        self.alive.set(false);
        self.engine.borrow_mut().dispose();
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn is_locked(&self) -> bool {
        self.gate.is_locked()
    }

    pub fn has_drawn_today(&self) -> bool {
        self.result.borrow().is_some()
    }

    pub fn result(&self) -> Option<FortuneResult> {
        self.result.borrow().clone()
    }

    /// Error from the last failed draw, cleared when read.
    pub fn take_error(&self) -> Option<FortuneError> {
        self.last_error.borrow_mut().take()
    }

    pub fn modal_open(&self) -> bool {
        self.modal_open.get() && self.result.borrow().is_some()
    }

    /// Re-open the modal for an already drawn fortune.
    pub fn show_fortune(&self) {
        if self.result.borrow().is_some() {
            self.modal_open.set(true);
        }
    }

    pub fn close_modal(&self) {
        self.modal_open.set(false);
    }

    pub fn gaze(&self) -> GazeState {
        self.engine.borrow().state()
    }

    pub fn pupil_positions(&self) -> GazeState {
        self.engine.borrow().pupil_positions()
    }

    pub fn cursor(&self) -> CursorState {
        self.engine.borrow().cursor().get()
    }

    pub fn active_driver(&self) -> ActiveDriver {
        self.engine.borrow().active()
    }

    pub fn config(&self) -> GazeConfig {
        self.engine.borrow().config().clone()
    }

    pub fn store(&self) -> &DynFortuneStore {
        &self.store
    }

    fn set_loading(&self, loading: bool) {
        self.loading.set(loading);
        self.refresh_gaze();
    }

    fn refresh_gaze(&self) {
        if !self.alive.get() {
            return;
        }
        let inputs = GazeInputs {
            mode: self.mode.get(),
            selection_locked: self.gate.is_locked(),
            loading: self.loading.get(),
        };
        self.engine.borrow_mut().remount(inputs);
    }
}

/// Clears the loading state of a draw whose future was dropped before it settled.
struct UnwindDraw {
    page: Rc<DrawingSession>,
    armed: bool,
}

impl Drop for UnwindDraw {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // The gate future may still be alive here; reopen before the gaze refresh reads it.
        self.page.gate.cancel_pending();
        self.page.set_loading(false);
    }
}
