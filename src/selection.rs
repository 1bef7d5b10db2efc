//! One-shot gate around "pick a leaf".
//!
//! ```text
//!   Open --attempt--> Pending --ok--> Locked
//!    ^                   |
//!    +------- err -------+
//! ```
//!
//! The gate flips to `Pending` synchronously, before the draw future exists,
//! so a second click during the network round-trip is already rejected.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

use futures::future::{self, Either};
use log::{debug, info, warn};

use crate::error::FortuneError;
use crate::fortune::FortuneResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Open,
    Pending,
    Locked,
}

#[derive(Debug, PartialEq)]
pub enum SelectOutcome {
    /// Gate was not open (or a draw was already loading); nothing was invoked.
    Ignored,
    Drawn(FortuneResult),
    Failed(FortuneError),
}

/// Cheap to clone; clones share the same state.
#[derive(Clone, Debug)]
pub struct SelectionGate {
    state: Rc<Cell<GateState>>,
}

impl Default for SelectionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionGate {
    pub fn new() -> Self {
        Self { state: Rc::new(Cell::new(GateState::Open)) }
    }

    /// Gate for a page that already has today's result.
    pub fn locked() -> Self {
        Self { state: Rc::new(Cell::new(GateState::Locked)) }
    }

    pub fn state(&self) -> GateState {
        self.state.get()
    }

    /// True once a draw is pending or has succeeded.
    pub fn is_locked(&self) -> bool {
        self.state.get() != GateState::Open
    }

    /// Run `invoke_draw` unless the gate is closed or a draw is already loading.
    pub fn attempt_select<F, Fut>(
        &self,
        is_loading: bool,
        invoke_draw: F,
    ) -> impl Future<Output = SelectOutcome> + use<F, Fut>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FortuneResult, FortuneError>>,
    {
        if is_loading || self.state.get() != GateState::Open {
            return Either::Left(future::ready(SelectOutcome::Ignored));
        }
        self.state.set(GateState::Pending);
        let mut reopen = ReopenOnDrop { state: self.state.clone(), armed: true };
        let draw = invoke_draw();
        Either::Right(async move {
            let outcome = draw.await;
            reopen.armed = false;
            match outcome {
                Ok(result) => {
                    reopen.state.set(GateState::Locked);
                    info!("fortune drawn: {} stars", result.fortune.stars);
                    SelectOutcome::Drawn(result)
                }
                Err(err) => {
                    reopen.state.set(GateState::Open);
                    warn!("draw failed, leaf can be picked again: {}", err);
                    SelectOutcome::Failed(err)
                }
            }
        })
    }

    /// Put a `Pending` gate back to `Open`. Other states are left alone.
    pub fn cancel_pending(&self) {
        cancel_pending(&self.state);
    }
}

fn cancel_pending(state: &Cell<GateState>) {
    if state.get() == GateState::Pending {
        debug!("draw dropped before it settled; leaf can be picked again");
        state.set(GateState::Open);
    }
}

/// Owned by the draw future; a future dropped before it settles reopens the gate.
struct ReopenOnDrop {
    state: Rc<Cell<GateState>>,
    armed: bool,
}

impl Drop for ReopenOnDrop {
    fn drop(&mut self) {
        if self.armed {
            cancel_pending(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fortune::{CatImage, Fortune};
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::FutureExt;

    fn result() -> FortuneResult {
        FortuneResult {
            cat_image: CatImage { id: "abc".into(), url: "https://cdn2.thecatapi.com/images/abc.jpg".into(), width: 640, height: 480 },
            fortune: Fortune { stars: 4, message: "好運".into() },
            date: "Sun Oct 18 2026".into(),
        }
    }

    #[test]
    fn test_success_locks() {
        let gate = SelectionGate::new();
        let out = block_on(gate.attempt_select(false, || async { Ok(result()) }));
        assert_eq!(out, SelectOutcome::Drawn(result()));
        assert_eq!(gate.state(), GateState::Locked);
        let again = block_on(gate.attempt_select(false, || async { Ok(result()) }));
        assert_eq!(again, SelectOutcome::Ignored);
    }

    #[test]
    fn test_second_call_during_flight_is_ignored() {
        let gate = SelectionGate::new();
        let calls = Rc::new(Cell::new(0));
        let (tx, rx) = oneshot::channel::<Result<FortuneResult, FortuneError>>();

        let c = calls.clone();
        let first = gate.attempt_select(false, move || {
            c.set(c.get() + 1);
            async move { rx.await.expect("sender kept alive") }
        });
        assert_eq!(gate.state(), GateState::Pending);

        let c = calls.clone();
        let second = gate.attempt_select(false, move || {
            c.set(c.get() + 1);
            async { Ok(result()) }
        });
        assert_eq!(block_on(second), SelectOutcome::Ignored);

        tx.send(Ok(result())).unwrap();
        assert_eq!(block_on(first), SelectOutcome::Drawn(result()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failure_reopens_for_retry() {
        let gate = SelectionGate::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let out = block_on(gate.attempt_select(false, move || {
            c.set(c.get() + 1);
            async { Err(FortuneError::Fetch { status: 500 }) }
        }));
        assert_eq!(out, SelectOutcome::Failed(FortuneError::Fetch { status: 500 }));
        assert_eq!(gate.state(), GateState::Open);

        let c = calls.clone();
        let out = block_on(gate.attempt_select(false, move || {
            c.set(c.get() + 1);
            async { Ok(result()) }
        }));
        assert!(matches!(out, SelectOutcome::Drawn(_)));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_loading_flag_blocks_without_invoking() {
        let gate = SelectionGate::new();
        let out = block_on(gate.attempt_select(true, || -> future::Ready<Result<FortuneResult, FortuneError>> {
            panic!("draw must not run while loading")
        }));
        assert_eq!(out, SelectOutcome::Ignored);
        assert_eq!(gate.state(), GateState::Open);
    }

    #[test]
    fn test_dropped_draw_reopens_gate() {
        let gate = SelectionGate::new();
        let (_tx, rx) = oneshot::channel::<Result<FortuneResult, FortuneError>>();
        let in_flight = gate.attempt_select(false, move || async move { rx.await.expect("sender kept alive") });
        assert!(in_flight.now_or_never().is_none());
        assert_eq!(gate.state(), GateState::Open);

        let unpolled = gate.attempt_select(false, || async { Ok(result()) });
        assert_eq!(gate.state(), GateState::Pending);
        drop(unpolled);
        assert_eq!(gate.state(), GateState::Open);

        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let out = block_on(gate.attempt_select(false, move || {
            c.set(c.get() + 1);
            async { Ok(result()) }
        }));
        assert_eq!(out, SelectOutcome::Drawn(result()));
        assert_eq!(calls.get(), 1);
        assert_eq!(gate.state(), GateState::Locked);
    }
}
