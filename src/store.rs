//! Day-keyed cache of the drawn fortune.
//!
//! Two keys live in the backing store: the JSON result and the day-stamp it
//! was drawn on. Anything that is not a complete, decodable result for today
//! is cleared on read and reported as a miss.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};

use crate::error::FortuneError;
use crate::fortune::FortuneResult;

pub const STORAGE_KEY: &str = "cat-fortune-result";
pub const DATE_KEY: &str = "cat-fortune-date";

/// String-keyed persistent store (browser `localStorage` in production).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), FortuneError>;
    fn remove(&self, key: &str);
}

/// Calendar day as rendered by the host, e.g. `"Sun Oct 18 2026"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayStamp(pub String);

impl fmt::Display for DayStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Calendar {
    /// Today's stamp. Reads and writes must use the same formatting.
    fn today(&self) -> DayStamp;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), FortuneError> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), FortuneError> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

impl<T: Calendar + ?Sized> Calendar for Box<T> {
    fn today(&self) -> DayStamp {
        (**self).today()
    }
}

impl<T: Calendar + ?Sized> Calendar for Rc<T> {
    fn today(&self) -> DayStamp {
        (**self).today()
    }
}

/// Calendar pinned to one day; move it with `set`.
#[derive(Debug)]
pub struct FixedCalendar(RefCell<DayStamp>);

impl FixedCalendar {
    pub fn new(day: &str) -> Self {
        Self(RefCell::new(DayStamp(day.to_string())))
    }

    pub fn set(&self, day: &str) {
        *self.0.borrow_mut() = DayStamp(day.to_string());
    }
}

impl Calendar for FixedCalendar {
    fn today(&self) -> DayStamp {
        self.0.borrow().clone()
    }
}

/// In-memory store; also the fallback when `localStorage` is unavailable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FortuneError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

pub struct FortuneStore<S, C> {
    store: S,
    calendar: C,
}

impl<S: KeyValueStore, C: Calendar> FortuneStore<S, C> {
    pub fn new(store: S, calendar: C) -> Self {
        Self { store, calendar }
    }

    pub fn today(&self) -> DayStamp {
        self.calendar.today()
    }

    pub fn backing(&self) -> &S {
        &self.store
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Today's result, if one was drawn. Stale or broken entries are cleared.
    pub fn load(&self) -> Option<FortuneResult> {
        let (Some(stored), Some(stored_day)) = (self.store.get(STORAGE_KEY), self.store.get(DATE_KEY)) else {
            // A lone key is a leftover from a broken write.
            self.clear();
            return None;
        };
        let today = self.calendar.today();
        if stored_day != today.0 {
            debug!("cached fortune from {:?} is stale (today {}); clearing", stored_day, today);
            self.clear();
            return None;
        }
        match serde_json::from_str::<FortuneResult>(&stored) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!("cached fortune does not decode ({}); clearing", err);
                self.clear();
                None
            }
        }
    }

    /// Persist `result` under today's stamp. Both keys are written back to back.
    pub fn save(&self, result: &FortuneResult) -> Result<(), FortuneError> {
        let json = serde_json::to_string(result)?;
        let today = self.calendar.today();
        self.store.set(STORAGE_KEY, &json)?;
        self.store.set(DATE_KEY, &today.0)
    }

    pub fn has_drawn_today(&self) -> bool {
        self.load().is_some()
    }

    pub fn clear(&self) {
        self.store.remove(STORAGE_KEY);
        self.store.remove(DATE_KEY);
    }
}
