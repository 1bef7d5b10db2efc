//! Error taxonomy for the draw path.
//!
//! Geometry misses, stale cache entries and repeated selections are not errors;
//! they are handled where they happen. Only failures that abort a draw end up here.

use std::fmt;

use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FortuneError {
    /// The image API answered with a non-success status.
    Fetch { status: u16 },
    /// The request never produced a response (offline, CORS, aborted).
    Transport(String),
    /// The response body was not the expected JSON shape.
    Decode(String),
    /// The key-value store rejected a read or write.
    Storage(String),
    /// No entropy source available for picking a fortune.
    Random(String),
    /// A required DOM object (window, document, element) is missing.
    Dom(&'static str),
}

impl fmt::Display for FortuneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FortuneError::Fetch { status } => write!(f, "cat image request failed with status {}", status),
            FortuneError::Transport(msg) => write!(f, "cat image request failed: {}", msg),
            FortuneError::Decode(msg) => write!(f, "unexpected cat image response: {}", msg),
            FortuneError::Storage(msg) => write!(f, "storage error: {}", msg),
            FortuneError::Random(msg) => write!(f, "random source unavailable: {}", msg),
            FortuneError::Dom(what) => write!(f, "missing DOM object: {}", what),
        }
    }
}

impl std::error::Error for FortuneError {}

impl From<serde_json::Error> for FortuneError {
    fn from(err: serde_json::Error) -> Self {
        FortuneError::Decode(err.to_string())
    }
}

impl From<FortuneError> for JsValue {
    fn from(err: FortuneError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Best-effort text for a rejected JS promise or thrown value.
pub(crate) fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
