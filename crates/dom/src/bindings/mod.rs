//! Host functions that expose a context to a script engine.
//!
//! The engine adapter installs the tables returned by [`build_bindings`] on
//! its global object and calls them with a [`HostContext`]. Each function
//! decodes its `JSValue` arguments, forwards to the dispatcher or the timer
//! scheduler and converts failures into `JSError`s.

use std::sync::{Arc, Mutex, MutexGuard};

use js::{
    build_console_namespace, HostBindings, HostEnvironment, HostLogger, JSError, JSValue,
    JsFunctionRef, NodeKey, TimerScheduler,
};

use crate::dispatcher::MutationDispatcher;

pub mod document;
pub mod window;

pub use document::build_document_namespace;
pub use window::build_window_namespace;

/// Shared timer queue of one context.
pub type SharedTimers = Arc<Mutex<TimerScheduler<JsFunctionRef>>>;

/// State every host function runs against.
#[derive(Clone)]
pub struct HostContext {
    logger: Arc<dyn HostLogger>,
    dispatcher: Arc<Mutex<MutationDispatcher>>,
    timers: SharedTimers,
}

impl HostContext {
    pub fn new(
        logger: Arc<dyn HostLogger>,
        dispatcher: Arc<Mutex<MutationDispatcher>>,
        timers: SharedTimers,
    ) -> Self {
        Self { logger, dispatcher, timers }
    }

    /// Lock the dispatcher.
    ///
    /// # Errors
    /// Returns an error if the dispatcher mutex is poisoned.
    pub fn dispatcher(&self) -> Result<MutexGuard<'_, MutationDispatcher>, JSError> {
        self.dispatcher
            .lock()
            .map_err(|_| JSError::InternalError(String::from("mutex poisoned")))
    }

    /// Lock the timer queue.
    ///
    /// # Errors
    /// Returns an error if the timer mutex is poisoned.
    pub fn timers(&self) -> Result<MutexGuard<'_, TimerScheduler<JsFunctionRef>>, JSError> {
        self.timers
            .lock()
            .map_err(|_| JSError::InternalError(String::from("mutex poisoned")))
    }
}

impl HostEnvironment for HostContext {
    fn logger(&self) -> &dyn HostLogger {
        self.logger.as_ref()
    }
}

/// `console`, `document` and `window` for one context.
pub fn build_bindings() -> HostBindings<HostContext> {
    HostBindings::new()
        .with_namespace("console", build_console_namespace())
        .with_namespace("document", build_document_namespace())
        .with_namespace("window", build_window_namespace())
}

/// Helper to parse a string argument from `JSValue`.
///
/// # Errors
/// Returns an error if the value is missing or not a string.
#[inline]
pub(crate) fn parse_string(value: Option<&JSValue>, name: &str) -> Result<String, JSError> {
    match value {
        Some(JSValue::String(string_value)) => Ok(string_value.clone()),
        _ => Err(JSError::TypeError(format!("{name} must be a string"))),
    }
}

/// Helper to parse a node handle from an integral number `JSValue`.
///
/// # Errors
/// Returns an error if the value is missing, not a number or not integral.
#[inline]
pub(crate) fn parse_key(value: Option<&JSValue>, name: &str) -> Result<NodeKey, JSError> {
    match value {
        Some(JSValue::Number(number)) if number.is_finite() && number.fract() == 0.0 => {
            Ok(NodeKey(*number as i64))
        }
        _ => Err(JSError::TypeError(format!("{name} must be an integer node id"))),
    }
}

/// Like [`parse_key`], with `null`/`undefined`/absent meaning `None`.
///
/// # Errors
/// Returns an error if the value is present and not a node id.
#[inline]
pub(crate) fn parse_optional_key(value: Option<&JSValue>, name: &str) -> Result<Option<NodeKey>, JSError> {
    match value {
        None | Some(JSValue::Null | JSValue::Undefined) => Ok(None),
        other => parse_key(other, name).map(Some),
    }
}

/// Encode an optional handle the way query functions return it.
#[inline]
pub(crate) fn key_value(key: Option<NodeKey>) -> JSValue {
    key.map_or(JSValue::Null, |key| JSValue::Number(key.0 as f64))
}
