//! Window namespace: `setTimeout`, `setInterval`, `clearTimeout`, `clearInterval`.

use std::sync::Arc;
use std::time::Duration;

use js::{HostFnSync, HostNamespace, JSError, JSValue, JsFunctionRef, TimerId, TimerKind};

use super::HostContext;

/// Build the `window` namespace.
pub fn build_window_namespace() -> HostNamespace<HostContext> {
    HostNamespace::new()
        .with_sync_fn("setTimeout", build_set_timer("setTimeout", TimerKind::Timeout))
        .with_sync_fn("setInterval", build_set_timer("setInterval", TimerKind::Interval))
        .with_sync_fn("clearTimeout", build_clear_timer("clearTimeout"))
        .with_sync_fn("clearInterval", build_clear_timer("clearInterval"))
}

fn build_set_timer(name: &'static str, kind: TimerKind) -> Arc<HostFnSync<HostContext>> {
    Arc::new(move |context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let (callback, delay) = parse_timer_arguments(name, &args)?;
        let mut timers = context.timers()?;
        let id = match kind {
            TimerKind::Timeout => timers.set_timeout(callback, delay),
            TimerKind::Interval => timers.set_interval(callback, delay),
        };
        Ok(JSValue::Number(id.0 as f64))
    })
}

fn build_clear_timer(name: &'static str) -> Arc<HostFnSync<HostContext>> {
    Arc::new(move |context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let Some(value) = args.first() else {
            return Err(JSError::TypeError(format!(
                "Failed to execute '{name}': 1 argument required, but only 0 present."
            )));
        };
        if let Some(id) = value.as_number().and_then(timer_id) {
            context.timers()?.clear_timeout(id);
        }
        Ok(JSValue::Null)
    })
}

/// Validate `(callback, timeout?)`.
///
/// A missing or `undefined` timeout means 0 ms; numbers go through `ToInt32`
/// and negative results clamp to 0.
///
/// # Errors
/// `TypeError` for a missing or non-function callback or a non-numeric timeout.
pub(crate) fn parse_timer_arguments(name: &str, args: &[JSValue]) -> Result<(JsFunctionRef, Duration), JSError> {
    let Some(callback) = args.first() else {
        return Err(JSError::TypeError(format!(
            "Failed to execute '{name}': 1 argument required, but only 0 present."
        )));
    };
    let JSValue::Function(callback) = callback else {
        return Err(JSError::TypeError(format!(
            "Failed to execute '{name}': parameter 1 (callback) must be a function."
        )));
    };
    let millis = match args.get(1) {
        None | Some(JSValue::Undefined) => 0,
        Some(JSValue::Number(number)) => to_int32(*number).max(0),
        Some(_) => {
            return Err(JSError::TypeError(format!(
                "Failed to execute '{name}': parameter 2 (timeout) only can be a number or undefined."
            )));
        }
    };
    Ok((*callback, Duration::from_millis(u64::from(millis.unsigned_abs()))))
}

/// `ToInt32`: NaN and infinities become 0, everything else wraps modulo 2^32.
fn to_int32(number: f64) -> i32 {
    const TWO_POW_32: f64 = 4_294_967_296.0;
    if !number.is_finite() {
        return 0;
    }
    number.trunc().rem_euclid(TWO_POW_32) as u32 as i32
}

fn timer_id(number: f64) -> Option<TimerId> {
    u64::try_from(to_int32(number)).ok().filter(|id| *id > 0).map(TimerId)
}
