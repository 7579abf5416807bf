//! `setTimeout`-backed stage timers.

use applepay_core::{TimerCallback, TimerDriver, TimerHandle};
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::console;

/// Timers scheduled on the browser event loop
#[derive(Debug, Default)]
pub struct BrowserTimers;

impl BrowserTimers {
    pub fn new() -> Self {
        Self
    }
}

fn delay_millis(delay: Duration) -> i32 {
    delay.as_millis().min(i32::MAX as u128) as i32
}

impl TimerDriver for BrowserTimers {
    fn arm(&self, delay: Duration, on_fire: TimerCallback) -> TimerHandle {
        let callback = Closure::once_into_js(move || on_fire());

        let scheduled = match web_sys::window() {
            Some(window) => window.set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                delay_millis(delay),
            ),
            None => Err(JsValue::from_str("no window")),
        };

        match scheduled {
            Ok(id) => TimerHandle::new(id as u64),
            Err(err) => {
                console::error_2(&JsValue::from_str("Could not schedule stage timer:"), &err);
                TimerHandle::new(0)
            }
        }
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(handle.id() as i32);
        }
    }
}
