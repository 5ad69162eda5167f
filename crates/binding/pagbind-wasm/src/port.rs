//! [`NativePlayerPort`] over a JS driver object.
//!
//! The driver wraps a libpag-web `PAGView` and exposes:
//! `load(bytes) -> composition | null`, `setComposition(c | null)`,
//! `numFrames()`, `play()`, `pause()`, `setProgress(p)`, `getProgress()`,
//! `flush()`, `setRepeatCount(n)`, `setScaleMode(i)`, `setCacheEnabled(b)`,
//! `addListener(name, fn)`, `removeListener(name, fn)`, `updateSize()` and
//! `destroy()`. Missing optional methods are skipped.

use js_sys::{Array, Function, Reflect, Uint8Array};
use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use pagbind_core::{
    same_listener, DecodeError, ListenerRef, NativePlayerPort, PortCapabilities, ScaleMode,
    SeekGranularity, REPEAT_INFINITE,
};

const EVENT_NAMES: [&str; 5] = [
    "onAnimationStart",
    "onAnimationEnd",
    "onAnimationCancel",
    "onAnimationRepeat",
    "onAnimationUpdate",
];

/// Repeat count as libpag-web expects it: 0 loops forever, so the
/// [`REPEAT_INFINITE`] sentinel becomes 0. Other values pass through.
#[inline]
pub fn web_repeat_count(count: i32) -> i32 {
    if count == REPEAT_INFINITE {
        0
    } else {
        count
    }
}

struct Registration {
    listener: ListenerRef,
    callbacks: Vec<(&'static str, Closure<dyn FnMut(JsValue)>)>,
}

pub struct WebPlayerPort {
    driver: JsValue,
    capabilities: PortCapabilities,
    registrations: Vec<Registration>,
}

impl WebPlayerPort {
    pub fn new(driver: JsValue) -> Self {
        Self {
            driver,
            // setScaleMode is broken upstream (libpag#2948); opt in with `with_scale_mode`
            capabilities: PortCapabilities {
                seek: SeekGranularity::Progress,
                scale_mode: false,
                render_scale: false,
                cache_all_frames: true,
            },
            registrations: Vec::new(),
        }
    }

    pub fn with_scale_mode(mut self, enabled: bool) -> Self {
        self.capabilities.scale_mode = enabled;
        self
    }

    pub fn driver(&self) -> &JsValue {
        &self.driver
    }

    fn method(&self, name: &str) -> Option<Function> {
        Reflect::get(&self.driver, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
    }

    fn call(&self, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
        let Some(f) = self.method(name) else {
            return Ok(JsValue::UNDEFINED);
        };
        let args: Array = args.iter().collect();
        f.apply(&self.driver, &args)
    }

    /// Fire-and-forget call; JS exceptions are logged.
    fn command(&self, name: &str, args: &[JsValue]) {
        if let Err(err) = self.call(name, args) {
            warn!("driver.{name} threw: {err:?}");
        }
    }

    fn callbacks_for(&self, listener: &ListenerRef) -> Vec<(&'static str, Closure<dyn FnMut(JsValue)>)> {
        EVENT_NAMES
            .iter()
            .map(|&name| {
                let l = listener.clone();
                let callback: Closure<dyn FnMut(JsValue)> = match name {
                    "onAnimationStart" => Closure::new(move |_: JsValue| l.on_start()),
                    "onAnimationEnd" => Closure::new(move |_: JsValue| l.on_end()),
                    "onAnimationCancel" => Closure::new(move |_: JsValue| l.on_cancel()),
                    "onAnimationRepeat" => Closure::new(move |_: JsValue| l.on_repeat()),
                    _ => {
                        let driver = self.driver.clone();
                        Closure::new(move |_: JsValue| l.on_update(read_progress(&driver)))
                    }
                };
                (name, callback)
            })
            .collect()
    }
}

/// `driver.getProgress()`, or 0 when unavailable.
fn read_progress(driver: &JsValue) -> f64 {
    Reflect::get(driver, &JsValue::from_str("getProgress"))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .and_then(|f| f.call0(driver).ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

impl NativePlayerPort for WebPlayerPort {
    type Composition = JsValue;

    fn load(&mut self, bytes: &[u8]) -> Result<JsValue, DecodeError> {
        let buffer = Uint8Array::from(bytes);
        match self.call("load", &[buffer.into()]) {
            Ok(comp) if comp.is_undefined() || comp.is_null() => {
                Err(DecodeError::new("driver returned no composition", bytes.len()))
            }
            Ok(comp) => Ok(comp),
            Err(err) => Err(DecodeError::new(
                err.as_string()
                    .or_else(|| {
                        Reflect::get(&err, &JsValue::from_str("message"))
                            .ok()
                            .and_then(|m| m.as_string())
                    })
                    .unwrap_or_else(|| "driver.load threw".to_string()),
                bytes.len(),
            )),
        }
    }

    fn set_composition(&mut self, composition: Option<JsValue>) {
        self.command("setComposition", &[composition.unwrap_or(JsValue::NULL)]);
    }

    fn total_frames(&self) -> u64 {
        self.call("numFrames", &[])
            .ok()
            .and_then(|v| v.as_f64())
            .filter(|n| n.is_finite() && *n > 0.0)
            .map_or(0, |n| n as u64)
    }

    fn capabilities(&self) -> PortCapabilities {
        self.capabilities
    }

    fn play(&mut self) {
        self.command("play", &[]);
    }

    fn pause(&mut self) {
        self.command("pause", &[]);
    }

    fn set_progress(&mut self, progress: f64) {
        self.command("setProgress", &[JsValue::from_f64(progress)]);
    }

    fn flush(&mut self) {
        self.command("flush", &[]);
    }

    fn set_repeat_count(&mut self, count: i32) {
        self.command("setRepeatCount", &[JsValue::from(web_repeat_count(count))]);
    }

    fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.command("setScaleMode", &[JsValue::from(mode.as_index())]);
    }

    fn set_cache_all_frames_in_memory(&mut self, enabled: bool) {
        self.command("setCacheEnabled", &[JsValue::from_bool(enabled)]);
    }

    fn add_listener(&mut self, listener: ListenerRef) {
        let callbacks = self.callbacks_for(&listener);
        for (name, callback) in &callbacks {
            self.command(
                "addListener",
                &[JsValue::from_str(name), callback.as_ref().clone()],
            );
        }
        self.registrations.push(Registration {
            listener,
            callbacks,
        });
    }

    fn remove_listener(&mut self, listener: &ListenerRef) {
        let Some(at) = self
            .registrations
            .iter()
            .position(|r| same_listener(&r.listener, listener))
        else {
            return;
        };
        let registration = self.registrations.remove(at);
        for (name, callback) in &registration.callbacks {
            self.command(
                "removeListener",
                &[JsValue::from_str(name), callback.as_ref().clone()],
            );
        }
    }

    fn update_size(&mut self) {
        self.command("updateSize", &[]);
    }

    fn release(&mut self) {
        for registration in std::mem::take(&mut self.registrations) {
            for (name, callback) in &registration.callbacks {
                self.command(
                    "removeListener",
                    &[JsValue::from_str(name), callback.as_ref().clone()],
                );
            }
        }
        self.command("destroy", &[]);
    }
}
