use serde::{Deserialize, Serialize};
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use pagbind_core::{
    AnimationBinding, AnimationEvent, AnimationState, BindingConfig, ScaleMode, Source, SyncReport,
};

mod port;

pub use port::{web_repeat_count, WebPlayerPort};

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

/// Constructor options: the binding config plus web-only switches.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebOptions {
    #[serde(flatten)]
    binding: BindingConfig,
    /// Push scale mode changes to the view.
    scale_mode: bool,
}

#[derive(Serialize)]
struct UpdateResult<'a> {
    report: &'a SyncReport,
    events: &'a [AnimationEvent],
    state: &'a AnimationState,
}

/// One libpag-web view bound to an animation state owned by this object.
#[wasm_bindgen]
pub struct WebPagAnimation {
    binding: AnimationBinding<WebPlayerPort>,
    state: AnimationState,
}

#[wasm_bindgen]
impl WebPagAnimation {
    /// Bind a driver object. `options` is a partial config object or
    /// undefined/null for defaults, e.g.
    ///   new WebPagAnimation(driver, { progress_driver: "clock", scale_mode: false })
    #[wasm_bindgen(constructor)]
    pub fn new(driver: JsValue, options: JsValue) -> Result<WebPagAnimation, JsError> {
        console_error_panic_hook::set_once();

        if jsvalue_is_undefined_or_null(&driver) {
            return Err(JsError::new("driver is null/undefined"));
        }
        let opts: WebOptions = if jsvalue_is_undefined_or_null(&options) {
            WebOptions::default()
        } else {
            swb::from_value(options).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        opts.binding
            .validate()
            .map_err(|e| JsError::new(&e.to_string()))?;

        let mut binding = AnimationBinding::new(opts.binding);
        let scale_mode = opts.scale_mode;
        binding.attach(move || WebPlayerPort::new(driver).with_scale_mode(scale_mode));
        Ok(WebPagAnimation {
            binding,
            state: AnimationState::default(),
        })
    }

    /// Replace the encoded animation; `undefined` clears it.
    #[wasm_bindgen(js_name = set_source)]
    pub fn set_source(&mut self, bytes: Option<Vec<u8>>) {
        self.state.source = bytes.map(Source::from);
    }

    #[wasm_bindgen(js_name = set_playing)]
    pub fn set_playing(&mut self, playing: bool) {
        self.state.is_playing = playing;
    }

    #[wasm_bindgen(js_name = set_progress)]
    pub fn set_progress(&mut self, progress: f64) {
        self.state.progress = progress;
    }

    /// `-1` loops forever.
    #[wasm_bindgen(js_name = set_repeat_count)]
    pub fn set_repeat_count(&mut self, count: i32) {
        self.state.repeat_count = count;
    }

    /// 0 = None, 1 = Stretch, 2 = LetterBox, 3 = Zoom.
    #[wasm_bindgen(js_name = set_scale_mode)]
    pub fn set_scale_mode(&mut self, index: u8) -> Result<(), JsError> {
        self.state.scale_mode = ScaleMode::from_index(index)
            .ok_or_else(|| JsError::new(&format!("unknown scale mode {index}")))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = set_render_scale)]
    pub fn set_render_scale(&mut self, scale: f32) {
        self.state.render_scale = scale;
    }

    #[wasm_bindgen(js_name = set_cache_all_frames_in_memory)]
    pub fn set_cache_all_frames_in_memory(&mut self, enabled: bool) {
        self.state.cache_all_frames_in_memory = enabled;
    }

    /// Overwrite the non-source fields from a (partial) state object.
    #[wasm_bindgen(js_name = set_state)]
    pub fn set_state(&mut self, state: JsValue) -> Result<(), JsError> {
        let mut next: AnimationState =
            swb::from_value(state).map_err(|e| JsError::new(&format!("state error: {e}")))?;
        next.source = self.state.source.take();
        self.state = next;
        Ok(())
    }

    /// Current state as a plain object (without the source bytes).
    #[wasm_bindgen]
    pub fn state(&self) -> Result<JsValue, JsError> {
        swb::to_value(&self.state).map_err(|e| JsError::new(&format!("state error: {e}")))
    }

    /// Push pending changes to the view. Returns the sync report.
    #[wasm_bindgen]
    pub fn sync(&mut self) -> Result<JsValue, JsError> {
        let report = self.binding.sync(&self.state);
        swb::to_value(&report).map_err(|e| JsError::new(&format!("report error: {e}")))
    }

    /// Fold queued view events into the state. Returns the events.
    #[wasm_bindgen]
    pub fn poll(&mut self) -> Result<JsValue, JsError> {
        let events = self.binding.apply_events(&mut self.state);
        swb::to_value(&events).map_err(|e| JsError::new(&format!("events error: {e}")))
    }

    /// One host frame: advance the clock by `dt` seconds, sync, then poll.
    /// Returns `{ report, events, state }`.
    #[wasm_bindgen]
    pub fn update(&mut self, dt: f32) -> Result<JsValue, JsError> {
        self.binding.tick(dt, &mut self.state);
        let report = self.binding.sync(&self.state);
        let events = self.binding.apply_events(&mut self.state);
        let out = UpdateResult {
            report: &report,
            events: &events,
            state: &self.state,
        };
        swb::to_value(&out).map_err(|e| JsError::new(&format!("update error: {e}")))
    }

    #[wasm_bindgen]
    pub fn suspend(&mut self) {
        self.binding.suspend();
    }

    #[wasm_bindgen]
    pub fn resume(&mut self) {
        self.binding.resume();
    }

    /// Call after the canvas was resized.
    #[wasm_bindgen]
    pub fn resize(&mut self) {
        self.binding.resize();
    }

    /// Release the view. Later calls are ignored.
    #[wasm_bindgen]
    pub fn dispose(&mut self) -> bool {
        self.binding.dispose()
    }

    #[wasm_bindgen(js_name = handle_state)]
    pub fn handle_state(&self) -> Result<JsValue, JsError> {
        swb::to_value(&self.binding.handle_state())
            .map_err(|e| JsError::new(&format!("state error: {e}")))
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
