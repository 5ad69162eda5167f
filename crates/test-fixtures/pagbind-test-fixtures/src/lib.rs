use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use pagbind_core::{AnimationEvent, AnimationListener, ListenerRef};
use serde::Deserialize;

mod player;

pub use player::{CallLog, PortCall, SimComposition, SimulatedPlayer, FIXTURE_FPS};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    compositions: HashMap<String, CompositionEntry>,
    malformed: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct CompositionEntry {
    frames: u32,
    width: u32,
    height: u32,
    #[serde(default = "default_color")]
    color: [u8; 4],
}

fn default_color() -> [u8; 4] {
    [255, 255, 255, 255]
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Encoded compositions understood by [`SimulatedPlayer`].
///
/// Layout: `b"PAGS"`, version byte `1`, then frame count, width and height as
/// little-endian `u32`, then one RGBA fill colour.
pub mod compositions {
    use super::*;

    pub const MAGIC: &[u8; 4] = b"PAGS";
    pub const VERSION: u8 = 1;
    pub const ENCODED_LEN: usize = 21;

    pub fn keys() -> Vec<String> {
        MANIFEST.compositions.keys().cloned().collect()
    }

    /// Encoded bytes of a named manifest entry.
    pub fn named(name: &str) -> Result<Vec<u8>> {
        let entry = lookup(&MANIFEST.compositions, "composition", name)
            .with_context(|| format!("while encoding composition '{name}'"))?;
        Ok(encode(entry.frames, entry.width, entry.height, entry.color))
    }

    pub fn bytes(frames: u32, width: u32, height: u32) -> Vec<u8> {
        encode(frames, width, height, default_color())
    }

    pub fn encode(frames: u32, width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCODED_LEN);
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&frames.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&color);
        out
    }

    pub fn malformed_keys() -> Vec<String> {
        MANIFEST.malformed.keys().cloned().collect()
    }

    pub fn malformed_named(name: &str) -> Result<Vec<u8>> {
        lookup(&MANIFEST.malformed, "malformed", name).cloned()
    }

    /// Bytes that never decode.
    pub fn malformed() -> Vec<u8> {
        b"not a composition".to_vec()
    }
}

/// Listener that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<AnimationEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn as_listener(self: &Arc<Self>) -> ListenerRef {
        self.clone()
    }

    pub fn events(&self) -> Vec<AnimationEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Event names without update payloads, handy for sequence assertions.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AnimationEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn record(&self, event: AnimationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl AnimationListener for RecordingListener {
    fn on_start(&self) {
        self.record(AnimationEvent::Start)
    }
    fn on_end(&self) {
        self.record(AnimationEvent::End)
    }
    fn on_cancel(&self) {
        self.record(AnimationEvent::Cancel)
    }
    fn on_repeat(&self) {
        self.record(AnimationEvent::Repeat)
    }
    fn on_update(&self, progress: f64) {
        self.record(AnimationEvent::Update { progress })
    }
}
