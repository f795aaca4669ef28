use std::collections::HashMap;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::module_state::ModuleState;

/// Base delay for the jittered exponential backoff, in milliseconds.
pub const BASE_TIMEOUT_MS: f64 = 500.0;
/// A tile is retried at most this many times, then silently given up on.
pub const MAX_RETRIES: u32 = 5;

const ATTR_KARTVERKET: &str = concat!(
    "© <a href=\"https://www.kartverket.no/\" target=\"_blank\">Kartverket</a> ",
    "<a href=\"https://www.kartverket.no/data/lisens/\" target=\"_blank\">(CC BY 4.0)</a>",
);
const ATTR_LANTMATERIET: &str = concat!(
    "© <a href=\"https://www.lantmateriet.se/\" target=\"_blank\">Lantmäteriet</a> ",
    "<a href=\"https://www.lantmateriet.se/sv/Kartor-och-geografisk-information/oppna-data/\" target=\"_blank\">(CC0 1.0)</a>",
);

// The two national base layers. Each owns an independent backoff counter in
// the module state, so the same z/x/y failing on both grids is tracked twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileSource {
    TopoNo,
    TopoSe,
}

impl TileSource {
    pub fn parse(raw: &str) -> Option<TileSource> {
        match raw {
            "no" => Some(TileSource::TopoNo),
            "se" => Some(TileSource::TopoSe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TileSource::TopoNo => "no",
            TileSource::TopoSe => "se",
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            TileSource::TopoNo => ATTR_KARTVERKET,
            TileSource::TopoSe => ATTR_LANTMATERIET,
        }
    }
}

// Value-typed tile coordinate. Used directly as the map key instead of a
// stringified "z,x,y" so differing coordinate systems can never alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

/// Per-tile retry bookkeeping for one base layer. Entries are created lazily
/// on first failure and never removed; the tile space actually requested in
/// a session bounds the map.
pub struct BackoffCounter {
    attempts: HashMap<TileKey, u32>,
}

impl BackoffCounter {
    pub fn new() -> Self {
        BackoffCounter {
            attempts: HashMap::new(),
        }
    }

    /// Account for one failed fetch of `key`. Returns the jittered delay for
    /// the retry to schedule, or `None` once the tile has exhausted its
    /// retries. `unit_random` is a sample from [0, 1).
    pub fn next_delay_ms(&mut self, key: TileKey, unit_random: f64) -> Option<f64> {
        let attempt = self.attempts.entry(key).or_insert(0);
        if *attempt >= MAX_RETRIES {
            return None;
        }
        let delay = unit_random * BASE_TIMEOUT_MS * 2f64.powi(*attempt as i32);
        *attempt += 1;
        Some(delay)
    }

    pub fn attempts(&self, key: &TileKey) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }
}

impl Default for BackoffCounter {
    fn default() -> Self {
        BackoffCounter::new()
    }
}

/// Tile load error hook, called by the renderer's tileloaderror handler.
/// Schedules at most one deferred reload; after the retry budget is spent
/// the tile stays unrendered for the session and nothing is surfaced.
#[wasm_bindgen]
pub fn report_tile_error(source: &str, z: u32, x: u32, y: u32) -> Result<(), JsValue> {
    let source = TileSource::parse(source)
        .ok_or_else(|| JsValue::from_str(&format!("unknown tile source: {}", source)))?;
    let key = TileKey { z, x, y };

    let delay = ModuleState::with_mut(|state| {
        state
            .backoff_mut(source)
            .next_delay_ms(key, js_sys::Math::random())
    });

    match delay {
        Some(delay) => schedule_reload(source, key, delay),
        None => Ok(()),
    }
}

/// Attribution line for a base layer, read by the JS side when it builds the
/// tile layers.
#[wasm_bindgen]
pub fn tile_source_attribution(source: &str) -> Result<String, JsValue> {
    TileSource::parse(source)
        .map(|s| s.attribution().to_string())
        .ok_or_else(|| JsValue::from_str(&format!("unknown tile source: {}", source)))
}

// Fire-and-forget: the timer is never cancelled and nobody awaits it.
fn schedule_reload(source: TileSource, key: TileKey, delay_ms: f64) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let callback = Closure::once(move || {
        crate::reload_tile(source.as_str(), key.z, key.x, key.y);
    });
    window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        delay_ms as i32,
    )?;
    callback.forget();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: TileKey = TileKey { z: 7, x: 64, y: 40 };

    #[test]
    fn six_failures_schedule_exactly_five_retries() {
        let mut counter = BackoffCounter::new();
        let mut scheduled = 0;
        for _ in 0..6 {
            if counter.next_delay_ms(KEY, 0.5).is_some() {
                scheduled += 1;
            }
        }
        assert_eq!(scheduled, 5);
        assert_eq!(counter.attempts(&KEY), 5);
        // Further failures stay silent
        assert!(counter.next_delay_ms(KEY, 0.5).is_none());
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let mut counter = BackoffCounter::new();
        // With the jitter pinned to 1.0 the schedule is exactly 500 * 2^n
        let delays: Vec<f64> = (0..5)
            .map(|_| counter.next_delay_ms(KEY, 1.0).unwrap())
            .collect();
        assert_eq!(delays, vec![500.0, 1000.0, 2000.0, 4000.0, 8000.0]);
    }

    #[test]
    fn delay_is_bounded_by_the_jitter_sample() {
        let mut counter = BackoffCounter::new();
        let delay = counter.next_delay_ms(KEY, 0.0).unwrap();
        assert_eq!(delay, 0.0);
        let delay = counter.next_delay_ms(KEY, 0.25).unwrap();
        assert_eq!(delay, 0.25 * BASE_TIMEOUT_MS * 2.0);
    }

    #[test]
    fn coordinates_are_tracked_independently() {
        let mut counter = BackoffCounter::new();
        for _ in 0..5 {
            counter.next_delay_ms(KEY, 0.5);
        }
        assert!(counter.next_delay_ms(KEY, 0.5).is_none());

        let other = TileKey { z: 7, x: 64, y: 41 };
        assert!(counter.next_delay_ms(other, 0.5).is_some());
    }

    #[test]
    fn sources_do_not_share_state() {
        // Same coordinate, two counters, as the module state keeps them
        let mut no = BackoffCounter::new();
        let mut se = BackoffCounter::new();
        for _ in 0..5 {
            no.next_delay_ms(KEY, 0.5);
        }
        assert!(no.next_delay_ms(KEY, 0.5).is_none());
        assert!(se.next_delay_ms(KEY, 0.5).is_some());
    }

    #[test]
    fn source_names_round_trip() {
        assert_eq!(TileSource::parse("no"), Some(TileSource::TopoNo));
        assert_eq!(TileSource::parse("se"), Some(TileSource::TopoSe));
        assert!(TileSource::parse("dk").is_none());
        assert_eq!(TileSource::TopoNo.as_str(), "no");
    }
}
