use wasm_bindgen::prelude::*;

// Create a console module for logging
pub mod console;
// Per-tile retry backoff for the base map layers
mod backoff;
// Push-connection lifecycle management
mod connection;
// Inbound push message decoding
mod feed;
// Route and trace feature layers
mod layers;
// Shared data structures
mod models;
// Module state management
mod module_state;
// Selection/popup state machine
mod popup;
// Session code validation and page bootstrap
mod session;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[wasm_bindgen]
extern "C" {
    // JavaScript helper that hands a replaced feature collection to the
    // rendering library (full swap of the named layer's source).
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = applyLayerFeatures)]
    pub fn apply_layer_features(layer: &str, features_json: &str);

    // JavaScript helper that re-requests a single failed tile.
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = reloadTile)]
    pub fn reload_tile(source: &str, z: u32, x: u32, y: u32);

    // JavaScript helper that moves or hides the popup overlay.
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = setOverlayPosition)]
    pub fn set_overlay_position(x: f64, y: f64, visible: bool);
}

// Use the macro from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => (crate::console::log(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("Tracklive WASM core initialized");
    });
}
