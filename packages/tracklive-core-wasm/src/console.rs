use wasm_bindgen::prelude::*;

// Bindings to the browser console. The console_log macro lives in lib.rs.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);

    // console.error, used on the fatal paths just before the redirect
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn error(s: &str);
}
