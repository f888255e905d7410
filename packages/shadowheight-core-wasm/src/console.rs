#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

// This allows us to access console.log from JS
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    // Use `js_namespace` to bind `console.log(..)` instead of just `log(..)`
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    fn console_log_js(s: &str);
}

/// Write a line to the browser console, or to the `log` facade off-wasm.
pub fn log(s: &str) {
    #[cfg(target_arch = "wasm32")]
    console_log_js(s);

    #[cfg(not(target_arch = "wasm32"))]
    log::info!("{}", s);
}

// Note: The console_log macro is defined in lib.rs to avoid duplication
