//! WebAssembly entry point.

use crate::params::{UrlParams, parse_params};
use wasm_bindgen::prelude::*;

/// Read parameters from the page's query string and hash.
pub fn get_url_params() -> UrlParams {
    let Some(window) = web_sys::window() else {
        return UrlParams::default();
    };
    let location = window.location();
    let search = location.search().unwrap_or_default();
    let hash = location.hash().unwrap_or_default();
    let from_search = parse_params(&search);
    if from_search != UrlParams::default() {
        return from_search;
    }
    parse_params(&hash)
}

/// Initialize logging and the panic hook.
#[wasm_bindgen(start)]
pub fn run_wasm() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    let params = get_url_params();
    if console_log::init_with_level(params.log_level).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }

    log::info!("Starting SketchCast (WASM), log level {}", params.log_level);
}
