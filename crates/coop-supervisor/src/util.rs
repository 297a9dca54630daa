//! Shared utilities for the supervisor crate

use core::fmt::Display;

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// Console.log binding for WASM
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Convert any displayable error into a JS exception value
pub fn to_js<E: Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}
