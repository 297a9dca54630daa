//! `Host` implementation over a JavaScript host object
//!
//! The page hands the supervisor an object with four methods:
//!
//! ```text
//! {
//!   time():         number        // current tick
//!   cpuRemaining(): number        // budget left this tick
//!   load():         string | null // stored image
//!   store(image):   bool | void   // false means the host refused it
//! }
//! ```

use coop_hal::{Host, HostError};
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::constants::{HOST_CPU_REMAINING, HOST_LOAD, HOST_METHODS, HOST_STORE, HOST_TIME};
use crate::util::log;

/// Browser host backed by a JS object
pub struct WebHost {
    host: JsValue,
}

impl WebHost {
    /// Wrap `host`, checking that it provides every required method
    pub fn new(host: JsValue) -> Result<Self, JsValue> {
        for method in HOST_METHODS {
            let value = Reflect::get(&host, &method.into())?;
            if !value.is_function() {
                return Err(JsValue::from_str(&format!(
                    "host object is missing method {}",
                    method
                )));
            }
        }
        Ok(Self { host })
    }

    fn call(&self, method: &str, args: &Array) -> Result<JsValue, JsValue> {
        let func = Reflect::get(&self.host, &method.into())?.dyn_into::<Function>()?;
        Reflect::apply(&func, &self.host, args)
    }

    fn call_number(&self, method: &str) -> Option<f64> {
        match self.call(method, &Array::new()) {
            Ok(value) => value.as_f64(),
            Err(e) => {
                log(&format!("[web-host] {} failed: {:?}", method, e));
                None
            }
        }
    }
}

impl Host for WebHost {
    fn tick(&self) -> u64 {
        self.call_number(HOST_TIME)
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map_or(0, |t| t as u64)
    }

    fn cpu_remaining(&self) -> f64 {
        // An unusable answer ends the pass rather than running unbounded
        self.call_number(HOST_CPU_REMAINING)
            .filter(|c| !c.is_nan())
            .unwrap_or(0.0)
    }

    fn debug_write(&self, msg: &str) {
        log(msg);
    }

    fn load_image(&self) -> Result<Option<String>, HostError> {
        let value = self
            .call(HOST_LOAD, &Array::new())
            .map_err(|e| HostError::Other(format!("load failed: {:?}", e)))?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        value
            .as_string()
            .map(Some)
            .ok_or_else(|| HostError::Other("load returned a non-string".to_string()))
    }

    fn store_image(&self, image: &str) -> Result<(), HostError> {
        let value = self
            .call(HOST_STORE, &Array::of1(&JsValue::from_str(image)))
            .map_err(|_| HostError::StorageUnavailable)?;
        if value.as_bool() == Some(false) {
            return Err(HostError::StorageFull);
        }
        Ok(())
    }
}
