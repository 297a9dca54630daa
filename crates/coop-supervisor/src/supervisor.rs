//! The wasm-bindgen surface handed to the page

use coop_kernel::{KernelError, Pid, ProcessRegistry};
use wasm_bindgen::prelude::*;

use crate::boot::{self, DynKernel, SupervisorConfig};
use crate::host::WebHost;
use crate::util::{log, to_js};

/// Browser supervisor: owns one kernel and drives it on request
#[wasm_bindgen]
pub struct Supervisor {
    kernel: DynKernel<WebHost>,
}

#[wasm_bindgen]
impl Supervisor {
    /// Boot a kernel over the JS `host` object.
    ///
    /// `config_json` is optional; see `SupervisorConfig` for its layout.
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsValue, config_json: Option<String>) -> Result<Supervisor, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let config = match config_json {
            Some(json) => SupervisorConfig::from_json(&json).map_err(to_js)?,
            None => SupervisorConfig::default(),
        };
        let host = WebHost::new(host)?;
        let registry = boot::builtin_registry(&config);
        let supervisor = Self::with_registry(host, &config, registry).map_err(to_js)?;
        log(&format!(
            "[supervisor] ready: {} processes, {:?} scheduler",
            supervisor.kernel.process_count(),
            config.scheduler
        ));
        Ok(supervisor)
    }

    /// Run one kernel tick. Returns the number of resumptions.
    pub fn tick(&mut self) -> u32 {
        self.kernel.run() as u32
    }

    /// Process list as JSON
    pub fn ps(&self) -> Result<String, JsValue> {
        boot::ps_json(&self.kernel).map_err(to_js)
    }

    /// Kill `pid` and its descendants. False for the root or an unknown PID.
    pub fn kill(&mut self, pid: u32) -> bool {
        let killed = self.kernel.kill(Pid(pid));
        if killed {
            log(&format!("[supervisor] killed pid {}", pid));
        }
        killed
    }

    /// Rebuild every thread from the live process table, keeping memory
    pub fn reboot(&mut self) {
        self.kernel.reboot();
    }

    /// Wipe everything back to a lone root
    pub fn reset(&mut self) {
        self.kernel.reset();
    }

    /// Memory of `pid` as JSON, `undefined` if it does not exist
    pub fn inspect(&self, pid: u32) -> Option<String> {
        boot::inspect_json(&self.kernel, Pid(pid))
    }

    /// Most recent `count` kernel events as JSON, newest first
    pub fn syslog(&self, count: usize) -> Result<String, JsValue> {
        boot::syslog_json(&self.kernel, count).map_err(to_js)
    }

    /// Invariant violations (empty when healthy)
    pub fn check(&self) -> Vec<String> {
        boot::violations(&self.kernel)
    }

    /// Number of live processes
    #[wasm_bindgen(getter)]
    pub fn process_count(&self) -> u32 {
        self.kernel.process_count() as u32
    }

    /// Tick seen by the last run
    #[wasm_bindgen(getter)]
    pub fn current_tick(&self) -> f64 {
        self.kernel.tick() as f64
    }
}

/// Rust-side construction (not exposed to JS)
impl Supervisor {
    /// Boot with a caller-supplied registry, for crates embedding their own
    /// process types
    pub fn with_registry(
        host: WebHost,
        config: &SupervisorConfig,
        registry: ProcessRegistry,
    ) -> Result<Self, KernelError> {
        let kernel = boot::build_kernel(host, config, registry)?;
        Ok(Self { kernel })
    }

    /// The underlying kernel
    pub fn kernel(&self) -> &DynKernel<WebHost> {
        &self.kernel
    }

    /// The underlying kernel, mutably (e.g. to seed processes)
    pub fn kernel_mut(&mut self) -> &mut DynKernel<WebHost> {
        &mut self.kernel
    }
}
