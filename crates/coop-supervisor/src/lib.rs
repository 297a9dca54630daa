//! Browser-hosted supervisor for Coop OS
//!
//! Binds a [`coop_kernel::Kernel`] to a JavaScript host object and exposes it
//! to the page through wasm-bindgen:
//!
//! ```text
//!  page (JS)                         supervisor (wasm)
//!  ─────────                         ─────────────────
//!  new Supervisor(host, config) ───▶ WebHost + Kernel::new
//!  setInterval(() => sup.tick())───▶ Kernel::run
//!  sup.ps() / sup.inspect(pid)  ◀─── JSON snapshots
//!  sup.kill / reboot / reset    ───▶ operator commands
//!
//!  host.time() / cpuRemaining() / load() / store(image)
//!                               ◀─── WebHost (coop_hal::Host)
//! ```
//!
//! The root process is Init (`coop-init`), supervising the services listed
//! in the config.

pub mod boot;
pub mod constants;
pub mod host;
pub mod supervisor;
pub mod util;

pub use boot::{build_kernel, builtin_registry, DynKernel, SchedulerKind, SupervisorConfig};
pub use host::WebHost;
pub use supervisor::Supervisor;
