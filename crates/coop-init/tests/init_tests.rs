//! Init supervising real services inside a kernel

use std::cell::Cell;
use std::rc::Rc;

use coop_hal_mock::MockHost;
use coop_init::{InitConfig, Ledger, ServiceSpec, LEDGER_KEY};
use coop_kernel::{
    Interrupt, Kernel, KernelConfig, Pid, Priority, PriorityScheduler, ProcessRegistry,
    ProcessState, Reply, Step, Syscall, ThreadInit, ROOT_PID,
};
use serde_json::{json, Value};

// ============================================================================
// Test Harness
// ============================================================================

fn registry(config: InitConfig, runs: Rc<Cell<u32>>) -> ProcessRegistry {
    let mut registry = ProcessRegistry::new();
    coop_init::register(&mut registry, config);
    registry.register("worker", move |_init: &ThreadInit<'_>| {
        let runs = runs.clone();
        Ok(move |_reply: Reply| -> Result<Step, Interrupt> {
            runs.set(runs.get() + 1);
            Ok(Syscall::Sleep(1).into())
        })
    });
    registry.register("oneshot", |_init: &ThreadInit<'_>| {
        Ok(|_reply: Reply| -> Result<Step, Interrupt> { Ok(Step::Done) })
    });
    registry
}

fn services() -> InitConfig {
    InitConfig {
        services: vec![
            ServiceSpec::new("worker").priority(Priority(50)),
            ServiceSpec::new("worker").args(json!({"room": "W1N1"})).named("remote"),
        ],
        check_interval: 3,
    }
}

fn boot(host: &MockHost, registry: ProcessRegistry) -> Kernel<MockHost, PriorityScheduler> {
    Kernel::new(
        host.clone(),
        PriorityScheduler::new(),
        registry,
        KernelConfig::default(),
    )
    .unwrap_or_else(|e| panic!("boot failed: {}", e))
}

fn run_ticks(kernel: &mut Kernel<MockHost, PriorityScheduler>, host: &MockHost, n: u32) {
    for _ in 0..n {
        host.advance_tick();
        kernel.run();
    }
}

fn ledger(kernel: &Kernel<MockHost, PriorityScheduler>) -> Ledger {
    let memory = kernel.inspect(ROOT_PID).unwrap();
    serde_json::from_value(memory["heap"][LEDGER_KEY].clone()).unwrap()
}

// ============================================================================
// Supervision
// ============================================================================

#[test]
fn test_init_starts_services() {
    let host = MockHost::new();
    let runs = Rc::new(Cell::new(0));
    let mut kernel = boot(&host, registry(services(), runs.clone()));

    run_ticks(&mut kernel, &host, 2);

    let ps = kernel.ps();
    assert_eq!(ps.len(), 3);
    assert_eq!(ps[1].kind, "worker");
    assert_eq!(ps[1].parent, Some(ROOT_PID));
    assert_eq!(ps[1].priority, Some(Priority(50)));
    assert_eq!(kernel.inspect(Pid(2)).unwrap()["args"], json!({"room": "W1N1"}));
    assert_eq!(ps[0].state, ProcessState::Sleeping);
    assert_eq!(runs.get(), 2);

    let ledger = ledger(&kernel);
    assert_eq!(ledger["worker"].spawns, 1);
    assert_eq!(ledger["remote"].pid, Some(Pid(2)));
}

#[test]
fn test_killed_service_is_respawned() {
    let host = MockHost::new();
    let runs = Rc::new(Cell::new(0));
    let mut kernel = boot(&host, registry(services(), runs));

    run_ticks(&mut kernel, &host, 1);
    assert!(kernel.kill(Pid(1)));
    assert_eq!(kernel.process_count(), 2);

    // Init checks again three ticks after it went to sleep
    run_ticks(&mut kernel, &host, 3);

    let ps = kernel.ps();
    assert_eq!(ps.len(), 3);
    assert_eq!(ps[2].pid, Pid(3));
    let ledger = ledger(&kernel);
    assert_eq!(ledger["worker"].respawns(), 1);
    assert_eq!(ledger["worker"].pid, Some(Pid(3)));
    assert_eq!(ledger["remote"].respawns(), 0);
}

#[test]
fn test_completed_service_is_restarted() {
    let host = MockHost::new();
    let config = InitConfig {
        services: vec![ServiceSpec::new("oneshot")],
        check_interval: 1,
    };
    let mut kernel = boot(&host, registry(config, Rc::new(Cell::new(0))));

    run_ticks(&mut kernel, &host, 6);

    assert!(ledger(&kernel)["oneshot"].spawns >= 3);
}

#[test]
fn test_reboot_keeps_ledger_without_duplicates() {
    let host = MockHost::new();
    let runs = Rc::new(Cell::new(0));
    let mut kernel = boot(&host, registry(services(), runs));

    run_ticks(&mut kernel, &host, 1);
    kernel.reboot();
    run_ticks(&mut kernel, &host, 1);

    assert_eq!(kernel.process_count(), 3);
    let ledger = ledger(&kernel);
    assert_eq!(ledger["worker"].spawns, 1);
    assert_eq!(ledger["remote"].spawns, 1);
}

#[test]
fn test_unknown_service_type_is_recorded() {
    let host = MockHost::new();
    let config = InitConfig::with_services(vec![ServiceSpec::new("ghost")]);
    let mut kernel = boot(&host, registry(config, Rc::new(Cell::new(0))));

    run_ticks(&mut kernel, &host, 1);

    assert_eq!(kernel.process_count(), 1);
    let record = &ledger(&kernel)["ghost"];
    assert_eq!(record.spawns, 0);
    assert_eq!(record.last_error.as_deref(), Some("unknown process type ghost"));
}

#[test]
fn test_bad_root_args_reset_kernel() {
    let host = MockHost::new();
    host.set_stored_image(
        r#"{"next_pid":1,"processes":{"0":["init",0,null,null,{"args":7,"heap":{}}]}}"#,
    );
    let kernel = boot(&host, registry(services(), Rc::new(Cell::new(0))));

    // The root failed to construct, so the kernel started over with a
    // fresh root that falls back to the registered config
    let memory = kernel.inspect(ROOT_PID).unwrap();
    assert_eq!(memory["args"], Value::Null);
    assert_eq!(kernel.state_of(ROOT_PID), Some(ProcessState::Uninitialized));
}
