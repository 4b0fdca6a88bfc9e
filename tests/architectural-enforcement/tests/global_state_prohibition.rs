//! Integration Test: Global State Prohibition
//!
//! **Policy**: Streams of one device usually live in different processes, so
//! call session state MUST live in the per-device lock file. Production code
//! MUST NOT keep process-global mutable state.
//! **Forbidden**: `static mut`, `lazy_static!`, `thread_local!`, `OnceLock`,
//! `OnceCell`, `static` atomics

use architectural_enforcement::{report, scan};

/// Test that production code does not keep global mutable state
#[test]
fn test_no_global_state_in_production_code() {
    let violations = scan(|_, code| is_global_state(code));
    report("Global mutable state found in production code!", &violations);
}

fn is_global_state(code: &str) -> bool {
    let code = code.trim_start();
    let is_static = code.starts_with("static ") || code.starts_with("pub static ");

    code.contains("static mut ")
        || code.contains("lazy_static!")
        || code.contains("thread_local!")
        || (is_static
            && (code.contains("OnceLock")
                || code.contains("OnceCell")
                || code.contains("Atomic")
                || code.contains("Mutex")))
}

#[test]
fn test_global_state_detection() {
    assert!(is_global_state("static mut SESSIONS: usize = 0;"));
    assert!(is_global_state("static STATE: OnceLock<Mutex<Vec<u8>>> = OnceLock::new();"));
    assert!(is_global_state("pub static ACTIVE: AtomicBool = AtomicBool::new(false);"));
    assert!(!is_global_state("const TRANSFER_CALL: [&str; 3] = [\"a\", \"b\", \"c\"];"));
    assert!(!is_global_state("    state: Mutex<State>,"));
}
