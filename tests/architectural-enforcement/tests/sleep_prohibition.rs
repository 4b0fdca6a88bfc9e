//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Waiting on a
//! session lock goes through blocking `F_OFD_SETLKW`; the kernel wakes the
//! waiter, never a timer.
//! **Exceptions**: test code

use architectural_enforcement::{report, scan};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(|_, code| is_sleep_call(code));
    report("Sleep calls found in production code!", &violations);
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("usleep(")
}

#[test]
fn test_sleep_violation_detection() {
    assert!(is_sleep_call("    std::thread::sleep(Duration::from_millis(10));"));
    assert!(is_sleep_call("    unsafe { libc::usleep(100) };"));
    assert!(!is_sleep_call("    handle.lock_mutex()?;"));
}
