//! Integration Test: Panic Prohibition
//!
//! **Policy**: Production code runs inside other processes' audio paths and
//! MUST propagate errors instead of panicking.
//! **Forbidden**: `.unwrap()`, `.expect(`, `panic!`, `todo!`, `unimplemented!`
//! **Exceptions**: test code (`#[cfg(test)]` modules and `tests/` directories)

use architectural_enforcement::{report, scan};

const FORBIDDEN: &[&str] = &[".unwrap()", ".expect(", "panic!(", "todo!(", "unimplemented!("];

/// Test that production code does not panic on errors
#[test]
fn test_no_panicking_calls_in_production_code() {
    let violations = scan(|_, code| is_panicking_call(code));
    report("Panicking calls found in production code!", &violations);
}

fn is_panicking_call(code: &str) -> bool {
    FORBIDDEN.iter().any(|pattern| code.contains(pattern))
}

#[test]
fn test_panic_violation_detection() {
    assert!(is_panicking_call("let fd = reply.into_single_fd().unwrap();"));
    assert!(is_panicking_call("let bus = SystemBus::connect().expect(\"bus\");"));
    assert!(!is_panicking_call("let dir = self.lock_dir.clone().unwrap_or_else(default_lock_dir);"));
    assert!(!is_panicking_call("let value = map.get(key).unwrap_or_default();"));
}
