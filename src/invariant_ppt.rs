//! Runtime invariants with contract-test support.
//!
//! Production code states its invariants with [`assert_invariant!`]; every
//! check is recorded per thread so a test can later prove that a code path
//! actually exercised the invariants it depends on.
//!
//! ```rust,ignore
//! use crabfocus::invariant_ppt::*;
//!
//! assert_invariant!(
//!     region.lies_within(width, height),
//!     "Crop region lies inside the frame",
//!     "quality::crop"
//! );
//!
//! #[test]
//! fn contract_scoring() {
//!     crabfocus::quality::score(&frame, 0.5).unwrap();
//!     contract_test("scoring", &["Crop region lies inside the frame"]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread_local;

thread_local! {
    static INVARIANT_LOG: RefCell<HashMap<String, u64>> = RefCell::new(HashMap::new());
}

/// Assert an invariant and record that it was checked.
///
/// # Panics
/// Panics with the message and optional context when the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        *log.borrow_mut().entry(message.to_string()).or_insert(0) += 1;
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        log::error!("invariant violated [{}]: {}", ctx, message);
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// How many times an invariant was checked on this thread
pub fn invariant_check_count(message: &str) -> u64 {
    INVARIANT_LOG.with(|log| log.borrow().get(message).copied().unwrap_or(0))
}

/// Panic unless every listed invariant was checked on this thread.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|inv| invariant_check_count(inv) == 0)
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

/// Forget every recorded check on this thread
pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| log.borrow_mut().clear());
}
