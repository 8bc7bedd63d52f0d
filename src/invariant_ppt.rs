//! Runtime invariant checks with contract-test support
//!
//! Production code states its invariants with `assert_invariant!`; every
//! check is recorded per thread, and tests use `contract_test` to prove the
//! code path they exercised actually checked the invariants it promises.
//!
//! ```rust,ignore
//! use virtcam::assert_invariant;
//!
//! assert_invariant!(
//!     settings.width == Some(width),
//!     "Synthetic track dimensions equal the decoded image",
//!     "synth::generator"
//! );
//!
//! // in a test, after driving the generator
//! virtcam::invariant_ppt::contract_test("generator", &[
//!     "Synthetic track dimensions equal the decoded image",
//! ]);
//! ```

use std::cell::RefCell;
use std::collections::HashSet;

thread_local! {
    static CHECKED: RefCell<HashSet<&'static str>> = RefCell::new(HashSet::new());
}

/// Invariant: a synthetic track reports exactly the decoded image's size.
pub const TRACK_MATCHES_IMAGE: &str = "Synthetic track dimensions equal the decoded image";
/// Invariant: a synthetic track reports the synthetic group.
pub const TRACK_IN_SYNTHETIC_GROUP: &str = "Synthetic track reports the synthetic group id";
/// Invariant: enumeration keeps every real device and appends the synthetic ones after them.
pub const REAL_DEVICES_FIRST: &str = "Enumeration appends synthetic devices after all real devices";
/// Invariant: a synthesized camera index lies inside the snapshot used to pick it.
pub const INDEX_IN_SNAPSHOT: &str = "Selected camera index is within the snapshot";

/// Assert an invariant and record that it was checked.
///
/// Panics with the message (and optional context) when the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__check_invariant($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__check_invariant($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __check_invariant(condition: bool, message: &'static str, context: Option<&str>) {
    CHECKED.with(|checked| {
        checked.borrow_mut().insert(message);
    });

    if !condition {
        panic!(
            "invariant violated [{}]: {}",
            context.unwrap_or("unknown"),
            message
        );
    }
}

/// Whether `message` was checked on this thread since the last clear.
pub fn was_checked(message: &str) -> bool {
    CHECKED.with(|checked| checked.borrow().contains(message))
}

/// Panic unless every invariant in `required` was checked on this thread.
pub fn contract_test(name: &str, required: &[&str]) {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|message| !was_checked(message))
        .collect();

    if !missing.is_empty() {
        panic!(
            "contract '{}' not honoured, unchecked invariants:\n  - {}",
            name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    CHECKED.with(|checked| checked.borrow_mut().clear());
}
