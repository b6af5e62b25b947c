//! Constant-time comparison.

use aws_lc_rs::constant_time::verify_slices_are_equal;

/// Compares two byte slices without an early exit on the first mismatch.
///
/// Length differences return immediately; callers compare fixed-length
/// digests when the length itself must not leak.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    verify_slices_are_equal(a, b).is_ok()
}
