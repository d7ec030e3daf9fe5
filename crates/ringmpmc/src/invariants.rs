//! Debug assertion macros for the cursor invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`), so release builds
//! pay nothing. Cursor order is `released ≤ consumed ≤ committed ≤ reserved`.

// =============================================================================
// Bounded backlog
// =============================================================================

/// Assert that a producer never claims more than `capacity` slots ahead of
/// the release cursor.
///
/// **Invariant**: `reserved - released ≤ capacity`
///
/// Used in: `offer()` after winning the `reserved` CAS
macro_rules! debug_assert_bounded_backlog {
    ($reserved:expr, $released:expr, $capacity:expr) => {
        debug_assert!(
            $reserved.wrapping_sub($released) <= $capacity,
            "bounded backlog violated: reserved {} is more than {} ahead of released {}",
            $reserved,
            $capacity,
            $released
        )
    };
}

// =============================================================================
// Cursor order
// =============================================================================

/// Assert that a trailing cursor never passes the one it follows.
///
/// Used in: `poll()` (consumed vs committed), `release()` (released vs consumed)
macro_rules! debug_assert_not_past {
    ($trailing:literal, $value:expr, $leading:literal, $bound:expr) => {
        debug_assert!(
            $value <= $bound,
            "cursor order violated: {} {} passed {} {}",
            $trailing,
            $value,
            $leading,
            $bound
        )
    };
}

// =============================================================================
// Monotonic progress
// =============================================================================

/// Assert that a cursor only moves forward.
///
/// Used in: `commit()`, `release()`
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new > $old,
            "monotonic progress violated: {} went from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// Initialized range
// =============================================================================

/// Assert that a slot read lies in the committed, unreleased window.
///
/// **Invariant**: slot `pos` is initialized ⟺ `released ≤ pos < committed`
///
/// Used in: slot reads in `poll()`, `peek()`, `contains()`, `clear()`
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $committed:expr) => {
        debug_assert!(
            $pos < $committed,
            "reading slot at seq {} outside committed range (committed = {})",
            $pos,
            $committed
        )
    };
}

pub(crate) use debug_assert_bounded_backlog;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_not_past;
