//! Capacity planning for power-of-two slot buffers.
//!
//! All buffers in this crate have power-of-two length so slot indices can
//! be computed by masking. The planner turns an expected element count and
//! a load factor into a buffer size, computes the growth threshold that
//! keeps at least one slot permanently free (linear probing relies on that
//! free slot to terminate probe scans), and sizes the next buffer on
//! growth.

use core::fmt;

/// Smallest buffer ever allocated. Keeps `release` from degenerating into
/// a zero-capacity special case.
pub const MIN_BUFFER_SIZE: usize = 4;

/// Largest representable power-of-two buffer size. Growth past this point
/// reports [`CapacityError`].
pub const MAX_BUFFER_SIZE: usize = 1 << (usize::BITS - 2);

/// Default expected element count for tables built with `new`.
pub(crate) const DEFAULT_EXPECTED_ELEMENTS: usize = 4;

/// Default load factor for the linear-probing family.
pub(crate) const DEFAULT_LOAD_FACTOR: f64 = 0.75;

/// Planning load factor for the displacement-chain family. The worm table
/// grows on placement failure rather than at a hard threshold, so this is
/// only used to size buffers for an expected element count.
pub(crate) const WORM_LOAD_FACTOR: f64 = 0.9;

/// Inclusive bounds accepted by [`check_load_factor`].
pub const MIN_LOAD_FACTOR: f64 = 0.01;
/// See [`MIN_LOAD_FACTOR`].
pub const MAX_LOAD_FACTOR: f64 = 0.99;

/// The single recoverable error of this crate: a table cannot grow because
/// the required buffer would exceed [`MAX_BUFFER_SIZE`].
///
/// The table that reported this error is left exactly as it was before the
/// failed operation (buffers are allocated before any state is committed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityError {
    /// Number of elements the failed operation tried to make room for.
    pub expected: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot allocate a hash buffer for {} elements (maximum buffer size is {})",
            self.expected, MAX_BUFFER_SIZE
        )
    }
}

impl core::error::Error for CapacityError {}

/// Validates a load factor, panicking outside `[0.01, 0.99]`.
///
/// An out-of-range load factor is a programmer error, not a recoverable
/// condition, so this follows the same policy as out-of-bounds indexing.
pub(crate) fn check_load_factor(load_factor: f64) -> f64 {
    assert!(
        (MIN_LOAD_FACTOR..=MAX_LOAD_FACTOR).contains(&load_factor),
        "load factor must be within [{MIN_LOAD_FACTOR}, {MAX_LOAD_FACTOR}], got {load_factor}"
    );
    load_factor
}

/// Returns the smallest power-of-two buffer size that can hold `expected`
/// elements at `load_factor` while leaving at least one slot free.
pub(crate) fn min_buffer_size(expected: usize, load_factor: f64) -> Result<usize, CapacityError> {
    // Strictly more slots than occupied entries, so ceil and then reject
    // the exact-fit case.
    let mut length = ceil_usize(expected as f64 / load_factor);
    if length == expected {
        length += 1;
    }
    if length > MAX_BUFFER_SIZE {
        return Err(CapacityError { expected });
    }
    Ok(length.next_power_of_two().max(MIN_BUFFER_SIZE))
}

/// Number of assigned slots at which a buffer of `buffer_size` slots must
/// grow. Capped at `buffer_size - 1` so one slot stays permanently free.
pub(crate) fn expand_at(buffer_size: usize, load_factor: f64) -> usize {
    usize::min(buffer_size - 1, ceil_usize(buffer_size as f64 * load_factor))
}

/// Doubles a buffer size, reporting [`CapacityError`] at the maximum.
pub(crate) fn next_buffer_size(buffer_size: usize) -> Result<usize, CapacityError> {
    debug_assert!(buffer_size.is_power_of_two());
    if buffer_size == MAX_BUFFER_SIZE {
        return Err(CapacityError {
            expected: buffer_size,
        });
    }
    Ok(buffer_size << 1)
}

/// `f64::ceil` without the std math intrinsics, so the crate stays no_std.
#[inline]
fn ceil_usize(value: f64) -> usize {
    let truncated = value as usize;
    if value > truncated as f64 {
        truncated + 1
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_buffer_size_rounds_up() {
        assert_eq!(min_buffer_size(0, 0.75).unwrap(), MIN_BUFFER_SIZE);
        assert_eq!(min_buffer_size(4, 0.75).unwrap(), 8);
        assert_eq!(min_buffer_size(6, 0.75).unwrap(), 8);
        assert_eq!(min_buffer_size(7, 0.75).unwrap(), 16);
        assert_eq!(min_buffer_size(1000, 0.9).unwrap(), 2048);
    }

    #[test]
    fn test_min_buffer_size_never_exact_fit() {
        // More slots than elements even at the loosest load factor.
        let size = min_buffer_size(4, 0.99).unwrap();
        assert!(size > 4);
        assert_eq!(min_buffer_size(0, 0.99).unwrap(), MIN_BUFFER_SIZE);
    }

    #[test]
    fn test_min_buffer_size_overflows() {
        assert!(min_buffer_size(usize::MAX / 2, 0.5).is_err());
    }

    #[test]
    fn test_expand_at_leaves_a_free_slot() {
        for shift in 2..16 {
            let size = 1usize << shift;
            assert!(expand_at(size, 0.99) < size);
            assert!(expand_at(size, 0.01) >= 1);
        }
        assert_eq!(expand_at(8, 0.75), 6);
        assert_eq!(expand_at(4, 0.99), 3);
    }

    #[test]
    fn test_next_buffer_size() {
        assert_eq!(next_buffer_size(8).unwrap(), 16);
        assert!(next_buffer_size(MAX_BUFFER_SIZE).is_err());
    }

    #[test]
    #[should_panic(expected = "load factor")]
    fn test_load_factor_out_of_range() {
        check_load_factor(0.995);
    }

    #[test]
    fn test_capacity_error_display() {
        let err = CapacityError { expected: 42 };
        assert!(std::format!("{err}").contains("42"));
    }
}
