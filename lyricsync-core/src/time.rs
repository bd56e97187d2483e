//! Millisecond arithmetic shared by the parser, clock and karaoke estimator.
//!
//! Timeline positions are `u64` milliseconds everywhere in the engine. These
//! helpers keep the conversions saturating so out-of-range inputs clamp
//! instead of wrapping or panicking.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Shift a timestamp by a signed millisecond offset, clamping at zero.
#[must_use]
pub const fn apply_offset_ms(time_ms: u64, offset_ms: i64) -> u64 {
    if offset_ms >= 0 {
        time_ms.saturating_add(offset_ms.unsigned_abs())
    } else {
        time_ms.saturating_sub(offset_ms.unsigned_abs())
    }
}

/// Lossy conversion used for fill fractions and slice layout.
///
/// Song positions stay far below 2^52 ms, so the conversion is exact in practice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ms_to_f64(ms: u64) -> f64 {
    ms as f64
}
