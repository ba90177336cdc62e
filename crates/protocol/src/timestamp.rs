//! DLT timestamps: 0.1 ms ticks since a process-wide origin.
//!
//! The 32-bit field wraps after roughly 4.97 days, as in the DLT standard
//! header.

use std::sync::OnceLock;
use std::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// The instant all timestamps are measured from (first use in the process).
pub fn origin() -> Instant {
    *ORIGIN.get_or_init(Instant::now)
}

/// Current DLT timestamp.
pub fn now() -> u32 {
    ticks_between(origin(), Instant::now())
}

/// 0.1 ms ticks from `origin` to `at`, wrapped to 32 bits.
///
/// Instants before `origin` map to 0.
pub fn ticks_between(origin: Instant, at: Instant) -> u32 {
    let ticks = at.saturating_duration_since(origin).as_micros() / 100;
    (ticks & u128::from(u32::MAX)) as u32
}
