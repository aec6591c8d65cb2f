//! Wall-clock to sample-offset mapping for a single audio block.

use crate::Time;

/// Where a wall-clock deadline falls relative to the block currently being
/// processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Deadline falls within the current block, at this sample offset.
    WithinBlock(u32),
    /// Deadline already passed before the current block started, or falls
    /// before the next block even begins; delivered at offset 0 of the
    /// current block per the late-delivery policy.
    Late,
    /// Deadline falls at or after the block following the current one.
    Future,
}

/// Rounds `numerator / denominator` to the nearest integer instead of
/// flooring, matching spec's `round(...)` rather than C-style truncation.
/// Both arguments are non-negative at every call site in this module.
const fn round_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator / 2) / denominator
}

/// Maps wall-clock [`Time`] to sample offsets within the block the engine
/// is currently producing, and back.
///
/// One `EventTimer` is owned by the engine core and advanced once per
/// block via [`EventTimer::advance_block`]. It holds no allocations and
/// performs only integer arithmetic, so it is safe to touch from the
/// audio thread.
#[derive(Debug, Clone, Copy)]
pub struct EventTimer {
    sample_rate: u32,
    block_size: u32,
    block_start: Time,
}

impl EventTimer {
    /// Builds a timer for the given sample rate and block size, with the
    /// current block starting at `block_start`.
    #[must_use]
    pub const fn new(sample_rate: u32, block_size: u32, block_start: Time) -> Self {
        Self {
            sample_rate,
            block_size,
            block_start,
        }
    }

    /// Wall-clock time at which the current block started.
    #[must_use]
    pub const fn block_start(&self) -> Time {
        self.block_start
    }

    /// Duration of one block, in microseconds.
    #[must_use]
    pub fn block_duration_micros(&self) -> i64 {
        (i64::from(self.block_size) * 1_000_000) / i64::from(self.sample_rate)
    }

    /// Converts a sample offset within the current block to wall-clock
    /// time.
    #[must_use]
    pub fn time_at_offset(&self, sample_offset: u32) -> Time {
        let micros = (i64::from(sample_offset) * 1_000_000) / i64::from(self.sample_rate);
        self.block_start.plus_micros(micros)
    }

    /// Classifies `deadline` against the current block and, when it falls
    /// within the block, returns its sample offset.
    #[must_use]
    pub fn schedule(&self, deadline: Time) -> Schedule {
        let delta = deadline.micros_since(self.block_start);
        if delta < 0 {
            return Schedule::Late;
        }
        let block_duration = self.block_duration_micros();
        if delta >= block_duration {
            return Schedule::Future;
        }
        let offset = round_div(delta * i64::from(self.sample_rate), 1_000_000);
        Schedule::WithinBlock(offset.min(i64::from(self.block_size.saturating_sub(1))) as u32)
    }

    /// Advances the timer to the next block, whose start is `block_start`
    /// microseconds ahead of the current one by construction of the
    /// caller's clock (normally `self.block_start + block_duration`, but
    /// passed explicitly so a drifting hardware clock can resync it).
    pub fn advance_block(&mut self, block_start: Time) {
        self.block_start = block_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> EventTimer {
        EventTimer::new(48_000, 512, Time::from_micros(0))
    }

    #[test]
    fn offset_zero_maps_to_block_start() {
        let t = timer();
        assert_eq!(t.time_at_offset(0), t.block_start());
    }

    #[test]
    fn schedule_within_block_round_trips_offset() {
        let t = timer();
        let deadline = t.time_at_offset(256);
        assert_eq!(t.schedule(deadline), Schedule::WithinBlock(256));
    }

    #[test]
    fn schedule_before_block_start_is_late() {
        let t = timer();
        let deadline = t.block_start().plus_micros(-10);
        assert_eq!(t.schedule(deadline), Schedule::Late);
    }

    #[test]
    fn schedule_past_block_end_is_future() {
        let t = timer();
        let deadline = t.block_start().plus_micros(t.block_duration_micros() + 1);
        assert_eq!(t.schedule(deadline), Schedule::Future);
    }

    #[test]
    fn advance_block_moves_the_window() {
        let mut t = timer();
        let next_start = t.block_start().plus_micros(t.block_duration_micros());
        t.advance_block(next_start);
        assert_eq!(t.block_start(), next_start);
    }

    proptest::proptest! {
        #[test]
        fn within_block_offsets_never_exceed_block_size(offset in 0u32..512) {
            let t = timer();
            let deadline = t.time_at_offset(offset);
            match t.schedule(deadline) {
                Schedule::WithinBlock(o) => assert!(o < 512),
                other => panic!("expected WithinBlock, got {other:?}"),
            }
        }
    }
}
