//! Fixed-rate progress clock.
//!
//! Advances progress by one frame (`1 / total_frames`) per tick. When a play
//! reaches the end it wraps to 0.0 while repeats remain and otherwise stops at
//! 1.0. Time is fed in by the host (`advance(dt)`), so tests drive a virtual
//! clock. Once cancelled the clock never advances again.

use crate::config::BindingConfig;

/// Result of feeding time into the clock.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClockTick {
    /// Not enough time accumulated, clock idle, finished or cancelled.
    Idle,
    Advanced { progress: f64, ticks: u64 },
    /// A play finished and the next one restarted from 0.0.
    Wrapped { progress: f64, ticks: u64 },
    /// The last play finished. Progress stays at 1.0 until restarted.
    Ended { ticks: u64 },
}

impl ClockTick {
    #[inline]
    pub fn progress(&self) -> Option<f64> {
        match *self {
            Self::Idle => None,
            Self::Advanced { progress, .. } | Self::Wrapped { progress, .. } => Some(progress),
            Self::Ended { .. } => Some(1.0),
        }
    }

    #[inline]
    pub fn wrapped(&self) -> bool {
        matches!(self, Self::Wrapped { .. })
    }

    #[inline]
    pub fn ended(&self) -> bool {
        matches!(self, Self::Ended { .. })
    }
}

#[derive(Clone, Debug)]
pub struct ProgressClock {
    period: f64,
    total_frames: u64,
    accumulator: f64,
    plays_done: u32,
    finished: bool,
    cancelled: bool,
}

impl ProgressClock {
    /// Clock ticking at the config's (validated) rate.
    pub fn new(total_frames: u64, config: &BindingConfig) -> Self {
        Self {
            period: f64::from(config.tick_period()),
            total_frames,
            accumulator: 0.0,
            plays_done: 0,
            finished: false,
            cancelled: false,
        }
    }

    pub fn set_total_frames(&mut self, total_frames: u64) {
        self.total_frames = total_frames;
    }

    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Feed `dt` seconds starting from `progress`. `repeat_count <= 0` loops
    /// forever. At most one play boundary is crossed per call; time beyond
    /// that is dropped.
    pub fn advance(&mut self, dt: f32, progress: f64, repeat_count: i32) -> ClockTick {
        if self.cancelled || self.finished || self.total_frames == 0 {
            return ClockTick::Idle;
        }
        if !(dt.is_finite() && dt > 0.0) {
            return ClockTick::Idle;
        }
        self.accumulator += f64::from(dt);
        let due = (self.accumulator / self.period).floor();
        if due < 1.0 {
            return ClockTick::Idle;
        }
        self.accumulator %= self.period;

        let total = self.total_frames;
        let ticks = due.min(total as f64) as u64;
        let next = start_frame(progress, total) + ticks;
        if next < total {
            return ClockTick::Advanced {
                progress: next as f64 / total as f64,
                ticks,
            };
        }

        self.plays_done = self.plays_done.saturating_add(1);
        let infinite = repeat_count <= 0;
        if infinite || self.plays_done < repeat_count.unsigned_abs() {
            ClockTick::Wrapped {
                progress: (next - total) as f64 / total as f64,
                ticks,
            }
        } else {
            self.finished = true;
            self.accumulator = 0.0;
            ClockTick::Ended { ticks }
        }
    }

    /// Drop any partially accumulated tick.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Start counting plays again (new composition or play after a stop).
    pub fn restart(&mut self) {
        self.accumulator = 0.0;
        self.plays_done = 0;
        self.finished = false;
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.accumulator = 0.0;
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Frame the clock continues from. A finished position (1.0) starts over.
fn start_frame(progress: f64, total: u64) -> u64 {
    if !(progress.is_finite() && progress > 0.0) {
        return 0;
    }
    let frame = (progress * total as f64).round();
    if frame >= total as f64 {
        0
    } else {
        frame as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::REPEAT_INFINITE;

    const DT: f32 = 1.0 / 60.0;

    fn clock(total_frames: u64) -> ProgressClock {
        ProgressClock::new(total_frames, &BindingConfig::default())
    }

    #[test]
    fn one_tick_advances_one_frame() {
        let mut clock = clock(4);
        let t = clock.advance(DT, 0.0, REPEAT_INFINITE);
        assert_eq!(t, ClockTick::Advanced { progress: 0.25, ticks: 1 });
    }

    #[test]
    fn partial_ticks_accumulate() {
        let mut clock = clock(4);
        assert_eq!(clock.advance(DT / 2.0, 0.0, REPEAT_INFINITE), ClockTick::Idle);
        assert!(matches!(
            clock.advance(DT / 2.0 + 1e-6, 0.0, REPEAT_INFINITE),
            ClockTick::Advanced { ticks: 1, .. }
        ));
    }

    #[test]
    fn wraps_to_zero_at_one() {
        let mut clock = clock(4);
        let t = clock.advance(DT + 1e-6, 0.75, REPEAT_INFINITE);
        assert!(t.wrapped());
        assert_eq!(t.progress(), Some(0.0));
    }

    #[test]
    fn last_play_ends_at_one_and_stops() {
        let mut clock = clock(4);
        let t = clock.advance(DT, 0.75, 1);
        assert_eq!(t, ClockTick::Ended { ticks: 1 });
        assert!(clock.is_finished());
        assert_eq!(clock.advance(1.0, 1.0, 1), ClockTick::Idle);

        clock.restart();
        assert_eq!(
            clock.advance(DT, 1.0, 1),
            ClockTick::Advanced { progress: 0.25, ticks: 1 }
        );
    }

    #[test]
    fn finite_repeats_wrap_before_ending() {
        let mut clock = clock(2);
        assert!(clock.advance(DT, 0.5, 2).wrapped());
        assert!(clock.advance(DT, 0.0, 2).progress().is_some());
        assert!(clock.advance(DT, 0.5, 2).ended());
    }

    #[test]
    fn huge_dt_returns_after_at_most_one_wrap() {
        let mut clock = clock(174);
        let t = clock.advance(1.0e7, 0.0, REPEAT_INFINITE);
        assert_eq!(t, ClockTick::Wrapped { progress: 0.0, ticks: 174 });
        assert!(clock.advance(f32::MAX, 0.5, REPEAT_INFINITE).wrapped());
    }

    #[test]
    fn non_finite_dt_is_ignored() {
        let mut clock = clock(4);
        assert_eq!(clock.advance(f32::NAN, 0.0, REPEAT_INFINITE), ClockTick::Idle);
        assert_eq!(clock.advance(f32::INFINITY, 0.0, REPEAT_INFINITE), ClockTick::Idle);
        assert_eq!(clock.advance(-1.0, 0.0, REPEAT_INFINITE), ClockTick::Idle);
    }

    #[test]
    fn out_of_range_rate_falls_back_to_sixty_hz() {
        let config = BindingConfig {
            tick_hz: 1e30,
            ..BindingConfig::default()
        };
        let mut clock = ProgressClock::new(4, &config);
        assert_eq!(
            clock.advance(DT, 0.0, REPEAT_INFINITE),
            ClockTick::Advanced { progress: 0.25, ticks: 1 }
        );
    }

    #[test]
    fn cancelled_clock_is_idle() {
        let mut clock = clock(4);
        clock.cancel();
        assert!(clock.is_cancelled());
        assert_eq!(clock.advance(1.0, 0.0, REPEAT_INFINITE), ClockTick::Idle);
    }

    #[test]
    fn empty_composition_never_ticks() {
        let mut clock = clock(0);
        assert_eq!(clock.advance(1.0, 0.0, REPEAT_INFINITE), ClockTick::Idle);
    }
}
