// Time-control arithmetic for one game. No I/O.
//
// Each side has a main-time budget. When a move is committed, the think time
// is taken from main time first; whatever is left over must fit inside the
// per-move grace, which is the byoyomi plus that side's increment. A move
// that exceeds the grace is a time loss and earns no increment. Otherwise
// the increment is added to main time.
//
// In practice a match is configured with byoyomi (increments zero) or with
// increments (byoyomi zero). All values are whole milliseconds, and every
// move costs at least 1 ms.

use std::time::Instant;

use usi_arena_protocol::{Color, TimeControl};

/// Result of settling one move against the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Total think time charged for the move.
    pub elapsed_ms: u64,
    /// The part of `elapsed_ms` taken from main time.
    pub consumed_from_main: u64,
    /// The move ran past the grace period: the side loses on time.
    pub over_byoyomi: bool,
}

#[derive(Clone, Debug)]
pub struct Clock {
    remaining: [u64; 2],
    byoyomi: u64,
    increment: [u64; 2],
    turn_started: Option<(Color, Instant)>,
}

impl Clock {
    pub fn new(time: &TimeControl) -> Self {
        Self {
            remaining: [time.btime, time.wtime],
            byoyomi: time.byoyomi,
            increment: [time.binc, time.winc],
            turn_started: None,
        }
    }

    /// Mark the start of `color`'s think.
    pub fn start_turn(&mut self, color: Color, now: Instant) {
        self.turn_started = Some((color, now));
    }

    /// Charge `color` for the time since `start_turn`.
    pub fn settle_turn(&mut self, color: Color, now: Instant) -> Settlement {
        let elapsed = match self.turn_started.take() {
            Some((_, started)) => {
                let ms = now.saturating_duration_since(started).as_millis();
                u64::try_from(ms).unwrap_or(u64::MAX)
            }
            None => 0,
        };
        self.settle_elapsed(color, elapsed)
    }

    /// Charge `color` for `elapsed_ms` of think time.
    pub fn settle_elapsed(&mut self, color: Color, elapsed_ms: u64) -> Settlement {
        let elapsed_ms = elapsed_ms.max(1);
        let side = color.index();

        let consumed = self.remaining[side].min(elapsed_ms);
        self.remaining[side] -= consumed;
        let overflow = elapsed_ms - consumed;

        let grace = self.byoyomi.saturating_add(self.increment[side]);
        let over_byoyomi = overflow > grace;
        if !over_byoyomi {
            self.remaining[side] = self.remaining[side].saturating_add(self.increment[side]);
        }

        Settlement {
            elapsed_ms,
            consumed_from_main: consumed,
            over_byoyomi,
        }
    }

    pub fn remaining(&self, color: Color) -> u64 {
        self.remaining[color.index()]
    }

    /// The side whose think is currently being timed, if any.
    pub fn running_for(&self) -> Option<Color> {
        self.turn_started.map(|(color, _)| color)
    }

    /// Snapshot for `nextmove` and viewers.
    pub fn time_control(&self) -> TimeControl {
        TimeControl {
            btime: self.remaining[0],
            wtime: self.remaining[1],
            byoyomi: self.byoyomi,
            binc: self.increment[0],
            winc: self.increment[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn byoyomi_clock(main: u64, byoyomi: u64) -> Clock {
        Clock::new(&TimeControl {
            btime: main,
            wtime: main,
            byoyomi,
            binc: 0,
            winc: 0,
        })
    }

    #[test]
    fn overrun_past_byoyomi_with_no_main_time() {
        let mut clock = byoyomi_clock(0, 5_000);
        let s = clock.settle_elapsed(Color::Black, 6_000);
        assert!(s.over_byoyomi);
        assert_eq!(clock.remaining(Color::Black), 0);
    }

    #[test]
    fn think_inside_main_time_consumes_it() {
        let mut clock = byoyomi_clock(10_000, 5_000);
        let s = clock.settle_elapsed(Color::White, 3_000);
        assert!(!s.over_byoyomi);
        assert_eq!(s.consumed_from_main, 3_000);
        assert_eq!(clock.remaining(Color::White), 7_000);
        assert_eq!(clock.remaining(Color::Black), 10_000);
    }

    #[test]
    fn byoyomi_absorbs_overflow_exactly() {
        let mut clock = byoyomi_clock(1_000, 5_000);
        let s = clock.settle_elapsed(Color::Black, 6_000);
        assert!(!s.over_byoyomi);
        assert_eq!(clock.remaining(Color::Black), 0);

        let s = clock.settle_elapsed(Color::Black, 5_001);
        assert!(s.over_byoyomi);
    }

    #[test]
    fn increment_refills_empty_main_time() {
        let mut clock = Clock::new(&TimeControl {
            btime: 0,
            wtime: 0,
            byoyomi: 0,
            binc: 2_000,
            winc: 2_000,
        });
        let s = clock.settle_elapsed(Color::Black, 500);
        assert!(!s.over_byoyomi);
        assert_eq!(clock.remaining(Color::Black), 2_000);
    }

    #[test]
    fn increment_is_withheld_on_overrun() {
        let mut clock = Clock::new(&TimeControl {
            btime: 1_000,
            wtime: 1_000,
            byoyomi: 0,
            binc: 2_000,
            winc: 2_000,
        });
        let s = clock.settle_elapsed(Color::White, 3_001);
        assert!(s.over_byoyomi);
        assert_eq!(clock.remaining(Color::White), 0);
    }

    #[test]
    fn every_move_costs_at_least_one_ms() {
        let mut clock = byoyomi_clock(100, 0);
        let s = clock.settle_elapsed(Color::Black, 0);
        assert_eq!(s.elapsed_ms, 1);
        assert_eq!(clock.remaining(Color::Black), 99);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let mut clock = byoyomi_clock(2_500, 1_000);
        for elapsed in [700, 1_900, 3_000, 1, 10_000] {
            clock.settle_elapsed(Color::Black, elapsed);
            clock.settle_elapsed(Color::White, elapsed * 2);
            // u64 cannot go negative, but a wrapped subtraction would show
            // up as a huge value.
            assert!(clock.remaining(Color::Black) <= 2_500);
            assert!(clock.remaining(Color::White) <= 2_500);
        }
    }

    #[test]
    fn settle_turn_uses_wall_clock_since_start() {
        let mut clock = byoyomi_clock(10_000, 0);
        let t0 = Instant::now();
        clock.start_turn(Color::Black, t0);
        assert_eq!(clock.running_for(), Some(Color::Black));
        let s = clock.settle_turn(Color::Black, t0 + Duration::from_millis(1_234));
        assert_eq!(s.elapsed_ms, 1_234);
        assert_eq!(clock.remaining(Color::Black), 8_766);
        assert_eq!(clock.running_for(), None);
    }
}
