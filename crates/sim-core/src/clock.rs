//! Simulation clock: discrete minutes within numbered days.
//!
//! The clock never rolls a day over on its own. `advance` saturates at the
//! end of the day and the host triggers the day-boundary pipeline before
//! calling `start_next_day`, so decay, market steps, and financial close
//! always run in their fixed order.

use serde::{Deserialize, Serialize};

/// Minutes in a simulated day.
pub const MINUTES_PER_DAY: u32 = 1440;
/// Shop opens at 6:00.
pub const OPENING_MINUTE: u32 = 6 * 60;
/// Shop closes at 20:00; arrivals stop after this.
pub const CLOSING_MINUTE: u32 = 20 * 60;

const DAYS_PER_SEASON: u32 = 90;

/// Four-season cycle derived from the day counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

/// Day/minute clock advanced in discrete minute increments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    day: u32,
    minute_of_day: u32,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Start of day 1 at opening time.
    pub fn new() -> Self {
        Self {
            day: 1,
            minute_of_day: OPENING_MINUTE,
        }
    }

    /// Current day, starting at 1.
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Minutes elapsed since midnight.
    pub fn minute_of_day(&self) -> u32 {
        self.minute_of_day
    }

    /// Hour component in [0, 24).
    pub fn hour(&self) -> u32 {
        self.minute_of_day / 60
    }

    /// Minute component in [0, 60).
    pub fn minute(&self) -> u32 {
        self.minute_of_day % 60
    }

    /// Whether the current day has run out of minutes.
    pub fn day_over(&self) -> bool {
        self.minute_of_day >= MINUTES_PER_DAY
    }

    /// Advance up to `minutes`, stopping at the end of the day.
    /// Returns the minutes actually consumed (0 once the day is over).
    pub fn advance(&mut self, minutes: u32) -> u32 {
        let remaining = MINUTES_PER_DAY.saturating_sub(self.minute_of_day);
        let step = minutes.min(remaining);
        self.minute_of_day += step;
        step
    }

    /// Roll to the next day at opening time.
    pub fn start_next_day(&mut self) {
        self.day += 1;
        self.minute_of_day = OPENING_MINUTE;
    }

    /// Season for the current day.
    pub fn season(&self) -> Season {
        season_for_day(self.day)
    }
}

/// Season for an arbitrary day counter (90-day seasons, spring first).
pub fn season_for_day(day: u32) -> Season {
    match (day.saturating_sub(1) / DAYS_PER_SEASON) % 4 {
        0 => Season::Spring,
        1 => Season::Summer,
        2 => Season::Autumn,
        _ => Season::Winter,
    }
}
