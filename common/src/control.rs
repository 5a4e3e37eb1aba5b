use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::RelayState;

pub const TICK_DURATION: Duration = Duration::from_secs(60);

/// Heating is wanted iff the set-point is above the room temperature rounded to
/// the nearest whole degree, halves to even. Equality keeps the heating off.
pub fn relay_decision(set_point: f64, room_temperature: f64) -> RelayState {
    if set_point > room_temperature.round_ties_even() {
        RelayState::On
    } else {
        RelayState::Off
    }
}

/// A sample is due when the minute of the hour is a multiple of the interval.
/// `None` (recording disabled) never records.
pub fn should_record(minute_of_hour: u32, interval_minutes: Option<u32>) -> bool {
    match interval_minutes {
        Some(interval) if interval > 0 => minute_of_hour % interval == 0,
        _ => false,
    }
}

/// Time left until the minute boundary that follows `tick_started`.
///
/// Saturates at zero when the tick has already run past that boundary, so an
/// overrun never pushes later ticks off the minute grid.
pub fn until_next_minute(tick_started: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let started_ms = tick_started.timestamp_millis();
    let boundary_ms = started_ms - started_ms.rem_euclid(60_000) + 60_000;
    let remaining = boundary_ms - now.timestamp_millis();
    u64::try_from(remaining)
        .map(Duration::from_millis)
        .unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DwellCounter {
    seconds: u64,
}

impl DwellCounter {
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn accrue(&mut self, observed: RelayState, tick: Duration) {
        if observed.is_on() {
            self.seconds = self.seconds.saturating_add(tick.as_secs());
        }
    }

    pub fn reset(&mut self) {
        self.seconds = 0;
    }
}
