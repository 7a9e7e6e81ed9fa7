use serde::{Deserialize, Serialize};

// length of one cursor blink in milliseconds, visible for the first half
pub const FLICKER_PERIOD: f64 = 1000.0;

/// Turns requestAnimationFrame timestamps into per frame deltas
///
/// ┌──────────── tick(timestamp) ────────────┐
/// │ 1st frame : seed last, no delta (None)  │
/// │ nth frame : delta = now - last          │
/// └─────────────────────────────────────────┘
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameClock {
    last_timestamp: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        FrameClock::default()
    }

    /// Returns the milliseconds since the previous tick
    /// - the inaugural tick only seeds the clock
    /// - a timestamp running backwards yields 0.0 instead of a negative delta
    pub fn tick(&mut self, timestamp: f64) -> Option<f64> {
        let delta = self
            .last_timestamp
            .map(|last| (timestamp - last).max(0.0));
        self.last_timestamp = Some(timestamp);
        delta
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }
}

/// Whether blink time keeps running while the canvas is unfocused
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlickerPolicy {
    #[default]
    Always,
    WhileFocused,
}

impl FlickerPolicy {
    pub fn advances(&self, focused: bool) -> bool {
        match self {
            FlickerPolicy::Always => true,
            FlickerPolicy::WhileFocused => focused,
        }
    }
}

/// Square wave: on for the first half of every period
pub fn cursor_visible(accumulator: f64) -> bool {
    accumulator % FLICKER_PERIOD < FLICKER_PERIOD / 2.0
}
