//! Tick sequence generation
//!
//! Maps a countdown length onto the remaining-time marks at which the display
//! updates: every configured threshold that fits inside the countdown, in seconds
//! near the end and whole minutes further out.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CountdownError};

/// Display unit of a tick label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
}

impl Units {
    pub fn suffix(self) -> &'static str {
        match self {
            Units::Seconds => "s",
            Units::Minutes => "m",
        }
    }
}

/// One display update: fires when `time` seconds remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickDescriptor {
    pub time: u64,
    pub label: u64,
    pub units: Units,
}

impl TickDescriptor {
    fn seconds(time: u64) -> Self {
        Self {
            time,
            label: time,
            units: Units::Seconds,
        }
    }

    fn minutes(minutes: u64) -> Self {
        Self {
            time: minutes * 60,
            label: minutes,
            units: Units::Minutes,
        }
    }
}

/// Strictly increasing remaining-time marks, starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSet(Vec<u64>);

impl ThresholdSet {
    pub fn new(marks: Vec<u64>) -> Result<Self, ConfigError> {
        match marks.first() {
            None => return Err(ConfigError::InvalidThresholds("no thresholds configured")),
            Some(&first) if first != 0 => {
                return Err(ConfigError::InvalidThresholds("thresholds must start at 0"));
            }
            Some(_) => {}
        }
        if marks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::InvalidThresholds(
                "thresholds must be strictly increasing",
            ));
        }
        // Minute marks are taken in seconds as `t * 60`
        if marks.iter().any(|t| t.checked_mul(60).is_none()) {
            return Err(ConfigError::InvalidThresholds(
                "threshold too large to count as minutes",
            ));
        }
        Ok(Self(marks))
    }

    pub fn marks(&self) -> &[u64] {
        &self.0
    }

    fn max(&self) -> u64 {
        // Non-empty by construction
        self.0.last().copied().unwrap_or(0)
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self(vec![
            0, 1, 2, 3, 4, 5, 10, 15, 20, 30, 45, 60, 75, 90, 120, 150, 180, 240, 300, 360,
        ])
    }
}

pub const DEFAULT_SWITCH_TO_SECONDS: u64 = 90;

/// Computes tick sequences for a fixed threshold set and unit switch point.
#[derive(Debug, Clone)]
pub struct TickSequenceGenerator {
    thresholds: ThresholdSet,
    switch_to_seconds: u64,
}

impl Default for TickSequenceGenerator {
    fn default() -> Self {
        Self::new(ThresholdSet::default(), DEFAULT_SWITCH_TO_SECONDS)
    }
}

impl TickSequenceGenerator {
    pub fn new(thresholds: ThresholdSet, switch_to_seconds: u64) -> Self {
        Self {
            thresholds,
            switch_to_seconds,
        }
    }

    pub fn switch_to_seconds(&self) -> u64 {
        self.switch_to_seconds
    }

    /// Ticks for a countdown of `total` seconds, ordered by descending `time`.
    ///
    /// The first tick fires at `total` and the last at 0. Ticks above the switch
    /// point are labelled in ceiling-rounded minutes, the rest in seconds.
    pub fn generate(&self, total: u64) -> Result<Vec<TickDescriptor>, CountdownError> {
        if total == 0 {
            return Err(CountdownError::invalid_duration(
                "0",
                "countdown must be longer than zero seconds",
            ));
        }

        let switch = self.switch_to_seconds;
        let marks = self.thresholds.marks();

        let capped = total.min(switch);
        let mut ticks: Vec<TickDescriptor> = marks
            .iter()
            .filter(|&&t| t <= capped)
            .map(|&t| TickDescriptor::seconds(t))
            .collect();

        if total > switch {
            // A minute mark must land above the switch point and inside the countdown
            let max_minutes = self.thresholds.max().min(total.div_ceil(60));
            ticks.extend(
                marks
                    .iter()
                    .filter(|&&t| t * 60 > switch && t <= max_minutes && t * 60 <= total)
                    .map(|&t| TickDescriptor::minutes(t)),
            );
        }

        ticks.reverse();

        if ticks.first().map(|t| t.time) != Some(total) {
            ticks.insert(0, self.start_tick(total));
        }

        Ok(ticks)
    }

    fn start_tick(&self, total: u64) -> TickDescriptor {
        if total > self.switch_to_seconds {
            TickDescriptor {
                time: total,
                label: total.div_ceil(60),
                units: Units::Minutes,
            }
        } else {
            TickDescriptor::seconds(total)
        }
    }
}
