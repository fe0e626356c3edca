pub(crate) mod collector;
pub(crate) mod debounce;
pub(crate) mod lanes;
pub(crate) mod lap_timer;
pub(crate) mod scorer;
pub(crate) mod source;

use std::time::Duration;

pub use collector::run_round;
pub use debounce::SensorDebouncer;
pub use lanes::lane_for_sensor;
pub use lap_timer::LapTimer;
pub use scorer::{CarResult, RoundRecord, RoundResult, RoundScorer};
pub use source::{ReplaySampleSource, SampleSource, SourceEvent};

use serde::{Deserialize, Serialize};

/// Number of physical sensors, which is also the number of racing lanes.
pub const LANE_COUNT: usize = 3;

/// Sentinel for a lap that was never completed. A duration at or beyond this
/// value, a manual disqualification, and the wire-level DNF check all use it.
pub const DNF_SENTINEL_MS: u64 = 99999;

/// [DNF_SENTINEL_MS] as a [Duration].
pub const DNF_SENTINEL: Duration = Duration::from_millis(DNF_SENTINEL_MS);

/// One raw reading from a lane photo-sensor.
///
/// `level` is high while the beam is intact and drops to low while a car is
/// breaking it. Samples arrive at the board's sampling interval on a
/// monotonic, session-relative millisecond clock.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SensorSample {
    /// Physical sensor id, 1 to [LANE_COUNT].
    pub sensor: u8,
    pub level: bool,
    pub timestamp_ms: u64,
}

/// A debounced beam-break: the falling edge of one sensor's level stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrossingEvent {
    pub sensor: u8,
    pub timestamp_ms: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LapClassification {
    Valid,
    /// Slower than the round's time threshold.
    OverThreshold,
    /// Did not finish: sentinel duration or manual disqualification.
    Dnf,
}

/// A completed lap on a logical lane, ready for scoring.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LapEvent {
    /// Logical lane, 0 to [LANE_COUNT] - 1. Direction-independent.
    pub lane: usize,
    pub duration: Duration,
    pub classification: LapClassification,
}

/// Policy for one round. Read once at round start and immutable after that.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundConfig {
    /// Track laid out to run in the reverse direction.
    pub reversed: bool,
    /// Laps slower than this are classified [LapClassification::OverThreshold].
    pub time_threshold: Duration,
    /// Valid laps implying a speed above this many m/s are logged as
    /// suspected sensor bounces. Classification is unaffected.
    pub speed_threshold: f64,
    /// Length of one lane circuit in meters. 0 disables the speed check.
    pub lane_length_m: f64,
    /// Classified laps each non-empty lane needs before the round
    /// completes on its own.
    pub required_laps: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            reversed: false,
            time_threshold: Duration::from_secs(5),
            speed_threshold: 15.,
            lane_length_m: 0.,
            required_laps: 3,
        }
    }
}

/// Everything the collector publishes while a round runs.
///
/// The live feed consumes all of it; the session writer persists the same
/// stream as JSON lines.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TimingOutput {
    Sample(SensorSample),
    Lap(LapEvent),
    RoundComplete(RoundRecord),
    RoundAborted,
}
