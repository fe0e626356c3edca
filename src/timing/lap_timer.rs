use std::time::Duration;

use super::{CrossingEvent, DNF_SENTINEL, LANE_COUNT, LapClassification, LapEvent, RoundConfig};

/// Stopwatch state for one logical lane: the timestamp of the last crossing,
/// or `None` while no interval is open.
#[derive(Clone, Copy, Debug, Default)]
struct LaneState {
    last_crossing_ms: Option<u64>,
}

/// Per-lane lap stopwatch.
///
/// The sensors cannot tell a car completing a lap from a car passing the
/// gate for the first time, so the first crossing on each lane only arms
/// the stopwatch: N crossings produce N - 1 laps. Each later crossing
/// closes the open interval and immediately opens the next one, leaving no
/// gap between laps.
pub struct LapTimer {
    time_threshold: Duration,
    lanes: [LaneState; LANE_COUNT],
}

impl LapTimer {
    pub fn new(config: &RoundConfig) -> Self {
        Self {
            time_threshold: config.time_threshold,
            lanes: [LaneState::default(); LANE_COUNT],
        }
    }

    /// Register a mapped crossing on a logical lane.
    ///
    /// Returns the completed lap, or `None` when the crossing only armed the
    /// lane. `lane` must come from [super::lane_for_sensor].
    pub fn on_crossing(&mut self, lane: usize, crossing: &CrossingEvent) -> Option<LapEvent> {
        let started_ms = self.lanes[lane]
            .last_crossing_ms
            .replace(crossing.timestamp_ms)?;

        let duration = Duration::from_millis(crossing.timestamp_ms.saturating_sub(started_ms));
        Some(LapEvent {
            lane,
            duration,
            classification: self.classify(duration),
        })
    }

    /// Manual disqualification: close whatever interval is open on the lane
    /// and report it as a DNF lap carrying the sentinel duration. The lane
    /// goes back to idle, the disqualified car is no longer being timed.
    pub fn force_dnf(&mut self, lane: usize) -> LapEvent {
        self.lanes[lane].last_crossing_ms = None;
        LapEvent {
            lane,
            duration: DNF_SENTINEL,
            classification: LapClassification::Dnf,
        }
    }

    fn classify(&self, duration: Duration) -> LapClassification {
        if duration >= DNF_SENTINEL {
            LapClassification::Dnf
        } else if duration > self.time_threshold {
            LapClassification::OverThreshold
        } else {
            LapClassification::Valid
        }
    }

    /// Whether the lane has an open interval, for live display.
    pub fn is_timing(&self, lane: usize) -> bool {
        self.lanes
            .get(lane)
            .is_some_and(|state| state.last_crossing_ms.is_some())
    }

    /// Return every lane to idle for the next round.
    pub fn reset(&mut self) {
        self.lanes = [LaneState::default(); LANE_COUNT];
    }
}
