use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::ChicaneError;

use super::{DNF_SENTINEL, LANE_COUNT, LapClassification, LapEvent, RoundConfig};

/// Scoring state for one lane over one round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CarResult {
    /// Roster index of the player racing this lane. `None` marks an empty
    /// lane (the wire-level -1): every event on it is dropped.
    pub player_id: Option<usize>,
    /// Classified laps seen so far, whatever their classification.
    pub lap_count: u32,
    /// Running total for the round, pinned to the DNF sentinel once the car
    /// is out.
    pub current_time: Duration,
    /// Best single valid lap.
    pub best_time: Option<Duration>,
    /// Sticky disqualification flag. One DNF lap sets it for the round.
    pub out_of_bounds: bool,
}

impl CarResult {
    fn new(player_id: Option<usize>) -> Self {
        Self {
            player_id,
            lap_count: 0,
            current_time: Duration::ZERO,
            best_time: None,
            out_of_bounds: false,
        }
    }

    pub fn is_empty_lane(&self) -> bool {
        self.player_id.is_none()
    }

    /// The wire-level DNF test: disqualified, or the round total pinned to
    /// the sentinel.
    pub fn is_dnf(&self) -> bool {
        self.out_of_bounds || self.current_time >= DNF_SENTINEL
    }
}

/// A frozen round, lane order preserved.
pub type RoundResult = Vec<CarResult>;

/// A frozen round keyed the way the tournament bracket stores it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    pub manche_index: usize,
    pub round_index: usize,
    pub cars: RoundResult,
}

/// Accumulates lap events for the active round and decides completion.
///
/// Completion is half event-driven, half operator-driven: the scorer checks
/// the required lap count after every event, and [RoundScorer::force_complete]
/// covers the manual stop and the round timeout. Both paths converge on the
/// same freeze routine, so completing twice yields the identical result.
pub struct RoundScorer {
    config: RoundConfig,
    cars: Vec<CarResult>,
    frozen: Option<RoundResult>,
}

impl RoundScorer {
    pub fn new(config: RoundConfig, players: [Option<usize>; LANE_COUNT]) -> Self {
        Self {
            config,
            cars: players.iter().map(|p| CarResult::new(*p)).collect(),
            frozen: None,
        }
    }

    /// Score one lap event.
    ///
    /// Returns the frozen result when this event completes the round.
    /// Events on empty lanes are dropped; events after the freeze fail with
    /// [ChicaneError::RoundClosed].
    pub fn on_lap_event(&mut self, event: &LapEvent) -> Result<Option<RoundResult>, ChicaneError> {
        if self.frozen.is_some() {
            return Err(ChicaneError::RoundClosed);
        }

        if self.cars[event.lane].is_empty_lane() {
            debug!("dropping lap on empty lane {}", event.lane);
            return Ok(None);
        }
        if event.classification == LapClassification::Valid {
            self.check_lap_speed(event);
        }

        let car = &mut self.cars[event.lane];
        car.lap_count += 1;
        match event.classification {
            LapClassification::Valid => {
                if !car.out_of_bounds {
                    car.current_time += event.duration;
                }
                if car.best_time.is_none_or(|best| event.duration < best) {
                    car.best_time = Some(event.duration);
                }
            }
            LapClassification::OverThreshold => {
                if !car.out_of_bounds {
                    car.current_time += event.duration;
                }
            }
            LapClassification::Dnf => {
                car.out_of_bounds = true;
                car.current_time = DNF_SENTINEL;
            }
        }

        Ok(self.check_complete())
    }

    /// Operator stop or round timeout: freeze the round as it stands.
    /// Idempotent, repeated calls return the same frozen result.
    pub fn force_complete(&mut self) -> RoundResult {
        self.freeze()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Abandon whatever happened so far and rearm for the next round with a
    /// fresh lane binding. Nothing is emitted.
    pub fn reset(&mut self, players: [Option<usize>; LANE_COUNT]) {
        self.cars = players.iter().map(|p| CarResult::new(*p)).collect();
        self.frozen = None;
    }

    /// Current per-lane state, for live display.
    pub fn cars(&self) -> &[CarResult] {
        &self.cars
    }

    fn check_complete(&mut self) -> Option<RoundResult> {
        let racing: Vec<&CarResult> = self.cars.iter().filter(|c| !c.is_empty_lane()).collect();
        if racing.is_empty() {
            return None;
        }
        if racing
            .iter()
            .all(|c| c.lap_count >= self.config.required_laps)
        {
            info!(
                "all lanes reached {} laps, round complete",
                self.config.required_laps
            );
            return Some(self.freeze());
        }
        None
    }

    fn freeze(&mut self) -> RoundResult {
        self.frozen.get_or_insert_with(|| self.cars.clone()).clone()
    }

    // A valid lap far quicker than the track allows is almost always the
    // sensor seeing one car twice.
    fn check_lap_speed(&self, event: &LapEvent) {
        if self.config.lane_length_m <= 0. || self.config.speed_threshold <= 0. {
            return;
        }
        let speed = self.config.lane_length_m / event.duration.as_secs_f64();
        if speed > self.config.speed_threshold {
            warn!(
                "lane {} lap of {:?} implies {:.2} m/s (limit {:.2}), suspected sensor bounce",
                event.lane, event.duration, speed, self.config.speed_threshold
            );
        }
    }
}
