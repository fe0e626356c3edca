use std::{collections::HashMap, time::Duration};

use log::{error, info};
use serde::Serialize;

use crate::{
    ChicaneError,
    timing::{CarResult, RoundRecord},
};

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// One car's line in the heat payload the scoreboard expects.
#[derive(Debug, Serialize, PartialEq)]
pub struct HeatEntry {
    pub car_name: String,
    /// Round total in seconds; `None` when the car did not finish.
    pub lap_time: Option<f64>,
    pub is_dnf: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HeatPayload {
    pub manche_number: usize,
    pub results: Vec<HeatEntry>,
}

/// Sequential 1-based heat number across all manches: every heat of every
/// manche gets a unique number in bracket order.
pub fn manche_number(manche_sizes: &[usize], manche_index: usize, round_index: usize) -> usize {
    manche_sizes.iter().take(manche_index).sum::<usize>() + round_index + 1
}

/// Derive per-manche heat counts from stored records, for resubmission runs
/// where the bracket structure is not at hand.
pub fn manche_sizes_from_records(records: &[RoundRecord]) -> Vec<usize> {
    let manche_count = records
        .iter()
        .map(|r| r.manche_index + 1)
        .max()
        .unwrap_or(0);
    let mut sizes = vec![0usize; manche_count];
    for record in records {
        let size = &mut sizes[record.manche_index];
        *size = (*size).max(record.round_index + 1);
    }
    sizes
}

/// Build the wire payload for one frozen round. Empty lanes are skipped
/// entirely; the scoreboard only hears about cars that raced.
pub fn heat_payload(
    record: &RoundRecord,
    roster: &[String],
    manche_sizes: &[usize],
) -> HeatPayload {
    HeatPayload {
        manche_number: manche_number(manche_sizes, record.manche_index, record.round_index),
        results: record
            .cars
            .iter()
            .filter_map(|car| heat_entry(car, roster))
            .collect(),
    }
}

fn heat_entry(car: &CarResult, roster: &[String]) -> Option<HeatEntry> {
    let player_id = car.player_id?;
    let is_dnf = car.is_dnf();
    Some(HeatEntry {
        car_name: roster
            .get(player_id)
            .cloned()
            .unwrap_or_else(|| format!("Car {}", player_id + 1)),
        lap_time: (!is_dnf).then(|| car.current_time.as_secs_f64()),
        is_dnf,
    })
}

/// Posts frozen rounds to the remote scoreboard.
///
/// The client remembers the last payload it successfully submitted per heat
/// and skips identical resubmissions. Failures are logged and returned to
/// the caller; the next explicit submission trigger is the only retry.
pub struct ScoreboardClient {
    base_url: String,
    tournament_code: String,
    http_client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    last_submitted: HashMap<(usize, usize), String>,
}

impl ScoreboardClient {
    pub fn new(base_url: &str, tournament_code: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build submission runtime");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tournament_code: tournament_code.to_string(),
            http_client,
            runtime,
            last_submitted: HashMap::new(),
        }
    }

    /// Submit one frozen round.
    ///
    /// Returns `true` when a POST went out, `false` when there was nothing
    /// to send (no racing cars, or an identical payload already submitted).
    pub fn submit_round(
        &mut self,
        record: &RoundRecord,
        roster: &[String],
        manche_sizes: &[usize],
    ) -> Result<bool, ChicaneError> {
        let payload = heat_payload(record, roster, manche_sizes);
        if payload.results.is_empty() {
            info!("heat {} has no results, skipping", payload.manche_number);
            return Ok(false);
        }

        let payload_json = serde_json::to_string(&payload).map_err(|e| {
            ChicaneError::SubmitSerializeError {
                manche_number: payload.manche_number,
                source: e,
            }
        })?;
        let key = (record.manche_index, record.round_index);
        if self.last_submitted.get(&key) == Some(&payload_json) {
            info!("heat {} unchanged, skipping", payload.manche_number);
            return Ok(false);
        }

        let url = format!(
            "{}/api/v1/public/tournament/{}/heats",
            self.base_url, self.tournament_code
        );
        info!("submitting heat {} to {}", payload.manche_number, url);

        let response = self
            .runtime
            .block_on(self.http_client.post(&url).json(&payload).send())
            .map_err(|e| {
                error!("failed to submit heat {}: {}", payload.manche_number, e);
                ChicaneError::SubmitError {
                    manche_number: payload.manche_number,
                    source: e,
                }
            })?;

        if !response.status().is_success() {
            error!(
                "scoreboard rejected heat {} with status {}",
                payload.manche_number,
                response.status()
            );
            return Err(ChicaneError::SubmitRejected {
                manche_number: payload.manche_number,
                status: response.status().as_u16(),
            });
        }

        info!("heat {} results submitted", payload.manche_number);
        self.last_submitted.insert(key, payload_json);
        Ok(true)
    }

    /// Submit every stored round, logging and skipping past failures so one
    /// bad heat does not block the rest. Returns the number of heats that
    /// actually went out.
    pub fn submit_all(
        &mut self,
        records: &[RoundRecord],
        roster: &[String],
        manche_sizes: &[usize],
    ) -> usize {
        let mut submitted = 0;
        for record in records {
            match self.submit_round(record, roster, manche_sizes) {
                Ok(true) => submitted += 1,
                Ok(false) => {}
                Err(e) => error!(
                    "skipping manche {} round {}: {}",
                    record.manche_index, record.round_index, e
                ),
            }
        }
        submitted
    }
}

#[cfg(test)]
mod tests {
    use crate::timing::DNF_SENTINEL;

    use super::*;

    fn roster() -> Vec<String> {
        vec!["Alice".to_string(), "Bob".to_string()]
    }

    fn finished_car(player_id: usize, total_ms: u64) -> CarResult {
        CarResult {
            player_id: Some(player_id),
            lap_count: 3,
            current_time: Duration::from_millis(total_ms),
            best_time: Some(Duration::from_millis(total_ms / 3)),
            out_of_bounds: false,
        }
    }

    fn empty_lane() -> CarResult {
        CarResult {
            player_id: None,
            lap_count: 0,
            current_time: Duration::ZERO,
            best_time: None,
            out_of_bounds: false,
        }
    }

    #[test]
    fn test_manche_number_is_sequential_across_manches() {
        let sizes = [2, 3, 2];
        assert_eq!(manche_number(&sizes, 0, 0), 1);
        assert_eq!(manche_number(&sizes, 0, 1), 2);
        assert_eq!(manche_number(&sizes, 1, 0), 3);
        assert_eq!(manche_number(&sizes, 2, 1), 7);
        // no bracket structure at hand: numbering within the first manche
        assert_eq!(manche_number(&[], 0, 2), 3);
    }

    #[test]
    fn test_manche_sizes_from_records() {
        let records = vec![
            RoundRecord {
                manche_index: 0,
                round_index: 1,
                cars: vec![finished_car(0, 3600)],
            },
            RoundRecord {
                manche_index: 2,
                round_index: 0,
                cars: vec![finished_car(1, 3700)],
            },
        ];
        assert_eq!(manche_sizes_from_records(&records), vec![2, 0, 1]);
        assert_eq!(manche_sizes_from_records(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_payload_skips_empty_lanes() {
        let record = RoundRecord {
            manche_index: 0,
            round_index: 0,
            cars: vec![finished_car(0, 3600), empty_lane(), finished_car(1, 3900)],
        };
        let payload = heat_payload(&record, &roster(), &[]);
        assert_eq!(payload.manche_number, 1);
        assert_eq!(payload.results.len(), 2);
        assert_eq!(payload.results[0].car_name, "Alice");
        assert_eq!(payload.results[0].lap_time, Some(3.6));
        assert!(!payload.results[0].is_dnf);
    }

    #[test]
    fn test_dnf_car_serializes_with_null_time() {
        let record = RoundRecord {
            manche_index: 0,
            round_index: 0,
            cars: vec![CarResult {
                player_id: Some(1),
                lap_count: 1,
                current_time: DNF_SENTINEL,
                best_time: None,
                out_of_bounds: true,
            }],
        };
        let payload = heat_payload(&record, &roster(), &[]);
        assert_eq!(payload.results[0].car_name, "Bob");
        assert_eq!(payload.results[0].lap_time, None);
        assert!(payload.results[0].is_dnf);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["results"][0]["lap_time"], serde_json::Value::Null);
        assert_eq!(json["results"][0]["is_dnf"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_unknown_player_gets_placeholder_name() {
        let record = RoundRecord {
            manche_index: 0,
            round_index: 0,
            cars: vec![finished_car(7, 3600)],
        };
        let payload = heat_payload(&record, &roster(), &[]);
        assert_eq!(payload.results[0].car_name, "Car 8");
    }
}
