use std::time::Duration;

use itertools::Itertools;
use serde::Serialize;

use crate::timing::{DNF_SENTINEL, RoundRecord};

/// Aggregated figures for one player across every stored round. This is the
/// data behind the exported results sheet and the final ranking.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PlayerStanding {
    pub player_id: usize,
    pub name: String,
    /// Best round total per manche index; `None` where the player has no
    /// finished round in that manche.
    pub manche_times: Vec<Option<Duration>>,
    /// Best round total overall.
    pub best_total: Option<Duration>,
    /// Average of the best two round totals; the primary ranking key.
    pub best_two_avg: Option<Duration>,
    /// Best single valid lap across all rounds.
    pub best_lap: Option<Duration>,
    /// Speed implied by the best lap, in m/s. `None` without a lane length.
    pub best_speed: Option<f64>,
}

/// Build the ranking from stored rounds and the player roster.
///
/// DNF rounds (sentinel totals) never contribute to any figure. Players are
/// sorted by best-two average, then best total; players with no finished
/// round sort last in roster order.
pub fn build_standings(
    records: &[RoundRecord],
    roster: &[String],
    lane_length_m: f64,
) -> Vec<PlayerStanding> {
    let manche_count = records
        .iter()
        .map(|r| r.manche_index + 1)
        .max()
        .unwrap_or(0);

    let mut standings: Vec<PlayerStanding> = roster
        .iter()
        .enumerate()
        .map(|(player_id, name)| {
            let mut manche_times: Vec<Option<Duration>> = vec![None; manche_count];
            let mut totals: Vec<Duration> = Vec::new();
            let mut best_lap: Option<Duration> = None;

            for record in records {
                for car in &record.cars {
                    if car.player_id != Some(player_id) {
                        continue;
                    }
                    if let Some(lap) = car.best_time {
                        if best_lap.is_none_or(|best| lap < best) {
                            best_lap = Some(lap);
                        }
                    }
                    if car.is_dnf() || car.current_time.is_zero() {
                        continue;
                    }
                    let total = car.current_time;
                    totals.push(total);
                    let slot = &mut manche_times[record.manche_index];
                    if slot.is_none_or(|prev| total < prev) {
                        *slot = Some(total);
                    }
                }
            }

            let best_total = totals.iter().min().copied();
            let best_two_avg = best_two_average(&totals);
            let best_speed = best_lap.filter(|_| lane_length_m > 0.).map(|lap| {
                lane_length_m / lap.as_secs_f64()
            });

            PlayerStanding {
                player_id,
                name: name.clone(),
                manche_times,
                best_total,
                best_two_avg,
                best_lap,
                best_speed,
            }
        })
        .collect();

    standings.sort_by(|a, b| {
        rank_key(a)
            .partial_cmp(&rank_key(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    standings
}

// Sort DNF-only players to the bottom without disturbing roster order
// between them.
fn rank_key(standing: &PlayerStanding) -> (f64, f64, usize) {
    (
        standing
            .best_two_avg
            .map_or(f64::INFINITY, |d| d.as_secs_f64()),
        standing
            .best_total
            .map_or(f64::INFINITY, |d| d.as_secs_f64()),
        standing.player_id,
    )
}

fn best_two_average(totals: &[Duration]) -> Option<Duration> {
    let best: Vec<Duration> = totals.iter().copied().sorted().take(2).collect();
    match best.as_slice() {
        [] => None,
        [only] => Some(*only),
        [first, second, ..] => Some((*first + *second) / 2),
    }
}

/// Format a duration the way the results sheet shows times: seconds with
/// millisecond precision, or a dash when there is nothing to show.
pub fn pretty_time(time: Option<Duration>) -> String {
    match time {
        Some(time) if time < DNF_SENTINEL => format!("{:.3}", time.as_secs_f64()),
        Some(_) => "DNF".to_string(),
        None => "-".to_string(),
    }
}
