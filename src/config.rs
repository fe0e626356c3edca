use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ChicaneError, timing::RoundConfig};

const CONFIG_FILE_NAME: &str = "config.json";

const DEFAULT_SCOREBOARD_BASE_URL: &str = "https://mini4wd-companion.com";

/// Application settings persisted between sessions.
///
/// The round policy half of this feeds [RoundConfig] at round start; the
/// rest configures the sampling source and the scoreboard client.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Track laid out to run in the reverse direction.
    pub reversed: bool,
    /// Laps slower than this many seconds are flagged over-threshold.
    pub time_threshold_s: f64,
    /// Valid laps implying a speed above this many m/s are logged as
    /// suspected sensor bounces.
    pub speed_threshold: f64,
    /// Classified laps each car needs for the round to complete on its own.
    pub required_laps: u32,
    /// Length of one lane circuit in meters. 0 disables speed checks.
    pub lane_length_m: f64,
    /// Sensor sampling interval for live board sources.
    pub sampling_interval_ms: u64,
    pub scoreboard_base_url: String,
    /// Tournament code for scoreboard submission; `None` disables it.
    pub tournament_code: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reversed: false,
            time_threshold_s: 5.,
            speed_threshold: 15.,
            required_laps: 3,
            lane_length_m: 0.,
            sampling_interval_ms: 1,
            scoreboard_base_url: DEFAULT_SCOREBOARD_BASE_URL.to_string(),
            tournament_code: None,
        }
    }
}

impl AppConfig {
    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join("chicane").join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let file = std::fs::File::open(config_path).expect("Could not open config file");
            Some(serde_json::from_reader(file).expect("Could not parse config file"))
        } else {
            None
        }
    }

    pub fn save(&self) -> Result<(), ChicaneError> {
        let config_path = dirs::config_dir()
            .ok_or(ChicaneError::NoConfigDir)?
            .join("chicane")
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            std::fs::create_dir_all(config_path.parent().unwrap())
                .map_err(|e| ChicaneError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| ChicaneError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| ChicaneError::ConfigSerializeError { source: e })
    }

    /// The round policy slice of the settings, read once at round start.
    pub fn round_config(&self) -> RoundConfig {
        RoundConfig {
            reversed: self.reversed,
            time_threshold: Duration::from_secs_f64(self.time_threshold_s),
            speed_threshold: self.speed_threshold,
            lane_length_m: self.lane_length_m,
            required_laps: self.required_laps,
        }
    }
}
