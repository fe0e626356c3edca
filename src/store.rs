use std::{
    collections::BTreeMap,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use log::info;

use crate::{ChicaneError, timing::RoundRecord};

/// Append-only store of frozen rounds, one JSON line per record.
///
/// Rounds are keyed by `(manche_index, round_index)`. Re-running a round
/// appends a fresh record and the latest line for a key wins on load, so
/// the file doubles as a history of overridden times.
pub struct RoundStore {
    path: PathBuf,
}

impl RoundStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, record: &RoundRecord) -> Result<(), ChicaneError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ChicaneError::StoreIOError { source: e })?;
        let line = serde_json::to_string(record)
            .map_err(|e| ChicaneError::StoreSerializeError { source: e })?;
        writeln!(file, "{}", line).map_err(|e| ChicaneError::StoreIOError { source: e })?;
        info!(
            "stored manche {} round {} in {:?}",
            record.manche_index, record.round_index, self.path
        );
        Ok(())
    }

    /// All stored rounds, one record per `(manche, round)` key, in key order.
    pub fn load_all(&self) -> Result<Vec<RoundRecord>, ChicaneError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let records = serde_jsonlines::json_lines(&self.path)
            .map_err(|e| ChicaneError::StoreIOError { source: e })?
            .collect::<Result<Vec<RoundRecord>, std::io::Error>>()
            .map_err(|e| ChicaneError::StoreIOError { source: e })?;

        let mut by_key: BTreeMap<(usize, usize), RoundRecord> = BTreeMap::new();
        for record in records {
            by_key.insert((record.manche_index, record.round_index), record);
        }
        Ok(by_key.into_values().collect())
    }

    pub fn load_round(
        &self,
        manche_index: usize,
        round_index: usize,
    ) -> Result<Option<RoundRecord>, ChicaneError> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|r| r.manche_index == manche_index && r.round_index == round_index))
    }
}
