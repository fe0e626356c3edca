use std::{
    io::BufRead,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::ChicaneError;

use super::SensorSample;

/// One item pulled from a sample source: a raw sensor reading, or one of
/// the race-control signals that arrive on the same stream.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceEvent {
    Sample(SensorSample),
    /// Manual disqualification of a logical lane.
    Disqualify { lane: usize },
    /// Operator stop: freeze the round as it stands.
    Stop,
    /// Abandon the round without a result.
    Abort,
}

/// A source of sensor samples and race-control signals.
///
/// The surrounding application implements this for the live timing board;
/// this crate ships [ReplaySampleSource] for recorded sessions and tests.
/// Implementations deliver events for a single round in timestamp order.
pub trait SampleSource {
    /// Initialize the source and establish the connection to the board or
    /// data file.
    fn start(&mut self) -> Result<(), ChicaneError>;

    /// Pull the next event. `None` means the source is exhausted.
    fn next_event(&mut self) -> Result<Option<SourceEvent>, ChicaneError>;
}

/// Replays a recorded round from memory or from a JSON-lines file with one
/// [SourceEvent] per line, the format the `replay` command consumes.
pub struct ReplaySampleSource {
    cur_tick: usize,
    events: Vec<SourceEvent>,
}

impl ReplaySampleSource {
    /// Build a source from a vector of events, for tests and synthetic
    /// sessions.
    pub fn from_events(events: Vec<SourceEvent>) -> Self {
        Self {
            cur_tick: 0,
            events,
        }
    }

    /// Load a recorded session from a JSON-lines file.
    pub fn from_file(file: &Path) -> Result<Self, ChicaneError> {
        if !file.exists() {
            return Err(ChicaneError::InvalidSessionFile {
                path: format!("{:?}", file),
            });
        }
        let reader = std::io::BufReader::new(
            std::fs::File::open(file).map_err(|e| ChicaneError::SessionReadError { source: e })?,
        );

        let mut events = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| ChicaneError::SessionReadError { source: e })?;
            if line.trim().is_empty() {
                continue;
            }
            let event: SourceEvent = serde_json::from_str(&line).map_err(|e| {
                ChicaneError::SessionParseError {
                    line: line_no + 1,
                    source: e,
                }
            })?;
            events.push(event);
        }

        Ok(Self::from_events(events))
    }

    /// Record a session to a JSON-lines file that [Self::from_file] can
    /// load back.
    pub fn write_file(file: &PathBuf, events: &[SourceEvent]) -> Result<(), ChicaneError> {
        use std::io::Write;

        let out = std::fs::File::create(file).map_err(|e| ChicaneError::WriterError { source: e })?;
        let mut writer = std::io::BufWriter::new(out);
        for event in events {
            writeln!(writer, "{}", serde_json::to_string(event).unwrap())
                .map_err(|e| ChicaneError::WriterError { source: e })?;
        }
        Ok(())
    }
}

impl SampleSource for ReplaySampleSource {
    fn start(&mut self) -> Result<(), ChicaneError> {
        // nothing to connect to, the whole session is already in memory
        Ok(())
    }

    fn next_event(&mut self) -> Result<Option<SourceEvent>, ChicaneError> {
        if self.cur_tick >= self.events.len() {
            return Ok(None);
        }
        let event = self.events[self.cur_tick];
        self.cur_tick += 1;
        Ok(Some(event))
    }
}
