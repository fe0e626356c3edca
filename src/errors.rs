// Error types for chicane

use crate::timing::TimingOutput;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum ChicaneError {
    // Errors for the timing core
    #[snafu(display("Unknown sensor id {sensor}"))]
    InvalidLane { sensor: u8 },
    #[snafu(display("Lap event delivered after the round was frozen"))]
    RoundClosed,

    // Errors while broadcasting timing output
    #[snafu(display("Error broadcasting timing output"))]
    TimingBroadcastError {
        source: Box<SendError<TimingOutput>>,
    },

    // Errors for the replay source
    #[snafu(display("Invalid session file: {path}"))]
    InvalidSessionFile { path: String },
    #[snafu(display("Error reading session file"))]
    SessionReadError { source: io::Error },
    #[snafu(display("Error parsing session file at line {line}"))]
    SessionParseError {
        line: usize,
        source: serde_json::Error,
    },

    // Errors for the session writer
    #[snafu(display("Error writing session file"))]
    WriterError { source: io::Error },

    // Round store errors
    #[snafu(display("Error accessing round results file"))]
    StoreIOError { source: io::Error },
    #[snafu(display("Error serializing round results"))]
    StoreSerializeError { source: serde_json::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Scoreboard submission errors
    #[snafu(display("Scoreboard submission requires a tournament code"))]
    MissingTournamentCode,
    #[snafu(display("Error serializing heat {manche_number} payload"))]
    SubmitSerializeError {
        manche_number: usize,
        source: serde_json::Error,
    },
    #[snafu(display("Error submitting heat {manche_number} to the scoreboard"))]
    SubmitError {
        manche_number: usize,
        source: reqwest::Error,
    },
    #[snafu(display("Scoreboard rejected heat {manche_number} with status {status}"))]
    SubmitRejected { manche_number: usize, status: u16 },
}

impl From<SendError<TimingOutput>> for ChicaneError {
    fn from(value: SendError<TimingOutput>) -> Self {
        ChicaneError::TimingBroadcastError {
            source: Box::new(value),
        }
    }
}
