use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::mpsc::Receiver,
};

use crate::{ChicaneError, timing::TimingOutput};

/// Drain a timing feed into a JSON-lines session log until the sending side
/// hangs up.
pub fn write_session(
    file: &PathBuf,
    timing_receiver: Receiver<TimingOutput>,
) -> Result<(), ChicaneError> {
    let session_file = File::create(file).map_err(|e| ChicaneError::WriterError { source: e })?;
    let mut session_writer = BufWriter::new(session_file);
    for output in &timing_receiver {
        let _ = writeln!(
            session_writer,
            "{}",
            serde_json::to_string(&output).unwrap()
        )
        .map_err(|e| {
            println!("Error while writing timing output to session log: {}", e);
        });
    }
    session_writer
        .flush()
        .map_err(|e| ChicaneError::WriterError { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use crate::timing::{SensorSample, TimingOutput};

    use super::*;

    #[test]
    fn test_writes_each_output_as_a_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");

        let (sender, receiver) = mpsc::channel();
        sender
            .send(TimingOutput::Sample(SensorSample {
                sensor: 1,
                level: true,
                timestamp_ms: 0,
            }))
            .unwrap();
        sender.send(TimingOutput::RoundAborted).unwrap();
        drop(sender);

        write_session(&path, receiver).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: TimingOutput = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first, TimingOutput::Sample(_)));
    }
}
