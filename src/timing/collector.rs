use std::sync::mpsc::Sender;

use log::info;

use crate::ChicaneError;

use super::{
    LANE_COUNT, RoundConfig, TimingOutput,
    debounce::SensorDebouncer,
    lanes::lane_for_sensor,
    lap_timer::LapTimer,
    scorer::{RoundRecord, RoundScorer},
    source::{SampleSource, SourceEvent},
};

/// Drive one round from a sample source to the output channels.
///
/// Each sample runs through debouncer, lane mapper, lap timer and scorer on
/// this thread; the single-writer discipline on the per-lane state comes
/// from that. Downstream consumers sit behind the channels, so a slow sink
/// never stalls sample processing. The feed channel sees every sample plus
/// the lap and round events; the optional writer channel mirrors the same
/// stream for an on-disk session log.
///
/// Returns the frozen record, or `None` when the round was aborted. A
/// source that runs dry with the round still open counts as an operator
/// stop: the recorded session simply ended there.
pub fn run_round(
    mut source: impl SampleSource,
    config: RoundConfig,
    players: [Option<usize>; LANE_COUNT],
    manche_index: usize,
    round_index: usize,
    feed_sender: Sender<TimingOutput>,
    writer_sender: Option<Sender<TimingOutput>>,
) -> Result<Option<RoundRecord>, ChicaneError> {
    source.start()?;

    let mut debouncer = SensorDebouncer::new();
    let mut timer = LapTimer::new(&config);
    let mut scorer = RoundScorer::new(config.clone(), players);

    let broadcast = move |output: TimingOutput| -> Result<(), ChicaneError> {
        if let Some(ref writer) = writer_sender {
            writer.send(output.clone())?;
        }
        feed_sender.send(output)?;
        Ok(())
    };

    // `Some(cars)` freezes the round, `None` abandons it
    let outcome = loop {
        let Some(event) = source.next_event()? else {
            break Some(scorer.force_complete());
        };
        match event {
            SourceEvent::Sample(sample) => {
                broadcast(TimingOutput::Sample(sample))?;
                let Some(crossing) = debouncer.process(&sample)? else {
                    continue;
                };
                let lane = lane_for_sensor(crossing.sensor, config.reversed)?;
                let Some(lap) = timer.on_crossing(lane, &crossing) else {
                    continue;
                };
                broadcast(TimingOutput::Lap(lap))?;
                if let Some(cars) = scorer.on_lap_event(&lap)? {
                    break Some(cars);
                }
            }
            SourceEvent::Disqualify { lane } => {
                if lane >= LANE_COUNT {
                    return Err(ChicaneError::InvalidLane {
                        sensor: u8::try_from(lane).unwrap_or(u8::MAX),
                    });
                }
                info!("lane {lane} disqualified");
                let lap = timer.force_dnf(lane);
                broadcast(TimingOutput::Lap(lap))?;
                if let Some(cars) = scorer.on_lap_event(&lap)? {
                    break Some(cars);
                }
            }
            SourceEvent::Stop => break Some(scorer.force_complete()),
            SourceEvent::Abort => break None,
        }
    };

    match outcome {
        Some(cars) => {
            let record = RoundRecord {
                manche_index,
                round_index,
                cars,
            };
            info!("manche {manche_index} round {round_index} complete");
            broadcast(TimingOutput::RoundComplete(record.clone()))?;
            Ok(Some(record))
        }
        None => {
            info!("manche {manche_index} round {round_index} aborted");
            broadcast(TimingOutput::RoundAborted)?;
            Ok(None)
        }
    }
}
