use std::{path::PathBuf, sync::mpsc, thread};

use chicane::{
    AppConfig, ChicaneError, TimingOutput,
    standings::{build_standings, pretty_time},
    store::RoundStore,
    submit::{ScoreboardClient, manche_sizes_from_records},
    timing::{LANE_COUNT, ReplaySampleSource, run_round},
    writer,
};
use clap::{Parser, Subcommand};
use log::warn;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a recorded session as one round
    Replay {
        /// Recorded session file, one source event per JSON line
        #[arg(short, long)]
        input: PathBuf,

        /// Lane assignments, comma separated; use - for an empty lane
        #[arg(short, long)]
        players: String,

        #[arg(short, long, default_value_t = 0)]
        manche: usize,

        #[arg(short, long, default_value_t = 0)]
        round: usize,

        /// Write the live timing stream to this session log
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append the frozen round to this results file
        #[arg(long)]
        results: Option<PathBuf>,

        /// Submit the frozen round to the configured scoreboard
        #[arg(long, default_value_t = false)]
        submit: bool,

        /// Heats per manche, comma separated, for sequential heat numbering
        #[arg(long)]
        manche_sizes: Option<String>,
    },
    /// Rank players across all stored rounds
    Standings {
        #[arg(short, long)]
        results: PathBuf,

        /// Player roster in lane-assignment order
        #[arg(short, long)]
        players: String,
    },
    /// Resubmit stored rounds to the scoreboard
    Submit {
        #[arg(short, long)]
        results: PathBuf,

        /// Player roster in lane-assignment order
        #[arg(short, long)]
        players: String,

        /// Heats per manche, comma separated; derived from the stored
        /// rounds when omitted
        #[arg(long)]
        manche_sizes: Option<String>,
    },
}

// "-" marks an empty lane; racing names get sequential roster ids
fn parse_lanes(spec: &str) -> (Vec<String>, [Option<usize>; LANE_COUNT]) {
    let mut roster = Vec::new();
    let mut lanes = [None; LANE_COUNT];
    for (lane, name) in spec.split(',').take(LANE_COUNT).enumerate() {
        let name = name.trim();
        if name.is_empty() || name == "-" {
            continue;
        }
        lanes[lane] = Some(roster.len());
        roster.push(name.to_string());
    }
    (roster, lanes)
}

fn parse_roster(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "-")
        .map(str::to_string)
        .collect()
}

fn parse_manche_sizes(spec: Option<&str>) -> Option<Vec<usize>> {
    let spec = spec?;
    match spec.split(',').map(|s| s.trim().parse()).collect() {
        Ok(sizes) => Some(sizes),
        Err(e) => {
            warn!("ignoring malformed manche sizes {spec:?}: {e}");
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn replay(
    input: &PathBuf,
    players: &str,
    manche: usize,
    round: usize,
    output: Option<PathBuf>,
    results: Option<PathBuf>,
    submit: bool,
    manche_sizes: Option<&str>,
) -> Result<(), ChicaneError> {
    let config = AppConfig::from_local_file().unwrap_or_default();
    let (roster, lanes) = parse_lanes(players);

    let (feed_sender, feed_receiver) = mpsc::channel::<TimingOutput>();

    // live projection of the feed, the closest a CLI gets to the race screen
    let feed_handle = thread::spawn(move || {
        for output in &feed_receiver {
            match output {
                TimingOutput::Lap(lap) => println!(
                    "lane {} lap: {} [{:?}]",
                    lap.lane,
                    pretty_time(Some(lap.duration)),
                    lap.classification
                ),
                TimingOutput::RoundComplete(_) => println!("round complete"),
                TimingOutput::RoundAborted => println!("round aborted"),
                TimingOutput::Sample(_) => {}
            }
        }
    });

    let mut writer_handle = None;
    let writer_sender = match output {
        Some(output_file) => {
            let (writer_tx, writer_rx) = mpsc::channel::<TimingOutput>();
            writer_handle =
                Some(thread::spawn(move || writer::write_session(&output_file, writer_rx)));
            Some(writer_tx)
        }
        None => None,
    };

    let source = ReplaySampleSource::from_file(input)?;
    let record = run_round(
        source,
        config.round_config(),
        lanes,
        manche,
        round,
        feed_sender,
        writer_sender,
    )?;

    feed_handle.join().expect("Feed thread panicked");
    if let Some(handle) = writer_handle {
        handle.join().expect("Session writer thread panicked")?;
    }

    let Some(record) = record else {
        return Ok(());
    };

    for (lane, car) in record.cars.iter().enumerate() {
        match car.player_id {
            Some(id) => println!(
                "lane {}: {} - {} laps, total {}, best {}",
                lane,
                roster.get(id).map(String::as_str).unwrap_or("?"),
                car.lap_count,
                pretty_time(Some(car.current_time)),
                pretty_time(car.best_time)
            ),
            None => println!("lane {lane}: empty"),
        }
    }

    if let Some(results_file) = results {
        RoundStore::new(results_file).save(&record)?;
    }

    if submit {
        let tournament_code = config
            .tournament_code
            .clone()
            .ok_or(ChicaneError::MissingTournamentCode)?;
        let sizes = parse_manche_sizes(manche_sizes).unwrap_or_default();
        let mut client = ScoreboardClient::new(&config.scoreboard_base_url, &tournament_code);
        client.submit_round(&record, &roster, &sizes)?;
    }

    Ok(())
}

fn standings(results: &PathBuf, players: &str) -> Result<(), ChicaneError> {
    let config = AppConfig::from_local_file().unwrap_or_default();
    let roster = parse_roster(players);
    let records = RoundStore::new(results).load_all()?;
    let standings = build_standings(&records, &roster, config.lane_length_m);

    println!(
        "{:<4} {:<20} {:>10} {:>12} {:>10} {:>10}",
        "Pos", "Player", "Best", "Best 2 avg", "Best lap", "m/s"
    );
    for (pos, standing) in standings.iter().enumerate() {
        println!(
            "{:<4} {:<20} {:>10} {:>12} {:>10} {:>10}",
            pos + 1,
            standing.name,
            pretty_time(standing.best_total),
            pretty_time(standing.best_two_avg),
            pretty_time(standing.best_lap),
            standing
                .best_speed
                .map(|s| format!("{s:.2}"))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

fn submit_stored(
    results: &PathBuf,
    players: &str,
    manche_sizes: Option<&str>,
) -> Result<(), ChicaneError> {
    let config = AppConfig::from_local_file().unwrap_or_default();
    let tournament_code = config
        .tournament_code
        .clone()
        .ok_or(ChicaneError::MissingTournamentCode)?;
    let roster = parse_roster(players);
    let records = RoundStore::new(results).load_all()?;
    let sizes =
        parse_manche_sizes(manche_sizes).unwrap_or_else(|| manche_sizes_from_records(&records));

    let mut client = ScoreboardClient::new(&config.scoreboard_base_url, &tournament_code);
    let submitted = client.submit_all(&records, &roster, &sizes);
    println!("Submitted {} of {} stored rounds", submitted, records.len());
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");
    match &cli.command {
        Commands::Replay {
            input,
            players,
            manche,
            round,
            output,
            results,
            submit,
            manche_sizes,
        } => replay(
            input,
            players,
            *manche,
            *round,
            output.clone(),
            results.clone(),
            *submit,
            manche_sizes.as_deref(),
        )
        .expect("Error while replaying session"),
        Commands::Standings { results, players } => {
            standings(results, players).expect("Error while building standings")
        }
        Commands::Submit {
            results,
            players,
            manche_sizes,
        } => submit_stored(results, players, manche_sizes.as_deref())
            .expect("Error while submitting results"),
    };
}
