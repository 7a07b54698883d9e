use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{info, LevelFilter};
use satmatch::{
    Interval, MatchupCollection, MatchupConfig, MatchupResult, ObservationArchive,
    PolarOrbitingMatchupStrategy, ReaderRegistry, Sensor, SwathDumpReader, ToolContext,
    DEFAULT_MAX_SPLITS,
};
use simple_logger::SimpleLogger;
use std::{
    error::Error,
    fmt::{self, Display},
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
};

const CHANNEL_SIZE: usize = 100;

/// Geographic locations further than this from every pixel center are outside a swath.
const MAX_PIXEL_DISTANCE_KM: f64 = 50.0;

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Find matchups between a primary sensor and one or more secondary sensors.
///
/// This program scans an archive of swath dump files and, for every primary file in the
/// processing window, finds the pixels of the secondary sensors that observed the same place at
/// nearly the same time.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "matchup")]
#[clap(author, version, about)]
struct MatchupOptionsInit {
    /// The path to the archive directory.
    ///
    /// If this is not specified, then the program will check for it in the "MATCHUP_ARCHIVE"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "MATCHUP_ARCHIVE")]
    archive: PathBuf,

    /// The name of the primary sensor.
    #[clap(short, long)]
    primary: String,

    /// The names of the secondary sensors, in the order they appear in the sample sets.
    #[clap(short, long, required = true, multiple_values = true)]
    secondary: Vec<String>,

    /// Start of the processing window, e.g. 2016-01-01T00:00:00Z.
    #[clap(long, parse(try_from_str=parse_time))]
    start: DateTime<Utc>,

    /// End of the processing window, e.g. 2016-01-02T00:00:00Z.
    #[clap(long, parse(try_from_str=parse_time))]
    end: DateTime<Utc>,

    /// The largest allowed time difference between primary and secondary samples in seconds.
    #[clap(short, long, default_value_t = 300)]
    time_delta: i64,

    /// Sample every x-th pixel across and every y-th pixel along track, given as "x,y".
    #[clap(short, long, parse(try_from_str=parse_interval))]
    #[clap(default_value = "1,1")]
    interval: Interval,

    /// Split swath outlines at most this many times to get valid polygons.
    #[clap(short, long, default_value_t = DEFAULT_MAX_SPLITS)]
    max_splits: usize,

    /// Require secondary samples to be within the time delta of each other too.
    #[clap(long)]
    secondary_check: bool,

    /// Drop pixels closer than "x,y" columns and rows to the border of their product.
    #[clap(long, parse(try_from_str=parse_pixel_pair))]
    border_distance: Option<(i32, i32)>,

    /// Drop sample sets whose secondary pixels are further than this from the primary in km.
    #[clap(long)]
    max_distance: Option<f64>,

    /// Keep only the closest sample set per pixel of this sensor.
    #[clap(long)]
    unique_samples: Option<String>,

    /// Drop sample sets whose primary pixel is at most "x,y" columns and rows from a kept one.
    #[clap(long, parse(try_from_str=parse_pixel_pair))]
    overlap_distance: Option<(i32, i32)>,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| format!("Argument is not a valid RFC 3339 time: {} ({})", value, err))
}

fn parse_pixel_pair(value: &str) -> Result<(i32, i32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("Argument is not a pixel pair of the form x,y: {}", value))?;

    let x: i32 = x
        .trim()
        .parse()
        .map_err(|_| format!("Invalid pixel count x: {}", x))?;
    let y: i32 = y
        .trim()
        .parse()
        .map_err(|_| format!("Invalid pixel count y: {}", y))?;

    Ok((x, y))
}

fn parse_interval(value: &str) -> Result<Interval, String> {
    let (x, y) = parse_pixel_pair(value)?;
    Interval::new(x, y).map_err(|err| err.to_string())
}

#[derive(Debug)]
struct MatchupOptionsChecked {
    /// The path to the archive directory.
    archive: PathBuf,

    /// Everything the strategy needs to know.
    config: MatchupConfig,

    /// Verbose output
    verbose: bool,
}

impl Display for MatchupOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "  Archive: {}", self.archive.display())?;
        writeln!(f, "{}", self.config)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
///
/// If the archive is missing, try to fill it in with the environment variable.
fn parse_args() -> MatchupResult<MatchupOptionsChecked> {
    let MatchupOptionsInit {
        archive,
        primary,
        secondary,
        start,
        end,
        time_delta,
        interval,
        max_splits,
        secondary_check,
        border_distance,
        max_distance,
        unique_samples,
        overlap_distance,
        verbose,
    } = MatchupOptionsInit::parse();

    let mut config = MatchupConfig::new(
        Sensor::new(&primary),
        secondary.iter().map(|name| Sensor::new(name)).collect(),
        Duration::seconds(time_delta),
        start,
        end,
    )
    .with_sampling_interval(interval)
    .with_max_splits(max_splits)
    .with_secondary_check(secondary_check);

    if let Some((nx, ny)) = border_distance {
        config = config.with_border_distance(nx, ny);
    }
    if let Some(distance) = max_distance {
        config = config.with_max_pixel_distance_km(distance);
    }
    if let Some(reference) = unique_samples {
        config = config.with_unique_samples(Sensor::new(&reference));
    }
    if let Some((nx, ny)) = overlap_distance {
        config = config.with_overlap_distance(nx, ny);
    }

    config.validate()?;

    Ok(MatchupOptionsChecked {
        archive,
        config,
        verbose,
    })
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> Result<(), Box<dyn Error>> {
    let opts = parse_args()?;

    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("matchup", module_level(opts.verbose))
        .with_module_level("satmatch", module_level(opts.verbose))
        .init()?;

    if opts.verbose {
        info!("{}", opts);
    }

    let registry = create_registry(&opts.config);
    let archive = ObservationArchive::from_directory(&opts.archive, &registry)?;

    let context = Arc::new(ToolContext::new(opts.config, archive, registry));
    let num_primaries = context.primary_observations().len();
    info!("Matching {} primary observations", num_primaries);
    for sensor in &context.config.secondaries {
        info!(
            "{:>10} - {} observations",
            sensor.name(),
            context.archive.observations(sensor.name()).len()
        );
    }

    let (to_workers, from_main) = bounded(CHANNEL_SIZE);
    let (to_collector, from_workers) = bounded(CHANNEL_SIZE);

    let collector = start_collector_thread(from_workers, num_primaries)?;
    let workers = (0..num_cpus::get())
        .map(|i| {
            start_worker_thread(
                i,
                Arc::clone(&context),
                from_main.clone(),
                to_collector.clone(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    drop(from_main);
    drop(to_collector);

    for idx in 0..num_primaries {
        // Only fails when the collector quit early, its error is reported below.
        if to_workers.send(idx).is_err() {
            break;
        }
    }
    drop(to_workers);

    for jh in workers {
        jh.join().map_err(|_| "worker thread panicked")?;
    }
    let collection = collector.join().map_err(|_| "collector thread panicked")??;

    log_summary(&collection);

    Ok(())
}

fn module_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn create_registry(config: &MatchupConfig) -> ReaderRegistry {
    let mut registry = ReaderRegistry::new();

    let max_splits = config.max_splits;
    let sensors = std::iter::once(&config.primary).chain(config.secondaries.iter());
    for sensor in sensors {
        registry.register(sensor.name(), Some(sensor.name()), move || {
            Box::new(SwathDumpReader::new(
                Interval::default(),
                max_splits,
                MAX_PIXEL_DISTANCE_KM,
            ))
        });
    }

    registry
}

fn start_worker_thread(
    id: usize,
    context: Arc<ToolContext>,
    from_main: Receiver<usize>,
    to_collector: Sender<(usize, MatchupResult<MatchupCollection>)>,
) -> Result<JoinHandle<()>, Box<dyn Error>> {
    let jh = thread::Builder::new()
        .name(format!("matchup-worker-{}", id))
        .spawn(move || {
            let strategy = PolarOrbitingMatchupStrategy::new();
            let primaries = context.primary_observations();

            for idx in from_main {
                let primary = primaries[idx];
                log::debug!("Processing {}", primary.data_file_path().display());

                let result = strategy.match_primary(&context, primary);
                if to_collector.send((idx, result)).is_err() {
                    break;
                }
            }
        })?;

    Ok(jh)
}

fn start_collector_thread(
    from_workers: Receiver<(usize, MatchupResult<MatchupCollection>)>,
    num_primaries: usize,
) -> Result<JoinHandle<MatchupResult<MatchupCollection>>, Box<dyn Error>> {
    let jh = thread::Builder::new()
        .name("matchup-collector".to_owned())
        .spawn(move || {
            let mut results: Vec<Option<MatchupCollection>> = vec![None; num_primaries];

            for (idx, result) in from_workers {
                match result {
                    Ok(found) => results[idx] = Some(found),
                    Err(err) if err.is_recoverable() => {
                        log::warn!("Skipping primary observation {}: {}", idx, err);
                    }
                    Err(err) => return Err(err),
                }
            }

            // Merge in primary order, regardless of which worker finished first.
            let mut collection = MatchupCollection::new();
            for found in results.into_iter().flatten() {
                collection.merge(found);
            }

            Ok(collection)
        })?;

    Ok(jh)
}

fn log_summary(collection: &MatchupCollection) {
    info!("");
    info!("Matchup summary:");
    for set in collection.sets() {
        let secondaries: Vec<String> = set
            .secondary_files()
            .map(|(name, file)| format!("{}={}", name, file.path.display()))
            .collect();

        info!(
            "  {} [{}] - {:>6} sample sets",
            set.primary_path().display(),
            secondaries.join(", "),
            set.num_observations()
        );
    }
    info!(
        "  total - {} matchups in {} matchup sets",
        collection.num_matchups(),
        collection.sets().len()
    );
    info!("");
}
