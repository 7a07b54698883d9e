/*!
 * Access to the data files of the sensors taking part in a run.
 *
 * Decoding real instrument formats is left to implementations of [Reader]. The library only
 * provides [SwathDumpReader] for a simple text format.
 */
use crate::{
    error::{MatchupError, MatchupResult},
    locator::{PixelLocator, TimeLocator},
    observation::AcquisitionInfo,
    sample::Sample,
    time_axis::TimeInterval,
};
use geo::Polygon;
use std::path::Path;

pub use swath_dump::{SwathDump, SwathDumpReader};

/// What the matching engine needs from a data file.
pub trait Reader {
    fn open(&mut self, path: &Path) -> MatchupResult<()>;

    fn close(&mut self);

    /// The outline, time axes and sensing times of the open file.
    fn read_acquisition_info(&self) -> MatchupResult<AcquisitionInfo>;

    /// The processing version of the open file.
    fn product_version(&self) -> MatchupResult<String>;

    /// Locator for the whole swath.
    fn pixel_locator(&self) -> MatchupResult<&dyn PixelLocator>;

    /// Locator restricted to the piece of a split outline given by `polygon`.
    fn sub_scene_pixel_locator(&self, polygon: &Polygon<f64>)
        -> MatchupResult<Box<dyn PixelLocator>>;

    fn time_locator(&self) -> MatchupResult<&dyn TimeLocator>;

    /// Width and height of the swath in pixels.
    fn product_size(&self) -> MatchupResult<(usize, usize)>;

    /// Point measurements inside the window, only in-situ readers have any.
    fn insitu_samples(&self, _window: &TimeInterval) -> MatchupResult<Vec<Sample>> {
        Ok(vec![])
    }
}

type ReaderFactory = Box<dyn Fn() -> Box<dyn Reader> + Send + Sync>;

struct Registration {
    sensor: String,
    file_pattern: Option<String>,
    factory: ReaderFactory,
}

/// Maps sensor names to readers, and file names to sensors.
#[derive(Default)]
pub struct ReaderRegistry {
    registrations: Vec<Registration>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Register a reader for a sensor.
     *
     * #Arguments
     * * sensor - the name of the sensor.
     * * file_pattern - files whose name contains this belong to the sensor, `None` if the sensor
     *   can't be recognized by file name.
     * * factory - creates a new, unopened reader.
     */
    pub fn register<F>(&mut self, sensor: &str, file_pattern: Option<&str>, factory: F)
    where
        F: Fn() -> Box<dyn Reader> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            sensor: sensor.to_owned(),
            file_pattern: file_pattern.map(str::to_owned),
            factory: Box::new(factory),
        });
    }

    /// Create a reader for the sensor.
    pub fn reader_for(&self, sensor: &str) -> MatchupResult<Box<dyn Reader>> {
        self.registrations
            .iter()
            .find(|r| r.sensor == sensor)
            .map(|r| (r.factory)())
            .ok_or_else(|| {
                MatchupError::Configuration(format!(
                    "No reader registered for sensor '{}'.",
                    sensor
                ))
            })
    }

    /// The first registered sensor whose file pattern is part of the file name.
    pub fn sensor_for_file(&self, file_name: &str) -> Option<&str> {
        self.registrations
            .iter()
            .find(|r| {
                r.file_pattern
                    .as_deref()
                    .map(|p| file_name.contains(p))
                    .unwrap_or(false)
            })
            .map(|r| r.sensor.as_str())
    }

    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.sensor.as_str())
    }
}

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod swath_dump;
