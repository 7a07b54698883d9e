/*!
 * Strategies for finding matchups, and the candidate selection they share.
 */
use crate::{
    archive::ObservationArchive,
    config::MatchupConfig,
    condition::{
        BorderDistanceCondition, ConditionEngine, DistanceCondition, OverlapRemoveCondition,
        SampleRole, TimeDeltaCondition, UniqueSamplesCondition,
    },
    error::{MatchupError, MatchupResult},
    geometry::{Geometry, GeometryOps},
    locator::PixelLocator,
    observation::SatelliteObservation,
    reader::{Reader, ReaderRegistry},
    sample::MatchupCollection,
};
use chrono::{DateTime, Duration, Utc};
use geo::Polygon;

pub use insitu::InsituMatchupStrategy;
pub use polar_orbiting::PolarOrbitingMatchupStrategy;

/// Everything a strategy works with.
pub struct ToolContext {
    pub config: MatchupConfig,
    pub archive: ObservationArchive,
    pub registry: ReaderRegistry,
}

impl ToolContext {
    pub fn new(
        config: MatchupConfig,
        archive: ObservationArchive,
        registry: ReaderRegistry,
    ) -> Self {
        ToolContext {
            config,
            archive,
            registry,
        }
    }

    /// The primary observations inside the processing window, sorted by start time.
    pub fn primary_observations(&self) -> Vec<&SatelliteObservation> {
        self.archive
            .query(self.config.primary.name(), &self.config.processing_window())
    }

    /**
     * The conditions configured for this run.
     *
     * The time delta condition always comes first, followed by the border distance, pixel
     * distance, unique samples and overlap conditions that are switched on.
     */
    pub fn condition_engine(&self) -> ConditionEngine {
        let config = &self.config;
        let secondary_names = config.secondary_names();

        let mut engine = ConditionEngine::new();
        engine.add(Box::new(
            TimeDeltaCondition::new(config.time_delta, &secondary_names)
                .with_secondary_check(config.secondary_check),
        ));

        if let Some((nx, ny)) = config.border_distance {
            engine.add(Box::new(
                BorderDistanceCondition::new(nx, ny).with_secondaries(&secondary_names),
            ));
        }

        if let Some(distance) = config.max_pixel_distance_km {
            engine.add(Box::new(DistanceCondition::new(distance)));
        }

        if let Some(reference) = &config.unique_samples {
            let (reference, associated) = if reference.name() == config.primary.name() {
                let first = secondary_names.first().copied().unwrap_or_default();
                (SampleRole::Primary, SampleRole::secondary(first))
            } else {
                (SampleRole::secondary(reference.name()), SampleRole::Primary)
            };
            engine.add(Box::new(UniqueSamplesCondition::new(reference, associated)));
        }

        if let Some((nx, ny)) = config.overlap_distance {
            engine.add(Box::new(OverlapRemoveCondition::new(nx, ny)));
        }

        engine
    }

    /// Create a reader and open the data file of the observation with it.
    pub fn open_reader(
        &self,
        observation: &SatelliteObservation,
    ) -> MatchupResult<Box<dyn Reader>> {
        let mut reader = self.registry.reader_for(observation.sensor().name())?;
        reader.open(observation.data_file_path())?;
        Ok(reader)
    }
}

/// A way of building the matchup collection of a run.
pub trait MatchupStrategy {
    fn create_matchup_collection(&self, context: &ToolContext)
        -> MatchupResult<MatchupCollection>;
}

/// Observations that overlap `[start - delta, stop + delta]`, ends included.
pub fn candidates_by_time_window<'a, I>(
    observations: I,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    delta: Duration,
) -> Vec<&'a SatelliteObservation>
where
    I: IntoIterator<Item = &'a SatelliteObservation>,
{
    let (search_start, search_stop) = (start - delta, stop + delta);

    observations
        .into_iter()
        .filter(|o| o.start_time() <= search_stop && o.stop_time() >= search_start)
        .collect()
}

/// Observations whose bounds intersect the geometry.
pub fn candidates_by_geometry<'a, I>(
    observations: I,
    geometry: &Geometry,
) -> Vec<&'a SatelliteObservation>
where
    I: IntoIterator<Item = &'a SatelliteObservation>,
{
    observations
        .into_iter()
        .filter(|o| o.geo_bounds().intersects(geometry))
        .collect()
}

/// Observations that were sensing within `delta` of the instant.
pub fn candidates_by_time<'a, I>(
    observations: I,
    instant: DateTime<Utc>,
    delta: Duration,
) -> Vec<&'a SatelliteObservation>
where
    I: IntoIterator<Item = &'a SatelliteObservation>,
{
    observations
        .into_iter()
        .filter(|o| o.time_interval().widen(delta).contains(instant))
        .collect()
}

/// Observations whose bounds contain the point.
pub fn candidates_by_point<'a, I>(
    observations: I,
    lon: f64,
    lat: f64,
) -> Vec<&'a SatelliteObservation>
where
    I: IntoIterator<Item = &'a SatelliteObservation>,
{
    observations
        .into_iter()
        .filter(|o| o.covers(lon, lat))
        .collect()
}

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod insitu;
mod polar_orbiting;

/// A pixel locator owned by the caller or borrowed from a reader.
enum SwathLocator<'r> {
    Whole(&'r dyn PixelLocator),
    SubScene(Box<dyn PixelLocator>),
}

impl<'r> SwathLocator<'r> {
    /// The locator for the piece `index` of the bounds, segmented swaths get a sub-scene locator.
    fn for_part(
        reader: &'r dyn Reader,
        observation: &SatelliteObservation,
        index: usize,
    ) -> MatchupResult<Self> {
        if !observation.is_segmented() {
            return Ok(SwathLocator::Whole(reader.pixel_locator()?));
        }

        let polygon: &Polygon<f64> = observation
            .geo_bounds()
            .geometries()
            .into_iter()
            .nth(index)
            .and_then(|part| part.polygons().into_iter().next())
            .ok_or_else(|| {
                MatchupError::InvalidGeometry(format!(
                    "No sub-geometry {} in {}",
                    index,
                    observation.data_file_path().display()
                ))
            })?;

        Ok(SwathLocator::SubScene(reader.sub_scene_pixel_locator(polygon)?))
    }

    fn get(&self) -> &dyn PixelLocator {
        match self {
            SwathLocator::Whole(locator) => *locator,
            SwathLocator::SubScene(locator) => locator.as_ref(),
        }
    }
}
