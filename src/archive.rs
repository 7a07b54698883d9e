/*!
 * The observations available for a run, per sensor and sorted by start time.
 */
use crate::{
    error::MatchupResult,
    observation::{SatelliteObservation, Sensor},
    reader::ReaderRegistry,
    time_axis::TimeInterval,
};
use rustc_hash::FxHashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ObservationArchive {
    observations: FxHashMap<String, Vec<SatelliteObservation>>,
}

impl ObservationArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observation, keeping the observations of its sensor sorted by start time.
    pub fn add(&mut self, observation: SatelliteObservation) {
        let list = self
            .observations
            .entry(observation.sensor().name().to_owned())
            .or_default();

        // Equal start times keep their insertion order.
        let idx = list.partition_point(|o| o.start_time() <= observation.start_time());
        list.insert(idx, observation);
    }

    /// All observations of a sensor, sorted by start time.
    pub fn observations(&self, sensor: &str) -> &[SatelliteObservation] {
        self.observations
            .get(sensor)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// The observations of a sensor with any sensing time inside the window, ends included.
    pub fn query(&self, sensor: &str, window: &TimeInterval) -> Vec<&SatelliteObservation> {
        self.observations(sensor)
            .iter()
            .filter(|o| o.start_time() <= window.stop() && o.stop_time() >= window.start())
            .collect()
    }

    /// Total number of observations.
    pub fn len(&self) -> usize {
        self.observations.values().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /**
     * Scan a directory tree for data files.
     *
     * Files are assigned to sensors by the file name patterns of the registry. Files that can't be
     * read are logged and skipped.
     */
    pub fn from_directory<P: AsRef<Path>>(
        root: P,
        registry: &ReaderRegistry,
    ) -> MatchupResult<Self> {
        let mut archive = Self::new();

        for (entry, sensor) in walkdir::WalkDir::new(root.as_ref())
            .sort_by_file_name()
            .into_iter()
            .filter_map(|res| res.ok())
            // Ignore directories, WalkDir will take care of recursing into them.
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let fname = entry.file_name().to_string_lossy().to_string();
                registry
                    .sensor_for_file(&fname)
                    .map(|sensor| (entry, sensor.to_owned()))
            })
        {
            match read_observation(entry.path(), &sensor, registry) {
                Ok(observation) => {
                    log::debug!("Registered {}", observation);
                    archive.add(observation);
                }
                Err(err) if err.is_recoverable() => {
                    log::warn!("Skipping {}: {}", entry.path().display(), err);
                }
                Err(err) => return Err(err),
            }
        }

        log::info!(
            "Found {} observations under {}",
            archive.len(),
            root.as_ref().display()
        );

        Ok(archive)
    }
}

fn read_observation(
    path: &Path,
    sensor: &str,
    registry: &ReaderRegistry,
) -> MatchupResult<SatelliteObservation> {
    let mut reader = registry.reader_for(sensor)?;
    reader.open(path)?;

    let info = reader.read_acquisition_info()?;
    let version = reader.product_version()?;
    reader.close();

    Ok(SatelliteObservation::from_acquisition_info(
        Sensor::with_version(sensor, &version),
        &version,
        path,
        &info,
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Geometry;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use geo::coord;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 1, 1, hour, 0, 0).unwrap()
    }

    fn observation(sensor: &str, path: &str, start: u32) -> SatelliteObservation {
        let bounds = Geometry::polygon(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 1.0, y: 1.0},
        ]);

        SatelliteObservation::new(
            Sensor::new(sensor),
            "1",
            path,
            at(start),
            at(start) + Duration::minutes(100),
            bounds,
        )
    }

    #[test]
    fn test_sorted_by_start() {
        let mut archive = ObservationArchive::new();
        archive.add(observation("mhs", "c", 5));
        archive.add(observation("mhs", "a", 1));
        archive.add(observation("mhs", "b", 3));
        archive.add(observation("mhs", "b2", 3));
        archive.add(observation("amsub", "x", 2));

        let paths: Vec<_> = archive
            .observations("mhs")
            .iter()
            .map(|o| o.data_file_path().to_string_lossy().to_string())
            .collect();
        assert_eq!(paths, vec!["a", "b", "b2", "c"]);

        assert_eq!(archive.len(), 5);
        assert!(archive.observations("avhrr").is_empty());
    }

    #[test]
    fn test_query() {
        let mut archive = ObservationArchive::new();
        archive.add(observation("mhs", "a", 1));
        archive.add(observation("mhs", "b", 3));
        archive.add(observation("mhs", "c", 6));

        // "a" ends at 02:40, "b" starts at 03:00 and "c" at 06:00.
        let found = archive.query("mhs", &TimeInterval::new(at(2), at(3)));
        assert_eq!(found.len(), 2);

        let found = archive.query("mhs", &TimeInterval::new(at(4) + Duration::minutes(40), at(5)));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data_file_path(), Path::new("b"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let registry = ReaderRegistry::new();
        let archive = ObservationArchive::from_directory("/no/such/archive", &registry).unwrap();
        assert!(archive.is_empty());
    }
}
