/*!
 * Pixels and the groups of matched pixels produced by a run.
 */
use chrono::{DateTime, Utc};
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    sync::Arc,
};

/// A single observed pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub x: i32,
    pub y: i32,
    pub lon: f64,
    pub lat: f64,
    pub time: DateTime<Utc>,
}

impl Sample {
    pub fn new(x: i32, y: i32, lon: f64, lat: f64, time: DateTime<Utc>) -> Self {
        Sample {
            x,
            y,
            lon,
            lat,
            time,
        }
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "({}, {}) at ({:.4}, {:.4}) {}",
            self.x, self.y, self.lon, self.lat, self.time
        )
    }
}

/// A primary pixel and at most one matching pixel from each secondary sensor.
#[derive(Debug, Clone)]
pub struct SampleSet {
    primary: Arc<Sample>,
    secondaries: Vec<(String, Arc<Sample>)>,
}

impl SampleSet {
    pub fn new(primary: Arc<Sample>) -> Self {
        SampleSet {
            primary,
            secondaries: vec![],
        }
    }

    pub fn primary(&self) -> &Arc<Sample> {
        &self.primary
    }

    /// Set the sample for a sensor, replacing any earlier one.
    pub fn set_secondary(&mut self, sensor_name: &str, sample: Arc<Sample>) {
        match self.secondaries.iter_mut().find(|(name, _)| name == sensor_name) {
            Some(entry) => entry.1 = sample,
            None => self.secondaries.push((sensor_name.to_owned(), sample)),
        }
    }

    pub fn secondary(&self, sensor_name: &str) -> Option<&Arc<Sample>> {
        self.secondaries
            .iter()
            .find(|(name, _)| name == sensor_name)
            .map(|(_, sample)| sample)
    }

    /// Secondary samples in the order they were set.
    pub fn secondaries(&self) -> impl Iterator<Item = (&str, &Arc<Sample>)> {
        self.secondaries.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn num_secondaries(&self) -> usize {
        self.secondaries.len()
    }
}

/// The file a set of secondary samples came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecondaryFile {
    pub path: PathBuf,
    pub version: String,
}

/// All the matched pixels between one primary file and one file of each secondary sensor.
#[derive(Debug, Clone)]
pub struct MatchupSet {
    primary_path: PathBuf,
    primary_version: String,
    secondaries: Vec<(String, SecondaryFile)>,
    sample_sets: Vec<SampleSet>,
}

impl MatchupSet {
    pub fn new<P: AsRef<Path>>(primary_path: P, primary_version: &str) -> Self {
        MatchupSet {
            primary_path: primary_path.as_ref().to_path_buf(),
            primary_version: primary_version.to_owned(),
            secondaries: vec![],
            sample_sets: vec![],
        }
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary_path
    }

    pub fn primary_version(&self) -> &str {
        &self.primary_version
    }

    pub fn set_secondary_file(&mut self, sensor_name: &str, file: SecondaryFile) {
        match self.secondaries.iter_mut().find(|(name, _)| name == sensor_name) {
            Some(entry) => entry.1 = file,
            None => self.secondaries.push((sensor_name.to_owned(), file)),
        }
    }

    pub fn secondary_file(&self, sensor_name: &str) -> Option<&SecondaryFile> {
        self.secondaries
            .iter()
            .find(|(name, _)| name == sensor_name)
            .map(|(_, file)| file)
    }

    pub fn secondary_path(&self, sensor_name: &str) -> Option<&Path> {
        self.secondary_file(sensor_name).map(|f| f.path.as_path())
    }

    pub fn secondary_version(&self, sensor_name: &str) -> Option<&str> {
        self.secondary_file(sensor_name).map(|f| f.version.as_str())
    }

    pub fn secondary_files(&self) -> impl Iterator<Item = (&str, &SecondaryFile)> {
        self.secondaries.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn add_sample_set(&mut self, sample_set: SampleSet) {
        self.sample_sets.push(sample_set);
    }

    pub fn set_sample_sets(&mut self, sample_sets: Vec<SampleSet>) {
        self.sample_sets = sample_sets;
    }

    pub fn sample_sets(&self) -> &[SampleSet] {
        &self.sample_sets
    }

    pub fn num_observations(&self) -> usize {
        self.sample_sets.len()
    }
}

impl Display for MatchupSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.primary_path.display())?;
        for (name, file) in &self.secondaries {
            write!(f, " + {}:{}", name, file.path.display())?;
        }
        write!(f, " -> {} sample sets", self.sample_sets.len())
    }
}

/// The result of a run, matchup sets in the order they were produced.
#[derive(Debug, Clone, Default)]
pub struct MatchupCollection {
    sets: Vec<MatchupSet>,
}

impl MatchupCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, set: MatchupSet) {
        self.sets.push(set);
    }

    /// Append all the sets of another collection.
    pub fn merge(&mut self, other: MatchupCollection) {
        self.sets.extend(other.sets);
    }

    pub fn sets(&self) -> &[MatchupSet] {
        &self.sets
    }

    pub fn sets_mut(&mut self) -> &mut Vec<MatchupSet> {
        &mut self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// The total number of sample sets over all the matchup sets.
    pub fn num_matchups(&self) -> usize {
        self.sets.iter().map(|s| s.num_observations()).sum()
    }
}
