/*!
 * Expanding the samples found for a primary file into every combination of secondary samples.
 */
use crate::{
    error::{MatchupError, MatchupResult},
    observation::SatelliteObservation,
    sample::{MatchupCollection, MatchupSet, Sample, SampleSet, SecondaryFile},
};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::{path::PathBuf, sync::Arc};

/**
 * Receives samples one at a time and builds the matchup sets for them.
 *
 * Samples are received per primary file. First the primary file is set, then for each primary
 * pixel the primary sample followed by any number of secondary samples from any of the declared
 * secondary sensors. When the primary file changes, every primary pixel that has at least one
 * secondary sample of every declared sensor is expanded into all the combinations of those
 * secondary samples.
 *
 * Sample sets are grouped into matchup sets by the secondary files they came from.
 */
pub struct SampleReceiverPermutator {
    sensor_names: Vec<String>,
    primary: Option<(PathBuf, String)>,
    files: Vec<SecondaryFile>,
    file_index: FxHashMap<SecondaryFile, usize>,
    buckets: Vec<PrimaryBucket>,
    bucket_index: FxHashMap<SampleKey, usize>,
    current_bucket: Option<usize>,
    collection: MatchupCollection,
}

impl SampleReceiverPermutator {
    /// The order of the names is the order secondary samples are combined in.
    pub fn new<S: AsRef<str>>(secondary_sensor_names: &[S]) -> Self {
        SampleReceiverPermutator {
            sensor_names: secondary_sensor_names
                .iter()
                .map(|s| s.as_ref().to_owned())
                .collect(),
            primary: None,
            files: vec![],
            file_index: FxHashMap::default(),
            buckets: vec![],
            bucket_index: FxHashMap::default(),
            current_bucket: None,
            collection: MatchupCollection::new(),
        }
    }

    /// Finish the previous primary file and start collecting for a new one.
    pub fn set_current_primary(&mut self, observation: &SatelliteObservation) {
        self.flush();
        self.primary = Some((
            observation.data_file_path().to_path_buf(),
            observation.version().to_owned(),
        ));
    }

    /**
     * Open the bucket for a primary pixel, following secondary samples are added to it.
     *
     * A sample equal to one set earlier for the same primary file reopens the earlier bucket, and
     * the instance set first stays the primary sample of that bucket.
     */
    pub fn set_primary_sample(&mut self, sample: Arc<Sample>) -> MatchupResult<()> {
        if self.primary.is_none() {
            return Err(MatchupError::Configuration(
                "No primary observation set.".to_owned(),
            ));
        }

        let key = SampleKey::from(&*sample);
        let num_sensors = self.sensor_names.len();
        let buckets = &mut self.buckets;

        let idx = *self.bucket_index.entry(key).or_insert_with(|| {
            buckets.push(PrimaryBucket {
                primary: sample,
                candidates: vec![vec![]; num_sensors],
            });
            buckets.len() - 1
        });

        self.current_bucket = Some(idx);
        Ok(())
    }

    /// Add a candidate for the open primary pixel, `None` means the sensor had no match.
    pub fn add_secondary_sample(
        &mut self,
        observation: &SatelliteObservation,
        sample: Option<Arc<Sample>>,
    ) -> MatchupResult<()> {
        let sensor = self
            .sensor_names
            .iter()
            .position(|name| name == observation.sensor().name())
            .ok_or_else(|| {
                MatchupError::Configuration("Illegal secondary sensor type.".to_owned())
            })?;

        let bucket = self
            .current_bucket
            .ok_or_else(|| MatchupError::Configuration("No primary sample set.".to_owned()))?;

        let sample = match sample {
            Some(sample) => sample,
            None => return Ok(()),
        };

        let file = SecondaryFile {
            path: observation.data_file_path().to_path_buf(),
            version: observation.version().to_owned(),
        };
        let files = &mut self.files;
        let file = *self.file_index.entry(file.clone()).or_insert_with(|| {
            files.push(file);
            files.len() - 1
        });

        self.buckets[bucket].candidates[sensor].push(Candidate { file, sample });
        Ok(())
    }

    /// Finish the current primary file and hand over everything collected.
    pub fn permutations(&mut self) -> MatchupCollection {
        self.flush();
        std::mem::take(&mut self.collection)
    }

    /// The matchup sets of the primary files finished so far.
    pub fn matchup_collection(&self) -> &MatchupCollection {
        &self.collection
    }

    fn flush(&mut self) {
        let buckets = std::mem::take(&mut self.buckets);
        self.bucket_index.clear();
        self.current_bucket = None;

        let (primary_path, primary_version) = match &self.primary {
            Some(primary) => primary,
            None => return,
        };

        let mut groups: Vec<MatchupSet> = vec![];
        let mut group_index: FxHashMap<Vec<usize>, usize> = FxHashMap::default();

        for bucket in buckets {
            if bucket.candidates.iter().any(|c| c.is_empty()) {
                continue;
            }

            for combination in Combinations::new(&bucket.candidates) {
                let files: Vec<usize> = combination.iter().map(|c| c.file).collect();

                let group = match group_index.get(&files) {
                    Some(&group) => group,
                    None => {
                        let mut set = MatchupSet::new(primary_path, primary_version);
                        for (name, &file) in self.sensor_names.iter().zip(&files) {
                            set.set_secondary_file(name, self.files[file].clone());
                        }
                        groups.push(set);
                        group_index.insert(files, groups.len() - 1);
                        groups.len() - 1
                    }
                };

                let mut sample_set = SampleSet::new(Arc::clone(&bucket.primary));
                for (name, candidate) in self.sensor_names.iter().zip(&combination) {
                    sample_set.set_secondary(name, Arc::clone(&candidate.sample));
                }
                groups[group].add_sample_set(sample_set);
            }
        }

        for group in groups {
            self.collection.add(group);
        }

        self.files.clear();
        self.file_index.clear();
    }
}

/// Identifies a primary pixel by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SampleKey {
    x: i32,
    y: i32,
    lon_bits: u64,
    lat_bits: u64,
    time: DateTime<Utc>,
}

impl From<&Sample> for SampleKey {
    fn from(sample: &Sample) -> Self {
        SampleKey {
            x: sample.x,
            y: sample.y,
            lon_bits: sample.lon.to_bits(),
            lat_bits: sample.lat.to_bits(),
            time: sample.time,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    file: usize,
    sample: Arc<Sample>,
}

struct PrimaryBucket {
    primary: Arc<Sample>,
    /// One list per declared secondary sensor, in declaration order.
    candidates: Vec<Vec<Candidate>>,
}

/// Cartesian product of the candidate lists, the last list varies fastest.
struct Combinations<'a> {
    lists: &'a [Vec<Candidate>],
    indexes: Vec<usize>,
    done: bool,
}

impl<'a> Combinations<'a> {
    fn new(lists: &'a [Vec<Candidate>]) -> Self {
        Combinations {
            lists,
            indexes: vec![0; lists.len()],
            done: lists.is_empty() || lists.iter().any(|l| l.is_empty()),
        }
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Vec<&'a Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let lists = self.lists;
        let item = self
            .indexes
            .iter()
            .zip(lists)
            .map(|(&i, list)| &list[i])
            .collect();

        // Advance like an odometer.
        self.done = true;
        for pos in (0..self.indexes.len()).rev() {
            self.indexes[pos] += 1;
            if self.indexes[pos] < lists[pos].len() {
                self.done = false;
                break;
            }
            self.indexes[pos] = 0;
        }

        Some(item)
    }
}
