/*!
 * Filters applied to matchup sets after the sample sets are assembled.
 */
use crate::{
    geometry::great_circle_distance,
    sample::{MatchupCollection, MatchupSet, Sample, SampleSet},
};
use chrono::Duration;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// A filter that removes sample sets from a matchup set.
pub trait Condition {
    fn apply(&self, matchup_set: &mut MatchupSet, sizes: &ProductSizes);
}

/// Pixel dimensions, (width, height), of the products read during a run keyed by file path.
#[derive(Debug, Clone, Default)]
pub struct ProductSizes {
    sizes: FxHashMap<PathBuf, (usize, usize)>,
}

impl ProductSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: AsRef<Path>>(&mut self, path: P, size: (usize, usize)) {
        self.sizes.insert(path.as_ref().to_owned(), size);
    }

    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<(usize, usize)> {
        self.sizes.get(path.as_ref()).copied()
    }
}

/// Replace the sample sets of a matchup set with those passing the test.
fn retain_sample_sets<F>(matchup_set: &mut MatchupSet, name: &str, keep: F)
where
    F: Fn(&SampleSet) -> bool,
{
    let before = matchup_set.num_observations();

    let kept: Vec<SampleSet> = matchup_set
        .sample_sets()
        .iter()
        .filter(|s| keep(s))
        .cloned()
        .collect();
    matchup_set.set_sample_sets(kept);

    log::debug!(
        "{} condition kept {} of {} sample sets.",
        name,
        matchup_set.num_observations(),
        before
    );
}

/**
 * Keeps sample sets whose secondary samples were observed close enough in time to the primary.
 *
 * Optionally the secondary samples must also be close enough in time to each other. A sample set
 * missing one of the secondary sensors is removed.
 */
#[derive(Debug, Clone)]
pub struct TimeDeltaCondition {
    max_time_delta: Duration,
    secondary_sensor_names: Vec<String>,
    primary_check: bool,
    secondary_check: bool,
}

impl TimeDeltaCondition {
    pub fn new<S: AsRef<str>>(max_time_delta: Duration, secondary_sensor_names: &[S]) -> Self {
        TimeDeltaCondition {
            max_time_delta,
            secondary_sensor_names: secondary_sensor_names
                .iter()
                .map(|s| s.as_ref().to_owned())
                .collect(),
            primary_check: true,
            secondary_check: false,
        }
    }

    pub fn with_primary_check(mut self, primary_check: bool) -> Self {
        self.primary_check = primary_check;
        self
    }

    pub fn with_secondary_check(mut self, secondary_check: bool) -> Self {
        self.secondary_check = secondary_check;
        self
    }

    pub fn max_time_delta(&self) -> Duration {
        self.max_time_delta
    }

    fn is_valid(&self, sample_set: &SampleSet) -> bool {
        let secondaries: Option<Vec<&Sample>> = self
            .secondary_sensor_names
            .iter()
            .map(|name| sample_set.secondary(name).map(|s| &**s))
            .collect();

        let secondaries = match secondaries {
            Some(secondaries) => secondaries,
            None => return false,
        };

        if self.primary_check {
            let primary = sample_set.primary();
            if secondaries.iter().any(|s| !self.close_enough(primary, s)) {
                return false;
            }
        }

        if self.secondary_check {
            for (i, left) in secondaries.iter().enumerate() {
                if secondaries[i + 1..]
                    .iter()
                    .any(|right| !self.close_enough(left, right))
                {
                    return false;
                }
            }
        }

        true
    }

    fn close_enough(&self, left: &Sample, right: &Sample) -> bool {
        let delta = left.time - right.time;
        delta.num_milliseconds().abs() <= self.max_time_delta.num_milliseconds()
    }
}

impl Condition for TimeDeltaCondition {
    fn apply(&self, matchup_set: &mut MatchupSet, _sizes: &ProductSizes) {
        retain_sample_sets(matchup_set, "Time delta", |s| self.is_valid(s));
    }
}

/**
 * Removes samples too close to the border of their product.
 *
 * A pixel is kept when it lies at least `nx` columns from the left and right edge and `ny` rows
 * from the top and bottom edge. Products whose size is unknown are not checked.
 */
#[derive(Debug, Clone)]
pub struct BorderDistanceCondition {
    nx: i32,
    ny: i32,
    check_primary: bool,
    secondary_sensor_names: Vec<String>,
}

impl BorderDistanceCondition {
    pub fn new(nx: i32, ny: i32) -> Self {
        BorderDistanceCondition {
            nx,
            ny,
            check_primary: true,
            secondary_sensor_names: vec![],
        }
    }

    pub fn with_primary_check(mut self, check_primary: bool) -> Self {
        self.check_primary = check_primary;
        self
    }

    pub fn with_secondaries<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.secondary_sensor_names = names.iter().map(|s| s.as_ref().to_owned()).collect();
        self
    }

    fn inside(&self, sample: &Sample, size: Option<(usize, usize)>) -> bool {
        let (width, height) = match size {
            Some((w, h)) => (w as i64, h as i64),
            None => return true,
        };
        let (x, y) = (i64::from(sample.x), i64::from(sample.y));
        let (nx, ny) = (i64::from(self.nx), i64::from(self.ny));

        x >= nx && x < width - nx && y >= ny && y < height - ny
    }
}

impl Condition for BorderDistanceCondition {
    fn apply(&self, matchup_set: &mut MatchupSet, sizes: &ProductSizes) {
        let primary_size = sizes.get(matchup_set.primary_path());
        let secondary_sizes: Vec<(&str, Option<(usize, usize)>)> = self
            .secondary_sensor_names
            .iter()
            .map(|name| {
                let size = matchup_set
                    .secondary_path(name)
                    .and_then(|path| sizes.get(path));
                (name.as_str(), size)
            })
            .collect();

        retain_sample_sets(matchup_set, "Border distance", |set| {
            if self.check_primary && !self.inside(set.primary(), primary_size) {
                return false;
            }
            secondary_sizes
                .iter()
                .all(|(name, size)| match set.secondary(name) {
                    Some(sample) => self.inside(sample, *size),
                    None => true,
                })
        });
    }
}

/// Which sample of a sample set a condition looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleRole {
    Primary,
    Secondary(String),
}

impl SampleRole {
    pub fn secondary(sensor_name: &str) -> Self {
        SampleRole::Secondary(sensor_name.to_owned())
    }

    fn sample<'a>(&self, set: &'a SampleSet) -> Option<&'a Sample> {
        match self {
            SampleRole::Primary => Some(set.primary()),
            SampleRole::Secondary(name) => set.secondary(name).map(|s| &**s),
        }
    }
}

/// Keeps sample sets whose secondary pixels are all within a distance of the primary pixel.
#[derive(Debug, Clone)]
pub struct DistanceCondition {
    max_distance_km: f64,
}

impl DistanceCondition {
    pub fn new(max_distance_km: f64) -> Self {
        DistanceCondition { max_distance_km }
    }

    fn is_valid(&self, set: &SampleSet) -> bool {
        let primary = set.primary();
        set.secondaries().all(|(_, s)| {
            great_circle_distance(primary.lat, primary.lon, s.lat, s.lon) <= self.max_distance_km
        })
    }
}

impl Condition for DistanceCondition {
    fn apply(&self, matchup_set: &mut MatchupSet, _sizes: &ProductSizes) {
        retain_sample_sets(matchup_set, "Distance", |s| self.is_valid(s));
    }
}

/**
 * Keeps one sample set per reference pixel.
 *
 * Sample sets are grouped by the (x, y) of their reference sample, groups in order of first
 * occurrence. Of each group the set whose associated sample is closest to the reference sample is
 * kept, the first one on a tie. Sets missing either sample are removed.
 */
#[derive(Debug, Clone)]
pub struct UniqueSamplesCondition {
    reference: SampleRole,
    associated: SampleRole,
}

impl UniqueSamplesCondition {
    pub fn new(reference: SampleRole, associated: SampleRole) -> Self {
        UniqueSamplesCondition {
            reference,
            associated,
        }
    }
}

impl Condition for UniqueSamplesCondition {
    fn apply(&self, matchup_set: &mut MatchupSet, _sizes: &ProductSizes) {
        let before = matchup_set.num_observations();

        // Per reference pixel, the best set so far and the distance of its associated sample.
        let mut best: Vec<((i32, i32), f64, &SampleSet)> = vec![];
        for set in matchup_set.sample_sets() {
            let (reference, associated) =
                match (self.reference.sample(set), self.associated.sample(set)) {
                    (Some(r), Some(a)) => (r, a),
                    _ => continue,
                };

            let key = (reference.x, reference.y);
            let distance =
                great_circle_distance(reference.lat, reference.lon, associated.lat, associated.lon);

            match best.iter_mut().find(|(k, _, _)| *k == key) {
                Some(entry) if distance < entry.1 => *entry = (key, distance, set),
                Some(_) => {}
                None => best.push((key, distance, set)),
            }
        }

        let kept: Vec<SampleSet> = best.into_iter().map(|(_, _, set)| set.clone()).collect();
        matchup_set.set_sample_sets(kept);

        log::debug!(
            "Unique samples condition kept {} of {} sample sets.",
            matchup_set.num_observations(),
            before
        );
    }
}

/**
 * Removes sample sets whose reference pixel is too close to the pixel of an earlier kept set.
 *
 * Pixels at most `nx` columns and `ny` rows apart overlap, so (0, 0) only removes duplicates.
 */
#[derive(Debug, Clone)]
pub struct OverlapRemoveCondition {
    nx: i32,
    ny: i32,
    reference: SampleRole,
}

impl OverlapRemoveCondition {
    pub fn new(nx: i32, ny: i32) -> Self {
        OverlapRemoveCondition {
            nx,
            ny,
            reference: SampleRole::Primary,
        }
    }

    pub fn with_reference(mut self, reference: SampleRole) -> Self {
        self.reference = reference;
        self
    }
}

impl Condition for OverlapRemoveCondition {
    fn apply(&self, matchup_set: &mut MatchupSet, _sizes: &ProductSizes) {
        let before = matchup_set.num_observations();

        let mut taken: Vec<(i32, i32)> = vec![];
        let mut kept: Vec<SampleSet> = vec![];
        for set in matchup_set.sample_sets() {
            let sample = match self.reference.sample(set) {
                Some(sample) => sample,
                None => continue,
            };

            let overlaps = taken
                .iter()
                .any(|(x, y)| (x - sample.x).abs() <= self.nx && (y - sample.y).abs() <= self.ny);
            if !overlaps {
                taken.push((sample.x, sample.y));
                kept.push(set.clone());
            }
        }
        matchup_set.set_sample_sets(kept);

        log::debug!(
            "Overlap remove condition kept {} of {} sample sets.",
            matchup_set.num_observations(),
            before
        );
    }
}

/// Applies a list of conditions, in order, to every matchup set of a collection.
#[derive(Default)]
pub struct ConditionEngine {
    conditions: Vec<Box<dyn Condition + Send + Sync>>,
}

impl ConditionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, condition: Box<dyn Condition + Send + Sync>) {
        self.conditions.push(condition);
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Apply the conditions and remove matchup sets left without any sample sets.
    pub fn process(&self, collection: &mut MatchupCollection, sizes: &ProductSizes) {
        for set in collection.sets_mut().iter_mut() {
            for condition in &self.conditions {
                condition.apply(set, sizes);
            }
        }

        collection.sets_mut().retain(|s| s.num_observations() > 0);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sample::SecondaryFile;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn sample(secs: i64) -> Arc<Sample> {
        Arc::new(Sample::new(0, 0, 0.0, 0.0, at(secs)))
    }

    fn sample_set(primary: i64, secondaries: &[(&str, i64)]) -> SampleSet {
        let mut set = SampleSet::new(sample(primary));
        for (name, secs) in secondaries {
            set.set_secondary(name, sample(*secs));
        }
        set
    }

    fn matchup_set(sets: Vec<SampleSet>) -> MatchupSet {
        let mut matchup_set = MatchupSet::new("primary.dat", "1.0");
        matchup_set.set_sample_sets(sets);
        matchup_set
    }

    #[test]
    fn test_primary_check() {
        let condition = TimeDeltaCondition::new(Duration::seconds(100), &["amsub"]);
        let mut set = matchup_set(vec![
            sample_set(0, &[("amsub", 100)]),
            sample_set(0, &[("amsub", 101)]),
            sample_set(200, &[("amsub", 100)]),
            sample_set(200, &[("amsub", 99)]),
        ]);

        condition.apply(&mut set, &ProductSizes::new());

        assert_eq!(set.num_observations(), 2);
        assert_eq!(set.sample_sets()[0].secondary("amsub").unwrap().time, at(100));
        assert_eq!(set.sample_sets()[1].primary().time, at(200));
    }

    #[test]
    fn test_secondary_check() {
        let names = ["amsub", "mhs"];
        let sets = || {
            vec![
                sample_set(50, &[("amsub", 0), ("mhs", 100)]),
                sample_set(50, &[("amsub", 0), ("mhs", 101)]),
            ]
        };

        let condition = TimeDeltaCondition::new(Duration::seconds(60), &names);
        let mut set = matchup_set(sets());
        condition.apply(&mut set, &ProductSizes::new());
        assert_eq!(set.num_observations(), 2);

        let condition = condition.with_secondary_check(true).with_primary_check(false);
        let mut set = matchup_set(sets());
        condition.apply(&mut set, &ProductSizes::new());
        assert_eq!(set.num_observations(), 0);

        let condition = TimeDeltaCondition::new(Duration::seconds(100), &names)
            .with_secondary_check(true);
        let mut set = matchup_set(sets());
        condition.apply(&mut set, &ProductSizes::new());
        assert_eq!(set.num_observations(), 1);
    }

    #[test]
    fn test_missing_secondary_is_removed() {
        let condition = TimeDeltaCondition::new(Duration::seconds(100), &["amsub", "mhs"]);
        let mut set = matchup_set(vec![sample_set(0, &[("amsub", 0)])]);

        condition.apply(&mut set, &ProductSizes::new());
        assert_eq!(set.num_observations(), 0);
    }

    #[test]
    fn test_engine_drops_empty_sets() {
        let mut engine = ConditionEngine::new();
        engine.add(Box::new(TimeDeltaCondition::new(
            Duration::seconds(10),
            &["amsub"],
        )));

        let mut collection = MatchupCollection::new();
        collection.add(matchup_set(vec![sample_set(0, &[("amsub", 5)])]));
        collection.add(matchup_set(vec![sample_set(0, &[("amsub", 500)])]));

        engine.process(&mut collection, &ProductSizes::new());
        assert_eq!(collection.sets().len(), 1);
        assert_eq!(collection.num_matchups(), 1);
    }

    fn pixel(x: i32, y: i32, lon: f64, lat: f64) -> Arc<Sample> {
        Arc::new(Sample::new(x, y, lon, lat, at(0)))
    }

    fn pixel_set(primary: Arc<Sample>, secondaries: &[(&str, Arc<Sample>)]) -> SampleSet {
        let mut set = SampleSet::new(primary);
        for (name, sample) in secondaries {
            set.set_secondary(name, Arc::clone(sample));
        }
        set
    }

    fn primary_pixels(set: &MatchupSet) -> Vec<(i32, i32)> {
        set.sample_sets()
            .iter()
            .map(|s| (s.primary().x, s.primary().y))
            .collect()
    }

    #[test]
    fn test_border_distance() {
        let mut set = MatchupSet::new("primary.dat", "1.0");
        set.set_secondary_file(
            "mhs",
            SecondaryFile {
                path: "mhs.dat".into(),
                version: "1.0".to_owned(),
            },
        );
        set.set_sample_sets(vec![
            pixel_set(pixel(0, 5, 0.0, 0.0), &[("mhs", pixel(5, 5, 0.0, 0.0))]),
            pixel_set(pixel(2, 5, 0.0, 0.0), &[("mhs", pixel(5, 5, 0.0, 0.0))]),
            pixel_set(pixel(7, 5, 0.0, 0.0), &[("mhs", pixel(5, 5, 0.0, 0.0))]),
            pixel_set(pixel(3, 3, 0.0, 0.0), &[("mhs", pixel(5, 8, 0.0, 0.0))]),
            pixel_set(pixel(3, 3, 0.0, 0.0), &[("mhs", pixel(5, 7, 0.0, 0.0))]),
        ]);

        let mut sizes = ProductSizes::new();
        sizes.insert("primary.dat", (10, 10));
        sizes.insert("mhs.dat", (10, 10));

        let condition = BorderDistanceCondition::new(2, 2).with_secondaries(&["mhs"]);
        condition.apply(&mut set, &sizes);

        // Columns 2..=7 and rows 2..=7 are far enough from the border.
        assert_eq!(primary_pixels(&set), vec![(2, 5), (7, 5), (3, 3)]);
        assert_eq!(set.sample_sets()[2].secondary("mhs").unwrap().y, 7);
    }

    #[test]
    fn test_border_distance_unknown_size() {
        let mut set = matchup_set(vec![pixel_set(pixel(0, 0, 0.0, 0.0), &[])]);

        let condition = BorderDistanceCondition::new(3, 3);
        condition.apply(&mut set, &ProductSizes::new());
        assert_eq!(set.num_observations(), 1);

        let mut sizes = ProductSizes::new();
        sizes.insert("primary.dat", (90, 1000));
        condition.apply(&mut set, &sizes);
        assert_eq!(set.num_observations(), 0);
    }

    #[test]
    fn test_distance() {
        let mut set = matchup_set(vec![
            pixel_set(pixel(0, 0, 0.0, 0.0), &[("mhs", pixel(0, 0, 0.0, 0.05))]),
            pixel_set(pixel(1, 0, 0.0, 0.0), &[("mhs", pixel(0, 0, 0.0, 0.5))]),
            pixel_set(
                pixel(2, 0, 179.99, 0.0),
                &[("mhs", pixel(0, 0, -179.99, 0.0))],
            ),
        ]);

        DistanceCondition::new(10.0).apply(&mut set, &ProductSizes::new());
        assert_eq!(primary_pixels(&set), vec![(0, 0), (2, 0)]);
    }

    #[test]
    fn test_unique_samples_primary_reference() {
        let mut set = matchup_set(vec![
            pixel_set(pixel(4, 4, 10.0, 10.0), &[("mhs", pixel(0, 0, 10.2, 10.0))]),
            pixel_set(pixel(5, 5, 11.0, 10.0), &[("mhs", pixel(1, 0, 11.0, 10.0))]),
            pixel_set(pixel(4, 4, 10.0, 10.0), &[("mhs", pixel(0, 1, 10.1, 10.0))]),
            pixel_set(pixel(4, 4, 10.0, 10.0), &[("mhs", pixel(0, 2, 10.3, 10.0))]),
            pixel_set(pixel(6, 6, 12.0, 10.0), &[]),
        ]);

        let condition =
            UniqueSamplesCondition::new(SampleRole::Primary, SampleRole::secondary("mhs"));
        condition.apply(&mut set, &ProductSizes::new());

        assert_eq!(primary_pixels(&set), vec![(4, 4), (5, 5)]);
        assert_eq!(set.sample_sets()[0].secondary("mhs").unwrap().y, 1);
    }

    #[test]
    fn test_unique_samples_secondary_reference() {
        let mut set = matchup_set(vec![
            pixel_set(pixel(0, 0, 10.3, 10.0), &[("mhs", pixel(7, 7, 10.0, 10.0))]),
            pixel_set(pixel(0, 1, 10.1, 10.0), &[("mhs", pixel(7, 7, 10.0, 10.0))]),
            pixel_set(pixel(0, 2, 10.0, 10.0), &[("mhs", pixel(8, 7, 10.0, 10.0))]),
        ]);

        let condition =
            UniqueSamplesCondition::new(SampleRole::secondary("mhs"), SampleRole::Primary);
        condition.apply(&mut set, &ProductSizes::new());

        assert_eq!(primary_pixels(&set), vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn test_overlap_remove() {
        let sets = || {
            vec![
                pixel_set(pixel(10, 10, 0.0, 0.0), &[("mhs", pixel(0, 0, 0.0, 0.0))]),
                pixel_set(pixel(10, 10, 0.0, 0.0), &[("mhs", pixel(1, 0, 0.0, 0.0))]),
                pixel_set(pixel(12, 11, 0.0, 0.0), &[("mhs", pixel(2, 0, 0.0, 0.0))]),
                pixel_set(pixel(13, 10, 0.0, 0.0), &[("mhs", pixel(3, 0, 0.0, 0.0))]),
                pixel_set(pixel(10, 14, 0.0, 0.0), &[("mhs", pixel(4, 0, 0.0, 0.0))]),
            ]
        };

        let mut set = matchup_set(sets());
        OverlapRemoveCondition::new(0, 0).apply(&mut set, &ProductSizes::new());
        assert_eq!(set.num_observations(), 4);

        let mut set = matchup_set(sets());
        OverlapRemoveCondition::new(2, 2).apply(&mut set, &ProductSizes::new());
        assert_eq!(primary_pixels(&set), vec![(10, 10), (13, 10), (10, 14)]);

        let mut set = matchup_set(sets());
        OverlapRemoveCondition::new(1, 1)
            .with_reference(SampleRole::secondary("mhs"))
            .apply(&mut set, &ProductSizes::new());
        assert_eq!(primary_pixels(&set), vec![(10, 10), (12, 11), (10, 14)]);
    }
}
