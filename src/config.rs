/*!
 * Settings for a matchup run.
 */
use crate::{
    error::{MatchupError, MatchupResult},
    observation::{Interval, Sensor},
    time_axis::TimeInterval,
};
use chrono::{DateTime, Duration, Utc};
use std::fmt::{self, Display};

/// Number of times an outline may be split when looking for valid polygons.
pub const DEFAULT_MAX_SPLITS: usize = 8;

/// Everything needed to run a matchup strategy, apart from the data.
#[derive(Debug, Clone)]
pub struct MatchupConfig {
    pub primary: Sensor,
    /// The order here is the order of the sensors in every sample set.
    pub secondaries: Vec<Sensor>,
    /// The largest allowed time difference between a primary and a secondary sample.
    pub time_delta: Duration,
    pub sampling_interval: Interval,
    pub max_splits: usize,
    /// Processing window for the primary observations.
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Also require the secondary samples to be close in time to each other.
    pub secondary_check: bool,
    /// Minimum distance of a pixel to its product border, (columns, rows).
    pub border_distance: Option<(i32, i32)>,
    /// Largest allowed distance between the primary and a secondary pixel in kilometers.
    pub max_pixel_distance_km: Option<f64>,
    /// Keep one sample set per pixel of this sensor.
    pub unique_samples: Option<Sensor>,
    /// Remove sample sets whose primary pixels are at most (columns, rows) apart.
    pub overlap_distance: Option<(i32, i32)>,
}

impl MatchupConfig {
    pub fn new(
        primary: Sensor,
        secondaries: Vec<Sensor>,
        time_delta: Duration,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        MatchupConfig {
            primary,
            secondaries,
            time_delta,
            sampling_interval: Interval::default(),
            max_splits: DEFAULT_MAX_SPLITS,
            start,
            end,
            secondary_check: false,
            border_distance: None,
            max_pixel_distance_km: None,
            unique_samples: None,
            overlap_distance: None,
        }
    }

    pub fn with_sampling_interval(mut self, interval: Interval) -> Self {
        self.sampling_interval = interval;
        self
    }

    pub fn with_max_splits(mut self, max_splits: usize) -> Self {
        self.max_splits = max_splits;
        self
    }

    pub fn with_secondary_check(mut self, secondary_check: bool) -> Self {
        self.secondary_check = secondary_check;
        self
    }

    pub fn with_border_distance(mut self, nx: i32, ny: i32) -> Self {
        self.border_distance = Some((nx, ny));
        self
    }

    pub fn with_max_pixel_distance_km(mut self, distance: f64) -> Self {
        self.max_pixel_distance_km = Some(distance);
        self
    }

    pub fn with_unique_samples(mut self, reference: Sensor) -> Self {
        self.unique_samples = Some(reference);
        self
    }

    pub fn with_overlap_distance(mut self, nx: i32, ny: i32) -> Self {
        self.overlap_distance = Some((nx, ny));
        self
    }

    pub fn secondary_names(&self) -> Vec<&str> {
        self.secondaries.iter().map(|s| s.name()).collect()
    }

    pub fn processing_window(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }

    /// Check the settings make sense together.
    pub fn validate(&self) -> MatchupResult<()> {
        if self.secondaries.is_empty() {
            return Err(configuration("At least one secondary sensor is needed."));
        }

        let mut names = vec![self.primary.name()];
        for sensor in &self.secondaries {
            if names.contains(&sensor.name()) {
                return Err(configuration(&format!(
                    "Sensor '{}' is used more than once.",
                    sensor.name()
                )));
            }
            names.push(sensor.name());
        }

        if self.time_delta < Duration::zero() {
            return Err(configuration("The time delta must not be negative."));
        }

        if self.max_splits == 0 {
            return Err(configuration("The number of splits must be at least 1."));
        }

        if self.end < self.start {
            return Err(configuration("The processing end is before its start."));
        }

        let pixel_counts = [self.border_distance, self.overlap_distance];
        if pixel_counts.iter().flatten().any(|(nx, ny)| *nx < 0 || *ny < 0) {
            return Err(configuration("Pixel distances must not be negative."));
        }

        if let Some(distance) = self.max_pixel_distance_km {
            if !distance.is_finite() || distance < 0.0 {
                return Err(configuration(
                    "The pixel distance must be a non-negative number of kilometers.",
                ));
            }
        }

        if let Some(reference) = &self.unique_samples {
            if !names.contains(&reference.name()) {
                return Err(configuration(&format!(
                    "Unique samples reference '{}' is not a configured sensor.",
                    reference.name()
                )));
            }
        }

        Ok(())
    }
}

fn configuration(msg: &str) -> MatchupError {
    MatchupError::Configuration(msg.to_owned())
}

impl Display for MatchupConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  Primary: {}", self.primary)?;
        let secondaries: Vec<String> = self.secondaries.iter().map(|s| s.to_string()).collect();
        writeln!(f, "  Secondaries: {}", secondaries.join(", "))?;
        writeln!(f, "  Time delta: {} s", self.time_delta.num_seconds())?;
        writeln!(
            f,
            "  Sampling interval: {} x {}",
            self.sampling_interval.x(),
            self.sampling_interval.y()
        )?;
        writeln!(f, "  Max splits: {}", self.max_splits)?;
        writeln!(f, "  Window: {} - {}", self.start, self.end)?;
        write!(f, "  Secondary check: {}", self.secondary_check)?;
        if let Some((nx, ny)) = self.border_distance {
            write!(f, "\n  Border distance: {} x {}", nx, ny)?;
        }
        if let Some(distance) = self.max_pixel_distance_km {
            write!(f, "\n  Max pixel distance: {} km", distance)?;
        }
        if let Some(reference) = &self.unique_samples {
            write!(f, "\n  Unique samples of: {}", reference)?;
        }
        if let Some((nx, ny)) = self.overlap_distance {
            write!(f, "\n  Overlap distance: {} x {}", nx, ny)?;
        }
        Ok(())
    }
}
