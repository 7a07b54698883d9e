use super::TimeLocator;
use crate::error::{MatchupError, MatchupResult};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/**
 * Scan times stored as seconds since 1993-01-01T00:00:00Z, with several scanlines per scan.
 *
 * All scanlines of a scan share its time.
 */
#[derive(Debug, Clone)]
pub struct TimeLocatorTai1993Scan {
    seconds: Vec<f64>,
    lines_per_scan: i32,
}

impl TimeLocatorTai1993Scan {
    pub fn new(seconds_since_1993: Vec<f64>, lines_per_scan: i32) -> MatchupResult<Self> {
        if lines_per_scan < 1 {
            return Err(MatchupError::Configuration(format!(
                "Lines per scan must be positive, found {}.",
                lines_per_scan
            )));
        }

        Ok(TimeLocatorTai1993Scan {
            seconds: seconds_since_1993,
            lines_per_scan,
        })
    }
}

impl TimeLocator for TimeLocatorTai1993Scan {
    fn time_for(&self, _x: i32, y: i32) -> MatchupResult<DateTime<Utc>> {
        let scan = if y >= 0 {
            (y / self.lines_per_scan) as usize
        } else {
            usize::MAX
        };

        let seconds = self.seconds.get(scan).ok_or_else(|| {
            MatchupError::LocatorRange(format!(
                "Scanline {} is outside the {} scans of the product.",
                y,
                self.seconds.len()
            ))
        })?;

        let reference = Utc
            .with_ymd_and_hms(1993, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| MatchupError::LocatorRange("Invalid TAI 1993 reference.".to_owned()))?;

        let millis = (seconds * 1000.0).round();
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return Err(invalid_scan_time(*seconds));
        }

        Duration::try_milliseconds(millis as i64)
            .and_then(|offset| reference.checked_add_signed(offset))
            .ok_or_else(|| invalid_scan_time(*seconds))
    }
}

fn invalid_scan_time(seconds: f64) -> MatchupError {
    MatchupError::Parse(format!("Scan time {} s since 1993 is out of range.", seconds))
}

/// Scanline times stored as year, day of year and milliseconds of the day.
#[derive(Debug, Clone)]
pub struct TimeLocatorYearDoyMs {
    years: Vec<i32>,
    doys: Vec<i32>,
    millis: Vec<i32>,
}

impl TimeLocatorYearDoyMs {
    pub fn new(years: Vec<i32>, doys: Vec<i32>, millis: Vec<i32>) -> MatchupResult<Self> {
        if years.len() != doys.len() || years.len() != millis.len() {
            return Err(MatchupError::LocatorRange(format!(
                "Time arrays differ in length: {} years, {} days of year, {} milliseconds.",
                years.len(),
                doys.len(),
                millis.len()
            )));
        }

        Ok(TimeLocatorYearDoyMs {
            years,
            doys,
            millis,
        })
    }

    /// Build the locator from one timestamp per scanline, truncated to milliseconds.
    pub fn from_times(times: &[DateTime<Utc>]) -> Self {
        let years = times.iter().map(|t| t.year()).collect();
        let doys = times.iter().map(|t| t.ordinal() as i32).collect();
        let millis = times
            .iter()
            .map(|t| {
                (t.num_seconds_from_midnight() * 1000 + t.timestamp_subsec_millis().min(999)) as i32
            })
            .collect();

        TimeLocatorYearDoyMs {
            years,
            doys,
            millis,
        }
    }
}

impl TimeLocator for TimeLocatorYearDoyMs {
    fn time_for(&self, _x: i32, y: i32) -> MatchupResult<DateTime<Utc>> {
        if y < 0 || y as usize >= self.years.len() {
            return Err(MatchupError::LocatorRange(format!(
                "Scanline {} is outside the {} scanlines of the product.",
                y,
                self.years.len()
            )));
        }
        let y = y as usize;

        let jan_first = Utc
            .with_ymd_and_hms(self.years[y], 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| {
                MatchupError::LocatorRange(format!("Invalid year {}.", self.years[y]))
            })?;

        Duration::try_days(i64::from(self.doys[y]) - 1)
            .zip(Duration::try_milliseconds(i64::from(self.millis[y])))
            .and_then(|(days, millis)| jan_first.checked_add_signed(days + millis))
            .ok_or_else(|| {
                MatchupError::Parse(format!(
                    "Scanline time {}-{} {} ms is out of range.",
                    self.years[y], self.doys[y], self.millis[y]
                ))
            })
    }
}
