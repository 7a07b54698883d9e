/*! Mapping geographic positions to acquisition times along the center line of a swath. */
use chrono::{DateTime, Duration, Utc};
use geo::{Coord, LineString};
use std::fmt::{self, Display};

/** A closed interval in time. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
}

impl Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "[{} - {}]", self.start, self.stop)
    }
}

impl TimeInterval {
    /// Create a new interval, the end points are swapped if they are out of order.
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        if stop < start {
            TimeInterval {
                start: stop,
                stop: start,
            }
        } else {
            TimeInterval { start, stop }
        }
    }

    /// The smallest interval containing all the times, `None` if there are no times.
    pub fn from_times<I: IntoIterator<Item = DateTime<Utc>>>(times: I) -> Option<Self> {
        let mut iter = times.into_iter();
        let first = iter.next()?;

        let (start, stop) = iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Some(TimeInterval { start, stop })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    /// Grow the interval by `delta` on both ends.
    pub fn widen(&self, delta: Duration) -> Self {
        TimeInterval {
            start: self.start - delta,
            stop: self.stop + delta,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time <= self.stop
    }

    /// The overlapping part of two intervals.
    pub fn intersect(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let stop = self.stop.min(other.stop);

        if start <= stop {
            Some(TimeInterval { start, stop })
        } else {
            None
        }
    }

    /// Cut the interval into `n` pieces of equal length, the last one absorbs any rounding.
    pub fn split(&self, n: usize) -> Vec<TimeInterval> {
        let n = n.max(1);
        let step_ms = self.duration().num_milliseconds() / n as i64;

        (0..n)
            .map(|i| {
                let start = self.start + Duration::milliseconds(step_ms * i as i64);
                let stop = if i + 1 == n {
                    self.stop
                } else {
                    self.start + Duration::milliseconds(step_ms * (i as i64 + 1))
                };
                TimeInterval { start, stop }
            })
            .collect()
    }
}

/**
 * The gap between two intervals.
 *
 * This is the start of the later interval minus the end of the earlier one, which is negative if
 * they overlap.
 */
pub fn time_delta(left: &TimeInterval, right: &TimeInterval) -> Duration {
    let (earlier, later) = if left.start < right.start {
        (left, right)
    } else {
        (right, left)
    };

    later.start - earlier.stop
}

/**
 * A line through the center of a swath with the sensing time interpolated along it.
 *
 * The first vertex of the line was observed at the start time and the last one at the stop time,
 * anything in between is linear in the distance along the line.
 */
#[derive(Debug, Clone)]
pub struct TimeAxis {
    line: LineString<f64>,
    /// Middle of the longitude range of the line.
    center_lon: f64,
    /// Distance along the line to each vertex.
    cumulative: Vec<f64>,
    length: f64,
    interval: TimeInterval,
}

impl TimeAxis {
    pub fn new(line: LineString<f64>, start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        let mut cumulative = Vec::with_capacity(line.0.len());
        let mut length = 0.0;
        for (i, c) in line.0.iter().enumerate() {
            if i > 0 {
                let prev = line.0[i - 1];
                length += f64::hypot(c.x - prev.x, c.y - prev.y);
            }
            cumulative.push(length);
        }

        let (min_lon, max_lon) = line
            .0
            .iter()
            .fold((f64::MAX, -f64::MAX), |(lo, hi), c| (lo.min(c.x), hi.max(c.x)));
        let center_lon = if min_lon <= max_lon {
            (min_lon + max_lon) / 2.0
        } else {
            0.0
        };

        TimeAxis {
            line,
            center_lon,
            cumulative,
            length,
            interval: TimeInterval::new(start, stop),
        }
    }

    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    /**
     * The time the point was observed, `None` if it doesn't project onto the axis.
     *
     * The longitude is shifted by whole turns to the copy closest to the axis, so points on the
     * globe work with axes that continue past the anti-meridian.
     */
    pub fn time_at(&self, lon: f64, lat: f64) -> Option<DateTime<Utc>> {
        let lon = lon - 360.0 * ((lon - self.center_lon) / 360.0).round();
        let offset = self.length_index(Coord { x: lon, y: lat })?;
        Some(self.time_at_offset(offset))
    }

    // Distance along the axis to the projection of the point on the first segment it projects on.
    fn length_index(&self, pnt: Coord<f64>) -> Option<f64> {
        for (n, seg) in self.line.0.windows(2).enumerate() {
            let (a, b) = (seg[0], seg[1]);
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let len2 = dx * dx + dy * dy;
            if len2 == 0.0 {
                continue;
            }

            let factor = ((pnt.x - a.x) * dx + (pnt.y - a.y) * dy) / len2;
            if (0.0..=1.0).contains(&factor) {
                return Some(self.cumulative[n] + factor * len2.sqrt());
            }
        }

        None
    }

    fn time_at_offset(&self, offset: f64) -> DateTime<Utc> {
        if self.length <= 0.0 {
            return self.interval.start;
        }

        let fraction = offset / self.length;
        let millis = (self.interval.duration().num_milliseconds() as f64 * fraction) as i64;
        self.interval.start + Duration::milliseconds(millis)
    }
}
