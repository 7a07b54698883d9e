/*!
 * Where and when two swaths overlap.
 */
use crate::{
    observation::SatelliteObservation,
    time_axis::{time_delta, TimeAxis, TimeInterval},
};
use chrono::Duration;
use geo::Polygon;

/// How close in time two swaths were over their common area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInfo {
    /// Zero if the swaths were observed at the same time.
    pub min_time_delta: Duration,
    /// The time both swaths were observing the common area, if there was any.
    pub overlap: Option<TimeInterval>,
}

/// One connected area observed by both swaths.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub polygon: Polygon<f64>,
    /// Index of the primary sub-geometry the area lies in.
    pub primary_index: usize,
    /// Index of the secondary sub-geometry the area lies in.
    pub secondary_index: usize,
    pub time_info: TimeInfo,
}

/**
 * Intersect every sub-geometry of the primary with every sub-geometry of the secondary.
 *
 * The acquisition times of the common area are estimated from the time axis of each swath at the
 * vertices of the area. Areas where either swath has no time estimate are not returned.
 */
pub fn intersecting_intervals(
    primary: &SatelliteObservation,
    secondary: &SatelliteObservation,
) -> Vec<Intersection> {
    let primary_parts = primary.geo_bounds().geometries();
    let secondary_parts = secondary.geo_bounds().geometries();

    let mut intersections = vec![];
    for (i, primary_part) in primary_parts.iter().enumerate() {
        for (j, secondary_part) in secondary_parts.iter().enumerate() {
            let (primary_axis, secondary_axis) =
                match (primary.time_axes().get(i), secondary.time_axes().get(j)) {
                    (Some(p), Some(s)) => (p, s),
                    _ => {
                        log::debug!(
                            "Missing time axis for sub-geometries {} and {} of {} and {}",
                            i,
                            j,
                            primary.data_file_path().display(),
                            secondary.data_file_path().display()
                        );
                        continue;
                    }
                };

            for polygon in primary_part.polygon_intersection(secondary_part) {
                if let Some(time_info) = time_info(&polygon, primary_axis, secondary_axis) {
                    intersections.push(Intersection {
                        polygon,
                        primary_index: i,
                        secondary_index: j,
                        time_info,
                    });
                }
            }
        }
    }

    intersections
}

fn time_info(
    polygon: &Polygon<f64>,
    primary: &TimeAxis,
    secondary: &TimeAxis,
) -> Option<TimeInfo> {
    let ring = &polygon.exterior().0;
    let open_ring = &ring[..ring.len().saturating_sub(1)];

    let primary_times =
        TimeInterval::from_times(open_ring.iter().filter_map(|c| primary.time_at(c.x, c.y)))?;
    let secondary_times =
        TimeInterval::from_times(open_ring.iter().filter_map(|c| secondary.time_at(c.x, c.y)))?;

    Some(match primary_times.intersect(&secondary_times) {
        Some(overlap) => TimeInfo {
            min_time_delta: Duration::zero(),
            overlap: Some(overlap),
        },
        None => TimeInfo {
            min_time_delta: time_delta(&primary_times, &secondary_times),
            overlap: None,
        },
    })
}
