/*!
 * Turning an intersection polygon into pixel samples of the primary and secondary swaths.
 */
use crate::{
    error::MatchupResult,
    geometry::wrap_longitude,
    locator::{PixelLocator, TimeLocator},
    observation::Interval,
    sample::{Sample, SampleSet},
};
use geo::{Contains, Point, Polygon};
use std::sync::Arc;

/// Collects samples of a single swath through its pixel locator.
pub struct SampleCollector<'a> {
    pixel_locator: &'a dyn PixelLocator,
    interval: Interval,
}

impl<'a> SampleCollector<'a> {
    pub fn new(pixel_locator: &'a dyn PixelLocator, interval: Interval) -> Self {
        SampleCollector {
            pixel_locator,
            interval,
        }
    }

    /**
     * Sample every pixel of the swath inside the polygon.
     *
     * The pixel window searched is the bounding box of the pixel positions of the polygon
     * vertices, visited with the sampling interval as the step size.
     *
     * #Returns
     * One sample set per pixel with only the primary sample in it.
     */
    pub fn add_primary_samples(
        &self,
        polygon: &Polygon<f64>,
        time_locator: &dyn TimeLocator,
    ) -> MatchupResult<Vec<SampleSet>> {
        let mut x_range = Range::default();
        let mut y_range = Range::default();
        for coord in polygon.exterior().coords() {
            for pixel in self.pixel_locator.pixel_location(coord.x, coord.y) {
                x_range.aggregate(pixel.x);
                y_range.aggregate(pixel.y);
            }
        }

        let (start_x, end_x) = match x_range.bounds() {
            Some(bounds) => bounds,
            None => {
                log::debug!("Polygon vertices are all outside the swath.");
                return Ok(vec![]);
            }
        };
        let (start_y, end_y) = match y_range.bounds() {
            Some(bounds) => bounds,
            None => return Ok(vec![]),
        };

        let mut sample_sets = vec![];
        for y in (start_y..=end_y).step_by(self.interval.y() as usize) {
            for x in (start_x..=end_x).step_by(self.interval.x() as usize) {
                let location = match self
                    .pixel_locator
                    .geo_location(f64::from(x) + 0.5, f64::from(y) + 0.5)?
                {
                    Some(location) => location,
                    None => continue,
                };

                // Intersection polygons are on the globe.
                let on_globe = Point::new(wrap_longitude(location.x()), location.y());
                if !polygon.contains(&on_globe) {
                    continue;
                }

                let time = time_locator.time_for(x, y)?;
                let sample = Sample::new(x, y, location.x(), location.y(), time);
                sample_sets.push(SampleSet::new(Arc::new(sample)));
            }
        }

        Ok(sample_sets)
    }

    /**
     * Find the pixels of this swath that observed each of the primary samples.
     *
     * Primary samples without a matching pixel are dropped. A primary sample observed more than
     * once by this swath yields one sample set per observation, all sharing the primary sample.
     */
    pub fn add_secondary_samples(
        &self,
        sample_sets: Vec<SampleSet>,
        time_locator: &dyn TimeLocator,
        sensor_name: &str,
    ) -> MatchupResult<Vec<SampleSet>> {
        let mut to_keep = Vec::with_capacity(sample_sets.len());

        for sample_set in sample_sets {
            let primary = Arc::clone(sample_set.primary());
            let hits = self.pixel_locator.pixel_location(primary.lon, primary.lat);

            let mut template = Some(sample_set);
            for hit in hits {
                let x = hit.x as i32;
                let y = hit.y as i32;

                let location: Point<f64> = match self
                    .pixel_locator
                    .geo_location(f64::from(x) + 0.5, f64::from(y) + 0.5)?
                {
                    Some(location) => location,
                    None => continue,
                };
                let time = time_locator.time_for(x, y)?;
                let sample = Arc::new(Sample::new(x, y, location.x(), location.y(), time));

                let mut set = template
                    .take()
                    .unwrap_or_else(|| SampleSet::new(Arc::clone(&primary)));
                set.set_secondary(sensor_name, sample);
                to_keep.push(set);
            }
        }

        Ok(to_keep)
    }
}

/// Integer pixel range covering aggregated floating point positions.
#[derive(Debug, Default)]
struct Range {
    min: Option<f64>,
    max: Option<f64>,
}

impl Range {
    fn aggregate(&mut self, val: f64) {
        self.min = Some(self.min.map_or(val, |m| m.min(val)));
        self.max = Some(self.max.map_or(val, |m| m.max(val)));
    }

    fn bounds(&self) -> Option<(i32, i32)> {
        Some((self.min? as i32, self.max? as i32))
    }
}
