use super::PixelLocator;
use crate::{
    error::{MatchupError, MatchupResult},
    geometry::great_circle_distance,
};
use geo::{Coord, Point};

/**
 * A pixel locator for rasters one pixel wide, like the sub-satellite track of a profiling sensor.
 *
 * Every scanline has a single location, so pixel_location answers with the nearest scanline if it
 * is close enough.
 */
#[derive(Debug, Clone)]
pub struct PixelLocatorX1Yn {
    max_distance_km: f64,
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl PixelLocatorX1Yn {
    pub fn new(max_distance_km: f64, lons: Vec<f64>, lats: Vec<f64>) -> MatchupResult<Self> {
        check_element_count(lons.len())?;
        check_element_count(lats.len())?;

        if lons.len() != lats.len() {
            return Err(MatchupError::Configuration(
                "The arrays lons and lats must have the same number of elements.".to_owned(),
            ));
        }

        Ok(PixelLocatorX1Yn {
            max_distance_km,
            lons,
            lats,
        })
    }
}

impl PixelLocator for PixelLocatorX1Yn {
    fn geo_location(&self, x: f64, y: f64) -> MatchupResult<Option<Point<f64>>> {
        let size = self.lons.len();

        if !(0.0..=1.0).contains(&x) {
            return Err(MatchupError::LocatorRange(
                "Invalid x value. Must be in the range >=0 and <=1.".to_owned(),
            ));
        }

        if !(0.0..=size as f64).contains(&y) {
            return Err(MatchupError::LocatorRange(format!(
                "Invalid y value. Must be in the range >=0 and <={}.",
                size
            )));
        }

        if size == 0 {
            return Ok(None);
        }

        let idx = (y.min((size - 1) as f64)).floor() as usize;
        Ok(Some(Point::new(self.lons[idx], self.lats[idx])))
    }

    fn pixel_location(&self, lon: f64, lat: f64) -> Vec<Coord<f64>> {
        let nearest = self
            .lons
            .iter()
            .zip(self.lats.iter())
            .map(|(&lo, &la)| great_circle_distance(lat, lon, la, lo))
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        match nearest {
            Some((i, dist)) if dist <= self.max_distance_km => vec![Coord {
                x: 0.5,
                y: i as f64 + 0.5,
            }],
            _ => vec![],
        }
    }
}

fn check_element_count(count: usize) -> MatchupResult<()> {
    if count > i32::MAX as usize {
        return Err(MatchupError::Configuration(
            "The number of elements in an array must be less or equal the integer maximum value \
             2147483647 = 0x7fffffff = (2^31)-1."
                .to_owned(),
        ));
    }

    Ok(())
}
