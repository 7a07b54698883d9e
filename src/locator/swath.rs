use super::PixelLocator;
use crate::{error::MatchupResult, geometry::great_circle_distance, grid::LatLonGrid};
use geo::{Coord, Point};

/// Kilometers per degree of latitude, used to skip pixels that can't be the nearest one.
const KM_PER_DEGREE: f64 = 111.0;

/**
 * Nearest pixel search over a full geolocation grid.
 *
 * Geographic locations more than `max_distance_km` from every pixel center are not in the swath.
 */
#[derive(Debug, Clone)]
pub struct SwathPixelLocator {
    grid: LatLonGrid,
    max_distance_km: f64,
}

impl SwathPixelLocator {
    pub fn new(grid: LatLonGrid, max_distance_km: f64) -> Self {
        SwathPixelLocator {
            grid,
            max_distance_km,
        }
    }

    pub fn grid(&self) -> &LatLonGrid {
        &self.grid
    }
}

impl PixelLocator for SwathPixelLocator {
    fn geo_location(&self, x: f64, y: f64) -> MatchupResult<Option<Point<f64>>> {
        if x < 0.0 || y < 0.0 {
            return Ok(None);
        }

        let (col, row) = (x.floor() as usize, y.floor() as usize);
        if col >= self.grid.cols() || row >= self.grid.rows() {
            return Ok(None);
        }

        let lon = self.grid.lon(row, col);
        let lat = self.grid.lat(row, col);
        if !lon.is_finite() || !lat.is_finite() {
            return Ok(None);
        }

        Ok(Some(Point::new(lon, lat)))
    }

    fn pixel_location(&self, lon: f64, lat: f64) -> Vec<Coord<f64>> {
        let mut best: Option<(usize, usize, f64)> = None;

        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                let plat = self.grid.lat(row, col);
                let plon = self.grid.lon(row, col);
                if !plat.is_finite() || !plon.is_finite() {
                    continue;
                }

                let best_dist = best.map(|(_, _, d)| d).unwrap_or(f64::MAX);
                if (plat - lat).abs() * KM_PER_DEGREE > best_dist + 1.0 {
                    continue;
                }

                let dist = great_circle_distance(lat, lon, plat, plon);
                if dist < best_dist {
                    best = Some((row, col, dist));
                }
            }
        }

        match best {
            Some((row, col, dist)) if dist <= self.max_distance_km => vec![Coord {
                x: col as f64 + 0.5,
                y: row as f64 + 0.5,
            }],
            _ => vec![],
        }
    }
}
