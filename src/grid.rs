use crate::error::{MatchupError, MatchupResult};
use geo::Coord;

/// Parallel longitude and latitude rasters of a swath, stored row major.
///
/// Rows are scanlines (along track) and columns are pixels across the track.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    rows: usize,
    cols: usize,
    lons: Vec<f64>,
    lats: Vec<f64>,
}

impl LatLonGrid {
    /// Create a grid, the arrays must both have `rows * cols` elements.
    pub fn new(rows: usize, cols: usize, lons: Vec<f64>, lats: Vec<f64>) -> MatchupResult<Self> {
        if lons.len() != rows * cols || lats.len() != rows * cols {
            return Err(MatchupError::Configuration(format!(
                "Geolocation arrays must have {} x {} elements, found {} longitudes and {} latitudes.",
                rows,
                cols,
                lons.len(),
                lats.len()
            )));
        }

        Ok(LatLonGrid {
            rows,
            cols,
            lons,
            lats,
        })
    }

    /// Build a grid from nested rows, handy for small hand made swaths.
    pub fn from_rows(lons: &[&[f64]], lats: &[&[f64]]) -> MatchupResult<Self> {
        let rows = lons.len();
        let cols = lons.first().map(|r| r.len()).unwrap_or(0);

        if lons.iter().any(|r| r.len() != cols) || lats.iter().any(|r| r.len() != cols) {
            return Err(MatchupError::Configuration(
                "Geolocation rows must all have the same length.".to_owned(),
            ));
        }

        let flat_lons = lons.iter().flat_map(|r| r.iter().copied()).collect();
        let flat_lats = lats.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(rows, cols, flat_lons, flat_lats)
    }

    /// Number of scanlines.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of pixels per scanline.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn lon(&self, row: usize, col: usize) -> f64 {
        self.lons[row * self.cols + col]
    }

    pub fn lat(&self, row: usize, col: usize) -> f64 {
        self.lats[row * self.cols + col]
    }

    /// The geographic coordinate at a pixel, x is longitude and y is latitude.
    pub fn coord(&self, row: usize, col: usize) -> Coord<f64> {
        Coord {
            x: self.lon(row, col),
            y: self.lat(row, col),
        }
    }

    /// Copy out the scanlines `first..=last`.
    pub fn row_band(&self, first: usize, last: usize) -> LatLonGrid {
        let last = last.min(self.rows.saturating_sub(1));
        let start = first * self.cols;
        let end = (last + 1) * self.cols;

        LatLonGrid {
            rows: last + 1 - first,
            cols: self.cols,
            lons: self.lons[start..end].to_vec(),
            lats: self.lats[start..end].to_vec(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_construction() {
        assert!(LatLonGrid::new(2, 2, vec![0.0; 4], vec![0.0; 4]).is_ok());
        assert!(LatLonGrid::new(2, 2, vec![0.0; 4], vec![0.0; 3]).is_err());
        let lats: [&[f64]; 2] = [&[1.0, 2.0], &[3.0, 4.0]];
        assert!(LatLonGrid::from_rows(&[&[1.0, 2.0], &[3.0]], &lats).is_err());
    }

    #[test]
    fn test_access_and_band() {
        let grid = LatLonGrid::from_rows(
            &[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]],
            &[&[10.0, 20.0], &[30.0, 40.0], &[50.0, 60.0]],
        )
        .unwrap();

        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 2);
        assert_eq!(grid.lon(1, 1), 4.0);
        assert_eq!(grid.lat(2, 0), 50.0);
        assert_eq!(grid.coord(0, 1), Coord { x: 2.0, y: 20.0 });

        let band = grid.row_band(1, 2);
        assert_eq!(band.rows(), 2);
        assert_eq!(band.lon(0, 0), 3.0);
        assert_eq!(band.lat(1, 1), 60.0);
    }
}
