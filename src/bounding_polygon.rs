/*!
 * Outline polygons and time axes for satellite swaths.
 *
 * A swath outline is built by walking the edge of the geolocation grid, and a time axis by
 * walking down the center column. Swaths that wrap around a pole or cross themselves are split
 * into horizontal bands of scanlines until every band is a valid polygon.
 *
 * Outlines and axes have continuous longitudes, so near the anti-meridian they may reach past
 * 180 degrees. See [map_to_globe](crate::geometry::map_to_globe) for bringing them back.
 */
use crate::{
    error::{MatchupError, MatchupResult},
    geometry::{normalize_longitudes, Geometry, GeometryOps},
    grid::LatLonGrid,
    observation::{AcquisitionInfo, Interval, NodeType},
    time_axis::TimeInterval,
};
use geo::Coord;

/// Builds outlines and time axes from geolocation grids, sampling every `interval` pixels.
#[derive(Debug, Clone, Copy)]
pub struct BoundingPolygonCreator {
    interval_x: usize,
    interval_y: usize,
}

impl BoundingPolygonCreator {
    pub fn new(interval: Interval) -> Self {
        BoundingPolygonCreator {
            interval_x: interval.x() as usize,
            interval_y: interval.y() as usize,
        }
    }

    /// Create the outline of the whole swath, closed.
    pub fn create_bounding_polygon(&self, grid: &LatLonGrid) -> MatchupResult<Geometry> {
        check_grid(grid)?;
        Ok(Geometry::polygon(self.ring_for_rows(grid, 0, grid.rows() - 1, false)))
    }

    /// Same as [create_bounding_polygon](Self::create_bounding_polygon) with the ring reversed.
    pub fn create_bounding_polygon_clockwise(&self, grid: &LatLonGrid) -> MatchupResult<Geometry> {
        check_grid(grid)?;
        Ok(Geometry::polygon(self.ring_for_rows(grid, 0, grid.rows() - 1, true)))
    }

    /**
     * Create an outline that also records where the time axis is along the ring.
     *
     * For an ascending node the ring starts along the first scanline and the time axis is the
     * right hand column that follows it. For anything else the ring starts on the right hand
     * column, so the time axis starts at index 0. The time axis covers the indices
     * `start..=end` of the ring.
     *
     * The returned ring is closed and its longitudes are made continuous across the
     * anti-meridian.
     */
    pub fn create_pixel_coded_bounding_polygon(
        &self,
        grid: &LatLonGrid,
        node_type: NodeType,
        sensing: TimeInterval,
    ) -> MatchupResult<AcquisitionInfo> {
        check_grid(grid)?;

        let width = grid.cols() - 1;
        let height = grid.rows() - 1;
        let (ix, iy) = (self.interval_x, self.interval_y);

        let mut coords = Vec::with_capacity(2 * (width / ix + height / iy) + 5);

        let first_row = |coords: &mut Vec<Coord<f64>>| {
            for x in (0..width).step_by(ix) {
                coords.push(grid.coord(0, x));
            }
        };
        let right_column = |coords: &mut Vec<Coord<f64>>| {
            for y in (0..height).step_by(iy) {
                coords.push(grid.coord(y, width));
            }
        };
        let last_row = |coords: &mut Vec<Coord<f64>>| {
            for x in (1..=width).rev().step_by(ix) {
                coords.push(grid.coord(height, x));
            }
        };
        let left_column = |coords: &mut Vec<Coord<f64>>| {
            for y in (1..=height).rev().step_by(iy) {
                coords.push(grid.coord(y, 0));
            }
        };

        let time_axis_start;
        let time_axis_end;
        if node_type == NodeType::Ascending {
            first_row(&mut coords);
            time_axis_start = coords.len();
            right_column(&mut coords);
            time_axis_end = coords.len();
            last_row(&mut coords);
            left_column(&mut coords);
        } else {
            time_axis_start = 0;
            right_column(&mut coords);
            time_axis_end = coords.len();
            last_row(&mut coords);
            left_column(&mut coords);
            first_row(&mut coords);
        }

        close_polygon(&mut coords);
        normalize_longitudes(&mut coords);

        Ok(
            AcquisitionInfo::new(coords, sensing.start(), sensing.stop())
                .with_time_axis_indices(vec![time_axis_start], vec![time_axis_end])
                .with_node_type(node_type),
        )
    }

    /**
     * Split the swath into bands of scanlines and create an outline for each band.
     *
     * The bands overlap by one scanline so there are no gaps between them. See [row_bands] for
     * how the scanlines are divided.
     */
    pub fn create_bounding_geometry_split(
        &self,
        grid: &LatLonGrid,
        num_splits: usize,
        clockwise: bool,
    ) -> MatchupResult<Geometry> {
        check_grid(grid)?;

        let parts = row_bands(grid.rows(), num_splits)
            .into_iter()
            .map(|(first, last)| {
                Geometry::polygon(self.ring_for_rows(grid, first, last, clockwise))
            })
            .collect();

        Ok(Geometry::Collection(parts))
    }

    /**
     * Find the smallest number of splits that yields a valid outline.
     *
     * #Arguments
     * * grid - the geolocation of the swath.
     * * max_splits - the largest number of bands to try.
     * * clockwise - whether the rings should be reversed.
     *
     * #Returns
     * The outline and the number of splits used. With a single split the outline is a plain
     * polygon, otherwise it is a collection of the bands. If no split count up to `max_splits`
     * works, the swath can't be used and an error is returned.
     */
    pub fn create_valid_bounding_geometry(
        &self,
        grid: &LatLonGrid,
        max_splits: usize,
        clockwise: bool,
    ) -> MatchupResult<(Geometry, usize)> {
        check_grid(grid)?;

        for num_splits in 1..=max_splits {
            let geometry = if num_splits == 1 {
                Geometry::polygon(self.ring_for_rows(grid, 0, grid.rows() - 1, clockwise))
            } else {
                self.create_bounding_geometry_split(grid, num_splits, clockwise)?
            };

            if geometry.is_valid() {
                return Ok((geometry, num_splits));
            }

            log::debug!("Bounding geometry invalid with {} split(s).", num_splits);
        }

        Err(MatchupError::InvalidGeometry(format!(
            "Invalid bounding geometry detected, even after splitting {} times.",
            max_splits
        )))
    }

    /// A line down the center column of the swath, always including the last scanline.
    pub fn create_time_axis_geometry(&self, grid: &LatLonGrid) -> MatchupResult<Geometry> {
        check_grid(grid)?;
        Ok(Geometry::line(self.axis_for_rows(grid, 0, grid.rows() - 1)))
    }

    /// One time axis line per band, band `i` matches polygon `i` of the split outline.
    pub fn create_time_axis_geometry_split(
        &self,
        grid: &LatLonGrid,
        num_splits: usize,
    ) -> MatchupResult<Geometry> {
        check_grid(grid)?;

        let parts = row_bands(grid.rows(), num_splits)
            .into_iter()
            .map(|(first, last)| Geometry::line(self.axis_for_rows(grid, first, last)))
            .collect();

        Ok(Geometry::Collection(parts))
    }

    fn ring_for_rows(
        &self,
        grid: &LatLonGrid,
        first: usize,
        last: usize,
        clockwise: bool,
    ) -> Vec<Coord<f64>> {
        let width = grid.cols() - 1;
        let mut coords = vec![];

        // down the first column
        for y in (first..last).step_by(self.interval_y) {
            coords.push(grid.coord(y, 0));
        }

        // across the last row
        for x in (0..width).step_by(self.interval_x) {
            coords.push(grid.coord(last, x));
        }

        // up the last column
        for y in ((first + 1)..=last).rev().step_by(self.interval_y) {
            coords.push(grid.coord(y, width));
        }

        // back across the first row
        for x in (1..=width).rev().step_by(self.interval_x) {
            coords.push(grid.coord(first, x));
        }

        close_polygon(&mut coords);
        normalize_longitudes(&mut coords);

        if clockwise {
            coords.reverse();
        }

        coords
    }

    fn axis_for_rows(&self, grid: &LatLonGrid, first: usize, last: usize) -> Vec<Coord<f64>> {
        let center = grid.cols() / 2;

        let mut coords: Vec<Coord<f64>> = (first..=last)
            .step_by(self.interval_y)
            .map(|y| grid.coord(y, center))
            .collect();

        if (last - first) % self.interval_y != 0 {
            coords.push(grid.coord(last, center));
        }

        normalize_longitudes(&mut coords);
        coords
    }
}

/// Close a ring by repeating its first point, rings with fewer than 2 points are left alone.
pub fn close_polygon(coords: &mut Vec<Coord<f64>>) {
    if coords.len() > 1 {
        coords.push(coords[0]);
    }
}

/// Height, in scanlines, of each band when splitting `rows` scanlines into `num_splits` bands.
pub fn subset_height(rows: usize, num_splits: usize) -> usize {
    let num_splits = num_splits.max(1);
    (rows.saturating_sub(1) + num_splits - 1) / num_splits + 1
}

/**
 * Divide the scanlines `0..rows` into overlapping bands.
 *
 * Every band has [subset_height] scanlines except the last which may be shorter. Consecutive bands
 * share exactly one scanline, and together they cover every scanline. The number of splits is
 * limited so every band has at least two scanlines.
 *
 * #Returns
 * The inclusive first and last scanline of each band.
 */
pub fn row_bands(rows: usize, num_splits: usize) -> Vec<(usize, usize)> {
    if rows < 2 {
        return vec![];
    }

    let num_splits = num_splits.clamp(1, rows - 1);
    let height = subset_height(rows, num_splits);

    let mut bands = Vec::with_capacity(num_splits);
    let mut first = 0;
    while first < rows - 1 {
        let last = (first + height - 1).min(rows - 1);
        bands.push((first, last));
        first = last;
    }

    bands
}

fn check_grid(grid: &LatLonGrid) -> MatchupResult<()> {
    if grid.rows() < 2 || grid.cols() < 2 {
        return Err(MatchupError::InvalidGeometry(format!(
            "A swath of {} x {} pixels is too small to outline.",
            grid.rows(),
            grid.cols()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use geo::coord;

    #[rustfmt::skip]
    const AIRS_LONGITUDES: [&[f64]; 4] = [
        &[138.19514475348302, 138.77287682180165, 139.3232587268979, 139.86561480588978],
        &[137.7680766938059, 138.34196788102574, 138.888842745419, 139.43625059118625],
        &[137.32780413935305, 137.90682957068157, 138.4586123358709, 138.9939729311918],
        &[136.90199908664985, 137.46778019306842, 138.01571817610454, 138.53923435004424],
    ];

    #[rustfmt::skip]
    const AIRS_LATITUDES: [&[f64]; 4] = [
        &[71.15288152754994, 71.4359164390965, 71.69661607793569, 71.9452820772289],
        &[71.23974580787146, 71.52412094894252, 71.78608894421787, 72.03976926305718],
        &[71.32088787959934, 71.61122828082071, 71.87850964766172, 72.12942839534938],
        &[71.41032171663477, 71.69739504897453, 71.96597011172345, 72.21432551071354],
    ];

    fn airs_grid() -> LatLonGrid {
        LatLonGrid::from_rows(&AIRS_LONGITUDES, &AIRS_LATITUDES).unwrap()
    }

    fn sensing() -> TimeInterval {
        TimeInterval::new(
            Utc.with_ymd_and_hms(2010, 3, 12, 11, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2010, 3, 12, 11, 6, 0).unwrap(),
        )
    }

    fn creator(x: i32, y: i32) -> BoundingPolygonCreator {
        BoundingPolygonCreator::new(Interval::new(x, y).unwrap())
    }

    // A ribbon that goes north, turns around and comes back south overlapping itself.
    #[rustfmt::skip]
    fn u_turn_grid() -> LatLonGrid {
        LatLonGrid::from_rows(
            &[&[0.0, 2.0], &[0.0, 2.0], &[1.5, 1.5], &[3.0, 1.0], &[3.0, 1.0]],
            &[&[0.0, 0.0], &[10.0, 10.0], &[14.0, 11.0], &[10.0, 10.0], &[0.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_close_polygon() {
        let mut empty: Vec<Coord<f64>> = vec![];
        close_polygon(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![coord! {x: 1.0, y: 1.0}];
        close_polygon(&mut single);
        assert_eq!(single.len(), 1);

        let mut coords = vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 1.0, y: 1.0},
        ];
        close_polygon(&mut coords);
        assert_eq!(coords.len(), 4);
        assert_eq!(coords[3], coord! {x: 0.0, y: 0.0});
    }

    #[test]
    fn test_pixel_coded_ascending_node() {
        let info = creator(3, 3)
            .create_pixel_coded_bounding_polygon(&airs_grid(), NodeType::Ascending, sensing())
            .unwrap();

        let coords = info.coordinates();
        assert_eq!(coords.len(), 5);
        assert!((coords[0].x - 138.19514475348302).abs() < 1.0e-8);
        assert!((coords[0].y - 71.15288152754994).abs() < 1.0e-8);
        assert!((coords[3].x - 136.90199908664985).abs() < 1.0e-8);
        assert!((coords[3].y - 71.41032171663477).abs() < 1.0e-8);

        assert_eq!(info.time_axis_start_indices(), &[1]);
        assert_eq!(info.time_axis_end_indices(), &[2]);
        assert_eq!(info.node_type(), NodeType::Ascending);
    }

    #[test]
    fn test_pixel_coded_descending_node() {
        let info = creator(3, 3)
            .create_pixel_coded_bounding_polygon(&airs_grid(), NodeType::Descending, sensing())
            .unwrap();

        let coords = info.coordinates();
        assert_eq!(coords.len(), 5);
        assert!((coords[0].x - 139.86561480588978).abs() < 1.0e-8);
        assert!((coords[0].y - 71.9452820772289).abs() < 1.0e-8);
        assert_eq!(coords[0], coords[4]);

        assert_eq!(info.time_axis_start_indices(), &[0]);
        assert_eq!(info.time_axis_end_indices(), &[1]);
    }

    #[test]
    fn test_pixel_coded_finer_interval() {
        let info = creator(1, 1)
            .create_pixel_coded_bounding_polygon(&airs_grid(), NodeType::Ascending, sensing())
            .unwrap();

        // 3 points per side plus the closing point.
        assert_eq!(info.coordinates().len(), 13);
        assert_eq!(info.time_axis_start_indices(), &[3]);
        assert_eq!(info.time_axis_end_indices(), &[6]);
        assert_eq!(info.time_axis_lines()[0].0.len(), 4);
    }

    #[test]
    fn test_bounding_polygon() {
        let geometry = creator(1, 1).create_bounding_polygon(&airs_grid()).unwrap();
        let coords = geometry.coords();

        assert_eq!(coords.len(), 13);
        assert_eq!(coords[0], coords[12]);
        // Down the first column first.
        assert_eq!(coords[1].x, AIRS_LONGITUDES[1][0]);
        // Corners are all present.
        assert!(coords.contains(&coord! {x: AIRS_LONGITUDES[3][0], y: AIRS_LATITUDES[3][0]}));
        assert!(coords.contains(&coord! {x: AIRS_LONGITUDES[3][3], y: AIRS_LATITUDES[3][3]}));
        assert!(coords.contains(&coord! {x: AIRS_LONGITUDES[0][3], y: AIRS_LATITUDES[0][3]}));
        assert!(geometry.is_valid());

        let clockwise = creator(1, 1)
            .create_bounding_polygon_clockwise(&airs_grid())
            .unwrap();
        let mut reversed = clockwise.coords();
        reversed.reverse();
        assert_eq!(reversed, coords);
    }

    #[test]
    fn test_bounding_polygon_large_interval_keeps_corners() {
        let geometry = creator(40, 100).create_bounding_polygon(&airs_grid()).unwrap();
        // Just the four corners and the closing point.
        assert_eq!(geometry.coords().len(), 5);
        assert!(geometry.is_valid());
    }

    #[test]
    fn test_grid_too_small() {
        let grid = LatLonGrid::from_rows(&[&[1.0, 2.0]], &[&[1.0, 2.0]]).unwrap();
        assert!(creator(1, 1).create_bounding_polygon(&grid).is_err());
    }

    #[test]
    fn test_subset_height_and_bands() {
        assert_eq!(subset_height(100, 1), 100);
        assert_eq!(subset_height(100, 2), 51);
        assert_eq!(row_bands(100, 2), vec![(0, 50), (50, 99)]);
        assert_eq!(row_bands(4, 3), vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(row_bands(4, 10), vec![(0, 1), (1, 2), (2, 3)]);
        assert!(row_bands(1, 3).is_empty());

        for rows in 2..40 {
            for n in 1..8 {
                let bands = row_bands(rows, n);
                assert_eq!(bands[0].0, 0);
                assert_eq!(bands[bands.len() - 1].1, rows - 1);
                for pair in bands.windows(2) {
                    assert_eq!(pair[0].1, pair[1].0);
                    assert!(pair[0].1 > pair[0].0);
                }
            }
        }
    }

    #[test]
    fn test_split_geometry() {
        let geometry = creator(1, 1)
            .create_bounding_geometry_split(&airs_grid(), 3, false)
            .unwrap();

        assert_eq!(geometry.num_geometries(), 3);
        assert!(geometry.is_valid());

        let single = creator(1, 1)
            .create_bounding_geometry_split(&airs_grid(), 1, false)
            .unwrap();
        assert_eq!(single.num_geometries(), 1);
    }

    #[test]
    fn test_validity_loop_splits_self_intersecting_swath() {
        let grid = u_turn_grid();
        let creator = creator(1, 1);

        assert!(!creator.create_bounding_polygon(&grid).unwrap().is_valid());

        let (geometry, num_splits) = creator
            .create_valid_bounding_geometry(&grid, 4, false)
            .unwrap();
        assert_eq!(num_splits, 2);
        assert_eq!(geometry.num_geometries(), 2);
        assert!(geometry.is_valid());

        let axes = creator.create_time_axis_geometry_split(&grid, num_splits).unwrap();
        assert_eq!(axes.num_geometries(), 2);
    }

    #[test]
    fn test_validity_loop_gives_up() {
        let grid = u_turn_grid();
        let result = creator(1, 1).create_valid_bounding_geometry(&grid, 1, false);

        assert!(matches!(result, Err(MatchupError::InvalidGeometry(_))));
    }

    #[test]
    fn test_valid_swath_is_not_split() {
        let (geometry, num_splits) = creator(1, 1)
            .create_valid_bounding_geometry(&airs_grid(), 4, false)
            .unwrap();

        assert_eq!(num_splits, 1);
        assert!(matches!(geometry, Geometry::Polygon(_)));
    }

    #[rustfmt::skip]
    fn dateline_grid() -> LatLonGrid {
        let lons: &[f64] = &[178.5, 179.5, -179.5, -178.5];
        LatLonGrid::from_rows(
            &[lons, lons, lons, lons, lons, lons],
            &[&[0.0; 4], &[1.0; 4], &[2.0; 4], &[3.0; 4], &[4.0; 4], &[5.0; 4]],
        )
        .unwrap()
    }

    #[test]
    fn test_swath_crossing_dateline_is_valid() {
        let creator = creator(1, 1);
        let grid = dateline_grid();

        let (geometry, num_splits) = creator
            .create_valid_bounding_geometry(&grid, 4, false)
            .unwrap();
        assert_eq!(num_splits, 1);
        assert!(geometry.is_valid());

        // Continuous longitudes, east of the anti-meridian continues past 180.
        let lons: Vec<f64> = geometry.coords().iter().map(|c| c.x).collect();
        assert!(lons.iter().all(|lon| (178.5..=181.5).contains(lon)));
        assert!(lons.contains(&181.5));

        let on_globe = geometry.on_globe();
        assert_eq!(on_globe.num_geometries(), 2);
        assert!(on_globe.contains_point(179.0, 2.5));
        assert!(on_globe.contains_point(-179.0, 2.5));
        assert!(!on_globe.contains_point(0.0, 2.5));

        // The center column doesn't cross, so the axis keeps the grid longitudes.
        let axis = creator.create_time_axis_geometry(&grid).unwrap();
        assert!(axis.coords().iter().all(|c| c.x == -179.5));
    }

    #[test]
    fn test_time_axis() {
        let axis = creator(2, 2).create_time_axis_geometry(&airs_grid()).unwrap();
        let coords = axis.coords();

        // Rows 0 and 2 on stride, plus the last row.
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0], coord! {x: AIRS_LONGITUDES[0][2], y: AIRS_LATITUDES[0][2]});
        assert_eq!(coords[2], coord! {x: AIRS_LONGITUDES[3][2], y: AIRS_LATITUDES[3][2]});

        let axis = creator(1, 3).create_time_axis_geometry(&airs_grid()).unwrap();
        assert_eq!(axis.coords().len(), 2);
    }

    #[test]
    fn test_time_axis_split_matches_outline_split() {
        let creator = creator(1, 1);
        let grid = airs_grid();

        let outline = creator.create_bounding_geometry_split(&grid, 2, false).unwrap();
        let axes = creator.create_time_axis_geometry_split(&grid, 2).unwrap();
        assert_eq!(outline.num_geometries(), axes.num_geometries());

        // Each axis starts on the first scanline of its band.
        for ((first, _), axis) in row_bands(grid.rows(), 2).into_iter().zip(axes.geometries()) {
            assert_eq!(axis.coords()[0], grid.coord(first, 2));
        }
    }
}
