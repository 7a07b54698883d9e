/*!
 * Geographic calculations and the geometry types used to describe swaths.
 *
 * The heavy lifting (containment, intersection, clipping) is done with the `geo` crate. Everything
 * else in this library only talks to geometries through the [GeometryOps] trait, so the backing
 * library could be swapped without touching the polygon construction or matching code.
 */
use geo::{
    BooleanOps, BoundingRect, Centroid, Contains, Coord, Intersects, LineString, Point, Polygon,
    Rect, Translate,
};
use std::fmt::{self, Display};

pub use validity::ring_is_simple;

/**
 * the simple great circle distance calculation.
 *
 * #Arguments
 * * lat1 - the latitude of the first point in degrees.
 * * lon1 - the longitude of the first point in degrees.
 * * lat2 - the latitude of the second point in degrees.
 * * lon2 - the longitude of the second point in degrees.
 *
 * #Returns
 * The distance between the points in kilometers.
 */
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const DEG2RAD: f64 = 2.0 * std::f64::consts::PI / 360.0;

    let lat1_r = lat1 * DEG2RAD;
    let lon1_r = lon1 * DEG2RAD;
    let lat2_r = lat2 * DEG2RAD;
    let lon2_r = lon2 * DEG2RAD;

    let dlat2 = (lat2_r - lat1_r) / 2.0;
    let dlon2 = (lon2_r - lon1_r) / 2.0;

    let sin2_dlat = f64::powf(f64::sin(dlat2), 2.0);
    let sin2_dlon = f64::powf(f64::sin(dlon2), 2.0);

    let arc = 2.0
        * f64::asin(f64::sqrt(
            sin2_dlat + sin2_dlon * f64::cos(lat1_r) * f64::cos(lat2_r),
        ));

    arc * EARTH_RADIUS_KM
}

/// Mean radius of the Earth used for all spherical distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0090;

/**
 * Remove the jumps in longitude that happen when a ring crosses the anti-meridian.
 *
 * Every time the longitude jumps by more than 180 degrees between consecutive vertices, the
 * remaining vertices are shifted by 360 degrees so the ring becomes continuous. If that pushed the
 * ring below -180 without pushing any of it above 180, the whole ring is moved east by 360 degrees.
 *
 * The first vertex is never moved by the unwrapping step.
 */
pub fn normalize_longitudes(coords: &mut [Coord<f64>]) {
    if coords.len() < 2 {
        return;
    }

    let lons: Vec<f64> = coords.iter().map(|c| c.x).collect();

    let mut increment = 0.0;
    let mut min_lon = f64::MAX;
    let mut max_lon = -f64::MAX;
    for i in 1..coords.len() {
        let lon_diff = lons[i] - lons[i - 1];
        if lon_diff > 180.0 {
            increment -= 360.0;
        } else if lon_diff < -180.0 {
            increment += 360.0;
        }

        coords[i].x += increment;
        min_lon = min_lon.min(coords[i].x);
        max_lon = max_lon.max(coords[i].x);
    }

    if min_lon < -180.0 && max_lon <= 180.0 {
        for coord in coords.iter_mut() {
            coord.x += 360.0;
        }
    }
}

/**
 * Cut a polygon with continuous longitudes into pieces that lie on the globe.
 *
 * Rings made continuous with [normalize_longitudes] may reach past -180 or 180 degrees. The part
 * west of -180 is shifted east by 360 degrees, the part east of 180 is shifted west by 360 degrees,
 * and the pieces are returned in the order west, central, east. A polygon that is already inside
 * [-180, 180] is returned unchanged.
 */
pub fn map_to_globe(polygon: &Polygon<f64>) -> Vec<Polygon<f64>> {
    match polygon.bounding_rect() {
        None => return vec![],
        Some(rect) if rect.min().x >= -180.0 && rect.max().x <= 180.0 => {
            return vec![polygon.clone()]
        }
        Some(_) => {}
    }

    const GLOBES: [(f64, f64, f64); 3] = [
        (-540.0, -180.0, 360.0),
        (-180.0, 180.0, 0.0),
        (180.0, 540.0, -360.0),
    ];

    let mut pieces = vec![];
    for (west, east, shift) in GLOBES {
        let globe = Rect::new(Coord { x: west, y: -90.0 }, Coord { x: east, y: 90.0 }).to_polygon();
        for piece in polygon.intersection(&globe) {
            if piece.exterior().0.len() > 3 {
                pieces.push(piece.translate(shift, 0.0));
            }
        }
    }

    pieces
}

/// Bring a longitude into [-180, 180], values already in range are left alone.
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// The capabilities the matching engine needs from a geometry library.
pub trait GeometryOps {
    /// Is this a simple (non self-intersecting) polygonal geometry, or a collection of them?
    fn is_valid(&self) -> bool;

    /// Do the two geometries share any point?
    fn intersects(&self, other: &Geometry) -> bool;

    /// Is the geographic coordinate inside this geometry?
    fn contains_point(&self, lon: f64, lat: f64) -> bool;

    /// The center of mass, `None` for empty geometries.
    fn centroid(&self) -> Option<Point<f64>>;

    /// Well known text representation.
    fn to_wkt(&self) -> String;
}

/// A geometry with lon mapped to x and lat mapped to y.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
    Polygon(Polygon<f64>),
    Collection(Vec<Geometry>),
}

impl Geometry {
    /// Create a polygon from a ring of (lon, lat) coordinates.
    ///
    /// The ring is closed if the caller didn't close it already.
    pub fn polygon(ring: Vec<Coord<f64>>) -> Self {
        Geometry::Polygon(Polygon::new(LineString::from(ring), vec![]))
    }

    /// Create a line from a list of (lon, lat) coordinates.
    pub fn line(coords: Vec<Coord<f64>>) -> Self {
        Geometry::LineString(LineString::from(coords))
    }

    /// Create a point.
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point(Point::new(lon, lat))
    }

    /// The number of top level parts. Anything that isn't a collection has one part.
    pub fn num_geometries(&self) -> usize {
        match self {
            Geometry::Collection(parts) => parts.len(),
            _ => 1,
        }
    }

    /// The top level parts of this geometry, a non-collection is its own only part.
    pub fn geometries(&self) -> Vec<&Geometry> {
        match self {
            Geometry::Collection(parts) => parts.iter().collect(),
            other => vec![other],
        }
    }

    /// All polygons in this geometry in order.
    pub fn polygons(&self) -> Vec<&Polygon<f64>> {
        match self {
            Geometry::Polygon(poly) => vec![poly],
            Geometry::Collection(parts) => parts.iter().flat_map(|p| p.polygons()).collect(),
            _ => vec![],
        }
    }

    /// All line strings in this geometry in order.
    pub fn line_strings(&self) -> Vec<&LineString<f64>> {
        match self {
            Geometry::LineString(ls) => vec![ls],
            Geometry::Collection(parts) => parts.iter().flat_map(|p| p.line_strings()).collect(),
            _ => vec![],
        }
    }

    /// All vertices in order, for polygons this is the exterior ring including the closing point.
    pub fn coords(&self) -> Vec<Coord<f64>> {
        match self {
            Geometry::Point(pnt) => vec![pnt.0],
            Geometry::LineString(ls) => ls.0.clone(),
            Geometry::Polygon(poly) => poly.exterior().0.clone(),
            Geometry::Collection(parts) => parts.iter().flat_map(|p| p.coords()).collect(),
        }
    }

    /// Does this geometry contain no coordinates at all?
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::LineString(ls) => ls.0.is_empty(),
            Geometry::Polygon(poly) => poly.exterior().0.is_empty(),
            Geometry::Collection(parts) => parts.iter().all(|p| p.is_empty()),
        }
    }

    /**
     * This geometry with every polygon mapped onto the globe with [map_to_globe].
     *
     * A polygon cut at the anti-meridian becomes a collection of its pieces, so a collection keeps
     * its number of top level parts.
     */
    pub fn on_globe(&self) -> Geometry {
        match self {
            Geometry::Polygon(poly) => {
                let mut pieces: Vec<Geometry> =
                    map_to_globe(poly).into_iter().map(Geometry::Polygon).collect();
                if pieces.len() == 1 {
                    pieces.remove(0)
                } else {
                    Geometry::Collection(pieces)
                }
            }
            Geometry::Collection(parts) => {
                Geometry::Collection(parts.iter().map(Geometry::on_globe).collect())
            }
            other => other.clone(),
        }
    }

    /// The polygonal intersection of two geometries, one polygon per connected part.
    pub fn polygon_intersection(&self, other: &Geometry) -> Vec<Polygon<f64>> {
        let mut parts = vec![];
        for left in self.polygons() {
            for right in other.polygons() {
                if !left.intersects(right) {
                    continue;
                }

                let overlap = left.intersection(right);
                parts.extend(overlap.0.into_iter().filter(|p| p.exterior().0.len() > 3));
            }
        }

        parts
    }
}

impl GeometryOps for Geometry {
    fn is_valid(&self) -> bool {
        match self {
            Geometry::Point(pnt) => pnt.x().is_finite() && pnt.y().is_finite(),
            Geometry::LineString(ls) => {
                ls.0.len() > 1 && ls.0.iter().all(|c| c.x.is_finite() && c.y.is_finite())
            }
            Geometry::Polygon(poly) => ring_is_simple(poly.exterior()),
            Geometry::Collection(parts) => !parts.is_empty() && parts.iter().all(|p| p.is_valid()),
        }
    }

    fn intersects(&self, other: &Geometry) -> bool {
        match (self, other) {
            (Geometry::Collection(parts), _) => parts.iter().any(|p| p.intersects(other)),
            (_, Geometry::Collection(parts)) => parts.iter().any(|p| self.intersects(p)),
            (Geometry::Point(a), Geometry::Point(b)) => a == b,
            (Geometry::Point(a), Geometry::LineString(b)) => a.intersects(b),
            (Geometry::Point(a), Geometry::Polygon(b)) => a.intersects(b),
            (Geometry::LineString(a), Geometry::Point(b)) => a.intersects(b),
            (Geometry::LineString(a), Geometry::LineString(b)) => a.intersects(b),
            (Geometry::LineString(a), Geometry::Polygon(b)) => a.intersects(b),
            (Geometry::Polygon(a), Geometry::Point(b)) => a.intersects(b),
            (Geometry::Polygon(a), Geometry::LineString(b)) => a.intersects(b),
            (Geometry::Polygon(a), Geometry::Polygon(b)) => a.intersects(b),
        }
    }

    fn contains_point(&self, lon: f64, lat: f64) -> bool {
        let pnt = Point::new(lon, lat);
        match self {
            Geometry::Point(p) => *p == pnt,
            Geometry::LineString(ls) => ls.contains(&pnt),
            Geometry::Polygon(poly) => poly.contains(&pnt),
            Geometry::Collection(parts) => parts.iter().any(|p| p.contains_point(lon, lat)),
        }
    }

    fn centroid(&self) -> Option<Point<f64>> {
        match self {
            Geometry::Point(pnt) => Some(*pnt),
            Geometry::LineString(ls) => ls.centroid(),
            Geometry::Polygon(poly) => poly.centroid(),
            Geometry::Collection(parts) => {
                let centers: Vec<Point<f64>> = parts.iter().filter_map(|p| p.centroid()).collect();
                if centers.is_empty() {
                    return None;
                }

                let n = centers.len() as f64;
                let (sum_x, sum_y) = centers
                    .iter()
                    .fold((0.0, 0.0), |(x, y), c| (x + c.x(), y + c.y()));
                Some(Point::new(sum_x / n, sum_y / n))
            }
        }
    }

    fn to_wkt(&self) -> String {
        self.to_string()
    }
}

fn write_coords(f: &mut fmt::Formatter, coords: &[Coord<f64>]) -> fmt::Result {
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{} {}", c.x, c.y)?;
    }

    Ok(())
}

impl Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Geometry::Point(pnt) => write!(f, "POINT({} {})", pnt.x(), pnt.y()),
            Geometry::LineString(ls) => {
                write!(f, "LINESTRING(")?;
                write_coords(f, &ls.0)?;
                write!(f, ")")
            }
            Geometry::Polygon(poly) => {
                write!(f, "POLYGON((")?;
                write_coords(f, &poly.exterior().0)?;
                write!(f, "))")
            }
            Geometry::Collection(parts) => {
                write!(f, "GEOMETRYCOLLECTION(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
        }
    }
}

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod validity;

#[cfg(test)]
mod test {
    use super::*;
    use geo::coord;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::polygon(vec![
            coord! {x: x0, y: y0},
            coord! {x: x0 + size, y: y0},
            coord! {x: x0 + size, y: y0 + size},
            coord! {x: x0, y: y0 + size},
            coord! {x: x0, y: y0},
        ])
    }

    #[test]
    fn test_great_circle_distance() {
        assert_eq!(great_circle_distance(45.0, -120.0, 45.0, -120.0), 0.0);

        // One degree of latitude along a meridian.
        let dist = great_circle_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111.195).abs() < 0.01);

        // Symmetric
        let d1 = great_circle_distance(20.0, 12.0, 30.0, 13.0);
        let d2 = great_circle_distance(30.0, 13.0, 20.0, 12.0);
        assert!((d1 - d2).abs() < 1.0e-9);
    }

    #[test]
    fn test_normalize_longitudes_crossing_dateline() {
        let mut coords = vec![
            coord! {x: 170.0, y: 0.0},
            coord! {x: -170.0, y: 0.0},
            coord! {x: -170.0, y: 10.0},
            coord! {x: 170.0, y: 10.0},
            coord! {x: 170.0, y: 0.0},
        ];

        normalize_longitudes(&mut coords);

        let lons: Vec<f64> = coords.iter().map(|c| c.x).collect();
        assert_eq!(lons, vec![170.0, 190.0, 190.0, 170.0, 170.0]);
    }

    #[test]
    fn test_normalize_longitudes_shifts_western_rings_east() {
        let mut coords = vec![
            coord! {x: -170.0, y: 0.0},
            coord! {x: 170.0, y: 0.0},
            coord! {x: 170.0, y: 10.0},
            coord! {x: -170.0, y: 10.0},
        ];

        normalize_longitudes(&mut coords);

        let lons: Vec<f64> = coords.iter().map(|c| c.x).collect();
        assert_eq!(lons, vec![190.0, 170.0, 170.0, 190.0]);
    }

    #[test]
    fn test_normalize_longitudes_leaves_plain_rings_alone() {
        let mut coords = vec![coord! {x: 10.0, y: 0.0}, coord! {x: 12.0, y: 1.0}];
        normalize_longitudes(&mut coords);
        assert_eq!(coords[0].x, 10.0);
        assert_eq!(coords[1].x, 12.0);
    }

    #[test]
    fn test_map_to_globe() {
        // 178.5 to 181.5 degrees east, crossing the anti-meridian.
        let crossing = square(178.5, 10.0, 3.0);
        let pieces = match &crossing {
            Geometry::Polygon(poly) => map_to_globe(poly),
            _ => unreachable!(),
        };
        assert_eq!(pieces.len(), 2);

        let central = Geometry::Polygon(pieces[0].clone());
        assert!(central.contains_point(179.0, 11.0));
        assert!(!central.contains_point(-179.0, 11.0));

        let east = Geometry::Polygon(pieces[1].clone());
        assert!(east.contains_point(-179.0, 11.0));
        let rect = pieces[1].bounding_rect().unwrap();
        assert_eq!((rect.min().x, rect.max().x), (-180.0, -178.5));

        // A western ring is split the same way.
        let west = square(-181.0, 0.0, 2.0).on_globe();
        assert_eq!(west.num_geometries(), 2);
        assert!(west.contains_point(179.5, 1.0));
        assert!(west.contains_point(-179.5, 1.0));

        // Nothing to do for rings on the globe.
        let plain = square(10.0, 10.0, 1.0);
        assert_eq!(plain.on_globe(), plain);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(12.5), 12.5);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        assert_eq!(wrap_longitude(181.5), -178.5);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(540.0), -180.0);
    }

    #[test]
    fn test_contains_and_intersects() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 5.0, 10.0);
        let c = square(20.0, 20.0, 1.0);

        assert!(a.contains_point(1.0, 1.0));
        assert!(!a.contains_point(11.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let both = Geometry::Collection(vec![a.clone(), c.clone()]);
        assert!(both.contains_point(20.5, 20.5));
        assert!(both.intersects(&b));
        assert_eq!(both.num_geometries(), 2);
        assert_eq!(both.polygons().len(), 2);
    }

    #[test]
    fn test_polygon_intersection() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 5.0, 10.0);
        let c = square(20.0, 20.0, 1.0);

        let parts = a.polygon_intersection(&b);
        assert_eq!(parts.len(), 1);
        let overlap = Geometry::Polygon(parts[0].clone());
        assert!(overlap.contains_point(7.5, 7.5));
        assert!(!overlap.contains_point(2.5, 2.5));

        assert!(a.polygon_intersection(&c).is_empty());
    }

    #[test]
    fn test_centroid() {
        let a = square(0.0, 0.0, 2.0);
        let centroid = a.centroid().unwrap();
        assert!((centroid.x() - 1.0).abs() < 1.0e-12);
        assert!((centroid.y() - 1.0).abs() < 1.0e-12);

        let both = Geometry::Collection(vec![square(0.0, 0.0, 2.0), square(4.0, 0.0, 2.0)]);
        let centroid = both.centroid().unwrap();
        assert!((centroid.x() - 3.0).abs() < 1.0e-12);
        assert!((centroid.y() - 1.0).abs() < 1.0e-12);
    }

    #[test]
    fn test_wkt() {
        let pnt = Geometry::point(1.5, -2.0);
        assert_eq!(pnt.to_wkt(), "POINT(1.5 -2)");

        let line = Geometry::line(vec![coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 1.0}]);
        assert_eq!(line.to_wkt(), "LINESTRING(0 0,1 1)");

        let poly = square(0.0, 0.0, 1.0);
        assert_eq!(poly.to_wkt(), "POLYGON((0 0,1 0,1 1,0 1,0 0))");

        let coll = Geometry::Collection(vec![pnt, line]);
        assert_eq!(
            coll.to_wkt(),
            "GEOMETRYCOLLECTION(POINT(1.5 -2),LINESTRING(0 0,1 1))"
        );
    }

    #[test]
    fn test_validity() {
        assert!(square(0.0, 0.0, 1.0).is_valid());

        // A bow tie crosses itself.
        let bow_tie = Geometry::polygon(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 1.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 0.0, y: 1.0},
            coord! {x: 0.0, y: 0.0},
        ]);
        assert!(!bow_tie.is_valid());

        let mixed = Geometry::Collection(vec![square(0.0, 0.0, 1.0), bow_tie]);
        assert!(!mixed.is_valid());

        assert!(!Geometry::Collection(vec![]).is_valid());
    }
}
