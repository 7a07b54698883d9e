use geo::{
    line_intersection::{line_intersection, LineIntersection},
    Coord, Line, LineString,
};

/// Check that a closed ring is usable as a polygon boundary.
///
/// The ring must contain at least three distinct vertices, only finite coordinates, and no two
/// edges may touch except for neighbors sharing their common vertex. Repeated consecutive vertices
/// are ignored.
///
/// `geo` 0.28 has no validation algorithm, so every pair of edges is tested. That is quadratic in
/// the number of vertices, outlines sampled on the pixel interval are small enough for it.
pub fn ring_is_simple(ring: &LineString<f64>) -> bool {
    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    coords.dedup();

    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return false;
    }

    if coords.len() < 4 || coords.first() != coords.last() {
        return false;
    }

    let edges: Vec<Line<f64>> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);

            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return false,
                Some(LineIntersection::SinglePoint { is_proper, .. }) => {
                    if !adjacent || is_proper {
                        return false;
                    }
                }
            }
        }
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;
    use geo::coord;

    #[test]
    fn test_simple_rings() {
        let triangle = LineString::from(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 0.0, y: 1.0},
            coord! {x: 0.0, y: 0.0},
        ]);
        assert!(ring_is_simple(&triangle));

        // Repeated vertices are fine.
        let repeated = LineString::from(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 0.0, y: 1.0},
            coord! {x: 0.0, y: 0.0},
        ]);
        assert!(ring_is_simple(&repeated));
    }

    #[test]
    fn test_invalid_rings() {
        let open = LineString::from(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 0.0, y: 1.0},
        ]);
        assert!(!ring_is_simple(&open));

        let too_short = LineString::from(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 0.0, y: 0.0},
        ]);
        assert!(!ring_is_simple(&too_short));

        // Spike going back over its own edge.
        let spike = LineString::from(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: 2.0, y: 0.0},
            coord! {x: 1.0, y: 0.0},
            coord! {x: 1.0, y: 1.0},
            coord! {x: 0.0, y: 0.0},
        ]);
        assert!(!ring_is_simple(&spike));

        let not_finite = LineString::from(vec![
            coord! {x: 0.0, y: 0.0},
            coord! {x: f64::NAN, y: 0.0},
            coord! {x: 0.0, y: 1.0},
            coord! {x: 0.0, y: 0.0},
        ]);
        assert!(!ring_is_simple(&not_finite));
    }
}
