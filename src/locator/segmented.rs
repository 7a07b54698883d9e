use super::PixelLocator;
use crate::error::MatchupResult;
use geo::{Coord, Point};

/**
 * A pixel locator for swaths that had to be split into bands of scanlines.
 *
 * Each band has its own locator working in band local pixel coordinates. This type translates
 * between the band local and the whole swath scanline numbers.
 */
pub struct SegmentedPixelLocator {
    swath_width: i32,
    segments: Vec<Segment>,
}

struct Segment {
    locator: Box<dyn PixelLocator>,
    first_row: i32,
    last_row: i32,
}

impl SegmentedPixelLocator {
    pub fn new(swath_width: i32) -> Self {
        SegmentedPixelLocator {
            swath_width,
            segments: vec![],
        }
    }

    /// Add a locator for the scanlines `first_row..=last_row`.
    pub fn add_segment(&mut self, locator: Box<dyn PixelLocator>, first_row: i32, last_row: i32) {
        self.segments.push(Segment {
            locator,
            first_row,
            last_row,
        });
    }

    /**
     * Is a band local pixel position inside the band covering `first_row..=last_row`?
     *
     * Positions are continuous, the last scanline of the band spans `last_row..last_row + 1`.
     */
    pub fn is_in_segment(&self, local: Coord<f64>, first_row: i32, last_row: i32) -> bool {
        let height = f64::from(last_row - first_row + 1);

        local.x >= 0.0
            && local.x < f64::from(self.swath_width)
            && local.y >= 0.0
            && local.y < height
    }
}

impl PixelLocator for SegmentedPixelLocator {
    fn geo_location(&self, x: f64, y: f64) -> MatchupResult<Option<Point<f64>>> {
        if x < 0.0 || x >= f64::from(self.swath_width) {
            return Ok(None);
        }

        for seg in &self.segments {
            if y >= f64::from(seg.first_row) && y < f64::from(seg.last_row + 1) {
                return seg.locator.geo_location(x, y - f64::from(seg.first_row));
            }
        }

        Ok(None)
    }

    fn pixel_location(&self, lon: f64, lat: f64) -> Vec<Coord<f64>> {
        let mut hits = vec![];
        for seg in &self.segments {
            for local in seg.locator.pixel_location(lon, lat) {
                if self.is_in_segment(local, seg.first_row, seg.last_row) {
                    hits.push(Coord {
                        x: local.x,
                        y: local.y + f64::from(seg.first_row),
                    });
                }
            }
        }

        hits
    }
}
