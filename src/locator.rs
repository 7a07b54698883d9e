/*!
 * Mapping between pixel coordinates, geographic coordinates and acquisition times.
 *
 * Pixel coordinates are floating point with the center of pixel (x, y) at (x + 0.5, y + 0.5). x is
 * the pixel across the track and y the scanline.
 */
use crate::error::MatchupResult;
use chrono::{DateTime, Utc};
use geo::{Coord, Point};

pub use segmented::SegmentedPixelLocator;
pub use swath::SwathPixelLocator;
pub use time::{TimeLocatorTai1993Scan, TimeLocatorYearDoyMs};
pub use x1yn::PixelLocatorX1Yn;

/// Geolocation of a raster in both directions.
pub trait PixelLocator {
    /// The geographic location of a pixel position, `None` if there isn't one.
    fn geo_location(&self, x: f64, y: f64) -> MatchupResult<Option<Point<f64>>>;

    /// Every pixel position that observed the geographic location.
    ///
    /// Swaths can observe the same location more than once, so there may be several.
    fn pixel_location(&self, lon: f64, lat: f64) -> Vec<Coord<f64>>;
}

/// When a pixel was observed.
pub trait TimeLocator {
    fn time_for(&self, x: i32, y: i32) -> MatchupResult<DateTime<Utc>>;
}

impl<T: PixelLocator + ?Sized> PixelLocator for Box<T> {
    fn geo_location(&self, x: f64, y: f64) -> MatchupResult<Option<Point<f64>>> {
        (**self).geo_location(x, y)
    }

    fn pixel_location(&self, lon: f64, lat: f64) -> Vec<Coord<f64>> {
        (**self).pixel_location(lon, lat)
    }
}

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod segmented;
mod swath;
mod time;
mod x1yn;
