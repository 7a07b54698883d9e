pub use archive::ObservationArchive;
pub use bounding_polygon::{close_polygon, row_bands, subset_height, BoundingPolygonCreator};
pub use condition::{
    BorderDistanceCondition, Condition, ConditionEngine, DistanceCondition, OverlapRemoveCondition,
    ProductSizes, SampleRole, TimeDeltaCondition, UniqueSamplesCondition,
};
pub use config::{MatchupConfig, DEFAULT_MAX_SPLITS};
pub use error::{MatchupError, MatchupResult};
pub use geometry::{
    great_circle_distance, map_to_globe, normalize_longitudes, ring_is_simple, wrap_longitude,
    Geometry, GeometryOps, EARTH_RADIUS_KM,
};
pub use grid::LatLonGrid;
pub use intersection::{intersecting_intervals, Intersection, TimeInfo};
pub use locator::{
    PixelLocator, PixelLocatorX1Yn, SegmentedPixelLocator, SwathPixelLocator, TimeLocator,
    TimeLocatorTai1993Scan, TimeLocatorYearDoyMs,
};
pub use observation::{
    time_axes_for, AcquisitionInfo, Interval, NodeType, SatelliteObservation, Sensor,
};
pub use permutator::SampleReceiverPermutator;
pub use reader::{Reader, ReaderRegistry, SwathDump, SwathDumpReader};
pub use sample::{MatchupCollection, MatchupSet, Sample, SampleSet, SecondaryFile};
pub use sample_collector::SampleCollector;
pub use strategy::{
    candidates_by_geometry, candidates_by_point, candidates_by_time, candidates_by_time_window,
    InsituMatchupStrategy, MatchupStrategy, PolarOrbitingMatchupStrategy, ToolContext,
};
pub use time_axis::{time_delta, TimeAxis, TimeInterval};

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod archive;
mod bounding_polygon;
mod condition;
mod config;
mod error;
mod geometry;
mod grid;
mod intersection;
mod locator;
mod observation;
mod permutator;
mod reader;
mod sample;
mod sample_collector;
mod strategy;
mod time_axis;
