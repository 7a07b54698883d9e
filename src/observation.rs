/*! Descriptions of the data files that take part in a matchup run. */
use crate::{
    error::{MatchupError, MatchupResult},
    geometry::{Geometry, GeometryOps},
    time_axis::{TimeAxis, TimeInterval},
};
use chrono::{DateTime, Utc};
use geo::{Coord, LineString};
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};
use strum::{AsRefStr, Display as StrumDisplay, EnumString, IntoStaticStr};

/// A step size in pixels, x is across track and y is along track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    x: i32,
    y: i32,
}

impl Interval {
    /// Both components must be at least 1.
    pub fn new(x: i32, y: i32) -> MatchupResult<Self> {
        if x <= 0 || y <= 0 {
            return Err(MatchupError::InvalidInterval { x, y });
        }

        Ok(Interval { x, y })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }
}

/// Every pixel.
impl Default for Interval {
    fn default() -> Self {
        Interval { x: 1, y: 1 }
    }
}

/** The direction of the satellite along its orbit while a file was acquired. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, StrumDisplay, IntoStaticStr, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum NodeType {
    /// Moving north.
    Ascending,
    /// Moving south.
    Descending,
    /// Unknown or mixed.
    Undefined,
}

impl Default for NodeType {
    fn default() -> Self {
        NodeType::Undefined
    }
}

/// A sensor name with an optional processing version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sensor {
    name: String,
    data_version: Option<String>,
}

impl Sensor {
    pub fn new(name: &str) -> Self {
        Sensor {
            name: name.to_owned(),
            data_version: None,
        }
    }

    pub fn with_version(name: &str, version: &str) -> Self {
        Sensor {
            name: name.to_owned(),
            data_version: Some(version.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_version(&self) -> Option<&str> {
        self.data_version.as_deref()
    }
}

impl Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match &self.data_version {
            Some(version) => write!(f, "{} ({})", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/**
 * Everything a reader can tell about the swath in a data file.
 *
 * The outline is always present as `coordinates`. When the outline had to be split to get valid
 * polygons, `sub_polygons` holds the pieces, and there is one time axis per piece. The time axes
 * are either given explicitly as lines, or as index ranges into `coordinates` for the pixel coded
 * outlines.
 */
#[derive(Debug, Clone)]
pub struct AcquisitionInfo {
    coordinates: Vec<Coord<f64>>,
    sub_polygons: Option<Vec<Geometry>>,
    time_axis_start_indices: Vec<usize>,
    time_axis_end_indices: Vec<usize>,
    time_axes_geometry: Option<Geometry>,
    sensing_start: DateTime<Utc>,
    sensing_stop: DateTime<Utc>,
    node_type: NodeType,
}

impl AcquisitionInfo {
    pub fn new(
        coordinates: Vec<Coord<f64>>,
        sensing_start: DateTime<Utc>,
        sensing_stop: DateTime<Utc>,
    ) -> Self {
        AcquisitionInfo {
            coordinates,
            sub_polygons: None,
            time_axis_start_indices: vec![],
            time_axis_end_indices: vec![],
            time_axes_geometry: None,
            sensing_start,
            sensing_stop,
            node_type: NodeType::Undefined,
        }
    }

    pub fn with_sub_polygons(mut self, sub_polygons: Vec<Geometry>) -> Self {
        self.sub_polygons = Some(sub_polygons);
        self
    }

    pub fn with_time_axis_indices(mut self, starts: Vec<usize>, ends: Vec<usize>) -> Self {
        self.time_axis_start_indices = starts;
        self.time_axis_end_indices = ends;
        self
    }

    pub fn with_time_axes_geometry(mut self, axes: Geometry) -> Self {
        self.time_axes_geometry = Some(axes);
        self
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }

    pub fn with_sensing_times(mut self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        self.sensing_start = start;
        self.sensing_stop = stop;
        self
    }

    pub fn coordinates(&self) -> &[Coord<f64>] {
        &self.coordinates
    }

    pub fn sub_polygons(&self) -> Option<&[Geometry]> {
        self.sub_polygons.as_deref()
    }

    pub fn time_axis_start_indices(&self) -> &[usize] {
        &self.time_axis_start_indices
    }

    pub fn time_axis_end_indices(&self) -> &[usize] {
        &self.time_axis_end_indices
    }

    pub fn sensing_start(&self) -> DateTime<Utc> {
        self.sensing_start
    }

    pub fn sensing_stop(&self) -> DateTime<Utc> {
        self.sensing_stop
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /**
     * The geographic bounds on the globe, either the single outline or the collection of its
     * pieces.
     *
     * There is one top level part per time axis. Parts crossing the anti-meridian are cut in two
     * and become collections themselves.
     */
    pub fn bounding_geometry(&self) -> Geometry {
        match &self.sub_polygons {
            Some(parts) if !parts.is_empty() => Geometry::Collection(parts.clone()).on_globe(),
            _ => match Geometry::polygon(self.coordinates.clone()).on_globe() {
                outline @ Geometry::Polygon(_) => outline,
                pieces => Geometry::Collection(vec![pieces]),
            },
        }
    }

    /// The lines along which time is measured, one per piece of the bounds.
    pub fn time_axis_lines(&self) -> Vec<LineString<f64>> {
        if let Some(axes) = &self.time_axes_geometry {
            return axes.line_strings().into_iter().cloned().collect();
        }

        self.time_axis_start_indices
            .iter()
            .zip(&self.time_axis_end_indices)
            .filter(|(start, end)| *end > *start && **end < self.coordinates.len())
            .map(|(&start, &end)| LineString::from(self.coordinates[start..=end].to_vec()))
            .filter(|ls| ls.0.len() > 1)
            .collect()
    }

    /**
     * Create the time axes for the swath.
     *
     * The sensing interval is split into as many equal parts as there are axis lines, so each
     * piece of a split outline gets its own share of the sensing time.
     */
    pub fn time_axes(&self) -> Vec<TimeAxis> {
        time_axes_for(
            self.time_axis_lines(),
            self.sensing_start,
            self.sensing_stop,
        )
    }
}

/// Pair each axis line with an equal share of the interval `[start, stop]`, in order.
pub fn time_axes_for(
    lines: Vec<LineString<f64>>,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
) -> Vec<TimeAxis> {
    let splits = TimeInterval::new(start, stop).split(lines.len());
    lines
        .into_iter()
        .zip(splits)
        .map(|(line, iv)| TimeAxis::new(line, iv.start(), iv.stop()))
        .collect()
}

/**
 * A data file registered for matching.
 *
 * Observations are created once when the archive is scanned and only read afterwards.
 */
#[derive(Debug, Clone)]
pub struct SatelliteObservation {
    sensor: Sensor,
    version: String,
    data_file_path: PathBuf,
    start_time: DateTime<Utc>,
    stop_time: DateTime<Utc>,
    geo_bounds: Geometry,
    time_axes: Vec<TimeAxis>,
    node_type: NodeType,
}

impl SatelliteObservation {
    pub fn new<P: AsRef<Path>>(
        sensor: Sensor,
        version: &str,
        path: P,
        start_time: DateTime<Utc>,
        stop_time: DateTime<Utc>,
        geo_bounds: Geometry,
    ) -> Self {
        SatelliteObservation {
            sensor,
            version: version.to_owned(),
            data_file_path: path.as_ref().to_path_buf(),
            start_time,
            stop_time,
            geo_bounds,
            time_axes: vec![],
            node_type: NodeType::Undefined,
        }
    }

    /// Build the observation from what the reader found in the file.
    pub fn from_acquisition_info<P: AsRef<Path>>(
        sensor: Sensor,
        version: &str,
        path: P,
        info: &AcquisitionInfo,
    ) -> Self {
        Self::new(
            sensor,
            version,
            path,
            info.sensing_start(),
            info.sensing_stop(),
            info.bounding_geometry(),
        )
        .with_time_axes(info.time_axes())
        .with_node_type(info.node_type())
    }

    pub fn with_time_axes(mut self, time_axes: Vec<TimeAxis>) -> Self {
        self.time_axes = time_axes;
        self
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }

    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn data_file_path(&self) -> &Path {
        &self.data_file_path
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn stop_time(&self) -> DateTime<Utc> {
        self.stop_time
    }

    pub fn time_interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.stop_time)
    }

    pub fn geo_bounds(&self) -> &Geometry {
        &self.geo_bounds
    }

    pub fn time_axes(&self) -> &[TimeAxis] {
        &self.time_axes
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Are the bounds made of more than one piece?
    pub fn is_segmented(&self) -> bool {
        self.geo_bounds.num_geometries() > 1
    }

    /// Does the geographic footprint contain the point?
    pub fn covers(&self, lon: f64, lat: f64) -> bool {
        self.geo_bounds.contains_point(lon, lat)
    }
}

impl Display for SatelliteObservation {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "       Sensor: {}", self.sensor)?;
        writeln!(f, "      Version: {}", self.version)?;
        writeln!(f, "         File: {}", self.data_file_path.display())?;
        writeln!(f, "        Start: {}", self.start_time)?;
        writeln!(f, "         Stop: {}", self.stop_time)?;
        writeln!(f, "    Node Type: {}", self.node_type)?;
        writeln!(f, "Sub-Geometries: {}", self.geo_bounds.num_geometries())
    }
}
