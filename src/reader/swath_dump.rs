use super::Reader;
use crate::{
    bounding_polygon::{row_bands, BoundingPolygonCreator},
    error::{MatchupError, MatchupResult},
    geometry::{Geometry, GeometryOps},
    grid::LatLonGrid,
    locator::{
        PixelLocator, SegmentedPixelLocator, SwathPixelLocator, TimeLocator, TimeLocatorYearDoyMs,
    },
    observation::{AcquisitionInfo, Interval, NodeType},
};
use chrono::{DateTime, TimeZone, Utc};
use geo::{Centroid, Polygon};
use once_cell::unsync::OnceCell;
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    str::FromStr,
};

/**
 * The contents of a swath dump file.
 *
 * A swath dump is a plain text file. Blank lines and lines starting with `#` are ignored. It starts
 * with header lines of the form `key value`:
 *
 * * `sensor` - the sensor name.
 * * `version` - the processing version.
 * * `start`, `stop` - the sensing interval in RFC 3339 format, defaults to the first and last
 *   scanline times.
 * * `node` - ascending, descending or undefined.
 * * `rows`, `cols` - the size of the swath, required.
 *
 * Then come `rows * cols` lines of `lon lat`, row by row, followed by `rows` lines with the time
 * of each scanline in seconds since the Unix epoch.
 */
#[derive(Debug, Clone)]
pub struct SwathDump {
    pub sensor: String,
    pub version: String,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub node_type: NodeType,
    pub grid: LatLonGrid,
    pub line_times: Vec<DateTime<Utc>>,
}

impl SwathDump {
    /// Render in the text format, the inverse of parsing.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl Display for SwathDump {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "sensor {}", self.sensor)?;
        writeln!(f, "version {}", self.version)?;
        writeln!(f, "start {}", self.start.to_rfc3339())?;
        writeln!(f, "stop {}", self.stop.to_rfc3339())?;
        writeln!(f, "node {}", self.node_type)?;
        writeln!(f, "rows {}", self.grid.rows())?;
        writeln!(f, "cols {}", self.grid.cols())?;

        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                writeln!(f, "{} {}", self.grid.lon(row, col), self.grid.lat(row, col))?;
            }
        }

        for time in &self.line_times {
            writeln!(f, "{}", time.timestamp_millis() as f64 / 1000.0)?;
        }

        Ok(())
    }
}

impl FromStr for SwathDump {
    type Err = MatchupError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .peekable();

        let mut sensor = None;
        let mut version = None;
        let mut start = None;
        let mut stop = None;
        let mut node_type = NodeType::Undefined;
        let mut rows = None;
        let mut cols = None;

        while let Some(line) = lines.peek() {
            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (*line, ""),
            };

            match key {
                "sensor" => sensor = Some(value.to_owned()),
                "version" => version = Some(value.to_owned()),
                "start" => start = Some(parse_time(value)?),
                "stop" => stop = Some(parse_time(value)?),
                "node" => {
                    node_type = NodeType::from_str(value)
                        .map_err(|_| MatchupError::Parse(format!("unknown node type: {}", value)))?
                }
                "rows" => rows = Some(parse_number::<usize>(value)?),
                "cols" => cols = Some(parse_number::<usize>(value)?),
                _ => break,
            }

            lines.next();
        }

        let sensor = sensor.ok_or_else(|| missing("sensor"))?;
        let version = version.unwrap_or_else(|| "unknown".to_owned());
        let rows = rows.ok_or_else(|| missing("rows"))?;
        let cols = cols.ok_or_else(|| missing("cols"))?;

        let mut lons = Vec::with_capacity(rows * cols);
        let mut lats = Vec::with_capacity(rows * cols);
        for _ in 0..(rows * cols) {
            let line = lines
                .next()
                .ok_or_else(|| MatchupError::Parse("too few geolocation lines".to_owned()))?;

            let mut tokens = line.split_whitespace();
            let lon = parse_number::<f64>(tokens.next().unwrap_or(""))?;
            let lat = parse_number::<f64>(tokens.next().unwrap_or(""))?;
            lons.push(lon);
            lats.push(lat);
        }

        let line_times = (0..rows)
            .map(|_| {
                let line = lines
                    .next()
                    .ok_or_else(|| MatchupError::Parse("too few scanline times".to_owned()))?;
                epoch_seconds(parse_number::<f64>(line)?)
            })
            .collect::<MatchupResult<Vec<_>>>()?;

        if lines.next().is_some() {
            return Err(MatchupError::Parse("unexpected trailing lines".to_owned()));
        }

        let start = match (start, line_times.first()) {
            (Some(start), _) => start,
            (None, Some(first)) => *first,
            (None, None) => return Err(missing("start")),
        };
        let stop = match (stop, line_times.last()) {
            (Some(stop), _) => stop,
            (None, Some(last)) => *last,
            (None, None) => return Err(missing("stop")),
        };

        Ok(SwathDump {
            sensor,
            version,
            start,
            stop,
            node_type,
            grid: LatLonGrid::new(rows, cols, lons, lats)?,
            line_times,
        })
    }
}

fn missing(key: &str) -> MatchupError {
    MatchupError::Parse(format!("missing header '{}'", key))
}

fn parse_time(value: &str) -> MatchupResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| MatchupError::Parse(format!("invalid time '{}': {}", value, err)))
}

fn parse_number<T: FromStr>(value: &str) -> MatchupResult<T> {
    value
        .parse()
        .map_err(|_| MatchupError::Parse(format!("invalid number '{}'", value)))
}

fn epoch_seconds(seconds: f64) -> MatchupResult<DateTime<Utc>> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(MatchupError::Parse(format!("invalid scanline time {}", seconds)));
    }
    let millis = millis as i64;
    Utc.timestamp_opt(
        millis.div_euclid(1000),
        (millis.rem_euclid(1000) * 1_000_000) as u32,
    )
    .single()
    .ok_or_else(|| MatchupError::Parse(format!("invalid scanline time {}", seconds)))
}

/**
 * Reads swath dump files.
 *
 * The outline is split as often as needed, up to `max_splits`, to make it valid. Geographic
 * locations further than `max_distance_km` from every pixel are outside the swath.
 */
pub struct SwathDumpReader {
    interval: Interval,
    max_splits: usize,
    max_distance_km: f64,
    path: Option<PathBuf>,
    dump: Option<SwathDump>,
    outline: OnceCell<(Geometry, usize)>,
    pixel_locator: OnceCell<SwathPixelLocator>,
    time_locator: OnceCell<TimeLocatorYearDoyMs>,
}

impl SwathDumpReader {
    pub fn new(interval: Interval, max_splits: usize, max_distance_km: f64) -> Self {
        SwathDumpReader {
            interval,
            max_splits,
            max_distance_km,
            path: None,
            dump: None,
            outline: OnceCell::new(),
            pixel_locator: OnceCell::new(),
            time_locator: OnceCell::new(),
        }
    }

    /// Use already parsed contents instead of reading a file.
    pub fn open_dump(&mut self, dump: SwathDump) {
        self.close();
        self.dump = Some(dump);
    }

    /// The file opened last, `None` for parsed contents.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn dump(&self) -> MatchupResult<&SwathDump> {
        self.dump.as_ref().ok_or_else(|| {
            MatchupError::Configuration("Swath dump reader used before opening a file.".to_owned())
        })
    }

    fn outline(&self) -> MatchupResult<&(Geometry, usize)> {
        self.outline.get_or_try_init(|| {
            let dump = self.dump()?;
            BoundingPolygonCreator::new(self.interval).create_valid_bounding_geometry(
                &dump.grid,
                self.max_splits,
                false,
            )
        })
    }
}

impl Reader for SwathDumpReader {
    fn open(&mut self, path: &Path) -> MatchupResult<()> {
        let text = std::fs::read_to_string(path)?;
        let dump = SwathDump::from_str(&text)?;

        self.open_dump(dump);
        self.path = Some(path.to_path_buf());
        log::debug!("Opened swath dump {}", path.display());

        Ok(())
    }

    fn close(&mut self) {
        self.path = None;
        self.dump = None;
        self.outline = OnceCell::new();
        self.pixel_locator = OnceCell::new();
        self.time_locator = OnceCell::new();
    }

    fn read_acquisition_info(&self) -> MatchupResult<AcquisitionInfo> {
        let dump = self.dump()?;
        let (outline, num_splits) = self.outline()?;
        let creator = BoundingPolygonCreator::new(self.interval);

        let info = AcquisitionInfo::new(outline.coords(), dump.start, dump.stop);
        let info = if *num_splits == 1 {
            info.with_time_axes_geometry(creator.create_time_axis_geometry(&dump.grid)?)
        } else {
            info.with_sub_polygons(outline.geometries().into_iter().cloned().collect())
                .with_time_axes_geometry(
                    creator.create_time_axis_geometry_split(&dump.grid, *num_splits)?,
                )
        };

        Ok(info.with_node_type(dump.node_type))
    }

    fn product_version(&self) -> MatchupResult<String> {
        Ok(self.dump()?.version.clone())
    }

    fn pixel_locator(&self) -> MatchupResult<&dyn PixelLocator> {
        let dump = self.dump()?;
        let locator = self
            .pixel_locator
            .get_or_init(|| SwathPixelLocator::new(dump.grid.clone(), self.max_distance_km));

        Ok(locator)
    }

    fn sub_scene_pixel_locator(
        &self,
        polygon: &Polygon<f64>,
    ) -> MatchupResult<Box<dyn PixelLocator>> {
        let dump = self.dump()?;
        let (outline, num_splits) = self.outline()?;

        let center = polygon.centroid().ok_or_else(|| {
            MatchupError::InvalidGeometry("Empty polygon for a sub-scene.".to_owned())
        })?;

        let bands = row_bands(dump.grid.rows(), *num_splits);
        let parts: Vec<Geometry> = outline
            .geometries()
            .into_iter()
            .map(Geometry::on_globe)
            .collect();

        // Prefer the band the polygon was taken from, then any band containing it.
        let band = parts
            .iter()
            .position(|part| part.polygons().into_iter().any(|p| p == polygon))
            .or_else(|| {
                parts
                    .iter()
                    .position(|part| part.contains_point(center.x(), center.y()))
            })
            .and_then(|idx| bands.get(idx))
            .ok_or_else(|| {
                MatchupError::InvalidGeometry("Polygon is not part of the swath.".to_owned())
            })?;

        let (first, last) = *band;
        let mut locator = SegmentedPixelLocator::new(dump.grid.cols() as i32);
        locator.add_segment(
            Box::new(SwathPixelLocator::new(
                dump.grid.row_band(first, last),
                self.max_distance_km,
            )),
            first as i32,
            last as i32,
        );

        Ok(Box::new(locator))
    }

    fn time_locator(&self) -> MatchupResult<&dyn TimeLocator> {
        let dump = self.dump()?;
        let locator = self
            .time_locator
            .get_or_init(|| TimeLocatorYearDoyMs::from_times(&dump.line_times));

        Ok(locator)
    }

    fn product_size(&self) -> MatchupResult<(usize, usize)> {
        let dump = self.dump()?;
        Ok((dump.grid.cols(), dump.grid.rows()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    const DUMP: &str = "\
# A tiny swath going north
sensor amsub-n15
version v1.0
start 2016-01-01T00:00:00Z
stop 2016-01-01T00:00:20Z
node ascending
rows 3
cols 2

10.0 50.0
10.1 50.0
10.0 50.1
10.1 50.1
10.0 50.2
10.1 50.2

1451606400
1451606410
1451606420.5
";

    fn reader() -> SwathDumpReader {
        let mut reader = SwathDumpReader::new(Interval::new(1, 1).unwrap(), 4, 20.0);
        reader.open_dump(SwathDump::from_str(DUMP).unwrap());
        reader
    }

    #[test]
    fn test_parse() {
        let dump = SwathDump::from_str(DUMP).unwrap();

        assert_eq!(dump.sensor, "amsub-n15");
        assert_eq!(dump.version, "v1.0");
        assert_eq!(dump.node_type, NodeType::Ascending);
        assert_eq!(dump.grid.rows(), 3);
        assert_eq!(dump.grid.cols(), 2);
        assert_eq!(dump.grid.lat(2, 1), 50.2);
        assert_eq!(dump.start, Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            dump.line_times[2],
            Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 20).unwrap() + Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SwathDump::from_str("sensor x\nrows 2\n"),
            Err(MatchupError::Parse(_))
        ));
        assert!(matches!(
            SwathDump::from_str("rows 1\ncols 1\n1 1\n0\n"),
            Err(MatchupError::Parse(_))
        ));
        assert!(matches!(
            SwathDump::from_str("sensor x\nrows 1\ncols 1\n1 1\n"),
            Err(MatchupError::Parse(_))
        ));
        assert!(matches!(
            SwathDump::from_str("sensor x\nrows 1\ncols 1\n1 one\n0\n"),
            Err(MatchupError::Parse(_))
        ));
    }

    #[test]
    fn test_text_round_trip() {
        let dump = SwathDump::from_str(DUMP).unwrap();
        let again = SwathDump::from_str(&dump.to_text()).unwrap();

        assert_eq!(again.grid, dump.grid);
        assert_eq!(again.line_times, dump.line_times);
        assert_eq!(again.stop, dump.stop);
    }

    #[test]
    fn test_acquisition_info() {
        let reader = reader();
        let info = reader.read_acquisition_info().unwrap();

        assert_eq!(info.node_type(), NodeType::Ascending);
        assert!(info.sub_polygons().is_none());
        assert!(info.bounding_geometry().is_valid());
        assert_eq!(info.time_axes().len(), 1);
        assert_eq!(reader.product_size().unwrap(), (2, 3));
        assert_eq!(reader.product_version().unwrap(), "v1.0");
    }

    #[test]
    fn test_locators() {
        let reader = reader();

        let pnt = reader.pixel_locator().unwrap().geo_location(1.5, 2.5).unwrap();
        assert_eq!(pnt, Some(geo::Point::new(10.1, 50.2)));

        let hits = reader.pixel_locator().unwrap().pixel_location(10.0, 50.1);
        assert_eq!(hits, vec![geo::Coord { x: 0.5, y: 1.5 }]);

        let time = reader.time_locator().unwrap().time_for(0, 1).unwrap();
        assert_eq!(time, Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 10).unwrap());
    }

    #[test]
    fn test_sub_scene_locator_uses_absolute_rows() {
        let reader = reader();
        let outline = reader.read_acquisition_info().unwrap().bounding_geometry();
        let polygon = outline.polygons()[0].clone();

        let locator = reader.sub_scene_pixel_locator(&polygon).unwrap();
        assert_eq!(
            locator.pixel_location(10.0, 50.2),
            vec![geo::Coord { x: 0.5, y: 2.5 }]
        );
    }

    /// Six scanlines going north across the anti-meridian, ten seconds apart.
    fn dateline_dump() -> SwathDump {
        let (rows, cols) = (6, 4);
        let col_lons = [178.5, 179.5, -179.5, -178.5];
        let mut lons = vec![];
        let mut lats = vec![];
        for row in 0..rows {
            for lon in col_lons {
                lons.push(lon);
                lats.push(row as f64);
            }
        }

        let start = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        let line_times: Vec<_> = (0..rows as i64)
            .map(|r| start + Duration::seconds(10 * r))
            .collect();
        SwathDump {
            sensor: "mhs".to_owned(),
            version: "v1".to_owned(),
            start,
            stop: line_times[rows - 1],
            node_type: NodeType::Ascending,
            grid: LatLonGrid::new(rows, cols, lons, lats).unwrap(),
            line_times,
        }
    }

    #[test]
    fn test_acquisition_info_across_dateline() {
        let mut reader = SwathDumpReader::new(Interval::default(), 8, 80.0);
        reader.open_dump(dateline_dump());

        let info = reader.read_acquisition_info().unwrap();
        let bounds = info.bounding_geometry();

        // One part with a piece on each side of the anti-meridian.
        assert_eq!(bounds.num_geometries(), 1);
        assert_eq!(bounds.polygons().len(), 2);
        assert!(bounds.is_valid());
        assert!(bounds.contains_point(179.0, 2.5));
        assert!(bounds.contains_point(-179.0, 2.5));
        assert!(!bounds.contains_point(0.0, 2.5));
        assert!(bounds
            .coords()
            .iter()
            .all(|c| (-180.0..=180.0).contains(&c.x)));

        let axes = info.time_axes();
        assert_eq!(axes.len(), 1);
        assert_eq!(
            axes[0].time_at(-179.5, 2.5),
            Some(Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 25).unwrap())
        );

        let hits = reader.pixel_locator().unwrap().pixel_location(-179.4, 2.1);
        assert_eq!(hits, vec![geo::Coord { x: 2.5, y: 2.5 }]);
    }

    #[test]
    fn test_unopened_reader() {
        let reader = SwathDumpReader::new(Interval::new(1, 1).unwrap(), 4, 20.0);
        assert!(reader.read_acquisition_info().is_err());
        assert!(reader.pixel_locator().is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let mut reader = SwathDumpReader::new(Interval::new(1, 1).unwrap(), 4, 20.0);
        let result = reader.open(Path::new("/no/such/file.swath"));
        assert!(matches!(result, Err(MatchupError::Io(_))));
    }
}
