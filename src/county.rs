//! County boundaries and the point-in-county lookup.
//!
//! Boundaries come from the Census cartographic boundary shapefile. Points
//! are longitude/latitude in WGS84, so boundaries are converted to WGS84 when
//! they are loaded.

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{BoundingRect, Coord, Geometry, Intersects, MapCoords, MultiPolygon, Rect};
use shapefile::{dbase::FieldValue, Shape};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct CountyPolygon {
    pub name: String,
    /// five digit state + county FIPS code
    pub geoid: String,
    pub boundary: MultiPolygon<f64>,
    bbox: Option<Rect<f64>>,
}

impl CountyPolygon {
    pub fn new(name: &str, geoid: &str, boundary: MultiPolygon<f64>) -> Self {
        let bbox = boundary.bounding_rect();
        CountyPolygon {
            name: name.to_string(),
            geoid: geoid.to_string(),
            boundary,
            bbox,
        }
    }

    /// True when the point lies inside the county or on its boundary.
    pub fn intersects(&self, lon: f64, lat: f64) -> bool {
        let Some(bbox) = self.bbox else {
            return false;
        };
        let (min, max) = (bbox.min(), bbox.max());
        if lon < min.x || lon > max.x || lat < min.y || lat > max.y {
            return false;
        }

        self.boundary.intersects(&Coord { x: lon, y: lat })
    }
}

/// Coordinate reference systems the boundary files are published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    Wgs84,
    /// NAD83 geographic. Within a metre or two of WGS84, which is far below
    /// the resolution of the 1:20m boundaries.
    Nad83,
    /// EPSG:3857 spherical Mercator, metres.
    WebMercator,
}

impl Crs {
    /// Identifies the CRS from the WKT in a shapefile's `.prj` sidecar.
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let normalised = wkt.to_ascii_lowercase().replace([' ', '_'], "");

        if normalised.starts_with("projcs") || normalised.starts_with("projcrs") {
            if normalised.contains("mercator")
                && (normalised.contains("auxiliarysphere")
                    || normalised.contains("pseudo")
                    || normalised.contains("3857"))
            {
                return Ok(Crs::WebMercator);
            }
            bail!("Unsupported projected coordinate system: {}", wkt.trim());
        }

        if normalised.contains("wgs1984") || normalised.contains("wgs84") {
            Ok(Crs::Wgs84)
        } else if normalised.contains("northamerican1983") || normalised.contains("nad83") {
            Ok(Crs::Nad83)
        } else {
            bail!("Unsupported coordinate system: {}", wkt.trim())
        }
    }

    pub fn to_wgs84(self, geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Crs::Wgs84 | Crs::Nad83 => geometry,
            Crs::WebMercator => geometry.map_coords(mercator_to_lon_lat),
        }
    }
}

const EARTH_RADIUS_M: f64 = 6_378_137.0;

fn mercator_to_lon_lat(c: Coord<f64>) -> Coord<f64> {
    let lon = (c.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (c.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();

    Coord { x: lon, y: lat }
}

/// Counties in lookup order: by name, then GEOID. A point that touches more
/// than one county (a shared boundary) resolves to the first in this order.
#[derive(Debug, Clone, Default)]
pub struct CountyIndex {
    counties: Vec<CountyPolygon>,
}

impl CountyIndex {
    pub fn new(mut counties: Vec<CountyPolygon>) -> Self {
        counties.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.geoid.cmp(&b.geoid)));
        CountyIndex { counties }
    }

    /// Loads every polygon in the shapefile, converted to WGS84.
    pub fn load(shp_path: &Path) -> Result<Self> {
        let crs = match fs::read_to_string(shp_path.with_extension("prj")) {
            Ok(wkt) => Crs::from_wkt(&wkt)?,
            Err(_) => {
                warn!(path = %shp_path.display(), "no .prj sidecar, assuming WGS84");
                Crs::Wgs84
            }
        };

        let mut reader = shapefile::Reader::from_path(shp_path)
            .map_err(|e| anyhow!("Failed to open shapefile '{}': {}", shp_path.display(), e))?;

        let mut counties = Vec::new();
        for shape_record in reader.iter_shapes_and_records() {
            let (shape, record) =
                shape_record.map_err(|e| anyhow!("Failed to read county shape: {}", e))?;
            if let Some(county) = county_from_shape(shape, &record, crs)? {
                counties.push(county);
            }
        }

        if counties.is_empty() {
            bail!("No county polygons found in '{}'", shp_path.display());
        }

        Ok(CountyIndex::new(counties))
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    /// The county containing the point, if any.
    pub fn resolve(&self, lon: f64, lat: f64) -> Option<&CountyPolygon> {
        if !(lon.is_finite() && lat.is_finite()) {
            return None;
        }
        self.counties.iter().find(|c| c.intersects(lon, lat))
    }
}

/// Builds a county from one shapefile record. Null and non-polygon shapes
/// give `None`.
fn county_from_shape(
    shape: Shape,
    record: &shapefile::dbase::Record,
    crs: Crs,
) -> Result<Option<CountyPolygon>> {
    if matches!(shape, Shape::NullShape) {
        return Ok(None);
    }

    let name = text_field(record, "NAME");
    let geoid = text_field(record, "GEOID");
    let geometry = Geometry::<f64>::try_from(shape)
        .map_err(|e| anyhow!("Unsupported shape for county '{}': {}", name, e))?;

    let boundary = match geometry {
        Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        Geometry::MultiPolygon(multi) => multi,
        _ => {
            warn!(county = %name, "skipping non-polygon county shape");
            return Ok(None);
        }
    };

    Ok(Some(CountyPolygon::new(&name, &geoid, crs.to_wgs84(boundary))))
}

fn text_field(record: &shapefile::dbase::Record, name: &str) -> String {
    match record.get(name) {
        Some(FieldValue::Character(Some(value))) => value.trim().to_string(),
        _ => String::new(),
    }
}

/// Finds the `.shp` file in an extracted archive directory.
pub fn find_shapefile(dir: &Path) -> Result<std::path::PathBuf> {
    let mut candidates: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"))
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No .shp file found in '{}'", dir.display()))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use geo::{polygon, Polygon};
    use shapefile::{
        dbase::{Record, TableWriterBuilder},
        Point, Polygon as ShpPolygon, PolygonRing,
    };
    use tempfile::TempDir;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    fn county(name: &str, geoid: &str, x0: f64, y0: f64) -> CountyPolygon {
        CountyPolygon::new(name, geoid, MultiPolygon::new(vec![square(x0, y0, 1.0)]))
    }

    fn index() -> CountyIndex {
        CountyIndex::new(vec![
            county("Sangamon", "17167", -90.0, 39.0),
            county("Logan", "17107", -90.0, 40.0),
            county("Menard", "17129", -91.0, 39.0),
        ])
    }

    #[test]
    fn should_resolve_point_inside_county() {
        let idx = index();

        assert_eq!(idx.resolve(-89.65, 39.78).unwrap().name, "Sangamon");
        assert_eq!(idx.resolve(-89.5, 40.5).unwrap().name, "Logan");
    }

    #[test]
    fn should_not_resolve_point_over_ocean() {
        assert!(index().resolve(-125.0, 36.0).is_none());
        assert!(index().resolve(f64::NAN, 39.5).is_none());
    }

    #[test]
    fn should_break_boundary_ties_by_name() {
        let idx = index();

        // shared edge between Sangamon and Logan at latitude 40
        assert_eq!(idx.resolve(-89.5, 40.0).unwrap().name, "Logan");
        // shared edge between Menard and Sangamon at longitude -90
        assert_eq!(idx.resolve(-90.0, 39.5).unwrap().name, "Menard");
    }

    #[test]
    fn should_break_same_name_ties_by_geoid() {
        let idx = CountyIndex::new(vec![
            county("Washington", "41067", 0.0, 0.0),
            county("Washington", "16087", 1.0, 0.0),
        ]);

        assert_eq!(idx.resolve(1.0, 0.5).unwrap().geoid, "16087");
    }

    #[test]
    fn should_detect_census_nad83() {
        let wkt = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

        assert_eq!(Crs::from_wkt(wkt).unwrap(), Crs::Nad83);
    }

    #[test]
    fn should_detect_wgs84_and_web_mercator() {
        let wgs84 = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]]"#;
        let mercator = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984"],PROJECTION["Mercator_Auxiliary_Sphere"]]"#;

        assert_eq!(Crs::from_wkt(wgs84).unwrap(), Crs::Wgs84);
        assert_eq!(Crs::from_wkt(mercator).unwrap(), Crs::WebMercator);
        assert!(Crs::from_wkt(r#"PROJCS["NAD_1983_UTM_Zone_10N"]"#).is_err());
    }

    #[test]
    fn should_reproject_web_mercator() {
        let c = mercator_to_lon_lat(Coord {
            x: -13_627_732.06,
            y: 4_546_985.28,
        });

        assert!((c.x - -122.42).abs() < 1e-3, "lon {}", c.x);
        assert!((c.y - 37.77).abs() < 1e-3, "lat {}", c.y);
    }

    #[test]
    fn should_find_shapefile_in_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("cb_2022_us_county_20m.dbf"), b"").unwrap();
        fs::write(dir.path().join("cb_2022_us_county_20m.shp"), b"").unwrap();

        let found = find_shapefile(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "cb_2022_us_county_20m.shp");

        let empty = TempDir::new().unwrap();
        assert!(find_shapefile(empty.path()).is_err());
    }

    fn shp_square(x0: f64, y0: f64, x1: f64, y1: f64) -> ShpPolygon {
        // outer rings run clockwise
        ShpPolygon::new(PolygonRing::Outer(vec![
            Point::new(x0, y0),
            Point::new(x0, y1),
            Point::new(x1, y1),
            Point::new(x1, y0),
            Point::new(x0, y0),
        ]))
    }

    fn county_record(name: &str, geoid: &str) -> Record {
        let mut record = Record::default();
        record.insert("NAME".to_string(), FieldValue::Character(Some(name.to_string())));
        record.insert("GEOID".to_string(), FieldValue::Character(Some(geoid.to_string())));
        record
    }

    fn write_counties(path: &Path, counties: &[(&str, &str, ShpPolygon)]) {
        let table = TableWriterBuilder::new()
            .add_character_field("NAME".try_into().unwrap(), 50)
            .add_character_field("GEOID".try_into().unwrap(), 5);
        let mut writer = shapefile::Writer::from_path(path, table).unwrap();
        for (name, geoid, polygon) in counties {
            writer
                .write_shape_and_record(polygon, &county_record(name, geoid))
                .unwrap();
        }
    }

    #[test]
    fn should_load_counties_from_shapefile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counties.shp");
        write_counties(
            &path,
            &[
                ("Sangamon", "17167", shp_square(-90.0, 39.0, -89.0, 40.0)),
                ("Logan", "17107", shp_square(-90.0, 40.0, -89.0, 41.0)),
            ],
        );

        // no .prj sidecar, read as WGS84
        let index = CountyIndex::load(&path).unwrap();

        assert_eq!(index.len(), 2);
        let county = index.resolve(-89.5, 39.5).unwrap();
        assert_eq!(county.name, "Sangamon");
        assert_eq!(county.geoid, "17167");
        assert_eq!(index.resolve(-89.5, 40.5).unwrap().name, "Logan");
        assert!(index.resolve(-120.0, 39.5).is_none());
    }

    #[test]
    fn should_reproject_web_mercator_shapefile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counties.shp");
        // lon -100..-99, lat 40..41 in EPSG:3857 metres
        write_counties(
            &path,
            &[(
                "Lincoln",
                "31111",
                shp_square(-11_131_949.08, 4_865_942.28, -11_020_629.59, 5_012_341.66),
            )],
        );
        fs::write(
            path.with_extension("prj"),
            r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984"],PROJECTION["Mercator_Auxiliary_Sphere"]]"#,
        )
        .unwrap();

        let index = CountyIndex::load(&path).unwrap();

        assert_eq!(index.resolve(-99.5, 40.5).unwrap().name, "Lincoln");
        assert!(index.resolve(-99.5, 41.5).is_none());
        assert!(index.resolve(-11_075_000.0, 4_940_000.0).is_none());
    }

    #[test]
    fn should_reject_unsupported_projection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counties.shp");
        write_counties(&path, &[("Sangamon", "17167", shp_square(-90.0, 39.0, -89.0, 40.0))]);
        fs::write(path.with_extension("prj"), r#"PROJCS["NAD_1983_UTM_Zone_16N"]"#).unwrap();

        assert!(CountyIndex::load(&path).is_err());
    }

    #[test]
    fn should_skip_null_and_point_shapes() {
        let record = county_record("Nowhere", "00000");

        assert!(county_from_shape(Shape::NullShape, &record, Crs::Wgs84)
            .unwrap()
            .is_none());
        assert!(
            county_from_shape(Shape::Point(Point::new(-89.5, 39.5)), &record, Crs::Wgs84)
                .unwrap()
                .is_none()
        );
    }
}
