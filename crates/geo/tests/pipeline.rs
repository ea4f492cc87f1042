//! End-to-end runs against on-disk datasets

use std::path::Path;

use street_grid_geo::config::{GeocoderProvider, StreetGridConfig};
use street_grid_geo::{
    lon_lat, ErrorKind, FileSource, GeometrySource, GridCell, Outcome, Pipeline, Point,
    StaticGeocoder,
};

const MIDTOWN: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"STNAME": "5 AVENUE"},
     "geometry": {"type": "LineString", "coordinates": [[-73.9857, 40.7484], [-73.9850, 40.7490]]}},
    {"type": "Feature", "properties": {"STNAME": "W 34 STREET"},
     "geometry": {"type": "LineString", "coordinates": [[-73.9880, 40.7470], [-73.9840, 40.7495]]}},
    {"type": "Feature", "properties": {"STNAME": "BROOKLYN BRIDGE"},
     "geometry": {"type": "LineString", "coordinates": [[-73.9969, 40.7061], [-73.9904, 40.7045]]}}
  ]
}"#;

fn empire(_: &str) -> Option<Point> {
    Some(lon_lat(-73.9857, 40.7484))
}

fn write_dataset(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("midtown.geojson");
    std::fs::write(&path, MIDTOWN).unwrap();
    path
}

#[test]
fn selects_midtown_streets_and_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(FileSource::new(write_dataset(dir.path())), empire);

    let outcome = pipeline.run("350 5th Ave, New York, NY", 300.0).unwrap();
    let Outcome::Extracted(extraction) = outcome else {
        panic!("expected streets near the Empire State Building");
    };

    let names: Vec<&str> = extraction.features.iter().map(|f| f.display_name()).collect();
    assert_eq!(names, vec!["5 AVENUE", "W 34 STREET"]);
    assert_eq!(extraction.plan.strokes.len(), 2);
    assert_eq!(
        extraction.plan.strokes[0].segments[0].first(),
        Some(&GridCell::new(50, 50))
    );

    let out = dir.path().join("out");
    let report = pipeline.render(&extraction, &out).unwrap();
    assert!(report.artifacts.grid_text.starts_with(&out));
    let geojson = std::fs::read_to_string(&report.artifacts.geojson).unwrap();
    assert!(geojson.contains("search_radius"));
    assert!(geojson.contains("W 34 STREET"));
}

#[test]
fn tiny_radius_far_from_streets_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(FileSource::new(write_dataset(dir.path())), |_: &str| {
        Some(lon_lat(-73.95, 40.80))
    });

    let outcome = pipeline.run("Central Park North", 5.0).unwrap();
    assert!(matches!(outcome, Outcome::NoResults { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn missing_companion_file_fails_before_selection() {
    let dir = tempfile::tempdir().unwrap();
    for ext in ["shp", "shx", "dbf"] {
        std::fs::write(dir.path().join(format!("centerline.{}", ext)), b"").unwrap();
    }
    let shp = dir.path().join("centerline.shp");

    let err = FileSource::new(&shp).load().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
    assert!(err.to_string().contains("centerline.prj"));

    let err = Pipeline::new(FileSource::new(&shp), empire)
        .run("350 5th Ave", 100.0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn missing_dataset_file_is_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(FileSource::new(dir.path().join("absent.geojson")), empire);
    let err = pipeline.run("350 5th Ave", 100.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn pipeline_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let config_path = dir.path().join("street-grid.toml");
    std::fs::write(
        &config_path,
        r#"
[dataset]
path = "midtown.geojson"

[grid]
scale = 10000.0
out_of_bounds = "clip"

[geocoder]
provider = "static"

[geocoder.places]
"Empire State Building" = [-73.9857, 40.7484]
"#,
    )
    .unwrap();

    let config = StreetGridConfig::load(&config_path).unwrap();
    assert_eq!(config.geocoder.provider, GeocoderProvider::Static);

    let pipeline = Pipeline::from_config(&config).unwrap();
    let Outcome::Extracted(extraction) = pipeline.run("empire state building", 300.0).unwrap() else {
        panic!("expected an extraction");
    };
    assert_eq!(extraction.plan.grid.scale, 10000.0);

    let err = pipeline.run("Unknown Place", 300.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn static_geocoder_feeds_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let geocoder = StaticGeocoder::new().with_place("Herald Square", lon_lat(-73.9880, 40.7497));
    let pipeline = Pipeline::new(FileSource::new(write_dataset(dir.path())), geocoder);
    let outcome = pipeline.run("herald square", 400.0).unwrap();
    assert!(matches!(outcome, Outcome::Extracted(_)));
}
