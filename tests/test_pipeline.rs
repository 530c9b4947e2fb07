//! End-to-end pipeline tests over a fabricated .SAFE product tree:
//! ingest, query, selection, mosaic assembly and orbit correction.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use sarchive::catalog::schema::{bursts, files, files_bursts};
use sarchive::catalog::store;
use sarchive::core::query::{self, PresetPicker};
use sarchive::core::toolchain::RecordingAdapter;
use sarchive::core::{ingest, mosaic};
use sarchive::io::lists;
use sarchive::io::query_file::SearchQuery;
use sarchive::types::{BoundingBox, PipelineParams, Polarization};
use std::fs;
use std::path::Path;

fn memory_catalog() -> SqliteConnection {
    let mut conn = store::establish_connection(":memory:").unwrap();
    store::init_schema(&mut conn).unwrap();
    conn
}

/// Annotation XML with one boundary geolocation line per burst edge.
/// Burst centers land near (`lat0`, `lon0`).
fn annotation_xml(pol: &str, swath: i32, start_time: &str, anx_times: &[f64], lat0: f64, lon0: f64) -> String {
    let mut grid = String::new();
    for i in 0..=anx_times.len() {
        let line = i as i64 * 1500;
        let lat = lat0 - 0.2 * i as f64;
        for (pixel, lon) in [(0, lon0), (199, lon0 + 1.0)] {
            grid.push_str(&format!(
                "<geolocationGridPoint><line>{line}</line><pixel>{pixel}</pixel>\
                 <latitude>{lat}</latitude><longitude>{lon}</longitude></geolocationGridPoint>"
            ));
        }
    }
    let bursts: String = anx_times
        .iter()
        .map(|t| format!("<burst><azimuthAnxTime>{t}</azimuthAnxTime></burst>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<product>
  <adsHeader>
    <polarisation>{pol}</polarisation>
    <swath>IW{swath}</swath>
    <startTime>{start_time}</startTime>
  </adsHeader>
  <generalAnnotation>
    <productInformation><pass>Descending</pass></productInformation>
  </generalAnnotation>
  <swathTiming>
    <linesPerBurst>1500</linesPerBurst>
    <samplesPerBurst>200</samplesPerBurst>
    <burstList count="{n}">{bursts}</burstList>
  </swathTiming>
  <geolocationGrid>
    <geolocationGridPointList>{grid}</geolocationGridPointList>
  </geolocationGrid>
</product>"#,
        n = anx_times.len(),
    )
}

struct Measurement {
    pol: &'static str,
    swath: i32,
    anx_times: Vec<f64>,
}

/// Lay a minimal .SAFE product on disk: manifest, measurement tiffs
/// and their annotation files. `area_lon` shifts the scene so tracks
/// can cover distinct areas.
fn make_safe_at(
    data_dir: &Path,
    name: &str,
    track: i32,
    datetime: &str,
    area_lon: f64,
    measurements: &[Measurement],
) {
    let safe_dir = data_dir.join(format!("{name}.SAFE"));
    fs::create_dir_all(safe_dir.join("measurement")).unwrap();
    fs::create_dir_all(safe_dir.join("annotation")).unwrap();
    fs::write(
        safe_dir.join("manifest.safe"),
        format!(
            "<safe:orbitReference><safe:relativeOrbitNumber type=\"stop\">{track}</safe:relativeOrbitNumber></safe:orbitReference>"
        ),
    )
    .unwrap();

    // datetime is "YYYYMMDDtHHMMSS", the annotation wants ISO form.
    let start_time = format!(
        "{}-{}-{}T{}:{}:{}.000000",
        &datetime[0..4],
        &datetime[4..6],
        &datetime[6..8],
        &datetime[9..11],
        &datetime[11..13],
        &datetime[13..15]
    );
    for m in measurements {
        let stem = format!(
            "{}-iw{}-slc-{}-{}-004",
            name.to_lowercase(),
            m.swath,
            m.pol.to_lowercase(),
            datetime
        );
        fs::write(safe_dir.join("measurement").join(format!("{stem}.tiff")), b"").unwrap();
        fs::write(
            safe_dir.join("annotation").join(format!("{stem}.xml")),
            annotation_xml(
                m.pol,
                m.swath,
                &start_time,
                &m.anx_times,
                64.0,
                area_lon + 0.4 * m.swath as f64,
            ),
        )
        .unwrap();
    }
}

fn make_safe(data_dir: &Path, name: &str, track: i32, datetime: &str, measurements: &[Measurement]) {
    make_safe_at(data_dir, name, track, datetime, -20.0, measurements);
}

fn iceland_scene() -> Vec<Measurement> {
    vec![
        Measurement {
            pol: "VV",
            swath: 1,
            anx_times: vec![2210.633, 2213.391],
        },
        Measurement {
            pol: "VV",
            swath: 2,
            anx_times: vec![2211.504],
        },
    ]
}

fn row_counts(conn: &mut SqliteConnection) -> (i64, i64, i64) {
    let f: i64 = files::table.count().get_result(conn).unwrap();
    let b: i64 = bursts::table.count().get_result(conn).unwrap();
    let m: i64 = files_bursts::table.count().get_result(conn).unwrap();
    (f, b, m)
}

#[test]
fn test_ingest_is_idempotent() {
    let data = tempfile::tempdir().unwrap();
    make_safe(data.path(), "S1A_A", 111, "20150507t043342", &iceland_scene());

    let conn = &mut memory_catalog();
    let params = PipelineParams::default();
    assert_eq!(ingest::ingest_directory(conn, data.path(), &params).unwrap(), 1);
    let first = row_counts(conn);
    assert_eq!(first, (2, 3, 3));

    assert_eq!(ingest::ingest_directory(conn, data.path(), &params).unwrap(), 1);
    assert_eq!(row_counts(conn), first);
}

#[test]
fn test_bad_product_is_skipped_without_partial_rows() {
    let data = tempfile::tempdir().unwrap();
    make_safe(data.path(), "S1A_A", 111, "20150507t043342", &iceland_scene());
    // A product whose second annotation is corrupt: its first, valid
    // measurement file must roll back with the rest of the product.
    make_safe(data.path(), "S1A_B", 111, "20150519t043342", &iceland_scene());
    let bad_dir = data.path().join("S1A_B.SAFE/annotation");
    let mut bad_xmls: Vec<_> = fs::read_dir(&bad_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    bad_xmls.sort();
    fs::write(&bad_xmls[1], "<product><broken").unwrap();
    // A third product without a manifest at all.
    make_safe(data.path(), "S1A_C", 111, "20150531t043342", &iceland_scene());
    fs::remove_file(data.path().join("S1A_C.SAFE/manifest.safe")).unwrap();

    let conn = &mut memory_catalog();
    let params = PipelineParams::default();
    assert_eq!(ingest::ingest_directory(conn, data.path(), &params).unwrap(), 1);

    // Only the well-formed product is visible.
    assert_eq!(row_counts(conn), (2, 3, 3));
    let ids: Vec<String> = files::table
        .select(files::id)
        .order(files::id.asc())
        .load(conn)
        .unwrap();
    assert!(ids.iter().all(|id| id.starts_with("s1a_a")));
}

#[test]
fn test_repeat_pass_reuses_burst_identities() {
    let data = tempfile::tempdir().unwrap();
    make_safe(data.path(), "S1A_A", 111, "20150507t043342", &iceland_scene());
    // Same track twelve days on; ANX times drift a few ticks.
    make_safe(
        data.path(),
        "S1A_B",
        111,
        "20150519t043342",
        &[
            Measurement {
                pol: "VV",
                swath: 1,
                anx_times: vec![2210.891, 2213.640],
            },
            Measurement {
                pol: "VV",
                swath: 2,
                anx_times: vec![2211.766],
            },
        ],
    );

    let conn = &mut memory_catalog();
    let params = PipelineParams::default();
    assert_eq!(ingest::ingest_directory(conn, data.path(), &params).unwrap(), 2);

    let (f, b, m) = row_counts(conn);
    assert_eq!(f, 4);
    // The drifted bursts fold onto the originals.
    assert_eq!(b, 3);
    assert_eq!(m, 6);
}

#[test]
fn test_query_selection_writes_lists() {
    let data = tempfile::tempdir().unwrap();
    make_safe(data.path(), "S1A_A", 111, "20150507t043342", &iceland_scene());
    make_safe(data.path(), "S1A_B", 111, "20150519t043342", &iceland_scene());
    // A crossing track over an area further west.
    make_safe_at(
        data.path(),
        "S1A_C",
        45,
        "20150509t181200",
        -21.5,
        &[Measurement {
            pol: "VV",
            swath: 1,
            anx_times: vec![900.017],
        }],
    );

    let conn = &mut memory_catalog();
    let params = PipelineParams::default();
    ingest::ingest_directory(conn, data.path(), &params).unwrap();

    let mut search = SearchQuery::default();
    search.polygon = Some(BoundingBox::from_corners(-21.0, 63.0, -18.0, 65.0));
    let candidates = query::run_query(conn, &search).unwrap();
    assert_eq!(candidates.len(), 2);

    search.polygon = Some(BoundingBox::from_corners(-20.0, 63.0, -18.0, 65.0));
    let out = tempfile::tempdir().unwrap();
    let mut picker = PresetPicker { track: 111 };
    let selection = query::query_and_select(conn, &search, &mut picker, out.path()).unwrap();

    assert_eq!(selection.track, 111);
    assert_eq!(selection.polarisation, Polarization::VV);
    assert_eq!(selection.burst_ids.len(), 3);
    assert_eq!(selection.dates.len(), 2);

    let ids = lists::read_burstid_list(&out.path().join(lists::BURSTID_LIST)).unwrap();
    assert_eq!(ids, selection.burst_ids);
    let dates = lists::read_date_list(&out.path().join(lists::DATE_LIST)).unwrap();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2015, 5, 7).unwrap(),
            NaiveDate::from_ymd_opt(2015, 5, 19).unwrap(),
        ]
    );
}

#[test]
fn test_assemble_skips_partially_covered_dates() {
    let data = tempfile::tempdir().unwrap();
    make_safe(data.path(), "S1A_A", 111, "20150507t043342", &iceland_scene());
    // The second date misses the IW2 burst entirely.
    make_safe(
        data.path(),
        "S1A_B",
        111,
        "20150519t043342",
        &[Measurement {
            pol: "VV",
            swath: 1,
            anx_times: vec![2210.891, 2213.640],
        }],
    );

    let conn = &mut memory_catalog();
    let params = PipelineParams::default();
    ingest::ingest_directory(conn, data.path(), &params).unwrap();

    let search = SearchQuery::default();
    let out = tempfile::tempdir().unwrap();
    let mut picker = PresetPicker { track: 111 };
    let selection = query::query_and_select(conn, &search, &mut picker, out.path()).unwrap();

    let work = tempfile::tempdir().unwrap();
    let mut adapter = RecordingAdapter::new();
    let assembled = mosaic::assemble_all(
        conn,
        &selection.dates,
        &selection.burst_ids,
        selection.polarisation,
        work.path(),
        &params,
        &mut adapter,
    )
    .unwrap();

    assert_eq!(assembled, vec![NaiveDate::from_ymd_opt(2015, 5, 7).unwrap()]);
    assert!(work.path().join("20150507").is_dir());
    assert!(!work.path().join("20150519").exists());
    // One import and extraction per measurement file, then the two
    // mosaic steps; nothing for the skipped date.
    assert_eq!(
        adapter.kinds(),
        vec![
            "import_slc",
            "copy_bursts",
            "import_slc",
            "copy_bursts",
            "multilook_mosaic",
            "mosaic_slc",
        ]
    );
}

#[test]
fn test_assembly_applies_matching_orbit_file() {
    let data = tempfile::tempdir().unwrap();
    make_safe(data.path(), "S1A_A", 111, "20150507t043342", &iceland_scene());

    let orbit_dir = tempfile::tempdir().unwrap();
    for name in [
        // Covers the acquisition.
        "S1A_OPER_AUX_POEORB_OPOD_20150527T122312_V20150506T225944_20150508T005944.EOF",
        // A restituted file covering it too; precise must win.
        "S1A_OPER_AUX_RESORB_OPOD_20150507T104512_V20150507T022911_20150507T054641.EOF",
        // Out of range.
        "S1A_OPER_AUX_POEORB_OPOD_20150601T122312_V20150510T225944_20150512T005944.EOF",
    ] {
        fs::write(orbit_dir.path().join(name), b"").unwrap();
    }

    let conn = &mut memory_catalog();
    let params = PipelineParams::default();
    ingest::ingest_directory(conn, data.path(), &params).unwrap();
    assert_eq!(ingest::ingest_orbit_directory(conn, orbit_dir.path()).unwrap(), 3);

    let search = SearchQuery::default();
    let out = tempfile::tempdir().unwrap();
    let mut picker = PresetPicker { track: 111 };
    let selection = query::query_and_select(conn, &search, &mut picker, out.path()).unwrap();

    let work = tempfile::tempdir().unwrap();
    let mut adapter = RecordingAdapter::new();
    mosaic::assemble_all(
        conn,
        &selection.dates,
        &selection.burst_ids,
        selection.polarisation,
        work.path(),
        &params,
        &mut adapter,
    )
    .unwrap();

    let orbit_ops: Vec<_> = adapter
        .ops
        .iter()
        .filter_map(|op| match op {
            sarchive::core::toolchain::ToolchainOp::ApplyOrbitFile { orbit_file, .. } => {
                Some(orbit_file.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(orbit_ops.len(), 2);
    for path in orbit_ops {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.contains("POEORB"));
        assert!(name.contains("V20150506T225944"));
    }
}
