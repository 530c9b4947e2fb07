//! Metadata extraction: unpacked .SAFE product directories into
//! catalog rows.

use crate::catalog::models::FileRecord;
use crate::catalog::store;
use crate::io::annotation::{burst_signature, Annotation, CornerIndex};
use crate::io::manifest;
use crate::types::{PipelineError, PipelineParams, PipelineResult};
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use std::path::Path;

/// Ingest every `.SAFE` product directory found directly under
/// `data_dir`, in sorted order. A product that fails to parse is
/// logged and skipped; the catalog is never left with a partially
/// ingested product. Returns the number of products ingested.
pub fn ingest_directory(
    conn: &mut SqliteConnection,
    data_dir: &Path,
    params: &PipelineParams,
) -> PipelineResult<usize> {
    if !data_dir.is_dir() {
        return Err(PipelineError::Config(format!(
            "Data directory {} does not exist or is not a directory",
            data_dir.display()
        )));
    }

    let mut entries: Vec<_> = std::fs::read_dir(data_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.extension().is_some_and(|e| e == "SAFE"))
        .collect();
    entries.sort();

    let mut ingested = 0;
    for safe_dir in entries {
        match ingest_product(conn, &safe_dir, params) {
            Ok(()) => ingested += 1,
            Err(e) => {
                log::error!("Skipping product {}: {}", safe_dir.display(), e);
            }
        }
    }
    Ok(ingested)
}

/// Ingest one .SAFE product: every measurement file plus its bursts
/// and membership rows. The track number comes from the manifest once
/// and is shared by all swaths and polarisations of the product.
pub fn ingest_product(
    conn: &mut SqliteConnection,
    safe_dir: &Path,
    params: &PipelineParams,
) -> PipelineResult<()> {
    let track = manifest::read_track(safe_dir)?;
    log::info!("Ingesting {} (track {})", safe_dir.display(), track);

    let measurement_dir = safe_dir.join("measurement");
    let mut tiffs: Vec<String> = std::fs::read_dir(&measurement_dir)
        .map_err(|e| {
            PipelineError::Metadata(format!(
                "Could not list {}: {}",
                measurement_dir.display(),
                e
            ))
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tiff"))
        .collect();
    tiffs.sort();

    // One transaction per product: a failing measurement file rolls
    // the whole product back, never leaving it partially visible.
    conn.transaction::<_, PipelineError, _>(|conn| {
        for tiff in tiffs {
            if store::file_exists(conn, &tiff)? {
                log::info!("File {} already in catalog, skipping", tiff);
                continue;
            }
            ingest_measurement(conn, safe_dir, track, &tiff, params)?;
        }
        Ok(())
    })
}

/// Ingest one measurement file: its file row plus per-burst identity
/// resolution and membership rows.
fn ingest_measurement(
    conn: &mut SqliteConnection,
    safe_dir: &Path,
    track: i32,
    tiff: &str,
    params: &PipelineParams,
) -> PipelineResult<()> {
    let stem = tiff.strip_suffix(".tiff").unwrap_or(tiff);
    let annotation_path = safe_dir.join("annotation").join(format!("{}.xml", stem));
    let xml = std::fs::read_to_string(&annotation_path).map_err(|e| {
        PipelineError::Metadata(format!(
            "Could not read annotation {}: {}",
            annotation_path.display(),
            e
        ))
    })?;
    let annotation = Annotation::parse(&xml)?;

    let pol = annotation.polarisation()?;
    let swath = annotation.swath_number()?;
    let orbit_direction = annotation.orbit_direction()?.to_string();
    let date = annotation.acquisition_date()?;

    let file = FileRecord {
        id: tiff.to_string(),
        directory: safe_dir.display().to_string(),
        track,
        orbit_direction: orbit_direction.clone(),
        swath,
        pol: pol.to_string(),
        date,
    };

    let corner_index = CornerIndex::build(&annotation);

    store::insert_file(conn, &file)?;

    for (i, burst) in annotation.swath_timing.burst_list.bursts.iter().enumerate() {
        let signature = burst_signature(burst.azimuth_anx_time);
        let geolocation = corner_index.burst_geolocation(i);
        if geolocation.is_none() {
            log::warn!(
                "Burst {} of {} has no geolocation grid entry",
                i + 1,
                annotation_path.display()
            );
        }
        let resolution = store::resolve_or_create(
            conn,
            track,
            swath,
            &orbit_direction,
            signature,
            geolocation.as_ref(),
            params.burst_tolerance_ticks,
        )?;
        store::insert_membership(conn, tiff, resolution.membership_id(), (i + 1) as i32)?;
    }

    log::debug!(
        "Inserted {} ({} {} IW{} {})",
        tiff,
        date,
        pol,
        swath,
        orbit_direction
    );
    Ok(())
}

/// Ingest every `.EOF` orbit file found directly under `orbit_dir`.
pub fn ingest_orbit_directory(
    conn: &mut SqliteConnection,
    orbit_dir: &Path,
) -> PipelineResult<usize> {
    if !orbit_dir.is_dir() {
        return Err(PipelineError::Config(format!(
            "Orbit directory {} does not exist or is not a directory",
            orbit_dir.display()
        )));
    }

    let mut names: Vec<String> = std::fs::read_dir(orbit_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".EOF"))
        .collect();
    names.sort();

    let directory = orbit_dir.display().to_string();
    let mut inserted = 0;
    for name in names {
        match crate::io::orbit::parse_orbit_filename(&name) {
            Ok(Some(info)) => {
                if store::insert_orbit_file(conn, &name, &directory, &info)? {
                    inserted += 1;
                }
            }
            Ok(None) => log::debug!("Ignoring non-ephemerides file {}", name),
            Err(e) => log::warn!("Skipping orbit file {}: {}", name, e),
        }
    }
    Ok(inserted)
}
