//! Spatial/temporal query engine: evaluates a declarative query
//! against the catalog, partitions the matching bursts by track and
//! turns the operator's track choice into the burst-id and date lists
//! handed to the mosaic assembly step.

use crate::catalog::models::FileRecord;
use crate::catalog::store::{self, PolFilter};
use crate::io::lists;
use crate::io::query_file::SearchQuery;
use crate::types::{PipelineError, PipelineResult, Polarization};
use chrono::NaiveDate;
use diesel::sqlite::SqliteConnection;
use geo::{ConvexHull, MultiPoint, Point};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// One track matched by a query, with its footprint for operator
/// disambiguation. The hull is display-only; filtering was already
/// done by the box test on burst centers.
#[derive(Debug, Clone)]
pub struct TrackCandidate {
    pub track: i32,
    /// Matched burst ids, catalog order.
    pub burst_ids: Vec<String>,
    /// All burst corner coordinates as (lat, lon).
    pub footprint: Vec<(f64, f64)>,
    /// Convex hull of the footprint as (lat, lon) vertices.
    pub hull: Vec<(f64, f64)>,
    /// Number of co-polarised images available for this track within
    /// the query's date range.
    pub image_count: usize,
}

/// The two output lists of a completed selection.
#[derive(Debug, Clone)]
pub struct TrackSelection {
    pub track: i32,
    pub polarisation: Polarization,
    /// Sorted burst ids of the chosen track.
    pub burst_ids: Vec<String>,
    /// One acquisition date per matching file, catalog order;
    /// duplicates are possible.
    pub dates: Vec<NaiveDate>,
}

/// The PRODUCT predicate names the platform, e.g. `S1A`; measurement
/// file names carry it lowercased as their leading token.
fn retain_product(files: &mut Vec<FileRecord>, query: &SearchQuery) {
    if let Some(product) = &query.product {
        let prefix = product.to_lowercase();
        files.retain(|f| f.id.starts_with(&prefix));
    }
}

/// Evaluate the query predicates and partition the matching bursts by
/// track in a single grouping pass.
pub fn run_query(
    conn: &mut SqliteConnection,
    query: &SearchQuery,
) -> PipelineResult<Vec<TrackCandidate>> {
    let matched = store::bursts_matching(conn, query)?;
    log::info!("Query matched {} bursts", matched.len());

    let mut by_track: BTreeMap<i32, Vec<_>> = BTreeMap::new();
    for burst in matched {
        by_track.entry(burst.track).or_default().push(burst);
    }

    let mut candidates = Vec::new();
    for (track, bursts) in by_track {
        let burst_ids: Vec<String> = bursts.iter().map(|b| b.id.clone()).collect();
        let footprint: Vec<(f64, f64)> = bursts.iter().flat_map(|b| b.corners()).collect();
        let hull = convex_hull(&footprint);
        let mut images =
            store::files_with_burst(conn, &burst_ids[0], PolFilter::HhOrVv, query.date_range)?;
        retain_product(&mut images, query);
        let image_count = images.len();
        candidates.push(TrackCandidate {
            track,
            burst_ids,
            footprint,
            hull,
            image_count,
        });
    }
    Ok(candidates)
}

/// Convex hull of a (lat, lon) point set, as open-ring vertices.
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let multipoint: MultiPoint<f64> = points
        .iter()
        .map(|&(lat, lon)| Point::new(lon, lat))
        .collect();
    let polygon = multipoint.convex_hull();
    let mut hull: Vec<(f64, f64)> = polygon
        .exterior()
        .coords()
        .map(|c| (c.y, c.x))
        .collect();
    // The exterior ring repeats the first vertex.
    hull.pop();
    hull
}

/// How a track gets chosen from the candidate list.
pub trait TrackPicker {
    fn pick(&mut self, candidates: &[TrackCandidate]) -> PipelineResult<i32>;
}

/// Supplies a predetermined choice; used by tests and scripted runs.
#[derive(Debug, Clone)]
pub struct PresetPicker {
    pub track: i32,
}

impl TrackPicker for PresetPicker {
    fn pick(&mut self, _candidates: &[TrackCandidate]) -> PipelineResult<i32> {
        Ok(self.track)
    }
}

/// Interactive console prompt listing the candidate tracks.
#[derive(Debug, Default)]
pub struct ConsolePicker;

impl TrackPicker for ConsolePicker {
    fn pick(&mut self, candidates: &[TrackCandidate]) -> PipelineResult<i32> {
        println!("Available tracks:");
        for c in candidates {
            println!(
                "  track {:>4}: {} bursts, {} images",
                c.track,
                c.burst_ids.len(),
                c.image_count
            );
        }
        print!("\nPlease enter the track number of your choice: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        line.trim()
            .parse::<i32>()
            .map_err(|_| PipelineError::Config(format!("'{}' is not a track number", line.trim())))
    }
}

/// Resolve the chosen track into its ordered burst-id list and the
/// acquisition-date list. An invalid choice aborts without writing
/// anything; the caller may re-invoke selection.
pub fn select_track(
    conn: &mut SqliteConnection,
    candidates: &[TrackCandidate],
    choice: i32,
    query: &SearchQuery,
) -> PipelineResult<TrackSelection> {
    let candidate = candidates
        .iter()
        .find(|c| c.track == choice)
        .ok_or(PipelineError::InvalidTrack(choice))?;

    let burst_ids: Vec<String> = candidate.burst_ids.iter().cloned().sorted().collect();
    let first_id = &burst_ids[0];

    // Polarisation majority over the first burst id; a tie favors HH.
    let mut copol = store::files_with_burst(conn, first_id, PolFilter::HhOrVv, query.date_range)?;
    retain_product(&mut copol, query);
    let hh_count = copol.iter().filter(|f| f.pol == "HH").count();
    let vv_count = copol.iter().filter(|f| f.pol == "VV").count();
    let polarisation = if hh_count >= vv_count {
        Polarization::HH
    } else {
        Polarization::VV
    };
    log::info!(
        "{} images have polarisation HH, {} have VV, using {}",
        hh_count,
        vv_count,
        polarisation
    );

    let mut matching = store::files_with_burst(
        conn,
        first_id,
        PolFilter::Exact(polarisation),
        query.date_range,
    )?;
    retain_product(&mut matching, query);
    let dates = matching.into_iter().map(|f| f.date).collect();

    Ok(TrackSelection {
        track: candidate.track,
        polarisation,
        burst_ids,
        dates,
    })
}

/// Run the query, let the picker choose a track, and write the
/// `burstid.list` / `date.list` hand-off files.
pub fn query_and_select(
    conn: &mut SqliteConnection,
    query: &SearchQuery,
    picker: &mut dyn TrackPicker,
    output_dir: &Path,
) -> PipelineResult<TrackSelection> {
    let candidates = run_query(conn, query)?;
    if candidates.is_empty() {
        return Err(PipelineError::Config(
            "Query matched no bursts in the catalog".to_string(),
        ));
    }
    let choice = picker.pick(&candidates)?;
    let selection = select_track(conn, &candidates, choice, query)?;

    lists::write_burstid_list(&output_dir.join(lists::BURSTID_LIST), &selection.burst_ids)?;
    lists::write_date_list(&output_dir.join(lists::DATE_LIST), &selection.dates)?;
    log::info!(
        "Track {} selected: {} bursts, {} dates",
        selection.track,
        selection.burst_ids.len(),
        selection.dates.len()
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::FileRecord;
    use crate::io::annotation::BurstGeolocation;

    fn memory_catalog() -> SqliteConnection {
        let mut conn = store::establish_connection(":memory:").unwrap();
        store::init_schema(&mut conn).unwrap();
        conn
    }

    fn add_burst(conn: &mut SqliteConnection, track: i32, swath: i32, sig: i32, lat: f64, lon: f64) -> String {
        let geo = BurstGeolocation {
            center: (lat, lon),
            corners: [
                (lat + 0.1, lon - 0.5),
                (lat - 0.1, lon - 0.4),
                (lat + 0.1, lon + 0.4),
                (lat - 0.1, lon + 0.5),
            ],
        };
        store::resolve_or_create(conn, track, swath, "DESCENDING", sig, Some(&geo), 10)
            .unwrap()
            .membership_id()
            .to_string()
    }

    fn add_file(
        conn: &mut SqliteConnection,
        id: &str,
        track: i32,
        swath: i32,
        pol: &str,
        date: NaiveDate,
        burst_ids: &[&str],
    ) {
        let file = FileRecord {
            id: id.to_string(),
            directory: format!("/data/{}.SAFE", id),
            track,
            orbit_direction: "DESCENDING".to_string(),
            swath,
            pol: pol.to_string(),
            date,
        };
        store::insert_file(conn, &file).unwrap();
        for (i, b) in burst_ids.iter().enumerate() {
            store::insert_membership(conn, id, b, (i + 1) as i32).unwrap();
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_query_partitions_by_track() {
        let conn = &mut memory_catalog();
        add_burst(conn, 111, 1, 1000, 64.0, -19.5);
        add_burst(conn, 111, 2, 1030, 64.0, -19.3);
        add_burst(conn, 45, 1, 2000, 64.1, -19.4);

        let b111 = "T111-IW1-1000";
        let b45 = "T45-IW1-2000";
        add_file(conn, "a.tiff", 111, 1, "VV", d(2015, 5, 7), &[b111]);
        add_file(conn, "b.tiff", 45, 1, "VV", d(2015, 5, 9), &[b45]);

        let query = SearchQuery::default();
        let candidates = run_query(conn, &query).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].track, 45);
        assert_eq!(candidates[1].track, 111);
        assert_eq!(candidates[1].burst_ids.len(), 2);
        // 2 bursts x 4 corners.
        assert_eq!(candidates[1].footprint.len(), 8);
        assert!(candidates[1].hull.len() >= 3);
        assert_eq!(candidates[1].image_count, 1);
    }

    #[test]
    fn test_polarisation_majority_and_tie() {
        let conn = &mut memory_catalog();
        add_burst(conn, 111, 1, 1000, 64.0, -19.5);
        let b = "T111-IW1-1000";
        // HH = 3, VV = 5 -> VV wins.
        for i in 0..3 {
            add_file(conn, &format!("hh{}.tiff", i), 111, 1, "HH", d(2015, 1, 1 + i), &[b]);
        }
        for i in 0..5 {
            add_file(conn, &format!("vv{}.tiff", i), 111, 1, "VV", d(2015, 2, 1 + i), &[b]);
        }

        let query = SearchQuery::default();
        let candidates = run_query(conn, &query).unwrap();
        let selection = select_track(conn, &candidates, 111, &query).unwrap();
        assert_eq!(selection.polarisation, Polarization::VV);
        assert_eq!(selection.dates.len(), 5);

        // Add two more HH files: HH = 5, VV = 5, the tie favors HH.
        for i in 0..2 {
            add_file(conn, &format!("hh{}.tiff", 3 + i), 111, 1, "HH", d(2015, 1, 10 + i), &[b]);
        }
        let selection = select_track(conn, &candidates, 111, &query).unwrap();
        assert_eq!(selection.polarisation, Polarization::HH);
        assert_eq!(selection.dates.len(), 5);
    }

    #[test]
    fn test_invalid_track_choice() {
        let conn = &mut memory_catalog();
        add_burst(conn, 111, 1, 1000, 64.0, -19.5);
        add_file(conn, "a.tiff", 111, 1, "VV", d(2015, 5, 7), &["T111-IW1-1000"]);

        let query = SearchQuery::default();
        let candidates = run_query(conn, &query).unwrap();
        let err = select_track(conn, &candidates, 999, &query).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTrack(999)));
    }

    #[test]
    fn test_burst_ids_sorted_in_selection() {
        let conn = &mut memory_catalog();
        add_burst(conn, 111, 2, 500, 64.0, -19.5);
        add_burst(conn, 111, 1, 900, 64.1, -19.5);
        add_file(
            conn,
            "a.tiff",
            111,
            1,
            "VV",
            d(2015, 5, 7),
            &["T111-IW1-900", "T111-IW2-500"],
        );

        let query = SearchQuery::default();
        let candidates = run_query(conn, &query).unwrap();
        let selection = select_track(conn, &candidates, 111, &query).unwrap();
        let mut expected = selection.burst_ids.clone();
        expected.sort();
        assert_eq!(selection.burst_ids, expected);
    }
}
