//! Access functions for the acquisition catalog. All functions take an
//! open connection so that callers can group several mutations into
//! one transaction.

use crate::catalog::models::{BurstRecord, FileRecord, Membership};
use crate::catalog::schema::{bursts, files, files_bursts, porbits, rorbits};
use crate::io::annotation::BurstGeolocation;
use crate::io::orbit::{OrbitFileInfo, OrbitKind};
use crate::io::query_file::SearchQuery;
use crate::types::{DateRange, PipelineResult, Polarization};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Sentinel identity for a burst whose geolocation is missing and
/// which matched no catalogued burst. The file-burst linkage is still
/// recorded against it; no geometry row exists.
pub const UNRESOLVED_BURST_ID: &str = "UNRESOLVED";

/// Open (or create) a catalog database.
pub fn establish_connection(database_url: &str) -> PipelineResult<SqliteConnection> {
    Ok(SqliteConnection::establish(database_url)?)
}

/// Create the catalog tables if they do not exist yet.
pub fn init_schema(conn: &mut SqliteConnection) -> PipelineResult<()> {
    let ddl = [
        "CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            directory TEXT NOT NULL,
            track INTEGER NOT NULL,
            orbit_direction TEXT NOT NULL,
            swath INTEGER NOT NULL,
            pol TEXT NOT NULL,
            date DATE NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS bursts (
            id TEXT PRIMARY KEY,
            track INTEGER NOT NULL,
            orbit_direction TEXT NOT NULL,
            swath INTEGER NOT NULL,
            burstid INTEGER NOT NULL,
            center_lat DOUBLE NOT NULL,
            center_lon DOUBLE NOT NULL,
            corner1_lat DOUBLE NOT NULL,
            corner1_lon DOUBLE NOT NULL,
            corner2_lat DOUBLE NOT NULL,
            corner2_lon DOUBLE NOT NULL,
            corner3_lat DOUBLE NOT NULL,
            corner3_lon DOUBLE NOT NULL,
            corner4_lat DOUBLE NOT NULL,
            corner4_lon DOUBLE NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS files_bursts (
            file_id TEXT NOT NULL,
            burst_id TEXT NOT NULL,
            burst_no INTEGER NOT NULL,
            PRIMARY KEY (file_id, burst_id, burst_no)
        )",
        "CREATE TABLE IF NOT EXISTS porbits (
            id TEXT PRIMARY KEY,
            directory TEXT NOT NULL,
            begintime TIMESTAMP NOT NULL,
            endtime TIMESTAMP NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS rorbits (
            id TEXT PRIMARY KEY,
            directory TEXT NOT NULL,
            begintime TIMESTAMP NOT NULL,
            endtime TIMESTAMP NOT NULL
        )",
    ];
    for statement in ddl {
        diesel::sql_query(statement).execute(conn)?;
    }
    Ok(())
}

pub fn file_exists(conn: &mut SqliteConnection, file_id: &str) -> PipelineResult<bool> {
    let found: Option<String> = files::table
        .find(file_id)
        .select(files::id)
        .first(conn)
        .optional()?;
    Ok(found.is_some())
}

pub fn insert_file(conn: &mut SqliteConnection, file: &FileRecord) -> PipelineResult<()> {
    diesel::insert_into(files::table).values(file).execute(conn)?;
    Ok(())
}

/// Find a catalogued burst on the same track and swath whose timing
/// signature lies within +-tolerance ticks (inclusive) of the given
/// one. Consecutive bursts are ~27 ticks apart, so at most one
/// candidate falls inside a +-10 window; should two ever appear, the
/// lowest signature is returned so repeated lookups stay stable.
pub fn find_burst_in_window(
    conn: &mut SqliteConnection,
    track: i32,
    swath: i32,
    signature: i32,
    tolerance: i32,
) -> PipelineResult<Option<BurstRecord>> {
    let found = bursts::table
        .filter(bursts::track.eq(track))
        .filter(bursts::swath.eq(swath))
        .filter(bursts::burstid.ge(signature - tolerance))
        .filter(bursts::burstid.le(signature + tolerance))
        .order(bursts::burstid.asc())
        .select(BurstRecord::as_select())
        .first(conn)
        .optional()?;
    Ok(found)
}

pub fn insert_burst(conn: &mut SqliteConnection, burst: &BurstRecord) -> PipelineResult<()> {
    diesel::insert_into(bursts::table)
        .values(burst)
        .execute(conn)?;
    Ok(())
}

pub fn insert_membership(
    conn: &mut SqliteConnection,
    file_id: &str,
    burst_id: &str,
    burst_no: i32,
) -> PipelineResult<()> {
    let row = Membership {
        file_id: file_id.to_string(),
        burst_id: burst_id.to_string(),
        burst_no,
    };
    diesel::insert_into(files_bursts::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

/// Outcome of burst identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurstResolution {
    /// A catalogued burst within the tolerance window; its identity is
    /// reused and the newly derived geometry is discarded.
    Existing(String),
    /// A fresh burst row was created.
    Created(String),
    /// No match and no geolocation: only the membership linkage can be
    /// recorded, against [`UNRESOLVED_BURST_ID`].
    Unresolved,
}

impl BurstResolution {
    /// The identity to record in the membership relation.
    pub fn membership_id(&self) -> &str {
        match self {
            BurstResolution::Existing(id) | BurstResolution::Created(id) => id,
            BurstResolution::Unresolved => UNRESOLVED_BURST_ID,
        }
    }
}

/// Resolve a parsed burst against the catalog, creating it when it is
/// genuinely new and its geolocation is known. First-seen wins: a
/// window match returns the existing identity unchanged.
#[allow(clippy::too_many_arguments)]
pub fn resolve_or_create(
    conn: &mut SqliteConnection,
    track: i32,
    swath: i32,
    orbit_direction: &str,
    signature: i32,
    geolocation: Option<&BurstGeolocation>,
    tolerance: i32,
) -> PipelineResult<BurstResolution> {
    if let Some(existing) = find_burst_in_window(conn, track, swath, signature, tolerance)? {
        return Ok(BurstResolution::Existing(existing.id));
    }

    let Some(geo) = geolocation else {
        return Ok(BurstResolution::Unresolved);
    };

    let id = format!("T{}-IW{}-{}", track, swath, signature);
    let record = BurstRecord {
        id: id.clone(),
        track,
        orbit_direction: orbit_direction.to_string(),
        swath,
        burstid: signature,
        center_lat: geo.center.0,
        center_lon: geo.center.1,
        corner1_lat: geo.corners[0].0,
        corner1_lon: geo.corners[0].1,
        corner2_lat: geo.corners[1].0,
        corner2_lon: geo.corners[1].1,
        corner3_lat: geo.corners[2].0,
        corner3_lon: geo.corners[2].1,
        corner4_lat: geo.corners[3].0,
        corner4_lon: geo.corners[3].1,
    };
    insert_burst(conn, &record)?;
    Ok(BurstResolution::Created(id))
}

/// All bursts matching the spatial predicates of a query: exact track
/// and orbit-direction match, center coordinate inside the bounding
/// box. Ordered by track, then identity, for deterministic grouping.
pub fn bursts_matching(
    conn: &mut SqliteConnection,
    query: &SearchQuery,
) -> PipelineResult<Vec<BurstRecord>> {
    let mut q = bursts::table
        .select(BurstRecord::as_select())
        .into_boxed();
    if let Some(track) = query.track {
        q = q.filter(bursts::track.eq(track));
    }
    if let Some(dir) = query.orbit_direction {
        q = q.filter(bursts::orbit_direction.eq(dir.to_string()));
    }
    if let Some(bbox) = &query.polygon {
        q = q
            .filter(bursts::center_lon.gt(bbox.min_lon))
            .filter(bursts::center_lon.lt(bbox.max_lon))
            .filter(bursts::center_lat.gt(bbox.min_lat))
            .filter(bursts::center_lat.lt(bbox.max_lat));
    }
    let records = q
        .order((bursts::track.asc(), bursts::id.asc()))
        .load(conn)?;
    Ok(records)
}

/// Polarisation predicate for file lookups.
#[derive(Debug, Clone, Copy)]
pub enum PolFilter {
    /// Either of the co-polarised channels used for mosaicking.
    HhOrVv,
    Exact(Polarization),
}

/// Measurement files containing the given burst, optionally restricted
/// by polarisation and acquisition date range. Ordered by file id,
/// which for Sentinel-1 names is chronological per track.
pub fn files_with_burst(
    conn: &mut SqliteConnection,
    burst_id: &str,
    pol: PolFilter,
    date_range: Option<DateRange>,
) -> PipelineResult<Vec<FileRecord>> {
    let mut q = files::table
        .inner_join(files_bursts::table)
        .filter(files_bursts::burst_id.eq(burst_id))
        .select(FileRecord::as_select())
        .into_boxed();
    match pol {
        PolFilter::HhOrVv => {
            q = q.filter(files::pol.eq("HH").or(files::pol.eq("VV")));
        }
        PolFilter::Exact(p) => {
            q = q.filter(files::pol.eq(p.to_string()));
        }
    }
    if let Some(range) = date_range {
        q = q
            .filter(files::date.ge(range.start))
            .filter(files::date.le(range.end));
    }
    let records = q.order(files::id.asc()).load(conn)?;
    Ok(records)
}

/// Files holding the given burst on one acquisition date, with the
/// burst's 1-based position in each file.
pub fn memberships_for_date(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    pol: PolFilter,
    burst_id: &str,
) -> PipelineResult<Vec<(FileRecord, i32)>> {
    let mut q = files::table
        .inner_join(files_bursts::table)
        .filter(files_bursts::burst_id.eq(burst_id))
        .filter(files::date.eq(date))
        .select((FileRecord::as_select(), files_bursts::burst_no))
        .into_boxed();
    match pol {
        PolFilter::HhOrVv => {
            q = q.filter(files::pol.eq("HH").or(files::pol.eq("VV")));
        }
        PolFilter::Exact(p) => {
            q = q.filter(files::pol.eq(p.to_string()));
        }
    }
    let rows = q.load::<(FileRecord, i32)>(conn)?;
    Ok(rows)
}

/// Insert one orbit file interval, idempotently. Returns false when
/// the file is already catalogued; a diagnostic names its location.
pub fn insert_orbit_file(
    conn: &mut SqliteConnection,
    filename: &str,
    directory: &str,
    info: &OrbitFileInfo,
) -> PipelineResult<bool> {
    match info.kind {
        OrbitKind::Precise => {
            let existing: Option<String> = porbits::table
                .find(filename)
                .select(porbits::directory)
                .first(conn)
                .optional()?;
            if let Some(dir) = existing {
                log::info!("Orbit file {} already in catalog, located in {}", filename, dir);
                return Ok(false);
            }
            diesel::insert_into(porbits::table)
                .values((
                    porbits::id.eq(filename),
                    porbits::directory.eq(directory),
                    porbits::begintime.eq(info.begin),
                    porbits::endtime.eq(info.end),
                ))
                .execute(conn)?;
        }
        OrbitKind::Restituted => {
            let existing: Option<String> = rorbits::table
                .find(filename)
                .select(rorbits::directory)
                .first(conn)
                .optional()?;
            if let Some(dir) = existing {
                log::info!("Orbit file {} already in catalog, located in {}", filename, dir);
                return Ok(false);
            }
            diesel::insert_into(rorbits::table)
                .values((
                    rorbits::id.eq(filename),
                    rorbits::directory.eq(directory),
                    rorbits::begintime.eq(info.begin),
                    rorbits::endtime.eq(info.end),
                ))
                .execute(conn)?;
        }
    }
    Ok(true)
}

/// Find the orbit file whose validity interval contains the given
/// acquisition timestamp: (filename, directory). Precise orbits take
/// precedence over restituted ones.
pub fn find_orbit_file(
    conn: &mut SqliteConnection,
    timestamp: NaiveDateTime,
) -> PipelineResult<Option<(String, String)>> {
    let precise: Option<(String, String)> = porbits::table
        .filter(porbits::begintime.le(timestamp))
        .filter(porbits::endtime.ge(timestamp))
        .select((porbits::id, porbits::directory))
        .first(conn)
        .optional()?;
    if precise.is_some() {
        return Ok(precise);
    }
    let restituted = rorbits::table
        .filter(rorbits::begintime.le(timestamp))
        .filter(rorbits::endtime.ge(timestamp))
        .select((rorbits::id, rorbits::directory))
        .first(conn)
        .optional()?;
    Ok(restituted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrbitDirection;

    fn memory_catalog() -> SqliteConnection {
        let mut conn = establish_connection(":memory:").unwrap();
        init_schema(&mut conn).unwrap();
        conn
    }

    fn sample_geolocation() -> BurstGeolocation {
        BurstGeolocation {
            center: (64.0, -19.5),
            corners: [
                (64.1, -20.0),
                (63.9, -19.9),
                (64.1, -19.1),
                (63.9, -19.0),
            ],
        }
    }

    #[test]
    fn test_burst_window_inclusive_bounds() {
        let conn = &mut memory_catalog();
        let geo = sample_geolocation();
        let created = resolve_or_create(conn, 111, 2, "DESCENDING", 22106, Some(&geo), 10).unwrap();
        assert_eq!(
            created,
            BurstResolution::Created("T111-IW2-22106".to_string())
        );

        // Exactly 10 ticks away: same physical burst.
        let at_edge = resolve_or_create(conn, 111, 2, "DESCENDING", 22116, Some(&geo), 10).unwrap();
        assert_eq!(
            at_edge,
            BurstResolution::Existing("T111-IW2-22106".to_string())
        );

        // 11 ticks away: a distinct burst.
        let outside = resolve_or_create(conn, 111, 2, "DESCENDING", 22117, Some(&geo), 10).unwrap();
        assert_eq!(
            outside,
            BurstResolution::Created("T111-IW2-22117".to_string())
        );
    }

    #[test]
    fn test_dedup_scoped_to_track_and_swath() {
        let conn = &mut memory_catalog();
        let geo = sample_geolocation();
        resolve_or_create(conn, 111, 2, "DESCENDING", 22106, Some(&geo), 10).unwrap();
        // Same signature on another swath is a different burst.
        let other = resolve_or_create(conn, 111, 3, "DESCENDING", 22106, Some(&geo), 10).unwrap();
        assert_eq!(other, BurstResolution::Created("T111-IW3-22106".to_string()));
    }

    #[test]
    fn test_unresolved_without_geolocation() {
        let conn = &mut memory_catalog();
        let res = resolve_or_create(conn, 111, 1, "DESCENDING", 30000, None, 10).unwrap();
        assert_eq!(res, BurstResolution::Unresolved);
        assert_eq!(res.membership_id(), UNRESOLVED_BURST_ID);
        // Still fine to record the linkage.
        insert_membership(conn, "file-a.tiff", res.membership_id(), 4).unwrap();
    }

    #[test]
    fn test_bursts_matching_box_and_direction() {
        let conn = &mut memory_catalog();
        let geo = sample_geolocation();
        resolve_or_create(conn, 111, 2, "DESCENDING", 22106, Some(&geo), 10).unwrap();
        let far = BurstGeolocation {
            center: (10.0, 100.0),
            corners: [(9.9, 99.9); 4],
        };
        resolve_or_create(conn, 45, 2, "ASCENDING", 5000, Some(&far), 10).unwrap();

        let mut query = SearchQuery::default();
        query.polygon = Some(crate::types::BoundingBox::from_corners(
            -21.0, 63.0, -18.0, 65.0,
        ));
        query.orbit_direction = Some(OrbitDirection::Descending);
        let matched = bursts_matching(conn, &query).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].track, 111);
    }

    #[test]
    fn test_orbit_lookup_prefers_precise() {
        let conn = &mut memory_catalog();
        let d = |h: u32| {
            chrono::NaiveDate::from_ymd_opt(2015, 5, 7)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let precise = OrbitFileInfo {
            kind: OrbitKind::Precise,
            begin: d(0),
            end: d(12),
        };
        let restituted = OrbitFileInfo {
            kind: OrbitKind::Restituted,
            begin: d(2),
            end: d(10),
        };
        assert!(insert_orbit_file(conn, "precise.EOF", "/orbits", &precise).unwrap());
        assert!(insert_orbit_file(conn, "restituted.EOF", "/orbits", &restituted).unwrap());
        // Second insert of the same id is skipped.
        assert!(!insert_orbit_file(conn, "precise.EOF", "/elsewhere", &precise).unwrap());

        let hit = find_orbit_file(conn, d(4)).unwrap().unwrap();
        assert_eq!(hit.0, "precise.EOF");

        // Outside the precise interval the restituted file is used.
        let precise_late = OrbitFileInfo {
            kind: OrbitKind::Precise,
            begin: d(20),
            end: d(22),
        };
        diesel::delete(porbits::table).execute(conn).unwrap();
        insert_orbit_file(conn, "late.EOF", "/orbits", &precise_late).unwrap();
        let hit = find_orbit_file(conn, d(4)).unwrap().unwrap();
        assert_eq!(hit.0, "restituted.EOF");
    }
}
