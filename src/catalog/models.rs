//! Row types of the acquisition catalog. Field order matches the
//! table declarations in `schema.rs`.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

/// One measurement file of a Sentinel-1 product. Immutable after
/// ingest; never deleted by this subsystem.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::catalog::schema::files)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FileRecord {
    pub id: String,
    pub directory: String,
    pub track: i32,
    pub orbit_direction: String,
    pub swath: i32,
    pub pol: String,
    pub date: NaiveDate,
}

/// One physical burst, identified by track, swath and its quantized
/// azimuth timing signature. Geolocation rows exist only for bursts
/// whose corner coordinates could be derived.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::catalog::schema::bursts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BurstRecord {
    pub id: String,
    pub track: i32,
    pub orbit_direction: String,
    pub swath: i32,
    pub burstid: i32,
    pub center_lat: f64,
    pub center_lon: f64,
    pub corner1_lat: f64,
    pub corner1_lon: f64,
    pub corner2_lat: f64,
    pub corner2_lon: f64,
    pub corner3_lat: f64,
    pub corner3_lon: f64,
    pub corner4_lat: f64,
    pub corner4_lon: f64,
}

impl BurstRecord {
    /// The four corner coordinates as (lat, lon) pairs.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.corner1_lat, self.corner1_lon),
            (self.corner2_lat, self.corner2_lon),
            (self.corner3_lat, self.corner3_lon),
            (self.corner4_lat, self.corner4_lon),
        ]
    }
}

/// Membership of one burst in one measurement file, with the 1-based
/// position of the burst within the file.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::catalog::schema::files_bursts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Membership {
    pub file_id: String,
    pub burst_id: String,
    pub burst_no: i32,
}

/// Validity interval of an orbit ephemerides file. Used for both the
/// precise and the restituted table.
#[derive(Debug, Clone, Queryable)]
pub struct OrbitRecord {
    pub id: String,
    pub directory: String,
    pub begintime: NaiveDateTime,
    pub endtime: NaiveDateTime,
}
