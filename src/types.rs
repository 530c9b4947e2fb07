use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Polarization modes for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

impl FromStr for Polarization {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            _ => Err(PipelineError::Metadata(format!(
                "Invalid polarization: {}",
                s
            ))),
        }
    }
}

/// Orbit pass direction. Stored in the catalog in its canonical
/// uppercase form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrbitDirection {
    Ascending,
    Descending,
}

impl std::fmt::Display for OrbitDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitDirection::Ascending => write!(f, "ASCENDING"),
            OrbitDirection::Descending => write!(f, "DESCENDING"),
        }
    }
}

impl FromStr for OrbitDirection {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ASCENDING" => Ok(OrbitDirection::Ascending),
            "DESCENDING" => Ok(OrbitDirection::Descending),
            _ => Err(PipelineError::Metadata(format!(
                "Invalid orbit direction: {}",
                s
            ))),
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Build a box from two opposing corners, in either order.
    pub fn from_corners(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Self {
        Self {
            min_lon: lon1.min(lon2),
            max_lon: lon1.max(lon2),
            min_lat: lat1.min(lat2),
            max_lat: lat1.max(lat2),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lon > self.min_lon && lon < self.max_lon && lat > self.min_lat && lat < self.max_lat
    }
}

/// Inclusive acquisition date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }
}

/// Tuning parameters of the pipeline. The defaults are the values the
/// processing chain was validated with; they are exposed here rather
/// than hardcoded at the call sites.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Half-width of the burst identity window, in signature ticks
    /// (azimuth ANX time x 10).
    pub burst_tolerance_ticks: i32,
    /// Temporal baseline above which spectral-diversity coregistration
    /// needs an auxiliary image, in days. The bound is inclusive.
    pub aux_baseline_days: i64,
    /// Multilook factors for the MLI mosaic (azimuth, range).
    pub mli_looks: (u32, u32),
    /// Multilook factors for the SLC mosaic (azimuth, range).
    pub slc_looks: (u32, u32),
    /// Cross-correlation patch size for offset estimation (range, azimuth).
    pub offset_patch: (u32, u32),
    /// Offset estimation grid size (range, azimuth).
    pub offset_grid: (u32, u32),
    /// SNR threshold for accepting offset estimates.
    pub offset_snr_threshold: f64,
    /// Coherence threshold for the spectral-diversity overlap refinement.
    pub sd_coherence_threshold: f64,
    /// Phase standard deviation threshold for the overlap refinement.
    pub sd_phase_stdev: f64,
    /// Minimum valid data fraction for the overlap refinement.
    pub sd_fraction: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            burst_tolerance_ticks: 10,
            aux_baseline_days: 60,
            mli_looks: (5, 1),
            slc_looks: (1, 1),
            offset_patch: (256, 64),
            offset_grid: (64, 64),
            offset_snr_threshold: 7.0,
            sd_coherence_threshold: 0.8,
            sd_phase_stdev: 0.01,
            sd_fraction: 0.8,
        }
    }
}

/// Error types for the catalog and planning pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Database connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Track {0} is not among the query candidates")]
    InvalidTrack(i32),

    #[error("Toolchain operation failed: {0}")]
    Toolchain(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
