//! Parsers and file-format helpers for the product metadata and the
//! boundary artifacts of the pipeline.

pub mod annotation;
pub mod lists;
pub mod manifest;
pub mod orbit;
pub mod query_file;

pub use annotation::{burst_signature, Annotation, BurstGeolocation, CornerIndex};
pub use orbit::{parse_orbit_filename, OrbitFileInfo, OrbitKind};
pub use query_file::SearchQuery;
