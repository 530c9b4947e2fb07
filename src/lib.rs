//! Sentinel-1 interferometric stack preparation.
//!
//! Builds and maintains a relational catalog of Sentinel-1 IW SLC
//! acquisitions at burst granularity, answers spatial/temporal queries
//! over it, assembles per-date burst mosaics and schedules the
//! coregistration of a full image stack onto a single master geometry.
//! The heavy SAR processing itself is delegated to an external
//! toolchain through the [`core::toolchain::ToolchainAdapter`] port.

pub mod catalog;
pub mod core;
pub mod io;
pub mod types;

pub use types::{
    BoundingBox, DateRange, OrbitDirection, PipelineError, PipelineParams, PipelineResult,
    Polarization,
};
