//! Pipeline stages: catalog ingest, query and track selection,
//! per-date mosaic assembly and coregistration scheduling.

pub mod coreg;
pub mod ingest;
pub mod mosaic;
pub mod query;
pub mod toolchain;

pub use coreg::{coregister_all, CoregPlan, CoregScheduler};
pub use ingest::{ingest_directory, ingest_orbit_directory};
pub use mosaic::{assemble_all, plan_date, MosaicPlan};
pub use query::{query_and_select, run_query, select_track, TrackCandidate, TrackPicker, TrackSelection};
pub use toolchain::{LoggingAdapter, RecordingAdapter, ToolchainAdapter, ToolchainOp};
