//! The relational acquisition catalog: products, bursts, their
//! many-to-many membership relation and orbit-file intervals.

pub mod models;
pub mod schema;
pub mod store;

pub use models::{BurstRecord, FileRecord, Membership, OrbitRecord};
pub use store::{
    establish_connection, init_schema, BurstResolution, PolFilter, UNRESOLVED_BURST_ID,
};
