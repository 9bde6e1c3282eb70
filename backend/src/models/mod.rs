//! Domain models for the parking backend.
//!
//! Spaces and records are correlated by plate number only; the ledger is the
//! one place that keeps them in step.

pub mod record;
pub mod snapshot;
pub mod space;

// Re-export all models for convenient access
pub use record::{FeeEstimate, ParkingRecord};
pub use snapshot::{LedgerSnapshot, ParkingRecordView, ParkingSpaceView};
pub use space::{ParkingSpace, SpaceId};
