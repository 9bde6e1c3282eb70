pub mod facility_service;
pub mod retention;

pub use facility_service::{FacilityService, Recognition};
pub use retention::RetentionSweeper;
