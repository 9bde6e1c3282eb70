//! Turning detector output into plate numbers.

pub mod plate;

pub use plate::{assemble_plate, Detection, PlatePolicy};
