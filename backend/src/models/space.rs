use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Space identifiers run from 1 to the facility size
pub type SpaceId = u32;

/// A physical parking slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSpace {
    pub id: SpaceId,
    pub occupied: bool,
    /// Set iff `occupied`
    pub plate_number: Option<String>,
    /// Only while `occupied`
    pub charging: bool,
    /// Set iff `charging`
    pub charging_started_at: Option<DateTime<Utc>>,
    /// Accrued charging cost for the current stay
    pub charging_cost: Decimal,
}

impl ParkingSpace {
    /// A free space
    pub fn new(id: SpaceId) -> Self {
        Self {
            id,
            occupied: false,
            plate_number: None,
            charging: false,
            charging_started_at: None,
            charging_cost: Decimal::ZERO,
        }
    }

    pub fn is_free(&self) -> bool {
        !self.occupied
    }

    /// Whether this space holds `plate`
    pub fn holds(&self, plate: &str) -> bool {
        self.plate_number.as_deref() == Some(plate)
    }

    /// `charging => occupied`, `plate <=> occupied`, `charging_started_at <=> charging`
    pub fn is_consistent(&self) -> bool {
        (!self.charging || self.occupied)
            && (self.plate_number.is_some() == self.occupied)
            && (self.charging_started_at.is_some() == self.charging)
    }

    /// The same space with a vehicle parked in it
    pub(crate) fn occupied_by(&self, plate: &str) -> Self {
        Self {
            occupied: true,
            plate_number: Some(plate.to_string()),
            ..Self::new(self.id)
        }
    }

    /// The same space after the vehicle left
    pub(crate) fn vacated(&self) -> Self {
        Self::new(self.id)
    }
}
