use crate::models::{LedgerSnapshot, SpaceId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// What a successful transition changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerChange {
    Entered {
        space_id: SpaceId,
        record_id: Uuid,
        plate_number: String,
    },
    Exited {
        space_id: SpaceId,
        record_id: Uuid,
        fee: Decimal,
    },
    ChargingToggled {
        space_id: SpaceId,
        charging: bool,
        charging_cost: Decimal,
    },
    RecordDeleted {
        record_id: Uuid,
        plate_number: String,
    },
}

/// Emitted once per successful transition, in transition order
#[derive(Debug, Clone)]
pub struct LedgerEvent {
    /// Starts at 1, increases by one per event
    pub sequence: u64,
    pub change: LedgerChange,
    /// State right after the transition
    pub snapshot: Arc<LedgerSnapshot>,
}

/// Receiving end of the ledger's event stream
pub type LedgerEvents = mpsc::UnboundedReceiver<LedgerEvent>;
