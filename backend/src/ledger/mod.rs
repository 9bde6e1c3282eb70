//! The ledger owns every parking space and parking record.
//!
//! All transitions run under one async mutex: the precondition checks, the
//! write-through to the database and the in-memory update happen as a single
//! unit, so two callers can never both see a space as free. The database
//! transaction commits before memory is touched; a failed commit leaves both
//! unchanged. Each successful transition emits exactly one [`LedgerEvent`].

pub mod error;
pub mod events;
mod state;

pub use error::{ErrorKind, LedgerError};
pub use events::{LedgerChange, LedgerEvent, LedgerEvents};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::database::Database;
use crate::fees::{tariff_from_config, ChargingMeter, ParkingTariff};
use crate::models::{FeeEstimate, LedgerSnapshot, ParkingRecord, ParkingSpace, SpaceId};
use crate::recognition::PlatePolicy;
use crate::repositories::{RecordRepository, SpaceRepository};
use rust_decimal::Decimal;
use state::LedgerState;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Fixed parameters of a ledger
pub struct LedgerSettings {
    pub total_spaces: SpaceId,
    pub tariff: Arc<dyn ParkingTariff>,
    pub charging: ChargingMeter,
    pub plates: PlatePolicy,
}

impl LedgerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            total_spaces: config.facility.total_spaces,
            tariff: tariff_from_config(&config.tariff),
            charging: ChargingMeter::new(config.tariff.charging_rate_per_hour),
            plates: PlatePolicy::from(&config.recognition),
        }
    }
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    db: Database,
    space_repo: SpaceRepository,
    record_repo: RecordRepository,
    tariff: Arc<dyn ParkingTariff>,
    meter: ChargingMeter,
    plates: PlatePolicy,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<LedgerEvent>,
}

impl Ledger {
    /// Load persisted state, creating spaces `1..=total_spaces` that do not exist yet.
    ///
    /// Returns the ledger and the stream of events it will emit.
    pub async fn load(
        db: Database,
        settings: LedgerSettings,
        clock: Arc<dyn Clock>,
    ) -> LedgerResult<(Self, LedgerEvents)> {
        let space_repo = SpaceRepository::new(db.pool().clone());
        let record_repo = RecordRepository::new(db.pool().clone());

        let created = space_repo.ensure_spaces(settings.total_spaces).await?;
        if created > 0 {
            info!("Initialized {} new parking spaces", created);
        }

        let mut spaces = space_repo.find_all().await?;
        let stored = spaces.len();
        spaces.retain(|s| s.id <= settings.total_spaces);
        if spaces.len() < stored {
            warn!(
                "Ignoring {} stored spaces beyond the configured {}",
                stored - spaces.len(),
                settings.total_spaces
            );
        }

        let records = record_repo.find_all().await?;
        let state = LedgerState::new(spaces, records);
        for problem in state.inconsistencies() {
            warn!("Ledger inconsistency on load: {}", problem);
        }

        info!(
            "Ledger loaded: {} spaces, {} records ({} tariff)",
            state.spaces.len(),
            state.records.len(),
            settings.tariff.name()
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let ledger = Self {
            state: Mutex::new(state),
            db,
            space_repo,
            record_repo,
            tariff: settings.tariff,
            meter: settings.charging,
            plates: settings.plates,
            clock,
            events: tx,
        };
        Ok((ledger, rx))
    }

    /// Park `plate_number` in `space_id`, opening a new record
    pub async fn entry(&self, space_id: SpaceId, plate_number: &str) -> LedgerResult<ParkingRecord> {
        let plate = self.normalize_plate(plate_number)?;
        let mut state = self.state.lock().await;
        self.enter_locked(&mut state, space_id, plate).await
    }

    /// Park `plate_number` in the lowest-numbered free space
    pub async fn entry_any_space(&self, plate_number: &str) -> LedgerResult<ParkingRecord> {
        let plate = self.normalize_plate(plate_number)?;
        let mut state = self.state.lock().await;
        let space_id = match state.first_free_space() {
            Some(id) => id,
            None => {
                warn!("Entry rejected: no free space for {}", plate);
                return Err(LedgerError::FacilityFull(plate));
            }
        };
        self.enter_locked(&mut state, space_id, plate).await
    }

    async fn enter_locked(
        &self,
        state: &mut LedgerState,
        space_id: SpaceId,
        plate: String,
    ) -> LedgerResult<ParkingRecord> {
        let space = state.space(space_id)?;
        if space.occupied {
            warn!("Entry rejected: space {} is occupied", space_id);
            return Err(LedgerError::SpaceOccupied(space_id));
        }
        if state.open_record_for(&plate).is_some() || state.space_holding(&plate).is_some() {
            warn!("Entry rejected: {} is already parked", plate);
            return Err(LedgerError::DuplicateOpenRecord(plate));
        }

        let record = ParkingRecord::new(plate.clone(), self.clock.now());
        let occupied = space.occupied_by(&plate);

        let mut tx = self.db.pool().begin().await?;
        self.record_repo.insert(&mut *tx, &record).await?;
        self.space_repo.save(&mut *tx, &occupied).await?;
        tx.commit().await?;

        state.records.insert(record.id, record.clone());
        state.spaces.insert(space_id, occupied);

        info!("Vehicle {} entered space {} (record {})", plate, space_id, record.id);
        self.publish(
            state,
            LedgerChange::Entered {
                space_id,
                record_id: record.id,
                plate_number: plate,
            },
        );
        Ok(record)
    }

    /// Close the open record of the vehicle in `space_id` and free the space
    pub async fn exit(&self, space_id: SpaceId) -> LedgerResult<ParkingRecord> {
        let mut state = self.state.lock().await;

        let space = state.space(space_id)?.clone();
        let plate = match (&space.plate_number, space.occupied) {
            (Some(plate), true) => plate.clone(),
            _ => {
                warn!("Exit rejected: space {} is not occupied", space_id);
                return Err(LedgerError::SpaceNotOccupied(space_id));
            }
        };
        let record = state
            .open_record_for(&plate)
            .cloned()
            .ok_or_else(|| LedgerError::RecordNotFound(format!("open record for {}", plate)))?;

        let now = self.clock.now();
        let fee = self.tariff.fee_between(record.entry_time, now)?;
        // Charging never blocks an exit; a skewed segment is dropped from the log line
        let charging_cost = match space.charging_started_at {
            Some(started) if space.charging => self
                .meter
                .accrue(space.charging_cost, started, now)
                .unwrap_or_else(|err| {
                    warn!("Charging on space {} not accrued at exit: {}", space_id, err);
                    space.charging_cost
                }),
            _ => space.charging_cost,
        };

        let closed = record.closed(now, fee);
        let vacated = space.vacated();

        let mut tx = self.db.pool().begin().await?;
        self.record_repo.close(&mut *tx, &closed).await?;
        self.space_repo.save(&mut *tx, &vacated).await?;
        tx.commit().await?;

        state.records.insert(closed.id, closed.clone());
        state.spaces.insert(space_id, vacated);

        info!(
            "Vehicle {} left space {}: fee {}, charging {}",
            plate, space_id, fee, charging_cost
        );
        self.publish(
            &mut state,
            LedgerChange::Exited {
                space_id,
                record_id: closed.id,
                fee,
            },
        );
        Ok(closed)
    }

    /// Start charging, or stop it and fold the elapsed segment into the cost
    pub async fn toggle_charging(&self, space_id: SpaceId) -> LedgerResult<ParkingSpace> {
        let mut state = self.state.lock().await;

        let space = state.space(space_id)?.clone();
        if !space.occupied {
            warn!("Charging toggle rejected: space {} is not occupied", space_id);
            return Err(LedgerError::SpaceNotOccupied(space_id));
        }

        let now = self.clock.now();
        let updated = match space.charging_started_at {
            Some(started) if space.charging => ParkingSpace {
                charging: false,
                charging_started_at: None,
                charging_cost: self.meter.accrue(space.charging_cost, started, now)?,
                ..space
            },
            _ => ParkingSpace {
                charging: true,
                charging_started_at: Some(now),
                ..space
            },
        };

        let mut tx = self.db.pool().begin().await?;
        self.space_repo.save(&mut *tx, &updated).await?;
        tx.commit().await?;

        state.spaces.insert(space_id, updated.clone());

        info!(
            "Charging {} on space {} (accrued {})",
            if updated.charging { "started" } else { "stopped" },
            space_id,
            updated.charging_cost
        );
        self.publish(
            &mut state,
            LedgerChange::ChargingToggled {
                space_id,
                charging: updated.charging,
                charging_cost: updated.charging_cost,
            },
        );
        Ok(updated)
    }

    /// Remove a record. Space occupancy is left as it is, even if the record was open.
    pub async fn delete_record(&self, record_id: Uuid) -> LedgerResult<ParkingRecord> {
        let mut state = self.state.lock().await;

        let record = state
            .records
            .get(&record_id)
            .cloned()
            .ok_or_else(|| LedgerError::RecordNotFound(record_id.to_string()))?;

        let mut tx = self.db.pool().begin().await?;
        if !self.record_repo.delete(&mut *tx, record_id).await? {
            warn!("Record {} was missing from storage", record_id);
        }
        tx.commit().await?;

        state.records.remove(&record_id);

        if record.is_open() {
            if let Some(space) = state.space_holding(&record.plate_number) {
                warn!(
                    "Deleted open record {} while {} is still parked in space {}",
                    record_id, record.plate_number, space.id
                );
            }
        }

        info!("Deleted record {} ({})", record_id, record.plate_number);
        self.publish(
            &mut state,
            LedgerChange::RecordDeleted {
                record_id,
                plate_number: record.plate_number.clone(),
            },
        );
        Ok(record)
    }

    /// Consistent view of all spaces and records
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Snapshot together with the sequence of the last event it includes
    pub async fn versioned_snapshot(&self) -> (u64, LedgerSnapshot) {
        let state = self.state.lock().await;
        (state.sequence, state.snapshot())
    }

    pub async fn spaces(&self) -> Vec<ParkingSpace> {
        self.state.lock().await.spaces.values().cloned().collect()
    }

    pub async fn records(&self) -> Vec<ParkingRecord> {
        let state = self.state.lock().await;
        state.sorted_records().into_iter().cloned().collect()
    }

    pub async fn space(&self, space_id: SpaceId) -> LedgerResult<ParkingSpace> {
        self.state.lock().await.space(space_id).cloned()
    }

    /// Plates on any record, open or closed
    pub async fn known_plates(&self) -> HashSet<String> {
        self.state.lock().await.known_plates()
    }

    /// Fee the open stay of `plate_number` would cost if it ended now
    pub async fn estimate_fee(&self, plate_number: &str) -> LedgerResult<FeeEstimate> {
        let plate = self.normalize_plate(plate_number)?;
        let state = self.state.lock().await;
        let record = state
            .open_record_for(&plate)
            .ok_or_else(|| LedgerError::RecordNotFound(format!("open record for {}", plate)))?;

        let estimated_fee = self.tariff.fee_between(record.entry_time, self.clock.now())?;
        Ok(FeeEstimate {
            plate_number: plate,
            entry_time: record.entry_time,
            estimated_fee,
        })
    }

    /// Accrued charging cost plus the running segment. Changes nothing.
    pub async fn charging_estimate(&self, space_id: SpaceId) -> LedgerResult<Decimal> {
        let state = self.state.lock().await;
        let space = state.space(space_id)?;
        match space.charging_started_at {
            Some(started) if space.charging => Ok(self.meter.accrue(
                space.charging_cost,
                started,
                self.clock.now(),
            )?),
            _ => Ok(space.charging_cost),
        }
    }

    fn normalize_plate(&self, raw: &str) -> LedgerResult<String> {
        self.plates
            .normalize(raw)
            .ok_or_else(|| LedgerError::InvalidPlate(raw.to_string()))
    }

    fn publish(&self, state: &mut LedgerState, change: LedgerChange) {
        state.sequence += 1;
        let event = LedgerEvent {
            sequence: state.sequence,
            change,
            snapshot: Arc::new(state.snapshot()),
        };
        if self.events.send(event).is_err() {
            debug!("No consumer for ledger event {}", state.sequence);
        }
    }
}
