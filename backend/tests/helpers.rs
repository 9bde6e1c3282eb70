#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use parking_backend::clock::{Clock, ManualClock};
use parking_backend::config::DatabaseConfig;
use parking_backend::database::{create_pool, run_migrations, Database};
use parking_backend::fees::{ChargingMeter, TieredTariff};
use parking_backend::images::ImageStore;
use parking_backend::ledger::{Ledger, LedgerEvent, LedgerEvents, LedgerSettings};
use parking_backend::recognition::{Detection, PlatePolicy};
use parking_backend::services::FacilityService;
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

pub const MIGRATIONS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");

/// Fresh in-memory database with the schema applied
pub async fn test_database() -> Database {
    let pool = create_pool(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to create test database pool");

    run_migrations(&pool, Some(MIGRATIONS))
        .await
        .expect("Failed to run migrations");

    Database::new(pool)
}

/// 2025-03-01 08:00:00 UTC
pub fn opening_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

/// Tiered tariff 60 + 20/h, charging at 10/h, plates of 6-8 chars with '-'
pub fn settings(total_spaces: u32) -> LedgerSettings {
    LedgerSettings {
        total_spaces,
        tariff: Arc::new(TieredTariff::new(Decimal::new(60, 0), Decimal::new(20, 0))),
        charging: ChargingMeter::new(Decimal::new(10, 0)),
        plates: PlatePolicy::default(),
    }
}

/// A ledger on its own database and clock
pub struct TestLedger {
    pub ledger: Arc<Ledger>,
    pub events: LedgerEvents,
    pub clock: Arc<ManualClock>,
    pub db: Database,
}

impl TestLedger {
    pub async fn new(total_spaces: u32) -> Self {
        Self::on(test_database().await, total_spaces).await
    }

    /// Load a ledger from an existing database, starting at opening time
    pub async fn on(db: Database, total_spaces: u32) -> Self {
        let clock = Arc::new(ManualClock::new(opening_time()));
        let (ledger, events) = Ledger::load(
            db.clone(),
            settings(total_spaces),
            clock.clone() as Arc<dyn Clock>,
        )
        .await
        .expect("Failed to load ledger");

        Self {
            ledger: Arc::new(ledger),
            events,
            clock,
            db,
        }
    }

    /// Every event emitted so far
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// Service over a test ledger and a temporary image directory
pub struct TestFacility {
    pub ledger: TestLedger,
    pub service: Arc<FacilityService>,
    pub images: Arc<ImageStore>,
    pub image_dir: TempDir,
}

impl TestFacility {
    pub async fn new(total_spaces: u32) -> Self {
        let ledger = TestLedger::new(total_spaces).await;
        let image_dir = tempfile::tempdir().expect("Failed to create image dir");
        let images = Arc::new(ImageStore::new(image_dir.path()));
        let service = Arc::new(FacilityService::new(
            ledger.ledger.clone(),
            images.clone(),
            PlatePolicy::default(),
        ));

        Self {
            ledger,
            service,
            images,
            image_dir,
        }
    }
}

/// Detections spelling `plate`, shuffled out of reading order
pub fn detections_for(plate: &str) -> Vec<Detection> {
    let mut detections: Vec<Detection> = plate
        .chars()
        .enumerate()
        .map(|(i, c)| Detection::new(c.to_string(), 20 + 30 * i as i32))
        .collect();
    detections.reverse();
    detections
}

/// Stand-in for a camera frame
pub fn frame_bytes(tag: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(tag.as_bytes());
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}
