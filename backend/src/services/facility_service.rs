use crate::error::AppResult;
use crate::images::{ImageStore, SweepReport};
use crate::ledger::Ledger;
use crate::models::{
    FeeEstimate, LedgerSnapshot, ParkingRecord, ParkingRecordView, ParkingSpace,
    ParkingSpaceView, SpaceId,
};
use crate::recognition::{assemble_plate, Detection, PlatePolicy};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one recognition frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recognition {
    pub plate_number: Option<String>,
    /// True when this frame was the first sighting and its image was cached
    pub image_stored: bool,
}

impl Recognition {
    fn nothing() -> Self {
        Self {
            plate_number: None,
            image_stored: false,
        }
    }
}

/// Administrative operations on the facility
pub struct FacilityService {
    ledger: Arc<Ledger>,
    images: Arc<ImageStore>,
    plates: PlatePolicy,
}

impl FacilityService {
    pub fn new(ledger: Arc<Ledger>, images: Arc<ImageStore>, plates: PlatePolicy) -> Self {
        Self {
            ledger,
            images,
            plates,
        }
    }

    /// Park a vehicle. Without a space id the lowest free space is used.
    pub async fn entry(
        &self,
        space_id: Option<SpaceId>,
        plate_number: &str,
    ) -> AppResult<ParkingRecord> {
        let record = match space_id {
            Some(id) => self.ledger.entry(id, plate_number).await?,
            None => self.ledger.entry_any_space(plate_number).await?,
        };
        self.sweep_images().await;
        Ok(record)
    }

    pub async fn exit(&self, space_id: SpaceId) -> AppResult<ParkingRecord> {
        let record = self.ledger.exit(space_id).await?;
        self.sweep_images().await;
        Ok(record)
    }

    pub async fn toggle_charging(&self, space_id: SpaceId) -> AppResult<ParkingSpace> {
        Ok(self.ledger.toggle_charging(space_id).await?)
    }

    pub async fn delete_record(&self, record_id: Uuid) -> AppResult<ParkingRecord> {
        let record = self.ledger.delete_record(record_id).await?;
        self.sweep_images().await;
        Ok(record)
    }

    pub async fn list_spaces(&self) -> Vec<ParkingSpaceView> {
        self.ledger.snapshot().await.spaces
    }

    pub async fn list_records(&self) -> Vec<ParkingRecordView> {
        self.ledger.snapshot().await.records
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot().await
    }

    pub async fn versioned_snapshot(&self) -> (u64, LedgerSnapshot) {
        self.ledger.versioned_snapshot().await
    }

    pub async fn estimate_fee(&self, plate_number: &str) -> AppResult<FeeEstimate> {
        Ok(self.ledger.estimate_fee(plate_number).await?)
    }

    pub async fn charging_estimate(&self, space_id: SpaceId) -> AppResult<Decimal> {
        Ok(self.ledger.charging_estimate(space_id).await?)
    }

    /// Assemble a plate from one frame and cache the frame on first sighting.
    ///
    /// An unreadable frame is a normal outcome, not an error. Cache write
    /// failures are logged and reported as `image_stored: false`.
    pub async fn recognize(&self, detections: &[Detection], image: Option<&[u8]>) -> Recognition {
        let Some(plate) = assemble_plate(detections, &self.plates) else {
            debug!("No plate in frame ({} detections)", detections.len());
            return Recognition::nothing();
        };

        let image_stored = match image {
            Some(bytes) => match self.images.store_if_absent(&plate, bytes).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Failed to cache image for {}: {}", plate, e);
                    false
                }
            },
            None => false,
        };

        info!("Recognized plate {} (image stored: {})", plate, image_stored);
        Recognition {
            plate_number: Some(plate),
            image_stored,
        }
    }

    /// Delete cached images of plates that no record mentions
    pub async fn sweep_images(&self) -> SweepReport {
        let known = self.ledger.known_plates().await;
        let report = self.images.sweep(&known).await;
        if !report.removed.is_empty() || report.failed > 0 {
            info!(
                "Image sweep: {} removed, {} retained, {} failed",
                report.removed.len(),
                report.retained,
                report.failed
            );
        }
        report
    }
}
