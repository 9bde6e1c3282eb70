use super::LedgerError;
use crate::models::{
    LedgerSnapshot, ParkingRecord, ParkingRecordView, ParkingSpace, ParkingSpaceView, SpaceId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// In-memory copy of every space and record. Only touched under the ledger lock.
#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) spaces: BTreeMap<SpaceId, ParkingSpace>,
    pub(crate) records: HashMap<Uuid, ParkingRecord>,
    pub(crate) sequence: u64,
}

impl LedgerState {
    pub(crate) fn new(spaces: Vec<ParkingSpace>, records: Vec<ParkingRecord>) -> Self {
        Self {
            spaces: spaces.into_iter().map(|s| (s.id, s)).collect(),
            records: records.into_iter().map(|r| (r.id, r)).collect(),
            sequence: 0,
        }
    }

    pub(crate) fn space(&self, id: SpaceId) -> Result<&ParkingSpace, LedgerError> {
        self.spaces.get(&id).ok_or(LedgerError::SpaceNotFound(id))
    }

    pub(crate) fn open_record_for(&self, plate: &str) -> Option<&ParkingRecord> {
        self.records
            .values()
            .find(|r| r.is_open() && r.plate_number == plate)
    }

    /// Space currently holding `plate`, if any
    pub(crate) fn space_holding(&self, plate: &str) -> Option<&ParkingSpace> {
        self.spaces.values().find(|s| s.holds(plate))
    }

    pub(crate) fn first_free_space(&self) -> Option<SpaceId> {
        self.spaces.values().find(|s| s.is_free()).map(|s| s.id)
    }

    /// Every plate that appears on any record, open or closed
    pub(crate) fn known_plates(&self) -> HashSet<String> {
        self.records
            .values()
            .map(|r| r.plate_number.clone())
            .collect()
    }

    pub(crate) fn sorted_records(&self) -> Vec<&ParkingRecord> {
        let mut records: Vec<&ParkingRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.entry_time.cmp(&b.entry_time).then(a.id.cmp(&b.id)));
        records
    }

    pub(crate) fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            spaces: self.spaces.values().map(ParkingSpaceView::from).collect(),
            records: self
                .sorted_records()
                .into_iter()
                .map(ParkingRecordView::from)
                .collect(),
        }
    }

    /// Problems found when loading persisted state
    pub(crate) fn inconsistencies(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for space in self.spaces.values() {
            if !space.is_consistent() {
                problems.push(format!("space {} has contradictory fields", space.id));
            }
            if let Some(plate) = &space.plate_number {
                if self.open_record_for(plate).is_none() {
                    problems.push(format!(
                        "space {} holds {} but no open record exists",
                        space.id, plate
                    ));
                }
            }
        }

        for record in self.records.values().filter(|r| r.is_open()) {
            if self.space_holding(&record.plate_number).is_none() {
                problems.push(format!(
                    "open record {} for {} is not parked in any space",
                    record.id, record.plate_number
                ));
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_snapshot_orders_records_by_entry() {
        let now = Utc::now();
        let late = ParkingRecord::new("BBB-222".into(), now);
        let early = ParkingRecord::new("AAA-111".into(), now - Duration::hours(1));
        let state = LedgerState::new(
            vec![ParkingSpace::new(2), ParkingSpace::new(1)],
            vec![late.clone(), early.clone()],
        );

        let snapshot = state.snapshot();
        assert_eq!(snapshot.spaces[0].id, 1);
        assert_eq!(snapshot.records[0].id, early.id);
        assert_eq!(snapshot.records[1].id, late.id);
    }

    #[test]
    fn test_inconsistencies_are_reported() {
        let record = ParkingRecord::new("AAA-111".into(), Utc::now());
        let parked_elsewhere = ParkingSpace::new(1).occupied_by("ZZZ-999");
        let state = LedgerState::new(vec![parked_elsewhere], vec![record]);

        let problems = state.inconsistencies();
        assert_eq!(problems.len(), 2);
    }
}
