mod helpers;

use chrono::Duration;
use helpers::*;
use parking_backend::error::RepositoryError;
use parking_backend::models::{ParkingRecord, ParkingSpace};
use parking_backend::repositories::{RecordRepository, SpaceRepository};
use rust_decimal::Decimal;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

// ============================================================================
// Spaces
// ============================================================================

#[tokio::test]
async fn test_ensure_spaces_is_idempotent() {
    let db = test_database().await;
    let repo = SpaceRepository::new(db.pool().clone());

    assert_eq!(assert_ok!(repo.ensure_spaces(4).await), 4);
    assert_eq!(assert_ok!(repo.ensure_spaces(4).await), 0);
    assert_eq!(assert_ok!(repo.ensure_spaces(6).await), 2);

    let spaces = assert_ok!(repo.find_all().await);
    let ids: Vec<u32> = spaces.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert!(spaces.iter().all(|s| s.is_free() && s.charging_cost == Decimal::ZERO));
}

#[tokio::test]
async fn test_save_space_round_trips() {
    let db = test_database().await;
    let repo = SpaceRepository::new(db.pool().clone());
    assert_ok!(repo.ensure_spaces(2).await);

    let space = ParkingSpace {
        id: 2,
        occupied: true,
        plate_number: Some("ABC-123".to_string()),
        charging: true,
        charging_started_at: Some(opening_time()),
        charging_cost: Decimal::new(1250, 2),
    };
    {
        let mut conn = db.pool().acquire().await.unwrap();
        assert_ok!(repo.save(&mut conn, &space).await);
    }

    let stored = assert_ok!(repo.find_by_id(2).await);
    assert_eq!(stored, Some(space));
    assert_eq!(assert_ok!(repo.find_by_id(3).await), None);
}

#[tokio::test]
async fn test_schema_rejects_contradictory_space() {
    let db = test_database().await;
    let repo = SpaceRepository::new(db.pool().clone());
    assert_ok!(repo.ensure_spaces(1).await);

    let charging_while_free = ParkingSpace {
        charging: true,
        charging_started_at: Some(opening_time()),
        ..ParkingSpace::new(1)
    };
    let mut conn = db.pool().acquire().await.unwrap();
    let err = assert_err!(repo.save(&mut conn, &charging_while_free).await);
    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));

    let err = assert_err!(repo.save(&mut conn, &ParkingSpace::new(9)).await);
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

// ============================================================================
// Records
// ============================================================================

#[tokio::test]
async fn test_record_lifecycle() {
    let db = test_database().await;
    let repo = RecordRepository::new(db.pool().clone());

    let record = ParkingRecord::new("ABC-123".to_string(), opening_time());
    let exit = opening_time() + Duration::minutes(150);
    let closed = ParkingRecord {
        exit_time: Some(exit),
        fee: Decimal::new(90, 0),
        ..record.clone()
    };

    {
        let mut conn = db.pool().acquire().await.unwrap();
        assert_ok!(repo.insert(&mut conn, &record).await);
    }
    assert_eq!(assert_ok!(repo.find_by_id(record.id).await), Some(record.clone()));

    {
        let mut conn = db.pool().acquire().await.unwrap();
        assert_ok!(repo.close(&mut conn, &closed).await);
        // Closing twice finds no open row
        let err = assert_err!(repo.close(&mut conn, &closed).await);
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
    assert_eq!(assert_ok!(repo.find_all().await), vec![closed.clone()]);

    {
        let mut conn = db.pool().acquire().await.unwrap();
        assert!(assert_ok!(repo.delete(&mut conn, closed.id).await));
        assert!(!assert_ok!(repo.delete(&mut conn, Uuid::new_v4()).await));
    }
    assert!(assert_ok!(repo.find_all().await).is_empty());
}

#[tokio::test]
async fn test_one_open_record_per_plate() {
    let db = test_database().await;
    let repo = RecordRepository::new(db.pool().clone());
    let mut conn = db.pool().acquire().await.unwrap();

    let first = ParkingRecord::new("ABC-123".to_string(), opening_time());
    assert_ok!(repo.insert(&mut conn, &first).await);

    let second = ParkingRecord::new("ABC-123".to_string(), opening_time() + Duration::hours(1));
    let err = assert_err!(repo.insert(&mut conn, &second).await);
    assert!(matches!(err, RepositoryError::Duplicate(_)));

    // Once the first stay is closed the plate may open a new one
    let closed = ParkingRecord {
        exit_time: Some(opening_time() + Duration::minutes(30)),
        fee: Decimal::new(60, 0),
        ..first
    };
    assert_ok!(repo.close(&mut conn, &closed).await);
    assert_ok!(repo.insert(&mut conn, &second).await);
}
