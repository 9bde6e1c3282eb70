mod helpers;

use chrono::Duration;
use helpers::*;
use parking_backend::images::ImageStore;
use parking_backend::recognition::{Detection, PlatePolicy};
use parking_backend::services::{FacilityService, RetentionSweeper};
use parking_backend::clock::{Clock, ManualClock};
use parking_backend::config::AppConfig;
use parking_backend::{AppError, AppState};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Recognition
// ============================================================================

#[tokio::test]
async fn test_recognize_caches_first_sighting_only() {
    let t = TestFacility::new(3).await;

    let first = t
        .service
        .recognize(&detections_for("ABC-123"), Some(&frame_bytes("first")))
        .await;
    assert_eq!(first.plate_number.as_deref(), Some("ABC-123"));
    assert!(first.image_stored);

    let second = t
        .service
        .recognize(&detections_for("ABC-123"), Some(&frame_bytes("second")))
        .await;
    assert_eq!(second.plate_number.as_deref(), Some("ABC-123"));
    assert!(!second.image_stored);

    let cached = assert_ok!(t.images.read("ABC-123").await);
    assert_eq!(cached, Some(frame_bytes("first")));
    assert!(t.image_dir.path().join("ABC-123.jpg").exists());
}

#[tokio::test]
async fn test_recognize_rejects_unreadable_frames() {
    let t = TestFacility::new(3).await;

    let empty = t.service.recognize(&[], Some(&frame_bytes("x"))).await;
    assert!(empty.plate_number.is_none());
    assert!(!empty.image_stored);

    let short = t.service.recognize(&detections_for("AB-1"), None).await;
    assert!(short.plate_number.is_none());

    let no_separator = t.service.recognize(&detections_for("ABC1234"), None).await;
    assert!(no_separator.plate_number.is_none());

    let too_long = t.service.recognize(&detections_for("ABCD-12345"), None).await;
    assert!(too_long.plate_number.is_none());

    assert!(!assert_ok!(t.images.contains("AB-1").await));
}

#[tokio::test]
async fn test_recognize_without_image_stores_nothing() {
    let t = TestFacility::new(3).await;
    let detections = vec![
        Detection::new("3", 300),
        Detection::new("A", 10),
        Detection::new("-", 120),
        Detection::new("B", 40),
        Detection::new("1", 200),
        Detection::new("C", 80),
        Detection::new("2", 250),
    ];

    let recognition = t.service.recognize(&detections, None).await;
    assert_eq!(recognition.plate_number.as_deref(), Some("ABC-123"));
    assert!(!recognition.image_stored);
    assert!(!assert_ok!(t.images.contains("ABC-123").await));
}

// ============================================================================
// Operations and error mapping
// ============================================================================

#[tokio::test]
async fn test_entry_without_space_uses_lowest_free() {
    let t = TestFacility::new(2).await;

    let first = assert_ok!(t.service.entry(None, "AAA-111").await);
    let second = assert_ok!(t.service.entry(Some(2), "BBB-222").await);
    assert_ne!(first.id, second.id);

    let spaces = t.service.list_spaces().await;
    assert_eq!(spaces[0].plate_number.as_deref(), Some("AAA-111"));
    assert_eq!(spaces[1].plate_number.as_deref(), Some("BBB-222"));

    let err = assert_err!(t.service.entry(None, "CCC-333").await);
    assert!(err.is_conflict());
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn test_errors_map_to_app_errors() {
    let t = TestFacility::new(1).await;

    let err = assert_err!(t.service.exit(1).await);
    assert!(matches!(err, AppError::Conflict(_)));

    let err = assert_err!(t.service.toggle_charging(9).await);
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);

    let err = assert_err!(t.service.entry(Some(1), "no plate!").await);
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.status_code(), 400);

    let err = assert_err!(t.service.estimate_fee("ABC-123").await);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_full_stay_through_service() {
    let t = TestFacility::new(2).await;
    assert_ok!(t.service.entry(Some(1), "ABC-123").await);
    assert_ok!(t.service.toggle_charging(1).await);

    t.ledger.clock.advance(Duration::minutes(90));
    assert_eq!(
        assert_ok!(t.service.charging_estimate(1).await),
        Decimal::new(15, 0)
    );
    assert_eq!(
        assert_ok!(t.service.estimate_fee("ABC-123").await).estimated_fee,
        Decimal::new(70, 0)
    );

    let closed = assert_ok!(t.service.exit(1).await);
    assert_eq!(closed.fee, Decimal::new(70, 0));

    let records = t.service.list_records().await;
    assert_eq!(records.len(), 1);
    assert!(!records[0].open);
    assert_eq!(t.service.snapshot().await.records, records);
}

// ============================================================================
// Image retention
// ============================================================================

#[tokio::test]
async fn test_deleting_last_record_sweeps_image() {
    let t = TestFacility::new(2).await;
    // Each plate enters right after its sighting so no sweep sees an unreferenced image
    t.service
        .recognize(&detections_for("XYZ-789"), Some(&frame_bytes("xyz")))
        .await;
    assert_ok!(t.service.entry(Some(2), "XYZ-789").await);
    t.service
        .recognize(&detections_for("ABC-123"), Some(&frame_bytes("abc")))
        .await;
    let abc = assert_ok!(t.service.entry(Some(1), "ABC-123").await);
    assert!(assert_ok!(t.images.contains("XYZ-789").await));
    t.ledger.clock.advance(Duration::hours(1));
    assert_ok!(t.service.exit(1).await);

    // A closed record still references the plate
    assert!(assert_ok!(t.images.contains("ABC-123").await));

    assert_ok!(t.service.delete_record(abc.id).await);
    assert!(!assert_ok!(t.images.contains("ABC-123").await));
    assert!(assert_ok!(t.images.contains("XYZ-789").await));
}

#[tokio::test]
async fn test_plate_with_two_records_keeps_image_until_both_gone() {
    let t = TestFacility::new(1).await;
    t.service
        .recognize(&detections_for("ABC-123"), Some(&frame_bytes("abc")))
        .await;

    let first = assert_ok!(t.service.entry(Some(1), "ABC-123").await);
    t.ledger.clock.advance(Duration::hours(1));
    assert_ok!(t.service.exit(1).await);
    let second = assert_ok!(t.service.entry(Some(1), "ABC-123").await);

    assert_ok!(t.service.delete_record(first.id).await);
    assert!(assert_ok!(t.images.contains("ABC-123").await));

    assert_ok!(t.service.delete_record(second.id).await);
    assert!(!assert_ok!(t.images.contains("ABC-123").await));
}

#[tokio::test]
async fn test_sweep_ignores_foreign_files() {
    let t = TestFacility::new(1).await;
    std::fs::write(t.image_dir.path().join("notes.txt"), b"keep me").unwrap();
    std::fs::write(t.image_dir.path().join("ORPHAN-1.jpg"), b"stale").unwrap();

    let report = t.service.sweep_images().await;
    assert_eq!(report.removed, vec!["ORPHAN-1".to_string()]);
    assert_eq!(report.failed, 0);
    assert!(t.image_dir.path().join("notes.txt").exists());
}

#[tokio::test]
async fn test_undeletable_image_does_not_fail_operation() {
    let t = TestFacility::new(1).await;
    let record = assert_ok!(t.service.entry(Some(1), "ABC-123").await);
    t.ledger.clock.advance(Duration::hours(1));
    assert_ok!(t.service.exit(1).await);

    // A non-empty directory under an image name cannot be removed as a file
    let blocked = t.image_dir.path().join("ORPHAN-1.jpg");
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("inner"), b"x").unwrap();
    std::fs::write(t.image_dir.path().join("STALE-01.jpg"), b"stale").unwrap();

    assert_ok!(t.service.delete_record(record.id).await);
    assert!(t.service.list_records().await.is_empty());
    assert!(!t.image_dir.path().join("STALE-01.jpg").exists());
    assert!(blocked.exists());

    let report = t.service.sweep_images().await;
    assert!(report.removed.is_empty());
    assert_eq!(report.failed, 1);
    assert!(blocked.exists());
}

#[tokio::test]
async fn test_grace_period_protects_fresh_images() {
    let ledger = TestLedger::new(1).await;
    let dir = tempfile::tempdir().unwrap();
    let images = Arc::new(
        ImageStore::new(dir.path()).with_grace_period(std::time::Duration::from_secs(3600)),
    );
    let service = Arc::new(FacilityService::new(
        ledger.ledger.clone(),
        images.clone(),
        PlatePolicy::default(),
    ));

    let recognition = service
        .recognize(&detections_for("NEW-001"), Some(&frame_bytes("new")))
        .await;
    assert!(recognition.image_stored);

    let report = RetentionSweeper::new(service.clone()).run_once().await;
    assert!(report.removed.is_empty());
    assert_eq!(report.retained, 1);
    assert!(assert_ok!(images.contains("NEW-001").await));
}

#[tokio::test]
async fn test_configured_grace_keeps_sighting_until_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.facility.total_spaces = 2;
    config.images.directory = dir.path().to_path_buf();

    let clock = Arc::new(ManualClock::new(opening_time()));
    let (state, _events) =
        assert_ok!(AppState::initialize(&config, test_database().await, clock as Arc<dyn Clock>).await);

    state
        .service
        .recognize(&detections_for("XYZ-789"), Some(&frame_bytes("xyz")))
        .await;
    assert_ok!(state.service.entry(Some(1), "ABC-123").await);
    assert!(assert_ok!(state.images.contains("XYZ-789").await));

    assert_ok!(state.service.entry(Some(2), "XYZ-789").await);
    assert!(assert_ok!(state.images.contains("XYZ-789").await));
}

#[tokio::test]
async fn test_periodic_sweep_removes_orphans() {
    let t = TestFacility::new(1).await;
    t.service
        .recognize(&detections_for("ABC-123"), Some(&frame_bytes("abc")))
        .await;

    let sweeper = RetentionSweeper::new(t.service.clone())
        .with_interval(std::time::Duration::from_millis(10));
    let report = sweeper.run_once().await;
    assert_eq!(report.removed, vec!["ABC-123".to_string()]);
    assert!(!assert_ok!(t.images.contains("ABC-123").await));
}
