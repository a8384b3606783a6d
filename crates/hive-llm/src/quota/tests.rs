use super::*;
use chrono::TimeZone;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

#[tokio::test]
async fn test_cap_blocks_automatic_selection() {
    let quota = QuotaCounter::new(2);
    let now = Utc::now();

    assert!(quota.try_acquire_at(now).await);
    assert!(quota.try_acquire_at(now).await);
    assert!(!quota.try_acquire_at(now).await);
    assert!(!quota.is_available_at(now).await);

    let snapshot = quota.snapshot().await;
    assert_eq!(snapshot.used, 2);
    assert_eq!(snapshot.remaining(), Some(0));
}

#[tokio::test]
async fn test_explicit_record_ignores_cap() {
    let quota = QuotaCounter::new(1);
    let now = Utc::now();

    assert!(quota.try_acquire_at(now).await);
    quota.record_at(now).await;
    quota.record_at(now).await;

    assert_eq!(quota.snapshot().await.used, 3);
}

#[tokio::test]
async fn test_zero_cap_is_unlimited() {
    let quota = QuotaCounter::new(0);
    let now = Utc::now();
    for _ in 0..50 {
        assert!(quota.try_acquire_at(now).await);
    }
    assert!(quota.is_available_at(now).await);
    assert_eq!(quota.snapshot().await.remaining(), None);
}

#[tokio::test]
async fn test_window_resets_next_day() {
    let quota = QuotaCounter {
        cap: 1,
        state: Mutex::new(QuotaWindow::starting(at(1, 8))),
        path: None,
    };

    assert!(quota.try_acquire_at(at(1, 9)).await);
    assert!(!quota.try_acquire_at(at(1, 23)).await);
    assert!(quota.try_acquire_at(at(2, 0)).await);
}

#[tokio::test]
async fn test_counter_never_decreases_within_window() {
    let quota = QuotaCounter::new(3);
    let now = Utc::now();
    let mut last = 0;
    for _ in 0..5 {
        quota.try_acquire_at(now).await;
        let used = quota.snapshot().await.used;
        assert!(used >= last);
        last = used;
    }
    assert_eq!(last, 3);
}

#[tokio::test]
async fn test_persisted_counter_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("quota.json");

    let quota = QuotaCounter::load(5, &path).await.unwrap();
    assert!(quota.try_acquire().await);
    assert!(quota.try_acquire().await);
    drop(quota);

    let reloaded = QuotaCounter::load(5, &path).await.unwrap();
    assert_eq!(reloaded.snapshot().await.used, 2);
}

#[tokio::test]
async fn test_corrupt_state_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quota.json");
    tokio::fs::write(&path, b"not json").await.unwrap();

    let quota = QuotaCounter::load(5, &path).await.unwrap();
    assert_eq!(quota.snapshot().await.used, 0);
}
