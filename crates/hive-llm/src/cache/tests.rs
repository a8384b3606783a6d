use super::*;

#[test]
fn test_key_distinguishes_fields() {
    let base = cache_key("X", None, Tier::Primary);
    assert_eq!(base, cache_key("X", None, Tier::Primary));
    assert_ne!(base, cache_key("X", None, Tier::Tertiary));
    assert_ne!(base, cache_key("X", Some(""), Tier::Primary));
    assert_ne!(base, cache_key("Y", None, Tier::Primary));
}

#[tokio::test(start_paused = true)]
async fn test_hit_within_ttl() {
    let cache = ResponseCache::new(Duration::from_secs(60), 10);
    cache.insert("X", None, Tier::Primary, "answer").await;

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(
        cache.get("X", None, Tier::Primary).await.as_deref(),
        Some("answer")
    );
    assert!(cache.get("X", None, Tier::Tertiary).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires() {
    let cache = ResponseCache::new(Duration::from_secs(60), 10);
    cache.insert("X", None, Tier::Primary, "answer").await;

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(cache.get("X", None, Tier::Primary).await.is_none());
    assert_eq!(cache.purge_expired().await, 1);
    assert!(cache.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_insert_purges_expired() {
    let cache = ResponseCache::new(Duration::from_secs(10), 10);
    cache.insert("old", None, Tier::Primary, "1").await;
    tokio::time::advance(Duration::from_secs(11)).await;
    cache.insert("new", None, Tier::Primary, "2").await;

    assert_eq!(cache.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_cache_evicts_oldest() {
    let cache = ResponseCache::new(Duration::from_secs(600), 2);
    cache.insert("a", None, Tier::Primary, "1").await;
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.insert("b", None, Tier::Primary, "2").await;
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.insert("c", None, Tier::Primary, "3").await;

    assert_eq!(cache.len().await, 2);
    assert!(cache.get("a", None, Tier::Primary).await.is_none());
    assert!(cache.get("c", None, Tier::Primary).await.is_some());
}

#[tokio::test]
async fn test_zero_ttl_disables_cache() {
    let cache = ResponseCache::new(Duration::ZERO, 10);
    cache.insert("X", None, Tier::Primary, "answer").await;
    assert!(!cache.is_enabled());
    assert!(cache.get("X", None, Tier::Primary).await.is_none());
    assert!(cache.is_empty().await);
}
