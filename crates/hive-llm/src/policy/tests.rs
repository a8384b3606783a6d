use super::*;
use crate::provider::MockProvider;

struct Tiers {
    primary: Arc<MockProvider>,
    secondary: Arc<MockProvider>,
    tertiary: Arc<MockProvider>,
}

impl Tiers {
    fn echo() -> Self {
        Self {
            primary: Arc::new(MockProvider::echo("primary")),
            secondary: Arc::new(MockProvider::echo("secondary")),
            tertiary: Arc::new(MockProvider::echo("tertiary")),
        }
    }

    async fn policy(&self, config: PolicyConfig) -> ModelPolicy {
        ModelPolicy::builder(config)
            .provider(Tier::Primary, self.primary.clone())
            .provider(Tier::Secondary, self.secondary.clone())
            .provider(Tier::Tertiary, self.tertiary.clone())
            .build()
            .await
            .unwrap()
    }
}

fn config_with_cap(cap: u64) -> PolicyConfig {
    PolicyConfig {
        primary_daily_cap: cap,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_quota_cap_downgrades_automatic_selection() {
    let tiers = Tiers::echo();
    let policy = tiers.policy(config_with_cap(2)).await;

    let first = policy.generate(GenerationRequest::new("one")).await.unwrap();
    let second = policy.generate(GenerationRequest::new("two")).await.unwrap();
    let third = policy.generate(GenerationRequest::new("three")).await.unwrap();

    assert_eq!(first.tier, Tier::Primary);
    assert_eq!(second.tier, Tier::Primary);
    assert_eq!(third.tier, Tier::Tertiary);
    assert_eq!(third.text, "tertiary: three");
    assert_eq!(tiers.primary.calls(), 2);

    // An explicit hint bypasses the gate but is still counted
    let forced = policy
        .generate(GenerationRequest::new("four").with_tier(Tier::Primary))
        .await
        .unwrap();
    assert_eq!(forced.tier, Tier::Primary);
    assert_eq!(tiers.primary.calls(), 3);
    assert_eq!(policy.quota().snapshot().await.used, 3);
}

#[tokio::test]
async fn test_zero_cap_never_gates_primary() {
    let tiers = Tiers::echo();
    let policy = tiers.policy(config_with_cap(0)).await;

    for i in 0..5 {
        let result = policy
            .generate(GenerationRequest::new(format!("p{}", i)))
            .await
            .unwrap();
        assert_eq!(result.tier, Tier::Primary);
    }
}

#[tokio::test]
async fn test_cache_hit_skips_provider_and_quota() {
    let tiers = Tiers::echo();
    let policy = tiers.policy(config_with_cap(10)).await;

    let first = policy.generate(GenerationRequest::new("X")).await.unwrap();
    let second = policy.generate(GenerationRequest::new("X")).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.text, second.text);
    assert_eq!(tiers.primary.calls(), 1);
    assert_eq!(policy.quota().snapshot().await.used, 1);
}

#[tokio::test]
async fn test_cache_distinguishes_system_prompt() {
    let tiers = Tiers::echo();
    let policy = tiers.policy(PolicyConfig::default()).await;

    policy.generate(GenerationRequest::new("X")).await.unwrap();
    policy
        .generate(GenerationRequest::new("X").with_system_prompt("be terse"))
        .await
        .unwrap();

    assert_eq!(tiers.primary.calls(), 2);
}

#[tokio::test]
async fn test_primary_failure_falls_back_to_tertiary() {
    let tiers = Tiers {
        primary: Arc::new(MockProvider::failing("primary", "503 upstream")),
        ..Tiers::echo()
    };
    let policy = tiers.policy(PolicyConfig::default()).await;

    let result = policy.generate(GenerationRequest::new("hello")).await.unwrap();
    assert_eq!(result.tier, Tier::Tertiary);
    assert_eq!(result.fallback_from, Some(Tier::Primary));
    assert_eq!(tiers.primary.calls(), 1);
    assert_eq!(tiers.tertiary.calls(), 1);
}

#[tokio::test]
async fn test_secondary_hint_falls_back_to_tertiary() {
    let tiers = Tiers {
        secondary: Arc::new(MockProvider::failing("secondary", "boom")),
        ..Tiers::echo()
    };
    let policy = tiers.policy(PolicyConfig::default()).await;

    let result = policy
        .generate(GenerationRequest::new("hello").with_tier(Tier::Secondary))
        .await
        .unwrap();
    assert_eq!(result.tier, Tier::Tertiary);
    assert_eq!(tiers.primary.calls(), 0);
}

#[tokio::test]
async fn test_tertiary_failure_is_surfaced() {
    let tiers = Tiers {
        primary: Arc::new(MockProvider::failing("primary", "down")),
        tertiary: Arc::new(MockProvider::failing("tertiary", "no model loaded")),
        ..Tiers::echo()
    };
    let policy = tiers.policy(PolicyConfig::default()).await;

    let err = policy
        .generate(GenerationRequest::new("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { ref provider, .. } if provider == "tertiary"));
}

#[tokio::test]
async fn test_unconfigured_primary_selects_tertiary() {
    let tiers = Tiers {
        primary: Arc::new(MockProvider::echo("primary").unconfigured()),
        ..Tiers::echo()
    };
    let policy = tiers.policy(PolicyConfig::default()).await;

    let result = policy.generate(GenerationRequest::new("hi")).await.unwrap();
    assert_eq!(result.tier, Tier::Tertiary);
    assert_eq!(tiers.primary.calls(), 0);
    assert_eq!(policy.quota().snapshot().await.used, 0);
}

#[tokio::test]
async fn test_missing_tier_is_treated_as_provider_error() {
    let tertiary = Arc::new(MockProvider::echo("tertiary"));
    let policy = ModelPolicy::builder(PolicyConfig::default())
        .provider(Tier::Tertiary, tertiary.clone())
        .build()
        .await
        .unwrap();

    assert!(!policy.has_tier(Tier::Secondary));
    let result = policy
        .generate(GenerationRequest::new("hi").with_tier(Tier::Secondary))
        .await
        .unwrap();
    assert_eq!(result.tier, Tier::Tertiary);
    assert_eq!(result.fallback_from, Some(Tier::Secondary));
}

#[tokio::test]
async fn test_no_providers_is_not_configured() {
    let policy = ModelPolicy::builder(PolicyConfig::default())
        .build()
        .await
        .unwrap();

    let err = policy.generate_text("hi", None, None).await.unwrap_err();
    assert!(matches!(err, Error::NotConfigured(_)));
}

#[tokio::test]
async fn test_successful_generations_reach_learning_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("learning.jsonl");
    let tiers = Tiers::echo();
    let policy = tiers
        .policy(PolicyConfig {
            learning_log_path: Some(log_path.clone()),
            ..Default::default()
        })
        .await;

    policy
        .generate_text("explain tokio", Some("tutor"), None)
        .await
        .unwrap();
    // Cache hits are not learning material
    policy
        .generate_text("explain tokio", Some("tutor"), None)
        .await
        .unwrap();
    policy.shutdown().await;

    let (examples, _) = crate::learning::read_examples(&log_path, 0).await.unwrap();
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0].prompt, "explain tokio");
    assert_eq!(examples[0].system_prompt.as_deref(), Some("tutor"));
    assert_eq!(examples[0].response, "primary: explain tokio");
    assert_eq!(examples[0].tier, Tier::Primary);
}

#[tokio::test]
async fn test_quota_survives_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let config = PolicyConfig {
        primary_daily_cap: 1,
        quota_state_path: Some(dir.path().join("quota.json")),
        ..Default::default()
    };

    let tiers = Tiers::echo();
    let policy = tiers.policy(config.clone()).await;
    assert_eq!(
        policy.generate(GenerationRequest::new("a")).await.unwrap().tier,
        Tier::Primary
    );
    drop(policy);

    let policy = tiers.policy(config).await;
    assert_eq!(
        policy.generate(GenerationRequest::new("b")).await.unwrap().tier,
        Tier::Tertiary
    );
}
