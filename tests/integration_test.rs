//! Integration tests for Hive
//!
//! These tests verify the integration between the crates:
//! - hive-llm: Tier selection, quota, cache and learning capture
//! - hive-core: Agent runtime, directory, orchestration and persistence

use hive_core::{
    handler_fn, AgentId, AgentRuntime, AgentSpec, Combiner, Directory, Error, GenerativeTaskHandler,
    JoinCombiner, Message, MessageType, NoopTaskHandler, Orchestrator, OrchestratorConfig, Plan,
    Planner, SingleStepPlanner, SqliteTaskStore, SubtaskSpec, SubtaskStatus, SwarmId, TaskStatus,
    TaskStore,
};
use hive_llm::{read_examples, MockProvider, ModelPolicy, PolicyConfig, Tier};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

async fn policy_with(
    config: PolicyConfig,
    primary: &Arc<MockProvider>,
    tertiary: &Arc<MockProvider>,
) -> Arc<ModelPolicy> {
    Arc::new(
        ModelPolicy::builder(config)
            .provider(Tier::Primary, primary.clone())
            .provider(Tier::Tertiary, tertiary.clone())
            .build()
            .await
            .unwrap(),
    )
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_factorial_request_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("hive.db");
    let log_path = dir.path().join("learning.jsonl");

    let primary = Arc::new(MockProvider::echo("primary"));
    let tertiary = Arc::new(MockProvider::echo("tertiary"));
    let policy = policy_with(
        PolicyConfig {
            learning_log_path: Some(log_path.clone()),
            ..PolicyConfig::default()
        },
        &primary,
        &tertiary,
    )
    .await;

    let store = Arc::new(SqliteTaskStore::new(&db_path).await.unwrap());
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(Directory::new()),
        Arc::new(SingleStepPlanner::new("coding")),
        Arc::new(JoinCombiner::default()),
    )
    .with_policy(policy.clone())
    .with_store(store);

    let handler = GenerativeTaskHandler::new(policy.clone()).with_system_prompt("You write Rust.");
    orchestrator
        .spawn_agent(AgentSpec::new("coder").with_capability("coding"), Arc::new(handler))
        .await
        .unwrap();

    let task = orchestrator.submit("build a factorial function").await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(
        task.result.as_deref(),
        Some("primary: build a factorial function")
    );
    assert_eq!(task.agent_assignments.get("main"), Some(&AgentId::new("coder")));
    assert_eq!(primary.calls(), 1);
    assert_eq!(tertiary.calls(), 0);

    policy.learning_log().flush().await;
    let (examples, _) = read_examples(&log_path, 0).await.unwrap();
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0].tier, Tier::Primary);
    assert_eq!(examples[0].system_prompt.as_deref(), Some("You write Rust."));

    orchestrator.cleanup().await;

    // The task survives a reopen of the database.
    let reopened = SqliteTaskStore::new(&db_path).await.unwrap();
    let stored = reopened.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.steps.len(), task.steps.len());
    let record = reopened
        .get_agent_record(&AgentId::new("coder"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.completed_tasks, 1);
}

/// Fixed research → code → deploy pipeline.
struct PipelinePlanner;

#[async_trait::async_trait]
impl Planner for PipelinePlanner {
    async fn plan(&self, prompt: &str, _hint: Option<&str>) -> hive_core::Result<Plan> {
        Ok(Plan::new(vec![
            SubtaskSpec::new("research", format!("research: {}", prompt), "research"),
            SubtaskSpec::new("code", format!("code: {}", prompt), "coding").depends_on(["research"]),
            SubtaskSpec::new("deploy", "deploy it", "deploy").depends_on(["code"]),
        ]))
    }
}

/// Counts results instead of joining them.
struct CountingCombiner;

#[async_trait::async_trait]
impl Combiner for CountingCombiner {
    async fn combine(
        &self,
        _prompt: &str,
        results: &[hive_core::SubtaskResult],
    ) -> hive_core::Result<String> {
        Ok(format!("{} result(s)", results.len()))
    }
}

#[tokio::test]
async fn test_pipeline_with_missing_capability() {
    let primary = Arc::new(MockProvider::echo("primary"));
    let tertiary = Arc::new(MockProvider::echo("tertiary"));
    let policy = policy_with(PolicyConfig::default(), &primary, &tertiary).await;

    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(Directory::new()),
        Arc::new(PipelinePlanner),
        Arc::new(CountingCombiner),
    );
    for (id, capability) in [("researcher", "research"), ("coder", "coding")] {
        let handler = GenerativeTaskHandler::new(policy.clone());
        orchestrator
            .spawn_agent(AgentSpec::new(id).with_capability(capability), Arc::new(handler))
            .await
            .unwrap();
    }

    let task = orchestrator.submit("a url shortener").await.unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result.as_deref(), Some("2 result(s)"));
    assert_eq!(task.subtask("deploy").unwrap().status, SubtaskStatus::Unassigned);

    // The coder saw the researcher's output.
    let code_prompt = primary
        .prompts()
        .into_iter()
        .find(|p| p.starts_with("code:"))
        .unwrap();
    assert!(code_prompt.contains("[research]\nprimary: research: a url shortener"));

    orchestrator.cleanup().await;
}

// ============================================================================
// Model selection
// ============================================================================

#[tokio::test]
async fn test_primary_quota_cap_downgrades_third_request() {
    let primary = Arc::new(MockProvider::echo("primary"));
    let tertiary = Arc::new(MockProvider::echo("tertiary"));
    let policy = policy_with(
        PolicyConfig {
            primary_daily_cap: 2,
            ..PolicyConfig::default()
        },
        &primary,
        &tertiary,
    )
    .await;

    let mut tiers = Vec::new();
    for prompt in ["one", "two", "three"] {
        let result = policy
            .generate(hive_llm::GenerationRequest::new(prompt))
            .await
            .unwrap();
        tiers.push(result.tier);
    }

    assert_eq!(tiers, vec![Tier::Primary, Tier::Primary, Tier::Tertiary]);
    assert_eq!(policy.quota().snapshot().await.used, 2);
}

#[tokio::test]
async fn test_repeated_prompt_served_from_cache() {
    let primary = Arc::new(MockProvider::echo("primary"));
    let tertiary = Arc::new(MockProvider::echo("tertiary"));
    let policy = policy_with(PolicyConfig::default(), &primary, &tertiary).await;

    let first = policy.generate_text("explain borrowing", None, None).await.unwrap();
    let second = policy.generate_text("explain borrowing", None, None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(primary.calls(), 1);
    assert_eq!(policy.quota().snapshot().await.used, 1);
}

// ============================================================================
// Messaging
// ============================================================================

#[tokio::test]
async fn test_messages_between_agents_arrive_in_order() {
    let directory = Arc::new(Directory::new());
    let sender = AgentRuntime::new(AgentSpec::new("sender"), directory.clone(), Arc::new(NoopTaskHandler));
    let receiver = AgentRuntime::new(AgentSpec::new("receiver"), directory.clone(), Arc::new(NoopTaskHandler));

    let (tx, mut rx) = mpsc::unbounded_channel();
    receiver.register_handler(
        MessageType::Event,
        handler_fn(move |_ctx, message: Message| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message.payload().clone());
                Ok::<_, Error>(())
            }
        }),
    );
    sender.start().await.unwrap();
    receiver.start().await.unwrap();

    for n in 0..10 {
        sender
            .context()
            .send_message(&AgentId::new("receiver"), MessageType::Event, json!(n))
            .unwrap();
    }

    for n in 0..10 {
        let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, json!(n));
    }

    receiver.stop().await.unwrap();
    let rejected = sender
        .context()
        .send_message(&AgentId::new("receiver"), MessageType::Event, json!("late"));
    assert!(rejected.is_err());

    sender.stop().await.unwrap();
}

#[tokio::test]
async fn test_broadcast_to_empty_swarm() {
    let directory = Arc::new(Directory::new());
    let agent = AgentRuntime::new(AgentSpec::new("lonely"), directory.clone(), Arc::new(NoopTaskHandler));
    agent.start().await.unwrap();

    let swarm = SwarmId::new("nobody-home");
    assert!(!agent.context().broadcast(&swarm, MessageType::Event, json!(null)).unwrap());

    agent.context().join_swarm(&swarm);
    agent.context().leave_swarm(&swarm);
    assert!(!agent.context().broadcast(&swarm, MessageType::Event, json!(null)).unwrap());
    assert_eq!(directory.swarm_members(&swarm), Some(vec![]));

    agent.stop().await.unwrap();
}
