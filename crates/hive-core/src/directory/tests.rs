use super::*;
use crate::agent::{AgentSpec, QueueReceivers};
use crate::message::MessageType;
use crate::task::AgentTask;
use serde_json::json;

/// A registered, active agent whose queues nobody drains. Hold the
/// receivers for as long as enqueues should succeed.
fn agent(directory: &Directory, id: &str, capabilities: &[&str]) -> (AgentHandle, QueueReceivers) {
    let spec = capabilities
        .iter()
        .fold(AgentSpec::new(id), |spec, cap| spec.with_capability(*cap));
    let (shared, receivers) = AgentShared::new(&spec);
    shared.set_active(true);
    let handle = AgentHandle::from_shared(shared);
    directory.register(&handle);
    (handle, receivers)
}

#[test]
fn test_register_and_lookup() {
    let directory = Directory::new();
    let (_a, _qa) = agent(&directory, "a", &["coding"]);

    assert_eq!(directory.lookup(&AgentId::new("a")).unwrap().id().as_str(), "a");
    assert!(matches!(
        directory.lookup(&AgentId::new("missing")),
        Err(Error::AgentNotFound(_))
    ));
    assert_eq!(directory.len(), 1);
}

#[test]
fn test_dropped_agent_is_pruned() {
    let directory = Directory::new();
    let (handle, _queues) = agent(&directory, "gone", &[]);
    drop(handle);

    assert_eq!(directory.len(), 1);
    assert!(directory.lookup(&AgentId::new("gone")).is_err());
    assert!(directory.is_empty());
    assert!(directory.list_agents().is_empty());
}

#[test]
fn test_deregister_removes_swarm_memberships() {
    let directory = Directory::new();
    let (_a, _qa) = agent(&directory, "a", &[]);
    let (_b, _qb) = agent(&directory, "b", &[]);
    let swarm = SwarmId::new("builders");

    assert!(directory.join_swarm(&AgentId::new("a"), &swarm));
    assert!(!directory.join_swarm(&AgentId::new("a"), &swarm));
    assert!(directory.join_swarm(&AgentId::new("b"), &swarm));

    assert!(directory.deregister(&AgentId::new("a")));
    assert!(!directory.deregister(&AgentId::new("a")));
    assert_eq!(directory.swarm_members(&swarm), Some(vec![AgentId::new("b")]));
}

#[test]
fn test_empty_swarm_is_kept_and_broadcast_returns_false() {
    let directory = Directory::new();
    let (a, _qa) = agent(&directory, "a", &[]);
    let swarm = SwarmId::new("solo");

    directory.join_swarm(a.id(), &swarm);
    assert!(directory.leave_swarm(a.id(), &swarm));
    assert!(!directory.leave_swarm(a.id(), &swarm));

    assert_eq!(directory.swarm_members(&swarm), Some(vec![]));
    assert_eq!(directory.list_swarms(), vec![swarm.clone()]);

    let message = Message::to_swarm("a", swarm.clone(), MessageType::Event, json!(null));
    assert!(!directory.broadcast_to_swarm(&swarm, message.clone()));
    assert!(!directory.broadcast_to_swarm(&SwarmId::new("unknown"), message));
    assert_eq!(a.status().pending_messages, 0);
}

#[test]
fn test_broadcast_reaches_every_member() {
    let directory = Directory::new();
    let (a, _qa) = agent(&directory, "a", &[]);
    let (b, _qb) = agent(&directory, "b", &[]);
    let swarm = SwarmId::new("all");
    directory.join_swarm(a.id(), &swarm);
    directory.join_swarm(b.id(), &swarm);

    let message = Message::to_swarm("a", swarm.clone(), MessageType::Event, json!({"hi": 1}));
    assert!(directory.broadcast_to_swarm(&swarm, message));

    assert_eq!(a.status().pending_messages, 1);
    assert_eq!(b.status().pending_messages, 1);
}

#[test]
fn test_resolve_capability_prefers_least_loaded() {
    let directory = Directory::new();
    let (a, _qa) = agent(&directory, "a", &["coding"]);
    let (b, _qb) = agent(&directory, "b", &["coding"]);
    let (_c, _qc) = agent(&directory, "c", &["review"]);

    // Tie on load: lowest id wins.
    assert_eq!(directory.resolve_capability("coding").unwrap().id(), a.id());

    a.submit_task(AgentTask::new("busy")).unwrap();
    assert_eq!(directory.resolve_capability("coding").unwrap().id(), b.id());

    assert!(directory.resolve_capability("deploy").is_none());
}

#[test]
fn test_resolve_capability_skips_inactive() {
    let directory = Directory::new();
    let (a, _qa) = agent(&directory, "a", &["coding"]);
    a.shared().set_active(false);

    assert!(directory.resolve_capability("coding").is_none());
}

#[test]
fn test_clear() {
    let directory = Directory::new();
    let (a, _qa) = agent(&directory, "a", &[]);
    directory.join_swarm(a.id(), &SwarmId::new("s"));

    directory.clear();
    assert!(directory.is_empty());
    assert!(directory.list_swarms().is_empty());
}

#[test]
fn test_deregister_handle_ignores_replaced_entry() {
    let directory = Directory::new();
    let (old, _qo) = agent(&directory, "x", &[]);
    let (new, _qn) = agent(&directory, "x", &[]);
    let swarm = SwarmId::new("s");
    directory.join_swarm(new.id(), &swarm);

    assert!(!directory.deregister_handle(&old));
    assert!(directory.lookup(&AgentId::new("x")).is_ok());
    assert_eq!(directory.swarm_members(&swarm), Some(vec![AgentId::new("x")]));

    assert!(directory.deregister_handle(&new));
    assert!(directory.lookup(&AgentId::new("x")).is_err());
    assert_eq!(directory.swarm_members(&swarm), Some(vec![]));
}

#[test]
fn test_resolve_capability_counts_pending_work() {
    let directory = Directory::new();
    let (_a, _qa) = agent(&directory, "a", &["coding"]);
    let (_b, _qb) = agent(&directory, "b", &["coding"]);

    let mut pending = HashMap::new();
    pending.insert(AgentId::new("a"), 1);
    let picked = directory.resolve_capability_with("coding", &pending).unwrap();
    assert_eq!(picked.id().as_str(), "b");

    pending.insert(AgentId::new("b"), 2);
    let picked = directory.resolve_capability_with("coding", &pending).unwrap();
    assert_eq!(picked.id().as_str(), "a");
}
