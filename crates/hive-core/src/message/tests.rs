use super::*;
use serde_json::json;

#[test]
fn test_direct_message_has_single_target() {
    let msg = Message::direct("a", "b", MessageType::Request, json!({"n": 1}));

    assert_eq!(msg.sender().as_str(), "a");
    assert_eq!(msg.recipient().map(AgentId::as_str), Some("b"));
    assert!(msg.swarm().is_none());
    assert!(msg.validate().is_ok());
}

#[test]
fn test_swarm_message_has_no_recipient() {
    let msg = Message::to_swarm("a", "builders", MessageType::Event, json!(null));

    assert!(msg.recipient().is_none());
    assert_eq!(msg.swarm().map(SwarmId::as_str), Some("builders"));
}

#[test]
fn test_reply_is_correlated() {
    let request = Message::direct("a", "b", MessageType::Request, json!("ping"));
    let reply = request.reply("b", MessageType::Response, json!("pong"));

    assert_eq!(reply.recipient().map(AgentId::as_str), Some("a"));
    assert_eq!(reply.correlation_id(), Some(request.id()));
    assert_ne!(reply.id(), request.id());
}

#[test]
fn test_validation_rejects_empty_ids() {
    let no_sender = Message::direct("", "b", MessageType::Request, json!(null));
    assert!(matches!(no_sender.validate(), Err(Error::Validation(_))));

    let no_target = Message::direct("a", " ", MessageType::Request, json!(null));
    assert!(matches!(no_target.validate(), Err(Error::Validation(_))));

    let no_type = Message::direct("a", "b", MessageType::Custom(String::new()), json!(null));
    assert!(matches!(no_type.validate(), Err(Error::Validation(_))));
}

#[test]
fn test_message_type_wire_names() {
    assert_eq!(
        serde_json::to_string(&MessageType::Shutdown).unwrap(),
        "\"shutdown\""
    );
    assert_eq!(
        serde_json::to_string(&MessageType::Custom("render".into())).unwrap(),
        "\"render\""
    );

    let parsed: MessageType = serde_json::from_str("\"status\"").unwrap();
    assert_eq!(parsed, MessageType::Status);
    let custom: MessageType = serde_json::from_str("\"print_job\"").unwrap();
    assert_eq!(custom, MessageType::Custom("print_job".into()));
}

#[test]
fn test_message_serialization() {
    let msg = Message::to_swarm("a", "s1", MessageType::Event, json!({"k": "v"}));
    let raw = serde_json::to_value(&msg).unwrap();

    assert_eq!(raw["target"], json!({"kind": "swarm", "id": "s1"}));
    assert_eq!(raw["message_type"], json!("event"));
    assert!(raw.get("correlation_id").is_none());

    let back: Message = serde_json::from_value(raw).unwrap();
    assert_eq!(back, msg);
}
