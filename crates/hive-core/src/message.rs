//! Inter-agent messages
//!
//! A [`Message`] has exactly one sender and exactly one target: a single
//! recipient or a swarm. Messages are immutable once built and are routed by
//! their [`MessageType`].

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Agent identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Wrap an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as `&str`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Swarm identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwarmId(String);

impl SwarmId {
    /// Wrap an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as `&str`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SwarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SwarmId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SwarmId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Message kind used to pick a handler.
///
/// Serialized as a snake_case string; unknown strings become `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MessageType {
    /// Ask the recipient to do something
    Request,
    /// Answer to a request
    Response,
    /// Notification, no reply expected
    Event,
    /// Progress or health report
    Status,
    /// Ask the recipient to wind down
    Shutdown,
    /// Application-defined kind
    Custom(String),
}

impl MessageType {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Event => "event",
            Self::Status => "status",
            Self::Shutdown => "shutdown",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MessageType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "request" => Self::Request,
            "response" => Self::Response,
            "event" => Self::Event,
            "status" => Self::Status,
            "shutdown" => Self::Shutdown,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<MessageType> for String {
    fn from(t: MessageType) -> Self {
        match t {
            MessageType::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// Where a message is delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MessageTarget {
    /// A single agent's mailbox
    Recipient(AgentId),
    /// Every member of a swarm
    Swarm(SwarmId),
}

/// An immutable message between agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    sender: AgentId,
    target: MessageTarget,
    message_type: MessageType,
    payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn build(
        sender: AgentId,
        target: MessageTarget,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            target,
            message_type,
            payload,
            correlation_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Message for a single recipient
    pub fn direct(
        sender: impl Into<AgentId>,
        recipient: impl Into<AgentId>,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(
            sender.into(),
            MessageTarget::Recipient(recipient.into()),
            message_type,
            payload,
        )
    }

    /// Message for every member of a swarm
    pub fn to_swarm(
        sender: impl Into<AgentId>,
        swarm: impl Into<SwarmId>,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(
            sender.into(),
            MessageTarget::Swarm(swarm.into()),
            message_type,
            payload,
        )
    }

    /// Reply from `sender` back to this message's sender, correlated to this message.
    pub fn reply(
        &self,
        sender: impl Into<AgentId>,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Self {
        Self::direct(sender, self.sender.clone(), message_type, payload).with_correlation(self.id)
    }

    /// Mark this message as answering `id`
    #[must_use]
    pub fn with_correlation(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Message id
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sending agent
    #[must_use]
    pub fn sender(&self) -> &AgentId {
        &self.sender
    }

    /// Delivery target
    #[must_use]
    pub fn target(&self) -> &MessageTarget {
        &self.target
    }

    /// Recipient, for direct messages
    #[must_use]
    pub fn recipient(&self) -> Option<&AgentId> {
        match &self.target {
            MessageTarget::Recipient(id) => Some(id),
            MessageTarget::Swarm(_) => None,
        }
    }

    /// Swarm, for broadcasts
    #[must_use]
    pub fn swarm(&self) -> Option<&SwarmId> {
        match &self.target {
            MessageTarget::Swarm(id) => Some(id),
            MessageTarget::Recipient(_) => None,
        }
    }

    /// Handler routing key
    #[must_use]
    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    /// Message body
    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Message this one answers
    #[must_use]
    pub fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    /// Creation time
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Check the structural invariants a mailbox relies on.
    pub fn validate(&self) -> Result<()> {
        if self.sender.as_str().trim().is_empty() {
            return Err(Error::Validation(format!("message {} has no sender", self.id)));
        }
        let target_empty = match &self.target {
            MessageTarget::Recipient(id) => id.as_str().trim().is_empty(),
            MessageTarget::Swarm(id) => id.as_str().trim().is_empty(),
        };
        if target_empty {
            return Err(Error::Validation(format!("message {} has no target", self.id)));
        }
        if let MessageType::Custom(name) = &self.message_type {
            if name.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "message {} has an empty type",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
