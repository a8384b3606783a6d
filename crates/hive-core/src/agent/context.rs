use super::handle::AgentHandle;
use super::types::AgentState;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::message::{AgentId, Message, MessageType, SwarmId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

/// What a handler can do on behalf of its agent.
#[derive(Clone)]
pub struct AgentContext {
    handle: AgentHandle,
    directory: Arc<Directory>,
    cancel: CancellationToken,
}

impl AgentContext {
    pub(crate) fn new(handle: AgentHandle, directory: Arc<Directory>, cancel: CancellationToken) -> Self {
        Self {
            handle,
            directory,
            cancel,
        }
    }

    /// This agent's id
    #[must_use]
    pub fn agent_id(&self) -> &AgentId {
        self.handle.id()
    }

    /// This agent's handle
    #[must_use]
    pub fn handle(&self) -> &AgentHandle {
        &self.handle
    }

    /// The shared directory
    #[must_use]
    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    fn ensure_active(&self) -> Result<()> {
        if self.handle.is_active() {
            Ok(())
        } else {
            Err(Error::AgentInactive(self.agent_id().to_string()))
        }
    }

    /// Send a direct message. Returns its id once it is in the recipient's mailbox.
    pub fn send_message(
        &self,
        recipient: &AgentId,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Result<Uuid> {
        self.ensure_active()?;
        let message = Message::direct(self.agent_id().clone(), recipient.clone(), message_type, payload);
        self.deliver(recipient, message)
    }

    /// Answer `message`, correlated to its id.
    pub fn reply(
        &self,
        message: &Message,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Result<Uuid> {
        self.ensure_active()?;
        let reply = message.reply(self.agent_id().clone(), message_type, payload);
        self.deliver(message.sender(), reply)
    }

    fn deliver(&self, recipient: &AgentId, message: Message) -> Result<Uuid> {
        let id = message.id();
        self.directory.lookup(recipient)?.receive(message)?;
        debug!(agent_id = %self.agent_id(), recipient = %recipient, message_id = %id, "Message sent");
        Ok(id)
    }

    /// Fire-and-forget broadcast; `false` when the swarm has no members.
    pub fn broadcast(
        &self,
        swarm: &SwarmId,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> Result<bool> {
        self.ensure_active()?;
        let message = Message::to_swarm(self.agent_id().clone(), swarm.clone(), message_type, payload);
        Ok(self.directory.broadcast_to_swarm(swarm, message))
    }

    /// Invoke a registered tool
    pub async fn use_tool(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        let tool = self.handle.shared().tool(name)?;
        tool.call(args).await
    }

    /// Join `swarm`, creating it if needed
    pub fn join_swarm(&self, swarm: &SwarmId) -> bool {
        self.directory.join_swarm(self.agent_id(), swarm)
    }

    /// Leave `swarm`
    pub fn leave_swarm(&self, swarm: &SwarmId) -> bool {
        self.directory.leave_swarm(self.agent_id(), swarm)
    }

    /// Put the agent in `Error`: it stops accepting input and its loops exit
    /// after the current item.
    pub fn fail(&self, reason: &str) {
        error!(agent_id = %self.agent_id(), reason, "Agent entered error state");
        let shared = self.handle.shared();
        shared.set_state(AgentState::Error);
        shared.set_active(false);
        self.directory.deregister_handle(&self.handle);
        self.cancel.cancel();
    }
}
