//! Agent Directory
//!
//! Process-wide registry mapping agent ids to live agents and tracking swarm
//! membership. The directory never owns an agent: it stores weak references
//! and treats an agent that has been dropped as absent.
//!
//! All state sits behind one `RwLock`. Broadcast snapshots the member
//! handles under the lock and delivers after releasing it.

use crate::agent::{AgentHandle, AgentShared};
use crate::error::{Error, Result};
use crate::message::{AgentId, Message, SwarmId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, Weak};
use tracing::{debug, info, warn};

#[derive(Default)]
struct DirectoryState {
    agents: HashMap<AgentId, Weak<AgentShared>>,
    swarms: BTreeMap<SwarmId, BTreeSet<AgentId>>,
}

impl DirectoryState {
    fn live(&self, id: &AgentId) -> Option<AgentHandle> {
        self.agents
            .get(id)
            .and_then(Weak::upgrade)
            .map(AgentHandle::from_shared)
    }
}

/// Registry of live agents and swarms
#[derive(Default)]
pub struct Directory {
    state: RwLock<DirectoryState>,
}

impl Directory {
    /// Empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an agent
    pub fn register(&self, handle: &AgentHandle) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.live(handle.id()).is_some() {
            warn!(agent_id = %handle.id(), "Replacing registered agent with the same id");
        }
        state.agents.insert(handle.id().clone(), handle.downgrade());
        debug!(agent_id = %handle.id(), "Agent registered");
    }

    /// Remove an agent and its swarm memberships. Unknown ids are a no-op.
    pub fn deregister(&self, id: &AgentId) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let removed = state.agents.remove(id).is_some();
        for members in state.swarms.values_mut() {
            members.remove(id);
        }
        if removed {
            debug!(agent_id = %id, "Agent deregistered");
        }
        removed
    }

    /// Remove `handle` only if it is still the entry registered under its id.
    ///
    /// A replacement registered under the same id keeps its entry and its
    /// swarm memberships.
    pub fn deregister_handle(&self, handle: &AgentHandle) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let id = handle.id();
        let owned = state
            .agents
            .get(id)
            .is_some_and(|weak| Weak::ptr_eq(weak, &handle.downgrade()));
        if !owned {
            debug!(agent_id = %id, "Directory entry belongs to another agent, left in place");
            return false;
        }
        state.agents.remove(id);
        for members in state.swarms.values_mut() {
            members.remove(id);
        }
        debug!(agent_id = %id, "Agent deregistered");
        true
    }

    /// Find a live agent. A dropped agent is pruned and reported as not found.
    pub fn lookup(&self, id: &AgentId) -> Result<AgentHandle> {
        let stale = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            match state.agents.get(id) {
                None => false,
                Some(weak) => match weak.upgrade() {
                    Some(shared) => return Ok(AgentHandle::from_shared(shared)),
                    None => true,
                },
            }
        };

        if stale {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            let still_dead = state
                .agents
                .get(id)
                .is_some_and(|weak| weak.strong_count() == 0);
            if still_dead {
                state.agents.remove(id);
                debug!(agent_id = %id, "Pruned dropped agent");
            }
        }
        Err(Error::AgentNotFound(id.to_string()))
    }

    /// Every live agent, sorted by id
    #[must_use]
    pub fn list_agents(&self) -> Vec<AgentHandle> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let mut agents: Vec<AgentHandle> = state
            .agents
            .values()
            .filter_map(Weak::upgrade)
            .map(AgentHandle::from_shared)
            .collect();
        agents.sort_by(|a, b| a.id().cmp(b.id()));
        agents
    }

    /// Number of registered entries (live or not yet pruned)
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .agents
            .len()
    }

    /// No agents registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Swarms
    // ========================================================================

    /// Add `agent` to `swarm`, creating the swarm if needed.
    /// Returns `false` if it was already a member.
    pub fn join_swarm(&self, agent: &AgentId, swarm: &SwarmId) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let joined = state
            .swarms
            .entry(swarm.clone())
            .or_default()
            .insert(agent.clone());
        if joined {
            debug!(agent_id = %agent, swarm = %swarm, "Joined swarm");
        }
        joined
    }

    /// Remove `agent` from `swarm`. The swarm record is kept even when empty.
    pub fn leave_swarm(&self, agent: &AgentId, swarm: &SwarmId) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let left = state
            .swarms
            .get_mut(swarm)
            .is_some_and(|members| members.remove(agent));
        if left {
            debug!(agent_id = %agent, swarm = %swarm, "Left swarm");
        }
        left
    }

    /// Member ids, or `None` for a swarm that never existed
    #[must_use]
    pub fn swarm_members(&self, swarm: &SwarmId) -> Option<Vec<AgentId>> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .swarms
            .get(swarm)
            .map(|members| members.iter().cloned().collect())
    }

    /// Known swarms, sorted
    #[must_use]
    pub fn list_swarms(&self) -> Vec<SwarmId> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .swarms
            .keys()
            .cloned()
            .collect()
    }

    /// Deliver `message` to every member's mailbox.
    ///
    /// Returns `false` without delivering when the swarm has no members.
    /// Per-member failures are logged.
    pub fn broadcast_to_swarm(&self, swarm: &SwarmId, message: Message) -> bool {
        let (members, recipients) = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            let Some(members) = state.swarms.get(swarm).filter(|m| !m.is_empty()) else {
                return false;
            };
            let recipients: Vec<(AgentId, Option<AgentHandle>)> = members
                .iter()
                .map(|id| (id.clone(), state.live(id)))
                .collect();
            (members.len(), recipients)
        };

        let mut delivered = 0;
        for (id, handle) in recipients {
            let result = match handle {
                Some(handle) => handle.receive(message.clone()),
                None => Err(Error::AgentNotFound(id.to_string())),
            };
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!(swarm = %swarm, agent_id = %id, error = %e, "Broadcast delivery failed"),
            }
        }

        debug!(swarm = %swarm, members, delivered, message_id = %message.id(), "Broadcast sent");
        true
    }

    // ========================================================================
    // Capability resolution
    // ========================================================================

    /// Pick an active agent offering `capability`: fewest queued tasks first,
    /// then lowest id.
    #[must_use]
    pub fn resolve_capability(&self, capability: &str) -> Option<AgentHandle> {
        self.resolve_capability_with(capability, &HashMap::new())
    }

    /// Like [`resolve_capability`](Self::resolve_capability), counting
    /// `pending` work not yet enqueued on top of each agent's queue depth.
    #[must_use]
    pub fn resolve_capability_with(
        &self,
        capability: &str,
        pending: &HashMap<AgentId, usize>,
    ) -> Option<AgentHandle> {
        let load = |handle: &AgentHandle| {
            handle.queued_tasks() + pending.get(handle.id()).copied().unwrap_or(0)
        };
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .agents
            .values()
            .filter_map(Weak::upgrade)
            .map(AgentHandle::from_shared)
            .filter(|h| h.is_active() && h.has_capability(capability))
            .min_by(|a, b| load(a).cmp(&load(b)).then_with(|| a.id().cmp(b.id())))
    }

    /// Drop every agent and swarm
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let agents = state.agents.len();
        let swarms = state.swarms.len();
        state.agents.clear();
        state.swarms.clear();
        info!(agents, swarms, "Directory cleared");
    }
}

#[cfg(test)]
mod tests;
