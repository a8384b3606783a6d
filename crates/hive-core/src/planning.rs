//! Planner and Combiner collaborators
//!
//! The orchestrator does not decide how a prompt is broken down or how
//! subtask outputs are merged; it asks a [`Planner`] and a [`Combiner`].
//! [`SingleStepPlanner`] and [`JoinCombiner`] are minimal stand-ins that
//! carry no planning semantics of their own.

use crate::error::{Error, Result};
use crate::message::AgentId;
use crate::task::SubtaskSpec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// An ordered subtask graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Subtasks in plan order
    pub subtasks: Vec<SubtaskSpec>,
}

impl Plan {
    /// Create a plan
    #[must_use]
    pub fn new(subtasks: Vec<SubtaskSpec>) -> Self {
        Self { subtasks }
    }

    /// Reject empty or duplicate ids, unknown dependencies and cycles.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for subtask in &self.subtasks {
            if subtask.id.trim().is_empty() {
                return Err(Error::PlanningFailed("subtask with empty id".to_string()));
            }
            if !ids.insert(subtask.id.as_str()) {
                return Err(Error::PlanningFailed(format!(
                    "duplicate subtask id '{}'",
                    subtask.id
                )));
            }
        }

        for subtask in &self.subtasks {
            for dep in &subtask.depends_on {
                if !ids.contains(dep.as_str()) {
                    return Err(Error::PlanningFailed(format!(
                        "subtask '{}' depends on unknown subtask '{}'",
                        subtask.id, dep
                    )));
                }
            }
        }

        // Kahn: anything left unvisited sits on a cycle
        let mut indegree: HashMap<&str, usize> = self
            .subtasks
            .iter()
            .map(|s| (s.id.as_str(), s.depends_on.len()))
            .collect();
        let mut ready: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0;
        while let Some(id) = ready.pop_front() {
            visited += 1;
            for dependent in self.direct_dependents(id) {
                if let Some(d) = indegree.get_mut(dependent) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }
        if visited != self.subtasks.len() {
            return Err(Error::PlanningFailed("dependency cycle in plan".to_string()));
        }

        Ok(())
    }

    /// Every subtask that depends on `id`, directly or transitively, in plan order.
    #[must_use]
    pub fn transitive_dependents<'a>(&'a self, id: &'a str) -> Vec<&'a str> {
        let mut found: HashSet<&str> = HashSet::new();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            for dependent in self.direct_dependents(current) {
                if found.insert(dependent) {
                    frontier.push(dependent);
                }
            }
        }
        self.subtasks
            .iter()
            .map(|s| s.id.as_str())
            .filter(|s| found.contains(s))
            .collect()
    }

    /// Subtasks listing `id` in `depends_on`, counted once per edge.
    fn direct_dependents<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.subtasks.iter().flat_map(move |s| {
            s.depends_on
                .iter()
                .filter(move |d| d.as_str() == id)
                .map(move |_| s.id.as_str())
        })
    }
}

/// Output of one completed subtask, handed to the combiner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskResult {
    /// Subtask id
    pub subtask_id: String,
    /// Agent that produced it
    pub agent_id: AgentId,
    /// Output text (empty when the handler produced none)
    pub output: String,
}

/// Breaks a prompt into a subtask plan
#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    /// Produce a plan; `hint` carries optional first-pass model output.
    async fn plan(&self, prompt: &str, hint: Option<&str>) -> Result<Plan>;
}

/// Turns completed subtask outputs into the final answer
#[async_trait::async_trait]
pub trait Combiner: Send + Sync {
    /// Combine `results` (plan order) for `prompt`
    async fn combine(&self, prompt: &str, results: &[SubtaskResult]) -> Result<String>;
}

/// Plans every prompt as one subtask for a fixed capability.
#[derive(Debug, Clone)]
pub struct SingleStepPlanner {
    capability: String,
}

impl SingleStepPlanner {
    /// Route every prompt to `capability`
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }
}

#[async_trait::async_trait]
impl Planner for SingleStepPlanner {
    async fn plan(&self, prompt: &str, hint: Option<&str>) -> Result<Plan> {
        let description = match hint {
            Some(hint) if !hint.trim().is_empty() => format!("{}\n\nNotes:\n{}", prompt, hint),
            _ => prompt.to_string(),
        };
        Ok(Plan::new(vec![SubtaskSpec::new(
            "main",
            description,
            self.capability.clone(),
        )]))
    }
}

/// Joins subtask outputs in plan order.
#[derive(Debug, Clone)]
pub struct JoinCombiner {
    separator: String,
}

impl JoinCombiner {
    /// Join with a custom separator
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for JoinCombiner {
    fn default() -> Self {
        Self::new("\n\n")
    }
}

#[async_trait::async_trait]
impl Combiner for JoinCombiner {
    async fn combine(&self, _prompt: &str, results: &[SubtaskResult]) -> Result<String> {
        if results.is_empty() {
            return Err(Error::CombineFailed(
                "no subtask produced a result".to_string(),
            ));
        }
        Ok(results
            .iter()
            .map(|r| r.output.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator))
    }
}
