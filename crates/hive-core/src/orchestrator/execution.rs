//! Subtask assignment and dispatch

use crate::directory::Directory;
use crate::event_bus::OrchestratorEvent;
use crate::message::AgentId;
use crate::planning::Plan;
use crate::task::{AgentTask, StepKind, SubtaskStatus, Task};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::core::Orchestrator;

/// Result of one dispatched subtask
struct SubtaskRun {
    subtask_id: String,
    agent_id: AgentId,
    result: std::result::Result<Option<String>, String>,
    duration_ms: u64,
}

impl Orchestrator {
    /// Bind each subtask to an agent by capability. Unmatched subtasks become
    /// `unassigned` and everything downstream of them `skipped`.
    pub(crate) fn assign(&self, task: &mut Task, plan: &Plan) {
        let mut unassigned = Vec::new();
        let mut pending: HashMap<AgentId, usize> = HashMap::new();

        for spec in &plan.subtasks {
            let capability = &spec.required_capability;
            match self.directory.resolve_capability_with(capability, &pending) {
                Some(handle) => {
                    let agent_id = handle.id().clone();
                    *pending.entry(agent_id.clone()).or_default() += 1;
                    if let Some(record) = task.subtask_mut(&spec.id) {
                        record.assigned_agent = Some(agent_id.clone());
                    }
                    task.agent_assignments
                        .insert(spec.id.clone(), agent_id.clone());
                    task.push_step(
                        StepKind::Assigned,
                        Some(&spec.id),
                        format!("assigned to {}", agent_id),
                    );
                    self.emit(OrchestratorEvent::SubtaskAssigned {
                        task_id: task.id,
                        subtask_id: spec.id.clone(),
                        agent_id,
                    });
                }
                None => {
                    let reason = format!("no active agent offers capability '{}'", capability);
                    if let Some(record) = task.subtask_mut(&spec.id) {
                        record.status = SubtaskStatus::Unassigned;
                        record.error = Some(reason.clone());
                    }
                    task.push_step(StepKind::Unassigned, Some(&spec.id), reason.clone());
                    self.emit(OrchestratorEvent::SubtaskSkipped {
                        task_id: task.id,
                        subtask_id: spec.id.clone(),
                        reason,
                    });
                    unassigned.push(spec.id.as_str());
                }
            }
        }

        for root in unassigned {
            for dependent in plan.transitive_dependents(root) {
                let reason = format!("depends on unassigned subtask '{}'", root);
                self.skip(task, dependent, reason);
            }
        }
    }

    /// Dispatch ready subtasks, at most `max_concurrent_subtasks` at a time,
    /// until every subtask is terminal. A failed progress save never abandons
    /// in-flight subtasks.
    pub(crate) async fn execute(&self, task: &mut Task) {
        let max_in_flight = self.config.max_concurrent_subtasks.max(1);
        let timeout = self.config.subtask_timeout();
        let mut running = FuturesUnordered::new();

        loop {
            let mut changed = self.skip_blocked(task);

            while running.len() < max_in_flight {
                let Some(index) = next_ready(task) else {
                    break;
                };
                changed = true;

                let parent_id = task.id;
                let record = &mut task.subtasks[index];
                record.status = SubtaskStatus::Running;
                let subtask_id = record.spec.id.clone();
                let Some(agent_id) = record.assigned_agent.clone() else {
                    record.status = SubtaskStatus::Failed;
                    record.error = Some("subtask has no assigned agent".to_string());
                    continue;
                };

                let mut agent_task = AgentTask::new(record.spec.description.clone())
                    .with_capability(record.spec.required_capability.clone())
                    .with_parent(parent_id);
                for dep in record.spec.depends_on.clone() {
                    let output = task
                        .subtask(&dep)
                        .and_then(|d| d.output.clone())
                        .unwrap_or_default();
                    agent_task = agent_task.with_context(dep, output);
                }

                task.push_step(
                    StepKind::Dispatched,
                    Some(&subtask_id),
                    format!("dispatched to {}", agent_id),
                );
                self.emit(OrchestratorEvent::SubtaskStarted {
                    task_id: task.id,
                    subtask_id: subtask_id.clone(),
                });
                debug!(task_id = %task.id, subtask_id = %subtask_id, agent_id = %agent_id, "Dispatching subtask");

                running.push(run_subtask(
                    self.directory.clone(),
                    subtask_id,
                    agent_id,
                    agent_task,
                    timeout,
                ));
            }

            if changed {
                self.persist_progress(task).await;
            }

            let Some(run) = running.next().await else {
                break;
            };
            self.apply_run(task, run);
            self.persist_progress(task).await;
        }

        let stranded: Vec<String> = task
            .subtasks
            .iter()
            .filter(|s| !s.status.is_terminal())
            .map(|s| s.spec.id.clone())
            .collect();
        for id in stranded {
            self.skip(task, &id, "never became ready".to_string());
        }

        info!(
            task_id = %task.id,
            completed = task.count_subtasks(SubtaskStatus::Completed),
            failed = task.count_subtasks(SubtaskStatus::Failed),
            skipped = task.count_subtasks(SubtaskStatus::Skipped),
            unassigned = task.count_subtasks(SubtaskStatus::Unassigned),
            "Subtask execution finished"
        );
    }

    fn apply_run(&self, task: &mut Task, run: SubtaskRun) {
        let task_id = task.id;
        let success = run.result.is_ok();
        let Some(record) = task.subtask_mut(&run.subtask_id) else {
            return;
        };
        record.duration_ms = Some(run.duration_ms);

        let (kind, detail) = match run.result {
            Ok(output) => {
                record.status = SubtaskStatus::Completed;
                record.output = output;
                (
                    StepKind::SubtaskCompleted,
                    format!("completed by {} in {}ms", run.agent_id, run.duration_ms),
                )
            }
            Err(error) => {
                warn!(
                    task_id = %task_id,
                    subtask_id = %run.subtask_id,
                    agent_id = %run.agent_id,
                    error = %error,
                    "Subtask failed"
                );
                record.status = SubtaskStatus::Failed;
                record.error = Some(error.clone());
                (StepKind::SubtaskFailed, error)
            }
        };

        task.push_step(kind, Some(&run.subtask_id), detail);
        self.emit(OrchestratorEvent::SubtaskFinished {
            task_id,
            subtask_id: run.subtask_id,
            success,
            duration_ms: run.duration_ms,
        });
    }

    /// Skip pending subtasks with a dependency that ended without completing,
    /// repeating until nothing changes.
    fn skip_blocked(&self, task: &mut Task) -> bool {
        let mut changed = false;
        loop {
            let blocked: Vec<(String, String)> = task
                .subtasks
                .iter()
                .filter(|s| s.status == SubtaskStatus::Pending)
                .filter_map(|s| {
                    s.spec.depends_on.iter().find_map(|dep| {
                        let status = task.subtask(dep)?.status;
                        (status.is_terminal() && status != SubtaskStatus::Completed)
                            .then(|| (s.spec.id.clone(), dep.clone()))
                    })
                })
                .collect();
            if blocked.is_empty() {
                return changed;
            }
            for (id, dep) in blocked {
                self.skip(task, &id, format!("dependency '{}' did not complete", dep));
            }
            changed = true;
        }
    }

    fn skip(&self, task: &mut Task, subtask_id: &str, reason: String) {
        let Some(record) = task.subtask_mut(subtask_id) else {
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        record.status = SubtaskStatus::Skipped;
        record.error = Some(reason.clone());
        task.push_step(StepKind::Skipped, Some(subtask_id), reason.clone());
        self.emit(OrchestratorEvent::SubtaskSkipped {
            task_id: task.id,
            subtask_id: subtask_id.to_string(),
            reason,
        });
    }
}

/// First pending subtask (plan order) whose dependencies all completed
fn next_ready(task: &Task) -> Option<usize> {
    task.subtasks.iter().position(|s| {
        s.status == SubtaskStatus::Pending
            && s.spec.depends_on.iter().all(|dep| {
                task.subtask(dep)
                    .is_some_and(|d| d.status == SubtaskStatus::Completed)
            })
    })
}

async fn run_subtask(
    directory: Arc<Directory>,
    subtask_id: String,
    agent_id: AgentId,
    agent_task: AgentTask,
    timeout: Option<Duration>,
) -> SubtaskRun {
    let start = Instant::now();
    let result = dispatch_and_wait(&directory, &agent_id, agent_task, timeout).await;
    SubtaskRun {
        subtask_id,
        agent_id,
        result,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn dispatch_and_wait(
    directory: &Directory,
    agent_id: &AgentId,
    agent_task: AgentTask,
    timeout: Option<Duration>,
) -> std::result::Result<Option<String>, String> {
    let receiver = directory
        .lookup(agent_id)
        .and_then(|handle| handle.dispatch(agent_task))
        .map_err(|e| e.to_string())?;

    let received = match timeout {
        Some(limit) => tokio::time::timeout(limit, receiver)
            .await
            .map_err(|_| format!("timed out after {}s", limit.as_secs()))?,
        None => receiver.await,
    };
    let outcome = received
        .map_err(|_| format!("agent {} stopped before completing the subtask", agent_id))?;

    if outcome.success {
        Ok(outcome.output)
    } else {
        Err(outcome
            .error
            .unwrap_or_else(|| "subtask failed".to_string()))
    }
}
