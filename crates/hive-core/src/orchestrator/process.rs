//! Task submission
//!
//! Drives one task through `created → planning → executing → completed`,
//! diverting to `failed` when planning or combining fails. The task is
//! persisted after every state change.

use crate::error::{Error, Result};
use crate::event_bus::OrchestratorEvent;
use crate::planning::{Plan, SubtaskResult};
use crate::task::{StepKind, SubtaskRecord, SubtaskStatus, Task, TaskStatus};
use tracing::{debug, info, instrument, warn};

use super::core::Orchestrator;

impl Orchestrator {
    /// Plan, dispatch and combine `prompt`. Returns the finished task, which
    /// may be `failed`; `Err` is reserved for persistence and state errors.
    pub async fn submit(&self, prompt: &str) -> Result<Task> {
        self.submit_with_hint(prompt, None).await
    }

    /// Like [`submit`](Self::submit) with caller-supplied planning notes,
    /// which replace model enrichment.
    #[instrument(skip(self, prompt, hint), fields(task_id))]
    pub async fn submit_with_hint(&self, prompt: &str, hint: Option<&str>) -> Result<Task> {
        let mut task = Task::new(prompt);
        tracing::Span::current().record("task_id", tracing::field::display(task.id));
        self.persist(&task).await?;
        self.emit(OrchestratorEvent::TaskCreated { task_id: task.id });
        info!(task_id = %task.id, "Task submitted");

        self.advance(&mut task, TaskStatus::Planning).await?;

        let enriched = match hint {
            Some(_) => None,
            None => self.enrich(&mut task).await,
        };
        let hint = hint.or(enriched.as_deref());

        let plan = match self.make_plan(prompt, hint).await {
            Ok(plan) => plan,
            Err(e) => return self.finish_failed(task, e.to_string()).await,
        };

        task.subtasks = plan
            .subtasks
            .iter()
            .cloned()
            .map(SubtaskRecord::pending)
            .collect();
        task.push_step(
            StepKind::Planned,
            None,
            format!("{} subtask(s) planned", plan.subtasks.len()),
        );
        self.assign(&mut task, &plan);
        self.persist(&task).await?;

        self.advance(&mut task, TaskStatus::Executing).await?;
        self.execute(&mut task).await;

        let results: Vec<SubtaskResult> = task
            .subtasks
            .iter()
            .filter(|s| s.status == SubtaskStatus::Completed)
            .filter_map(|s| {
                s.assigned_agent.clone().map(|agent_id| SubtaskResult {
                    subtask_id: s.spec.id.clone(),
                    agent_id,
                    output: s.output.clone().unwrap_or_default(),
                })
            })
            .collect();
        debug!(task_id = %task.id, completed = results.len(), "Combining subtask results");

        match self.combiner.combine(prompt, &results).await {
            Ok(answer) => {
                task.complete(answer)?;
                self.persist(&task).await?;
                self.emit(OrchestratorEvent::TaskStatusChanged {
                    task_id: task.id,
                    status: task.status,
                });
                self.emit(OrchestratorEvent::TaskCompleted { task_id: task.id });
                info!(
                    task_id = %task.id,
                    subtasks = task.subtasks.len(),
                    completed = results.len(),
                    "Task completed"
                );
                Ok(task)
            }
            Err(e) => self.finish_failed(task, e.to_string()).await,
        }
    }

    async fn advance(&self, task: &mut Task, next: TaskStatus) -> Result<()> {
        task.transition(next)?;
        self.persist(task).await?;
        self.emit(OrchestratorEvent::TaskStatusChanged {
            task_id: task.id,
            status: next,
        });
        Ok(())
    }

    async fn finish_failed(&self, mut task: Task, error: String) -> Result<Task> {
        task.fail(error.clone())?;
        self.persist(&task).await?;
        self.emit(OrchestratorEvent::TaskStatusChanged {
            task_id: task.id,
            status: task.status,
        });
        self.emit(OrchestratorEvent::TaskFailed {
            task_id: task.id,
            error: error.clone(),
        });
        warn!(task_id = %task.id, error = %error, "Task failed");
        Ok(task)
    }

    async fn make_plan(&self, prompt: &str, hint: Option<&str>) -> Result<Plan> {
        let plan = self.planner.plan(prompt, hint).await.map_err(|e| match e {
            Error::PlanningFailed(_) => e,
            other => Error::PlanningFailed(other.to_string()),
        })?;
        plan.validate()?;
        Ok(plan)
    }

    /// First-pass model output handed to the planner as notes.
    /// Failures are logged and planning continues without notes.
    async fn enrich(&self, task: &mut Task) -> Option<String> {
        if !self.config.enrich_planning {
            return None;
        }
        let policy = self.policy.as_ref()?;

        match policy
            .generate_text(&task.prompt, Some(&self.config.planning_system_prompt), None)
            .await
        {
            Ok(notes) => {
                task.push_step(
                    StepKind::Enriched,
                    None,
                    format!("planning notes ({} chars)", notes.len()),
                );
                Some(notes)
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Planning enrichment failed");
                task.push_step(
                    StepKind::Enriched,
                    None,
                    format!("enrichment skipped: {}", e),
                );
                None
            }
        }
    }
}
