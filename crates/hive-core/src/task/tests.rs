use super::*;

#[test]
fn test_new_task_is_created() {
    let task = Task::new("build a factorial function");

    assert_eq!(task.status, TaskStatus::Created);
    assert_eq!(task.steps.len(), 1);
    assert_eq!(task.steps[0].kind, StepKind::Created);
    assert!(task.result.is_none());
}

#[test]
fn test_forward_transitions() {
    let mut task = Task::new("p");
    task.transition(TaskStatus::Planning).unwrap();
    task.transition(TaskStatus::Executing).unwrap();
    task.complete("done").unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.result.as_deref(), Some("done"));
}

#[test]
fn test_backward_transition_rejected() {
    let mut task = Task::new("p");
    task.transition(TaskStatus::Planning).unwrap();
    task.transition(TaskStatus::Executing).unwrap();

    let err = task.transition(TaskStatus::Planning).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(task.status, TaskStatus::Executing);
}

#[test]
fn test_cannot_skip_planning() {
    let mut task = Task::new("p");
    assert!(task.transition(TaskStatus::Executing).is_err());
    assert!(task.complete("x").is_err());
    assert!(task.result.is_none());
}

#[test]
fn test_fail_from_any_open_state() {
    for steps in 0..3 {
        let mut task = Task::new("p");
        let path = [TaskStatus::Planning, TaskStatus::Executing];
        for status in path.iter().take(steps) {
            task.transition(*status).unwrap();
        }
        task.fail("boom").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("boom"));
    }
}

#[test]
fn test_terminal_is_final() {
    let mut task = Task::new("p");
    task.fail("first").unwrap();

    assert!(task.fail("second").is_err());
    assert_eq!(task.error.as_deref(), Some("first"));
    assert!(TaskStatus::Failed.is_terminal());
    assert!(!TaskStatus::Executing.is_terminal());
}

#[test]
fn test_subtask_status_terminality() {
    assert!(!SubtaskStatus::Pending.is_terminal());
    assert!(!SubtaskStatus::Running.is_terminal());
    assert!(SubtaskStatus::Skipped.is_terminal());
    assert!(SubtaskStatus::Unassigned.is_terminal());
}

#[test]
fn test_agent_task_validation() {
    assert!(AgentTask::new("write code").validate().is_ok());
    assert!(matches!(
        AgentTask::new("  ").validate(),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_task_serialization() {
    let mut task = Task::new("p");
    task.subtasks.push(SubtaskRecord::pending(
        SubtaskSpec::new("code", "write it", "coding").depends_on(["design"]),
    ));
    task.agent_assignments
        .insert("code".to_string(), AgentId::new("coder"));

    let json = serde_json::to_string(&task).unwrap();
    assert!(json.contains("\"status\":\"created\""));
    assert!(json.contains("\"depends_on\":[\"design\"]"));

    let back: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(back, task);
}

#[test]
fn test_display_names_match_serialized_tags() {
    let statuses = [
        SubtaskStatus::Pending,
        SubtaskStatus::Unassigned,
        SubtaskStatus::Skipped,
        SubtaskStatus::Running,
        SubtaskStatus::Completed,
        SubtaskStatus::Failed,
    ];
    for status in statuses {
        assert_eq!(serde_json::to_value(status).unwrap(), status.to_string());
    }

    let kinds = [
        StepKind::Created,
        StepKind::Transition,
        StepKind::Enriched,
        StepKind::Planned,
        StepKind::Assigned,
        StepKind::Unassigned,
        StepKind::Skipped,
        StepKind::Dispatched,
        StepKind::SubtaskCompleted,
        StepKind::SubtaskFailed,
        StepKind::Combined,
        StepKind::Failed,
    ];
    for kind in kinds {
        assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
    }

    assert_eq!(format!("{:<10}|", SubtaskStatus::Running), "running   |");
}
