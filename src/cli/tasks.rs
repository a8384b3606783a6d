//! CLI command: `hive tasks`
//!
//! `hive tasks list`: recent tasks, newest first
//! `hive tasks show <id>`: one task with its subtasks and steps

use super::TasksCommands;
use crate::runtime::{load_config, open_config_store};
use anyhow::{Context, Result};
use hive_core::Task;
use uuid::Uuid;

/// Run a tasks subcommand.
pub async fn run(cmd: TasksCommands) -> Result<()> {
    let config = load_config()?;
    let store = open_config_store(&config).await?;

    match cmd {
        TasksCommands::List { limit } => {
            let tasks = store.list_tasks().await?;
            print_list(&tasks, limit);
        }
        TasksCommands::Show { id } => {
            let id = Uuid::parse_str(&id).with_context(|| format!("Invalid task id '{}'", id))?;
            match store.get_task(id).await? {
                Some(task) => print_detail(&task),
                None => anyhow::bail!("task {} not found", id),
            }
        }
    }
    Ok(())
}

fn print_list(tasks: &[Task], limit: usize) {
    println!();
    println!("  {:<36}  {:<10}  {:<19}  Prompt", "Id", "Status", "Created");
    println!("  {}", "-".repeat(96));
    if tasks.is_empty() {
        println!("  (no tasks yet)");
    }
    for task in tasks.iter().take(limit) {
        println!(
            "  {:<36}  {:<10}  {:<19}  {}",
            task.id,
            task.status.to_string(),
            task.created_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(&task.prompt, 40)
        );
    }
    println!();
}

fn print_detail(task: &Task) {
    println!();
    println!("  Task:    {}", task.id);
    println!("  Status:  {}", task.status);
    println!("  Prompt:  {}", task.prompt);
    println!("  Created: {}", task.created_at.to_rfc3339());
    println!("  Updated: {}", task.updated_at.to_rfc3339());

    if !task.subtasks.is_empty() {
        println!();
        println!("  Subtasks");
        for subtask in &task.subtasks {
            let agent = subtask
                .assigned_agent
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string());
            let duration = subtask
                .duration_ms
                .map(|ms| format!("{}ms", ms))
                .unwrap_or_default();
            println!(
                "    {:<16} {:<12} {:<16} {}",
                subtask.spec.id,
                subtask.status.as_str(),
                agent,
                duration
            );
        }
    }

    println!();
    println!("  Steps");
    for step in &task.steps {
        let subtask = step.subtask_id.as_deref().unwrap_or("");
        println!(
            "    {}  {:<18} {:<12} {}",
            step.timestamp.format("%H:%M:%S%.3f"),
            step.kind.as_str(),
            subtask,
            step.detail
        );
    }

    println!();
    if let Some(result) = &task.result {
        println!("{}", result);
    }
    if let Some(error) = &task.error {
        println!("  Error: {}", error);
    }
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
