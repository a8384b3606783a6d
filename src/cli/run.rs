//! CLI command: `hive run`

use crate::runtime::{load_config, Hive};
use anyhow::{Context, Result};
use hive_core::{format_error_for_cli, SubtaskStatus, Task, TaskStatus};

/// Submit `prompt` and print the outcome.
pub async fn run(prompt: &str, capability: Option<String>, hint: Option<String>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(capability) = capability {
        config.planner.capability = capability;
    }

    let hive = Hive::start(config).await.context("Failed to start Hive")?;
    let submitted = hive
        .orchestrator
        .submit_with_hint(prompt, hint.as_deref())
        .await;
    hive.shutdown().await;

    let task = match submitted {
        Ok(task) => task,
        Err(e) => {
            eprint!("{}", format_error_for_cli(&e));
            return Err(e.into());
        }
    };

    print_task(&task);
    if task.status == TaskStatus::Failed {
        anyhow::bail!("task {} failed", task.id);
    }
    Ok(())
}

fn print_task(task: &Task) {
    println!();
    println!("  Task {} ({})", task.id, task.status);
    for subtask in &task.subtasks {
        let agent = subtask
            .assigned_agent
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        let marker = match subtask.status {
            SubtaskStatus::Completed => "ok",
            SubtaskStatus::Failed => "!!",
            _ => "--",
        };
        println!("  [{}] {:<16} {:<16} {}", marker, subtask.spec.id, agent, subtask.status);
        if let Some(error) = &subtask.error {
            println!("       {}", error);
        }
    }
    println!();

    match (&task.result, &task.error) {
        (Some(result), _) => println!("{}", result),
        (None, Some(error)) => eprintln!("Error: {}", error),
        (None, None) => {}
    }
}
