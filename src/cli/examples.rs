//! CLI command: `hive examples`
//!
//! Shows the most recent entries of the learning log.

use crate::runtime::load_config;
use anyhow::Result;
use hive_llm::{read_examples, LearningExample, Tier};

/// Run the examples subcommand.
pub async fn run(limit: usize, json: bool) -> Result<()> {
    let config = load_config()?;
    let path = config
        .policy
        .learning_log_path
        .clone()
        .unwrap_or_else(|| config.storage.data_dir().join("learning.jsonl"));

    let (examples, _) = read_examples(&path, 0).await?;
    let recent = &examples[examples.len().saturating_sub(limit)..];

    if json {
        for example in recent {
            println!("{}", serde_json::to_string(example)?);
        }
        return Ok(());
    }

    println!();
    println!("  Learning log: {}", path.display());
    let counts: Vec<String> = Tier::ALL
        .iter()
        .map(|tier| format!("{} {}", tier, count_tier(&examples, *tier)))
        .collect();
    println!("  {} examples ({})", examples.len(), counts.join(", "));
    println!("  {}", "-".repeat(72));
    for example in recent {
        println!(
            "  {}  {:<9}  {}",
            example.timestamp.format("%Y-%m-%d %H:%M"),
            example.tier.to_string(),
            one_line(&example.prompt, 50)
        );
    }
    println!();
    Ok(())
}

fn count_tier(examples: &[LearningExample], tier: Tier) -> usize {
    examples.iter().filter(|e| e.tier == tier).count()
}

fn one_line(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_tier() {
        let examples = vec![
            LearningExample::new("a", None, "x", Tier::Primary),
            LearningExample::new("b", None, "y", Tier::Tertiary),
            LearningExample::new("c", None, "z", Tier::Primary),
        ];
        assert_eq!(count_tier(&examples, Tier::Primary), 2);
        assert_eq!(count_tier(&examples, Tier::Secondary), 0);
    }

    #[test]
    fn test_one_line() {
        assert_eq!(one_line("fix\n  the   bug", 50), "fix the bug");
        assert_eq!(one_line("abcdef", 4), "abc…");
    }
}
