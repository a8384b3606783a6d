//! CLI command: `hive quota`
//!
//! Displays today's primary-tier usage from the persisted quota counter.

use crate::runtime::load_config;
use anyhow::{Context, Result};
use hive_llm::{QuotaCounter, QuotaSnapshot};

/// Run the quota subcommand.
pub async fn run(json: bool) -> Result<()> {
    let config = load_config()?;
    let path = config
        .policy
        .quota_state_path
        .clone()
        .unwrap_or_else(|| config.storage.data_dir().join("quota.json"));

    let counter = QuotaCounter::load(config.policy.primary_daily_cap, &path)
        .await
        .with_context(|| format!("Failed to read quota state at {}", path.display()))?;
    let snapshot = counter.snapshot().await;

    if json {
        let output = serde_json::json!({
            "window": snapshot.window.to_string(),
            "used": snapshot.used,
            "cap": snapshot.cap,
            "remaining": snapshot.remaining(),
            "state_path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(&snapshot);
    }
    Ok(())
}

fn print_table(snapshot: &QuotaSnapshot) {
    println!();
    println!("  Primary Tier Quota ({} UTC)", snapshot.window);
    println!("  {}", "-".repeat(40));
    println!("  Used:      {}", snapshot.used);
    match snapshot.remaining() {
        Some(remaining) => {
            println!("  Cap:       {}", snapshot.cap);
            let warn = if remaining == 0 { " !!" } else { "" };
            println!("  Remaining: {}{}", remaining, warn);
            println!("  Usage:     {}%", usage_pct(snapshot));
        }
        None => println!("  Cap:       unlimited"),
    }
    println!();
}

fn usage_pct(snapshot: &QuotaSnapshot) -> u64 {
    if snapshot.cap == 0 {
        return 0;
    }
    (snapshot.used.min(snapshot.cap) * 100) / snapshot.cap
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_usage_pct() {
        let mut snapshot = QuotaSnapshot {
            window: Utc::now().date_naive(),
            used: 25,
            cap: 100,
        };
        assert_eq!(usage_pct(&snapshot), 25);

        snapshot.used = 150;
        assert_eq!(usage_pct(&snapshot), 100);

        snapshot.cap = 0;
        assert_eq!(usage_pct(&snapshot), 0);
    }
}
