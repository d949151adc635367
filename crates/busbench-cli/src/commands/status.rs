//! `busbench status` and `busbench info`.

use anyhow::bail;
use busbench_campaign::{CampaignOptions, CampaignSweeper, DeploymentContext, TestCase};
use busbench_state::{RunOutcome, SweepStore};

use super::Invocation;

/// Run log entries shown by `status`.
const RECENT: usize = 10;

pub fn status(ctx: &Invocation, test: &str, incremental: bool) -> anyhow::Result<()> {
    let test: TestCase = test.parse()?;
    let options = CampaignOptions {
        env_dir: ctx.env.clone(),
        ..CampaignOptions::new(test)
    };
    let path = CampaignSweeper::store_path(test.name(), &options.env_dir(incremental));
    if !path.exists() {
        bail!("no sweep state at {}", path.display());
    }

    let store = SweepStore::open(&path)?;
    let counts = store.counts()?;
    println!(
        "{test}: {} combinations, {} done, {} skipped, {} pending",
        counts.total(),
        counts.done,
        counts.skipped,
        counts.pending
    );

    let log = store.run_log()?;
    for entry in log.iter().skip(log.len().saturating_sub(RECENT)) {
        let outcome = match entry.outcome {
            RunOutcome::Done => "done",
            RunOutcome::Skipped => "skipped",
            RunOutcome::Aborted => "aborted",
        };
        println!(
            "  #{:<4} {:<8} {:<8} {}{}",
            entry.seq,
            entry.iteration_id.as_deref().unwrap_or("-"),
            outcome,
            entry.experiment_id,
            entry.error.as_deref().map(|e| format!("  ({e})")).unwrap_or_default(),
        );
    }
    Ok(())
}

pub fn info(ctx: &Invocation) -> anyhow::Result<()> {
    let context = DeploymentContext::load(&ctx.env_dir())?;
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}
