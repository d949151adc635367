//! `busbench campaign` — sweep a test case, plain or incremental.

use busbench_campaign::{
    CampaignOptions, CampaignSummary, Collaborators, SweepProgress, TestCase, run_campaign,
    run_incremental_campaign,
};

use super::Invocation;
use crate::collaborators::{FileApplier, FileEmulator, StaticProvider};

pub struct Flags {
    pub incremental: bool,
    pub force: bool,
    pub unfiltered: bool,
    pub pause: Option<f64>,
}

pub fn run(ctx: &Invocation, test: &str, flags: Flags) -> anyhow::Result<()> {
    let test: TestCase = test.parse()?;
    let config = ctx.config()?;
    let options = CampaignOptions {
        test,
        unfiltered: flags.unfiltered,
        force: flags.force,
        env_dir: ctx.env.clone(),
        iteration_pause: flags.pause,
    };
    let env_dir = options.env_dir(flags.incremental);

    let mut provider = StaticProvider::from_config(&config)?;
    let mut applier = FileApplier::new(&env_dir)?;
    let mut emulator = FileEmulator::new(&env_dir)?;
    let collab = Collaborators {
        provisioner: &mut provider,
        applier: &mut applier,
        emulator: &mut emulator,
    };

    let summary = if flags.incremental {
        run_incremental_campaign(&config, &options, collab)?
    } else {
        run_campaign(&config, &options, collab)?
    };
    report(&summary);
    Ok(())
}

fn report(summary: &CampaignSummary) {
    println!(
        "{}: {} done, {} skipped this run ({} done, {} skipped, {} pending overall)",
        summary.test,
        summary.done,
        summary.skipped,
        summary.counts.done,
        summary.counts.skipped,
        summary.counts.pending,
    );
    if let SweepProgress::Filtered { remaining } = summary.progress {
        println!("  {remaining} combinations filtered out; rerun with --unfiltered to include them");
    }
    println!("  Environment: {}", summary.env_dir.display());
}
