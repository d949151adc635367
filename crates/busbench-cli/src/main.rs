//! busbench — message bus benchmark campaigns.
//!
//! # Usage
//!
//! ```text
//! busbench deploy --conf busbench.toml --env env
//! busbench prepare --driver router
//! busbench test-case test_case_1 --nbr-clients 10
//! busbench campaign test_case_2 --incremental --pause 5
//! busbench status test_case_2 --incremental
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod collaborators;
mod commands;

#[derive(Parser)]
#[command(
    name = "busbench",
    about = "Benchmark campaigns for RPC message buses",
    version,
    propagate_version = true
)]
struct Cli {
    /// Campaign configuration file.
    #[arg(long, global = true, default_value = "busbench.toml")]
    conf: PathBuf,

    /// Environment directory holding the deployment context and sweep state.
    #[arg(long, global = true)]
    env: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Acquire machines from the static provider.
    Deploy {
        /// Ask for fresh machines even if some are already provisioned.
        #[arg(long)]
        force: bool,
    },
    /// Deploy the bus under test and the control bus.
    Prepare {
        /// Driver declared under [drivers] (defaults to the configured default).
        #[arg(long)]
        driver: Option<String>,
    },
    /// Run one test case once on the prepared bus.
    TestCase {
        /// test_case_1 .. test_case_4
        test: String,
        #[command(flatten)]
        dims: commands::Dimensions,
    },
    /// Sweep a test case over its parameter space.
    Campaign(CampaignArgs),
    /// Tear down the bus and every agent.
    Destroy,
    /// Collect logs and results.
    Backup {
        /// Directory name under `<env>/current` (defaults to the configured backup_dir).
        #[arg(long)]
        name: Option<String>,
    },
    /// Show sweep progress and the run log.
    Status {
        test: String,
        #[arg(long)]
        incremental: bool,
    },
    /// Print the deployment context.
    Info,
}

#[derive(Args)]
struct CampaignArgs {
    test: String,
    /// Walk zipped growth dimensions step by step.
    #[arg(long)]
    incremental: bool,
    /// Ask for fresh machines.
    #[arg(long)]
    force: bool,
    /// Ignore the test case's filter.
    #[arg(long)]
    unfiltered: bool,
    /// Seconds to sleep between incremental steps.
    #[arg(long)]
    pause: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,busbench=debug"));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let ctx = commands::Invocation::new(cli.conf, cli.env);
    match cli.command {
        Command::Deploy { force } => commands::deploy(&ctx, force),
        Command::Prepare { driver } => commands::prepare(&ctx, driver.as_deref()),
        Command::TestCase { test, dims } => commands::test_case(&ctx, &test, &dims),
        Command::Campaign(args) => commands::campaign::run(
            &ctx,
            &args.test,
            commands::campaign::Flags {
                incremental: args.incremental,
                force: args.force,
                unfiltered: args.unfiltered,
                pause: args.pause,
            },
        ),
        Command::Destroy => commands::destroy(&ctx),
        Command::Backup { name } => commands::backup(&ctx, name.as_deref()),
        Command::Status { test, incremental } => commands::status::status(&ctx, &test, incremental),
        Command::Info => commands::status::info(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_campaign_flags() {
        let cli = Cli::parse_from([
            "busbench",
            "--env",
            "/tmp/e",
            "campaign",
            "test_case_2",
            "--incremental",
            "--pause",
            "2.5",
        ]);
        assert_eq!(cli.env, Some(PathBuf::from("/tmp/e")));
        match cli.command {
            Command::Campaign(args) => {
                assert_eq!(args.test, "test_case_2");
                assert!(args.incremental);
                assert_eq!(args.pause, Some(2.5));
                assert!(!args.unfiltered);
            }
            _ => panic!("expected campaign"),
        }
    }

    #[test]
    fn parses_test_case_dimensions() {
        let cli = Cli::parse_from(["busbench", "test-case", "test_case_1", "--nbr-clients", "4"]);
        match cli.command {
            Command::TestCase { test, dims } => {
                assert_eq!(test, "test_case_1");
                assert_eq!(dims.nbr_clients, Some(4));
                assert!(dims.nbr_servers.is_none());
            }
            _ => panic!("expected test-case"),
        }
    }
}
