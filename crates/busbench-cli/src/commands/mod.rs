//! Single-shot subcommands sharing one deployment context.

pub mod campaign;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use busbench_campaign::{DeploymentContext, TestCase, actions};
use busbench_core::{CampaignConfig, ParameterSet};
use clap::Args;

use crate::collaborators::{FileApplier, StaticProvider};

/// Environment directory of single-shot commands when `--env` is absent.
pub const DEFAULT_ENV: &str = "env";

/// Global options of one invocation.
pub struct Invocation {
    pub conf: PathBuf,
    pub env: Option<PathBuf>,
}

impl Invocation {
    pub fn new(conf: PathBuf, env: Option<PathBuf>) -> Self {
        Self { conf, env }
    }

    pub fn config(&self) -> anyhow::Result<CampaignConfig> {
        CampaignConfig::from_file(&self.conf)
            .with_context(|| format!("loading {}", self.conf.display()))
    }

    pub fn env_dir(&self) -> PathBuf {
        self.env.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_ENV))
    }

    fn context(&self) -> anyhow::Result<DeploymentContext> {
        let env_dir = self.env_dir();
        DeploymentContext::load(&env_dir)
            .with_context(|| format!("no deployment in {}; run `busbench deploy` first", env_dir.display()))
    }
}

/// Per-dimension overrides of the configured defaults.
#[derive(Debug, Default, Args)]
pub struct Dimensions {
    #[arg(long)]
    pub nbr_clients: Option<u32>,
    #[arg(long)]
    pub nbr_servers: Option<u32>,
    #[arg(long)]
    pub nbr_topics: Option<u32>,
    #[arg(long)]
    pub call_type: Option<String>,
    #[arg(long)]
    pub nbr_calls: Option<u32>,
    /// Pause between calls, in seconds.
    #[arg(long)]
    pub pause: Option<f64>,
    #[arg(long)]
    pub timeout: Option<u32>,
    /// Agent image.
    #[arg(id = "ombt_version", long = "ombt-version")]
    pub version: Option<String>,
    #[arg(long)]
    pub length: Option<u32>,
    #[arg(long)]
    pub executor: Option<String>,
}

impl Dimensions {
    /// The dimensions given on the command line.
    pub fn to_params(&self) -> ParameterSet {
        let mut params = ParameterSet::new();
        let numbers = [
            ("nbr_clients", self.nbr_clients),
            ("nbr_servers", self.nbr_servers),
            ("nbr_topics", self.nbr_topics),
            ("nbr_calls", self.nbr_calls),
            ("timeout", self.timeout),
            ("length", self.length),
        ];
        for (name, value) in numbers {
            if let Some(v) = value {
                params.insert(name, v);
            }
        }
        let texts = [
            ("call_type", &self.call_type),
            ("version", &self.version),
            ("executor", &self.executor),
        ];
        for (name, value) in texts {
            if let Some(v) = value {
                params.insert(name, v.as_str());
            }
        }
        if let Some(pause) = self.pause {
            params.insert("pause", pause);
        }
        params
    }
}

pub fn deploy(ctx: &Invocation, force: bool) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let mut provider = StaticProvider::from_config(&config)?;
    let mut context = DeploymentContext::load_or_new(&ctx.env_dir())?;
    actions::deploy(&mut context, &mut provider, force)?;
    for (role, machines) in &context.roles {
        println!("{role}: {}", machines.join(", "));
    }
    Ok(())
}

pub fn prepare(ctx: &Invocation, driver: Option<&str>) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let mut context = ctx.context()?;
    let mut applier = FileApplier::new(context.env_dir())?;
    let driver = driver.unwrap_or(config.defaults.driver.as_str());
    actions::prepare(&config, &mut context, &mut applier, driver)?;
    println!(
        "✓ {driver}: {} bus agents, {} control bus agents",
        context.bus_conf.len(),
        context.control_bus_conf.len()
    );
    Ok(())
}

pub fn test_case(ctx: &Invocation, test: &str, dims: &Dimensions) -> anyhow::Result<()> {
    let test: TestCase = test.parse()?;
    let config = ctx.config()?;
    let context = ctx.context()?;
    let mut applier = FileApplier::new(context.env_dir())?;

    let params = config.defaults.fill(&dims.to_params());
    let backup_dir = context.backup_path(params.experiment_id().as_str())?;
    let run = actions::run_test_case(&context, &mut applier, test, &params, "manual", &backup_dir)?;
    println!("✓ {test}: {} agents deployed", run.len());
    println!("  Backup dir: {}", backup_dir.display());
    Ok(())
}

pub fn destroy(ctx: &Invocation) -> anyhow::Result<()> {
    let mut context = ctx.context()?;
    let mut applier = FileApplier::new(context.env_dir())?;
    actions::destroy(&mut context, &mut applier)?;
    println!("✓ destroyed");
    Ok(())
}

pub fn backup(ctx: &Invocation, name: Option<&str>) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let context = ctx.context()?;
    let mut applier = FileApplier::new(context.env_dir())?;
    let name = name.unwrap_or(config.defaults.backup_dir.as_str());
    let backup_dir = context.backup_path(name)?;
    actions::backup(&context, &mut applier, &backup_dir)?;
    println!("✓ backup in {}", display(&backup_dir));
    Ok(())
}

fn display(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_given_dimensions_become_params() {
        let dims = Dimensions {
            nbr_clients: Some(4),
            call_type: Some("rpc-cast".into()),
            pause: Some(0.5),
            ..Dimensions::default()
        };
        let params = dims.to_params();
        assert_eq!(params.len(), 3);
        assert_eq!(params.require_u32("nbr_clients").unwrap(), 4);
        assert_eq!(params.require_str("call_type").unwrap(), "rpc-cast");
    }

    #[test]
    fn single_shot_commands_share_a_deployment() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("busbench.toml");
        std::fs::write(
            &conf,
            r#"
[static.roles]
bus = ["bus-1"]
control-bus = ["ctl-1"]
ombt-client = ["cli-1"]
ombt-server = ["srv-1"]
ombt-control = ["ctl-1"]
"#,
        )
        .unwrap();
        let env = dir.path().join("env");
        let ctx = Invocation::new(conf, Some(env.clone()));

        deploy(&ctx, false).unwrap();
        prepare(&ctx, None).unwrap();
        test_case(&ctx, "test_case_1", &Dimensions::default()).unwrap();
        backup(&ctx, Some("manual")).unwrap();
        destroy(&ctx).unwrap();

        let recorded = std::fs::read_dir(env.join("actions")).unwrap().count();
        assert_eq!(recorded, 4);
        assert!(env.join("current").join("manual").is_dir());
        assert!(!ctx.context().unwrap().is_prepared());
    }

    #[test]
    fn commands_need_a_deployment() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Invocation::new(dir.path().join("missing.toml"), Some(dir.path().join("env")));
        assert!(destroy(&ctx).is_err());
        assert!(ctx.config().is_err());
    }
}
