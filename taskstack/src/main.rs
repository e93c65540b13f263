//! taskstack - synthesis CLI for the Tasks service stack
//!
//! Evaluates the stack definition once and writes the CloudFormation
//! template plus the code-asset manifest to the output directory.

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskstack::{build_tasks_stack, StackConfig};

#[derive(Parser, Debug)]
#[command(name = "taskstack")]
#[command(about = "Synthesize the Tasks service stack", long_about = None)]
struct Args {
    /// Output directory for the template and asset manifest
    #[arg(short, long, default_value = "dist", env = "TASKSTACK_OUT")]
    out: PathBuf,

    /// Optional taskstack.toml configuration file
    #[arg(short, long, env = "TASKSTACK_CONFIG")]
    config: Option<PathBuf>,

    /// Base directory holding Lambda code and layer assets
    #[arg(long, env = "TASKSTACK_LAMBDA_DIR")]
    lambda_dir: Option<PathBuf>,

    /// API Gateway stage name
    #[arg(long, env = "TASKSTACK_STAGE")]
    stage: Option<String>,

    /// Emit minified JSON instead of pretty-printed
    #[arg(long, default_value = "false")]
    compact: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "TASKSTACK_LOG_LEVEL")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("taskstack={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => StackConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => StackConfig::default(),
    };
    if let Some(lambda_dir) = args.lambda_dir {
        config.lambda_dir = lambda_dir;
    }
    if let Some(stage) = args.stage {
        config.stage = stage;
    }

    let stack = build_tasks_stack(&config)?;
    let template = stack.synth()?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let template_path = args.out.join(format!("{}.template.json", stack.name()));
    fs::write(&template_path, template.to_json(!args.compact)?)
        .with_context(|| format!("failed to write {}", template_path.display()))?;
    info!(path = %template_path.display(), "wrote template");

    let manifest_path = args.out.join(format!("{}.assets.json", stack.name()));
    let manifest = if args.compact {
        serde_json::to_string(stack.assets())?
    } else {
        serde_json::to_string_pretty(stack.assets())?
    };
    fs::write(&manifest_path, manifest)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    info!(
        path = %manifest_path.display(),
        assets = stack.assets().len(),
        "wrote asset manifest"
    );

    Ok(())
}
