// darkness-build/src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::debug;

use darkness_build::{
    project::stdout_console, Config, HookRegistry, LogHook, Project, TaskGraph, TaskRunner,
};

#[derive(Parser)]
#[command(name = "darkness", version, about = "Build tasks for the Darkness extension")]
struct Args {
    /// Tasks to run, e.g. `cws`, `sass:watch`, `skin:create`
    #[arg(value_name = "TASK", required_unless_present = "list")]
    tasks: Vec<String>,
    /// Skin key for skin:create
    #[arg(long)]
    key: Option<String>,
    /// Workspace root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Config file (defaults to <root>/darkness.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the available tasks and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let graph = TaskGraph::standard();
    if args.list {
        for t in graph.tasks() {
            let deps = if t.prerequisites.is_empty() { String::new() } else { format!(" [{}]", t.prerequisites.join(", ")) };
            println!("{:<14} {}{}", t.name, t.about, deps);
        }
        return Ok(());
    }

    let root = match args.root {
        Some(r) => r,
        None => std::env::current_dir().context("current dir")?,
    };
    let cfg = Config::load(root, args.config.as_deref())?;
    debug!(?cfg, "configuration loaded");

    let project = Project::open(cfg, args.key, stdout_console());
    let hooks = HookRegistry::new();
    hooks.register(Arc::new(LogHook)).await;

    TaskRunner { graph: &graph, project: &project, hooks: &hooks }
        .run(args.tasks.as_slice())
        .await
}
