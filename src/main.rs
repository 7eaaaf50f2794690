//! Command-line front end for the fetch orchestrator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use polyfetch::dispatch::{BatchDispatcher, RunMode};
use polyfetch::external_deps::solver::TwoCaptchaClient;
use polyfetch::modules::pacing::PacingPolicy;
use polyfetch::modules::proxy::{ProxyKind, ProxyPool, ProxyPoolConfig};
use polyfetch::orchestrator::{Capabilities, FetchOrchestrator};
use polyfetch::output::OutputSink;
use polyfetch::target::Target;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProxyKindArg {
    Residential,
    Mobile,
    Datacenter,
}

impl From<ProxyKindArg> for ProxyKind {
    fn from(kind: ProxyKindArg) -> Self {
        match kind {
            ProxyKindArg::Residential => ProxyKind::Residential,
            ProxyKindArg::Mobile => ProxyKind::Mobile,
            ProxyKindArg::Datacenter => ProxyKind::Datacenter,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "polyfetch",
    version,
    about = "Adaptive multi-strategy fetcher with proxy rotation and challenge handling"
)]
struct Cli {
    /// URLs to fetch, or paths to files containing one URL per line
    #[arg(required = true)]
    targets: Vec<String>,

    /// Kind tag applied to endpoints from the proxy list
    #[arg(long, value_enum, default_value_t = ProxyKindArg::Residential)]
    proxy_kind: ProxyKindArg,

    /// Line-oriented host:port proxy list ('#' lines are comments)
    #[arg(long)]
    proxy_file: Option<PathBuf>,

    /// Route every target through the anonymity network
    #[arg(long)]
    tor: bool,

    /// Disable challenge solving
    #[arg(long)]
    no_solve: bool,

    /// Run the browser in headless mode
    #[arg(long)]
    headless: bool,

    /// Process targets under a bounded worker pool
    #[arg(long)]
    parallel: bool,

    /// Worker count for --parallel
    #[arg(long, default_value_t = 5)]
    workers: usize,

    /// Directory for persisted fetch documents
    #[arg(long, default_value = "fetched_data")]
    output_dir: PathBuf,

    /// Challenge-solving API key (falls back to SOLVER_API_KEY)
    #[arg(long)]
    solver_key: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    let targets = match load_targets(&cli.targets, cli.tor) {
        Ok(targets) => targets,
        Err(message) => {
            eprintln!("error: {message}");
            return;
        }
    };
    if targets.is_empty() {
        eprintln!("error: no valid URLs provided");
        return;
    }

    let sink = match OutputSink::new(&cli.output_dir) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("error: cannot create {}: {err}", cli.output_dir.display());
            return;
        }
    };

    let pool_config = ProxyPoolConfig {
        kind: cli.proxy_kind.into(),
        ..Default::default()
    };
    let pool = Arc::new(match &cli.proxy_file {
        Some(path) => ProxyPool::from_file(path, pool_config),
        None => ProxyPool::from_endpoints(Vec::<String>::new(), pool_config),
    });

    let solver_key = cli
        .solver_key
        .clone()
        .or_else(|| std::env::var("SOLVER_API_KEY").ok())
        .filter(|key| !key.is_empty());

    let capabilities = Capabilities {
        challenge_solving: !cli.no_solve && solver_key.is_some(),
        ..Default::default()
    };

    let mut builder = FetchOrchestrator::builder()
        .with_capabilities(capabilities)
        .with_proxy_pool(pool.clone())
        .headless(cli.headless);
    if let Some(key) = solver_key {
        builder = builder.with_solver(Arc::new(TwoCaptchaClient::new(key)));
    }
    let orchestrator = Arc::new(builder.build());

    let status = pool.status();
    log::info!(
        "{} targets, {} {} endpoint(s){}",
        targets.len(),
        status.endpoints,
        status.kind.as_str(),
        if status.degraded_to_sentinel {
            " (sentinel)"
        } else {
            ""
        }
    );

    let dispatcher = BatchDispatcher::new(orchestrator.clone(), PacingPolicy::default());
    let mode = if cli.parallel {
        RunMode::Concurrent {
            workers: cli.workers,
        }
    } else {
        RunMode::Sequential
    };

    let total = targets.len();
    let batch = dispatcher.run(targets, mode).await;

    for result in batch.successes() {
        if let Err(err) = sink.write(result) {
            log::error!("failed to persist {}: {err}", result.url);
        }
    }

    println!("\ncompleted {}/{} targets", batch.success_count(), total);
    for (target, failure) in batch.failures() {
        println!("  failed {target}: {failure}");
    }
    println!("\n{}", orchestrator.stats_snapshot());
}

/// Expand CLI arguments into targets: existing files contribute one URL per
/// line (lines that begin with a scheme), everything else is taken as a URL.
fn load_targets(inputs: &[String], force_anonymity: bool) -> Result<Vec<Target>, String> {
    let mut raw_urls = Vec::new();
    for item in inputs {
        let path = Path::new(item);
        if path.is_file() {
            let contents = std::fs::read_to_string(path)
                .map_err(|err| format!("failed to read {item}: {err}"))?;
            raw_urls.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| line.starts_with("http"))
                    .map(str::to_string),
            );
        } else {
            raw_urls.push(item.clone());
        }
    }

    raw_urls
        .iter()
        .map(|raw| {
            if force_anonymity {
                Target::new_anonymity_routed(raw)
            } else {
                Target::new(raw)
            }
            .map_err(|err| format!("invalid target {raw}: {err}"))
        })
        .collect()
}
