//! TradeKernel CLI tool.
//!
//! Lists the kernel catalogue, prints configuration, and runs an ensemble
//! analysis over an events file.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use tradekernel::catalog::{domains, total_kernel_count};
use tradekernel_core::{
    domain::Domain,
    observability::{LogConfig, LogLevel},
    registry::KernelRegistry,
    runtime::{RuntimeConfig, WorkerPool},
    traits::{BatchKernel, ExecutionContext},
};
use tradekernel_temporal::{
    config::AnalysisConfig,
    ensemble::EnsemblePredictor,
    messages::EnsemblePredictionInput,
    types::{ActivityEvent, FillPolicy, Frequency},
};

#[derive(Parser)]
#[command(name = "tradekernel")]
#[command(version, about = "Trading activity cycle, regime and analogue analytics", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Runtime configuration file (TOML or JSON)
    #[arg(long, global = true)]
    runtime: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available kernels
    List {
        /// Filter by domain name or prefix (e.g. regime, matching)
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Show kernel registry statistics
    Stats,

    /// Show kernel information
    Info {
        /// Kernel ID (e.g. temporal/cycle-detection)
        kernel_id: String,
    },

    /// Print the analysis configuration
    Config {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Toml)]
        format: Format,

        /// Load and validate this file instead of printing defaults
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Run the ensemble over an events file
    Analyze {
        /// JSON array of `{timestamp, value}` events
        #[arg(short, long)]
        events: PathBuf,

        /// Analysis configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bucket frequency (hourly, daily, weekly)
        #[arg(long)]
        frequency: Option<String>,

        /// Gap fill policy
        #[arg(long, value_enum)]
        fill: Option<Fill>,

        /// Entity id carried into logs
        #[arg(long)]
        entity: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Toml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Fill {
    Zero,
    Forward,
}

impl From<Fill> for FillPolicy {
    fn from(fill: Fill) -> Self {
        match fill {
            Fill::Zero => FillPolicy::Zero,
            Fill::Forward => FillPolicy::ForwardFill,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let runtime = match &cli.runtime {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("loading runtime config {}", path.display()))?
            .with_env_overrides(),
        None => RuntimeConfig::builder()
            .log_level("info")
            .build()?
            .with_env_overrides(),
    };

    let mut log = LogConfig::from_runtime(&runtime);
    if cli.verbose {
        log.level = LogLevel::Debug;
    }
    log.init()?;

    match cli.command {
        Commands::List { domain } => {
            cmd_list(domain.as_deref())?;
        }

        Commands::Stats => {
            cmd_stats()?;
        }

        Commands::Info { kernel_id } => {
            cmd_info(&kernel_id)?;
        }

        Commands::Config { format, file } => {
            cmd_config(format, file)?;
        }

        Commands::Analyze {
            events,
            config,
            frequency,
            fill,
            entity,
        } => {
            cmd_analyze(&runtime, events, config, frequency, fill, entity).await?;
        }
    }

    Ok(())
}

fn registry() -> anyhow::Result<KernelRegistry> {
    let registry = KernelRegistry::new();
    tradekernel::register_all(&registry)?;
    Ok(registry)
}

fn cmd_list(domain_filter: Option<&str>) -> anyhow::Result<()> {
    println!("TradeKernel Kernel Catalogue");
    println!("══════════════════════════════════════════════════════════════════\n");

    let filter = match domain_filter {
        Some(name) => {
            Some(Domain::parse(name).ok_or_else(|| anyhow!("unknown domain: {name}"))?)
        }
        None => None,
    };

    let registry = registry()?;
    for info in domains() {
        if filter.is_some_and(|d| d != info.domain) {
            continue;
        }
        println!("{} ({} kernels)", info.name, info.kernel_count);
        println!("  {}", info.description);
        let mut kernels = registry.by_domain(info.domain);
        kernels.sort_by(|a, b| a.id.cmp(&b.id));
        for kernel in kernels {
            println!("    {:<28} [{}] {}", kernel.id, kernel.mode, kernel.description);
        }
        println!();
    }

    Ok(())
}

fn cmd_stats() -> anyhow::Result<()> {
    let registry = registry()?;
    let stats = registry.stats();

    println!("Total kernels:    {}", stats.total);
    println!("Batch kernels:    {}", stats.batch_kernels);
    println!("Stateful kernels: {}", stats.stateful_kernels);
    println!();

    println!("Kernels by domain:");
    println!("──────────────────────────────────────────────────────────────────");
    for info in domains() {
        let count = stats.by_domain.get(&info.domain).copied().unwrap_or(0);
        println!("  {:<25} {:>3} {}", info.name, count, "█".repeat(count));
    }
    println!("──────────────────────────────────────────────────────────────────");
    println!("  {:<25} {:>3}", "TOTAL", total_kernel_count());

    Ok(())
}

fn cmd_info(kernel_id: &str) -> anyhow::Result<()> {
    let registry = registry()?;
    let Some(kernel) = registry.get(kernel_id) else {
        println!("Kernel '{kernel_id}' not found. Available kernels:");
        for id in registry.all_kernel_ids() {
            println!("  - {id}");
        }
        return Ok(());
    };

    println!("Kernel ID:    {}", kernel.id);
    println!("Domain:       {}", kernel.domain);
    println!("Mode:         {}", kernel.mode);
    println!("Description:  {}", kernel.description);
    println!("Parallel:     {}", kernel.parallel);
    println!("Throughput:   {} series/s", kernel.expected_throughput);
    println!("Latency:      {:.0} us", kernel.target_latency_us);

    Ok(())
}

fn cmd_config(format: Format, file: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match file {
        Some(path) => AnalysisConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let rendered = match format {
        Format::Toml => toml::to_string_pretty(&config)?,
        Format::Json => serde_json::to_string_pretty(&config)?,
    };
    println!("{rendered}");
    eprintln!("fingerprint: {}", config.fingerprint());

    Ok(())
}

async fn cmd_analyze(
    runtime: &RuntimeConfig,
    events_path: PathBuf,
    config_path: Option<PathBuf>,
    frequency: Option<String>,
    fill: Option<Fill>,
    entity: Option<String>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&events_path)
        .with_context(|| format!("reading {}", events_path.display()))?;
    let events: Vec<ActivityEvent> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", events_path.display()))?;

    let mut config = match &config_path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AnalysisConfig::from_env(),
    };
    if let Some(name) = frequency {
        config.series.frequency =
            Frequency::parse(&name).ok_or_else(|| anyhow!("unknown frequency: {name}"))?;
    }
    if let Some(fill) = fill {
        config.series.fill = fill.into();
    }
    config.validate()?;

    let pool = WorkerPool::new(runtime.worker_threads)?;
    let kernel = EnsemblePredictor::new().with_pool(pool.clone());

    let mut ctx = ExecutionContext::new();
    if let Some(entity) = &entity {
        ctx = ctx.with_entity(entity.clone());
    }
    if let Some(timeout) = runtime.run_timeout() {
        ctx = ctx.with_timeout(timeout);
    }

    info!(
        events = events.len(),
        file = %events_path.display(),
        threads = pool.threads(),
        "Running analysis"
    );
    let output = kernel
        .execute_with_context(&ctx, EnsemblePredictionInput::from_events(events, config))
        .await?;

    let report = serde_json::json!({
        "entity": entity,
        "compute_time_us": output.compute_time_us,
        "prediction": output.result,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
