// src/main.rs
//
// Thin harness around the gts_scheduler library.
// All of the real logic lives in the lib crate (mapper, observer, scheduler).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use gts_scheduler::config::parse_short_address;
use gts_scheduler::{
    DensePolicy, DsmeTopology, InMemoryAllocationTable, NoopPolicy, Policy, RlScheduler,
    SchedulerConfig, ShortAddress, TelemetrySink, TopologyProvider,
};

/// Command-line arguments for the scheduler harness.
#[derive(Parser, Debug)]
#[command(name = "gts_scheduler")]
struct Cli {
    /// JSON weight file for a dense policy, or `noop`.
    #[arg(long)]
    policy: String,

    /// Peer short address (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_peer)]
    peer: ShortAddress,

    /// Optional YAML scheduler config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional JSON allocation table to start from.
    #[arg(long)]
    table: Option<PathBuf>,

    /// Number of scheduling cycles to run.
    #[arg(long, default_value_t = 1)]
    cycles: u64,

    /// Feed each decision back into the table as if the MAC accepted it.
    #[arg(long)]
    apply: bool,
}

fn parse_peer(raw: &str) -> Result<ShortAddress, String> {
    parse_short_address(raw).ok_or_else(|| format!("invalid short address: {raw}"))
}

/// Build config from file (or defaults), then apply env overrides.
fn build_config(cli: &Cli) -> Result<SchedulerConfig> {
    let mut cfg = match &cli.config {
        Some(path) => SchedulerConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    cfg.apply_env_overrides();
    Ok(cfg)
}

fn build_policy(source: &str) -> Result<Box<dyn Policy>> {
    if source.eq_ignore_ascii_case("noop") {
        return Ok(Box::new(NoopPolicy::new()));
    }
    let policy = DensePolicy::from_json_file(source)
        .with_context(|| format!("loading policy {source}"))?;
    Ok(Box::new(policy))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = build_config(&cli)?;
    let topology = DsmeTopology::from_config(&cfg.topology);

    let mut table = match &cli.table {
        Some(path) => InMemoryAllocationTable::from_json_file(path)?,
        None => InMemoryAllocationTable::new(),
    };

    let policy = build_policy(&cli.policy)?;
    eprintln!(
        "policy {} ({}), {} superframes, peer 0x{:04x}",
        policy.version(),
        policy.policy_id().unwrap_or("-"),
        topology.multi_superframe_length(),
        cli.peer
    );

    let mut scheduler = RlScheduler::new(cfg, policy, TelemetrySink::from_env());

    for cycle in 0..cli.cycles {
        let decision = scheduler
            .get_next_scheduling_action(&topology, &table, cli.peer)
            .with_context(|| format!("scheduling cycle {cycle}"))?;

        println!("{}", serde_json::to_string(&decision)?);

        if cli.apply && !table.apply(&decision, cli.peer) && !decision.is_no_action() {
            eprintln!("cycle {cycle}: decision not applicable to table");
        }
    }

    Ok(())
}
