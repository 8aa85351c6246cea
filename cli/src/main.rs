use anyhow::{anyhow, bail, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use common::Config;
use log::info;
use ztna_engine::{Simulator, Snapshot, Summary, Topology};

mod live;
mod render;

use render::{node_status_label, severity_label, status_label};

#[derive(Parser)]
#[command(name = "ztna-cli", version, about = "Zero Trust Network Access simulator")]
struct Cli {
    /// Config file (defaults to $ZTNA_CONFIG or ./config/default.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Live simulator dashboard (default)
    Simulate,
    /// What Zero Trust is about
    About,
    /// Run the feed without a terminal UI and print the result
    Run {
        #[arg(long, default_value_t = 10)]
        ticks: u64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Print the seed network map
    Topology,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;
    info!("Config resolved from {}", config_path);

    match cli.command.unwrap_or(Commands::Simulate) {
        Commands::Simulate => {
            show_welcome();
            live::run_simulator(&config).await?;
            println!("\n{}", "Simulator stopped. Goodbye!".bright_green());
        }
        Commands::About => show_about(),
        Commands::Run { ticks, seed, json } => {
            let mut sim_config = config.simulator.clone();
            if seed.is_some() {
                sim_config.seed = seed;
            }
            let snapshot = run_headless(&sim_config, ticks)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
        }
        Commands::Topology => print_topology(&Topology::seed()),
    }

    Ok(())
}

/// Fires `ticks` ticks back to back, spaced one period apart on the clock.
fn run_headless(config: &common::SimulatorConfig, ticks: u64) -> Result<Snapshot> {
    if ticks == 0 {
        bail!("--ticks must be at least 1");
    }
    config.validate()?;
    let ticks = i32::try_from(ticks).map_err(|_| anyhow!("--ticks must be at most {}", i32::MAX))?;
    let period = i64::try_from(config.tick_interval_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| anyhow!("tick interval {}s out of range", config.tick_interval_secs))?;
    let span = period
        .checked_mul(ticks)
        .ok_or_else(|| anyhow!("{} ticks of {}s overflow the clock", ticks, config.tick_interval_secs))?;
    let start = Utc::now()
        .checked_sub_signed(span)
        .ok_or_else(|| anyhow!("{} ticks of {}s reach before the earliest timestamp", ticks, config.tick_interval_secs))?;

    let mut simulator = Simulator::from_config(config);
    for i in 1..=ticks {
        let at = period
            .checked_mul(i)
            .and_then(|offset| start.checked_add_signed(offset))
            .ok_or_else(|| anyhow!("tick {} timestamp out of range", i))?;
        simulator.tick(at);
    }
    Ok(simulator.snapshot())
}

fn show_welcome() {
    println!("{}", "ZTNA Simulator".bright_cyan().bold());
    println!("{}", "Generating mock access requests and security events...".dimmed());
}

fn show_about() {
    println!("{}", "Zero Trust Network Access".bright_cyan().bold());
    println!("{}", "Never trust, always verify: every request is checked, wherever it comes from.".dimmed());
    println!();
    println!("{}", "The Cybersecurity Challenge".bold());
    println!("  {} Insider threats", "⚠".bright_yellow());
    println!("  {} Lateral movement", "⚠".bright_yellow());
    println!("  {} Credential misuse", "⚠".bright_yellow());
    println!();
    println!("{}", "Zero Trust Principles".bold());
    let principles = [
        ("Never Trust, Always Verify", "Every access request is authenticated and authorized before granting access"),
        ("Least Privilege Access", "Users get minimal access required for their role and responsibilities"),
        ("Continuous Monitoring", "Real-time analysis of user behavior and device health"),
    ];
    for (title, description) in principles {
        println!("  {} {}", "▸".bright_cyan(), title.bright_white().bold());
        println!("    {}", description);
    }
    println!();
    println!("Try it: {}", "ztna-cli simulate".bright_cyan());
}

fn print_snapshot(snapshot: &Snapshot) {
    let summary = Summary::from_snapshot(snapshot);
    println!("{} {}", "Ticks:".bright_cyan(), snapshot.ticks);
    println!(
        "{} {} pending, risk level {}",
        "Requests:".bright_cyan(),
        summary.pending,
        summary.risk_level
    );
    for request in &snapshot.requests {
        println!(
            "  {}  {:<14} {:<18} {:<14} risk {:>3}%  {}",
            request.id.dimmed(),
            request.user,
            request.resource,
            request.location,
            request.risk_score,
            status_label(request.status)
        );
    }
    println!("{} {}", "Events:".bright_cyan(), snapshot.events.len());
    for event in &snapshot.events {
        println!(
            "  {}  {:<7} {:<38} {}",
            event.id.dimmed(),
            event.kind,
            event.message,
            severity_label(event.severity)
        );
    }
}

fn print_topology(topology: &Topology) {
    println!("{}", "Network Topology".bright_cyan().bold());
    for node in topology.nodes() {
        let links = if node.connections.is_empty() {
            "-".to_string()
        } else {
            node.connections.join(", ")
        };
        println!(
            "  {:<8} {:<18} {:<12} {:<12} → {}",
            node.id,
            node.name,
            node.kind.to_string(),
            node_status_label(node.status),
            links
        );
    }
}
