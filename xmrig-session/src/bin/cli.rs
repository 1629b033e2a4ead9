//! Command-line tools for xmrig-session.
//!
//! Lets an operator compile a stored configuration, classify worker log
//! output, and query a running worker's status endpoint without the app.

use std::env;
use std::fs;
use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};

use xmrig_session::config::SessionConfig;
use xmrig_session::config_compiler;
use xmrig_session::hashrate::parse_sample;
use xmrig_session::log;
use xmrig_session::settings::Settings;
use xmrig_session::status::StatusPoller;

#[tokio::main]
async fn main() -> Result<()> {
    xmrig_session::tracing::init_stdout();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: xmrig-session-cli <command> [args]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  compile <settings.json>  Print the start payload for the selected configuration");
        eprintln!("  classify                 Classify worker log lines read from stdin");
        eprintln!("  status                   Show the worker's status summary");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  XMRIG_SESSION_STATUS_URL  Summary URL (default: http://127.0.0.1:50080/2/summary)");
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "compile" => {
            let Some(path) = args.get(2) else {
                bail!("compile needs a settings file");
            };
            cmd_compile(path)?
        }
        "classify" => cmd_classify()?,
        "status" => cmd_status().await?,
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Compile the selected configuration and print the start payload.
fn cmd_compile(path: &str) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let settings: Settings =
        serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;

    let Some(selected) = settings.selected() else {
        bail!("no configuration selected in {path}");
    };

    let compiled = config_compiler::compile(selected)?;
    println!("{}", compiled.to_start_payload()?);

    Ok(())
}

/// Read lines as the worker emits them (oldest first) and print the
/// entries that survive classification.
fn cmd_classify() -> Result<()> {
    let mut lines = io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<Vec<String>>>()?;
    // The event bridge delivers newest first.
    lines.reverse();

    for entry in log::ingest(&lines) {
        println!(
            "{:<8} {:<24} {:<10} {}",
            entry.level,
            entry.timestamp.as_deref().unwrap_or("-"),
            entry.category.as_deref().unwrap_or("-"),
            entry.message
        );
    }

    Ok(())
}

/// Print the worker's current summary.
async fn cmd_status() -> Result<()> {
    let poller = make_poller()?;
    let summary = poller
        .fetch_summary()
        .await
        .with_context(|| format!("querying {}", poller.url()))?;

    let hashrate = summary
        .hashrate
        .total
        .first()
        .and_then(parse_sample)
        .map(|h| format!("{h:.1} H/s"))
        .unwrap_or_else(|| "n/a".to_string());

    println!(
        "Worker:   {} ({})",
        summary.worker_id.as_deref().unwrap_or("-"),
        summary.version.as_deref().unwrap_or("unknown version")
    );
    println!("Uptime:   {} s", summary.uptime);
    println!("Algo:     {}", summary.algo.as_deref().unwrap_or("-"));
    println!("Hashrate: {hashrate}");
    println!(
        "Shares:   {} good / {} total",
        summary.results.shares_good, summary.results.shares_total
    );

    match &summary.connection.pool {
        Some(pool) => println!(
            "Pool:     {} ({} accepted, {} rejected)",
            pool, summary.connection.accepted, summary.connection.rejected
        ),
        None => println!("Pool:     (not connected)"),
    }

    Ok(())
}

/// Build a poller, honoring XMRIG_SESSION_STATUS_URL if set.
fn make_poller() -> Result<StatusPoller> {
    let config = SessionConfig::from_env()?;
    let poller = match env::var("XMRIG_SESSION_STATUS_URL") {
        Ok(url) => StatusPoller::with_url(url, config.poll_timeout, config.poll_interval)?,
        Err(_) => StatusPoller::new(&config)?,
    };
    Ok(poller)
}
