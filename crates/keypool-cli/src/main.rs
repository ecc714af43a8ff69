//! `keypool` — operator CLI for curating credential pools.
//!
//! With a subcommand it runs one action and exits; with no arguments it
//! drops into an interactive menu.

mod actions;
mod config;
mod staging;

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use keypool_store::{RestStore, Token};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

/// Lifetime assumed when the operator's answer cannot be read (EOF on stdin).
const DEFAULT_AUTH_DAYS: u64 = 30;

#[derive(Parser)]
#[command(
    name = "keypool",
    about = "Curate credential pools in the shared store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Probe the key pool plus staged candidates and stage the resulting plan
    CheckKeys,
    /// Apply the staged add_keys file to the key pool
    AddKeys,
    /// Apply the staged delete_keys file to the key pool
    DeleteKeys,
    /// Add staged auth secrets, prompting for each secret's lifetime
    AddAuths,
    /// Remove staged auth secrets from the set and the expiry hash
    DeleteAuths,
    /// Sweep elapsed (or unreadable) expiries out of the auth pool
    CheckExpiredAuths,
    /// Deduplicate and sort the candidates file in place
    DedupKeys,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Cli::parse()).await {
        tracing::error!(error = %err, "command failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::from_env()?;
    let store = RestStore::new(config.store_url.clone(), config.store_token.clone());

    match cli.command {
        Some(command) => run_command(command, &store, &config).await,
        None => menu_loop(&store, &config).await,
    }
}

async fn run_command(
    command: Command,
    store: &RestStore,
    config: &CliConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::CheckKeys => {
            let http = config.probe.http_client()?;
            let report = actions::check_keys(store, &http, config).await?;
            println!(
                "probed {} tokens: {} active, {} invalid",
                report.probed, report.active, report.invalid
            );
            println!(
                "staged {} to add, {} to remove ({} unchanged); backup written",
                report.plan.to_add.len(),
                report.plan.to_remove.len(),
                report.plan.unchanged.len()
            );
        }
        Command::AddKeys => {
            let outcome = actions::add_keys(store, config).await?;
            println!("{} staged, {} newly added", outcome.staged, outcome.applied);
        }
        Command::DeleteKeys => {
            let outcome = actions::delete_keys(store, config).await?;
            println!("{} staged, {} removed", outcome.staged, outcome.applied);
        }
        Command::AddAuths => {
            let outcome = actions::add_auths(store, config, prompt_days).await?;
            println!("{} staged, {} newly added", outcome.staged, outcome.applied);
        }
        Command::DeleteAuths => {
            let outcome = actions::delete_auths(store, config).await?;
            println!("{} staged, {} removed", outcome.staged, outcome.applied);
        }
        Command::CheckExpiredAuths => {
            let outcome = actions::check_expired_auths(store, config).await?;
            println!(
                "scanned {} entries: {} expired, {} removed from set, {} from hash",
                outcome.scanned, outcome.expired, outcome.removed_from_set, outcome.removed_from_hash
            );
        }
        Command::DedupKeys => {
            let outcome = actions::dedup_keys(config)?;
            println!("{} lines read, {} unique kept", outcome.read, outcome.unique);
        }
    }
    Ok(())
}

async fn menu_loop(
    store: &RestStore,
    config: &CliConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        println!();
        println!("1) check-keys           probe the pool and stage a plan");
        println!("2) add-keys             apply staged additions");
        println!("3) delete-keys          apply staged removals");
        println!("4) add-auths            add auth secrets with expiries");
        println!("5) delete-auths         remove staged auth secrets");
        println!("6) check-expired-auths  sweep elapsed expiries");
        println!("7) dedup-keys           dedupe the candidates file");
        println!("q) quit");
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(());
        }

        let command = match line.trim() {
            "1" => Command::CheckKeys,
            "2" => Command::AddKeys,
            "3" => Command::DeleteKeys,
            "4" => Command::AddAuths,
            "5" => Command::DeleteAuths,
            "6" => Command::CheckExpiredAuths,
            "7" => Command::DedupKeys,
            "q" | "quit" | "exit" => return Ok(()),
            "" => continue,
            other => {
                println!("unrecognized choice: {other}");
                continue;
            }
        };

        // A failed action returns to the menu rather than exiting.
        if let Err(err) = run_command(command, store, config).await {
            tracing::error!(error = %err, "command failed");
        }
    }
}

/// Ask the operator how many days the secret should stay valid.
///
/// Only a short prefix of the token is echoed back, so a terminal scrollback
/// never holds full secrets.
fn prompt_days(token: &Token) -> u64 {
    let preview: String = token.as_str().chars().take(8).collect();
    loop {
        print!("days until expiry for {preview}…: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => {
                tracing::warn!(days = DEFAULT_AUTH_DAYS, "no answer, using default lifetime");
                return DEFAULT_AUTH_DAYS;
            }
            Ok(_) => {}
        }

        match line.trim().parse::<u64>() {
            Ok(days) if days > 0 => return days,
            _ => println!("enter a positive number of days"),
        }
    }
}
