//! # prayerbot
//!
//! Slack bot that pairs prayer group members into private conversations on a
//! per-group schedule.
//!
//! Usage:
//!   prayerbot                      # Run the bot (Socket Mode + scheduler)
//!   prayerbot groups [--json]      # Print every group with its schedule
//!   prayerbot trigger [group]      # Pair up one group, or all, right now
//!   prayerbot import groups.json   # Merge a legacy {"group": [users]} export

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use prayerbot_channels::{CommandHandler, SlackGateway, SocketModeListener};
use prayerbot_core::PrayerBotConfig;
use prayerbot_scheduler::{
    RosterStore, ScheduleClock, TriggerEngine, TriggerResult, load_legacy_json, spawn_poll_loop,
    weekday_name,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prayerbot", version, about = "🙏 prayerbot: weekly prayer partners for Slack")]
struct Cli {
    /// Config file (default: ~/.prayerbot/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Print every prayer group with its members and schedule
    Groups {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Pair up a group right now; every group when none is given
    Trigger { group: Option<String> },
    /// Import a legacy JSON export of group -> members
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "prayerbot=debug,prayerbot_core=debug,prayerbot_scheduler=debug,prayerbot_channels=debug"
    } else {
        "prayerbot=info,prayerbot_core=info,prayerbot_scheduler=info,prayerbot_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => PrayerBotConfig::load_from(path)?,
        None => PrayerBotConfig::load()?,
    };
    config.apply_env();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config).await,
        Commands::Groups { json } => print_groups(&config, json),
        Commands::Trigger { group } => trigger_now(&config, group.as_deref()).await,
        Commands::Import { file } => import_groups(&config, &file),
    }
}

fn open_store(config: &PrayerBotConfig) -> Result<Arc<RosterStore>> {
    let path = config.store.resolved_path();
    let store = RosterStore::open(&path)
        .with_context(|| format!("opening roster {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn build_engine(config: &PrayerBotConfig) -> Result<(Arc<TriggerEngine>, Arc<SlackGateway>)> {
    let store = open_store(config)?;
    let gateway = Arc::new(SlackGateway::connect(&config.slack).await?);
    let clock = ScheduleClock::with_offset_minutes(config.scheduler.utc_offset_minutes)?;
    let bot_name = gateway.identity().name.clone();
    let engine = Arc::new(TriggerEngine::new(store, gateway.clone(), clock, &bot_name));
    Ok((engine, gateway))
}

/// Serve commands and run the poller until Ctrl-C, SIGTERM or a fatal error.
async fn run_bot(config: PrayerBotConfig) -> Result<()> {
    let (engine, gateway) = build_engine(&config).await?;
    let handler = CommandHandler::new(
        engine.clone(),
        gateway.clone(),
        gateway.identity().clone(),
        config.scheduler.admin_users.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut poller = spawn_poll_loop(engine, config.scheduler.poll_interval(), shutdown_rx);
    let mut events = SocketModeListener::new(&config.slack)?.start();

    tracing::info!("🙏 All systems operational");

    let signal = shutdown_signal();
    tokio::pin!(signal);

    let outcome: Result<()> = loop {
        tokio::select! {
            _ = &mut signal => {
                tracing::info!("Gracefully shutting down...");
                break Ok(());
            }
            joined = &mut poller => {
                // The poller only stops on its own after a fatal error.
                return match joined {
                    Ok(result) => result.context("scheduler stopped"),
                    Err(e) => Err(anyhow::anyhow!("scheduler task failed: {e}")),
                };
            }
            message = events.next() => {
                let Some(message) = message else {
                    break Err(anyhow::anyhow!("Slack event stream ended"));
                };
                if let Err(e) = handler.handle_message(&message).await {
                    tracing::error!("❌ Fatal error while handling a command: {e}");
                    break Err(e.into());
                }
            }
        }
    };

    let _ = shutdown_tx.send(true);
    match poller.await {
        Ok(result) => result.context("scheduler stopped")?,
        Err(e) => return Err(anyhow::anyhow!("scheduler task failed: {e}")),
    }
    outcome
}

/// Resolves on Ctrl-C, or on SIGTERM where there is one.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => tracing::info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => tracing::warn!("Could not listen for SIGTERM: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn print_groups(config: &PrayerBotConfig, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let groups = store.dump_groups()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No prayer groups yet.");
        return Ok(());
    }

    let clock = ScheduleClock::with_offset_minutes(config.scheduler.utc_offset_minutes)?;
    for group in &groups {
        let schedule = &group.schedule;
        println!("📿 {} ({} members)", group.name, group.members.len());
        println!(
            "   Every {} week(s) on {} at {:02}:00",
            schedule.recurrence_weeks,
            weekday_name(schedule.trigger_weekday),
            schedule.trigger_hour
        );
        println!("   Last: {}", schedule.last_triggered_at.with_timezone(&clock.offset()));
        println!("   Next: {}", clock.next_due(schedule).with_timezone(&clock.offset()));
        println!("   Members: {}", group.members.join(", "));
    }
    Ok(())
}

async fn trigger_now(config: &PrayerBotConfig, group: Option<&str>) -> Result<()> {
    let (engine, _gateway) = build_engine(config).await?;
    let results = match group {
        Some(group) => vec![(group.to_string(), engine.trigger_group(group).await?)],
        None => engine.trigger_all().await?,
    };

    for (group, result) in results {
        match result {
            TriggerResult::Skipped { members } => {
                println!("⏭️  {group}: skipped ({members} member)");
            }
            TriggerResult::Triggered(report) => {
                println!(
                    "✅ {group}: {}/{} conversations opened",
                    report.succeeded, report.attempted
                );
                for failure in &report.failures {
                    println!("   ⚠️  {}: {}", failure.members.join(", "), failure.reason);
                }
            }
        }
    }
    Ok(())
}

fn import_groups(config: &PrayerBotConfig, file: &std::path::Path) -> Result<()> {
    let legacy = load_legacy_json(file)
        .with_context(|| format!("reading legacy export {}", file.display()))?;
    let store = open_store(config)?;
    let added = store.import_legacy(&legacy)?;
    println!("📥 Imported {added} memberships from {} groups", legacy.len());
    Ok(())
}
