use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};

use scry_client::HttpApi;
use scry_ops::{init_tracing, EventStore, SlowHint};
use scry_orchestrator::{LocalBus, Pipeline, PipelineCommand, PipelineSnapshot};
use scry_types::{
    config::{ApiConfig, OpsConfig, PipelineConfig, ScryConfig},
    identity::RiotId,
    live::LiveGameMembership,
    summoner::Summoner,
    ScryError,
};
use scry_view::MatchView;

mod ui;

const DEFAULT_CONFIG_PATH: &str = "configs/dev.toml";

/// Spot likely smurfs in a player's current League of Legends game.
#[derive(Debug, Parser)]
#[command(name = "scry", version, about)]
struct Args {
    /// Riot ID of the player to scout, e.g. "PlayerName#NA1".
    riot_id: String,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep watching: poll the live game and show a dashboard.
    #[arg(long)]
    watch: bool,

    /// One-shot mode only: print the result as JSON.
    #[arg(long, conflicts_with = "watch")]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref());
    let riot_id = RiotId::parse(&args.riot_id)?;

    let api = Arc::new(HttpApi::new(&config.api)?);
    let bus = LocalBus::new(64);
    let store = EventStore::new();
    let (updates_tx, updates_rx) = watch::channel(PipelineSnapshot::default());
    let pipeline = Pipeline::new(
        api,
        config.pipeline.clone(),
        bus.clone(),
        store,
        updates_tx,
    );

    if args.watch {
        run_watch(&config, pipeline, bus, updates_rx, riot_id).await
    } else {
        init_tracing(&config.ops)?;
        run_once(pipeline, riot_id, args.json).await
    }
}

/// Evaluate the chain once and print a report.
async fn run_once(mut pipeline: Pipeline<HttpApi>, riot_id: RiotId, json: bool) -> Result<()> {
    pipeline.submit(riot_id).await;
    pipeline.advance().await;
    let snapshot = pipeline.snapshot();

    if let Some(err) = snapshot.display_error() {
        return Err(ScryError::Fetch(err.clone()).into());
    }
    let Some(summoner) = snapshot.summoner.data.as_ref() else {
        bail!("summoner did not resolve");
    };

    match snapshot.membership.verdict.as_ref() {
        None => bail!("could not determine live-game status; try again shortly"),
        Some(LiveGameMembership::Absent) => {
            if json {
                println!("{}", serde_json::json!({ "in_game": false }));
            } else {
                print_summoner(summoner);
                println!();
                println!("Player is not currently in a game");
            }
            Ok(())
        }
        Some(LiveGameMembership::Present(_)) => {
            let Some(analysis) = snapshot.analysis.data.as_ref() else {
                bail!("match analysis unavailable");
            };
            let view = scry_view::render(analysis);
            if json {
                let body = serde_json::json!({ "in_game": true, "match": view });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_summoner(summoner);
                println!();
                print_match(&view);
            }
            Ok(())
        }
    }
}

/// Live dashboard: pipeline task + forwarder + blocking terminal loop.
async fn run_watch(
    config: &ScryConfig,
    pipeline: Pipeline<HttpApi>,
    bus: LocalBus,
    updates_rx: watch::Receiver<PipelineSnapshot>,
    riot_id: RiotId,
) -> Result<()> {
    let (command_tx, command_rx) = mpsc::channel(8);
    command_tx
        .send(PipelineCommand::Search(riot_id))
        .await
        .map_err(|_| anyhow!("pipeline command channel closed"))?;

    let pipeline_task = tokio::spawn(pipeline.run(command_rx));

    let (ui_tx, ui_rx) = std::sync::mpsc::channel();
    let forwarder = tokio::spawn(forward_updates(bus, updates_rx, ui_tx));

    let slow_hint = SlowHint::new(config.pipeline.slow_hint());
    let ui_commands = command_tx.clone();
    let ui_task = tokio::task::spawn_blocking(move || ui::run(ui_rx, ui_commands, slow_hint));

    let ui_result = ui_task.await?;
    let _ = command_tx.send(PipelineCommand::Shutdown).await;
    pipeline_task.await??;
    forwarder.abort();
    ui_result
}

/// Bridge async pipeline output onto the UI thread's channel.
async fn forward_updates(
    bus: LocalBus,
    mut updates: watch::Receiver<PipelineSnapshot>,
    ui_tx: std::sync::mpsc::Sender<ui::UiMessage>,
) {
    let mut events = bus.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if ui_tx.send(ui::UiMessage::Snapshot(snapshot)).is_err() {
                    break;
                }
            }
            event = events.next() => {
                let Some(event) = event else { break };
                if ui_tx.send(ui::UiMessage::Event(event)).is_err() {
                    break;
                }
            }
        }
    }
    let _ = ui_tx.send(ui::UiMessage::Shutdown);
}

fn print_summoner(summoner: &Summoner) {
    println!(
        "{}#{} (level {})",
        summoner.display_name, summoner.tag, summoner.level
    );
    if let Some(rank) = summoner.rank_line() {
        println!("Ranked Solo/Duo: {rank}");
    }
}

fn print_match(view: &MatchView) {
    println!("Match Analysis: game {} ({})", view.game_id, view.game_mode);
    for (name, team) in [("Blue Team", &view.blue), ("Red Team", &view.red)] {
        println!();
        println!("{name}: {}", team.summary.label());
        if team.is_empty() {
            println!("  {}", scry_view::NO_PLAYER_DATA);
            continue;
        }
        for slot in &team.slots {
            println!("  {}", ui::format_slot(slot));
        }
    }
}

fn load_config(flag: Option<&Path>) -> ScryConfig {
    let from_env = env::var("SCRY_CONFIG").ok();
    let explicit = flag.map(|p| p.to_string_lossy().into_owned()).or(from_env);
    let path = explicit
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    match ScryConfig::from_file(&path) {
        Ok(config) => {
            if let Err(err) = config.validate() {
                eprintln!("Invalid config in '{path}': {err}. Falling back to internal defaults.");
                default_config()
            } else {
                config
            }
        }
        Err(err) => {
            if explicit.is_some() {
                eprintln!(
                    "Failed to load config from '{path}': {err}. Falling back to internal defaults."
                );
            }
            default_config()
        }
    }
}

fn default_config() -> ScryConfig {
    let config = ScryConfig {
        api: ApiConfig {
            base_url: "http://127.0.0.1:8000/api/v1".into(),
            timeout_secs: 10,
        },
        pipeline: PipelineConfig {
            summoner_ttl_secs: 300,
            analysis_ttl_secs: 120,
            poll_interval_secs: 30,
            membership_hold_secs: 28,
            slow_hint_ms: 1500,
        },
        ops: OpsConfig {
            log_level: "info".into(),
        },
    };
    debug_assert!(config.validate().is_ok());
    config
}
