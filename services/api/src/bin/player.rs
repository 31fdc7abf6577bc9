//! services/api/src/bin/player.rs
//!
//! A terminal front end for the progress player. Reads one command per line
//! from stdin and drives a `ProgressPlayer` against a running API server.
//! Every number typed or printed (items, days, exercises, goals) counts from 1.

use fitness_api::{adapters::HttpProgressClient, config::ClientConfig, error::ApiError};
use fitness_core::{
    Item, PlayerCommand, PlayerSnapshot, ProgressPlayer, ProgressSync, TokioScheduler, TracingNotifier,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "commands: items | select <n> | day <n> | ex <n> | start | pause | done | \
repeat | restart | flush | status | goals | goal <text> | check <n> | quit";

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = ClientConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = Arc::new(HttpProgressClient::new(&config.base_url, &config.session_id)?);
    let player = ProgressPlayer::new(
        config.kind,
        client.clone(),
        Arc::new(TokioScheduler::new(config.tick_interval)),
        Arc::new(TracingNotifier),
        config.player,
    );

    let (tx, rx) = mpsc::channel(32);
    let shutdown = CancellationToken::new();
    let player_task = tokio::spawn(player.run(rx, shutdown.clone()));
    send(&tx, PlayerCommand::LoadItems).await;

    info!("Player ready for {} at {}", config.kind, config.base_url);
    println!("{}", HELP);

    let mut items: Vec<Item> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.trim().splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "items" => match client.fetch_items(config.kind).await {
                Ok(fetched) => {
                    for (i, item) in fetched.iter().enumerate() {
                        println!("{:>2}. {} ({} days)", i + 1, item.title, item.total_days());
                    }
                    items = fetched;
                }
                Err(e) => warn!("Could not list items: {}", e),
            },
            "select" => match position(arg).and_then(|i| items.get(i)) {
                Some(item) => send(&tx, PlayerCommand::Select(item.id)).await,
                None => println!("run `items` first, then `select <n>`"),
            },
            "day" => match position(arg) {
                Some(day) => send(&tx, PlayerCommand::SelectDay(day)).await,
                None => println!("usage: day <n>"),
            },
            "ex" => match position(arg) {
                Some(ex) => send(&tx, PlayerCommand::SelectExercise(ex)).await,
                None => println!("usage: ex <n>"),
            },
            "start" => send(&tx, PlayerCommand::Start).await,
            "pause" => send(&tx, PlayerCommand::TogglePause).await,
            "done" => send(&tx, PlayerCommand::CompleteCurrent).await,
            "repeat" => send(&tx, PlayerCommand::RepeatDay).await,
            "restart" => send(&tx, PlayerCommand::RestartItem).await,
            "flush" => send(&tx, PlayerCommand::FlushPending).await,
            "status" => {
                let (reply, answer) = oneshot::channel();
                send(&tx, PlayerCommand::Snapshot(reply)).await;
                if let Ok(snapshot) = answer.await {
                    print_snapshot(&snapshot);
                }
            }
            "goals" => match client.today_goals().await {
                Ok(goals) => {
                    for (i, goal) in goals.iter().enumerate() {
                        println!("{:>2}. [{}] {}", i + 1, if goal.completed { "x" } else { " " }, goal.text);
                    }
                }
                Err(e) => warn!("Could not load goals: {}", e),
            },
            "goal" => match client.add_today_goal(arg).await {
                Ok(goal) => println!("added: {}", goal.text),
                Err(e) => warn!("Could not add goal: {}", e),
            },
            "check" => {
                let goals = client.today_goals().await.unwrap_or_default();
                match position(arg).and_then(|i| goals.get(i)) {
                    Some(goal) => {
                        if let Err(e) = client.set_today_goal_completed(goal.id, !goal.completed).await {
                            warn!("Could not update goal: {}", e);
                        }
                    }
                    None => println!("usage: check <n>"),
                }
            }
            _ => println!("{}", HELP),
        }
    }

    shutdown.cancel();
    let player = player_task
        .await
        .map_err(|e| ApiError::Internal(format!("Player task failed: {}", e)))?;
    if player.pending_count() > 0 {
        warn!("{} changes were never saved", player.pending_count());
    }
    Ok(())
}

async fn send(tx: &mpsc::Sender<PlayerCommand>, command: PlayerCommand) {
    if tx.send(command).await.is_err() {
        warn!("Player loop is not running");
    }
}

/// Turns a 1-based number typed by the user into a 0-based index.
fn position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}

fn print_snapshot(s: &PlayerSnapshot) {
    println!(
        "day {} exercise {} [{}] {:?} {}s left | day {}% item {}% | streak {}{}{}",
        s.day_index + 1,
        s.exercise_index + 1,
        s.exercise_id.as_deref().unwrap_or("-"),
        s.timer_state,
        s.remaining_secs,
        s.day_percent,
        s.item_percent,
        s.streak,
        if s.stale { " | stale" } else { "" },
        if s.pending > 0 { format!(" | {} unsaved", s.pending) } else { String::new() },
    );
}

#[cfg(test)]
mod tests {
    use super::position;

    #[test]
    fn positions_count_from_one() {
        assert_eq!(position("1"), Some(0));
        assert_eq!(position("3"), Some(2));
        assert_eq!(position("0"), None);
        assert_eq!(position("two"), None);
    }
}
