//! Drive a room session against the in-process backend.
//!
//! Opens a room, sends each script line optimistically, then exercises the
//! paths a real chat surface hits: a peer message arriving on the live feed,
//! a send the backend rejects, and a dropped feed that recovers after the
//! reconnect delay.

use anyhow::{Context, Result};
use roomsync_client::{BackendError, MockBackend, RoomSession};
use roomsync_core::ConnectionState;
use roomsync_types::{now_millis, Message, MessageId, MessageState, RoomId, SyncError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::Config;

/// Lines sent when no script file is given.
pub const DEFAULT_SCRIPT: &[&str] = &[
    "hello **everyone**",
    "   ",
    "this is __important__ and *urgent*",
    "2 * 3 = 6, <b>not bold</b>",
];

/// Read a script file: one message per line.
pub async fn load_script(path: Option<&Path>) -> Result<Vec<String>> {
    match path {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            Ok(contents.lines().map(str::to_string).collect())
        }
        None => Ok(DEFAULT_SCRIPT.iter().map(|line| line.to_string()).collect()),
    }
}

/// Run the demo command.
pub async fn run(config: &Config, script: &[String]) -> Result<()> {
    let identity = config.sender();
    let room_id = config.room_id();
    let sync_config = config.sync_config();
    let recovery_limit = sync_config.reconnect_delay + Duration::from_secs(5);

    let backend = Arc::new(MockBackend::new(identity.clone()));
    backend.set_history(&room_id, seed_history(&room_id, now_millis()));

    println!("=== roomsync demo: room {} ===", room_id);
    println!();

    let mut session = RoomSession::open(
        sync_config,
        Arc::clone(&backend),
        Arc::new(identity),
        room_id.clone(),
    )
    .await;
    let mut updates = session.connection_updates();
    let printer = spawn_status_printer(session.connection_updates());

    wait_for_state(&mut updates, ConnectionState::Connected, recovery_limit).await?;
    println!("Snapshot: {:?}", session.snapshot_status());
    println!();

    println!("Sending {} line(s):", script.len());
    for line in script {
        match session.send(line).await {
            Ok(message) => println!("  sent {} -> {}", message.id, message.body),
            Err(SyncError::EmptyMessage) => println!("  skipped empty line"),
            Err(e) => println!("  failed: {}", e),
        }
    }
    println!();

    println!("Peer posts on the live feed:");
    backend.emit(peer_message(&room_id, "peer-live-1", "welcome *back*", now_millis()));
    tokio::task::yield_now().await;
    println!();

    println!("Backend rejects the next send:");
    backend.fail_next_create(BackendError::Transport("network unreachable".into()));
    match session.send("this one will not make it").await {
        Ok(message) => println!("  unexpectedly sent {}", message.id),
        Err(e) => println!(
            "  {} (draft kept: {:?})",
            e,
            e.original_text().unwrap_or_default()
        ),
    }
    println!();

    println!(
        "Live feed drops; reconnecting in {:?}...",
        config.sync_config().reconnect_delay
    );
    backend.fail_stream(&room_id, BackendError::Closed);
    wait_for_state(&mut updates, ConnectionState::Disconnected, recovery_limit).await?;
    wait_for_state(&mut updates, ConnectionState::Connected, recovery_limit).await?;
    println!();

    let now = now_millis();
    println!("Messages (newest first):");
    for message in session.messages().await {
        println!("  {}", render_message(&message, now));
    }

    session.close().await;
    printer.abort();
    Ok(())
}

/// One display line for a message.
pub fn render_message(message: &Message, now_ms: u64) -> String {
    let marker = if message.is_pending() { "…" } else { " " };
    format!(
        "{}{:<12} {:>9}  {}",
        marker,
        message.display_name(),
        message.age_label(now_ms),
        message.body
    )
}

/// History the demo room starts with, oldest-first.
fn seed_history(room_id: &RoomId, now_ms: u64) -> Vec<Message> {
    vec![
        peer_message(room_id, "seed-1", "anyone around?", now_ms.saturating_sub(3 * 3_600_000)),
        peer_message(room_id, "seed-2", "<strong>yes</strong>", now_ms.saturating_sub(20 * 60_000)),
        peer_message(room_id, "seed-3", "standup in 5", now_ms.saturating_sub(30_000)),
    ]
}

fn peer_message(room_id: &RoomId, id: &str, body: &str, created_at: u64) -> Message {
    Message {
        id: MessageId::new(id),
        room_id: room_id.clone(),
        sender_id: "peer-bob".to_string(),
        sender_nickname: Some("bob".to_string()),
        body: body.to_string(),
        created_at,
        state: MessageState::Confirmed,
    }
}

fn spawn_status_printer(
    mut updates: watch::Receiver<ConnectionState>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = *updates.borrow_and_update();
            println!("  [feed] {}", state);
        }
    })
}

async fn wait_for_state(
    updates: &mut watch::Receiver<ConnectionState>,
    target: ConnectionState,
    limit: Duration,
) -> Result<()> {
    tokio::time::timeout(limit, updates.wait_for(|state| *state == target))
        .await
        .with_context(|| format!("Timed out waiting for feed to become {}", target))?
        .context("Feed state channel closed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn default_script_without_file() {
        let script = load_script(None).await.unwrap();
        assert_eq!(script.len(), DEFAULT_SCRIPT.len());
    }

    #[tokio::test]
    async fn script_file_is_one_message_per_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("script.txt");
        tokio::fs::write(&path, "first\n\n*second*\n").await.unwrap();

        let script = load_script(Some(&path)).await.unwrap();

        assert_eq!(script, vec!["first", "", "*second*"]);
    }

    #[tokio::test]
    async fn missing_script_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_script(Some(&dir.path().join("absent.txt"))).await.is_err());
    }

    #[test]
    fn seed_history_is_oldest_first() {
        let history = seed_history(&RoomId::new("general"), 10 * 3_600_000);
        let times: Vec<_> = history.iter().map(|m| m.created_at).collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted);
    }

    #[test]
    fn render_shows_name_age_and_body() {
        let message = peer_message(&RoomId::new("general"), "m1", "<em>hi</em>", 0);
        let line = render_message(&message, 5 * 60_000);

        assert!(line.contains("bob"));
        assert!(line.contains("5m ago"));
        assert!(line.ends_with("<em>hi</em>"));
    }

    #[tokio::test(start_paused = true)]
    async fn demo_runs_end_to_end() {
        let config: Config = toml::from_str("[client]\nreconnect_delay_ms = 100\n").unwrap();
        let script = vec!["hi **there**".to_string(), String::new()];

        run(&config, &script).await.unwrap();
    }
}
