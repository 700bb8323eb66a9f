//! rtt-codec chat demo
//!
//! Alice types a few scripted messages, key by key, into one conversation.
//! Her updates cross a lossy in-memory link into Bob's conversation, whose
//! view of her in-progress text is printed as it changes.
//!
//! Environment variables:
//! - RTT_FLUSH_INTERVAL_MS, RTT_EMBED_DELAYS, RTT_ENABLED,
//!   RTT_SHOW_REMOTE_CURSOR: conversation settings
//! - RTT_DEMO_DROP_EVERY: lose every n-th update on the link (default 0)
//! - RUST_LOG: log filter (default info)

mod script;

use std::time::Duration;

use rtt_codec::prelude::*;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::script::{Keystroke, SCRIPT};

const ALICE: &str = "alice";
const BOB: &str = "bob";

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("invalid RTT_DEMO_DROP_EVERY: {0:?}")]
    DropEvery(String),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn drop_every() -> Result<usize, DemoError> {
    match std::env::var("RTT_DEMO_DROP_EVERY") {
        Ok(raw) => raw.trim().parse().map_err(|_| DemoError::DropEvery(raw)),
        Err(_) => Ok(0),
    }
}

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = RttConfig::from_env()?;
    let link = LossyLink::dropping_every(drop_every()?);
    info!(?config, preset = ?config.preset(), "starting chat demo");

    let alice = shared(Conversation::new(ALICE, config)?);
    let bob = shared(Conversation::new(BOB, config)?);

    let (stop_tx, stop_rx) = watch::channel(false);
    let (wire_tx, mut wire_rx, link_task) = link.spawn(64);

    let typist = FlushDriver::new(alice, wire_tx);
    let flush_task = tokio::spawn(typist.clone().run(stop_rx.clone()));

    let viewer = PlaybackDriver::new(bob.clone());
    let playback_task = tokio::spawn(viewer.clone().run(stop_rx.clone()));

    let receive_task = tokio::spawn(async move {
        while let Some(envelope) = wire_rx.recv().await {
            let outcome = viewer.receive(&ALICE, &envelope).await;
            if outcome.committed {
                println!("[{ALICE}] committed");
            }
        }
    });

    let render_task = tokio::spawn(render(bob.clone(), stop_rx));

    for message in SCRIPT {
        type_message(&typist, message).await?;
    }

    // Let the last update and its playback drain before stopping
    tokio::time::sleep(Duration::from_millis(
        u64::from(config.flush_interval_ms) + 500,
    ))
    .await;
    stop_tx.send_replace(true);

    flush_task.await??;
    drop(typist);
    let stats = link_task.await??;
    receive_task.await?;
    playback_task.await?;
    render_task.await?;

    println!();
    for line in bob.lock().await.lines() {
        println!("{:>6}: {}", line.author, line.text);
    }
    info!(delivered = stats.delivered, dropped = stats.dropped, "link closed");
    Ok(())
}

async fn type_message(
    typist: &FlushDriver<&'static str>,
    message: &[Keystroke],
) -> Result<(), DemoError> {
    let mut text = String::new();
    for keystroke in message {
        match *keystroke {
            Keystroke::Type(chunk) => {
                for c in chunk.chars() {
                    text.push(c);
                    typist.local_edit(&text, text.chars().count()).await;
                    tokio::time::sleep(Duration::from_millis(90)).await;
                }
            }
            Keystroke::Backspace(n) => {
                for _ in 0..n {
                    text.pop();
                    typist.local_edit(&text, text.chars().count()).await;
                    tokio::time::sleep(Duration::from_millis(60)).await;
                }
            }
            Keystroke::Pause(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }
    typist.commit(&text).await?;
    Ok(())
}

/// Print Bob's view of Alice whenever it changes.
async fn render(bob: SharedConversation<&'static str>, mut stop: watch::Receiver<bool>) {
    let mut last = String::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.wait_for(|done| *done) => break,
        }
        let shown = match bob.lock().await.remote_view(&ALICE) {
            Some(view) if view.in_sync => view.text,
            Some(view) => format!("{} (out of sync)", view.text),
            None => String::new(),
        };
        if shown != last {
            println!("[{ALICE} typing] {shown}");
            last = shown;
        }
    }
}
