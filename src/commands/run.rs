//! Panel event loop
//!
//! Loads settings, connects to the companion and drives the controller from
//! companion messages, deferred lock transitions and taps typed on stdin.
//! Settings are written back when the loop ends.

use std::io::IsTerminal;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

use crate::config::RuntimeContext;
use crate::controller::{Controller, DeadboltPolicy};
use crate::i18n::Catalog;
use crate::peer::{PeerEvent, PeerLink};
use crate::scheduler::LockTimerFired;
use crate::settings::SettingsStore;
use crate::view::{ListView, TerminalView};

/// A line typed by the user
#[derive(Debug, PartialEq, Eq)]
enum TapInput {
    /// Zero-based row to activate
    Row(usize),
    Quit,
    Ignore,
}

fn parse_tap(line: &str) -> TapInput {
    let line = line.trim();
    match line {
        "" => TapInput::Ignore,
        "q" | "quit" | "exit" => TapInput::Quit,
        _ => match line.parse::<usize>() {
            Ok(row) if row > 0 => TapInput::Row(row - 1),
            _ => {
                log::warn!("Enter a row number to tap it, or 'q' to quit");
                TapInput::Ignore
            }
        },
    }
}

/// Why the event loop stopped
#[derive(Debug, PartialEq, Eq)]
enum Stop {
    Quit,
    Interrupted,
    LinkEnded,
}

pub async fn run(ctx: &RuntimeContext) -> Result<()> {
    let store = SettingsStore::new(ctx.settings_path()?);
    let settings = store.load();

    let deadbolt = DeadboltPolicy::from_config(&ctx.config.deadbolt)?;
    let catalog = Catalog::with_overrides(&ctx.config.labels);

    let mut link = PeerLink::spawn(ctx.peer_url().to_string(), &ctx.config.peer);
    let (mut controller, mut timers) = Controller::new(
        settings,
        TerminalView::stdout(),
        catalog,
        deadbolt,
        link.outbox.clone(),
    );

    // Without a terminal there is nobody to tap; run until Ctrl+C or the link ends
    let taps = std::io::stdin()
        .is_terminal()
        .then(|| BufReader::new(tokio::io::stdin()).lines());

    let stop = drive(&mut controller, &mut link.events, &mut timers, taps).await;
    log::debug!("Stopping: {stop:?}");

    log::info!(
        "Saving settings with {} entities shown",
        controller.entities().len()
    );
    let settings = controller.into_settings();
    link.close().await;
    store.save(&settings)
}

/// Run the panel until the user quits, Ctrl+C arrives or the link ends.
///
/// Never fails, so the caller always gets to save settings.
async fn drive<V, R>(
    controller: &mut Controller<V>,
    events: &mut mpsc::Receiver<PeerEvent>,
    timers: &mut mpsc::UnboundedReceiver<LockTimerFired>,
    mut taps: Option<Lines<R>>,
) -> Stop
where
    V: ListView,
    R: AsyncBufRead + Unpin,
{
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PeerEvent::Open) => controller.on_open(),
                Some(PeerEvent::Message(msg)) => controller.handle(msg),
                Some(PeerEvent::Closed) => log::debug!("Waiting for companion to reconnect"),
                None => {
                    log::warn!("Companion link ended");
                    return Stop::LinkEnded;
                }
            },
            Some(fired) = timers.recv() => controller.on_lock_timer(fired),
            line = next_tap(&mut taps) => match line {
                Ok(Some(line)) => {
                    if !apply_tap(controller, &line) {
                        return Stop::Quit;
                    }
                }
                Ok(None) => {
                    log::debug!("stdin closed, stopping");
                    return Stop::Quit;
                }
                Err(err) => {
                    log::warn!("Ignoring taps, reading stdin failed: {err}");
                    taps = None;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                log::debug!("Received Ctrl+C, stopping");
                return Stop::Interrupted;
            }
        }
    }
}

/// Next typed line; pends forever once taps are disabled
async fn next_tap<R>(taps: &mut Option<Lines<R>>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    match taps {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

/// Returns false when the user asked to quit
fn apply_tap<V: ListView>(controller: &mut Controller<V>, line: &str) -> bool {
    match parse_tap(line) {
        TapInput::Row(index) => {
            controller.tap(index);
            true
        }
        TapInput::Quit => false,
        TapInput::Ignore => true,
    }
}
