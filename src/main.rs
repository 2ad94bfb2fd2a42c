//! ytbridge - drive the bridge from the command line
//!
//! Reads one JSON command per line on stdin, feeds it to a bridge backed by
//! the simulated player, and prints every outbound event as one JSON line on
//! stdout. Logs go to stderr (`RUST_LOG` controls the level).
//!
//! ```text
//! {"tag":"LoadVideo","data":{"playerID":"player","youTubeID":"abc123"}}
//! {"tag":"PlayVideo"}
//! {"tag":"SeekTo","data":30}
//! {"tag":"GetPlayerCurrTime"}
//! ```

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ytbridge::sim::{SimulatedEnvironment, SimulatedFactory};
use ytbridge::{AssetMode, Bridge, BridgeConfig, Command, ScriptEnvironment};

/// Delay before the simulated document reports the player script as loaded
const SCRIPT_READY_DELAY: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = BridgeConfig::from_env();
    info!("Starting ytbridge ({:?})", config.asset);

    let environment: Option<Box<dyn ScriptEnvironment>> = match config.asset {
        AssetMode::Immediate => None,
        AssetMode::Deferred { .. } => Some(Box::new(
            SimulatedEnvironment::new().with_auto_fire(SCRIPT_READY_DELAY),
        )),
    };
    let factory = SimulatedFactory::new().with_auto_status();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let bridge = Bridge::new(config, Box::new(factory), environment, event_tx)?;
    let bridge_task = tokio::spawn(bridge.run(command_rx));

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event.to_json() {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to encode {:?}: {}", event, e),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Command::from_json(line) {
            Ok(command) => {
                if command_tx.send(command).is_err() {
                    error!("Bridge stopped, no longer reading input");
                    break;
                }
            }
            Err(e) => warn!("Skipping input line: {}", e),
        }
    }

    drop(command_tx);
    bridge_task.await?;
    printer.await?;
    info!("ytbridge stopped");
    Ok(())
}
