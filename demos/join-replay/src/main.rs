//! Replays recorded join events through Nameguard.
//!
//! Reads one JSON login event per line from stdin:
//!
//! ```text
//! {"name":"Alice","identity_key":"uuid-1","origin_address":"1.1.1.1"}
//! ```
//!
//! and writes one JSON decision per line to stdout. Logs go to stderr;
//! filter them with `RUST_LOG`.
//!
//! ```text
//! cargo run -p join-replay < logins.jsonl
//! cargo run -p join-replay --features mysql -- nameguard.toml < logins.jsonl
//! ```

use nameguard::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// A replayed player: kicking just logs.
struct ReplaySession {
    name: String,
}

impl LoginSession for ReplaySession {
    async fn reject(&self, message: &str) {
        tracing::info!(name = %self.name, %message, "player kicked");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => NameguardConfig::load(path)?,
        None => NameguardConfig::default(),
    };

    #[cfg(feature = "mysql")]
    let guard = NameGuard::connect(&config).await?;
    #[cfg(not(feature = "mysql"))]
    let guard =
        NameGuardBuilder::from_config(&config).build(MemoryBindingStore::new());

    tracing::info!("nameguard enabled");
    replay(&guard).await?;

    #[cfg(feature = "mysql")]
    guard.store().close().await;
    tracing::info!("nameguard disabled");
    Ok(())
}

async fn replay<S: BindingStore>(guard: &NameGuard<S>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut line_no: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let event: LoginEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping unparseable event");
                continue;
            }
        };

        let session = ReplaySession {
            name: event.name.clone(),
        };
        let decision = guard.on_login(&event, &session).await;

        let record = serde_json::json!({
            "line": line_no,
            "name": event.name,
            "identity_key": event.identity_key,
            "decision": decision.label(),
            "detail": decision.to_string(),
        });
        stdout.write_all(format!("{record}\n").as_bytes()).await?;
    }

    stdout.flush().await
}
