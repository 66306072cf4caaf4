//! Tracing setup for the artwise server.
//!
//! Board crates log at the requested level; the HTTP stack underneath
//! (hyper, reqwest, tungstenite) is held at `warn` unless `RUST_LOG` says
//! otherwise, since per-request and per-frame chatter drowns the board events.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const BOARD_TARGETS: &[&str] = &["artwise_core", "artwise_gocd", "artwised"];
const TRANSPORT_TARGETS: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "tungstenite",
    "tokio_tungstenite",
];

/// `EnvFilter` directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let board = BOARD_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"));
    let transport = TRANSPORT_TARGETS.iter().map(|target| format!("{target}=warn"));
    std::iter::once(level.clone())
        .chain(board)
        .chain(transport)
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. `json` switches to newline-delimited JSON
/// lines. Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}
