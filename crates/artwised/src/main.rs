//! artwised: serves pipeline boards over HTTP and websockets.

mod routes;
mod state;
mod ws;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use artwise_core::domain::Grid;
use artwise_core::telemetry::init_tracing;
use artwise_core::{BoardConfig, BuildNumber, Fixture, Sources, VERSION};
use artwise_gocd::{GocdClient, GocdConfig};
use clap::Parser;
use tracing::{info, Level};

use crate::state::AppState;

const FAKE_PIPELINE: &str = "artwise";

#[derive(Parser, Debug)]
#[command(name = "artwised", version, about = "Pipeline history boards for GoCD")]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    #[arg(long, env = "GOCD_URL")]
    gocd_url: Option<String>,

    /// Pipelines to watch; the first one is served when `?pipeline=` is absent
    #[arg(long, env = "GOCD_PIPELINE", value_delimiter = ',')]
    gocd_pipeline: Vec<String>,

    #[arg(long, env = "GOCD_USER")]
    gocd_user: Option<String>,

    #[arg(long, env = "GOCD_PASSWORD", hide_env_values = true)]
    gocd_password: Option<String>,

    /// Serve recorded data from a JSON fixture instead of a GoCD server
    #[arg(long, env = "ARTWISE_FAKE")]
    fake: Option<PathBuf>,

    #[arg(long, env = "HARING_ROWS", default_value_t = 4)]
    rows: usize,

    #[arg(long, env = "HARING_COLS", default_value_t = 6)]
    cols: usize,

    /// Seconds between board pushes
    #[arg(long, env = "HARING_POLL_INTERVAL", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    #[arg(long, env = "HARING_FOUR_IN_A_ROW", default_value_t = true, action = clap::ArgAction::Set)]
    four_in_a_row: bool,

    /// Build numbers to leave out of the history
    #[arg(long, env = "GOCD_EXCLUDE", value_delimiter = ',')]
    exclude: Vec<BuildNumber>,

    #[arg(long, env = "ARTWISE_HISTORY_LIMIT", default_value_t = 100)]
    history_limit: usize,

    #[arg(long, env = "ARTWISE_REFRESH_INTERVAL", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    refresh_interval: u64,

    #[arg(long, env = "ARTWISE_PING_INTERVAL", default_value_t = 30)]
    ping_interval: u64,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn board_config(&self) -> BoardConfig {
        BoardConfig {
            grid: Grid::new(self.rows, self.cols),
            poll_interval_secs: self.poll_interval,
            four_in_a_row: self.four_in_a_row,
            exclude: self.exclude.clone(),
            history_limit: self.history_limit,
            refresh_interval_secs: self.refresh_interval,
            ping_interval_secs: self.ping_interval,
            ..BoardConfig::default()
        }
    }

    /// Named sources, one per watched pipeline. A fixture backs a single
    /// pipeline.
    fn sources(&self) -> Result<Vec<(String, Sources)>> {
        if let Some(path) = &self.fake {
            info!(fixture = %path.display(), "Faking GoCD from fixture");
            let fixture = Fixture::from_file(path)
                .with_context(|| format!("reading fixture {}", path.display()))?;
            let name = self
                .gocd_pipeline
                .first()
                .cloned()
                .unwrap_or_else(|| FAKE_PIPELINE.to_string());
            return Ok(vec![(name, fixture.into_sources())]);
        }

        let url = self.gocd_url.as_deref().context("GOCD_URL or --fake is required")?;
        if self.gocd_pipeline.is_empty() {
            bail!("GOCD_PIPELINE is required");
        }
        self.gocd_pipeline
            .iter()
            .map(|pipeline| {
                let mut config = GocdConfig::new(url, pipeline);
                if let (Some(user), Some(password)) = (&self.gocd_user, &self.gocd_password) {
                    config = config.with_credentials(user, password);
                }
                let client = GocdClient::new(config)
                    .with_context(|| format!("building GoCD client for {pipeline}"))?;
                Ok((pipeline.clone(), Sources::from_client(Arc::new(client))))
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json, if args.verbose { Level::DEBUG } else { Level::INFO });

    let state = AppState::new(args.sources()?, args.board_config())?;
    for (pipeline, board) in state.boards() {
        info!(pipeline, "Watching pipeline");
        board.monitor.clone().spawn_refresh_loop();
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(version = VERSION, %addr, "artwised listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    axum::serve(listener, routes::router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    artwise_core::metrics::METRICS.flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_into_board_config() {
        let args = Args::parse_from([
            "artwised",
            "--rows",
            "3",
            "--cols",
            "8",
            "--four-in-a-row",
            "false",
            "--exclude",
            "12,13",
        ]);
        let config = args.board_config();
        assert_eq!(config.grid.capacity(), 24);
        assert!(!config.four_in_a_row);
        assert_eq!(config.exclude, vec![BuildNumber::new(12), BuildNumber::new(13)]);
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn test_missing_gocd_url_is_an_error() {
        let mut args = Args::parse_from(["artwised"]);
        args.gocd_url = None;
        args.fake = None;
        let err = args.sources().err().expect("expected an error");
        assert!(err.to_string().contains("GOCD_URL"));
    }

    #[test]
    fn test_missing_pipeline_is_an_error() {
        let mut args = Args::parse_from(["artwised"]);
        args.gocd_url = Some("http://gocd.example".to_string());
        args.gocd_pipeline = Vec::new();
        args.fake = None;
        let err = args.sources().err().expect("expected an error");
        assert!(err.to_string().contains("GOCD_PIPELINE"));
    }

    #[test]
    fn test_one_source_per_pipeline() {
        let mut args = Args::parse_from(["artwised", "--gocd-pipeline", "web,api"]);
        args.gocd_url = Some("http://gocd.example".to_string());
        args.fake = None;
        let names: Vec<String> = args.sources().unwrap().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["web", "api"]);
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        assert!(Args::try_parse_from(["artwised", "--poll-interval", "0"]).is_err());
        assert!(Args::try_parse_from(["artwised", "--refresh-interval", "0"]).is_err());
        assert!(Args::try_parse_from(["artwised", "--poll-interval", "1"]).is_ok());
    }
}
