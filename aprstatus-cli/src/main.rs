//! aprstatus CLI - run the APRS-to-status bridge.
//!
//! This binary wires the library's runtime to command-line flags and runs
//! until interrupted.

mod error;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use aprstatus::config::Config;
use aprstatus::dispatch::DispatchConfig;
use aprstatus::feed::FeedConfig;
use aprstatus::logging::{default_log_file, init_logging_full};
use aprstatus::platform::PlatformConfig;
use aprstatus::runtime::StatusRuntime;

use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "aprstatus")]
#[command(about = "Publish APRS position reports as team chat statuses", long_about = None)]
struct Args {
    /// APRS-IS server to connect to
    #[arg(long, default_value = "euro.aprs2.net")]
    aprs_server: String,

    /// Port to connect to on the APRS-IS server
    #[arg(long, default_value = "14580")]
    aprs_port: u16,

    /// Callsign to log in with on APRS-IS
    #[arg(long, default_value = "NOCALL")]
    aprs_callsign: String,

    /// APRS-IS login passcode (-1 for a receive-only session)
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    aprs_passcode: String,

    /// APRS-IS filter; empty derives one from the roster callsigns
    #[arg(long, default_value = "")]
    aprs_filter: String,

    /// Seconds to wait before redialing a failed or lost connection
    #[arg(long, default_value = "30")]
    aprs_reconnect_interval_secs: u64,

    /// Token to use to talk to Slack
    #[arg(long, default_value = "")]
    slack_token: String,

    /// ID of the Slack channel to announce updates in; empty disables
    #[arg(long, default_value = "")]
    slack_channel: String,

    /// Seconds after which a published status expires
    #[arg(long, default_value = "600")]
    slack_expiration_secs: u64,

    /// Do not update a user's status more often than this, in seconds
    #[arg(long, default_value = "60")]
    slack_update_interval_secs: u64,

    /// Seconds between roster refreshes from the user directory
    #[arg(long, default_value = "1800")]
    refresh_interval_secs: u64,

    /// Log what would be published instead of publishing it
    #[arg(long)]
    dry: bool,

    /// Directory for log files (default: ~/.aprstatus/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug-level logging regardless of RUST_LOG
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> Config {
        let feed = FeedConfig::default()
            .with_server(self.aprs_server.clone(), self.aprs_port)
            .with_callsign(self.aprs_callsign.clone())
            .with_passcode(self.aprs_passcode.clone())
            .with_filter(self.aprs_filter.clone())
            .with_reconnect_interval(Duration::from_secs(self.aprs_reconnect_interval_secs));

        let mut dispatch = DispatchConfig::default()
            .with_min_update_interval(Duration::from_secs(self.slack_update_interval_secs))
            .with_expiration(Duration::from_secs(self.slack_expiration_secs))
            .with_dry_run(self.dry);
        if !self.slack_channel.is_empty() {
            dispatch = dispatch.with_channel(self.slack_channel.clone());
        }

        Config::default()
            .with_feed(feed)
            .with_platform(PlatformConfig::default().with_token(self.slack_token.clone()))
            .with_dispatch(dispatch)
            .with_roster_refresh_interval(Duration::from_secs(self.refresh_interval_secs))
    }

    fn log_dir(&self) -> String {
        match &self.log_dir {
            Some(dir) => dir.to_string_lossy().to_string(),
            None => default_log_dir(),
        }
    }
}

/// Per-user log directory, falling back to a relative path when no home
/// directory is known.
fn default_log_dir() -> String {
    dirs::home_dir()
        .map(|home| {
            home.join(".aprstatus")
                .join("logs")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| aprstatus::logging::default_log_dir().to_string())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(error) = run(args).await {
        error.exit();
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let log_dir = args.log_dir();
    let _logging_guard = init_logging_full(&log_dir, default_log_file(), true, args.debug)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    info!("aprstatus v{}", aprstatus::VERSION);
    if args.dry {
        info!("dry mode, statuses will be logged instead of published");
    }

    let runtime = StatusRuntime::start(args.config())
        .await
        .map_err(CliError::Runtime)?;

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, shutting down"),
        Err(error) => error!(%error, "failed to listen for shutdown signal, stopping"),
    }

    runtime.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_public_aprs_is() {
        let args = Args::try_parse_from(["aprstatus"]).expect("defaults should parse");
        assert_eq!(args.aprs_server, "euro.aprs2.net");
        assert_eq!(args.aprs_port, 14580);
        assert_eq!(args.aprs_callsign, "NOCALL");
        assert_eq!(args.aprs_passcode, "-1");
        assert!(args.aprs_filter.is_empty());
        assert!(!args.dry);
    }

    #[test]
    fn test_flags_flow_into_the_config() {
        let args = Args::try_parse_from([
            "aprstatus",
            "--aprs-server",
            "rotate.aprs2.net",
            "--aprs-callsign",
            "hb9abc",
            "--slack-token",
            "xoxp-test",
            "--slack-channel",
            "C123",
            "--slack-update-interval-secs",
            "120",
            "--dry",
        ])
        .expect("flags should parse");

        let config = args.config();
        assert_eq!(config.feed.host, "rotate.aprs2.net");
        assert_eq!(config.feed.callsign, "hb9abc");
        assert_eq!(config.platform.token, "xoxp-test");
        assert_eq!(config.dispatch.channel.as_deref(), Some("C123"));
        assert_eq!(
            config.dispatch.min_update_interval,
            Duration::from_secs(120)
        );
        assert!(config.dispatch.dry_run);
    }

    #[test]
    fn test_empty_channel_disables_announcements() {
        let args = Args::try_parse_from(["aprstatus"]).expect("defaults should parse");
        assert!(args.config().dispatch.channel.is_none());
    }

    #[test]
    fn test_negative_passcode_parses() {
        let args = Args::try_parse_from(["aprstatus", "--aprs-passcode", "-1"])
            .expect("negative passcode should parse");
        assert_eq!(args.aprs_passcode, "-1");
    }

    #[test]
    fn test_explicit_log_dir_wins() {
        let args = Args::try_parse_from(["aprstatus", "--log-dir", "/tmp/aprstatus-logs"])
            .expect("log dir should parse");
        assert_eq!(args.log_dir(), "/tmp/aprstatus-logs");
    }
}
