//! Feed sources.
//!
//! A [`Source`] listens to some radio network feed and turns the traffic it
//! hears into [`Update`]s for the dispatcher. The only production source is
//! [`AprsIsSource`], which speaks the APRS-IS text protocol over TCP; the
//! trait keeps the runtime open to additional networks.

mod aprs_is;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Update;

pub use aprs_is::AprsIsSource;

/// Default APRS-IS server.
pub const DEFAULT_APRS_HOST: &str = "euro.aprs2.net";

/// Default APRS-IS filter port.
pub const DEFAULT_APRS_PORT: u16 = 14580;

/// Login callsign for receive-only sessions.
pub const DEFAULT_LOGIN_CALLSIGN: &str = "NOCALL";

/// Passcode for unverified (receive-only) logins.
pub const DEFAULT_PASSCODE: &str = "-1";

/// Delay between connection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

/// Capacity of the queue between the reader and the packet processor.
pub const DEFAULT_PACKET_QUEUE_CAPACITY: usize = 50;

/// Login callsigns are at most nine characters (base call plus SSID suffix).
const MAX_CALLSIGN_LEN: usize = 9;

/// Errors from a feed source.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The configured login callsign is not usable.
    #[error("invalid login callsign {callsign:?}")]
    InvalidCallsign { callsign: String },

    /// TCP connect failed.
    #[error("failed to connect to {endpoint}: {source}")]
    ConnectError {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Sending the login line failed.
    #[error("failed to log in to {endpoint}: {source}")]
    LoginError {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from an established connection failed.
    #[error("failed to read from feed: {source}")]
    ReadError {
        #[source]
        source: std::io::Error,
    },

    /// The server closed the connection.
    #[error("feed connection closed by server")]
    ConnectionClosed,
}

/// Connection settings for the APRS-IS feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// APRS-IS server to connect to.
    pub host: String,

    /// Port on the server.
    pub port: u16,

    /// Callsign to log in with.
    pub callsign: String,

    /// Login passcode; `-1` requests a receive-only session.
    pub passcode: String,

    /// Server-side filter. Empty means derive one from the roster.
    pub filter: String,

    /// How long to wait after a failed or lost connection before retrying.
    pub reconnect_interval: Duration,

    /// Capacity of the decoded packet queue.
    pub packet_queue_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_APRS_HOST.to_string(),
            port: DEFAULT_APRS_PORT,
            callsign: DEFAULT_LOGIN_CALLSIGN.to_string(),
            passcode: DEFAULT_PASSCODE.to_string(),
            filter: String::new(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            packet_queue_capacity: DEFAULT_PACKET_QUEUE_CAPACITY,
        }
    }
}

impl FeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_callsign(mut self, callsign: impl Into<String>) -> Self {
        self.callsign = callsign.into();
        self
    }

    pub fn with_passcode(mut self, passcode: impl Into<String>) -> Self {
        self.passcode = passcode.into();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// The `host:port` pair to dial.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A feed of status updates heard on some radio network.
pub trait Source: Send {
    /// Short name recorded on every update this source produces.
    fn name(&self) -> &'static str;

    /// Listen to the feed and push updates into the queue until the token
    /// is cancelled.
    fn run(
        self: Box<Self>,
        updates: mpsc::Sender<Update>,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), FeedError>> + Send>>;
}

/// Normalize a login callsign: trimmed and upper-cased, at most nine
/// characters, ASCII letters, digits and `-` only.
pub fn normalize_callsign(raw: &str) -> Result<String, FeedError> {
    let callsign = raw.trim().to_uppercase();
    let valid = !callsign.is_empty()
        && callsign.len() <= MAX_CALLSIGN_LEN
        && callsign
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(FeedError::InvalidCallsign {
            callsign: raw.to_string(),
        });
    }
    Ok(callsign)
}
