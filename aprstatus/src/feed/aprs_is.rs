//! APRS-IS feed source.
//!
//! Maintains one TCP connection to an APRS-IS server, logging in with the
//! configured callsign and a server-side filter, and feeds every decoded
//! packet to a [`PacketProcessor`]. A failed or dropped connection moves the
//! source back to disconnected; it waits out the reconnect interval and
//! dials again, deriving a fresh filter from the roster so operators added
//! since the last attempt are picked up.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::Update;
use crate::geo::GeoResolver;
use crate::packet::{parse_line, Packet};
use crate::processor::PacketProcessor;
use crate::roster::Roster;

use super::{normalize_callsign, FeedConfig, FeedError, Source};

/// Name stamped on every update heard over APRS-IS.
const SOURCE_NAME: &str = "APRS";

/// Feed source speaking the APRS-IS text protocol.
pub struct AprsIsSource<G> {
    config: FeedConfig,
    roster: Arc<Roster>,
    processor: PacketProcessor<G>,
}

impl<G: GeoResolver + 'static> AprsIsSource<G> {
    /// Create the source, validating and normalizing the login callsign.
    pub fn new(config: FeedConfig, roster: Arc<Roster>, geo: G) -> Result<Self, FeedError> {
        let mut config = config;
        config.callsign = normalize_callsign(&config.callsign)?;
        Ok(Self {
            config,
            roster,
            processor: PacketProcessor::new(geo, SOURCE_NAME),
        })
    }

    async fn run_loop(
        self,
        updates: mpsc::Sender<Update>,
        shutdown: CancellationToken,
    ) -> Result<(), FeedError> {
        let Self {
            config,
            roster,
            processor,
        } = self;

        let (packet_tx, packet_rx) = mpsc::channel(config.packet_queue_capacity);
        let processor_handle = tokio::spawn(processor.run(packet_rx, updates, shutdown.clone()));

        let endpoint = config.endpoint();
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let filter = derive_filter(&config.filter, &roster);
            info!(endpoint = %endpoint, filter = %filter, "connecting to APRS-IS");
            let login = login_line(&config.callsign, &config.passcode, &filter);

            let connected = tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                connected = connect_and_login(&endpoint, &login) => connected,
            };

            match connected {
                Ok(reader) => {
                    info!(endpoint = %endpoint, callsign = %config.callsign, "logged in to APRS-IS");
                    match read_packets(reader, &packet_tx, &shutdown).await {
                        // Cancelled, or the processor side went away.
                        Ok(()) => break,
                        Err(error) => {
                            warn!(endpoint = %endpoint, %error, "feed connection lost");
                        }
                    }
                }
                Err(error) => {
                    warn!(endpoint = %endpoint, %error, "connection attempt failed");
                }
            }

            debug!(
                seconds = config.reconnect_interval.as_secs(),
                "waiting before next connection attempt"
            );
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                () = tokio::time::sleep(config.reconnect_interval) => {}
            }
        }

        drop(packet_tx);
        if let Err(error) = processor_handle.await {
            warn!(%error, "packet processor task failed");
        }
        info!("APRS-IS source stopped");
        Ok(())
    }
}

impl<G: GeoResolver + 'static> Source for AprsIsSource<G> {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn run(
        self: Box<Self>,
        updates: mpsc::Sender<Update>,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), FeedError>> + Send>> {
        Box::pin(self.run_loop(updates, shutdown))
    }
}

/// The login line sent right after connecting.
fn login_line(callsign: &str, passcode: &str, filter: &str) -> String {
    format!(
        "user {} pass {} vers {} {} filter {}\r\n",
        callsign,
        passcode,
        env!("CARGO_PKG_NAME"),
        crate::VERSION,
        filter
    )
}

/// Server-side filter for this connection attempt. An explicitly configured
/// filter wins; otherwise ask for prefix matches on every roster callsign.
fn derive_filter(configured: &str, roster: &Roster) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    let mut parts = vec!["p".to_string()];
    parts.extend(
        roster
            .callsigns()
            .into_iter()
            .map(|callsign| callsign.to_lowercase()),
    );
    parts.join("/")
}

async fn connect_and_login(endpoint: &str, login: &str) -> Result<BufReader<TcpStream>, FeedError> {
    let stream =
        TcpStream::connect(endpoint)
            .await
            .map_err(|source| FeedError::ConnectError {
                endpoint: endpoint.to_string(),
                source,
            })?;
    let mut reader = BufReader::new(stream);
    reader
        .get_mut()
        .write_all(login.as_bytes())
        .await
        .map_err(|source| FeedError::LoginError {
            endpoint: endpoint.to_string(),
            source,
        })?;
    Ok(reader)
}

/// Read lines until cancellation, EOF or a socket error. Server chatter
/// (lines starting with `#`) and unparsable lines are skipped; bytes that
/// are not valid UTF-8 are decoded lossily.
async fn read_packets(
    mut reader: BufReader<TcpStream>,
    packets: &mpsc::Sender<Packet>,
    shutdown: &CancellationToken,
) -> Result<(), FeedError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(()),
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => return Err(FeedError::ConnectionClosed),
            Ok(_) => {
                // Comments on live traffic are not always valid UTF-8
                // (Latin-1 degree signs are common); one bad byte must not
                // cost the whole connection.
                let line = String::from_utf8_lossy(&buf);
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(chatter) = trimmed.strip_prefix('#') {
                    debug!(message = %chatter.trim(), "server message");
                    continue;
                }
                match parse_line(trimmed) {
                    Ok(packet) => {
                        let sent = tokio::select! {
                            biased;

                            _ = shutdown.cancelled() => return Ok(()),
                            sent = packets.send(packet) => sent,
                        };
                        if sent.is_err() {
                            return Ok(());
                        }
                    }
                    Err(error) => {
                        debug!(line = %trimmed, %error, "skipping unparsable line");
                    }
                }
            }
            Err(source) => return Err(FeedError::ReadError { source }),
        }
    }
}
