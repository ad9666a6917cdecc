//! Status dispatch.
//!
//! Receives [`Update`]s from the feed sources, resolves the callsign against
//! the roster and publishes the status through the platform client. Each
//! operator is rate limited: once an update is accepted for a callsign,
//! further updates are withheld until the configured interval has passed,
//! whether or not the delivery itself succeeded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::platform::PresenceClient;
use crate::roster::Roster;

/// Minimum time between two published statuses for the same operator.
pub const DEFAULT_MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// How long a published status stays visible before the platform clears it.
pub const DEFAULT_STATUS_EXPIRATION: Duration = Duration::from_secs(600);

/// Capacity of the update queue between the sources and the dispatcher.
pub const DEFAULT_UPDATE_QUEUE_CAPACITY: usize = 5;

/// A status update produced by a feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Callsign the status belongs to, as heard on the air.
    pub callsign: String,
    /// Status text to publish.
    pub status: String,
    /// Emoji shorthand shown next to the status.
    pub icon: String,
    /// Name of the source that heard the transmission.
    pub source: &'static str,
}

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub min_update_interval: Duration,
    pub expiration: Duration,
    /// Channel to announce accepted updates in, when set.
    pub channel: Option<String>,
    /// Log deliveries instead of performing them.
    pub dry_run: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_update_interval: DEFAULT_MIN_UPDATE_INTERVAL,
            expiration: DEFAULT_STATUS_EXPIRATION,
            channel: None,
            dry_run: false,
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_update_interval(mut self, interval: Duration) -> Self {
        self.min_update_interval = interval;
        self
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// How a single update was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Status published, rate-limit window opened.
    Delivered,
    /// Publishing failed; the rate-limit window opened anyway.
    DeliveryFailed,
    /// Dry run, nothing sent.
    DryRun,
    /// Withheld, the operator was updated too recently.
    RateLimited,
    /// No roster entry for the callsign.
    UnknownOperator,
}

/// Drains the update queue and publishes statuses until shut down.
pub struct DispatchDaemon<C> {
    update_rx: mpsc::Receiver<Update>,
    roster: Arc<Roster>,
    client: Arc<C>,
    config: DispatchConfig,
}

impl<C: PresenceClient> DispatchDaemon<C> {
    /// Create the daemon and the sender half of its update queue.
    pub fn new(
        roster: Arc<Roster>,
        client: Arc<C>,
        config: DispatchConfig,
    ) -> (Self, mpsc::Sender<Update>) {
        let (update_tx, update_rx) = mpsc::channel(DEFAULT_UPDATE_QUEUE_CAPACITY);
        (
            Self {
                update_rx,
                roster,
                client,
                config,
            },
            update_tx,
        )
    }

    /// Process updates until the token is cancelled or every sender is gone.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("status dispatcher started");
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("status dispatcher shutting down");
                    break;
                }

                update = self.update_rx.recv() => {
                    match update {
                        Some(update) => {
                            self.dispatch(update).await;
                        }
                        None => {
                            info!("update queue closed, stopping dispatcher");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&self, update: Update) -> DispatchOutcome {
        self.dispatch_at(update, Utc::now()).await
    }

    async fn dispatch_at(&self, update: Update, now: DateTime<Utc>) -> DispatchOutcome {
        let Some(operator) = self.roster.lookup(&update.callsign) else {
            debug!(callsign = %update.callsign, "no operator for callsign");
            return DispatchOutcome::UnknownOperator;
        };

        if let Some(last) = operator.last_update {
            // A last update in the future (clock skew) also withholds.
            let withheld = now
                .signed_duration_since(last)
                .to_std()
                .map(|elapsed| elapsed < self.config.min_update_interval)
                .unwrap_or(true);
            if withheld {
                debug!(
                    callsign = %update.callsign,
                    last_update = %last,
                    last_source = %operator.last_update_source,
                    "withholding update, operator was updated recently"
                );
                return DispatchOutcome::RateLimited;
            }
        }

        // Stamp the record before any network call so a failed delivery
        // still opens the rate-limit window.
        self.roster.mark_updated(&update.callsign, now, update.source);

        if self.config.dry_run {
            info!(
                operator = %operator.display_name,
                status = %update.status,
                icon = %update.icon,
                "dry run, skipping delivery"
            );
            return DispatchOutcome::DryRun;
        }

        let expires_at = now.timestamp() + self.config.expiration.as_secs() as i64;
        let outcome = match self
            .client
            .set_status(&operator.user_id, &update.status, &update.icon, expires_at)
            .await
        {
            Ok(()) => {
                info!(
                    operator = %operator.display_name,
                    status = %update.status,
                    "status updated"
                );
                DispatchOutcome::Delivered
            }
            Err(error) => {
                warn!(operator = %operator.display_name, %error, "failed to set status");
                DispatchOutcome::DeliveryFailed
            }
        };

        // The channel announcement goes out even when the profile update
        // failed.
        if let Some(channel) = &self.config.channel {
            let text = format!(
                "{} via {}: {} {}",
                update.callsign, update.source, update.icon, update.status
            );
            if let Err(error) = self.client.post_message(channel, &text).await {
                warn!(channel = %channel, %error, "failed to announce update in channel");
            }
        }

        outcome
    }
}
