//! Status runtime orchestrator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       StatusRuntime                          │
//! │                                                              │
//! │  ┌────────────┐  Packet   ┌───────────┐  Update  ┌────────┐  │
//! │  │ feed       │──────────►│ packet    │─────────►│ dis-   │  │
//! │  │ sources    │  channel  │ processor │  queue   │ patcher│  │
//! │  └────────────┘           └───────────┘          └───┬────┘  │
//! │        │ filter                  ┌───────────────────┤       │
//! │        ▼                         ▼                   ▼       │
//! │  ┌───────────┐  refresh   ┌─────────────┐     ┌───────────┐  │
//! │  │  roster   │◄───────────│ refresh loop│     │ platform  │  │
//! │  └───────────┘            └─────────────┘     │ client    │  │
//! │                                               └───────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! 1. **Start**: build the roster, run the initial directory refresh, then
//!    spawn dispatcher, refresh loop and sources.
//! 2. **Operation**: sources push updates, the dispatcher publishes them.
//! 3. **Shutdown**: cancel the shared token and wait for every task.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::DispatchDaemon;
use crate::feed::{AprsIsSource, FeedError, Source};
use crate::geo::NominatimResolver;
use crate::platform::{PresenceClient, SlackClient};
use crate::roster::Roster;

/// Errors from starting the runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A feed source could not be created.
    #[error("failed to create feed source: {0}")]
    Feed(#[from] FeedError),
}

/// The running service: roster, dispatcher, refresh loop and feed sources.
pub struct StatusRuntime<C> {
    roster: Arc<Roster>,
    client: Arc<C>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl StatusRuntime<SlackClient> {
    /// Start with the production wiring: Slack as the presence platform and
    /// APRS-IS backed by Nominatim reverse geocoding.
    pub async fn start(config: Config) -> Result<Self, RuntimeError> {
        let client = Arc::new(SlackClient::new(config.platform.token.clone()));
        Self::start_with_client(config, client).await
    }
}

impl<C: PresenceClient + 'static> StatusRuntime<C> {
    /// Start with the default source set but a custom platform client.
    pub async fn start_with_client(config: Config, client: Arc<C>) -> Result<Self, RuntimeError> {
        let feed_config = config.feed.clone();
        Self::start_with_sources(config, client, move |roster| {
            let source = AprsIsSource::new(feed_config, roster, NominatimResolver::new())?;
            Ok(vec![Box::new(source) as Box<dyn Source>])
        })
        .await
    }

    /// Start with a caller-supplied source set.
    ///
    /// The factory runs after the roster exists and after the initial
    /// directory refresh, so sources can derive their filters from a
    /// populated roster. A failed initial refresh is not fatal; the roster
    /// starts empty and the refresh loop keeps trying.
    pub async fn start_with_sources<F>(
        config: Config,
        client: Arc<C>,
        build_sources: F,
    ) -> Result<Self, RuntimeError>
    where
        F: FnOnce(Arc<Roster>) -> Result<Vec<Box<dyn Source>>, FeedError>,
    {
        info!("starting status runtime");

        let roster = Arc::new(Roster::new());
        match roster.refresh(client.as_ref()).await {
            Ok(stats) => info!(
                added = stats.added,
                skipped = stats.skipped,
                "initial roster refresh complete"
            ),
            Err(error) => warn!(%error, "initial roster refresh failed, starting empty"),
        }

        let sources = build_sources(Arc::clone(&roster))?;

        let shutdown = CancellationToken::new();
        let mut handles = Vec::new();

        let (dispatcher, update_tx) = DispatchDaemon::new(
            Arc::clone(&roster),
            Arc::clone(&client),
            config.dispatch.clone(),
        );
        handles.push(tokio::spawn(dispatcher.run(shutdown.clone())));

        handles.push(tokio::spawn(refresh_loop(
            Arc::clone(&roster),
            Arc::clone(&client),
            config.roster_refresh_interval,
            shutdown.clone(),
        )));

        for source in sources {
            let name = source.name();
            info!(source = name, "starting feed source");
            let updates = update_tx.clone();
            let token = shutdown.clone();
            handles.push(tokio::spawn(async move {
                if let Err(error) = source.run(updates, token).await {
                    error!(source = name, %error, "feed source failed");
                }
            }));
        }

        info!("status runtime started");
        Ok(Self {
            roster,
            client,
            shutdown,
            handles,
        })
    }

    /// The shared roster.
    pub fn roster(&self) -> Arc<Roster> {
        Arc::clone(&self.roster)
    }

    /// The platform client the runtime publishes through.
    pub fn client(&self) -> Arc<C> {
        Arc::clone(&self.client)
    }

    /// Token other components can watch to learn about shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop every task and wait for them to finish.
    pub async fn shutdown(self) {
        info!("shutting down status runtime");
        self.shutdown.cancel();
        for result in join_all(self.handles).await {
            if let Err(error) = result {
                error!(%error, "runtime task panicked");
            }
        }
        info!("status runtime stopped");
    }
}

/// Periodically reconcile the roster against the platform directory.
async fn refresh_loop<C: PresenceClient>(
    roster: Arc<Roster>,
    client: Arc<C>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!(interval_secs = interval.as_secs(), "roster refresh loop started");
    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
        match roster.refresh(client.as_ref()).await {
            Ok(stats) => info!(
                added = stats.added,
                updated = stats.updated,
                removed = stats.removed,
                skipped = stats.skipped,
                "roster refreshed"
            ),
            Err(error) => warn!(%error, "roster refresh failed, keeping current mapping"),
        }
    }
    info!("roster refresh loop stopped");
}
