//! Integration test for the complete bridge workflow.
//!
//! Drives the assembled runtime through the library's public API only: a
//! scripted APRS-IS server on a loopback socket feeds a position report and
//! a scripted presence platform records what gets published. No external
//! services are involved.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use aprstatus::config::Config;
use aprstatus::dispatch::DispatchConfig;
use aprstatus::feed::{AprsIsSource, FeedConfig, Source};
use aprstatus::geo::{GeoError, GeoResolver, Location};
use aprstatus::platform::{PlatformError, PlatformUser, PresenceClient};
use aprstatus::runtime::StatusRuntime;

/// Presence platform double recording every mutating call.
#[derive(Default)]
struct ScriptedPresence {
    users: Vec<PlatformUser>,
    statuses: Mutex<Vec<(String, String, String)>>,
    posts: Mutex<Vec<(String, String)>>,
}

impl PresenceClient for ScriptedPresence {
    async fn list_users(&self) -> Result<Vec<PlatformUser>, PlatformError> {
        Ok(self.users.clone())
    }

    async fn set_status(
        &self,
        user_id: &str,
        text: &str,
        emoji: &str,
        _expires_at: i64,
    ) -> Result<(), PlatformError> {
        self.statuses.lock().unwrap().push((
            user_id.to_string(),
            text.to_string(),
            emoji.to_string(),
        ));
        Ok(())
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), PlatformError> {
        self.posts
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Resolver double standing in for an unreachable lookup service.
struct UnreachableGeo;

impl GeoResolver for UnreachableGeo {
    async fn reverse_lookup(&self, _latitude: f64, _longitude: f64) -> Result<Location, GeoError> {
        Err(GeoError::HttpError("no route to host".to_string()))
    }
}

fn directory_user() -> PlatformUser {
    PlatformUser {
        id: "U7".to_string(),
        name: "erika".to_string(),
        real_name: "Erika Muster HB9XYZ".to_string(),
        display_name: String::new(),
        deleted: false,
    }
}

#[tokio::test]
async fn test_heard_position_reaches_the_platform() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let port = listener.local_addr().expect("local addr").port();

    let hold_open = CancellationToken::new();
    let server_hold = hold_open.clone();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept should succeed");
        let mut reader = BufReader::new(stream);
        let mut login = String::new();
        reader.read_line(&mut login).await.expect("login expected");

        let stream = reader.get_mut();
        stream
            .write_all(b"# aprsc 2.1.15\r\n")
            .await
            .expect("banner write should succeed");
        stream
            .write_all(b"HB9XYZ-9>APRS,TCPIP*:=4600.00N/00700.00E&testing\r\n")
            .await
            .expect("packet write should succeed");

        server_hold.cancelled().await;
        login
    });

    let client = Arc::new(ScriptedPresence {
        users: vec![directory_user()],
        ..ScriptedPresence::default()
    });
    let config = Config::default()
        .with_feed(
            FeedConfig::default()
                .with_server("127.0.0.1", port)
                .with_callsign("HB9ZZ"),
        )
        .with_dispatch(DispatchConfig::default().with_channel("C123"));

    let feed_config = config.feed.clone();
    let runtime = StatusRuntime::start_with_sources(config, client, |roster| {
        let source = AprsIsSource::new(feed_config, roster, UnreachableGeo)?;
        Ok(vec![Box::new(source) as Box<dyn Source>])
    })
    .await
    .expect("runtime should start");

    // Everything below reads through the runtime's own client handle.
    let client = runtime.client();

    // The channel announcement is the last step of a dispatch, so once it
    // shows up the status call has happened too.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while client.posts.lock().unwrap().is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for the update to be published"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let statuses = client.statuses.lock().unwrap().clone();
    assert_eq!(statuses.len(), 1);
    let (user_id, text, emoji) = &statuses[0];
    assert_eq!(user_id, "U7");
    assert_eq!(emoji, ":pager:");
    assert_eq!(
        text,
        "testing in 46.00000N 7.00000E (https://aprs.fi/HB9XYZ-9)"
    );

    let posts = client.posts.lock().unwrap().clone();
    assert_eq!(
        posts[0],
        (
            "C123".to_string(),
            "HB9XYZ via APRS: :pager: testing in 46.00000N 7.00000E (https://aprs.fi/HB9XYZ-9)"
                .to_string()
        )
    );

    hold_open.cancel();
    let login = timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop")
        .expect("server task should not panic");
    // No explicit filter was configured, so the login derives one from the
    // roster built by the initial directory refresh.
    assert!(
        login.contains("filter p/hb9xyz"),
        "unexpected login line: {login}"
    );

    timeout(Duration::from_secs(5), runtime.shutdown())
        .await
        .expect("runtime should shut down");
}
