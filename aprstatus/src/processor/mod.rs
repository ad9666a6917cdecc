//! Packet to status conversion.
//!
//! Turns positioned packets into [`Update`]s: picks an icon from the symbol
//! or the SSID, reverse-geocodes the position into a place name (falling
//! back to raw coordinates when the lookup fails) and assembles the status
//! line with a link to the public tracker page for the station.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dispatch::Update;
use crate::geo::{format_position, GeoResolver};
use crate::packet::Packet;

const TRACKER_URL: &str = "https://aprs.fi";

const DEFAULT_ICON: &str = ":pager:";

/// Fallback icon keyed by SSID, after the conventions in
/// <http://www.aprs.org/aprs11/SSIDs.txt> (0 fixed station, 7 handheld,
/// 9 primary mobile, 11 aircraft and balloons, 14 trucker, ...).
fn ssid_icon(ssid: u8) -> Option<&'static str> {
    match ssid {
        0 => Some(":house:"),
        2 => Some(":car:"),
        6 => Some(":rocket:"),
        7 => Some(":runner:"),
        8 => Some(":boat:"),
        9 => Some(":pager:"),
        11 => Some(":airplane:"),
        13 => Some(":cloud:"),
        14 => Some(":truck:"),
        _ => None,
    }
}

/// Icon for a packet: symbol emoji first, SSID fallback second.
fn icon_for(packet: &Packet) -> &'static str {
    if let Some(emoji) = packet.symbol.and_then(|symbol| symbol.emoji()) {
        return emoji;
    }
    ssid_icon(packet.source.ssid).unwrap_or(DEFAULT_ICON)
}

/// Converts decoded packets into status updates.
pub struct PacketProcessor<G> {
    geo: G,
    source_name: &'static str,
}

impl<G: GeoResolver> PacketProcessor<G> {
    pub fn new(geo: G, source_name: &'static str) -> Self {
        Self { geo, source_name }
    }

    /// Drain the packet queue until the token is cancelled or either channel
    /// closes.
    pub async fn run(
        self,
        mut packets: mpsc::Receiver<Packet>,
        updates: mpsc::Sender<Update>,
        shutdown: CancellationToken,
    ) {
        info!("packet processor started");
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("packet processor shutting down");
                    break;
                }

                packet = packets.recv() => {
                    let Some(packet) = packet else {
                        info!("packet queue closed, stopping processor");
                        break;
                    };
                    let Some(update) = self.process(&packet).await else {
                        continue;
                    };
                    let sent = tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => {
                            info!("packet processor shutting down");
                            break;
                        }
                        sent = updates.send(update) => sent,
                    };
                    if sent.is_err() {
                        info!("update queue closed, stopping processor");
                        break;
                    }
                }
            }
        }
    }

    /// Build the status update for one packet. Packets without a position
    /// produce nothing.
    async fn process(&self, packet: &Packet) -> Option<Update> {
        let position = packet.position?;
        let icon = icon_for(packet);

        let mut fragments: Vec<String> = Vec::new();
        if let Some(comment) = &packet.comment {
            fragments.push(comment.clone());
            fragments.push("in".to_string());
        }

        let place = match self
            .geo
            .reverse_lookup(position.latitude, position.longitude)
            .await
        {
            Ok(location) => location.render(),
            Err(error) => {
                info!(station = %packet.source, %error, "reverse lookup failed, using raw position");
                format_position(position.latitude, position.longitude)
            }
        };
        fragments.push(place);
        fragments.push(format!("({TRACKER_URL}/{})", packet.source));

        Some(Update {
            callsign: packet.source.call.clone(),
            status: fragments.join(" "),
            icon: icon.to_string(),
            source: self.source_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::tests::MockGeoResolver;
    use crate::geo::{Address, Location};
    use crate::packet::{Position, Station, Symbol};

    fn positioned(call: &str, ssid: u8, latitude: f64, longitude: f64) -> Packet {
        Packet {
            source: Station {
                call: call.to_string(),
                ssid,
            },
            position: Some(Position {
                latitude,
                longitude,
            }),
            comment: None,
            symbol: Some(Symbol {
                table: '/',
                code: '&',
            }),
        }
    }

    fn bern() -> Location {
        Location {
            address: Some(Address {
                city: "Bern".to_string(),
                country_code: "ch".to_string(),
                ..Address::default()
            }),
            ..Location::default()
        }
    }

    #[tokio::test]
    async fn test_packet_without_position_yields_nothing() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let mut packet = positioned("HB9ABC", 0, 46.0, 7.0);
        packet.position = None;

        assert!(processor.process(&packet).await.is_none());
    }

    #[tokio::test]
    async fn test_ssid_selects_icon() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let packet = positioned("HB9ABC", 6, 46.0, 7.0);

        let update = processor.process(&packet).await.expect("update expected");
        assert_eq!(update.icon, ":rocket:");
    }

    #[tokio::test]
    async fn test_unmapped_ssid_falls_back_to_default_icon() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let packet = positioned("HB9ABC", 99, 46.0, 7.0);

        let update = processor.process(&packet).await.expect("update expected");
        assert_eq!(update.icon, ":pager:");
    }

    #[tokio::test]
    async fn test_symbol_emoji_beats_ssid_icon() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let mut packet = positioned("HB9ABC", 9, 46.0, 7.0);
        packet.symbol = Some(Symbol {
            table: '/',
            code: '>',
        });

        let update = processor.process(&packet).await.expect("update expected");
        assert_eq!(update.icon, ":car:");
    }

    #[tokio::test]
    async fn test_failed_lookup_renders_raw_position() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let mut packet = positioned("HB9XYZ", 9, 46.0, 7.0);
        packet.comment = Some("testing".to_string());

        let update = processor.process(&packet).await.expect("update expected");
        assert_eq!(update.callsign, "HB9XYZ");
        assert_eq!(update.icon, ":pager:");
        assert_eq!(update.source, "APRS");
        assert_eq!(
            update.status,
            "testing in 46.00000N 7.00000E (https://aprs.fi/HB9XYZ-9)"
        );
    }

    #[tokio::test]
    async fn test_resolved_place_replaces_coordinates() {
        let processor = PacketProcessor::new(MockGeoResolver::with_location(bern()), "APRS");
        let mut packet = positioned("HB9ABC", 9, 46.94702, 7.44720);
        packet.comment = Some("testing".to_string());

        let update = processor.process(&packet).await.expect("update expected");
        assert_eq!(
            update.status,
            "testing in Bern CH (https://aprs.fi/HB9ABC-9)"
        );
    }

    #[tokio::test]
    async fn test_missing_comment_omits_in_clause() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let packet = positioned("HB9ABC", 0, 46.94702, 7.44720);

        let update = processor.process(&packet).await.expect("update expected");
        assert_eq!(
            update.status,
            "46.94702N 7.44720E (https://aprs.fi/HB9ABC-0)"
        );
    }

    #[tokio::test]
    async fn test_southern_western_position_renders_hemispheres() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let packet = positioned("VK2ABC", 0, -33.8, 151.2);

        let update = processor.process(&packet).await.expect("update expected");
        assert_eq!(
            update.status,
            "33.80000S 151.20000E (https://aprs.fi/VK2ABC-0)"
        );
    }

    #[tokio::test]
    async fn test_run_forwards_updates_until_cancelled() {
        let processor = PacketProcessor::new(MockGeoResolver::unreachable(), "APRS");
        let (packet_tx, packet_rx) = mpsc::channel(8);
        let (update_tx, mut update_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(processor.run(packet_rx, update_tx, shutdown.clone()));

        packet_tx
            .send(positioned("HB9ABC", 9, 46.0, 7.0))
            .await
            .expect("queue should accept the packet");

        let update = tokio::time::timeout(std::time::Duration::from_secs(5), update_rx.recv())
            .await
            .expect("update should arrive")
            .expect("channel should stay open");
        assert_eq!(update.callsign, "HB9ABC");

        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("processor should stop after cancellation")
            .expect("processor task should not panic");
    }
}
