//! APRS packet model and wire decoding.
//!
//! The feed delivers TNC2-style monitor lines; [`parse_line`] decodes them
//! into [`Packet`]s carrying the fields the status pipeline cares about:
//! source station, optional position, optional comment, optional symbol.

mod parser;
mod symbol;

pub use parser::{parse_line, ParseError};
pub use symbol::Symbol;

/// A station identifier: callsign plus SSID qualifier.
///
/// The SSID distinguishes several stations run by the same operator
/// (fixed station, mobile, portable, ...). A source field without an
/// explicit SSID means SSID 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub call: String,
    pub ssid: u8,
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.call, self.ssid)
    }
}

/// Geographic position in decimal degrees (south and west negative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// A decoded packet.
///
/// Only position reports carry a position; any other well-formed payload
/// (status, message, telemetry, ...) decodes to a packet without one and is
/// dropped further down the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub source: Station,
    pub position: Option<Position>,
    pub comment: Option<String>,
    pub symbol: Option<Symbol>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_display_includes_ssid() {
        let station = Station {
            call: "HB9ABC".to_string(),
            ssid: 9,
        };
        assert_eq!(station.to_string(), "HB9ABC-9");
    }
}
