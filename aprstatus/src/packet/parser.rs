//! TNC2 monitor line decoding.
//!
//! A line looks like `HB9ABC-9>APDR16,TCPIP*,qAC,T2SERVER:=4646.80N/00757.62E>QRV`:
//! source station, `>`, destination and digipeater path, `:`, payload. The
//! payload's first byte selects the encoding; this decoder handles the
//! uncompressed position reports (`!`, `=`, `/`, `@`) and passes every other
//! well-formed payload through as a position-less packet.

use super::symbol::Symbol;
use super::{Packet, Position, Station};

/// Highest SSID a station can carry on the air.
const MAX_SSID: u8 = 15;

/// Width of the `ddmm.mmN` latitude block.
const LAT_WIDTH: usize = 8;

/// Width of the full coordinate block: latitude, symbol table id,
/// longitude, symbol code.
const COORD_WIDTH: usize = 19;

/// Error decoding a packet line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line has no `>` separating the source station from the header.
    MissingSource,
    /// Line has no `:` separating the header from the payload.
    MissingPayload,
    /// Source station is empty or carries a malformed SSID.
    InvalidSource(String),
    /// Payload claims a position but the coordinate block is malformed.
    InvalidPosition(String),
    /// Position encoding we do not decode (compressed, Mic-E).
    UnsupportedEncoding,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingSource => write!(f, "missing '>' source separator"),
            ParseError::MissingPayload => write!(f, "missing ':' payload separator"),
            ParseError::InvalidSource(s) => write!(f, "invalid source station: {}", s),
            ParseError::InvalidPosition(s) => write!(f, "invalid position block: {}", s),
            ParseError::UnsupportedEncoding => write!(f, "unsupported position encoding"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Decode one feed line into a [`Packet`].
///
/// # Examples
///
/// ```
/// use aprstatus::packet::parse_line;
///
/// let packet = parse_line("HB9ABC-9>APRS,TCPIP*:=4646.80N/00757.62E>QRV 145.500").unwrap();
/// assert_eq!(packet.source.call, "HB9ABC");
/// assert_eq!(packet.source.ssid, 9);
/// assert!(packet.position.is_some());
/// assert_eq!(packet.comment.as_deref(), Some("QRV 145.500"));
/// ```
pub fn parse_line(line: &str) -> Result<Packet, ParseError> {
    let (source, rest) = line.split_once('>').ok_or(ParseError::MissingSource)?;
    let (_header, payload) = rest.split_once(':').ok_or(ParseError::MissingPayload)?;

    let mut packet = Packet {
        source: parse_station(source)?,
        position: None,
        comment: None,
        symbol: None,
    };

    match payload.as_bytes().first() {
        // Position without timestamp.
        Some(b'!') | Some(b'=') => {
            let body = payload
                .get(1..)
                .ok_or_else(|| ParseError::InvalidPosition(payload.to_string()))?;
            decode_position(body, &mut packet)?;
        }
        // Position preceded by a 7-character timestamp we don't need.
        Some(b'/') | Some(b'@') => {
            let body = payload
                .get(8..)
                .ok_or_else(|| ParseError::InvalidPosition(payload.to_string()))?;
            decode_position(body, &mut packet)?;
        }
        // Mic-E encodes the position in the destination field.
        Some(0x60) | Some(0x27) => return Err(ParseError::UnsupportedEncoding),
        // Status, message, telemetry, ... carry no position.
        _ => {}
    }

    Ok(packet)
}

fn parse_station(field: &str) -> Result<Station, ParseError> {
    let field = field.trim();
    let (call, ssid) = match field.split_once('-') {
        Some((call, ssid)) => {
            let ssid: u8 = ssid
                .parse()
                .map_err(|_| ParseError::InvalidSource(field.to_string()))?;
            (call, ssid)
        }
        None => (field, 0),
    };

    if call.is_empty() || !call.bytes().all(|b| b.is_ascii_alphanumeric()) || ssid > MAX_SSID {
        return Err(ParseError::InvalidSource(field.to_string()));
    }

    Ok(Station {
        call: call.to_string(),
        ssid,
    })
}

fn decode_position(body: &str, packet: &mut Packet) -> Result<(), ParseError> {
    // A compressed coordinate block starts with the symbol table id instead
    // of a latitude digit.
    if body.as_bytes().first().is_some_and(|b| !b.is_ascii_digit()) {
        return Err(ParseError::UnsupportedEncoding);
    }

    let coord = body
        .get(..COORD_WIDTH)
        .filter(|s| s.is_ascii())
        .ok_or_else(|| ParseError::InvalidPosition(body.to_string()))?;

    let latitude = parse_latitude(&coord[..LAT_WIDTH])
        .ok_or_else(|| ParseError::InvalidPosition(body.to_string()))?;
    let longitude = parse_longitude(&coord[LAT_WIDTH + 1..COORD_WIDTH - 1])
        .ok_or_else(|| ParseError::InvalidPosition(body.to_string()))?;

    let bytes = coord.as_bytes();
    packet.symbol = Some(Symbol::new(
        bytes[LAT_WIDTH] as char,
        bytes[COORD_WIDTH - 1] as char,
    ));
    packet.position = Some(Position {
        latitude,
        longitude,
    });

    let comment = body[COORD_WIDTH..].trim();
    if !comment.is_empty() {
        packet.comment = Some(comment.to_string());
    }

    Ok(())
}

/// `ddmm.mmN` → decimal degrees, south negative.
fn parse_latitude(block: &str) -> Option<f64> {
    let degrees: f64 = block.get(..2)?.parse().ok()?;
    let minutes: f64 = block.get(2..7)?.parse().ok()?;
    let value = degrees + minutes / 60.0;
    if minutes >= 60.0 || value > 90.0 {
        return None;
    }
    match block.as_bytes().get(7)? {
        b'N' => Some(value),
        b'S' => Some(-value),
        _ => None,
    }
}

/// `dddmm.mmE` → decimal degrees, west negative.
fn parse_longitude(block: &str) -> Option<f64> {
    let degrees: f64 = block.get(..3)?.parse().ok()?;
    let minutes: f64 = block.get(3..8)?.parse().ok()?;
    let value = degrees + minutes / 60.0;
    if minutes >= 60.0 || value > 180.0 {
        return None;
    }
    match block.as_bytes().get(8)? {
        b'E' => Some(value),
        b'W' => Some(-value),
        _ => None,
    }
}
