//! APRS display symbols.

/// A two-character APRS symbol: table identifier plus symbol code.
///
/// The primary table (`/`) holds the common station classes; the alternate
/// table (`\`) is mostly overlays and rare gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub table: char,
    pub code: char,
}

impl Symbol {
    pub fn new(table: char, code: char) -> Self {
        Self { table, code }
    }

    /// Emoji token for this symbol, when it has a sensible one.
    ///
    /// Covers the common primary-table mobile and station classes. Alternate
    /// table symbols have no mapping, so callers fall back to the SSID table.
    pub fn emoji(&self) -> Option<&'static str> {
        if self.table != '/' {
            return None;
        }
        let token = match self.code {
            '-' => ":house:",
            '>' => ":car:",
            '[' => ":runner:",
            'b' => ":bike:",
            'U' => ":bus:",
            'Y' => ":sailboat:",
            's' => ":boat:",
            '^' | '\'' => ":airplane:",
            'X' => ":helicopter:",
            'O' => ":balloon:",
            '_' => ":cloud:",
            'u' | 'k' => ":truck:",
            '=' => ":train:",
            'f' => ":fire_engine:",
            'a' => ":ambulance:",
            _ => return None,
        };
        Some(token)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.table, self.code)
    }
}
