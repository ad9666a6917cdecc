//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use aprstatus::feed::FeedError;
use aprstatus::runtime::RuntimeError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to start the runtime
    Runtime(RuntimeError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        if let CliError::Runtime(RuntimeError::Feed(FeedError::InvalidCallsign { .. })) = self {
            eprintln!();
            eprintln!("The APRS-IS login callsign must be at most nine characters");
            eprintln!("(letters, digits and '-'). Pass it with --aprs-callsign; use");
            eprintln!("NOCALL with passcode -1 for a receive-only session.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Runtime(error) => write!(f, "Failed to start: {}", error),
        }
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_error_message() {
        let error = CliError::LoggingInit("permission denied".to_string());
        assert_eq!(
            error.to_string(),
            "Failed to initialize logging: permission denied"
        );
    }

    #[test]
    fn test_runtime_error_message_names_the_source() {
        let error = CliError::Runtime(RuntimeError::Feed(FeedError::InvalidCallsign {
            callsign: "not a callsign".to_string(),
        }));
        assert!(error.to_string().contains("not a callsign"));
    }
}
