//! Session lifecycle: phase machine, per-tick exchange and the two drivers

pub mod host;
pub mod peer;
pub mod state;
pub mod sync;

use std::net::{Ipv4Addr, SocketAddr};

pub use state::{Phase, Session, Side, Signal};
pub use sync::{SyncPolicy, TickSync};

use crate::net::{ConnectionError, ProtocolError};

/// Longest accepted team name
pub const MAX_TEAM_NAME_LEN: usize = 25;

/// How a driver finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Reached the leaderboard
    Finished { victory: bool, score: u32 },
    /// The local player quit
    Quit,
}

/// Errors that end a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Signal {signal:?} is not valid in phase {phase:?}")]
    InvalidTransition { phase: Phase, signal: Signal },

    #[error("Roles were already assigned")]
    RolesAlreadyAssigned,
}

/// Rejected user input; shown inline and the prompt is retried
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputValidationError {
    #[error("Team name cannot be empty")]
    EmptyTeamName,

    #[error("Team name is limited to 25 characters")]
    TeamNameTooLong,

    #[error("Team name may only contain letters and spaces")]
    TeamNameCharacters,

    #[error("Invalid IP address")]
    InvalidAddress,
}

/// Check a team name: 1 to 25 characters, ASCII letters and spaces only
pub fn validate_team_name(raw: &str) -> Result<String, InputValidationError> {
    if raw.trim().is_empty() {
        return Err(InputValidationError::EmptyTeamName);
    }
    if raw.chars().count() > MAX_TEAM_NAME_LEN {
        return Err(InputValidationError::TeamNameTooLong);
    }
    if !raw.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
        return Err(InputValidationError::TeamNameCharacters);
    }
    Ok(raw.to_string())
}

/// Parse the host address typed by the peer. Must be an IPv4 address; the
/// port always comes from configuration.
pub fn parse_host_addr(raw: &str, port: u16) -> Result<SocketAddr, InputValidationError> {
    raw.trim()
        .parse::<Ipv4Addr>()
        .map(|ip| SocketAddr::from((ip, port)))
        .map_err(|_| InputValidationError::InvalidAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_names() {
        assert_eq!(validate_team_name("Night Shift").unwrap(), "Night Shift");
        assert_eq!(
            validate_team_name(""),
            Err(InputValidationError::EmptyTeamName)
        );
        assert_eq!(
            validate_team_name("   "),
            Err(InputValidationError::EmptyTeamName)
        );
        assert_eq!(
            validate_team_name("the dead 2"),
            Err(InputValidationError::TeamNameCharacters)
        );
        assert!(validate_team_name(&"a".repeat(25)).is_ok());
        assert_eq!(
            validate_team_name(&"a".repeat(26)),
            Err(InputValidationError::TeamNameTooLong)
        );
    }

    #[test]
    fn host_addresses() {
        let addr = parse_host_addr(" 192.168.1.20 ", 2000).unwrap();
        assert_eq!(addr, "192.168.1.20:2000".parse().unwrap());
        assert!(parse_host_addr("localhost", 2000).is_err());
        assert!(parse_host_addr("256.1.1.1", 2000).is_err());
        assert!(parse_host_addr("::1", 2000).is_err());
        assert!(parse_host_addr("", 2000).is_err());
    }
}
