//! High-score persistence (host only)

pub mod file;
pub mod leaderboard;

pub use file::JsonFileStore;
pub use leaderboard::{Leaderboard, LeaderboardRecord};

use crate::net::protocol::Standing;

/// Rows shown on the leaderboard screen
pub const TOP_TEAMS: usize = 3;

/// Score storage used at the end of a session
pub trait ScoreStore {
    /// Insert the team, or raise its best score if `score` is higher
    fn record(&mut self, team_name: &str, score: u32) -> Result<(), StorageError>;

    /// Best teams, highest score first
    fn top(&self, limit: usize) -> Result<Vec<Standing>, StorageError>;

    /// 1-based rank of `score` among all stored best scores, ties included
    fn rank(&self, score: u32) -> Result<u32, StorageError>;
}

impl<T: ScoreStore + ?Sized> ScoreStore for &mut T {
    fn record(&mut self, team_name: &str, score: u32) -> Result<(), StorageError> {
        (**self).record(team_name, score)
    }

    fn top(&self, limit: usize) -> Result<Vec<Standing>, StorageError> {
        (**self).top(limit)
    }

    fn rank(&self, score: u32) -> Result<u32, StorageError> {
        (**self).rank(score)
    }
}

/// Store kept in memory only; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    board: Leaderboard,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn record(&mut self, team_name: &str, score: u32) -> Result<(), StorageError> {
        self.board.upsert(team_name, score);
        Ok(())
    }

    fn top(&self, limit: usize) -> Result<Vec<Standing>, StorageError> {
        Ok(self.board.top(limit))
    }

    fn rank(&self, score: u32) -> Result<u32, StorageError> {
        Ok(self.board.rank(score))
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to open score store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt score store: {0}")]
    Corrupt(#[from] serde_json::Error),
}
