//! Leaderboard persisted as a JSON file

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::net::protocol::Standing;

use super::leaderboard::Leaderboard;
use super::{ScoreStore, StorageError};

/// File-backed store. The whole table is read once at open and rewritten on
/// every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    board: Leaderboard,
}

impl JsonFileStore {
    /// Open the store, creating the file (and its directory) when missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source: std::io::Error| StorageError::Open {
            path: path.display().to_string(),
            source,
        };

        let board = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => Leaderboard::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    fs::create_dir_all(dir).map_err(open_err)?;
                }
                let board = Leaderboard::default();
                fs::write(&path, serde_json::to_vec(&board)?).map_err(open_err)?;
                info!(path = %path.display(), "Created score store");
                board
            }
            Err(e) => return Err(open_err(e)),
        };

        debug!(path = %path.display(), teams = board.records().len(), "Score store opened");
        Ok(Self { path, board })
    }

    fn persist(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.board)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), teams = self.board.records().len(), "Score store saved");
        Ok(())
    }
}

impl ScoreStore for JsonFileStore {
    fn record(&mut self, team_name: &str, score: u32) -> Result<(), StorageError> {
        if self.board.upsert(team_name, score) {
            self.persist()?;
        }
        Ok(())
    }

    fn top(&self, limit: usize) -> Result<Vec<Standing>, StorageError> {
        Ok(self.board.top(limit))
    }

    fn rank(&self, score: u32) -> Result<u32, StorageError> {
        Ok(self.board.rank(score))
    }
}
