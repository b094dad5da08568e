//! Team records and ranking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::net::protocol::Standing;

/// Best result of one team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub team_name: String,
    pub best_score: u32,
    pub updated_at: DateTime<Utc>,
}

/// All records, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaderboard {
    records: Vec<LeaderboardRecord>,
}

impl Leaderboard {
    pub fn records(&self) -> &[LeaderboardRecord] {
        &self.records
    }

    /// Insert or update-if-higher. Returns whether anything changed.
    pub fn upsert(&mut self, team_name: &str, score: u32) -> bool {
        let now = Utc::now();
        match self.records.iter_mut().find(|r| r.team_name == team_name) {
            Some(record) if record.best_score < score => {
                debug!(team = team_name, old = record.best_score, new = score, "New best score");
                record.best_score = score;
                record.updated_at = now;
                true
            }
            Some(_) => false,
            None => {
                debug!(team = team_name, score, "New team on the leaderboard");
                self.records.push(LeaderboardRecord {
                    team_name: team_name.to_string(),
                    best_score: score,
                    updated_at: now,
                });
                true
            }
        }
    }

    /// Highest scores first; equal scores keep insertion order
    pub fn top(&self, limit: usize) -> Vec<Standing> {
        let mut sorted: Vec<&LeaderboardRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.best_score.cmp(&a.best_score));
        sorted
            .into_iter()
            .take(limit)
            .map(|r| Standing {
                team_name: r.team_name.clone(),
                score: r.best_score,
            })
            .collect()
    }

    /// Number of stored best scores at or above `score`. This ranks the
    /// score of the run, not the team's best.
    pub fn rank(&self, score: u32) -> u32 {
        self.records.iter().filter(|r| r.best_score >= score).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_update_only_if_higher() {
        let mut board = Leaderboard::default();
        assert!(board.upsert("Bones", 120));
        assert!(!board.upsert("Bones", 80));
        assert_eq!(board.records()[0].best_score, 120);
        assert!(board.upsert("Bones", 200));
        assert_eq!(board.records().len(), 1);
        assert_eq!(board.records()[0].best_score, 200);
    }

    #[test]
    fn top_is_sorted_and_limited() {
        let mut board = Leaderboard::default();
        for (team, score) in [("A", 50), ("B", 300), ("C", 120), ("D", 300), ("E", 10)] {
            board.upsert(team, score);
        }
        let top = board.top(3);
        let names: Vec<&str> = top.iter().map(|s| s.team_name.as_str()).collect();
        assert_eq!(names, ["B", "D", "C"]);
        assert_eq!(board.top(10).len(), 5);
    }

    #[test]
    fn rank_counts_ties_and_uses_run_score() {
        let mut board = Leaderboard::default();
        for (team, score) in [("A", 50), ("B", 300), ("C", 120)] {
            board.upsert(team, score);
        }
        // A plays again and does worse: still ranked by this run's score
        board.upsert("A", 40);
        assert_eq!(board.rank(40), 3);
        assert_eq!(board.rank(120), 2);
        assert_eq!(board.rank(301), 0);
    }
}
