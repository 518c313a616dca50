//! Leaderboard entries and the file-backed leaderboard store
//!
//! The leaderboard is the only long-lived state written to disk. It is loaded
//! once at startup and rewritten in full every time a round is recorded.
//!
//! File format (`leaderboard.json`): an indented JSON array of
//! `[name, emotion, score]` records, sorted by score descending.
//!
//! ```json
//! [
//!     [
//!         "Ann",
//!         "sad",
//!         88.0
//!     ]
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::emotion::Emotion;
use crate::Result;

/// Default number of entries shown in the leaderboard view
pub const DEFAULT_VIEW_SIZE: usize = 10;

/// On-disk record shape: `[name, emotion, score]`
#[derive(Serialize, Deserialize)]
struct EntryRecord(String, Emotion, f64);

/// Result of one finished round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryRecord", into = "EntryRecord")]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub emotion: Emotion,
    pub score: f64,
}

impl LeaderboardEntry {
    pub fn new(player_name: impl Into<String>, emotion: Emotion, score: f64) -> Self {
        Self {
            player_name: player_name.into(),
            emotion,
            score,
        }
    }
}

impl From<EntryRecord> for LeaderboardEntry {
    fn from(record: EntryRecord) -> Self {
        LeaderboardEntry::new(record.0, record.1, record.2)
    }
}

impl From<LeaderboardEntry> for EntryRecord {
    fn from(entry: LeaderboardEntry) -> Self {
        EntryRecord(entry.player_name, entry.emotion, entry.score)
    }
}

/// Entries ordered by score, highest first
///
/// Duplicates (same name and emotion) are kept as separate entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary entries, sorting them
    pub fn from_entries(entries: Vec<LeaderboardEntry>) -> Self {
        let mut board = Self { entries };
        board.sort();
        board
    }

    /// Append an entry and restore score order
    pub fn insert(&mut self, entry: LeaderboardEntry) {
        self.entries.push(entry);
        self.sort();
    }

    /// First `n` entries (fewer if the board is shorter)
    pub fn top_n(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as the indented on-disk array
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries.serialize(&mut serializer)?;
        // serde_json only writes valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Parse the on-disk array
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<LeaderboardEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    // Stable: equal scores keep their prior relative order
    fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
}

/// Format one leaderboard line: `rank. name - emotion - score%`
pub fn format_entry(rank: usize, entry: &LeaderboardEntry) -> String {
    format!(
        "{}. {} - {} - {:.2}%",
        rank, entry.player_name, entry.emotion, entry.score
    )
}

/// Leaderboard bound to its backing file
///
/// Owns the file exclusively; all mutation goes through [`record`](Self::record).
#[derive(Debug)]
pub struct LeaderboardStore {
    path: PathBuf,
    board: Leaderboard,
}

impl LeaderboardStore {
    /// Load the leaderboard stored at `path`
    ///
    /// A missing or unreadable file, or malformed content, yields an empty
    /// leaderboard. This never fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let board = match std::fs::read_to_string(&path) {
            Ok(content) => match Leaderboard::from_json(&content) {
                Ok(board) => {
                    info!("Loaded {} leaderboard entries from {}", board.len(), path.display());
                    board
                }
                Err(e) => {
                    warn!(
                        "Leaderboard file {} is malformed ({}), starting with an empty leaderboard",
                        path.display(),
                        e
                    );
                    Leaderboard::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No leaderboard at {}, starting empty", path.display());
                Leaderboard::new()
            }
            Err(e) => {
                warn!(
                    "Could not read leaderboard {} ({}), starting with an empty leaderboard",
                    path.display(),
                    e
                );
                Leaderboard::new()
            }
        };

        Self { path, board }
    }

    /// Append `entry`, re-sort and rewrite the whole file
    ///
    /// The entry stays in the in-memory leaderboard even when saving fails;
    /// the save error is returned so the caller can report it.
    pub fn record(&mut self, entry: LeaderboardEntry) -> Result<()> {
        debug!(
            "Recording leaderboard entry: {} / {} / {:.2}",
            entry.player_name, entry.emotion, entry.score
        );
        self.board.insert(entry);
        self.save()
    }

    /// Rewrite the backing file with the full leaderboard
    ///
    /// Writes `<file>.tmp` then renames it over the target.
    pub fn save(&self) -> Result<()> {
        let json = self.board.to_json()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = temp_path_for(&self.path);
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!("Saved {} leaderboard entries to {}", self.board.len(), self.path.display());
        Ok(())
    }

    pub fn top_n(&self, n: usize) -> &[LeaderboardEntry] {
        self.board.top_n(n)
    }

    /// Formatted lines for the leaderboard view, ranked from 1
    pub fn format_top_n(&self, n: usize) -> Vec<String> {
        self.top_n(n)
            .iter()
            .enumerate()
            .map(|(i, entry)| format_entry(i + 1, entry))
            .collect()
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.board
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
