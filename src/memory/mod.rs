// Conversation memory module
// JSON log of question/answer turns with their matches and user feedback

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::retrieval::SearchResult;

/// Placeholder owner recorded on every turn until real users exist.
pub const DEFAULT_USER_ID: &str = "local";

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Conversation log {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to encode conversation log: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Like,
    Dislike,
}

impl fmt::Display for Feedback {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Dislike => f.write_str("dislike"),
        }
    }
}

impl FromStr for Feedback {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(format!("unknown feedback '{}', expected like or dislike", other)),
        }
    }
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub answer: String,
    #[serde(default)]
    pub matches: Vec<SearchResult>,
    #[serde(default)]
    pub feedback_type: Option<Feedback>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Conversation log stored as a pretty-printed JSON array.
///
/// Every mutation rereads the file and rewrites it atomically, so the log on
/// disk is always either the old or the new version.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    path: PathBuf,
    user_id: String,
}

impl ConversationLog {
    #[inline]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }

    #[inline]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All turns, oldest first. A missing file is an empty log.
    #[inline]
    pub fn load(&self) -> Result<Vec<Turn>, MemoryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            warn!("Conversation log {} is unreadable: {}", self.path.display(), e);
            MemoryError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Record a new exchange and return it.
    #[inline]
    pub fn append(
        &self,
        query: &str,
        answer: &str,
        matches: Vec<SearchResult>,
    ) -> Result<Turn, MemoryError> {
        let mut turns = self.load()?;
        let turn = Turn {
            id: Uuid::new_v4(),
            user_id: self.user_id.clone(),
            timestamp: Utc::now(),
            query: query.to_string(),
            answer: answer.to_string(),
            matches,
            feedback_type: None,
            comment: None,
        };
        turns.push(turn.clone());
        self.write(&turns)?;
        debug!("Appended turn {} ({} total)", turn.id, turns.len());
        Ok(turn)
    }

    /// The last `n` turns, oldest first.
    #[inline]
    pub fn recent(&self, n: usize) -> Result<Vec<Turn>, MemoryError> {
        let mut turns = self.load()?;
        let skip = turns.len().saturating_sub(n);
        turns.drain(..skip);
        Ok(turns)
    }

    #[inline]
    pub fn clear(&self) -> Result<(), MemoryError> {
        self.write(&[])?;
        info!("Cleared conversation log {}", self.path.display());
        Ok(())
    }

    /// Attach feedback to the turn with `id`. Returns `false` when no turn matches.
    #[inline]
    pub fn update_feedback(
        &self,
        id: Uuid,
        feedback: Feedback,
        comment: Option<String>,
    ) -> Result<bool, MemoryError> {
        let mut turns = self.load()?;
        let Some(turn) = turns.iter_mut().find(|t| t.id == id) else {
            warn!("No turn with id {} to update", id);
            return Ok(false);
        };
        turn.feedback_type = Some(feedback);
        turn.comment = comment;
        self.write(&turns)?;
        info!("Recorded {} feedback for turn {}", feedback, id);
        Ok(true)
    }

    /// First turn whose query and answer both match exactly.
    #[inline]
    pub fn find_by_exchange(&self, query: &str, answer: &str) -> Result<Option<Turn>, MemoryError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|t| t.query == query && t.answer == answer))
    }

    fn write(&self, turns: &[Turn]) -> Result<(), MemoryError> {
        let encoded = serde_json::to_vec_pretty(turns)?;

        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(&encoded)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
