//! Types for the LearnLog API

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Minimum entry length (characters) accepted by the server
pub const MIN_CONTENT_CHARS: usize = 10;
/// Maximum entry length (characters) accepted by the server
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Stable user identifier issued by the backend
///
/// Decoupled from the OAuth subject id; obtained once per sign-in through
/// the user-sync exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendUserId(String);

impl BackendUserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A journal entry as stored by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub content: String,
    /// Calendar day the entry belongs to
    pub date: NaiveDate,
    pub word_count: u32,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    /// AI validation score, when the validator reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, serde_json::Value>>,
}

/// Request body for entry creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub content: String,
    pub date: NaiveDate,
}

impl NewEntry {
    pub fn new(content: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            content: content.into(),
            date,
        }
    }

    /// Whitespace-separated word count, derived the same way the server does
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Length check for the compose form.
    ///
    /// The server stays authoritative; the mutation path never calls this.
    pub fn precheck(&self) -> std::result::Result<(), ContentIssue> {
        let chars = self.content.trim().chars().count();
        if chars == 0 {
            Err(ContentIssue::Empty)
        } else if chars < MIN_CONTENT_CHARS {
            Err(ContentIssue::TooShort { min: MIN_CONTENT_CHARS })
        } else if chars > MAX_CONTENT_CHARS {
            Err(ContentIssue::TooLong { max: MAX_CONTENT_CHARS })
        } else {
            Ok(())
        }
    }
}

/// Why composed content would be rejected before reaching the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentIssue {
    Empty,
    TooShort { min: usize },
    TooLong { max: usize },
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentIssue::Empty => write!(f, "Content is required"),
            ContentIssue::TooShort { min } => write!(f, "Write at least {} characters", min),
            ContentIssue::TooLong { max } => write!(f, "Keep it under {} characters", max),
        }
    }
}

/// Streak snapshot, derived server-side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(default)]
    pub total_entries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_entry_date: Option<NaiveDate>,
}

/// Achievement with per-user unlock status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Symbolic icon name, resolved by the presentation layer
    pub icon_name: String,
    #[serde(default)]
    pub criteria: String,
    pub unlocked: bool,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Overall per-user totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_entries: u32,
    pub total_words: u64,
    pub level: u32,
}

/// Windowed aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub entries_this_week: u32,
    pub entries_this_month: u32,
    pub avg_word_count: f64,
    #[serde(default)]
    pub top_topics: Vec<String>,
}

/// One day of the activity series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPoint {
    /// Day label as produced by the server (e.g. "Mon")
    pub date: String,
    pub words: u32,
    pub entries: u32,
}

/// Request body for `POST /users/sync`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncUserRequest {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub provider: String,
    pub provider_id: String,
}

/// Response from `POST /users/sync`; only the id is consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncUserResponse {
    pub id: BackendUserId,
}

mod timestamp {
    use super::*;

    /// Accept RFC 3339 or a naive ISO-8601 timestamp (read as UTC)
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
        }
    }
}
