use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current wall-clock time in milliseconds since the epoch, the unit every
/// `last_updated` stamp uses.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Bronze,
    Silver,
    Gold,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Bronze => write!(f, "Bronze"),
            Level::Silver => write!(f, "Silver"),
            Level::Gold => write!(f, "Gold"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bronze" => Ok(Level::Bronze),
            "Silver" => Ok(Level::Silver),
            "Gold" => Ok(Level::Gold),
            other => Err(anyhow::anyhow!("unknown level: {other}")),
        }
    }
}

/// Per-subject slice of a student's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub completed_content: Vec<String>,
    pub quiz_scores: BTreeMap<String, i64>,
    pub completion_percentage: u8,
}

impl SubjectProgress {
    pub fn is_completed(&self, content_id: &str) -> bool {
        self.completed_content.iter().any(|c| c == content_id)
    }
}

/// One record per student; the unit of reconciliation between the durable
/// store and the cache store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub grade: i64,
    pub progress: BTreeMap<String, SubjectProgress>,
    pub coins: i64,
    pub badges: Vec<String>,
    pub level: Level,
    pub last_updated: i64,
}

impl StudentRecord {
    /// Zero-valued record for a student with no prior data and no seed
    /// roster match.
    pub fn fresh(id: &str, name: &str, grade: Option<i64>) -> Self {
        StudentRecord {
            id: id.to_string(),
            name: if name.is_empty() {
                "Student".to_string()
            } else {
                name.to_string()
            },
            grade: grade.unwrap_or(6),
            progress: BTreeMap::new(),
            coins: 0,
            badges: Vec::new(),
            level: Level::Bronze,
            last_updated: now_millis(),
        }
    }

    /// Stamps a fresh `last_updated`. Guaranteed to strictly advance even
    /// when two mutations land within the same millisecond.
    pub fn touch(&mut self) {
        self.last_updated = now_millis().max(self.last_updated + 1);
    }
}

/// Terminal report for a completed content item. Tagged per content type so
/// each variant carries only the fields that apply to it; a score is
/// recorded into `quiz_scores` only when one is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Lecture,
    Pdf,
    Quiz { score: Option<i64> },
    Game { score: Option<i64> },
}

impl Completion {
    /// Coin award per content type: quizzes pay a 50-coin base plus the
    /// score, lectures pay 20, everything else pays 15.
    pub fn coins_earned(&self) -> i64 {
        match self {
            Completion::Quiz { score } => 50 + score.unwrap_or(0),
            Completion::Lecture => 20,
            Completion::Pdf | Completion::Game { .. } => 15,
        }
    }

    pub fn score(&self) -> Option<i64> {
        match self {
            Completion::Quiz { score } | Completion::Game { score } => *score,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

/// Session identity persisted under the cache store's `user` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "mcq")]
    Mcq,
    #[serde(rename = "fill-in-the-blanks")]
    FillInTheBlanks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub explanation: String,
}

/// One personalized learning suggestion from the tutor boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub subject_id: String,
    pub chapter_id: String,
    pub content_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
}
