//! Generative AI tutor boundary. Two distinct degradation policies apply:
//! an unconfigured client (no API key) silently substitutes local mock
//! data, while a configured client that fails surfaces a descriptive error
//! for tutoring content and falls back to the mock list for
//! recommendations. No retries; every request is attempt-once.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::models::{QuestionKind, QuizQuestion, Recommendation, StudentRecord};

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("failed to get a response from the AI tutor: {0}")]
    Request(#[from] reqwest::Error),
    #[error("the AI tutor returned an unusable response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorResponse {
    pub explanation: String,
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Deserialize)]
struct RecommendationList {
    recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct TutorClient {
    api_key: Option<String>,
    http: reqwest::Client,
}

impl TutorClient {
    pub fn new(api_key: Option<String>) -> Self {
        TutorClient {
            api_key: api_key.filter(|k| !k.is_empty()),
            http: reqwest::Client::new(),
        }
    }

    /// Reads `GEMINI_API_KEY`; absence leaves the client in mock mode.
    pub fn from_env() -> Self {
        Self::new(std::env::var("GEMINI_API_KEY").ok())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_json(&self, api_key: &str, prompt: &str) -> Result<String, TutorError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        let response: GenerateResponse = self
            .http
            .post(GEMINI_ENDPOINT)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(TutorError::InvalidResponse(
                "no candidate text in the model response".to_string(),
            ));
        }
        Ok(text)
    }

    /// On-demand explanation plus a generated quiz for an arbitrary topic.
    pub async fn generate_tutor_content(&self, topic: &str) -> Result<TutorResponse, TutorError> {
        let Some(api_key) = self.api_key.clone() else {
            info!(topic, "tutor is not configured, using mock content");
            return Ok(mock_tutor_content(topic));
        };

        let prompt = format!(
            "Explain the topic \"{topic}\" in a simple, student-friendly way, suitable for a \
             10th-grade student. After the explanation, create a comprehensive quiz with at \
             least 15 questions (a mix of multiple-choice and fill-in-the-blanks) to test \
             understanding. For each question, provide an explanation for the correct answer. \
             Respond with a JSON object with keys \"explanation\" (string) and \"quiz\" (array \
             of objects with keys id, question, type ('mcq' or 'fill-in-the-blanks'), options \
             (string array, empty for fill-in-the-blanks), answer, explanation)."
        );

        let text = self.generate_json(&api_key, &prompt).await?;
        serde_json::from_str(text.trim())
            .map_err(|err| TutorError::InvalidResponse(err.to_string()))
    }

    /// Three personalized suggestions drawn from the student's uncompleted
    /// content. A configured-but-failing service falls back to the mock
    /// list rather than surfacing an error.
    pub async fn recommendations(
        &self,
        record: &StudentRecord,
        catalog: &Catalog,
    ) -> Vec<Recommendation> {
        let Some(api_key) = self.api_key.clone() else {
            return mock_recommendations();
        };

        let uncompleted = catalog.uncompleted_entries(record);
        if uncompleted.is_empty() {
            return Vec::new();
        }

        let progress_summary: serde_json::Value = record
            .progress
            .iter()
            .map(|(subject_id, progress)| {
                let name = catalog
                    .subject(subject_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| subject_id.clone());
                let avg_score = if progress.quiz_scores.is_empty() {
                    serde_json::json!("No quizzes taken")
                } else {
                    let total: i64 = progress.quiz_scores.values().sum();
                    serde_json::json!(
                        (total as f64 / progress.quiz_scores.len() as f64).round() as i64
                    )
                };
                (
                    name,
                    serde_json::json!({
                        "completionPercentage": progress.completion_percentage,
                        "averageQuizScore": avg_score,
                    }),
                )
            })
            .collect::<serde_json::Map<String, serde_json::Value>>()
            .into();

        let prompt = format!(
            "You are an expert academic advisor for a gamified learning platform.\n\
             Student progress summary:\n{}\n\n\
             Available uncompleted content:\n{}\n\n\
             Suggest exactly 3 specific learning activities from the list above, each with a \
             brief, encouraging reason (under 20 words). Prioritize chapters the student has \
             started but not finished and subjects with low quiz scores. Respond with a JSON \
             object with key \"recommendations\": an array of objects with keys subjectId, \
             chapterId, contentId, title, type, reason.",
            serde_json::to_string_pretty(&progress_summary).unwrap_or_default(),
            serde_json::to_string_pretty(&uncompleted).unwrap_or_default(),
        );

        let parsed = self
            .generate_json(&api_key, &prompt)
            .await
            .and_then(|text| {
                serde_json::from_str::<RecommendationList>(text.trim())
                    .map_err(|err| TutorError::InvalidResponse(err.to_string()))
            });

        match parsed {
            Ok(list) => list.recommendations,
            Err(err) => {
                warn!(%err, "recommendation request failed, using mock list");
                mock_recommendations()
            }
        }
    }
}

fn mock_tutor_content(topic: &str) -> TutorResponse {
    TutorResponse {
        explanation: format!(
            "This is a mock explanation for \"{topic}\". In a real scenario, the tutor \
             would provide a detailed, student-friendly explanation here, breaking complex \
             concepts into simple parts with analogies and examples."
        ),
        quiz: (1..=15)
            .map(|i| QuizQuestion {
                id: format!("ai_q{i}"),
                question: format!(
                    "This is mock question {i} about \"{topic}\". What is the primary concept?"
                ),
                options: vec![
                    format!("Mock Answer A{i}"),
                    format!("Mock Answer B{i}"),
                    format!("Mock Answer C{i}"),
                    format!("Correct Answer {i}"),
                ],
                answer: format!("Correct Answer {i}"),
                kind: QuestionKind::Mcq,
                explanation: format!(
                    "This is the mock explanation for question {i}. The correct answer follows \
                     from the key concept behind the topic."
                ),
            })
            .collect(),
    }
}

fn mock_recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            subject_id: "math".to_string(),
            chapter_id: "m2".to_string(),
            content_id: "m2l1".to_string(),
            title: "Understanding Polynomials".to_string(),
            kind: "lecture".to_string(),
            reason: "Looks like you've started Polynomials. This lecture is a great next step!"
                .to_string(),
        },
        Recommendation {
            subject_id: "science".to_string(),
            chapter_id: "s1".to_string(),
            content_id: "s1q1".to_string(),
            title: "Motion Quiz".to_string(),
            kind: "quiz".to_string(),
            reason: "You aced the lecture, now test your knowledge on the Laws of Motion!"
                .to_string(),
        },
        Recommendation {
            subject_id: "english".to_string(),
            chapter_id: "e2".to_string(),
            content_id: "e2g1".to_string(),
            title: "Tense Troubles".to_string(),
            kind: "game".to_string(),
            reason: "Make grammar fun! This game will help solidify your understanding of tenses."
                .to_string(),
        },
    ]
}
