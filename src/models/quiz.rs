// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::certificate::Certificate;

pub const MIN_ANSWERS: usize = 2;
pub const MAX_ANSWERS: usize = 6;
pub const MAX_QUESTIONS: usize = 200;

/// Reasons a quiz or question is rejected at construction time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("passing score must be between 1 and 100, got {0}")]
    PassingScore(i64),

    #[error("quiz must have at least one question")]
    NoQuestions,

    #[error("quiz cannot have more than 200 questions, got {0}")]
    TooManyQuestions(usize),

    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("question must have between 2 and 6 answers, got {0}")]
    AnswerCount(usize),

    #[error("answer {0} cannot be empty")]
    EmptyAnswer(usize),

    #[error("correct answer index {correct} is out of range for {answers} answers")]
    CorrectOutOfRange { correct: usize, answers: usize },
}

/// One multiple-choice question.
///
/// Deserialization goes through [`Question::new`], so a question read from a
/// request body or from the store always has `correct` inside `answers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    question: String,
    answers: Vec<String>,
    correct: usize,
}

#[derive(Deserialize)]
struct QuestionRecord {
    question: String,
    answers: Vec<String>,
    correct: usize,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuizError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        Question::new(record.question, record.answers, record.correct)
    }
}

impl Question {
    pub fn new(
        question: impl Into<String>,
        answers: Vec<String>,
        correct: usize,
    ) -> Result<Self, QuizError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(QuizError::EmptyPrompt);
        }
        if !(MIN_ANSWERS..=MAX_ANSWERS).contains(&answers.len()) {
            return Err(QuizError::AnswerCount(answers.len()));
        }
        if let Some(idx) = answers.iter().position(|a| a.trim().is_empty()) {
            return Err(QuizError::EmptyAnswer(idx));
        }
        if correct >= answers.len() {
            return Err(QuizError::CorrectOutOfRange {
                correct,
                answers: answers.len(),
            });
        }
        Ok(Self {
            question,
            answers,
            correct,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct
    }
}

/// Authoring payload for a module's quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    pub title: String,
    pub passing_score: i64,
    pub questions: Vec<Question>,
}

impl QuizConfig {
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if !(1..=100).contains(&self.passing_score) {
            return Err(QuizError::PassingScore(self.passing_score));
        }
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        if self.questions.len() > MAX_QUESTIONS {
            return Err(QuizError::TooManyQuestions(self.questions.len()));
        }
        Ok(())
    }
}

/// A stored quiz. One per module.
#[derive(Debug, Clone, Serialize)]
pub struct Quiz {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub passing_score: u8,
    pub questions: Vec<Question>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Quiz {
    /// Builds a quiz from stored parts, re-checking the configuration invariants.
    pub fn from_parts(
        id: i64,
        module_id: i64,
        config: QuizConfig,
        created_at: chrono::DateTime<chrono::Utc>,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self, QuizError> {
        config.validate()?;
        Ok(Self {
            id,
            module_id,
            title: config.title,
            // validate() bounds this to 1..=100
            passing_score: config.passing_score as u8,
            questions: config.questions,
            created_at,
            updated_at,
        })
    }
}

/// DTO for sending a quiz to the client (excludes correct answers).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub passing_score: u8,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub question: String,
    pub answers: Vec<String>,
}

impl From<Quiz> for PublicQuiz {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            module_id: quiz.module_id,
            title: quiz.title,
            passing_score: quiz.passing_score,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    question: q.question,
                    answers: q.answers,
                })
                .collect(),
        }
    }
}

/// DTO for submitting a quiz attempt.
/// One chosen answer index per question, in question order.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<usize>,
}

/// Result of a quiz attempt.
/// The score is always present; certificate issuance is reported separately.
#[derive(Debug, Serialize)]
pub struct QuizResultResponse {
    pub correct: usize,
    pub wrong: usize,
    pub total: usize,
    pub percentage: u8,
    pub passed: bool,
    pub can_get_certificate: bool,
    pub certificate: Option<Certificate>,
    pub certificate_error: Option<String>,
}
