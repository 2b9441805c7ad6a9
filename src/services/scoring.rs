// src/services/scoring.rs

use serde::Serialize;
use thiserror::Error;

use crate::models::quiz::{Question, Quiz};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("expected {expected} answers, got {submitted}")]
    LengthMismatch { expected: usize, submitted: usize },

    #[error("quiz has no questions")]
    NoQuestions,
}

/// Outcome counts of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub wrong: usize,
    pub total: usize,
    /// `round(100 * correct / total)`, halves rounded up.
    pub percentage: u8,
}

/// Score plus the two independent thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub score: Score,
    /// `percentage >= quiz.passing_score`
    pub passed: bool,
    /// `percentage >= award threshold`, whatever the quiz's passing score
    pub can_get_certificate: bool,
}

/// Compares the Nth answer with the Nth question's correct index.
///
/// An index outside a question's answer range is simply wrong.
pub fn score(questions: &[Question], answers: &[usize]) -> Result<Score, ScoringError> {
    if questions.len() != answers.len() {
        return Err(ScoringError::LengthMismatch {
            expected: questions.len(),
            submitted: answers.len(),
        });
    }
    if questions.is_empty() {
        return Err(ScoringError::NoQuestions);
    }

    let total = questions.len();
    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| question.is_correct(**answer))
        .count();

    Ok(Score {
        correct,
        wrong: total - correct,
        total,
        percentage: percentage(correct, total),
    })
}

pub fn evaluate(
    quiz: &Quiz,
    answers: &[usize],
    award_threshold: u8,
) -> Result<Evaluation, ScoringError> {
    let score = score(&quiz.questions, answers)?;
    Ok(Evaluation {
        score,
        passed: score.percentage >= quiz.passing_score,
        can_get_certificate: score.percentage >= award_threshold,
    })
}

fn percentage(correct: usize, total: usize) -> u8 {
    // integer form of round(100 * correct / total); correct <= total keeps it <= 100
    ((200 * correct + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CERTIFICATE_AWARD_THRESHOLD;
    use crate::models::quiz::QuizConfig;

    fn question(correct: usize) -> Question {
        let answers = (0..4).map(|i| format!("Answer {}", i)).collect();
        Question::new(format!("Pick {}", correct), answers, correct).unwrap()
    }

    fn quiz(correct: &[usize], passing_score: i64) -> Quiz {
        let now = chrono::Utc::now();
        Quiz::from_parts(
            1,
            1,
            QuizConfig {
                title: "Quiz".to_string(),
                passing_score,
                questions: correct.iter().copied().map(question).collect(),
            },
            now,
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_perfect_submission() {
        let quiz = quiz(&[0, 1, 2, 1, 3], 60);
        let eval = evaluate(&quiz, &[0, 1, 2, 1, 3], CERTIFICATE_AWARD_THRESHOLD).unwrap();

        assert_eq!(eval.score.correct, 5);
        assert_eq!(eval.score.wrong, 0);
        assert_eq!(eval.score.percentage, 100);
        assert!(eval.passed);
        assert!(eval.can_get_certificate);
    }

    #[test]
    fn test_four_of_five_reaches_certificate_bar() {
        let quiz = quiz(&[0, 1, 2, 1, 3], 80);
        let eval = evaluate(&quiz, &[0, 1, 0, 1, 3], CERTIFICATE_AWARD_THRESHOLD).unwrap();

        assert_eq!(eval.score.correct, 4);
        assert_eq!(eval.score.percentage, 80);
        assert!(eval.passed);
        assert!(eval.can_get_certificate);
    }

    #[test]
    fn test_pass_without_certificate() {
        // 7 of 10 = 70%: above a 60% passing score, below the 80% award bar
        let correct = [0, 1, 2, 3, 0, 1, 2, 3, 0, 1];
        let quiz = quiz(&correct, 60);
        let mut answers = correct.to_vec();
        answers[0] = 3;
        answers[1] = 3;
        answers[2] = 3;

        let eval = evaluate(&quiz, &answers, CERTIFICATE_AWARD_THRESHOLD).unwrap();
        assert_eq!(eval.score.percentage, 70);
        assert!(eval.passed);
        assert!(!eval.can_get_certificate);
    }

    #[test]
    fn test_certificate_independent_of_passing_score() {
        // passing score above the award bar: certificate without passing
        let quiz = quiz(&[0, 1, 2, 1, 3], 100);
        let eval = evaluate(&quiz, &[0, 1, 0, 1, 3], CERTIFICATE_AWARD_THRESHOLD).unwrap();
        assert!(!eval.passed);
        assert!(eval.can_get_certificate);
    }

    #[test]
    fn test_award_threshold_is_overridable() {
        let quiz = quiz(&[0, 1, 2, 1, 3], 50);
        let eval = evaluate(&quiz, &[0, 1, 0, 1, 3], 90).unwrap();
        assert!(eval.passed);
        assert!(!eval.can_get_certificate);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let quiz = quiz(&[0, 1, 2, 1, 3], 60);
        let err = evaluate(&quiz, &[0, 1, 2, 1], CERTIFICATE_AWARD_THRESHOLD).unwrap_err();
        assert_eq!(
            err,
            ScoringError::LengthMismatch {
                expected: 5,
                submitted: 4
            }
        );
    }

    #[test]
    fn test_empty_input_does_not_divide_by_zero() {
        assert_eq!(score(&[], &[]), Err(ScoringError::NoQuestions));
    }

    #[test]
    fn test_out_of_range_answer_counts_as_wrong() {
        let questions = vec![question(0), question(1)];
        let result = score(&questions, &[0, 42]).unwrap();
        assert_eq!(result.correct, 1);
        assert_eq!(result.wrong, 1);
        assert_eq!(result.percentage, 50);
    }

    #[test]
    fn test_counts_and_bounds_hold_for_all_patterns() {
        // every right/wrong pattern over 5 questions
        let correct = [0, 1, 2, 1, 3];
        let questions: Vec<Question> = correct.iter().copied().map(question).collect();
        for mask in 0u32..32 {
            let answers: Vec<usize> = correct
                .iter()
                .enumerate()
                .map(|(i, c)| if mask & (1 << i) != 0 { *c } else { (c + 1) % 4 })
                .collect();
            let result = score(&questions, &answers).unwrap();
            assert_eq!(result.correct + result.wrong, result.total);
            assert_eq!(result.correct, mask.count_ones() as usize);
            assert!(result.percentage <= 100);
        }
    }

    #[test]
    fn test_rounding() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(percentage(0, 7), 0);
        assert_eq!(percentage(7, 7), 100);
    }

    #[test]
    fn test_order_sensitivity() {
        let questions = vec![question(0), question(1), question(2)];
        let answers = vec![0, 1, 3];
        let base = score(&questions, &answers).unwrap();

        // same permutation on both sides keeps the score
        let permuted_questions = vec![question(2), question(0), question(1)];
        let permuted_answers = vec![3, 0, 1];
        assert_eq!(score(&permuted_questions, &permuted_answers).unwrap(), base);

        // permuting only the answers changes it
        let shuffled_answers = vec![1, 0, 3];
        assert_ne!(score(&questions, &shuffled_answers).unwrap(), base);
    }
}
