use std::collections::BTreeMap;

use crate::models::domain::{
    AnswerValue, Assignment, GradeRecord, Question, QuestionGrade, QuestionType,
};

/// Stateless scorer for objective question types.
pub struct GradingEngine;

impl GradingEngine {
    /// Score for one question. `None` means the question needs a human.
    pub fn auto_score(question: &Question, answer: Option<&AnswerValue>) -> Option<f64> {
        let correct = match (question.question_type, answer) {
            (QuestionType::Essay, _) => return None,
            (_, None) => false,
            (QuestionType::MultipleChoice, Some(AnswerValue::SelectedOption(option_id))) => {
                question
                    .options
                    .iter()
                    .any(|opt| &opt.id == option_id && opt.correct)
            }
            (QuestionType::TrueFalse, Some(AnswerValue::Boolean(value))) => {
                question.expected_boolean() == Some(*value)
            }
            (QuestionType::TrueFalse, Some(AnswerValue::Text(text))) => {
                matches_key(question.correct_answer.as_deref(), text)
            }
            (QuestionType::ShortAnswer, Some(AnswerValue::Text(text))) => {
                matches_key(question.correct_answer.as_deref(), text)
            }
            // shape mismatches are rejected on save; treat leftovers as wrong
            _ => false,
        };

        Some(if correct { question.points } else { 0.0 })
    }

    /// Builds the grade record for a freshly submitted set of answers.
    /// Answers to questions that no longer exist are ignored.
    pub fn grade_submission(
        assignment: &Assignment,
        answers: &BTreeMap<String, AnswerValue>,
        late_penalty_percent: f64,
    ) -> GradeRecord {
        let questions = assignment
            .questions
            .iter()
            .map(|question| QuestionGrade {
                question_id: question.id.clone(),
                points: question.points,
                auto_score: Self::auto_score(question, answers.get(&question.id)),
                teacher_score: None,
                feedback: None,
            })
            .collect();

        GradeRecord::new(questions, late_penalty_percent)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn matches_key(key: Option<&str>, given: &str) -> bool {
    key.map(|k| normalize(k) == normalize(given)).unwrap_or(false)
}
