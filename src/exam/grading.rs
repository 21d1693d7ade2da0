// src/exam/grading.rs

//! The one grading routine. Pure and deterministic: same questions and answers,
//! same result.

use serde::Serialize;
use serde_json::Value;

use super::answers::{Answer, AnswerSheet};
use super::normalizer::{CorrectFlag, Question, QuestionBody};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradedItem {
    pub question_id: i64,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grade {
    /// Number of questions answered correctly.
    pub correct: usize,
    pub total: usize,
    pub items: Vec<GradedItem>,
}

/// Grades every question. Order of `questions` does not affect the count.
pub fn grade<'a, I>(questions: I, sheet: &AnswerSheet) -> Grade
where
    I: IntoIterator<Item = &'a Question>,
{
    let items: Vec<GradedItem> = questions
        .into_iter()
        .map(|q| GradedItem {
            question_id: q.id,
            correct: is_correct(q, sheet.get(q.id)),
        })
        .collect();

    Grade {
        correct: items.iter().filter(|item| item.correct).count(),
        total: items.len(),
        items,
    }
}

/// Decides a single question. The rule is picked by the question body.
pub fn is_correct(question: &Question, answer: Option<&Answer>) -> bool {
    let Some(answer) = answer else {
        return false;
    };

    match (&question.body, answer) {
        (QuestionBody::ShortAnswer { correct_answer }, Answer::Text(given)) => {
            normalize_text(given) == normalize_text(correct_answer)
        }
        (QuestionBody::Matching { pairs }, Answer::Matching(selected)) => {
            !pairs.is_empty()
                && (0..pairs.len()).all(|row| selected.get(&row) == Some(&row))
        }
        (
            QuestionBody::Choice {
                choices,
                correct_index,
                ..
            },
            Answer::Choice(index),
        ) => match correct_index {
            // An explicit answer key wins over the per-choice flags.
            Some(key) => index == key,
            None => choices
                .get(*index)
                .is_some_and(|choice| is_truthy_flag(&choice.is_correct)),
        },
        _ => false,
    }
}

fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Compatibility shim for historical rows: `is_correct` was written as a JSON
/// boolean by some imports and as `"true"`/`"True"`/`"TRUE"` by others.
/// Everything else is false.
pub(crate) fn is_truthy_flag(flag: &CorrectFlag) -> bool {
    match &flag.0 {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
