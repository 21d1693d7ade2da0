// src/exam/answers.rs

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::normalizer::{Pattern, QuestionBody};
use super::randomizer::PresentedQuestion;

/// A collected answer. The variant mirrors the question pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Index into the stored (never shuffled) choice list.
    Choice(usize),
    /// Raw short-answer text, untrimmed.
    Text(String),
    /// Pair position -> original pair index of the selected right item.
    Matching(BTreeMap<usize, usize>),
}

/// Answer as sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerInput {
    Choice { index: usize },
    Text { value: String },
    /// Selects the right item shown at `position` for left row `row`.
    Match { row: usize, position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("answer shape does not fit a {0:?} question")]
    ShapeMismatch(Pattern),
    #[error("matching row {0} is out of range")]
    RowOutOfRange(usize),
    #[error("matching position {0} is out of range")]
    PositionOutOfRange(usize),
    #[error("question cannot take a matching answer")]
    NotMatching,
}

/// Question id -> current answer for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnswerSheet {
    answers: HashMap<i64, Answer>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: i64) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Stores an answer without any shape check. Used by grading tests and
    /// callers that already hold canonical answers.
    pub fn insert(&mut self, question_id: i64, answer: Answer) {
        self.answers.insert(question_id, answer);
    }

    /// Records the user's input for `presented`, checking only that the input
    /// shape fits the question pattern. Matching selections are translated from
    /// display position to original pair index here.
    pub fn record(&mut self, presented: &PresentedQuestion, input: AnswerInput) -> Result<(), AnswerError> {
        let question = &presented.question;

        match (&question.body, input) {
            (QuestionBody::Choice { .. }, AnswerInput::Choice { index }) => {
                self.answers.insert(question.id, Answer::Choice(index));
            }
            (QuestionBody::ShortAnswer { .. }, AnswerInput::Text { value }) => {
                self.answers.insert(question.id, Answer::Text(value));
            }
            (QuestionBody::Matching { pairs }, AnswerInput::Match { row, position }) => {
                if row >= pairs.len() {
                    return Err(AnswerError::RowOutOfRange(row));
                }
                let original = presented
                    .matching
                    .as_ref()
                    .and_then(|view| view.original_index(position))
                    .ok_or(AnswerError::PositionOutOfRange(position))?;

                let entry = self
                    .answers
                    .entry(question.id)
                    .or_insert_with(|| Answer::Matching(BTreeMap::new()));
                match entry {
                    Answer::Matching(map) => {
                        map.insert(row, original);
                    }
                    other => {
                        let mut map = BTreeMap::new();
                        map.insert(row, original);
                        *other = Answer::Matching(map);
                    }
                }
            }
            (QuestionBody::Inert, AnswerInput::Match { .. }) => return Err(AnswerError::NotMatching),
            (QuestionBody::Inert, AnswerInput::Choice { index }) => {
                self.answers.insert(question.id, Answer::Choice(index));
            }
            (QuestionBody::Inert, AnswerInput::Text { value }) => {
                self.answers.insert(question.id, Answer::Text(value));
            }
            (body, _) => {
                let pattern = match body {
                    QuestionBody::Choice { pattern, .. } => *pattern,
                    QuestionBody::ShortAnswer { .. } => Pattern::ShortAnswer,
                    _ => Pattern::Matching,
                };
                return Err(AnswerError::ShapeMismatch(pattern));
            }
        }
        Ok(())
    }

    /// Whether `presented` has an answer that allows submission. Matching
    /// questions need every row filled. Inert questions never block.
    pub fn is_answered(&self, presented: &PresentedQuestion) -> bool {
        let question = &presented.question;
        match (&question.body, self.answers.get(&question.id)) {
            (QuestionBody::Inert, _) => true,
            (QuestionBody::Matching { pairs }, Some(Answer::Matching(map))) => {
                (0..pairs.len()).all(|row| map.contains_key(&row))
            }
            (QuestionBody::Matching { .. }, _) => false,
            (_, answer) => answer.is_some(),
        }
    }

    pub fn is_complete(&self, questions: &[PresentedQuestion]) -> bool {
        questions.iter().all(|q| self.is_answered(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::normalizer::{Bilingual, Choice, CorrectFlag, MatchingPair, Question};
    use crate::exam::randomizer::{MatchingView, RightItem};

    fn presented(id: i64, body: QuestionBody, matching: Option<MatchingView>) -> PresentedQuestion {
        PresentedQuestion {
            question: Question {
                id,
                content: Bilingual {
                    th: String::new(),
                    en: String::new(),
                },
                image_url: None,
                body,
            },
            matching,
        }
    }

    fn choice(id: i64) -> PresentedQuestion {
        presented(
            id,
            QuestionBody::Choice {
                pattern: Pattern::TrueFalse,
                choices: vec![
                    Choice {
                        text_th: String::new(),
                        text_en: "True".into(),
                        is_correct: CorrectFlag::default(),
                    },
                    Choice {
                        text_th: String::new(),
                        text_en: "False".into(),
                        is_correct: CorrectFlag::default(),
                    },
                ],
                correct_index: Some(0),
            },
            None,
        )
    }

    /// Right column displayed in reverse order.
    fn matching(id: i64) -> PresentedQuestion {
        let pairs: Vec<MatchingPair> = (0..3)
            .map(|i| MatchingPair {
                left_th: String::new(),
                left_en: format!("L{}", i),
                right_th: String::new(),
                right_en: format!("R{}", i),
            })
            .collect();
        let right = (0..3)
            .rev()
            .map(|i| RightItem {
                th: String::new(),
                en: format!("R{}", i),
                original_index: i,
            })
            .collect();
        presented(id, QuestionBody::Matching { pairs }, Some(MatchingView { right }))
    }

    #[test]
    fn records_choice_answer() {
        let q = choice(1);
        let mut sheet = AnswerSheet::new();
        assert!(!sheet.is_answered(&q));
        sheet.record(&q, AnswerInput::Choice { index: 1 }).unwrap();
        assert_eq!(sheet.get(1), Some(&Answer::Choice(1)));
        assert!(sheet.is_answered(&q));
    }

    #[test]
    fn rejects_wrong_shape() {
        let q = choice(1);
        let mut sheet = AnswerSheet::new();
        let err = sheet
            .record(&q, AnswerInput::Text { value: "yes".into() })
            .unwrap_err();
        assert_eq!(err, AnswerError::ShapeMismatch(Pattern::TrueFalse));
        assert!(sheet.is_empty());
    }

    #[test]
    fn matching_translates_display_positions() {
        let q = matching(5);
        let mut sheet = AnswerSheet::new();

        // Display position 2 holds R0 because the column is reversed.
        sheet.record(&q, AnswerInput::Match { row: 0, position: 2 }).unwrap();
        assert!(!sheet.is_answered(&q));
        sheet.record(&q, AnswerInput::Match { row: 1, position: 1 }).unwrap();
        sheet.record(&q, AnswerInput::Match { row: 2, position: 0 }).unwrap();
        assert!(sheet.is_answered(&q));

        let expected: BTreeMap<usize, usize> = [(0, 0), (1, 1), (2, 2)].into_iter().collect();
        assert_eq!(sheet.get(5), Some(&Answer::Matching(expected)));
    }

    #[test]
    fn matching_rejects_out_of_range() {
        let q = matching(5);
        let mut sheet = AnswerSheet::new();
        assert_eq!(
            sheet.record(&q, AnswerInput::Match { row: 3, position: 0 }),
            Err(AnswerError::RowOutOfRange(3))
        );
        assert_eq!(
            sheet.record(&q, AnswerInput::Match { row: 0, position: 9 }),
            Err(AnswerError::PositionOutOfRange(9))
        );
    }

    #[test]
    fn inert_questions_never_block_completion() {
        let inert = presented(8, QuestionBody::Inert, None);
        let sheet = AnswerSheet::new();
        assert!(sheet.is_complete(&[inert]));
    }
}
