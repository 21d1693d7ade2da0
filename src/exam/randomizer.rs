// src/exam/randomizer.rs

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use super::normalizer::{Question, QuestionBody};

/// One entry of the shuffled right-hand column of a matching question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RightItem {
    pub th: String,
    pub en: String,
    /// Index of the pair this item belongs to.
    #[serde(skip)]
    pub original_index: usize,
}

/// Display copy of a matching question's right column.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingView {
    pub right: Vec<RightItem>,
}

impl MatchingView {
    /// Maps a displayed position back to the original pair index.
    pub fn original_index(&self, display_position: usize) -> Option<usize> {
        self.right.get(display_position).map(|item| item.original_index)
    }
}

/// A question in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedQuestion {
    pub question: Question,
    /// Set for matching questions only.
    pub matching: Option<MatchingView>,
}

/// Shuffles question order for one attempt.
///
/// Choices are left in stored order; choice grading can rely on positional
/// indices. Only the right column of matching questions gets its own shuffle.
pub fn present<R: Rng + ?Sized>(questions: Vec<Question>, rng: &mut R) -> Vec<PresentedQuestion> {
    let mut questions = questions;
    questions.shuffle(&mut *rng);

    questions
        .into_iter()
        .map(|question| {
            let matching = match &question.body {
                QuestionBody::Matching { pairs } => {
                    let mut right: Vec<RightItem> = pairs
                        .iter()
                        .enumerate()
                        .map(|(idx, pair)| RightItem {
                            th: pair.right_th.clone(),
                            en: pair.right_en.clone(),
                            original_index: idx,
                        })
                        .collect();
                    right.shuffle(&mut *rng);
                    Some(MatchingView { right })
                }
                _ => None,
            };
            PresentedQuestion { question, matching }
        })
        .collect()
}
