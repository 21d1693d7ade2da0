// src/exam/session.rs

//! Per-attempt state machine: READING -> IN_PROGRESS -> RESULT.
//!
//! Everything here is synchronous. The async work around submission lives in
//! `exam::controller`, which drives the two-phase `begin_submission` /
//! `complete_submission` protocol so the session lock is never held across I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::answers::{Answer, AnswerError, AnswerInput, AnswerSheet};
use super::eligibility::ExamOutcome;
use super::normalizer::{Bilingual, Pattern, Question, QuestionBody};
use super::randomizer::{PresentedQuestion, RightItem};
use crate::models::category::ExamCategory;
use crate::models::permit::CredentialState;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Reading,
    InProgress,
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NotReady {
    Unanswered { count: usize },
    MissingPermitNumber,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("exam session not found")]
    NotFound,
    #[error("exam session belongs to another user")]
    Forbidden,
    #[error("valid safety training is required before the work permit exam")]
    TrainingRequired,
    #[error("the manual must be acknowledged first")]
    NotAcknowledged,
    #[error("action not allowed while {actual:?}, expected {expected:?}")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(i64),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error("page {0} does not exist")]
    PageOutOfRange(usize),
    #[error("exam is not ready for submission: {0:?}")]
    NotReady(NotReady),
    #[error("a submission is already in progress")]
    Busy,
    #[error("only a failed attempt can be restarted")]
    AlreadyPassed,
    #[error("only a passed attempt can be accepted")]
    NotPassed,
    #[error("could not save the exam result, please submit again: {0}")]
    Persistence(String),
    #[error("could not load questions: {0}")]
    Store(#[from] StoreError),
}

/// Anti-copy restrictions the client applies while an exam is running.
/// This is UI friction only; grading never relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockdownPolicy {
    pub block_context_menu: bool,
    pub block_copy: bool,
    pub block_cut: bool,
    pub blocked_shortcuts: Vec<&'static str>,
}

impl LockdownPolicy {
    fn exam() -> Self {
        Self {
            block_context_menu: true,
            block_copy: true,
            block_cut: true,
            blocked_shortcuts: vec!["F12", "Ctrl+Shift+I", "Ctrl+Shift+J", "Ctrl+Shift+C", "Ctrl+U"],
        }
    }
}

/// Client-side events the lockdown policy can veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction<'a> {
    ContextMenu,
    Copy,
    Cut,
    Shortcut(&'a str),
}

/// Snapshot taken when a submission starts.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    pub session_id: Uuid,
    pub user_id: i64,
    pub category: ExamCategory,
    pub questions: Vec<Question>,
    pub answers: AnswerSheet,
    pub permit_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    user_id: i64,
    category: ExamCategory,
    stage: Stage,
    acknowledged: bool,
    questions: Vec<PresentedQuestion>,
    answers: AnswerSheet,
    page: usize,
    page_size: usize,
    permit_number: Option<String>,
    submitting: bool,
    last_error: Option<String>,
    outcome: Option<ExamOutcome>,
    credential: Option<CredentialState>,
    created_at: DateTime<Utc>,
}

impl ExamSession {
    pub fn new(
        user_id: i64,
        category: ExamCategory,
        questions: Vec<PresentedQuestion>,
        page_size: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            category,
            stage: Stage::Reading,
            acknowledged: false,
            questions,
            answers: AnswerSheet::new(),
            page: 0,
            page_size: page_size.max(1),
            permit_number: None,
            submitting: false,
            last_error: None,
            outcome: None,
            credential: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn category(&self) -> ExamCategory {
        self.category
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn questions(&self) -> &[PresentedQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn outcome(&self) -> Option<&ExamOutcome> {
        self.outcome.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), SessionError> {
        if self.stage != expected {
            return Err(SessionError::WrongStage {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    /// Checkbox gate under the manual.
    pub fn acknowledge(&mut self, accepted: bool) -> Result<(), SessionError> {
        self.expect_stage(Stage::Reading)?;
        self.acknowledged = accepted;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.expect_stage(Stage::Reading)?;
        if !self.acknowledged {
            return Err(SessionError::NotAcknowledged);
        }
        self.stage = Stage::InProgress;
        self.page = 0;
        Ok(())
    }

    fn expect_editable(&self) -> Result<(), SessionError> {
        self.expect_stage(Stage::InProgress)?;
        if self.submitting {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    pub fn answer(&mut self, question_id: i64, input: AnswerInput) -> Result<(), SessionError> {
        self.expect_editable()?;
        let presented = self
            .questions
            .iter()
            .find(|p| p.question.id == question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;
        self.answers.record(presented, input)?;
        Ok(())
    }

    pub fn set_permit_number(&mut self, permit_number: &str) -> Result<(), SessionError> {
        self.expect_editable()?;
        let trimmed = permit_number.trim();
        self.permit_number = (!trimmed.is_empty()).then(|| trimmed.to_string());
        Ok(())
    }

    pub fn requires_permit_number(&self) -> bool {
        self.category == ExamCategory::WorkPermit
    }

    // --- pagination ---

    pub fn page_count(&self) -> usize {
        self.questions.len().div_ceil(self.page_size).max(1)
    }

    pub fn page_of(&self, question_id: i64) -> Option<usize> {
        self.questions
            .iter()
            .position(|p| p.question.id == question_id)
            .map(|idx| idx / self.page_size)
    }

    pub fn goto_page(&mut self, page: usize) -> Result<(), SessionError> {
        self.expect_stage(Stage::InProgress)?;
        if page >= self.page_count() {
            return Err(SessionError::PageOutOfRange(page));
        }
        self.page = page;
        Ok(())
    }

    pub fn next_page(&mut self) -> Result<(), SessionError> {
        self.goto_page(self.page + 1)
    }

    pub fn prev_page(&mut self) -> Result<(), SessionError> {
        match self.page.checked_sub(1) {
            Some(page) => self.goto_page(page),
            None => Err(SessionError::PageOutOfRange(0)),
        }
    }

    pub fn current_page(&self) -> &[PresentedQuestion] {
        let start = (self.page * self.page_size).min(self.questions.len());
        let end = (start + self.page_size).min(self.questions.len());
        &self.questions[start..end]
    }

    // --- submission ---

    pub fn readiness(&self) -> Result<(), NotReady> {
        let unanswered = self
            .questions
            .iter()
            .filter(|q| !self.answers.is_answered(q))
            .count();
        if unanswered > 0 {
            return Err(NotReady::Unanswered { count: unanswered });
        }
        if self.requires_permit_number() && self.permit_number.is_none() {
            return Err(NotReady::MissingPermitNumber);
        }
        Ok(())
    }

    /// Whether the submit button is enabled.
    pub fn can_submit(&self) -> bool {
        self.stage == Stage::InProgress && !self.submitting && self.readiness().is_ok()
    }

    /// Marks the session busy and hands out what grading needs. A second call
    /// before `complete_submission`/`fail_submission` is rejected with `Busy`.
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, SessionError> {
        if self.submitting {
            return Err(SessionError::Busy);
        }
        self.expect_stage(Stage::InProgress)?;
        self.readiness().map_err(SessionError::NotReady)?;

        self.submitting = true;
        self.last_error = None;

        Ok(SubmissionTicket {
            session_id: self.id,
            user_id: self.user_id,
            category: self.category,
            questions: self.questions.iter().map(|p| p.question.clone()).collect(),
            answers: self.answers.clone(),
            permit_number: self.permit_number.clone(),
        })
    }

    pub fn complete_submission(&mut self, outcome: ExamOutcome, credential: Option<CredentialState>) {
        self.submitting = false;
        self.last_error = None;
        self.outcome = Some(outcome);
        self.credential = credential;
        self.stage = Stage::Result;
    }

    /// Clears the busy flag and stays in progress so the user can retry.
    pub fn fail_submission(&mut self, message: String) {
        self.submitting = false;
        self.last_error = Some(message);
    }

    // --- result ---

    fn passed(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.passed)
    }

    /// Restart is only offered after a failed attempt.
    pub fn ensure_restartable(&self) -> Result<(), SessionError> {
        self.expect_stage(Stage::Result)?;
        if self.passed() {
            return Err(SessionError::AlreadyPassed);
        }
        Ok(())
    }

    /// Back to the manual with a fresh question set and no answers.
    pub fn reset(&mut self, questions: Vec<PresentedQuestion>) -> Result<(), SessionError> {
        self.ensure_restartable()?;
        self.questions = questions;
        self.answers.clear();
        self.permit_number = None;
        self.acknowledged = false;
        self.page = 0;
        self.outcome = None;
        self.credential = None;
        self.last_error = None;
        self.stage = Stage::Reading;
        Ok(())
    }

    /// Hands the updated credential back after a pass.
    pub fn accept(&self) -> Result<CredentialState, SessionError> {
        self.expect_stage(Stage::Result)?;
        if !self.passed() {
            return Err(SessionError::NotPassed);
        }
        Ok(self.credential.clone().unwrap_or_default())
    }

    // --- anti-tamper ---

    /// Restrictions to apply, only while the exam is in progress.
    pub fn lockdown(&self) -> Option<LockdownPolicy> {
        (self.stage == Stage::InProgress).then(LockdownPolicy::exam)
    }

    pub fn is_blocked(&self, action: UiAction<'_>) -> bool {
        let Some(policy) = self.lockdown() else {
            return false;
        };
        match action {
            UiAction::ContextMenu => policy.block_context_menu,
            UiAction::Copy => policy.block_copy,
            UiAction::Cut => policy.block_cut,
            UiAction::Shortcut(keys) => policy
                .blocked_shortcuts
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(keys)),
        }
    }

    // --- rendering ---

    pub fn view(&self, manual_url: Option<&str>) -> SessionView {
        let in_progress = self.stage == Stage::InProgress;
        let offset = self.page * self.page_size;

        let questions = if in_progress {
            self.current_page()
                .iter()
                .enumerate()
                .map(|(i, p)| PublicQuestion::render(p, offset + i + 1, self.answers.get(p.question.id)))
                .collect()
        } else {
            Vec::new()
        };

        let index = if in_progress {
            self.questions
                .iter()
                .enumerate()
                .map(|(i, p)| IndexEntry {
                    number: i + 1,
                    question_id: p.question.id,
                    page: i / self.page_size,
                    answered: self.answers.is_answered(p),
                })
                .collect()
        } else {
            Vec::new()
        };

        SessionView {
            id: self.id,
            category: self.category,
            stage: self.stage,
            manual_url: manual_url.map(str::to_string),
            acknowledged: self.acknowledged,
            page: self.page,
            page_count: self.page_count(),
            total_questions: self.questions.len(),
            answered: self.questions.iter().filter(|q| self.answers.is_answered(q)).count(),
            questions,
            index,
            permit_required: self.requires_permit_number(),
            permit_number: self.permit_number.clone(),
            can_submit: self.can_submit(),
            submitting: self.submitting,
            last_error: self.last_error.clone(),
            outcome: self.outcome.clone(),
            credential: self.credential.clone(),
            lockdown: self.lockdown(),
            created_at: self.created_at,
        }
    }
}

/// Per-question navigation control.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub number: usize,
    pub question_id: i64,
    pub page: usize,
    pub answered: bool,
}

/// What the user currently has selected, in display terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerView {
    Choice { index: usize },
    Text { value: String },
    /// Row -> display position of the chosen right item.
    Match { selections: Vec<Option<usize>> },
}

/// Question as sent to the client. Carries no answer key.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub number: usize,
    pub pattern: Option<Pattern>,
    pub content: Bilingual,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Bilingual>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub left: Vec<Bilingual>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub right: Vec<RightItem>,
    pub answer: Option<AnswerView>,
}

impl PublicQuestion {
    fn render(presented: &PresentedQuestion, number: usize, answer: Option<&Answer>) -> Self {
        let q = &presented.question;
        let mut choices = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();

        match &q.body {
            QuestionBody::Choice { choices: stored, .. } => {
                choices = stored
                    .iter()
                    .map(|c| Bilingual {
                        th: c.text_th.clone(),
                        en: c.text_en.clone(),
                    })
                    .collect();
            }
            QuestionBody::Matching { pairs } => {
                left = pairs
                    .iter()
                    .map(|p| Bilingual {
                        th: p.left_th.clone(),
                        en: p.left_en.clone(),
                    })
                    .collect();
                right = presented
                    .matching
                    .as_ref()
                    .map(|view| view.right.clone())
                    .unwrap_or_default();
            }
            QuestionBody::ShortAnswer { .. } | QuestionBody::Inert => {}
        }

        let answer = answer.map(|a| match a {
            Answer::Choice(index) => AnswerView::Choice { index: *index },
            Answer::Text(value) => AnswerView::Text { value: value.clone() },
            Answer::Matching(map) => AnswerView::Match {
                // Report display positions so the answer key never leaves the server.
                selections: (0..left.len())
                    .map(|row| {
                        map.get(&row)
                            .and_then(|original| right.iter().position(|r| r.original_index == *original))
                    })
                    .collect(),
            },
        });

        Self {
            id: q.id,
            number,
            pattern: q.pattern(),
            content: q.content.clone(),
            image_url: q.image_url.clone(),
            choices,
            left,
            right,
            answer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub category: ExamCategory,
    pub stage: Stage,
    pub manual_url: Option<String>,
    pub acknowledged: bool,
    pub page: usize,
    pub page_count: usize,
    pub total_questions: usize,
    pub answered: usize,
    pub questions: Vec<PublicQuestion>,
    pub index: Vec<IndexEntry>,
    pub permit_required: bool,
    pub permit_number: Option<String>,
    pub can_submit: bool,
    pub submitting: bool,
    pub last_error: Option<String>,
    pub outcome: Option<ExamOutcome>,
    pub credential: Option<CredentialState>,
    pub lockdown: Option<LockdownPolicy>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::normalizer::{Choice, CorrectFlag};
    use crate::exam::randomizer::MatchingView;

    fn choice_question(id: i64) -> PresentedQuestion {
        PresentedQuestion {
            question: Question {
                id,
                content: Bilingual {
                    th: String::new(),
                    en: format!("Q{}", id),
                },
                image_url: None,
                body: QuestionBody::Choice {
                    pattern: Pattern::MultipleChoice,
                    choices: vec![
                        Choice {
                            text_th: String::new(),
                            text_en: "yes".into(),
                            is_correct: CorrectFlag::default(),
                        },
                        Choice {
                            text_th: String::new(),
                            text_en: "no".into(),
                            is_correct: CorrectFlag::default(),
                        },
                    ],
                    correct_index: Some(0),
                },
            },
            matching: None,
        }
    }

    fn session(category: ExamCategory, count: i64) -> ExamSession {
        ExamSession::new(7, category, (1..=count).map(choice_question).collect(), 5)
    }

    fn answer_all(s: &mut ExamSession) {
        let ids: Vec<i64> = s.questions().iter().map(|p| p.question.id).collect();
        for id in ids {
            s.answer(id, AnswerInput::Choice { index: 0 }).unwrap();
        }
    }

    #[test]
    fn start_requires_acknowledgement() {
        let mut s = session(ExamCategory::Training, 3);
        assert!(matches!(s.start(), Err(SessionError::NotAcknowledged)));
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        assert_eq!(s.stage(), Stage::InProgress);
        assert!(matches!(
            s.acknowledge(false),
            Err(SessionError::WrongStage { .. })
        ));
    }

    #[test]
    fn answers_rejected_outside_progress() {
        let mut s = session(ExamCategory::Training, 3);
        assert!(matches!(
            s.answer(1, AnswerInput::Choice { index: 0 }),
            Err(SessionError::WrongStage { expected: Stage::InProgress, actual: Stage::Reading })
        ));
    }

    #[test]
    fn pagination_and_jumps() {
        let mut s = session(ExamCategory::Training, 12);
        s.acknowledge(true).unwrap();
        s.start().unwrap();

        assert_eq!(s.page_count(), 3);
        assert_eq!(s.current_page().len(), 5);
        assert!(matches!(s.prev_page(), Err(SessionError::PageOutOfRange(0))));

        s.next_page().unwrap();
        s.next_page().unwrap();
        assert_eq!(s.current_page().len(), 2);
        assert!(matches!(s.next_page(), Err(SessionError::PageOutOfRange(3))));

        let last_id = s.questions()[11].question.id;
        assert_eq!(s.page_of(last_id), Some(2));
        s.goto_page(0).unwrap();
        assert_eq!(s.page(), 0);
        assert_eq!(s.page_of(999), None);
    }

    #[test]
    fn submit_disabled_until_everything_answered() {
        let mut s = session(ExamCategory::Training, 3);
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        s.answer(1, AnswerInput::Choice { index: 0 }).unwrap();

        assert!(!s.can_submit());
        assert!(matches!(
            s.begin_submission(),
            Err(SessionError::NotReady(NotReady::Unanswered { count: 2 }))
        ));

        answer_all(&mut s);
        assert!(s.can_submit());
    }

    #[test]
    fn permit_exam_needs_permit_number() {
        let mut s = session(ExamCategory::WorkPermit, 2);
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        answer_all(&mut s);

        assert!(!s.can_submit());
        s.set_permit_number("   ").unwrap();
        assert!(!s.can_submit());
        assert!(matches!(
            s.begin_submission(),
            Err(SessionError::NotReady(NotReady::MissingPermitNumber))
        ));

        s.set_permit_number(" HW-01 ").unwrap();
        assert!(s.can_submit());
        let ticket = s.begin_submission().unwrap();
        assert_eq!(ticket.permit_number.as_deref(), Some("HW-01"));
    }

    #[test]
    fn second_submission_is_busy() {
        let mut s = session(ExamCategory::Training, 1);
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        answer_all(&mut s);

        s.begin_submission().unwrap();
        assert!(!s.can_submit());
        assert!(matches!(s.begin_submission(), Err(SessionError::Busy)));

        s.fail_submission("store down".into());
        assert_eq!(s.stage(), Stage::InProgress);
        assert_eq!(s.last_error(), Some("store down"));
        assert!(s.can_submit());
    }

    #[test]
    fn answers_frozen_while_submitting() {
        let mut s = session(ExamCategory::WorkPermit, 2);
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        answer_all(&mut s);
        s.set_permit_number("P-1").unwrap();
        s.begin_submission().unwrap();

        assert!(matches!(
            s.answer(1, AnswerInput::Choice { index: 1 }),
            Err(SessionError::Busy)
        ));
        assert!(matches!(s.set_permit_number("P-OTHER"), Err(SessionError::Busy)));

        s.complete_submission(ExamOutcome::evaluate(2, 2, 80), None);
        let view = s.view(None);
        assert_eq!(view.permit_number.as_deref(), Some("P-1"));
        assert_eq!(s.answers().get(1), Some(&Answer::Choice(0)));
    }

    #[test]
    fn restart_only_after_failure() {
        let mut s = session(ExamCategory::Training, 2);
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        answer_all(&mut s);
        s.begin_submission().unwrap();
        s.complete_submission(ExamOutcome::evaluate(1, 2, 80), None);

        assert!(matches!(s.accept(), Err(SessionError::NotPassed)));
        s.reset(vec![choice_question(10)]).unwrap();
        assert_eq!(s.stage(), Stage::Reading);
        assert!(s.answers().is_empty());
        assert!(s.outcome().is_none());
        assert!(matches!(s.start(), Err(SessionError::NotAcknowledged)));
    }

    #[test]
    fn accept_after_pass() {
        let mut s = session(ExamCategory::Training, 1);
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        answer_all(&mut s);
        s.begin_submission().unwrap();
        let credential = CredentialState {
            training_expires_at: Some(Utc::now()),
            permit: None,
        };
        s.complete_submission(ExamOutcome::evaluate(1, 1, 80), Some(credential.clone()));

        assert!(matches!(s.reset(Vec::new()), Err(SessionError::AlreadyPassed)));
        assert_eq!(s.accept().unwrap(), credential);
    }

    #[test]
    fn lockdown_only_while_in_progress() {
        let mut s = session(ExamCategory::Training, 1);
        assert!(s.lockdown().is_none());
        assert!(!s.is_blocked(UiAction::Copy));

        s.acknowledge(true).unwrap();
        s.start().unwrap();
        assert!(s.lockdown().is_some());
        assert!(s.is_blocked(UiAction::ContextMenu));
        assert!(s.is_blocked(UiAction::Cut));
        assert!(s.is_blocked(UiAction::Shortcut("ctrl+shift+i")));
        assert!(!s.is_blocked(UiAction::Shortcut("Ctrl+S")));

        answer_all(&mut s);
        s.begin_submission().unwrap();
        s.complete_submission(ExamOutcome::evaluate(0, 1, 80), None);
        assert!(s.lockdown().is_none());
    }

    #[test]
    fn view_hides_matching_key() {
        let matching = PresentedQuestion {
            question: Question {
                id: 50,
                content: Bilingual {
                    th: String::new(),
                    en: "match".into(),
                },
                image_url: None,
                body: QuestionBody::Matching {
                    pairs: (0..2)
                        .map(|i| crate::exam::normalizer::MatchingPair {
                            left_th: String::new(),
                            left_en: format!("L{}", i),
                            right_th: String::new(),
                            right_en: format!("R{}", i),
                        })
                        .collect(),
                },
            },
            matching: Some(MatchingView {
                right: vec![
                    RightItem { th: String::new(), en: "R1".into(), original_index: 1 },
                    RightItem { th: String::new(), en: "R0".into(), original_index: 0 },
                ],
            }),
        };
        let mut s = ExamSession::new(7, ExamCategory::Training, vec![matching], 5);
        s.acknowledge(true).unwrap();
        s.start().unwrap();
        s.answer(50, AnswerInput::Match { row: 0, position: 1 }).unwrap();

        let view = s.view(None);
        assert_eq!(view.questions.len(), 1);
        assert_eq!(
            view.questions[0].answer,
            Some(AnswerView::Match { selections: vec![Some(1), None] })
        );
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.to_string().find("original_index").is_none());
    }
}
