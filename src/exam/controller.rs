// src/exam/controller.rs

//! Async orchestration around `ExamSession`: loading questions, the two-phase
//! submission and restarts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use super::credential::{CredentialMutation, PermitNotification, plan_mutation};
use super::eligibility::{ExamOutcome, resolve_threshold};
use super::grading::{Grade, grade};
use super::normalizer::normalize;
use super::randomizer::{PresentedQuestion, present};
use super::session::{ExamSession, SessionError, SubmissionTicket};
use crate::config::Config;
use crate::models::category::ExamCategory;
use crate::models::permit::CredentialState;
use crate::notify::Dispatcher;
use crate::store::{AttemptRecord, Backend, StoreError};

/// Shown in place of the underlying store error.
pub const RESULT_STORE_UNAVAILABLE: &str = "the result store is unavailable";

/// What the user sees after a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub outcome: ExamOutcome,
    pub grade: Grade,
    pub credential: CredentialState,
    /// Dispatch sequence number when a permit notification was sent.
    pub notification: Option<u64>,
}

#[derive(Clone)]
pub struct ExamController {
    backend: Arc<dyn Backend>,
    dispatcher: Arc<Dispatcher>,
    config: Config,
}

impl ExamController {
    pub fn new(backend: Arc<dyn Backend>, dispatcher: Arc<Dispatcher>, config: Config) -> Self {
        Self {
            backend,
            dispatcher,
            config,
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Fetches, normalizes and shuffles the active questions of `category`.
    pub async fn prepare_questions(
        &self,
        category: ExamCategory,
    ) -> Result<Vec<PresentedQuestion>, SessionError> {
        let records = self.backend.fetch_questions(category).await?;
        let questions = normalize(records);
        let presented = present(questions, &mut rand::thread_rng());
        tracing::debug!(%category, count = presented.len(), "Prepared exam questions");
        Ok(presented)
    }

    /// New session in READING. The permit exam stays locked until the user
    /// holds valid training.
    pub async fn open(&self, user_id: i64, category: ExamCategory) -> Result<ExamSession, SessionError> {
        if category == ExamCategory::WorkPermit {
            let credential = self.backend.active_credential(user_id, Utc::now()).await?;
            if !credential.is_some_and(|c| c.permit_stage_unlocked()) {
                return Err(SessionError::TrainingRequired);
            }
        }

        let questions = self.prepare_questions(category).await?;
        let session = ExamSession::new(user_id, category, questions, self.config.exam_page_size);
        tracing::info!(session_id = %session.id(), user_id, %category, "Exam session opened");
        Ok(session)
    }

    pub async fn submit(&self, session: &Mutex<ExamSession>) -> Result<SubmissionResult, SessionError> {
        self.submit_at(session, Utc::now()).await
    }

    /// Two-phase submission. The session lock is only held to flip the busy
    /// flag and to record the result, never while the store is working.
    pub async fn submit_at(
        &self,
        session: &Mutex<ExamSession>,
        now: DateTime<Utc>,
    ) -> Result<SubmissionResult, SessionError> {
        let ticket = session.lock().await.begin_submission()?;

        let result = self.grade_and_persist(&ticket, now).await;

        let mut guard = session.lock().await;
        match result {
            Ok(result) => {
                guard.complete_submission(result.outcome.clone(), Some(result.credential.clone()));
                Ok(result)
            }
            Err(e) => {
                tracing::error!(session_id = %ticket.session_id, "Submission failed: {}", e);
                guard.fail_submission(e.to_string());
                Err(e)
            }
        }
    }

    async fn grade_and_persist(
        &self,
        ticket: &SubmissionTicket,
        now: DateTime<Utc>,
    ) -> Result<SubmissionResult, SessionError> {
        let grade = grade(&ticket.questions, &ticket.answers);

        let fallback = self.config.fallback_threshold(ticket.category);
        let threshold = resolve_threshold(&*self.backend, ticket.category, fallback).await;
        let outcome = ExamOutcome::evaluate(grade.correct, grade.total, threshold);

        let mutation = plan_mutation(ticket.category, &outcome, ticket.permit_number.as_deref(), now);
        let issued_number = match &mutation {
            Some(CredentialMutation::IssuePermit(permit)) => Some(permit.permit_number.clone()),
            _ => None,
        };

        let record = AttemptRecord {
            user_id: ticket.user_id,
            category: ticket.category,
            score: outcome.score as i32,
            total: outcome.total as i32,
            percentage: outcome.percentage,
            threshold: i32::from(outcome.threshold),
            passed: outcome.passed,
            permit_number: issued_number.clone().or_else(|| ticket.permit_number.clone()),
            answers: serde_json::to_value(&ticket.answers).unwrap_or_default(),
            graded_at: now,
        };

        let credential = self
            .backend
            .record_attempt(record, mutation)
            .await
            .map_err(|e| {
                tracing::error!(user_id = ticket.user_id, category = %ticket.category, "Failed to record exam result: {:?}", e);
                match e {
                    StoreError::Conflict(msg) => SessionError::Persistence(msg),
                    _ => SessionError::Persistence(RESULT_STORE_UNAVAILABLE.to_string()),
                }
            })?;

        tracing::info!(
            user_id = ticket.user_id,
            category = %ticket.category,
            score = outcome.score,
            total = outcome.total,
            threshold = outcome.threshold,
            passed = outcome.passed,
            "Exam graded"
        );

        let notification = match issued_number {
            Some(number) => self.notify_permit(ticket.user_id, &outcome, &number).await,
            None => None,
        };

        Ok(SubmissionResult {
            outcome,
            grade,
            credential,
            notification,
        })
    }

    /// Best effort. The permit already exists, so nothing here can fail the submission.
    async fn notify_permit(&self, user_id: i64, outcome: &ExamOutcome, permit_number: &str) -> Option<u64> {
        match self.backend.find_by_id(user_id).await {
            Ok(Some(user)) => {
                let event = PermitNotification::new(&user, outcome, permit_number);
                Some(self.dispatcher.dispatch(event))
            }
            Ok(None) => {
                tracing::warn!(user_id, "Permit holder vanished, notification skipped");
                None
            }
            Err(e) => {
                tracing::warn!(user_id, "Could not load permit holder, notification skipped: {}", e);
                None
            }
        }
    }

    /// Back to READING with a fresh shuffle. Only after a failed attempt.
    pub async fn restart(&self, session: &Mutex<ExamSession>) -> Result<(), SessionError> {
        let category = {
            let guard = session.lock().await;
            guard.ensure_restartable()?;
            guard.category()
        };

        let questions = self.prepare_questions(category).await?;
        session.lock().await.reset(questions)
    }
}
