// src/exam/credential.rs

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

use crate::config::{PERMIT_VALIDITY_DAYS, TRAINING_VALIDITY_MONTHS};
use crate::models::category::ExamCategory;
use crate::models::user::User;

use super::eligibility::ExamOutcome;

/// Shown in notifications for users without a vendor.
pub const NO_AFFILIATION: &str = "No affiliation";

/// Permit row to insert on a work-permit pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPermit {
    pub permit_number: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub score: i32,
    pub max_score: i32,
}

/// Durable change that follows a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialMutation {
    /// Overwrites the training expiry. Never added onto the previous one.
    ExtendTraining { expires_at: DateTime<Utc> },
    IssuePermit(NewPermit),
}

/// Works out the credential change for a graded attempt. `None` when the
/// attempt failed.
pub fn plan_mutation(
    category: ExamCategory,
    outcome: &ExamOutcome,
    permit_number: Option<&str>,
    now: DateTime<Utc>,
) -> Option<CredentialMutation> {
    if !outcome.passed {
        return None;
    }

    let mutation = match category {
        ExamCategory::Training => CredentialMutation::ExtendTraining {
            expires_at: training_expiry(now),
        },
        ExamCategory::WorkPermit => CredentialMutation::IssuePermit(NewPermit {
            permit_number: permit_number
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| fallback_permit_number(now)),
            issued_at: now,
            expires_at: now + Duration::days(PERMIT_VALIDITY_DAYS),
            status: "active".to_string(),
            score: outcome.score as i32,
            max_score: outcome.total as i32,
        }),
    };
    Some(mutation)
}

/// One year after `now`, by calendar.
pub fn training_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(TRAINING_VALIDITY_MONTHS))
        .unwrap_or(now + Duration::days(365))
}

/// Permit number used when none was typed in.
pub fn fallback_permit_number(now: DateTime<Utc>) -> String {
    format!("WP-{}", now.timestamp_millis())
}

/// Chat message payload sent after a permit is issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermitNotification {
    pub name: String,
    pub organization: String,
    pub score: usize,
    pub max_score: usize,
    pub permit_number: String,
}

impl PermitNotification {
    pub fn new(user: &User, outcome: &ExamOutcome, permit_number: &str) -> Self {
        Self {
            name: user.full_name.clone(),
            organization: user
                .organization
                .as_deref()
                .map(str::trim)
                .filter(|org| !org.is_empty())
                .unwrap_or(NO_AFFILIATION)
                .to_string(),
            score: outcome.score,
            max_score: outcome.total,
            permit_number: permit_number.to_string(),
        }
    }

    /// Human-readable line for chat webhooks.
    pub fn message(&self) -> String {
        format!(
            "Work permit approved\nName: {}\nCompany: {}\nScore: {}/{}\nPermit No.: {}",
            self.name, self.organization, self.score, self.max_score, self.permit_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
    }

    fn user(organization: Option<&str>) -> User {
        User {
            id: 1,
            username: "c-001".into(),
            password: String::new(),
            role: "user".into(),
            full_name: "Somchai Jaidee".into(),
            organization: organization.map(str::to_string),
            training_expires_at: None,
            created_at: None,
        }
    }

    #[test]
    fn failing_outcome_mutates_nothing() {
        let outcome = ExamOutcome::evaluate(1, 10, 80);
        assert_eq!(plan_mutation(ExamCategory::Training, &outcome, None, now()), None);
        assert_eq!(plan_mutation(ExamCategory::WorkPermit, &outcome, Some("P-1"), now()), None);
    }

    #[test]
    fn training_pass_sets_expiry_one_year_out() {
        let outcome = ExamOutcome::evaluate(10, 10, 80);
        let mutation = plan_mutation(ExamCategory::Training, &outcome, None, now());
        assert_eq!(
            mutation,
            Some(CredentialMutation::ExtendTraining {
                expires_at: Utc.with_ymd_and_hms(2027, 3, 10, 9, 30, 0).unwrap()
            })
        );
    }

    #[test]
    fn training_expiry_handles_leap_day() {
        let leap = Utc.with_ymd_and_hms(2028, 2, 29, 12, 0, 0).unwrap();
        assert_eq!(training_expiry(leap), Utc.with_ymd_and_hms(2029, 2, 28, 12, 0, 0).unwrap());
    }

    #[test]
    fn permit_pass_issues_five_day_permit() {
        let outcome = ExamOutcome::evaluate(9, 10, 80);
        let Some(CredentialMutation::IssuePermit(permit)) =
            plan_mutation(ExamCategory::WorkPermit, &outcome, Some(" HW-2026-001 "), now())
        else {
            panic!("expected a permit");
        };
        assert_eq!(permit.permit_number, "HW-2026-001");
        assert_eq!(permit.issued_at, now());
        assert_eq!(permit.expires_at, Utc.with_ymd_and_hms(2026, 3, 15, 9, 30, 0).unwrap());
        assert_eq!(permit.status, "active");
        assert_eq!((permit.score, permit.max_score), (9, 10));
    }

    #[test]
    fn permit_number_falls_back_to_timestamp() {
        let outcome = ExamOutcome::evaluate(10, 10, 100);
        let Some(CredentialMutation::IssuePermit(permit)) =
            plan_mutation(ExamCategory::WorkPermit, &outcome, Some("   "), now())
        else {
            panic!("expected a permit");
        };
        assert_eq!(permit.permit_number, format!("WP-{}", now().timestamp_millis()));
    }

    #[test]
    fn notification_uses_sentinel_without_vendor() {
        let outcome = ExamOutcome::evaluate(9, 10, 80);
        let event = PermitNotification::new(&user(None), &outcome, "P-7");
        assert_eq!(event.organization, NO_AFFILIATION);
        assert_eq!((event.score, event.max_score), (9, 10));
        assert!(event.message().contains("Score: 9/10"));

        let event = PermitNotification::new(&user(Some("Siam Scaffolding")), &outcome, "P-7");
        assert_eq!(event.organization, "Siam Scaffolding");
        assert_eq!(event.permit_number, "P-7");
    }
}
