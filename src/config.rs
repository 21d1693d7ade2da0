// src/config.rs

use std::env;
use dotenvy::dotenv;

use crate::models::category::ExamCategory;

/// Questions rendered per page while an exam is in progress.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Fallback pass percentage used when no threshold is configured for a category.
pub const DEFAULT_PASS_THRESHOLD: u8 = 80;

/// Lifetime of a freshly issued work permit.
pub const PERMIT_VALIDITY_DAYS: i64 = 5;

/// Lifetime of a training credential, counted from grading time.
pub const TRAINING_VALIDITY_MONTHS: u32 = 12;

/// Open sessions older than this are dropped from memory.
pub const SESSION_MAX_AGE_HOURS: i64 = 12;

/// How often the session sweep runs.
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// JWT lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Chat webhook that receives permit approvals. Notifications are only logged when unset.
    pub notify_webhook_url: Option<String>,
    pub exam_page_size: usize,
    pub training_threshold: u8,
    pub permit_threshold: u8,
    pub training_manual_url: Option<String>,
    pub permit_manual_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let exam_page_size = env::var("EXAM_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            exam_page_size,
            training_threshold: threshold_from_env("TRAINING_PASS_THRESHOLD"),
            permit_threshold: threshold_from_env("PERMIT_PASS_THRESHOLD"),
            training_manual_url: env::var("TRAINING_MANUAL_URL").ok(),
            permit_manual_url: env::var("PERMIT_MANUAL_URL").ok(),
        }
    }

    /// Pass percentage applied when the settings store has nothing for `category`.
    pub fn fallback_threshold(&self, category: ExamCategory) -> u8 {
        match category {
            ExamCategory::Training => self.training_threshold,
            ExamCategory::WorkPermit => self.permit_threshold,
        }
    }

    pub fn manual_url(&self, category: ExamCategory) -> Option<&str> {
        match category {
            ExamCategory::Training => self.training_manual_url.as_deref(),
            ExamCategory::WorkPermit => self.permit_manual_url.as_deref(),
        }
    }
}

fn threshold_from_env(name: &str) -> u8 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v.min(100))
        .unwrap_or(DEFAULT_PASS_THRESHOLD)
}
