// src/exam/mod.rs

//! The exam engine: question normalization, presentation, answer collection,
//! grading, eligibility and the post-result credential change, tied together
//! by the session state machine.

pub mod answers;
pub mod controller;
pub mod credential;
pub mod eligibility;
pub mod grading;
pub mod normalizer;
pub mod randomizer;
pub mod registry;
pub mod session;
