// src/models/mod.rs

pub mod category;
pub mod exam_record;
pub mod permit;
pub mod question;
pub mod user;
