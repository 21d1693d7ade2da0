// src/models/category.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// The two assessment types a contractor can sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamCategory {
    /// General site safety induction. A pass extends the training card.
    Training,
    /// Work-permit exam. A pass issues a short-lived permit.
    WorkPermit,
}

impl ExamCategory {
    pub const ALL: [ExamCategory; 2] = [ExamCategory::Training, ExamCategory::WorkPermit];

    /// Tag stored in the `category` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamCategory::Training => "training",
            ExamCategory::WorkPermit => "work_permit",
        }
    }
}

impl fmt::Display for ExamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown exam category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for ExamCategory {
    type Err = UnknownCategory;

    /// Accepts any casing and `-`, `_` or space separators.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "training" | "general" => Ok(ExamCategory::Training),
            "workpermit" | "permit" => Ok(ExamCategory::WorkPermit),
            _ => Err(UnknownCategory(raw.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for ExamCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("training".parse::<ExamCategory>().unwrap(), ExamCategory::Training);
        assert_eq!("WORK_PERMIT".parse::<ExamCategory>().unwrap(), ExamCategory::WorkPermit);
        assert_eq!("Work-Permit".parse::<ExamCategory>().unwrap(), ExamCategory::WorkPermit);
        assert!("forklift".parse::<ExamCategory>().is_err());
    }

    #[test]
    fn serializes_to_column_tag() {
        let json = serde_json::to_string(&ExamCategory::WorkPermit).unwrap();
        assert_eq!(json, "\"work_permit\"");
        let back: ExamCategory = serde_json::from_str("\"TRAINING\"").unwrap();
        assert_eq!(back, ExamCategory::Training);
    }
}
