// src/exam/normalizer.rs

//! Turns raw question rows into typed questions.
//!
//! Nothing in here fails: a row whose payload cannot be read becomes an inert
//! question that renders but is never counted correct.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::question::QuestionRecord;

/// Answer-format discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    MultipleChoice,
    TrueFalse,
    Matching,
    ShortAnswer,
}

impl Pattern {
    /// Case-insensitive parse of the stored tag. Separators are ignored, so
    /// `MULTIPLE_CHOICE`, `multiple-choice` and `MultipleChoice` are the same.
    pub fn parse(raw: &str) -> Option<Pattern> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "multiplechoice" | "mcq" | "choice" => Some(Pattern::MultipleChoice),
            "truefalse" | "tf" | "boolean" => Some(Pattern::TrueFalse),
            "matching" | "match" => Some(Pattern::Matching),
            "shortanswer" | "short" | "text" => Some(Pattern::ShortAnswer),
            _ => None,
        }
    }
}

/// Thai/English text pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bilingual {
    pub th: String,
    pub en: String,
}

/// Correctness marker exactly as stored. Older rows hold `true`, newer ones `"True"`
/// or `"true"`. Only `grading` decodes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectFlag(pub Option<Value>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub text_th: String,
    #[serde(default)]
    pub text_en: String,
    #[serde(default)]
    pub is_correct: CorrectFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingPair {
    #[serde(default)]
    pub left_th: String,
    #[serde(default)]
    pub left_en: String,
    #[serde(default)]
    pub right_th: String,
    #[serde(default)]
    pub right_en: String,
}

#[derive(Debug, Deserialize)]
struct ShortAnswerKey {
    correct_answer: String,
}

/// Pattern-specific payload of a normalized question.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionBody {
    Choice {
        pattern: Pattern,
        choices: Vec<Choice>,
        /// Authoritative answer key. Overrides the per-choice flags when present.
        correct_index: Option<usize>,
    },
    ShortAnswer {
        correct_answer: String,
    },
    Matching {
        pairs: Vec<MatchingPair>,
    },
    /// Missing pattern or unreadable payload.
    Inert,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i64,
    pub content: Bilingual,
    pub image_url: Option<String>,
    pub body: QuestionBody,
}

impl Question {
    pub fn pattern(&self) -> Option<Pattern> {
        match &self.body {
            QuestionBody::Choice { pattern, .. } => Some(*pattern),
            QuestionBody::ShortAnswer { .. } => Some(Pattern::ShortAnswer),
            QuestionBody::Matching { .. } => Some(Pattern::Matching),
            QuestionBody::Inert => None,
        }
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.body, QuestionBody::Inert)
    }
}

/// Normalizes a batch of rows, preserving order.
pub fn normalize(records: Vec<QuestionRecord>) -> Vec<Question> {
    records.into_iter().map(normalize_record).collect()
}

pub fn normalize_record(record: QuestionRecord) -> Question {
    let body = match record.pattern.as_deref().and_then(Pattern::parse) {
        None => {
            tracing::warn!(
                question_id = record.id,
                pattern = ?record.pattern,
                "Question has no recognizable pattern, treating as inert"
            );
            QuestionBody::Inert
        }
        Some(pattern) => build_body(record.id, pattern, &record.choices, record.correct_index),
    };

    Question {
        id: record.id,
        content: Bilingual {
            th: record.content_th,
            en: record.content_en,
        },
        image_url: record.image_url.filter(|url| !url.trim().is_empty()),
        body,
    }
}

fn build_body(id: i64, pattern: Pattern, payload: &Value, correct_index: Option<i32>) -> QuestionBody {
    match pattern {
        Pattern::MultipleChoice | Pattern::TrueFalse => {
            let choices: Vec<Choice> = parse_payload(id, payload);
            if choices.is_empty() {
                return QuestionBody::Inert;
            }
            QuestionBody::Choice {
                pattern,
                choices,
                correct_index: correct_index.and_then(|i| usize::try_from(i).ok()),
            }
        }
        Pattern::ShortAnswer => {
            let keys: Vec<ShortAnswerKey> = parse_payload(id, payload);
            match keys.into_iter().next() {
                Some(key) => QuestionBody::ShortAnswer {
                    correct_answer: key.correct_answer,
                },
                None => QuestionBody::Inert,
            }
        }
        Pattern::Matching => {
            let pairs: Vec<MatchingPair> = parse_payload(id, payload);
            if pairs.is_empty() {
                return QuestionBody::Inert;
            }
            QuestionBody::Matching { pairs }
        }
    }
}

/// Decodes a payload that is either a JSON array or a string holding one.
/// Any failure yields an empty sequence.
fn parse_payload<T: DeserializeOwned>(id: i64, payload: &Value) -> Vec<T> {
    let decoded = match payload {
        Value::String(encoded) => serde_json::from_str::<Vec<T>>(encoded),
        Value::Null => Ok(Vec::new()),
        other => Vec::<T>::deserialize(other),
    };

    decoded.unwrap_or_else(|e| {
        tracing::warn!(question_id = id, "Unreadable choice payload: {}", e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64, pattern: Option<&str>, choices: Value) -> QuestionRecord {
        QuestionRecord {
            id,
            category: "training".to_string(),
            content_th: format!("คำถาม {}", id),
            content_en: format!("Question {}", id),
            pattern: pattern.map(str::to_string),
            choices,
            correct_index: None,
            image_url: None,
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn pattern_parse_is_case_insensitive() {
        assert_eq!(Pattern::parse("MATCHING"), Some(Pattern::Matching));
        assert_eq!(Pattern::parse("matching"), Some(Pattern::Matching));
        assert_eq!(Pattern::parse("Multiple-Choice"), Some(Pattern::MultipleChoice));
        assert_eq!(Pattern::parse("TRUE_FALSE"), Some(Pattern::TrueFalse));
        assert_eq!(Pattern::parse(" short_answer "), Some(Pattern::ShortAnswer));
        assert_eq!(Pattern::parse("essay"), None);
    }

    #[test]
    fn decodes_string_encoded_payload() {
        let encoded = json!([
            { "text_th": "ก", "text_en": "A", "is_correct": "true" },
            { "text_th": "ข", "text_en": "B", "is_correct": false }
        ])
        .to_string();

        let q = normalize_record(record(1, Some("MULTIPLE_CHOICE"), Value::String(encoded)));
        match q.body {
            QuestionBody::Choice { choices, .. } => {
                assert_eq!(choices.len(), 2);
                assert_eq!(choices[0].text_en, "A");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_becomes_inert() {
        let q = normalize_record(record(2, Some("multiple_choice"), Value::String("[{oops".into())));
        assert!(q.is_inert());

        let q = normalize_record(record(3, Some("matching"), json!({"not": "an array"})));
        assert!(q.is_inert());
    }

    #[test]
    fn missing_pattern_becomes_inert() {
        let q = normalize_record(record(4, None, json!([{ "text_en": "A", "is_correct": true }])));
        assert!(q.is_inert());
        assert_eq!(q.pattern(), None);
    }

    #[test]
    fn negative_correct_index_is_dropped() {
        let mut rec = record(5, Some("true_false"), json!([{ "text_en": "T" }, { "text_en": "F" }]));
        rec.correct_index = Some(-1);
        match normalize_record(rec).body {
            QuestionBody::Choice { correct_index, .. } => assert_eq!(correct_index, None),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn short_answer_reads_first_key() {
        let q = normalize_record(record(6, Some("SHORT_ANSWER"), json!([{ "correct_answer": "Helmet" }])));
        assert_eq!(
            q.body,
            QuestionBody::ShortAnswer {
                correct_answer: "Helmet".to_string()
            }
        );
    }

    #[test]
    fn preserves_input_order() {
        let records = vec![
            record(30, Some("matching"), json!([{ "left_en": "a", "right_en": "1" }])),
            record(10, None, Value::Null),
            record(20, Some("short_answer"), json!([{ "correct_answer": "x" }])),
        ];
        let ids: Vec<i64> = normalize(records).iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }
}
