//! Decoder for remote test records.
//!
//! The remote document store is loosely typed: depending on how a record was
//! authored, `sections` and `questions` arrive either as JSON arrays or as
//! objects keyed by child id. This module is the one place that knows those
//! rules; everything downstream works with the typed [`Test`] model.

use crate::error::{DecodeError, Result};
use crate::types::{Explanation, NumericRange, Question, QuestionKind, Section, Test};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Highest record version this decoder understands. Records without a
/// `schemaVersion` field are treated as version 1.
pub const RECORD_VERSION: u64 = 1;

/// Decode a test record fetched from the remote store. The record id is
/// passed separately because the store keys records by id rather than
/// embedding it.
pub fn decode_test(id: &str, value: &Value) -> Result<Test> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    if let Some(version) = obj.get("schemaVersion").and_then(Value::as_u64) {
        if version > RECORD_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
    }

    let title = require_str(obj, "title")?;
    let duration_minutes = number(obj.get("duration")).unwrap_or(0.0) as i64;
    if duration_minutes <= 0 {
        return Err(DecodeError::InvalidField {
            field: "duration",
            reason: format!("expected a positive minute count, got {duration_minutes}"),
        });
    }

    let sections = ordered_children(obj.get("sections"))
        .into_iter()
        .map(decode_section)
        .collect::<Result<Vec<_>>>()?;
    if sections.is_empty() {
        return Err(DecodeError::NoSections { id: id.to_string() });
    }

    Ok(Test {
        id: id.to_string(),
        title,
        description: optional_str(obj, "description"),
        subject: optional_str(obj, "subject"),
        duration_minutes: duration_minutes as u32,
        total_marks: number(obj.get("totalMarks")).unwrap_or(0.0),
        sections,
        course_id: optional_str(obj, "courseId"),
        max_attempts: number(obj.get("maxAttempts")).unwrap_or(0.0) as u32,
    })
}

fn decode_section(value: &Value) -> Result<Section> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let questions = ordered_children(obj.get("questions"))
        .into_iter()
        .map(decode_question)
        .collect::<Result<Vec<_>>>()?;

    Ok(Section {
        id: optional_str(obj, "id"),
        title: optional_str(obj, "title"),
        default_marks: number(obj.get("defaultMarks")).unwrap_or(0.0),
        default_negative_marks: number(obj.get("defaultNegativeMarks")).unwrap_or(0.0),
        questions,
    })
}

fn decode_question(value: &Value) -> Result<Question> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let id = optional_str(obj, "id");
    let tag = require_str(obj, "questionType")?;
    let kind = QuestionKind::parse(&tag).ok_or_else(|| DecodeError::UnknownQuestionKind {
        id: id.clone(),
        value: tag,
    })?;

    let options: BTreeMap<String, String> = obj
        .get("options")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let correct_keys: BTreeSet<String> = obj
        .get("correctAnswers")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let numeric_range = obj
        .get("correctNumericalAnswerRange")
        .and_then(Value::as_object)
        .map(|range| NumericRange {
            from: number(range.get("from")).unwrap_or(0.0),
            to: number(range.get("to")).unwrap_or(0.0),
        });

    let explanation = obj
        .get("explanation")
        .and_then(Value::as_object)
        .map(|exp| Explanation {
            text: optional_str(exp, "text"),
            image_url: optional_str(exp, "imageUrl"),
        });

    Ok(Question {
        id,
        text: optional_str(obj, "questionText"),
        image: optional_str(obj, "questionImage"),
        kind,
        options,
        correct_keys,
        numeric_range,
        marks: number(obj.get("marks")).unwrap_or(0.0),
        negative_marks: number(obj.get("negativeMarks")).unwrap_or(0.0),
        explanation,
    })
}

/// Collect child records whether the parent field is an array or an object.
/// Object children are ordered by their `id` field so both encodings yield
/// the same stable order.
fn ordered_children(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => {
            let mut children: Vec<&Value> = map.values().collect();
            children.sort_by_key(|v| {
                v.as_object()
                    .and_then(|o| o.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            });
            children
        }
        _ => Vec::new(),
    }
}

/// Accept integers or floats for fields the store encodes inconsistently.
fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn require_str(obj: &serde_json::Map<String, Value>, field: &'static str) -> Result<String> {
    match obj.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(DecodeError::MissingField(field)),
    }
}

fn optional_str(obj: &serde_json::Map<String, Value>, field: &str) -> String {
    obj.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record_with_sections(sections: Value) -> Value {
        json!({
            "title": "Mock Test 1",
            "duration": 60,
            "totalMarks": 100,
            "sections": sections,
        })
    }

    fn question(id: &str) -> Value {
        json!({
            "id": id,
            "questionText": "Pick one",
            "questionType": "MCQ",
            "options": {"a": "first", "b": "second"},
            "correctAnswers": ["b"],
            "marks": 4,
            "negativeMarks": 1,
        })
    }

    #[test]
    fn decodes_sections_as_array() {
        let record = record_with_sections(json!([
            {"id": "s1", "title": "Physics", "questions": [question("q1"), question("q2")]},
        ]));
        let test = decode_test("t1", &record).unwrap();
        assert_eq!(test.sections.len(), 1);
        assert_eq!(test.sections[0].questions.len(), 2);
        assert_eq!(test.question_count(), 2);
    }

    #[test]
    fn decodes_sections_as_map_ordered_by_id() {
        let record = record_with_sections(json!({
            "s2": {"id": "s2", "title": "Chemistry", "questions": [question("q3")]},
            "s1": {"id": "s1", "title": "Physics", "questions": [question("q1")]},
        }));
        let test = decode_test("t1", &record).unwrap();
        assert_eq!(test.sections[0].id, "s1");
        assert_eq!(test.sections[1].id, "s2");
    }

    #[test]
    fn decodes_questions_as_map() {
        let record = record_with_sections(json!([
            {"id": "s1", "questions": {"q2": question("q2"), "q1": question("q1")}},
        ]));
        let test = decode_test("t1", &record).unwrap();
        let ids: Vec<&str> = test.all_questions().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2"]);
    }

    #[test]
    fn accepts_integer_and_float_numbers() {
        let mut q = question("q1");
        q["marks"] = json!(2.5);
        let record = record_with_sections(json!([{"id": "s1", "questions": [q]}]));
        let test = decode_test("t1", &record).unwrap();
        let q = test.all_questions().next().unwrap();
        assert_eq!(q.marks, 2.5);
        assert_eq!(q.negative_marks, 1.0);
    }

    #[test]
    fn decodes_numeric_question_range() {
        let record = record_with_sections(json!([{
            "id": "s1",
            "questions": [{
                "id": "q1",
                "questionType": "ShortAnswer",
                "correctNumericalAnswerRange": {"from": 5, "to": 5.5},
                "marks": 4,
            }],
        }]));
        let test = decode_test("t1", &record).unwrap();
        let q = test.all_questions().next().unwrap();
        assert_eq!(q.kind, QuestionKind::Numeric);
        assert_eq!(q.numeric_range, Some(NumericRange { from: 5.0, to: 5.5 }));
    }

    #[test]
    fn rejects_missing_title() {
        let record = json!({"duration": 60, "sections": []});
        assert!(matches!(
            decode_test("t1", &record),
            Err(DecodeError::MissingField("title"))
        ));
    }

    #[test]
    fn rejects_zero_duration() {
        let record = json!({"title": "T", "duration": 0, "sections": []});
        assert!(matches!(
            decode_test("t1", &record),
            Err(DecodeError::InvalidField { field: "duration", .. })
        ));
    }

    #[test]
    fn rejects_empty_sections() {
        let record = record_with_sections(json!([]));
        assert!(matches!(
            decode_test("t1", &record),
            Err(DecodeError::NoSections { .. })
        ));
    }

    #[test]
    fn rejects_unknown_question_type() {
        let record = record_with_sections(json!([{
            "id": "s1",
            "questions": [{"id": "q1", "questionType": "Essay", "marks": 4}],
        }]));
        assert!(matches!(
            decode_test("t1", &record),
            Err(DecodeError::UnknownQuestionKind { .. })
        ));
    }

    #[test]
    fn rejects_future_record_version() {
        let mut record = record_with_sections(json!([{"id": "s1", "questions": [question("q1")]}]));
        record["schemaVersion"] = json!(2);
        assert!(matches!(
            decode_test("t1", &record),
            Err(DecodeError::UnsupportedVersion(2))
        ));
    }
}
