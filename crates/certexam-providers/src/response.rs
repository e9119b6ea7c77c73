//! Turning raw completion text into exam questions.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use certexam_core::error::GenerationError;
use certexam_core::model::{Difficulty, FinalExamQuestion, QuestionType};

/// Pull the JSON payload out of a completion.
///
/// Prefers the contents of a fenced `json` (or untagged) code block and
/// falls back to the whole text. Within that, takes everything from the
/// first `{` to the last `}`.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let source = fenced_block(response).unwrap_or(response);
    let start = source.find('{')?;
    let end = source.rfind('}')?;
    (end > start).then(|| &source[start..=end])
}

fn fenced_block(response: &str) -> Option<&str> {
    let mut offset = 0;
    let mut open: Option<usize> = None;
    let mut skipping = false;
    for line in response.split_inclusive('\n') {
        let trimmed = line.trim();
        match open {
            None if trimmed.starts_with("```") => {
                let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
                if skipping {
                    skipping = false;
                } else if lang.is_empty() || lang == "json" {
                    open = Some(offset + line.len());
                } else {
                    skipping = true;
                }
            }
            Some(start) if trimmed == "```" => return Some(&response[start..offset]),
            _ => {}
        }
        offset += line.len();
    }
    // Truncated block: keep what arrived.
    open.map(|start| &response[start..])
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    questions: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawQuestion {
    question: Option<Value>,
    #[serde(rename = "type")]
    question_type: Option<String>,
    difficulty: Option<String>,
    options: Option<Vec<Value>>,
    correct_answer: Option<Value>,
    correct_answers: Option<Vec<Value>>,
    explanation: Option<Value>,
    code_context: Option<Value>,
    topic: Option<Value>,
}

/// Strings pass through; numbers and booleans are rendered; null and
/// structured values are treated as absent.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn texts(values: Option<Vec<Value>>) -> Option<Vec<String>> {
    values.map(|vs| vs.into_iter().filter_map(|v| text(Some(v))).collect())
}

impl RawQuestion {
    fn into_question(self) -> Option<FinalExamQuestion> {
        let question_type = match self.question_type.as_deref() {
            None => QuestionType::MultipleChoice,
            Some(t) => match t.parse() {
                Ok(qt) => qt,
                Err(e) => {
                    tracing::debug!("dropping generated question: {e}");
                    return None;
                }
            },
        };
        let difficulty = self
            .difficulty
            .and_then(|d| d.parse().ok())
            .unwrap_or(Difficulty::Medium);
        Some(FinalExamQuestion {
            id: Uuid::new_v4().to_string(),
            question: text(self.question).unwrap_or_default(),
            question_type,
            difficulty,
            options: texts(self.options),
            correct_answer: text(self.correct_answer).filter(|a| !a.is_empty()),
            correct_answers: texts(self.correct_answers),
            explanation: text(self.explanation).unwrap_or_default(),
            code_context: text(self.code_context).filter(|c| !c.is_empty()),
            topic: text(self.topic).unwrap_or_default(),
            min_time_seconds: 0,
            max_time_seconds: 0,
        })
    }
}

/// Parse one generation response into scorable questions.
///
/// Every question gets a fresh id. Questions that cannot be scored are
/// dropped. Time bounds are left at zero; they are stamped when an attempt
/// draws the question.
pub fn parse_questions(response: &str) -> Result<Vec<FinalExamQuestion>, GenerationError> {
    let json = extract_json_object(response)
        .ok_or_else(|| GenerationError::Malformed("no JSON object in response".into()))?;
    let raw: RawResponse = serde_json::from_str(json)
        .map_err(|e| GenerationError::Malformed(format!("invalid JSON: {e}")))?;
    let entries = raw
        .questions
        .ok_or_else(|| GenerationError::Malformed("missing `questions` array".into()))?;

    let total = entries.len();
    let questions: Vec<FinalExamQuestion> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawQuestion>(entry).ok())
        .filter_map(RawQuestion::into_question)
        .filter(FinalExamQuestion::is_scorable)
        .collect();
    if questions.len() < total {
        tracing::debug!(
            kept = questions.len(),
            dropped = total - questions.len(),
            "filtered generated questions"
        );
    }
    Ok(questions)
}
