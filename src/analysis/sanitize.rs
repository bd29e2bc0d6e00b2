//! Turns raw model output into an [`AnalysisResult`].
//!
//! The model is asked for bare JSON but is not forced to comply, so every
//! step here assumes the worst: fences around the payload, missing keys,
//! wrong types, duplicate citations.

use super::error::{AnalysisError, Result, SchemaDeviation};
use super::prompt::{EXECUTION_PLAN_FIELDS, REQUIRED_FIELDS};
use crate::models::{score_from_value, AnalysisResult, GenerateContentResponse, Recommendation, Source};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const MAX_SOURCES: usize = 5;
pub const DEFAULT_SOURCE_TITLE: &str = "Source";

/// Sanitized output of one generation, plus whatever schema problems were
/// noticed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpreted {
    pub result: AnalysisResult,
    pub deviation: Option<SchemaDeviation>,
}

pub fn interpret(response: &GenerateContentResponse) -> Result<Interpreted> {
    let text = response_text(response).ok_or(AnalysisError::EmptyResponse)?;
    let (mut result, deviation) = parse_result(&text)?;
    result.sources = collect_sources(response);
    Ok(Interpreted { result, deviation })
}

/// Concatenated text parts of the first candidate, if any are non-blank.
pub fn response_text(response: &GenerateContentResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Removes a surrounding Markdown code fence (with or without a language
/// tag). Text that is not fenced is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) and the rest of its line,
    // whether or not the payload starts on the same line.
    let body = after_open
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_start_matches([' ', '\t']);
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

pub fn parse_result(text: &str) -> Result<(AnalysisResult, Option<SchemaDeviation>)> {
    let cleaned = strip_code_fence(text);
    let value: Value = serde_json::from_str(cleaned).map_err(|e| AnalysisError::InvalidFormat {
        raw: cleaned.to_string(),
        reason: e.to_string(),
    })?;
    let Value::Object(object) = value else {
        return Err(AnalysisError::InvalidFormat {
            raw: cleaned.to_string(),
            reason: "expected a JSON object".to_string(),
        });
    };

    let deviation = schema_deviation(&object);
    let result = serde_json::from_value(Value::Object(object)).map_err(|e| {
        AnalysisError::InvalidFormat {
            raw: cleaned.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok((result, deviation))
}

/// Web citations from the first candidate's grounding metadata, deduplicated
/// by URL (first occurrence wins) and capped at [`MAX_SOURCES`].
pub fn collect_sources(response: &GenerateContentResponse) -> Vec<Source> {
    let Some(metadata) = response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
    else {
        return Vec::new();
    };

    let sources = metadata.grounding_chunks.iter().filter_map(|chunk| {
        let web = chunk.web.as_ref()?;
        let url = web.uri.as_deref().filter(|u| !u.is_empty())?;
        let title = web
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_SOURCE_TITLE);
        Some(Source {
            title: title.to_string(),
            url: url.to_string(),
        })
    });
    dedup_sources(sources)
}

pub fn dedup_sources(sources: impl IntoIterator<Item = Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| seen.insert(source.url.clone()))
        .take(MAX_SOURCES)
        .collect()
}

/// Lists every way `object` departs from the requested schema.
pub fn schema_deviation(object: &Map<String, Value>) -> Option<SchemaDeviation> {
    let mut issues = Vec::new();

    for field in REQUIRED_FIELDS {
        let Some(value) = object.get(field) else {
            issues.push(format!("missing `{}`", field));
            continue;
        };
        let problem = match field {
            "marketRealismScore" => check_score(value),
            "recommendation" => check_recommendation(value),
            "executionPlan" => match value {
                Value::Object(plan) => {
                    check_plan(plan, &mut issues);
                    None
                }
                _ => Some("expected an object"),
            },
            "scoreJustification" | "reasoning" => check_string(value),
            _ => check_string_list(value),
        };
        if let Some(problem) = problem {
            issues.push(format!("`{}`: {}", field, problem));
        }
    }

    if issues.is_empty() {
        None
    } else {
        Some(SchemaDeviation { issues })
    }
}

fn check_plan(plan: &Map<String, Value>, issues: &mut Vec<String>) {
    for field in EXECUTION_PLAN_FIELDS {
        let Some(value) = plan.get(field) else {
            issues.push(format!("missing `executionPlan.{}`", field));
            continue;
        };
        let problem = match field {
            "techStackRecommendation" | "salesChannel" => check_string(value),
            _ => check_string_list(value),
        };
        if let Some(problem) = problem {
            issues.push(format!("`executionPlan.{}`: {}", field, problem));
        }
    }
}

fn check_score(value: &Value) -> Option<&'static str> {
    match value.as_f64() {
        Some(n) if (0.0..=100.0).contains(&n) && n.fract() == 0.0 => None,
        Some(_) => Some("expected an integer between 0 and 100"),
        None if score_from_value(value).is_some() => Some("expected a number, got a numeric string"),
        None => Some("expected a number"),
    }
}

fn check_recommendation(value: &Value) -> Option<&'static str> {
    match value.as_str() {
        Some(s) if s.parse::<Recommendation>().is_ok() => None,
        _ => Some("expected one of GO, ITERATE, NO-GO"),
    }
}

fn check_string(value: &Value) -> Option<&'static str> {
    if value.is_string() {
        None
    } else {
        Some("expected a string")
    }
}

fn check_string_list(value: &Value) -> Option<&'static str> {
    match value.as_array() {
        Some(items) if items.iter().all(Value::is_string) => None,
        Some(_) => Some("expected only strings"),
        None => Some("expected a list of strings"),
    }
}
