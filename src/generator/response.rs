use crate::ir::{CategoryGroup, RAW_CATEGORY};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\s*```\s*$").unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Answer text of the first candidate, thought summaries excluded.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Why no text came back, for error messages.
    pub fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return format!("prompt blocked: {reason}");
        }
        match self
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
        {
            Some(reason) => format!("finish reason {reason}"),
            None => "no candidates".to_string(),
        }
    }
}

pub fn strip_code_fences(text: &str) -> &str {
    match FENCE_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Turns the model's answer into ordered categories. Anything that is not a
/// `categories` object becomes a single `Raw` category holding the text.
pub fn parse_categories(text: &str) -> Vec<CategoryGroup> {
    match categories_from_json(strip_code_fences(text)) {
        Some(groups) => groups,
        None => vec![CategoryGroup {
            name: RAW_CATEGORY.to_string(),
            subqueries: vec![text.to_string()],
        }],
    }
}

fn categories_from_json(body: &str) -> Option<Vec<CategoryGroup>> {
    let value: Value = serde_json::from_str(body)
        .ok()
        .or_else(|| json5::from_str(body).ok())?;
    let categories = value.get("categories")?.as_object()?;

    let groups = categories
        .iter()
        .map(|(name, entries)| CategoryGroup {
            name: name.trim().to_string(),
            subqueries: subqueries_from(entries),
        })
        .filter(|group| !group.name.is_empty())
        .collect();
    Some(groups)
}

fn subqueries_from(entries: &Value) -> Vec<String> {
    let strings: Vec<&str> = match entries {
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        Value::String(single) => vec![single.as_str()],
        _ => Vec::new(),
    };
    strings
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(groups: &[CategoryGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn keeps_category_order_from_the_answer() {
        let text = r#"{"seed":"tea","locale":"en","categories":{
            "潜在ニーズの顕在化": ["b1", "b2"],
            "曖昧さの解消": ["a1"],
            "zeta": []
        }}"#;
        let groups = parse_categories(text);
        assert_eq!(names(&groups), vec!["潜在ニーズの顕在化", "曖昧さの解消", "zeta"]);
        assert_eq!(groups[0].subqueries, vec!["b1", "b2"]);
        assert!(groups[2].subqueries.is_empty());
    }

    #[test]
    fn strips_markdown_fences() {
        let text = "```json\n{\"categories\": {\"a\": [\"q\"]}}\n```";
        let groups = parse_categories(text);
        assert_eq!(names(&groups), vec!["a"]);
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn falls_back_to_json5() {
        let text = "{categories: {'a': ['q1', 'q2',],},}";
        let groups = parse_categories(text);
        assert_eq!(groups[0].subqueries, vec!["q1", "q2"]);
    }

    #[test]
    fn ignores_non_string_entries() {
        let text = r#"{"categories": {"a": ["q1", 3, null, "  ", {"x": 1}, "q2"], "b": 7}}"#;
        let groups = parse_categories(text);
        assert_eq!(groups[0].subqueries, vec!["q1", "q2"]);
        assert!(groups[1].subqueries.is_empty());
    }

    #[test]
    fn unparseable_answer_becomes_raw() {
        let text = "Sorry, I cannot help with that.";
        let groups = parse_categories(text);
        assert_eq!(
            groups,
            vec![CategoryGroup {
                name: RAW_CATEGORY.to_string(),
                subqueries: vec![text.to_string()],
            }]
        );
        let missing = parse_categories(r#"{"seed": "tea"}"#);
        assert_eq!(names(&missing), vec![RAW_CATEGORY]);
    }

    #[test]
    fn extracts_text_without_thoughts() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"text":"thinking...","thought":true},
            {"text":"{\"categories\":"},
            {"text":"{}}"}
        ]},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text(), "{\"categories\":{}}");
    }

    #[test]
    fn explains_empty_responses() {
        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(blocked.text(), "");
        assert_eq!(blocked.empty_reason(), "prompt blocked: SAFETY");
        let none: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(none.empty_reason(), "no candidates");
    }
}
