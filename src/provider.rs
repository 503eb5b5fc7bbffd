//! LLM-backed requirement extraction.
//!
//! The provider asks a local Ollama server to turn the instruction into a JSON object with
//! the same fields as [`Requirement`]. Anything that is not exactly that shape is a
//! [`ProviderError`]; the [`FallbackAnalyzer`](crate::analyzer::FallbackAnalyzer) turns
//! those into heuristic analyses.

use crate::analyzer::{RequirementProvider, annotate};
use crate::requirement::{Action, ConstraintKey, Requirement, push_unique};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const EXTRACTION_INSTRUCTIONS: &str = "You convert robot instructions into JSON. \
Return ONLY one JSON object with keys: \
actions (array of strings from: pick, place, move, wait, transfer), \
objects (array of strings), \
source_location (string or null), \
target_location (string or null), \
constraints (object with optional numeric fields payload_kg and reach_m). \
Do not add any other text.";

/// Provider failures. Never surfaced past the analyzer boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("response error: {0}")]
    Response(String),
    #[error("schema violation: {0}")]
    Schema(String),
}

/// Connection settings for an Ollama server.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Model tag, e.g. `gemma:2b`.
    pub model: String,
    /// Base URL of the server.
    pub endpoint: String,
    /// Upper bound on the whole request.
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: "gemma:2b".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct OllamaProvider {
    client: reqwest::blocking::Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

impl RequirementProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn extract(&self, text: &str) -> Result<Requirement, ProviderError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: format!("{EXTRACTION_INSTRUCTIONS}\n\nUser Instruction: {}\n", text.trim()),
            stream: false,
        };
        debug!(url = %self.url(), model = %self.config.model, "requesting requirement extraction");

        let response = self
            .client
            .post(self.url())
            .json(&request)
            .send()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let body: GenerateResponse = response
            .json()
            .map_err(|e| ProviderError::Response(e.to_string()))?;
        let output = body.response.or(body.output).unwrap_or_default();
        parse_requirement_json(text, &output)
    }
}

/// The wire shape a provider must produce. `actions` is mandatory and no other keys are
/// allowed, so a refusal or an unrelated object is a schema violation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequirementPayload {
    #[serde(alias = "detected_actions")]
    actions: Vec<String>,
    #[serde(default)]
    objects: Vec<String>,
    #[serde(default)]
    source_location: Option<String>,
    #[serde(default)]
    target_location: Option<String>,
    #[serde(default)]
    constraints: BTreeMap<String, serde_json::Value>,
}

/// Parses model output into a [`Requirement`], enforcing the requirement schema.
///
/// Prose around the JSON object is tolerated. A missing `actions` key, keys outside the
/// requirement schema, unknown action names and non-numeric constraint values are schema
/// violations; constraint keys other than `payload_kg` and `reach_m` are dropped.
pub fn parse_requirement_json(
    source_text: &str,
    output: &str,
) -> Result<Requirement, ProviderError> {
    let block = extract_first_json_block(output)
        .ok_or_else(|| ProviderError::Response("no JSON object in model output".to_string()))?;
    let payload: RequirementPayload =
        serde_json::from_str(block).map_err(|e| ProviderError::Schema(e.to_string()))?;

    let mut requirement = Requirement {
        source_text: source_text.trim().to_string(),
        ..Default::default()
    };

    let mut transfer = false;
    for raw in &payload.actions {
        if raw.trim().eq_ignore_ascii_case("transfer") {
            transfer = true;
            continue;
        }
        let action = raw
            .parse::<Action>()
            .map_err(|e| ProviderError::Schema(e.to_string()))?;
        push_unique(&mut requirement.actions, action);
    }
    if transfer {
        requirement.expand_transfer();
    }

    let mut seen = Vec::new();
    for object in payload.objects {
        let object = object.trim().to_string();
        let key = object.to_lowercase();
        if object.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        requirement.objects.push(object);
    }

    requirement.source_location = non_empty(payload.source_location);
    requirement.target_location = non_empty(payload.target_location);

    for (name, value) in payload.constraints {
        let Some(key) = ConstraintKey::from_name(&name) else {
            continue;
        };
        let value = value
            .as_f64()
            .ok_or_else(|| ProviderError::Schema(format!("constraint '{name}' is not a number")))?;
        requirement.constraints.insert(key, value);
    }

    annotate(&mut requirement);
    Ok(requirement)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The first balanced top-level `{...}` in `text`, skipping braces inside strings.
fn extract_first_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
