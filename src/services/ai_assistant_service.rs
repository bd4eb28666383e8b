use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::time::Duration;

use crate::config::GeminiSettings;
use crate::utils::error::{AppError, AppResult};

const GENERATION_FAILED: &str = "Error generating AI response";
const LENGTH_HINT: &str = "Keep the response concise, between 15 and 20 lines.";

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantKind {
    Itinerary,
    PackingList,
    BudgetEstimate,
}

impl FromStr for AssistantKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "itinerary" => Ok(AssistantKind::Itinerary),
            "packing-list" => Ok(AssistantKind::PackingList),
            "budget-estimate" => Ok(AssistantKind::BudgetEstimate),
            _ => Err(AppError::bad_request("Invalid AI assistant type")),
        }
    }
}

/// `{type, ...formData}` as the client sends it.
#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub form: Map<String, Value>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AssistantResponse {
    pub response: String,
}

/// Reads a form field as text. Numbers are accepted so `duration: 5` works.
fn field(form: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match form.get(*name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn required(form: &Map<String, Value>, names: &[&str]) -> AppResult<String> {
    field(form, names).ok_or_else(|| AppError::bad_request(format!("{} is required", names[0])))
}

/// Trip length without a trailing "day"/"days" unit; the templates add their own.
fn trip_length(form: &Map<String, Value>) -> AppResult<String> {
    let raw = required(form, &["duration", "days"])?;
    let lower = raw.to_ascii_lowercase();
    let kept = ["days", "day"]
        .iter()
        .find_map(|unit| lower.strip_suffix(unit))
        .map(|rest| raw[..rest.len()].trim_end())
        .filter(|rest| rest.ends_with(|c: char| c.is_ascii_digit()));
    Ok(kept.map(str::to_string).unwrap_or(raw))
}

pub fn build_prompt(kind: AssistantKind, form: &Map<String, Value>) -> AppResult<String> {
    let destination = required(form, &["destination"])?;

    let prompt = match kind {
        AssistantKind::Itinerary => {
            let interests = required(form, &["interests"])?;
            format!(
                "Generate a 2-day travel itinerary for {} focusing on {}. Include activities, places to visit, and estimated times. {}",
                destination, interests, LENGTH_HINT
            )
        }
        AssistantKind::PackingList => {
            let duration = trip_length(form)?;
            let season = required(form, &["season"])?;
            format!(
                "Create a packing list for a trip to {} for {} days, considering the weather in {}. {}",
                destination, duration, season, LENGTH_HINT
            )
        }
        AssistantKind::BudgetEstimate => {
            let duration = trip_length(form)?;
            format!(
                "Provide a budget estimate for a trip to {} for {} days, including categories like accommodation, flights, food, and activities. {}",
                destination, duration, LENGTH_HINT
            )
        }
    };

    Ok(prompt)
}

/// Validates the request, builds the prompt and asks the generator.
pub async fn suggest(
    generator: &dyn TextGenerator,
    request: &AssistantRequest,
) -> AppResult<AssistantResponse> {
    let kind: AssistantKind = request.kind.as_deref().unwrap_or_default().parse()?;
    let prompt = build_prompt(kind, &request.form)?;

    let response = generator
        .generate(&prompt)
        .await
        .map_err(|detail| AppError::Upstream {
            msg: GENERATION_FAILED.to_string(),
            detail,
        })?;

    Ok(AssistantResponse { response })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| "GEMINI_API_KEY is not configured".to_string())?;

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&json!({ "contents": [ { "parts": [ { "text": prompt } ] } ] }))
            .send()
            .await
            .map_err(|e| format!("Gemini request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Gemini API error: {} {}", status, body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Gemini response: {}", e))?;

        extract_text(parsed).ok_or_else(|| "Gemini returned no text".to_string())
    }
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        prompts: Mutex<Vec<String>>,
        reply: Result<String, String>,
    }

    #[async_trait]
    impl TextGenerator for Recorder {
        async fn generate(&self, prompt: &str) -> Result<String, String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn form(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn kinds_parse_from_wire_names() {
        assert_eq!("packing-list".parse::<AssistantKind>().unwrap(), AssistantKind::PackingList);
        assert!("horoscope".parse::<AssistantKind>().is_err());
        assert!("".parse::<AssistantKind>().is_err());
    }

    #[test]
    fn itinerary_prompt_matches_template() {
        let prompt = build_prompt(
            AssistantKind::Itinerary,
            &form(json!({ "destination": "Lisbon", "interests": "food and tiles" })),
        )
        .unwrap();
        assert_eq!(
            prompt,
            "Generate a 2-day travel itinerary for Lisbon focusing on food and tiles. Include activities, places to visit, and estimated times. Keep the response concise, between 15 and 20 lines."
        );
    }

    #[test]
    fn packing_list_accepts_days_as_duration() {
        let prompt = build_prompt(
            AssistantKind::PackingList,
            &form(json!({ "destination": "Oslo", "days": 4, "season": "winter" })),
        )
        .unwrap();
        assert_eq!(
            prompt,
            "Create a packing list for a trip to Oslo for 4 days, considering the weather in winter. Keep the response concise, between 15 and 20 lines."
        );
    }

    #[test]
    fn budget_prompt_matches_template() {
        let prompt = build_prompt(
            AssistantKind::BudgetEstimate,
            &form(json!({ "destination": "Hanoi", "duration": "10" })),
        )
        .unwrap();
        assert!(prompt.starts_with("Provide a budget estimate for a trip to Hanoi for 10 days"));
        assert!(prompt.ends_with(LENGTH_HINT));
    }

    #[test]
    fn day_units_in_duration_are_not_repeated() {
        for (raw, expected) in [("7 days", "7"), ("1 day", "1"), ("3Days", "3"), ("10", "10"), ("a week", "a week")] {
            let prompt = build_prompt(
                AssistantKind::BudgetEstimate,
                &form(json!({ "destination": "Hanoi", "duration": raw })),
            )
            .unwrap();
            let phrase = format!("for {} days,", expected);
            assert!(prompt.contains(&phrase), "{:?} gave {:?}", raw, prompt);
            assert!(!prompt.contains("days days"));
        }
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        let result = build_prompt(AssistantKind::PackingList, &form(json!({ "destination": "Oslo" })));
        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "duration is required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn request_splits_type_from_form() {
        let request: AssistantRequest =
            serde_json::from_value(json!({ "type": "itinerary", "destination": "Rome" })).unwrap();
        assert_eq!(request.kind.as_deref(), Some("itinerary"));
        assert_eq!(request.form.get("destination"), Some(&json!("Rome")));
        assert!(request.form.get("type").is_none());
    }

    #[tokio::test]
    async fn suggest_forwards_the_prompt() {
        let recorder = Recorder {
            prompts: Mutex::new(Vec::new()),
            reply: Ok("Day 1: ...".to_string()),
        };
        let request: AssistantRequest = serde_json::from_value(json!({
            "type": "budget-estimate", "destination": "Cairo", "duration": 3
        }))
        .unwrap();

        let response = suggest(&recorder, &request).await.unwrap();
        assert_eq!(response.response, "Day 1: ...");
        assert_eq!(recorder.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_type_never_reaches_the_generator() {
        let recorder = Recorder {
            prompts: Mutex::new(Vec::new()),
            reply: Ok(String::new()),
        };
        let request: AssistantRequest =
            serde_json::from_value(json!({ "type": "weather" })).unwrap();

        assert!(matches!(suggest(&recorder, &request).await, Err(AppError::BadRequest(_))));
        assert!(recorder.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generator_failures_become_upstream_errors() {
        let recorder = Recorder {
            prompts: Mutex::new(Vec::new()),
            reply: Err("quota exceeded".to_string()),
        };
        let request: AssistantRequest = serde_json::from_value(json!({
            "type": "itinerary", "destination": "Lima", "interests": "ceviche"
        }))
        .unwrap();

        match suggest(&recorder, &request).await {
            Err(AppError::Upstream { msg, detail }) => {
                assert_eq!(msg, GENERATION_FAILED);
                assert_eq!(detail, "quota exceeded");
            }
            other => panic!("unexpected: {:?}", other.map(|r| r.response)),
        }
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let client = GeminiClient::new(crate::config::test_config().gemini);
        assert!(client.generate("hi").await.is_err());
    }

    #[test]
    fn text_parts_are_joined() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [ { "content": { "parts": [ { "text": "Pack " }, { "text": "light." } ] } } ]
        }))
        .unwrap();
        assert_eq!(extract_text(parsed).as_deref(), Some("Pack light."));

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(extract_text(empty).is_none());
    }
}
