//! Blocking client for the Gemini `generateContent` REST endpoint.
//!
//! Calls `POST {base}/v1beta/models/{model}:generateContent` with the key in
//! the `x-goog-api-key` header. Transport errors, HTTP 429 and 5xx are
//! retried with linear backoff.

use super::GeneratorError;
use super::prompt::build_prompt;
use super::response::{GenerateContentResponse, parse_categories};
use crate::config::GeneratorConfig;
use crate::ir::{FanoutResult, Locale};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_LOW_AND_ABOVE";

pub struct GeminiClient {
    http: Client,
    api_key: String,
    config: GeneratorConfig,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GeneratorError::MissingApiKey);
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self::with_http_client(http, api_key, config))
    }

    pub fn with_http_client(http: Client, api_key: String, config: GeneratorConfig) -> Self {
        Self {
            http,
            api_key,
            config,
        }
    }

    /// Reads the key from `GEMINI_API_KEY`.
    pub fn from_env(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| GeneratorError::MissingApiKey)?;
        Self::new(api_key, config)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    pub fn request_body(&self, prompt: &str) -> Value {
        let safety: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": SAFETY_THRESHOLD }))
            .collect();
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": self.config.temperature,
                "thinkingConfig": { "thinkingBudget": self.config.thinking_budget },
            },
            "safetySettings": safety,
        });
        if self.config.enable_search {
            body["tools"] = json!([{ "googleSearch": {} }]);
        }
        body
    }

    /// Expands `seed` into categorized sub-queries. The locale is detected
    /// from the seed when not given.
    pub fn generate_fanout(
        &self,
        seed: &str,
        locale: Option<Locale>,
    ) -> Result<FanoutResult, GeneratorError> {
        let seed = seed.trim();
        if seed.is_empty() {
            return Err(GeneratorError::EmptySeed);
        }
        let locale = locale.unwrap_or_else(|| Locale::detect(seed));
        let prompt = build_prompt(seed, locale, self.config.max_per_category);

        info!(
            model = %self.config.model,
            %locale,
            search = self.config.enable_search,
            "requesting query fan-out"
        );
        let response = self.post_with_retry(&self.request_body(&prompt))?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GeneratorError::EmptyResponse {
                reason: response.empty_reason(),
            });
        }

        let mut result = FanoutResult::new(seed, locale);
        for group in parse_categories(&text) {
            result.push_category(group.name, group.subqueries);
        }
        info!(
            categories = result.categories.len(),
            subqueries = result.total_subqueries(),
            "fan-out generated"
        );
        Ok(result)
    }

    fn post_with_retry(&self, body: &Value) -> Result<GenerateContentResponse, GeneratorError> {
        let url = self.endpoint();
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(%url, attempt, "POST generateContent");
            let err = match self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send()
            {
                Ok(resp) if resp.status().is_success() => return Ok(resp.json()?),
                Ok(resp) => {
                    let status = resp.status();
                    let message = api_error_message(&resp.text().unwrap_or_default());
                    let err = GeneratorError::Api {
                        status: status.as_u16(),
                        message,
                    };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(err) => GeneratorError::Http(err),
            };
            if attempt >= attempts {
                return Err(err);
            }
            warn!(attempt, max_attempts = attempts, error = %err, "retrying Gemini request");
            std::thread::sleep(Duration::from_millis(
                self.config.retry_backoff_ms * u64::from(attempt),
            ));
            attempt += 1;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pulls `error.message` out of a Gemini error body, or returns the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    fn test_config(base_url: String) -> GeneratorConfig {
        GeneratorConfig {
            base_url,
            timeout_secs: 5,
            max_attempts: 3,
            retry_backoff_ms: 0,
            ..GeneratorConfig::default()
        }
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse::<usize>().unwrap())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serves one canned `(status, body)` per connection and reports each
    /// raw request back.
    fn serve(responses: Vec<(u16, String)>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let request = read_request(&mut stream);
                tx.send(request).unwrap();
                let reply = format!(
                    "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
        });
        (format!("http://{addr}"), rx)
    }

    /// Client that talks to the local test server directly, ignoring any
    /// proxy set in the environment.
    fn local_client(base_url: String) -> GeminiClient {
        local_client_with(test_config(base_url))
    }

    fn local_client_with(config: GeneratorConfig) -> GeminiClient {
        let http = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap();
        GeminiClient::with_http_client(http, "secret".to_string(), config)
    }

    fn answer(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] }, "finishReason": "STOP" }]
        })
        .to_string()
    }

    #[test]
    fn builds_request_body() {
        let mut config = GeneratorConfig::default();
        let client = GeminiClient::new("key", config.clone()).unwrap();
        let body = client.request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], -1);
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == SAFETY_THRESHOLD));
        assert!(body.get("tools").is_none());

        config.enable_search = true;
        let client = GeminiClient::new("key", config).unwrap();
        assert_eq!(client.request_body("hi")["tools"][0], json!({ "googleSearch": {} }));
    }

    #[test]
    fn endpoint_uses_model_name() {
        let client = GeminiClient::new(
            "key",
            test_config("https://example.test/".to_string()),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn rejects_empty_key_and_seed() {
        assert!(matches!(
            GeminiClient::new("  ", GeneratorConfig::default()),
            Err(GeneratorError::MissingApiKey)
        ));
        let client = GeminiClient::new("key", GeneratorConfig::default()).unwrap();
        assert!(matches!(
            client.generate_fanout("   ", None),
            Err(GeneratorError::EmptySeed)
        ));
    }

    #[test]
    fn generates_fanout_from_answer() {
        let text = r#"{"seed":"tea","locale":"en","categories":{"曖昧さの解消":["q1","q2"],"潜在ニーズの顕在化":["q3"]}}"#;
        let (base, requests) = serve(vec![(200, answer(text))]);
        let client = local_client(base);
        let result = client.generate_fanout(" green tea ", None).unwrap();

        assert_eq!(result.seed, "green tea");
        assert_eq!(result.locale, Locale::En);
        assert_eq!(result.total_subqueries(), 3);
        assert_eq!(result.categories[0].name, "曖昧さの解消");

        let request = requests.recv().unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent"));
        assert!(request.to_ascii_lowercase().contains("x-goog-api-key: secret"));
    }

    #[test]
    fn retries_server_errors() {
        let error = json!({ "error": { "code": 503, "message": "overloaded" } }).to_string();
        let (base, requests) = serve(vec![
            (503, error),
            (200, answer(r#"{"categories":{"a":["q"]}}"#)),
        ]);
        let client = local_client(base);
        let result = client.generate_fanout("緑茶", None).unwrap();
        assert_eq!(result.locale, Locale::Ja);
        assert_eq!(result.total_subqueries(), 1);
        assert_eq!(requests.iter().take(2).count(), 2);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let error = json!({ "error": { "code": 400, "message": "API key not valid" } }).to_string();
        let (base, _requests) = serve(vec![(400, error)]);
        let client = local_client(base);
        match client.generate_fanout("tea", None) {
            Err(GeneratorError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn empty_answer_is_an_error() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        let (base, _requests) = serve(vec![(200, body)]);
        let client = local_client(base);
        assert!(matches!(
            client.generate_fanout("tea", Some(Locale::En)),
            Err(GeneratorError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn gives_up_after_transport_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let config = GeneratorConfig {
            max_attempts: 2,
            ..test_config(format!("http://{addr}"))
        };
        let client = local_client_with(config);
        assert!(matches!(
            client.generate_fanout("tea", None),
            Err(GeneratorError::Http(_))
        ));
    }
}
