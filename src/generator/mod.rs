mod client;
mod prompt;
mod response;

pub use client::{API_KEY_ENV, GeminiClient};
pub use prompt::{build_prompt, categories_schema};
pub use response::{parse_categories, strip_code_fences};

use crate::config::GeneratorConfig;
use crate::ir::{FanoutResult, Locale};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("seed keyword must be non-empty")]
    EmptySeed,
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Gemini returned no text ({reason})")]
    EmptyResponse { reason: String },
}

/// Checks the seed, then calls Gemini with the key from the environment.
pub fn generate_fanout(
    seed: &str,
    locale: Option<Locale>,
    config: &GeneratorConfig,
) -> Result<FanoutResult, GeneratorError> {
    if seed.trim().is_empty() {
        return Err(GeneratorError::EmptySeed);
    }
    GeminiClient::from_env(config.clone())?.generate_fanout(seed, locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_seed_fails_before_key_lookup() {
        let err = generate_fanout(" \t", None, &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, GeneratorError::EmptySeed));
    }

    #[test]
    fn errors_read_well() {
        assert_eq!(
            GeneratorError::MissingApiKey.to_string(),
            "GEMINI_API_KEY is not set"
        );
        let err = GeneratorError::Api {
            status: 429,
            message: "quota".to_string(),
        };
        assert_eq!(err.to_string(), "Gemini API error (429): quota");
    }
}
