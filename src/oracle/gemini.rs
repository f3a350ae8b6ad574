//! Gemini `generateContent` client.
//!
//! One attempt per volunteer: no retries and no backoff. The run loop's
//! fixed delay is the only rate control.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::oracle::prompt::build_match_prompt;
use crate::oracle::{Decision, MISSING_KEY, MatchOracle, SCRIPT_CRASH, parse_decision};

const PROVIDER: &str = "gemini";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// Decision provider backed by the Gemini REST API.
pub struct GeminiOracle {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    endpoint: String,
    config: OracleConfig,
}

impl GeminiOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one request and interpret the reply.
    ///
    /// `Ok` covers every answer the service gave, including its own errors.
    /// `Err` means we could not talk to it or could not read what it said.
    async fn request(&self, api_key: &SecretString, prompt: &str) -> Result<Decision, OracleError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}?key={}",
                self.endpoint,
                urlencoding::encode(api_key.expose_secret())
            ))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        provider: PROVIDER.to_string(),
                        timeout: self.config.timeout,
                    }
                } else {
                    OracleError::RequestFailed {
                        provider: PROVIDER.to_string(),
                        // without_url keeps the key out of logs
                        reason: e.without_url().to_string(),
                    }
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OracleError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.without_url().to_string(),
            })?;
        let parsed: GenerateResponse = serde_json::from_str(&text)?;

        if !status.is_success() || parsed.error.is_some() {
            let message = parsed
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Unknown Error".to_string());
            error!(status = status.as_u16(), error = %message, "Decision service returned an error");
            return Ok(Decision::failed(message));
        }

        let Some(candidate) = parsed.candidates.and_then(|c| c.into_iter().next()) else {
            debug!("Decision service returned no candidates");
            return Ok(Decision::no_match());
        };

        let answer = candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| OracleError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "candidate has no text part".to_string(),
            })?;

        Ok(parse_decision(&answer)?)
    }
}

#[async_trait]
impl MatchOracle for GeminiOracle {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn decide(&self, profile: &str, tasks: &[String]) -> Decision {
        let Some(api_key) = &self.api_key else {
            error!("Gemini API key is missing");
            return Decision::failed(MISSING_KEY);
        };

        let prompt = build_match_prompt(profile, tasks);
        match self.request(api_key, &prompt).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, model = %self.config.model, "Decision request crashed");
                Decision::failed(SCRIPT_CRASH)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server, ServerGuard};

    use super::*;

    const PATH: &str = r"^/v1beta/models/gemini-2\.5-flash:generateContent";

    fn oracle_for(server: &ServerGuard, key: Option<&str>) -> GeminiOracle {
        GeminiOracle::new(OracleConfig {
            api_key: key.map(|k| SecretString::from(k.to_string())),
            base_url: server.url(),
            timeout: Duration::from_secs(5),
            ..OracleConfig::default()
        })
        .unwrap()
    }

    fn tasks() -> Vec<String> {
        vec!["ID: T-1 | Task: Setup | Needs: Lifting | Time: Morning".to_string()]
    }

    fn candidate_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn successful_answer_becomes_assignment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::Regex(r#"^\{"contents":\[\{"parts":\[\{"text":"#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(candidate_body(
                "```json\n{\"taskId\": \"T-1\", \"taskName\": \"Setup\", \"reasoning\": \"skills match\"}\n```",
            ))
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("test-key"));
        let decision = oracle.decide("Name: Asha, Skills: Lifting", &tasks()).await;

        mock.assert_async().await;
        assert_eq!(
            decision,
            Decision::Assign {
                task_id: "T-1".into(),
                task_name: "Setup".into(),
                reasoning: "skills match".into(),
            }
        );
    }

    #[tokio::test]
    async fn prompt_is_sent_in_request_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("Name: Asha, Skills: Lifting".into()))
            .with_status(200)
            .with_body(candidate_body(r#"{"taskId": "NO_MATCH"}"#))
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha, Skills: Lifting", &tasks()).await;

        mock.assert_async().await;
        assert_eq!(decision, Decision::no_match());
    }

    #[tokio::test]
    async fn missing_key_skips_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let oracle = oracle_for(&server, None);
        let decision = oracle.decide("Name: Asha", &tasks()).await;

        mock.assert_async().await;
        assert_eq!(decision, Decision::failed(MISSING_KEY));
    }

    #[tokio::test]
    async fn service_error_message_becomes_classification() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": {"code": 429, "message": "Resource has been exhausted"}}"#)
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::failed("Resource has been exhausted"));
    }

    #[tokio::test]
    async fn error_payload_on_success_status_is_still_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": {"message": "API key not valid"}}"#)
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::failed("API key not valid"));
    }

    #[tokio::test]
    async fn non_success_without_message_is_unknown_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("{}")
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::failed("Unknown Error"));
    }

    #[tokio::test]
    async fn no_candidates_is_unclassified_no_match() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"promptFeedback": {"blockReason": "OTHER"}}"#)
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::no_match());
    }

    #[tokio::test]
    async fn malformed_answer_is_script_crash() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(candidate_body("The best task is T-1."))
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::failed(SCRIPT_CRASH));
    }

    #[tokio::test]
    async fn non_json_body_is_script_crash() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::failed(SCRIPT_CRASH));
    }

    #[tokio::test]
    async fn candidate_without_text_is_script_crash() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(PATH.into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
            .create_async()
            .await;

        let oracle = oracle_for(&server, Some("k"));
        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::failed(SCRIPT_CRASH));
    }

    #[tokio::test]
    async fn unresponsive_service_times_out_as_script_crash() {
        // Accepted by the kernel backlog, never answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let oracle = GeminiOracle::new(OracleConfig {
            api_key: Some(SecretString::from("k".to_string())),
            base_url: format!("http://{}", listener.local_addr().unwrap()),
            timeout: Duration::from_millis(200),
            ..OracleConfig::default()
        })
        .unwrap();

        let key = SecretString::from("k".to_string());
        let err = oracle.request(&key, "Name: Asha").await.unwrap_err();
        assert!(
            matches!(err, OracleError::Timeout { ref provider, timeout }
                if provider == "gemini" && timeout == Duration::from_millis(200)),
            "unexpected error: {err}"
        );

        let decision = oracle.decide("Name: Asha", &tasks()).await;
        assert_eq!(decision, Decision::failed(SCRIPT_CRASH));
        drop(listener);
    }

    #[test]
    fn endpoint_uses_model_and_trims_slash() {
        let oracle = GeminiOracle::new(OracleConfig {
            base_url: "http://localhost:9999/".to_string(),
            model: "gemini-test".to_string(),
            ..OracleConfig::default()
        })
        .unwrap();
        assert_eq!(
            oracle.endpoint,
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(oracle.model(), "gemini-test");
    }
}
