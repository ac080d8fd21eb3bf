//! Perspective API toxicity classifier.

use std::time::Duration;

use async_trait::async_trait;
use domain::services::moderation::{ModerationError, ToxicityClassifier};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::ModerationConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Request errors carry the URL in their text; strip it before reporting.
fn request_error(err: reqwest::Error) -> ModerationError {
    ModerationError::Request(err.without_url().to_string())
}

/// Calls `comments:analyze` for the TOXICITY attribute. Text is sent with
/// `doNotStore` so Google does not retain it.
pub struct PerspectiveClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    attribute_scores: Option<AttributeScores>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct AttributeScores {
    toxicity: Option<AttributeScore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Debug, Deserialize)]
struct SummaryScore {
    value: f64,
}

fn request_body(text: &str) -> serde_json::Value {
    json!({
        "comment": { "text": text },
        "requestedAttributes": { "TOXICITY": {} },
        "doNotStore": true
    })
}

/// Pulls the summary TOXICITY score out of a response body.
fn parse_score(body: &str) -> Result<f64, ModerationError> {
    let parsed: AnalyzeResponse = serde_json::from_str(body)
        .map_err(|e| ModerationError::InvalidResponse(e.to_string()))?;
    let score = parsed
        .attribute_scores
        .and_then(|a| a.toxicity)
        .map(|t| t.summary_score.value)
        .ok_or_else(|| ModerationError::InvalidResponse("missing TOXICITY score".into()))?;
    if !(0.0..=1.0).contains(&score) {
        return Err(ModerationError::InvalidResponse(format!(
            "score out of range: {}",
            score
        )));
    }
    Ok(score)
}

impl PerspectiveClient {
    pub fn new(config: &ModerationConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.perspective_api_key.clone(),
        })
    }
}

#[async_trait]
impl ToxicityClassifier for PerspectiveClient {
    async fn score(&self, text: &str) -> Result<f64, ModerationError> {
        if self.api_key.trim().is_empty() {
            return Err(ModerationError::NotConfigured);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request_body(text))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(request_error)?;

        if !status.is_success() {
            return Err(ModerationError::UpstreamStatus {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        parse_score(&body)
    }
}
