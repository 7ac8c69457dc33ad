//! REST API client for the restoration inference provider.
//!
//! Wraps the provider's prediction endpoints (create + poll) using
//! [`reqwest`]. Job payloads are parsed into typed structs at this
//! boundary; an unrecognized status or a success without an output locator
//! is an error, never a partially trusted result.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use photolift_core::jobs::{JobError, JobHandle, JobStatus, RestorationJobs};

/// HTTP client for the inference provider.
pub struct RestorationApi {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    model_version: String,
}

/// Prediction resource as returned by the provider.
#[derive(Debug, Deserialize)]
struct PredictionResponse {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<PredictionOutput>,
    #[serde(default)]
    error: Option<String>,
}

/// The provider returns either a single output URL or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionOutput {
    One(String),
    Many(Vec<String>),
}

impl PredictionOutput {
    /// The final output locator; for multi-output models the last entry is
    /// the finished image.
    fn into_url(self) -> Option<String> {
        match self {
            PredictionOutput::One(url) => Some(url),
            PredictionOutput::Many(urls) => urls.into_iter().last(),
        }
    }
}

impl RestorationApi {
    /// Create a new API client for the inference provider.
    ///
    /// * `api_url`       - Base HTTP URL, e.g. `https://api.example.com`.
    /// * `api_token`     - Bearer token for the provider account.
    /// * `model_version` - Pinned restoration model version identifier.
    pub fn new(api_url: String, api_token: String, model_version: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_token,
            model_version,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        api_token: String,
        model_version: String,
    ) -> Self {
        Self {
            client,
            api_url,
            api_token,
            model_version,
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or convert it into a
    /// [`JobError::Api`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, JobError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(JobError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into a prediction.
    async fn parse_prediction(response: reqwest::Response) -> Result<PredictionResponse, JobError> {
        let response = Self::ensure_success(response).await?;
        response
            .json::<PredictionResponse>()
            .await
            .map_err(|e| JobError::UnexpectedPayload(e.to_string()))
    }

    /// Map the provider's status string into a [`JobStatus`], failing closed
    /// on anything unrecognized.
    fn map_status(prediction: PredictionResponse) -> Result<JobStatus, JobError> {
        match prediction.status.as_str() {
            "starting" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Running),
            "succeeded" => {
                let output_url = prediction
                    .output
                    .and_then(PredictionOutput::into_url)
                    .ok_or_else(|| {
                        JobError::UnexpectedPayload(
                            "succeeded prediction without an output locator".to_string(),
                        )
                    })?;
                Ok(JobStatus::Succeeded { output_url })
            }
            "failed" => Ok(JobStatus::Failed {
                message: prediction
                    .error
                    .unwrap_or_else(|| "Restoration failed".to_string()),
            }),
            "canceled" => Ok(JobStatus::Canceled),
            other => Err(JobError::UnexpectedPayload(format!(
                "unknown prediction status '{other}'"
            ))),
        }
    }
}

#[async_trait]
impl RestorationJobs for RestorationApi {
    /// Submit an image for restoration via `POST /v1/predictions`.
    ///
    /// The image is inlined as a data URL; the provider hosts the output
    /// and returns a locator on completion.
    async fn submit(&self, image: &[u8], content_type: &str) -> Result<JobHandle, JobError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let data_url = format!(
            "data:{content_type};base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let body = serde_json::json!({
            "version": self.model_version,
            "input": {
                "image": data_url,
            },
        });

        let response = self
            .client
            .post(format!("{}/v1/predictions", self.api_url))
            .bearer_auth(&self.api_token)
            .header("x-request-id", &request_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| JobError::Transport(e.to_string()))?;

        let prediction = Self::parse_prediction(response).await?;

        tracing::info!(
            job_id = %prediction.id,
            request_id = %request_id,
            status = %prediction.status,
            "Restoration job submitted",
        );

        Ok(JobHandle { id: prediction.id })
    }

    /// Fetch the current status via `GET /v1/predictions/{id}`.
    async fn status(&self, job: &JobHandle) -> Result<JobStatus, JobError> {
        let response = self
            .client
            .get(format!("{}/v1/predictions/{}", self.api_url, job.id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| JobError::Transport(e.to_string()))?;

        let prediction = Self::parse_prediction(response).await?;
        Self::map_status(prediction)
    }
}
