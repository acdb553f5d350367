//! Contract with the hosted model: request shape, fixed generation parameters,
//! and the two operations the workspace needs (visualize and export).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use crate::error::AsvError;
use crate::model_settings::ModelSettings;
use crate::prompt_contract::{self, ExportFormat};
use crate::request_composer::{ComposedRequest, RequestPart};
use crate::response_parser::{self, VisualizationResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WirePart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub thinking_config: ThinkingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Seam between the client contract and the network.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        model_id: &str,
        request: &GenerateContentRequest,
    ) -> Result<Option<String>, AsvError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(settings: &ModelSettings) -> Result<Self, AsvError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|error| AsvError::Upstream(format!("Failed to build HTTP client: {error}")))?;
        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelTransport for HttpTransport {
    async fn generate_content(
        &self,
        api_key: &str,
        model_id: &str,
        request: &GenerateContentRequest,
    ) -> Result<Option<String>, AsvError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model_id.trim());
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AsvError::Upstream(upstream_message(status.as_u16(), &body)));
        }

        let payload: GenerateContentResponse = serde_json::from_str(&body).map_err(|error| {
            AsvError::Upstream(format!("Invalid generation response payload: {error}"))
        })?;
        extract_text(payload)
    }
}

pub struct GenerationClient<T: ModelTransport> {
    transport: T,
    credential: Credential,
    settings: ModelSettings,
}

impl GenerationClient<HttpTransport> {
    pub fn over_http(credential: Credential, settings: ModelSettings) -> Result<Self, AsvError> {
        let transport = HttpTransport::new(&settings)?;
        Ok(Self::new(transport, credential, settings))
    }
}

impl<T: ModelTransport> GenerationClient<T> {
    pub fn new(transport: T, credential: Credential, settings: ModelSettings) -> Self {
        Self {
            transport,
            credential,
            settings,
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn generate_visualization(&self, request: &ComposedRequest) -> Result<String, AsvError> {
        let api_key = self.credential.require()?;
        let body = self.visualization_body(request);

        let text = self
            .transport
            .generate_content(api_key, &self.settings.model_id, &body)
            .await
            .inspect_err(|error| log::error!("Generation call failed: {error}"))?;

        match text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AsvError::EmptyResponse),
        }
    }

    pub async fn visualize(&self, request: &ComposedRequest) -> Result<VisualizationResult, AsvError> {
        let raw = self.generate_visualization(request).await?;
        Ok(response_parser::parse_response(&raw))
    }

    /// Re-expresses generated code in another format. An empty reply is
    /// returned as an empty string rather than an error.
    pub async fn transform_code(&self, source_code: &str, format: ExportFormat) -> Result<String, AsvError> {
        let api_key = self.credential.require()?;
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![WirePart::Text {
                    text: prompt_contract::export_instruction(source_code, format),
                }],
            }],
            system_instruction: None,
            generation_config: None,
        };

        let text = self
            .transport
            .generate_content(api_key, &self.settings.model_id, &body)
            .await
            .inspect_err(|error| log::error!("Export call failed: {error}"))?;

        Ok(response_parser::strip_code_fences(&text.unwrap_or_default()))
    }

    fn visualization_body(&self, request: &ComposedRequest) -> GenerateContentRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                RequestPart::InlineData { media_type, data } => WirePart::InlineData {
                    inline_data: InlineData {
                        mime_type: media_type.clone(),
                        data: data.clone(),
                    },
                },
                RequestPart::Text(text) => WirePart::Text { text: text.clone() },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![WirePart::Text {
                    text: self.settings.system_instruction.clone(),
                }],
            }),
            generation_config: Some(GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
                thinking_config: ThinkingConfig {
                    thinking_budget: self.settings.thinking_budget,
                },
            }),
        }
    }
}

fn extract_text(payload: GenerateContentResponse) -> Result<Option<String>, AsvError> {
    if payload.candidates.is_empty() {
        if let Some(reason) = payload
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(AsvError::Upstream(format!("Request blocked by model: {reason}")));
        }
        return Ok(None);
    }

    let text = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .filter(|text| !text.is_empty());
    Ok(text)
}

fn upstream_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    format!("HTTP {status}: {detail}")
}
