use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::prompt_contract::SYSTEM_INSTRUCTION;

const CONFIG_FILE_NAME: &str = "asv_model.json";
const DEFAULT_MODEL_ID: &str = "gemini-3-pro-preview";
const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEMPERATURE: f32 = 0.4;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;
const DEFAULT_THINKING_BUDGET: u32 = 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelSettingsFile {
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_output_tokens: Option<u32>,
    #[serde(default)]
    thinking_budget: Option<u32>,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    system_instruction_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    pub model_id: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub thinking_budget: u32,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub system_instruction: String,
    pub system_instruction_source: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettingsSnapshot {
    pub config_path: String,
    pub loaded_from_file: bool,
    pub load_error: Option<String>,
    pub settings: ModelSettings,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            thinking_budget: DEFAULT_THINKING_BUDGET,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            system_instruction_source: "builtin".to_string(),
        }
    }
}

impl ModelSettings {
    pub fn load(workspace_root: &Path) -> ModelSettingsSnapshot {
        let config_path = workspace_root.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return ModelSettingsSnapshot {
                config_path: config_path.to_string_lossy().to_string(),
                loaded_from_file: false,
                load_error: None,
                settings: Self::default(),
            };
        }

        let parsed = fs::read_to_string(&config_path)
            .map_err(|error| format!("Failed to read {CONFIG_FILE_NAME}; using defaults: {error}"))
            .and_then(|raw| {
                serde_json::from_str::<ModelSettingsFile>(&raw).map_err(|error| {
                    format!("Failed to parse {CONFIG_FILE_NAME}; using defaults: {error}")
                })
            });

        match parsed {
            Ok(file) => {
                let (settings, instruction_error) = sanitize_settings(file, workspace_root);
                if let Some(error) = &instruction_error {
                    log::warn!("{error}");
                }
                ModelSettingsSnapshot {
                    config_path: config_path.to_string_lossy().to_string(),
                    loaded_from_file: true,
                    load_error: instruction_error,
                    settings,
                }
            }
            Err(error) => {
                log::warn!("{error}");
                ModelSettingsSnapshot {
                    config_path: config_path.to_string_lossy().to_string(),
                    loaded_from_file: false,
                    load_error: Some(error),
                    settings: Self::default(),
                }
            }
        }
    }
}

fn sanitize_settings(file: ModelSettingsFile, workspace_root: &Path) -> (ModelSettings, Option<String>) {
    let defaults = ModelSettings::default();

    let model_id = non_blank(file.model_id).unwrap_or(defaults.model_id);
    let api_base_url = non_blank(file.api_base_url)
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or(defaults.api_base_url);
    let temperature = file
        .temperature
        .filter(|value| value.is_finite())
        .map(|value| value.clamp(0.0, 2.0))
        .unwrap_or(defaults.temperature);
    let max_output_tokens = file
        .max_output_tokens
        .map(|value| value.clamp(256, 65_536))
        .unwrap_or(defaults.max_output_tokens);
    let thinking_budget = file
        .thinking_budget
        .map(|value| value.min(32_768))
        .unwrap_or(defaults.thinking_budget);
    let request_timeout_secs = file
        .request_timeout_secs
        .map(|value| value.clamp(10, 900))
        .unwrap_or(defaults.request_timeout_secs);

    let mut instruction_error = None;
    let (system_instruction, system_instruction_source) = match non_blank(file.system_instruction_path) {
        Some(raw_path) => {
            let path = resolve_path(workspace_root, &raw_path);
            match fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => (text, path.to_string_lossy().to_string()),
                Ok(_) => {
                    instruction_error = Some(format!(
                        "System instruction file {} is empty; using builtin contract",
                        path.display()
                    ));
                    (defaults.system_instruction, defaults.system_instruction_source)
                }
                Err(error) => {
                    instruction_error = Some(format!(
                        "Failed to read system instruction {}; using builtin contract: {error}",
                        path.display()
                    ));
                    (defaults.system_instruction, defaults.system_instruction_source)
                }
            }
        }
        None => (defaults.system_instruction, defaults.system_instruction_source),
    };

    (
        ModelSettings {
            model_id,
            temperature,
            max_output_tokens,
            thinking_budget,
            api_base_url,
            request_timeout_secs,
            system_instruction,
            system_instruction_source,
        },
        instruction_error,
    )
}

fn resolve_path(workspace_root: &Path, raw_path: &str) -> PathBuf {
    let path = PathBuf::from(raw_path);
    if path.is_absolute() {
        path
    } else {
        workspace_root.join(path)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
