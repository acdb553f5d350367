use tauri::State;

use crate::model_settings::ModelSettingsSnapshot;
use crate::prompt_contract::ExportFormat;
use crate::request_composer::{ComplexityLevel, GenerationMode};
use crate::workspace::WorkspaceSnapshot;
use crate::AppState;

#[tauri::command]
pub async fn get_workspace(state: State<'_, AppState>) -> Result<WorkspaceSnapshot, String> {
    Ok(state.controller.snapshot().await)
}

#[tauri::command]
pub async fn set_prompt(
    state: State<'_, AppState>,
    prompt: String,
) -> Result<WorkspaceSnapshot, String> {
    state
        .controller
        .update(|workspace| {
            workspace.set_prompt(prompt);
            Ok(())
        })
        .await
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn set_complexity(
    state: State<'_, AppState>,
    complexity: String,
) -> Result<WorkspaceSnapshot, String> {
    let level = ComplexityLevel::parse(&complexity)
        .ok_or_else(|| format!("Unknown complexity level '{}'", complexity.trim()))?;
    state
        .controller
        .update(|workspace| {
            workspace.set_complexity(level);
            Ok(())
        })
        .await
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn set_generation_mode(
    state: State<'_, AppState>,
    validation: bool,
) -> Result<WorkspaceSnapshot, String> {
    state
        .controller
        .update(|workspace| {
            workspace.set_mode(GenerationMode::from_flag(validation));
            Ok(())
        })
        .await
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn add_attachment(
    state: State<'_, AppState>,
    bytes: Vec<u8>,
) -> Result<WorkspaceSnapshot, String> {
    state
        .controller
        .add_attachment(&bytes)
        .await
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn remove_attachment(
    state: State<'_, AppState>,
    index: usize,
) -> Result<WorkspaceSnapshot, String> {
    state
        .controller
        .update(|workspace| workspace.remove_attachment(index))
        .await
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn submit_generation(state: State<'_, AppState>) -> Result<WorkspaceSnapshot, String> {
    state
        .controller
        .submit()
        .await
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn reset_workspace(state: State<'_, AppState>) -> Result<WorkspaceSnapshot, String> {
    Ok(state.controller.reset().await)
}

#[tauri::command]
pub async fn export_code(
    state: State<'_, AppState>,
    format: String,
) -> Result<WorkspaceSnapshot, String> {
    let format = ExportFormat::from_label(&format)
        .ok_or_else(|| format!("Unknown export format '{}'", format.trim()))?;
    state
        .controller
        .export(format)
        .await
        .map_err(|error| error.to_string())
}

#[tauri::command]
pub async fn list_export_formats() -> Result<Vec<String>, String> {
    Ok(ExportFormat::ALL
        .iter()
        .map(|format| format.label().to_string())
        .collect())
}

#[tauri::command]
pub async fn get_model_settings(
    state: State<'_, AppState>,
) -> Result<ModelSettingsSnapshot, String> {
    Ok(state.model_settings.clone())
}
