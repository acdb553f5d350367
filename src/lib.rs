pub mod attachments;
#[cfg(feature = "desktop")]
mod commands;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod generation_client;
pub mod model_settings;
pub mod prompt_contract;
pub mod request_composer;
pub mod response_parser;
pub mod workspace;

use std::path::{Path, PathBuf};

pub use controller::Controller;
pub use credentials::Credential;
pub use error::AsvError;
pub use generation_client::{GenerationClient, HttpTransport, ModelTransport};
pub use model_settings::{ModelSettings, ModelSettingsSnapshot};
pub use response_parser::{parse_response, VisualizationResult};

#[cfg(feature = "desktop")]
use tauri::Manager;

#[cfg(feature = "desktop")]
pub struct AppState {
    pub controller: Controller<HttpTransport>,
    pub model_settings: ModelSettingsSnapshot,
}

pub fn resolve_workspace_root() -> Result<PathBuf, String> {
    std::env::current_dir().map_err(|error| format!("Failed to determine workspace root: {error}"))
}

pub fn load_env_files(workspace_root: &Path) {
    let root_env = workspace_root.join(".env");
    let root_local = workspace_root.join(".env.local");
    let _ = dotenvy::from_path(root_env);
    let _ = dotenvy::from_path(root_local);
}

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Builds the generation client from `.env`, the environment and `asv_model.json`.
pub fn build_client(
    workspace_root: &Path,
) -> Result<(GenerationClient<HttpTransport>, ModelSettingsSnapshot), AsvError> {
    load_env_files(workspace_root);
    let model_settings = ModelSettings::load(workspace_root);
    let credential = Credential::from_env();
    if !credential.is_configured() {
        log::warn!("No API key configured; generation requests will fail until one is set");
    }
    log::info!(
        "Using model {} (system instruction: {})",
        model_settings.settings.model_id,
        model_settings.settings.system_instruction_source
    );
    let client = GenerationClient::over_http(credential, model_settings.settings.clone())?;
    Ok((client, model_settings))
}

#[cfg(feature = "desktop")]
fn initialize_state(app: &mut tauri::App) -> Result<(), String> {
    let workspace_root = resolve_workspace_root()?;
    let (client, model_settings) =
        build_client(workspace_root.as_path()).map_err(|error| error.to_string())?;

    app.manage(AppState {
        controller: Controller::new(client),
        model_settings,
    });

    Ok(())
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging();
    log::info!("ASV starting...");

    tauri::Builder::default()
        .setup(|app| {
            initialize_state(app).map_err(std::io::Error::other)?;
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_workspace,
            commands::set_prompt,
            commands::set_complexity,
            commands::set_generation_mode,
            commands::add_attachment,
            commands::remove_attachment,
            commands::submit_generation,
            commands::reset_workspace,
            commands::export_code,
            commands::list_export_formats,
            commands::get_model_settings
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
