/// Failures surfaced by the generation pipeline and the workspace around it.
///
/// There is no parse failure variant: the response parser always
/// returns a best-effort result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsvError {
    #[error("API key is missing. Set GEMINI_API_KEY (or API_KEY) in the environment or .env file.")]
    MissingCredential,

    #[error("{0}")]
    Upstream(String),

    #[error("No content generated.")]
    EmptyResponse,

    #[error("Describe a concept or attach at least one image before generating.")]
    EmptySubmission,

    #[error("A generation request is already in progress")]
    GenerationInFlight,

    #[error("An export request is already in progress")]
    ExportInFlight,

    #[error("There is no generated visualization code to export")]
    NothingToExport,

    #[error("Failed to encode attachment: {0}")]
    AttachmentEncoding(String),

    #[error("Attachment index {index} is out of range (have {len})")]
    AttachmentIndex { index: usize, len: usize },
}

impl From<reqwest::Error> for AsvError {
    fn from(error: reqwest::Error) -> Self {
        AsvError::Upstream(error.to_string())
    }
}
