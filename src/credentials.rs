use std::fmt;
use std::sync::Arc;

use crate::error::AsvError;

const CREDENTIAL_ENV_KEYS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Process-wide API key, read once at start-up and never mutated.
#[derive(Clone, Default)]
pub struct Credential {
    api_key: Option<Arc<str>>,
}

impl Credential {
    pub fn from_env() -> Self {
        let api_key = CREDENTIAL_ENV_KEYS
            .iter()
            .find_map(|key| std::env::var(key).ok().and_then(|value| non_blank(&value)));
        Self::from_value(api_key.as_deref())
    }

    pub fn from_value(value: Option<&str>) -> Self {
        Self {
            api_key: value.and_then(non_blank).map(Arc::from),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn require(&self) -> Result<&str, AsvError> {
        self.api_key.as_deref().ok_or(AsvError::MissingCredential)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
