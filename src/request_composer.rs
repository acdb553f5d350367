use serde::{Deserialize, Serialize};

use crate::attachments::Attachment;
use crate::prompt_contract;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComplexityLevel {
    Elementary,
    #[default]
    Intermediate,
    Advanced,
}

impl ComplexityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplexityLevel::Elementary => "Elementary",
            ComplexityLevel::Intermediate => "Intermediate",
            ComplexityLevel::Advanced => "Advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "elementary" => Some(ComplexityLevel::Elementary),
            "intermediate" => Some(ComplexityLevel::Intermediate),
            "advanced" => Some(ComplexityLevel::Advanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationMode {
    #[default]
    Normal,
    Validation,
}

impl GenerationMode {
    pub fn from_flag(validation: bool) -> Self {
        if validation {
            GenerationMode::Validation
        } else {
            GenerationMode::Normal
        }
    }

    pub fn is_validation(self) -> bool {
        matches!(self, GenerationMode::Validation)
    }

    pub fn loading_label(self) -> &'static str {
        match self {
            GenerationMode::Normal => "SYNTHESIZING_MODEL",
            GenerationMode::Validation => "ANALYZING_SETUP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    InlineData { media_type: String, data: String },
    Text(String),
}

/// Ordered parts for one generation call: attachments first, one text part last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRequest {
    pub parts: Vec<RequestPart>,
}

impl ComposedRequest {
    pub fn text(&self) -> &str {
        self.parts
            .iter()
            .rev()
            .find_map(|part| match part {
                RequestPart::Text(text) => Some(text.as_str()),
                RequestPart::InlineData { .. } => None,
            })
            .unwrap_or_default()
    }

    pub fn attachment_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, RequestPart::InlineData { .. }))
            .count()
    }
}

pub fn compose_request(
    user_text: &str,
    attachments: &[Attachment],
    complexity: ComplexityLevel,
    mode: GenerationMode,
) -> ComposedRequest {
    let mut parts = attachments
        .iter()
        .map(|attachment| RequestPart::InlineData {
            media_type: attachment.media_type.clone(),
            data: attachment.encoded_data.clone(),
        })
        .collect::<Vec<_>>();
    parts.push(RequestPart::Text(enriched_text(user_text, complexity, mode)));
    ComposedRequest { parts }
}

fn enriched_text(user_text: &str, complexity: ComplexityLevel, mode: GenerationMode) -> String {
    let mut text = format!(
        "Target Audience/Complexity Level: {}.\n\n",
        complexity.as_str()
    );
    if mode.is_validation() {
        text.push_str(prompt_contract::validation_directive());
        text.push_str("\n\n");
    }
    text.push_str("User Request: ");
    text.push_str(user_text);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(media_type: &str, data: &str) -> Attachment {
        Attachment {
            encoded_data: data.to_string(),
            media_type: media_type.to_string(),
            preview_ref: format!("data:{media_type};base64,{data}"),
        }
    }

    #[test]
    fn attachments_precede_single_text_part() {
        let request = compose_request(
            "foo",
            &[attachment("image/png", "AAAA"), attachment("image/jpeg", "BBBB")],
            ComplexityLevel::Advanced,
            GenerationMode::Normal,
        );

        assert_eq!(
            request.parts,
            vec![
                RequestPart::InlineData {
                    media_type: "image/png".to_string(),
                    data: "AAAA".to_string(),
                },
                RequestPart::InlineData {
                    media_type: "image/jpeg".to_string(),
                    data: "BBBB".to_string(),
                },
                RequestPart::Text(
                    "Target Audience/Complexity Level: Advanced.\n\nUser Request: foo".to_string()
                ),
            ]
        );
        assert_eq!(request.attachment_count(), 2);
    }

    #[test]
    fn validation_directive_sits_between_complexity_and_request() {
        let request = compose_request(
            "titration procedure",
            &[],
            ComplexityLevel::Elementary,
            GenerationMode::Validation,
        );
        let text = request.text();

        let complexity_at = text
            .find("Target Audience/Complexity Level: Elementary.")
            .expect("complexity line should be present");
        let directive_at = text
            .find(prompt_contract::validation_directive())
            .expect("validation directive should be present");
        let request_at = text
            .find("User Request: titration procedure")
            .expect("user request line should be present");

        assert!(complexity_at < directive_at);
        assert!(directive_at < request_at);
        assert_eq!(request.parts.len(), 1);
    }

    #[test]
    fn normal_mode_omits_validation_directive() {
        let request = compose_request("", &[], ComplexityLevel::Intermediate, GenerationMode::Normal);
        assert_eq!(
            request.text(),
            "Target Audience/Complexity Level: Intermediate.\n\nUser Request: "
        );
        assert!(!request.text().contains("MODE:"));
    }

    #[test]
    fn complexity_and_mode_parse_from_ui_values() {
        assert_eq!(ComplexityLevel::parse(" advanced "), Some(ComplexityLevel::Advanced));
        assert_eq!(ComplexityLevel::parse("expert"), None);
        assert_eq!(GenerationMode::from_flag(true), GenerationMode::Validation);
        assert_eq!(GenerationMode::Validation.loading_label(), "ANALYZING_SETUP");
        assert_eq!(GenerationMode::default().loading_label(), "SYNTHESIZING_MODEL");
    }
}
