use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::error::AsvError;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub encoded_data: String,
    pub media_type: String,
    pub preview_ref: String,
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentList {
    items: Vec<Attachment>,
}

pub fn encode_attachment(bytes: &[u8]) -> Result<Attachment, AsvError> {
    let data_url = to_data_url(bytes);
    let (media_type, encoded_data) = split_data_url(&data_url)?;
    Ok(Attachment {
        encoded_data: encoded_data.to_string(),
        media_type: media_type.to_string(),
        preview_ref: data_url,
    })
}

/// Splits `data:{mime};base64,{payload}` into its media type and payload.
pub fn split_data_url(data_url: &str) -> Result<(&str, &str), AsvError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AsvError::AttachmentEncoding("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AsvError::AttachmentEncoding("missing payload separator".to_string()))?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| AsvError::AttachmentEncoding("payload is not base64".to_string()))?
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    if media_type.is_empty() {
        return Err(AsvError::AttachmentEncoding(
            "media type is empty".to_string(),
        ));
    }
    Ok((media_type, payload))
}

fn to_data_url(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_media_type(bytes), STANDARD.encode(bytes))
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

impl AttachmentList {
    pub fn push(&mut self, attachment: Attachment) {
        self.items.push(attachment);
    }

    pub fn remove(&mut self, index: usize) -> Result<Attachment, AsvError> {
        if index >= self.items.len() {
            return Err(AsvError::AttachmentIndex {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Attachment] {
        &self.items
    }
}
