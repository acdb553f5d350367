use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::prompt_contract::{
    BOM_SECTION_LABEL, DOCTYPE_MARKER, MARKUP_FENCE_TAG, SUMMARY_SECTION_LABEL,
    VALIDATION_ALERT_MARKER,
};

static MARKUP_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?is)```{MARKUP_FENCE_TAG}\s*(.*?)\s*```"))
        .expect("markup block pattern is valid")
});
static OPENING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*```[\w+.#-]*[ \t]*\r?\n").expect("opening fence pattern is valid")
});
static SUMMARY_LABEL: LazyLock<Regex> = LazyLock::new(|| case_insensitive(SUMMARY_SECTION_LABEL));
static BOM_LABEL: LazyLock<Regex> = LazyLock::new(|| case_insensitive(BOM_SECTION_LABEL));
static NOT_APPLICABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^N/A\.?$").expect("N/A pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationResult {
    pub summary: String,
    pub code: String,
    #[serde(rename = "hardwareBOM")]
    pub hardware_bom: String,
}

impl VisualizationResult {
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    pub fn has_hardware_bom(&self) -> bool {
        !self.hardware_bom.is_empty()
    }

    pub fn has_validation_alert(&self) -> bool {
        self.summary.contains(VALIDATION_ALERT_MARKER)
    }
}

/// Splits a raw model reply into summary, runnable markup and hardware BOM.
///
/// Never fails. Only the first fenced markup block is honoured; anything after
/// its closing fence, further fences included, becomes the BOM tail. Without a
/// fenced block the doctype marker is used as the code start, and without that
/// the whole reply is treated as summary.
pub fn parse_response(raw: &str) -> VisualizationResult {
    let (summary, code, hardware_bom) = match first_markup_block(raw) {
        Some((start, end, inner)) => (
            raw[..start].trim(),
            inner.to_string(),
            raw[end..].trim(),
        ),
        None => match raw.find(DOCTYPE_MARKER) {
            Some(start) => (raw[..start].trim(), raw[start..].to_string(), ""),
            None => (raw.trim(), String::new(), ""),
        },
    };

    VisualizationResult {
        summary: normalize_summary(summary),
        code,
        hardware_bom: normalize_hardware_bom(hardware_bom),
    }
}

/// Removes the fence delimiters from an export reply: the first opening fence
/// line and the last closing fence after it. Text around and between them is
/// kept as is. A single-line reply wrapped in fences loses only the delimiters.
pub fn strip_code_fences(raw: &str) -> String {
    let text = raw.trim();

    let Some(opening) = OPENING_FENCE.find(text) else {
        if !text.contains('\n') && text.len() >= 6 {
            let inner = text
                .strip_prefix("```")
                .and_then(|rest| rest.strip_suffix("```"));
            if let Some(inner) = inner {
                return inner.trim().to_string();
            }
        }
        return text.strip_suffix("```").unwrap_or(text).trim().to_string();
    };

    let before = text[..opening.start()].trim();
    let body = &text[opening.end()..];
    let (inner, after) = match body.rfind("```") {
        Some(close) => (&body[..close], body[close + 3..].trim()),
        None => (body, ""),
    };

    [before, inner.trim(), after]
        .into_iter()
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_markup_block(raw: &str) -> Option<(usize, usize, &str)> {
    let captures = MARKUP_BLOCK.captures(raw)?;
    let block = captures.get(0)?;
    let inner = captures.get(1)?.as_str();
    // An empty block carries nothing runnable; fall back to the doctype search.
    if inner.is_empty() {
        return None;
    }
    Some((block.start(), block.end(), inner))
}

fn normalize_summary(summary: &str) -> String {
    SUMMARY_LABEL.replacen(summary, 1, "").trim().to_string()
}

fn normalize_hardware_bom(hardware_bom: &str) -> String {
    if hardware_bom.is_empty() {
        return String::new();
    }
    let stripped = BOM_LABEL.replacen(hardware_bom, 1, "");
    let stripped = stripped.trim();
    if NOT_APPLICABLE.is_match(stripped) {
        return String::new();
    }
    stripped.to_string()
}

fn case_insensitive(label: &str) -> Regex {
    Regex::new(&format!("(?i){}", regex::escape(label))).expect("escaped label is a valid pattern")
}
