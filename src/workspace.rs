//! Application state for one visualizer window and the pure transitions that
//! move it between idle, generating, ready and failed.
//!
//! Every generation and export is stamped with the epoch that was current when
//! it began. Completions carrying an older epoch are discarded, so a reset or a
//! newer submission can never be overwritten by a late response.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::attachments::{Attachment, AttachmentList};
use crate::error::AsvError;
use crate::prompt_contract::ExportFormat;
use crate::request_composer::{compose_request, ComplexityLevel, ComposedRequest, GenerationMode};
use crate::response_parser::VisualizationResult;

pub const PREVIEW_SANDBOX_POLICY: &str = "allow-scripts allow-same-origin allow-forms allow-popups";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ViewState {
    #[default]
    Idle,
    Generating,
    Ready {
        result: VisualizationResult,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExportState {
    #[default]
    Idle,
    Exporting,
    Produced {
        code: String,
    },
    NothingProduced,
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewerTab {
    Preview,
    Code,
    Bom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Discarded,
}

#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub epoch: u64,
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExportTicket {
    pub epoch: u64,
    pub export_epoch: u64,
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub format: ExportFormat,
    pub source_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub index: usize,
    pub media_type: String,
    pub preview_ref: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub prompt: String,
    pub attachments: Vec<AttachmentView>,
    pub complexity: ComplexityLevel,
    pub mode: GenerationMode,
    pub epoch: u64,
    pub view: ViewState,
    pub export: ExportState,
    pub export_format: ExportFormat,
    pub is_generating: bool,
    pub is_exporting: bool,
    pub can_submit: bool,
    pub loading_label: &'static str,
    pub tabs: Vec<ViewerTab>,
    pub preview_sandbox: &'static str,
    pub has_validation_alert: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceState {
    prompt: String,
    attachments: AttachmentList,
    complexity: ComplexityLevel,
    mode: GenerationMode,
    view: ViewState,
    export: ExportState,
    export_format: ExportFormat,
    epoch: u64,
    export_epoch: u64,
}

impl WorkspaceState {
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_complexity(&mut self, complexity: ComplexityLevel) {
        self.complexity = complexity;
    }

    pub fn set_mode(&mut self, mode: GenerationMode) {
        self.mode = mode;
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, index: usize) -> Result<(), AsvError> {
        self.attachments.remove(index).map(|_| ())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn export(&self) -> &ExportState {
        &self.export
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.view, ViewState::Generating)
    }

    pub fn is_exporting(&self) -> bool {
        matches!(self.export, ExportState::Exporting)
    }

    pub fn has_submittable_input(&self) -> bool {
        !self.prompt.trim().is_empty() || !self.attachments.is_empty()
    }

    pub fn begin_generation(&mut self) -> Result<(GenerationTicket, ComposedRequest), AsvError> {
        if !self.has_submittable_input() {
            return Err(AsvError::EmptySubmission);
        }
        if self.is_generating() {
            return Err(AsvError::GenerationInFlight);
        }

        self.epoch += 1;
        self.view = ViewState::Generating;
        self.export = ExportState::Idle;

        let request = compose_request(
            &self.prompt,
            self.attachments.as_slice(),
            self.complexity,
            self.mode,
        );
        let ticket = GenerationTicket {
            epoch: self.epoch,
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        Ok((ticket, request))
    }

    pub fn complete_generation(
        &mut self,
        ticket: &GenerationTicket,
        outcome: Result<VisualizationResult, AsvError>,
    ) -> Completion {
        if ticket.epoch != self.epoch || !self.is_generating() {
            log::warn!(
                "Discarding stale generation response request={} epoch={} current={}",
                ticket.request_id,
                ticket.epoch,
                self.epoch
            );
            return Completion::Discarded;
        }

        self.view = match outcome {
            Ok(result) => ViewState::Ready { result },
            Err(error) => ViewState::Failed {
                message: error.to_string(),
            },
        };
        Completion::Applied
    }

    pub fn begin_export(&mut self, format: ExportFormat) -> Result<ExportTicket, AsvError> {
        if self.is_exporting() {
            return Err(AsvError::ExportInFlight);
        }
        let source_code = match &self.view {
            ViewState::Ready { result } if result.has_code() => result.code.clone(),
            _ => return Err(AsvError::NothingToExport),
        };

        self.export_format = format;
        self.export_epoch += 1;
        self.export = ExportState::Exporting;
        Ok(ExportTicket {
            epoch: self.epoch,
            export_epoch: self.export_epoch,
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            format,
            source_code,
        })
    }

    /// Applies an export outcome to the export panel only; the displayed
    /// visualization is never touched.
    pub fn complete_export(
        &mut self,
        ticket: &ExportTicket,
        outcome: Result<String, AsvError>,
    ) -> Completion {
        if ticket.epoch != self.epoch
            || ticket.export_epoch != self.export_epoch
            || !self.is_exporting()
        {
            log::warn!(
                "Discarding stale export response request={} epoch={} current={}",
                ticket.request_id,
                ticket.epoch,
                self.epoch
            );
            return Completion::Discarded;
        }

        self.export = match outcome {
            Ok(code) if code.trim().is_empty() => ExportState::NothingProduced,
            Ok(code) => ExportState::Produced { code },
            Err(error) => ExportState::Failed {
                message: error.to_string(),
            },
        };
        Completion::Applied
    }

    pub fn reset(&mut self) {
        let next_epoch = self.epoch + 1;
        let next_export_epoch = self.export_epoch + 1;
        *self = Self {
            epoch: next_epoch,
            export_epoch: next_export_epoch,
            ..Self::default()
        };
        log::info!("Workspace reset epoch={next_epoch}");
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let result = match &self.view {
            ViewState::Ready { result } => Some(result),
            _ => None,
        };
        let tabs = match result {
            Some(result) if result.has_hardware_bom() => {
                vec![ViewerTab::Preview, ViewerTab::Code, ViewerTab::Bom]
            }
            Some(_) => vec![ViewerTab::Preview, ViewerTab::Code],
            None => Vec::new(),
        };

        WorkspaceSnapshot {
            prompt: self.prompt.clone(),
            attachments: self
                .attachments
                .iter()
                .enumerate()
                .map(|(index, attachment)| AttachmentView {
                    index,
                    media_type: attachment.media_type.clone(),
                    preview_ref: attachment.preview_ref.clone(),
                })
                .collect(),
            complexity: self.complexity,
            mode: self.mode,
            epoch: self.epoch,
            view: self.view.clone(),
            export: self.export.clone(),
            export_format: self.export_format,
            is_generating: self.is_generating(),
            is_exporting: self.is_exporting(),
            can_submit: self.has_submittable_input() && !self.is_generating(),
            loading_label: self.mode.loading_label(),
            tabs,
            preview_sandbox: PREVIEW_SANDBOX_POLICY,
            has_validation_alert: result.map(|value| value.has_validation_alert()).unwrap_or(false),
        }
    }
}
