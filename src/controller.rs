use chrono::Utc;
use tokio::sync::Mutex;

use crate::attachments;
use crate::error::AsvError;
use crate::generation_client::{GenerationClient, ModelTransport};
use crate::prompt_contract::ExportFormat;
use crate::workspace::{Completion, WorkspaceSnapshot, WorkspaceState};

/// Owns the workspace state and the client. The state lock is only held to
/// begin or complete a call, never across the network await.
pub struct Controller<T: ModelTransport> {
    workspace: Mutex<WorkspaceState>,
    client: GenerationClient<T>,
}

impl<T: ModelTransport> Controller<T> {
    pub fn new(client: GenerationClient<T>) -> Self {
        Self {
            workspace: Mutex::new(WorkspaceState::default()),
            client,
        }
    }

    pub fn client(&self) -> &GenerationClient<T> {
        &self.client
    }

    pub async fn snapshot(&self) -> WorkspaceSnapshot {
        self.workspace.lock().await.snapshot()
    }

    pub async fn update<F>(&self, apply: F) -> Result<WorkspaceSnapshot, AsvError>
    where
        F: FnOnce(&mut WorkspaceState) -> Result<(), AsvError>,
    {
        let mut workspace = self.workspace.lock().await;
        apply(&mut workspace)?;
        Ok(workspace.snapshot())
    }

    pub async fn add_attachment(&self, bytes: &[u8]) -> Result<WorkspaceSnapshot, AsvError> {
        let attachment = attachments::encode_attachment(bytes)?;
        log::info!(
            "Attachment added mediaType={} bytes={}",
            attachment.media_type,
            bytes.len()
        );
        self.update(|workspace| {
            workspace.add_attachment(attachment);
            Ok(())
        })
        .await
    }

    /// Runs one generation. Upstream failures land in the snapshot as the
    /// failed view; only precondition failures are returned as errors.
    pub async fn submit(&self) -> Result<WorkspaceSnapshot, AsvError> {
        let (ticket, request) = self.workspace.lock().await.begin_generation()?;
        log::info!(
            "Generation started request={} epoch={} attachments={}",
            ticket.request_id,
            ticket.epoch,
            request.attachment_count()
        );

        let outcome = self.client.visualize(&request).await;
        let summary = match &outcome {
            Ok(result) => format!("code={} bom={}", result.has_code(), result.has_hardware_bom()),
            Err(error) => format!("error={error}"),
        };

        let mut workspace = self.workspace.lock().await;
        if workspace.complete_generation(&ticket, outcome) == Completion::Applied {
            log::info!(
                "Generation finished request={} elapsedMs={} {summary}",
                ticket.request_id,
                (Utc::now() - ticket.started_at).num_milliseconds()
            );
        }
        Ok(workspace.snapshot())
    }

    pub async fn export(&self, format: ExportFormat) -> Result<WorkspaceSnapshot, AsvError> {
        let ticket = self.workspace.lock().await.begin_export(format)?;
        log::info!(
            "Export started request={} format={}",
            ticket.request_id,
            ticket.format.label()
        );

        let outcome = self
            .client
            .transform_code(&ticket.source_code, ticket.format)
            .await;
        if matches!(&outcome, Ok(code) if code.is_empty()) {
            log::warn!("Export request={} produced no code", ticket.request_id);
        }

        let mut workspace = self.workspace.lock().await;
        if workspace.complete_export(&ticket, outcome) == Completion::Applied {
            log::info!(
                "Export finished request={} elapsedMs={}",
                ticket.request_id,
                (Utc::now() - ticket.started_at).num_milliseconds()
            );
        }
        Ok(workspace.snapshot())
    }

    pub async fn reset(&self) -> WorkspaceSnapshot {
        let mut workspace = self.workspace.lock().await;
        workspace.reset();
        workspace.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::credentials::Credential;
    use crate::generation_client::tests::ScriptedTransport;
    use crate::generation_client::GenerateContentRequest;
    use crate::model_settings::ModelSettings;
    use crate::workspace::{ExportState, ViewState};

    const REPLY: &str = "Summary.\n```html\n<!DOCTYPE html><p>sim</p>\n```\n| LED | 5mm | 2 | indicator |";

    /// Holds each call open until the test releases it.
    #[derive(Default)]
    struct GatedTransport {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ModelTransport for GatedTransport {
        async fn generate_content(
            &self,
            _api_key: &str,
            _model_id: &str,
            _request: &GenerateContentRequest,
        ) -> Result<Option<String>, AsvError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(Some(REPLY.to_string()))
        }
    }

    fn controller<T: ModelTransport>(transport: T) -> Controller<T> {
        Controller::new(GenerationClient::new(
            transport,
            Credential::from_value(Some("test-key")),
            ModelSettings::default(),
        ))
    }

    async fn with_prompt<T: ModelTransport>(controller: &Controller<T>, prompt: &str) {
        controller
            .update(|workspace| {
                workspace.set_prompt(prompt);
                Ok(())
            })
            .await
            .expect("prompt should update");
    }

    #[tokio::test]
    async fn submit_applies_parsed_result() {
        let controller = controller(ScriptedTransport::replying(vec![Ok(Some(REPLY.to_string()))]));
        with_prompt(&controller, "LED blink circuit").await;

        let snapshot = controller.submit().await.expect("submit should succeed");

        match snapshot.view {
            ViewState::Ready { result } => {
                assert_eq!(result.summary, "Summary.");
                assert_eq!(result.code, "<!DOCTYPE html><p>sim</p>");
                assert_eq!(result.hardware_bom, "| LED | 5mm | 2 | indicator |");
            }
            other => panic!("expected ready view, got {other:?}"),
        }
        assert!(!snapshot.is_generating);
    }

    #[tokio::test]
    async fn empty_submission_never_reaches_the_model() {
        let controller = controller(ScriptedTransport::default());

        let error = controller.submit().await.expect_err("empty submit should fail");

        assert_eq!(error, AsvError::EmptySubmission);
        assert_eq!(controller.client().transport().call_count(), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_shown_as_failure() {
        let controller = Controller::new(GenerationClient::new(
            ScriptedTransport::default(),
            Credential::default(),
            ModelSettings::default(),
        ));
        with_prompt(&controller, "ideal gas").await;

        let snapshot = controller.submit().await.expect("submit should settle");

        assert_eq!(
            snapshot.view,
            ViewState::Failed {
                message: AsvError::MissingCredential.to_string()
            }
        );
        assert_eq!(controller.client().transport().call_count(), 0);
    }

    #[tokio::test]
    async fn reset_during_flight_discards_late_response() {
        let controller = Arc::new(controller(GatedTransport::default()));
        with_prompt(&*controller, "orbital mechanics").await;

        let pending = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.submit().await }
        });
        controller.client().transport().started.notified().await;

        let during = controller.snapshot().await;
        assert!(during.is_generating);
        assert_eq!(
            controller.submit().await.expect_err("second submit must be refused"),
            AsvError::GenerationInFlight
        );

        let after_reset = controller.reset().await;
        controller.client().transport().release.notify_one();
        let settled = pending
            .await
            .expect("submit task should join")
            .expect("submit should settle");

        assert_eq!(settled.view, ViewState::Idle);
        assert_eq!(settled.epoch, after_reset.epoch);
        assert!(settled.prompt.is_empty());
    }

    #[tokio::test]
    async fn export_failure_is_isolated_to_export_panel() {
        let controller = controller(ScriptedTransport::replying(vec![
            Ok(Some(REPLY.to_string())),
            Err(AsvError::Upstream("HTTP 503: overloaded".to_string())),
        ]));
        with_prompt(&controller, "LED").await;
        let generated = controller.submit().await.expect("submit should succeed");

        let exported = controller
            .export(ExportFormat::PythonMatplotlib)
            .await
            .expect("export should settle");

        assert_eq!(exported.view, generated.view);
        assert_eq!(
            exported.export,
            ExportState::Failed {
                message: "HTTP 503: overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn export_produces_unfenced_code() {
        let controller = controller(ScriptedTransport::replying(vec![
            Ok(Some(REPLY.to_string())),
            Ok(Some("```latex\n\\begin{tikzpicture}\\end{tikzpicture}\n```".to_string())),
        ]));
        with_prompt(&controller, "LED").await;
        controller.submit().await.expect("submit should succeed");

        let snapshot = controller
            .export(ExportFormat::LatexTikz)
            .await
            .expect("export should settle");

        assert_eq!(
            snapshot.export,
            ExportState::Produced {
                code: "\\begin{tikzpicture}\\end{tikzpicture}".to_string()
            }
        );
        assert_eq!(snapshot.export_format, ExportFormat::LatexTikz);
    }

    #[tokio::test]
    async fn attachments_are_encoded_before_submission() {
        let controller = controller(ScriptedTransport::replying(vec![Ok(Some(REPLY.to_string()))]));
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

        let snapshot = controller.add_attachment(&png).await.expect("attachment should encode");
        assert_eq!(snapshot.attachments[0].media_type, "image/png");
        assert!(snapshot.can_submit);

        controller.submit().await.expect("image-only submit should succeed");
        let calls = controller.client().transport().calls.lock().expect("lock should hold");
        assert_eq!(calls[0].contents[0].parts.len(), 2);
    }
}
