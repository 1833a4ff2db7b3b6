//! Concrete implementations of the pipeline's external capability seams
//! (§1: "the specific transcription model and grounded-generation
//! provider; both are abstracted as capability interfaces"; §4.J mail
//! transport). The `pipeline` command is the only place that needs to
//! pick a concrete vendor behind these traits.

use pod_pipeline::stages::metadata::{AiMetadataProvider, AiMetadataResponse};
use pod_pipeline::{MailSender, PipelineError};
use serde::Serialize;

/// Posts the transcript and filename to a configured HTTP endpoint and
/// expects back JSON matching [`AiMetadataResponse`] (§4.E).
pub struct HttpAiMetadataProvider {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpAiMetadataProvider {
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self { http: reqwest::Client::new(), endpoint }
    }
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    transcript: &'a str,
    filename: &'a str,
}

impl AiMetadataProvider for HttpAiMetadataProvider {
    async fn summarize(
        &self,
        transcript: &str,
        filename: &str,
    ) -> Result<AiMetadataResponse, PipelineError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SummarizeRequest { transcript, filename })
            .send()
            .await?
            .error_for_status()?;
        response
            .json::<AiMetadataResponse>()
            .await
            .map_err(|e| PipelineError::MalformedAiResponse(e.to_string()))
    }
}

/// Posts rendered digest emails to a configured webhook. When no URL is
/// configured, `send` logs and returns `Ok(())` without transmitting
/// anything — digests still compute and mark sent (§7: "digest emails
/// are never sent if the mail collaborator is unconfigured").
pub struct WebhookMailSender {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookMailSender {
    #[must_use]
    pub fn new(webhook_url: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), webhook_url }
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}

impl MailSender for WebhookMailSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), PipelineError> {
        let Some(url) = &self.webhook_url else {
            tracing::info!(to, subject, "mail transport unconfigured, digest not sent");
            return Ok(());
        };

        self.http
            .post(url)
            .json(&SendRequest { to, subject, html_body, text_body })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
