//! Voicemail notifier — emails the recording link and transcript once the
//! carrier finishes processing a message.
//!
//! Pure glue over SMTP: the carrier posts the transcription callback, we
//! format one email and send it. Failures are logged by the caller and never
//! surfaced to the carrier.

use chrono::Utc;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::NotifyError;

/// SMTP configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub to_address: String,
}

impl NotifyConfig {
    /// Build config from environment variables.
    /// Returns `None` if `RINGLINE_SMTP_HOST` is not set (notifier disabled).
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("RINGLINE_SMTP_HOST").ok()?;

        let smtp_port: u16 = std::env::var("RINGLINE_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("RINGLINE_SMTP_USERNAME").unwrap_or_default();
        let password = std::env::var("RINGLINE_SMTP_PASSWORD").unwrap_or_default();
        let from_address =
            std::env::var("RINGLINE_NOTIFY_FROM").unwrap_or_else(|_| username.clone());
        let to_address = std::env::var("RINGLINE_NOTIFY_TO").ok()?;

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
            to_address,
        })
    }
}

/// What the carrier delivers when a recording and transcript are ready.
#[derive(Debug, Clone)]
pub struct VoicemailNotice {
    pub caller: Option<String>,
    pub recording_url: String,
    pub transcription: Option<String>,
}

/// Sends voicemail notification emails over SMTP.
pub struct VoicemailNotifier {
    config: NotifyConfig,
}

impl VoicemailNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }

    /// Send the notification. The SMTP transport is synchronous, so this
    /// runs on the blocking pool.
    pub async fn notify(&self, notice: VoicemailNotice) -> Result<(), NotifyError> {
        let config = self.config.clone();
        let subject = subject_line(&notice);
        let body = format_body(&notice);

        tokio::task::spawn_blocking(move || send_email(&config, &subject, &body))
            .await
            .map_err(|e| NotifyError::Send(format!("Notify task panicked: {e}")))?
    }
}

fn subject_line(notice: &VoicemailNotice) -> String {
    format!(
        "New voicemail from {}",
        notice.caller.as_deref().unwrap_or("an unknown caller")
    )
}

fn format_body(notice: &VoicemailNotice) -> String {
    let transcript = notice
        .transcription
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("(transcript unavailable)");

    format!(
        "Caller: {}\nReceived: {}\n\nTranscript:\n{}\n\nRecording: {}\n",
        notice.caller.as_deref().unwrap_or("unknown"),
        Utc::now().to_rfc2822(),
        transcript,
        notice.recording_url,
    )
}

fn send_email(config: &NotifyConfig, subject: &str, body: &str) -> Result<(), NotifyError> {
    let transport = SmtpTransport::relay(&config.smtp_host)
        .map_err(|e| NotifyError::Send(format!("SMTP relay error: {e}")))?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.username.clone(),
            config.password.clone(),
        ))
        .build();

    let email = Message::builder()
        .from(config.from_address.parse().map_err(|e| NotifyError::InvalidAddress {
            address: config.from_address.clone(),
            reason: format!("{e}"),
        })?)
        .to(config.to_address.parse().map_err(|e| NotifyError::InvalidAddress {
            address: config.to_address.clone(),
            reason: format!("{e}"),
        })?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| NotifyError::Build(format!("{e}")))?;

    transport
        .send(&email)
        .map_err(|e| NotifyError::Send(format!("{e}")))?;

    tracing::info!(to = %config.to_address, "Voicemail notification sent");
    Ok(())
}
