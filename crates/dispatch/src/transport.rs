//! Delivery backends for notifications.
//!
//! Transports are blocking; the dispatcher calls them from
//! `spawn_blocking` so slow endpoints never stall the worker loop.

use crate::config::{DispatchConfig, TransportKind};
use anyhow::{Context, Result};
use campusfix::notify::Notification;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Delivers one notification. Called once per notification, never retried.
pub trait Transport: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Build the transport selected by `config`.
pub fn from_config(config: &DispatchConfig) -> Result<Arc<dyn Transport>> {
    Ok(match config.transport {
        TransportKind::Log => Arc::new(LogTransport),
        TransportKind::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .context("dispatch.webhook_url is required for the webhook transport")?;
            Arc::new(WebhookTransport::new(
                url,
                Duration::from_secs(config.timeout_secs()),
            ))
        }
    })
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            to = %notification.address,
            subject = %notification.subject,
            "notification"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// POSTs each notification as a JSON object `{address, subject, body}`.
pub struct WebhookTransport {
    url: String,
    agent: ureq::Agent,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            url: url.into(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WebhookTransport {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        let payload = serde_json::to_string(notification)?;
        self.agent
            .post(&self.url)
            .header("Content-Type", "application/json")
            .send(payload.as_bytes())
            .with_context(|| format!("POST {} failed", self.url))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Keeps delivered notifications in memory; optionally fails every delivery.
#[derive(Default)]
pub struct MemoryTransport {
    delivered: Mutex<Vec<Notification>>,
    fail: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Transport for MemoryTransport {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        if self.fail {
            anyhow::bail!("delivery to {} refused", notification.address);
        }
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
