//! Outbound email transport.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::Result;
use crate::collector::Receiver;
use crate::context::RequestContext;

/// Delivers a rendered email to a set of receivers.
///
/// Implementations report failures through logging only.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(
        &self,
        ctx: &RequestContext,
        subject: &str,
        body: &str,
        headers: &HashMap<String, String>,
        receivers: &[Receiver],
    );
}

const MANDRILL_ENDPOINT: &str = "https://mandrillapp.com/api/1.0/messages/send.json";
const FROM_EMAIL: &str = "noreply@notify.openshift.io";
const FROM_NAME: &str = "openshift.io";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    email: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    html: &'a str,
    subject: &'a str,
    from_email: &'static str,
    from_name: &'static str,
    to: Vec<Recipient<'a>>,
    headers: &'a HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    key: &'a str,
    message: Message<'a>,
    #[serde(rename = "async")]
    is_async: bool,
}

/// Per-recipient result returned by Mandrill.
#[derive(Debug, Clone, Deserialize)]
pub struct SendStatus {
    pub email: String,
    pub status: String,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

impl SendStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self.status.as_str(), "sent" | "queued")
    }
}

/// Sends email through the Mandrill transactional API.
pub struct MandrillSender {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl MandrillSender {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: MANDRILL_ENDPOINT.to_string(),
        })
    }

    /// Point the sender at another API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request<'a>(
        &'a self,
        subject: &'a str,
        body: &'a str,
        headers: &'a HashMap<String, String>,
        receivers: &'a [Receiver],
    ) -> SendRequest<'a> {
        SendRequest {
            key: &self.api_key,
            message: Message {
                html: body,
                subject,
                from_email: FROM_EMAIL,
                from_name: FROM_NAME,
                to: receivers
                    .iter()
                    .map(|r| Recipient {
                        email: &r.email,
                        name: &r.full_name,
                        kind: "to",
                    })
                    .collect(),
                headers,
            },
            is_async: false,
        }
    }

    async fn post(&self, request: &SendRequest<'_>) -> Result<Vec<SendStatus>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Sender for MandrillSender {
    async fn send(
        &self,
        ctx: &RequestContext,
        subject: &str,
        body: &str,
        headers: &HashMap<String, String>,
        receivers: &[Receiver],
    ) {
        let request = self.build_request(subject, body, headers, receivers);
        let request_id = ctx.request_id().unwrap_or_default();

        let statuses = match self.post(&request).await {
            Ok(statuses) => statuses,
            Err(e) => {
                error!(request_id, error = %e, "error sending messages");
                return;
            }
        };

        for status in statuses {
            if status.is_accepted() {
                info!(
                    request_id,
                    recipient = %status.email,
                    recipient_id = status.id.as_deref().unwrap_or_default(),
                    status = %status.status,
                    "sent message"
                );
            } else {
                error!(
                    request_id,
                    recipient = %status.email,
                    recipient_id = status.id.as_deref().unwrap_or_default(),
                    status = %status.status,
                    rejected = status.reject_reason.as_deref().unwrap_or_default(),
                    "sent message failed"
                );
            }
        }
    }
}
