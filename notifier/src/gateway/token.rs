//! Service account token exchange against the auth service.

use reqwest::{Client, StatusCode};
use tracing::{error, info};
use url::Url;

use super::REQUEST_ID_HEADER;
use super::http::base_url;
use super::models::ExternalToken;
use crate::context::RequestContext;
use crate::{Error, Result};

/// Obtains a service account access token using client credentials.
pub struct ServiceAccountTokenClient {
    client: Client,
    token_url: Url,
    account_id: String,
    account_secret: String,
}

impl ServiceAccountTokenClient {
    pub fn new(
        client: Client,
        auth_url: &str,
        account_id: impl Into<String>,
        account_secret: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            token_url: base_url(auth_url)?.join("api/token")?,
            account_id: account_id.into(),
            account_secret: account_secret.into(),
        })
    }

    fn form(&self) -> [(&'static str, &str); 3] {
        [
            ("grant_type", "client_credentials"),
            ("client_id", self.account_id.as_str()),
            ("client_secret", self.account_secret.as_str()),
        ]
    }

    /// Exchange the configured credentials for an access token.
    pub async fn fetch(&self, ctx: &RequestContext) -> Result<String> {
        let mut req = self.client.post(self.token_url.clone()).form(&self.form());
        if let Some(request_id) = ctx.request_id() {
            req = req.header(REQUEST_ID_HEADER, request_id);
        }

        let resp = req.send().await.inspect_err(|e| {
            error!(error = %e, "failed to get service account token from auth");
        })?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::upstream_status("token", status.as_u16()));
        }

        let token: ExternalToken = resp.json().await?;
        if token.access_token.is_empty() {
            return Err(Error::Authentication(
                "couldn't generate service account token".to_string(),
            ));
        }
        info!(account_id = %self.account_id, "obtained service account token");
        Ok(token.access_token)
    }
}
