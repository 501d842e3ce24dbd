//! Token signing key published by the identity realm.

use reqwest::{Client, StatusCode, header::ACCEPT};
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use super::http::base_url;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct RealmInfo {
    public_key: String,
}

/// Fetches the realm's RSA public key as PEM.
pub struct RealmKeyClient {
    client: Client,
    realm_url: Url,
}

impl RealmKeyClient {
    pub fn new(client: Client, keycloak_url: &str, realm: &str) -> Result<Self> {
        Ok(Self {
            client,
            realm_url: base_url(keycloak_url)?.join(&format!("auth/realms/{realm}"))?,
        })
    }

    pub async fn fetch_public_key(&self) -> Result<String> {
        let resp = self
            .client
            .get(self.realm_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .inspect_err(|e| {
                error!(error = %e, url = %self.realm_url, "failed to reach identity realm");
            })?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::upstream_status("realm", status.as_u16()));
        }

        let realm: RealmInfo = resp.json().await?;
        if realm.public_key.trim().is_empty() {
            return Err(Error::Authentication(
                "realm did not publish a public key".to_string(),
            ));
        }
        info!(url = %self.realm_url, "fetched token signing key");
        Ok(public_key_pem(&realm.public_key))
    }
}

/// Wrap a bare base64 key in PEM armour.
fn public_key_pem(key: &str) -> String {
    format!(
        "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
        key.trim()
    )
}
