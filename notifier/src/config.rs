//! Service configuration.
//!
//! Read from `F8_`-prefixed environment variables. A `.env` file in the
//! working directory is loaded first when present.

use crate::api::TokenVerifier;
use crate::{Error, Result};

const DEFAULT_HTTP_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_WIT_URL: &str = "https://api.openshift.io/";
const DEFAULT_AUTH_URL: &str = "http://localhost:8089/";
const DEFAULT_SERVICE_ACCOUNT_ID: &str = "4c34f6d4-f00b-487b-9a1f-e7d1adba6866";
const DEFAULT_SERVICE_ACCOUNT_SECRET: &str = "secret";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_WORKER_COUNT: usize = 10;
const DEFAULT_KEYCLOAK_REALM: &str = "fabric8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub http_address: String,
    /// Address for `/metrics`; `None` shares the HTTP address.
    pub metrics_http_address: Option<String>,
    pub wit_url: String,
    pub auth_url: String,
    pub mandrill_api_key: Option<String>,
    pub service_account_id: String,
    pub service_account_secret: String,
    pub developer_mode: bool,
    pub log_level: String,
    /// Explicit log format choice; `None` follows the developer mode.
    pub log_json: Option<bool>,
    pub worker_count: usize,
    pub jwt_secret: Option<String>,
    pub jwt_public_key: Option<String>,
    /// Realm server publishing the token signing key.
    pub keycloak_url: Option<String>,
    pub keycloak_realm: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_address: DEFAULT_HTTP_ADDRESS.to_string(),
            metrics_http_address: None,
            wit_url: DEFAULT_WIT_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            mandrill_api_key: None,
            service_account_id: DEFAULT_SERVICE_ACCOUNT_ID.to_string(),
            service_account_secret: DEFAULT_SERVICE_ACCOUNT_SECRET.to_string(),
            developer_mode: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: None,
            worker_count: DEFAULT_WORKER_COUNT,
            jwt_secret: None,
            jwt_public_key: None,
            keycloak_url: None,
            keycloak_realm: DEFAULT_KEYCLOAK_REALM.to_string(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{key} must be a boolean, got '{value}'"))),
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(Error::config(format!("failed to load .env: {e}")));
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("F8_HTTP_ADDRESS") {
            config.http_address = v;
        }
        config.metrics_http_address = get("F8_METRICS_HTTP_ADDRESS");
        if let Some(v) = get("F8_WIT_URL") {
            config.wit_url = v;
        }
        if let Some(v) = get("F8_AUTH_URL") {
            config.auth_url = v;
        }
        config.mandrill_api_key = get("F8_MANDRILL_APIKEY");
        if let Some(v) = get("F8_SERVICE_ACCOUNT_ID") {
            config.service_account_id = v;
        }
        if let Some(v) = get("F8_SERVICE_ACCOUNT_SECRET") {
            config.service_account_secret = v;
        }
        if let Some(v) = get("F8_DEVELOPER_MODE_ENABLED") {
            config.developer_mode = parse_bool("F8_DEVELOPER_MODE_ENABLED", &v)?;
        }
        if let Some(v) = get("F8_LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = get("F8_LOG_JSON") {
            config.log_json = Some(parse_bool("F8_LOG_JSON", &v)?);
        }
        if let Some(v) = get("F8_WORKER_COUNT") {
            config.worker_count = v
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("F8_WORKER_COUNT must be a number, got '{v}'")))?;
        }
        config.jwt_secret = get("F8_JWT_SECRET");
        config.jwt_public_key = get("F8_JWT_PUBLIC_KEY");
        config.keycloak_url = get("F8_KEYCLOAK_URL");
        if let Some(v) = get("F8_KEYCLOAK_REALM") {
            config.keycloak_realm = v;
        }

        Ok(config)
    }

    /// Check that everything needed to serve requests is present.
    pub fn validate(&self) -> Result<()> {
        if self.mandrill_api_key.is_none() {
            return Err(Error::config("missing F8_MANDRILL_APIKEY"));
        }
        if self.jwt_secret.is_none() && self.jwt_public_key.is_none() && self.keycloak_url.is_none()
        {
            return Err(Error::config(
                "one of F8_JWT_PUBLIC_KEY, F8_JWT_SECRET or F8_KEYCLOAK_URL is required",
            ));
        }
        if self.worker_count == 0 {
            return Err(Error::config("F8_WORKER_COUNT must be at least 1"));
        }
        Ok(())
    }

    /// Public web UI address, derived from the WIT API address.
    pub fn web_url(&self) -> String {
        self.wit_url
            .replacen("api.", "", 1)
            .trim_end_matches('/')
            .to_string()
    }

    /// Address serving `/metrics`, the HTTP address unless set.
    pub fn metrics_http_address(&self) -> &str {
        self.metrics_http_address
            .as_deref()
            .unwrap_or(&self.http_address)
    }

    /// JSON logs unless asked otherwise; developer mode defaults to text.
    pub fn log_json(&self) -> bool {
        self.log_json.unwrap_or(!self.developer_mode)
    }

    /// Token verifier built from locally configured keys. A public key wins
    /// over a secret; `None` means the key has to be fetched from the realm.
    pub fn local_token_verifier(&self) -> Result<Option<TokenVerifier>> {
        match (&self.jwt_public_key, &self.jwt_secret) {
            (Some(pem), _) => TokenVerifier::from_rsa_pem(pem).map(Some),
            (None, Some(secret)) => Ok(Some(TokenVerifier::from_secret(secret))),
            (None, None) => Ok(None),
        }
    }
}
